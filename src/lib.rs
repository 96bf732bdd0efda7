//! A stateful-PEG parser for MediaWiki-compatible wiki markup.
//!
//! Parsing runs in two grammar passes over a shared hand-written PEG
//! engine. The [`preprocessor`] resolves transclusion-relevant structure —
//! templates, template parameters, links, comments, and conditional
//! inclusion regions — and produces the preprocessed text. The main markup
//! grammar then converts that text into a [`Document`] tree of blocks and
//! inline items.
//!
//! The engine keeps four auxiliary stacks (`no`, `ifnot`, `bol_skip`,
//! `wspre`) that grammar rules push to and consult, which is how inline
//! terminators, indentation-sensitive list nesting, and indent-pre
//! recognition compose across arbitrarily nested contexts. Parsing never
//! fails: unmatched constructs decay to plain text and problems surface as
//! [`Diagnostic`]s.
//!
//! ```
//! let document = wikitree::parse("== Hello ==\n* a\n* b\n");
//! assert_eq!(document.blocks.len(), 2);
//! ```
//!
//! Template bodies are not evaluated here; the preprocessor exposes
//! [`preprocessor::Segment::Template`] nodes for a downstream evaluator,
//! and rendering of the parsed tree is likewise out of scope.

pub mod ast;
mod builder;
pub mod codemap;
pub mod config;
mod engine;
mod markup;
pub mod preprocessor;
#[cfg(test)]
mod tests;
pub mod visit;

use codemap::LineIndex;
pub use codemap::{LineCol, Span, Spanned};
pub use config::{DEFAULT_SCHEMES, Options, OptionsError};

use ast::Block;

/// Which pass produced a diagnostic, and therefore which text its span
/// indexes into.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    /// The span indexes the original source text.
    Preprocessor,
    /// The span indexes the preprocessed text ([`Document::source`]).
    Markup,
}

/// A non-fatal parse diagnostic. Diagnostics never change the tree.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// What was observed.
    pub message: String,
    /// Where it was observed.
    pub span: Span,
    /// Which pass observed it.
    pub stage: Stage,
}

/// A parsed document.
#[derive(Debug)]
pub struct Document {
    /// The preprocessed text all block and inline spans index into.
    pub source: String,
    /// The document tree.
    pub blocks: Vec<Spanned<Block>>,
    /// Non-fatal diagnostics from both passes.
    pub diagnostics: Vec<Diagnostic>,
    lines: LineIndex,
}

impl Document {
    /// The text of a span of the preprocessed source.
    pub fn slice(&self, span: Span) -> &str {
        &self.source[span.into_range()]
    }

    /// Converts a position in the preprocessed source into a line/column
    /// pair.
    pub fn line_col(&self, pos: usize) -> LineCol {
        self.lines.line_col(&self.source, pos)
    }

    /// Extracts the plain text content of the document.
    pub fn text_content(&self) -> String {
        let mut extractor = visit::TextContent::new(&self.source, String::new());
        visit::walk_blocks(&mut extractor, &self.blocks);
        extractor.finish()
    }
}

/// Parses a document with default [`Options`].
pub fn parse(source: &str) -> Document {
    parse_with(source, &Options::default()).expect("default options are valid")
}

/// Parses a document with the given options.
pub fn parse_with(source: &str, options: &Options) -> Result<Document, OptionsError> {
    let config = options.compile()?;
    Ok(parse_compiled(source, &config))
}

pub(crate) fn parse_compiled(source: &str, config: &config::Compiled) -> Document {
    let pre = preprocessor::parse(source, config);
    let expanded = pre.expand(false);
    let mut diagnostics = pre.diagnostics;
    let (mut blocks, markup_diagnostics) = markup::parse(&expanded, config);
    builder::postprocess(&mut blocks);
    diagnostics.extend(markup_diagnostics.into_iter().map(|d| Diagnostic {
        message: d.message,
        span: d.span,
        stage: Stage::Markup,
    }));

    let lines = LineIndex::new(&expanded);
    Document {
        source: expanded,
        blocks,
        diagnostics,
        lines,
    }
}

/// Runs only the preprocessor pass, exposing the segment stream for a
/// template evaluator.
pub fn preprocess<'src>(
    source: &'src str,
    options: &Options,
) -> Result<preprocessor::PreDocument<'src>, OptionsError> {
    let config = options.compile()?;
    Ok(preprocessor::parse(source, &config))
}
