//! The preprocessor grammar.
//!
//! This grammar resolves the transclusion-relevant structure of a document —
//! templates, template parameters, links, comments, and conditional
//! inclusion regions — into a flat segment stream. Template bodies are not
//! evaluated here; a downstream evaluator consumes the
//! [`Segment::Template`] nodes.

use crate::{
    Diagnostic, Stage,
    codemap::{Span, Spanned},
    config::Compiled,
    engine::{Engine, RuleId},
};
use std::sync::LazyLock;

/// A run of plain preprocessor text: everything except newlines, braces,
/// pipes, equals, brackets, and tag starters.
static TEXT: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[^\n{}|=\[\]<]+").unwrap());

/// The inclusion-control tag names.
const INCLUDE_TAGS: [(&str, InclusionMode); 3] = [
    ("noinclude", InclusionMode::NoInclude),
    ("includeonly", InclusionMode::IncludeOnly),
    ("onlyinclude", InclusionMode::OnlyInclude),
];

/// A preprocessor output segment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Segment {
    /// A run of plain text. The text is the node’s span.
    Text,
    /// A template transclusion.
    ///
    /// ```wikitext
    /// {{name|positional|key=value}}
    /// ```
    Template {
        /// The template name.
        name: Vec<Spanned<Segment>>,
        /// The template arguments.
        args: Vec<Spanned<TemplateArg>>,
        /// The opening `{{` was at the beginning of a line; downstream
        /// evaluation treats block-producing templates differently there.
        bol: bool,
    },
    /// A template parameter.
    ///
    /// ```wikitext
    /// {{{name|default}}}
    /// ```
    Parameter {
        /// The parameter name.
        name: Vec<Spanned<Segment>>,
        /// Default values; everything after the first `|`.
        defaults: Vec<Vec<Spanned<Segment>>>,
    },
    /// A `[[…]]` link with balanced content; `|` is ordinary inside.
    Link {
        /// The bracketed content.
        content: Vec<Spanned<Segment>>,
    },
    /// An HTML comment.
    Comment {
        /// The comment occupies its own line and absorbs the surrounding
        /// whitespace plus one enclosing newline.
        alone: bool,
        /// No `-->` was found; the comment runs to the end of input.
        unclosed: bool,
    },
    /// A conditional inclusion region.
    Include {
        /// Which tag bracketed the region.
        mode: InclusionMode,
        /// The region content.
        content: Vec<Spanned<Segment>>,
        /// The end tag was missing; the region runs to the end of input.
        unclosed: bool,
    },
    /// A dangling inclusion-control close tag, consumed and discarded.
    Ignore,
}

/// One argument of a [`Segment::Template`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TemplateArg {
    /// The argument name; `None` for positional arguments.
    pub name: Option<Vec<Spanned<Segment>>>,
    /// The argument value.
    pub value: Vec<Spanned<Segment>>,
}

/// An inclusion control tag mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InclusionMode {
    /// Contents render only when not transcluded.
    NoInclude,
    /// Contents render only when transcluded.
    IncludeOnly,
    /// Contents render only when transcluded, and all other content on the
    /// page behaves as if wrapped in `<noinclude>`.
    OnlyInclude,
}

/// The preprocessor output for one document.
#[derive(Debug)]
pub struct PreDocument<'src> {
    /// The source text the segment spans index into.
    pub source: &'src str,
    /// The segment stream.
    pub segments: Vec<Spanned<Segment>>,
    /// An `<onlyinclude>` exists somewhere in the document, which inverts
    /// the default visibility of everything else during transclusion.
    pub has_onlyinclude: bool,
    /// Non-fatal diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

/// Memoized values of the preprocessor grammar.
#[derive(Clone, Debug)]
pub(crate) enum PreCached {
    Span(Span),
    Segment(Spanned<Segment>),
}

type PreEngine<'src> = Engine<'src, PreCached>;

/// Runs the preprocessor grammar over `source`.
pub(crate) fn parse<'src>(source: &'src str, config: &Compiled) -> PreDocument<'src> {
    let mut e = PreEngine::new(source, config);
    let mut segments: Vec<Spanned<Segment>> = Vec::new();

    while !e.eof() {
        let segment = element(&mut e, false)
            .unwrap_or_else(|| fallthrough_char(&mut e));
        push_reduced(&mut segments, segment);
        // Commit after every top-level element to bound memo growth.
        e.cut();
    }

    let has_onlyinclude = contains_onlyinclude(&segments);
    PreDocument {
        source,
        segments,
        has_onlyinclude,
        diagnostics: e
            .diagnostics
            .into_iter()
            .map(|d| Diagnostic {
                message: d.message,
                span: d.span,
                stage: Stage::Preprocessor,
            })
            .collect(),
    }
}

/// Appends a segment, merging contiguous text runs.
fn push_reduced(segments: &mut Vec<Spanned<Segment>>, segment: Spanned<Segment>) {
    if let (
        Some(Spanned { node: Segment::Text, span: last }),
        Segment::Text,
    ) = (segments.last_mut(), &segment.node)
        && last.end == segment.span.start
    {
        last.end = segment.span.end;
        return;
    }
    segments.push(segment);
}

/// Recursively checks for an `<onlyinclude>` region.
fn contains_onlyinclude(segments: &[Spanned<Segment>]) -> bool {
    segments.iter().any(|segment| match &segment.node {
        Segment::Include { mode: InclusionMode::OnlyInclude, .. } => true,
        Segment::Include { content, .. } => contains_onlyinclude(content),
        _ => false,
    })
}

/// One structured element. Fails on plain text and at terminators.
fn element(e: &mut PreEngine<'_>, in_onlyinclude: bool) -> Option<Spanned<Segment>> {
    match e.buf.byte(e.pos)? {
        b'<' => comment_alone(e)
            .or_else(|| comment(e))
            .or_else(|| include(e, in_onlyinclude))
            .or_else(|| ignore(e)),
        b'{' => parameter(e).or_else(|| template(e)),
        b'[' => link(e),
        _ => text(e),
    }
}

/// A run of plain text.
fn text(e: &mut PreEngine<'_>) -> Option<Spanned<Segment>> {
    let cached = e.memoized(RuleId::PreText, |e| {
        e.regex(&TEXT).map(PreCached::Span)
    })?;
    let PreCached::Span(span) = cached else {
        unreachable!("PreText cached a non-span");
    };
    Some(Spanned { node: Segment::Text, span })
}

/// The single-character catch-all.
fn fallthrough_char(e: &mut PreEngine<'_>) -> Spanned<Segment> {
    let start = e.pos;
    let c = e.any_char().expect("fallthrough at end of input");
    Spanned::new(Segment::Text, start, start + c.len_utf8())
}

/// A `{{…}}` template. The whole rule fails when the closing `}}` is
/// missing, decaying the braces to plain text.
fn template(e: &mut PreEngine<'_>) -> Option<Spanned<Segment>> {
    let cached = e.memoized(RuleId::PreTemplate, |e| {
        let start = e.pos;
        let bol = e.bol();
        e.attempt(|e| {
            e.literal("{{").then_some(())?;
            let name = content_until(e, &["|", "}}"]);
            let args = e.star(|e| {
                e.literal("|").then_some(())?;
                Some(template_arg(e))
            });
            e.literal("}}").then_some(())?;
            Some(PreCached::Segment(Spanned::new(
                Segment::Template { name, args, bol },
                start,
                e.pos,
            )))
        })
    })?;
    let PreCached::Segment(segment) = cached else {
        unreachable!("PreTemplate cached a non-segment");
    };
    Some(segment)
}

/// One template argument, named or positional.
fn template_arg(e: &mut PreEngine<'_>) -> Spanned<TemplateArg> {
    let start = e.pos;
    let named = e.attempt(|e| {
        let name = content_until(e, &["|", "}}", "="]);
        e.literal("=").then_some(())?;
        let value = content_until(e, &["|", "}}"]);
        Some(TemplateArg { name: Some(name), value })
    });
    let arg = named.unwrap_or_else(|| TemplateArg {
        name: None,
        value: content_until(e, &["|", "}}"]),
    });
    Spanned::new(arg, start, e.pos)
}

/// A `{{{…}}}` template parameter.
fn parameter(e: &mut PreEngine<'_>) -> Option<Spanned<Segment>> {
    let cached = e.memoized(RuleId::PreParameter, |e| {
        let start = e.pos;
        e.attempt(|e| {
            e.literal("{{{").then_some(())?;
            let name = content_until(e, &["|", "}}}"]);
            let defaults = e.star(|e| {
                e.literal("|").then_some(())?;
                Some(content_until(e, &["|", "}}}"]))
            });
            e.literal("}}}").then_some(())?;
            Some(PreCached::Segment(Spanned::new(
                Segment::Parameter { name, defaults },
                start,
                e.pos,
            )))
        })
    })?;
    let PreCached::Segment(segment) = cached else {
        unreachable!("PreParameter cached a non-segment");
    };
    Some(segment)
}

/// A `[[…]]` link with balanced content.
fn link(e: &mut PreEngine<'_>) -> Option<Spanned<Segment>> {
    let cached = e.memoized(RuleId::PreLink, |e| {
        let start = e.pos;
        e.attempt(|e| {
            e.literal("[[").then_some(())?;
            let content = content_until(e, &["]]"]);
            e.literal("]]").then_some(())?;
            Some(PreCached::Segment(Spanned::new(
                Segment::Link { content },
                start,
                e.pos,
            )))
        })
    })?;
    let PreCached::Segment(segment) = cached else {
        unreachable!("PreLink cached a non-segment");
    };
    Some(segment)
}

/// Nested content of a template, parameter, or link, up to (but excluding)
/// any of the given terminators.
fn content_until(
    e: &mut PreEngine<'_>,
    terminators: &[&str],
) -> Vec<Spanned<Segment>> {
    let mut out = Vec::new();
    loop {
        if e.eof() || terminators.iter().any(|t| e.buf.starts_with(e.pos, t)) {
            break;
        }
        let segment = element(e, false).unwrap_or_else(|| fallthrough_char(e));
        push_reduced(&mut out, segment);
    }
    out
}

/// A comment that is alone on its own line: preceded by a newline and
/// blanks, followed by blanks and a newline (or the end of input). The
/// segment absorbs the trailing blanks and exactly one of the two
/// enclosing newlines (the trailing one); blanks before the comment were
/// already consumed into the preceding text run and are absorbed during
/// expansion instead.
///
/// A comment on the very first line of the document is not treated as
/// alone, unless `strip_comments_on_first_line` is set.
fn comment_alone(e: &mut PreEngine<'_>) -> Option<Spanned<Segment>> {
    // By the time dispatch reaches `<`, any blanks between the newline and
    // the comment belong to the previous text run; look back across them
    // to find the start of the line.
    let mut line_start = e.pos;
    while line_start > 0 && matches!(e.buf.byte(line_start - 1), Some(b' ' | b'\t')) {
        line_start -= 1;
    }
    if !e.buf.is_bol(line_start)
        || (line_start == 0 && !e.config.options.strip_comments_on_first_line)
    {
        return None;
    }
    e.attempt(|e| {
        let start = e.pos;
        e.blanks();
        let inner = comment(e)?;
        let Segment::Comment { unclosed, .. } = inner.node else {
            unreachable!();
        };
        e.blanks();
        if !e.newline() && !e.eof() {
            return None;
        }
        Some(Spanned::new(
            Segment::Comment { alone: true, unclosed },
            start,
            e.pos,
        ))
    })
}

/// A plain `<!-- … -->` comment. A missing `-->` consumes to the end of
/// input.
fn comment(e: &mut PreEngine<'_>) -> Option<Spanned<Segment>> {
    let cached = e.memoized(RuleId::Comment, |e| {
        let start = e.pos;
        e.literal("<!--").then_some(())?;
        let rest = e.buf.rest(e.pos);
        let unclosed = match memchr::memmem::find(rest.as_bytes(), b"-->") {
            Some(at) => {
                e.pos += at + 3;
                false
            }
            None => {
                e.pos = e.buf.len();
                e.warn(Span::new(start, e.pos), "unclosed comment");
                true
            }
        };
        Some(PreCached::Segment(Spanned::new(
            Segment::Comment { alone: false, unclosed },
            start,
            e.pos,
        )))
    })?;
    let PreCached::Segment(segment) = cached else {
        unreachable!("Comment cached a non-segment");
    };
    Some(segment)
}

/// An inclusion control region. The end tag may be missing, in which case
/// the region is closed by the end of input. `<onlyinclude>` may not nest
/// inside another `<onlyinclude>`.
fn include(e: &mut PreEngine<'_>, in_onlyinclude: bool) -> Option<Spanned<Segment>> {
    e.attempt(|e| {
        let start = e.pos;
        e.literal("<").then_some(())?;
        let (tag, mode) = *INCLUDE_TAGS
            .iter()
            .find(|(tag, _)| {
                e.buf.rest(e.pos).len() >= tag.len()
                    && e.buf.rest(e.pos).is_char_boundary(tag.len())
                    && e.buf.rest(e.pos)[..tag.len()].eq_ignore_ascii_case(tag)
            })?;
        e.pos += tag.len();
        e.blanks();
        if e.literal("/>") {
            // A self-closing inclusion tag carries no region.
            return Some(Spanned::new(Segment::Ignore, start, e.pos));
        }
        e.literal(">").then_some(())?;
        if mode == InclusionMode::OnlyInclude && in_onlyinclude {
            return None;
        }

        let nested = mode == InclusionMode::OnlyInclude || in_onlyinclude;
        let mut content = Vec::new();
        let mut unclosed = true;
        loop {
            if e.eof() {
                e.warn(Span::new(start, e.pos), format!("unclosed <{tag}>"));
                break;
            }
            if close_tag(e, tag) {
                unclosed = false;
                break;
            }
            let segment = element(e, nested).unwrap_or_else(|| fallthrough_char(e));
            push_reduced(&mut content, segment);
        }

        Some(Spanned::new(
            Segment::Include { mode, content, unclosed },
            start,
            e.pos,
        ))
    })
}

/// Consumes `</tag >` case-insensitively.
fn close_tag(e: &mut PreEngine<'_>, tag: &str) -> bool {
    e.attempt(|e| {
        e.literal("</").then_some(())?;
        let rest = e.buf.rest(e.pos);
        if rest.len() < tag.len()
            || !rest.is_char_boundary(tag.len())
            || !rest[..tag.len()].eq_ignore_ascii_case(tag)
        {
            return None;
        }
        e.pos += tag.len();
        e.blanks();
        e.literal(">").then_some(())
    })
    .is_some()
}

/// A dangling inclusion-control close tag, consumed and discarded.
fn ignore(e: &mut PreEngine<'_>) -> Option<Spanned<Segment>> {
    let start = e.pos;
    for (tag, _) in INCLUDE_TAGS {
        if close_tag(e, tag) {
            return Some(Spanned::new(Segment::Ignore, start, e.pos));
        }
    }
    None
}

impl PreDocument<'_> {
    /// The source text of a span.
    fn slice(&self, span: Span) -> &str {
        &self.source[span.into_range()]
    }

    /// Produces the preprocessed text consumed by the main grammar.
    ///
    /// `including` selects the transclusion side of the conditional
    /// inclusion regions. Comment-alone segments disappear together with
    /// their absorbed whitespace; other comments are kept verbatim for the
    /// main grammar. Templates, parameters, and links are re-emitted
    /// verbatim for the downstream evaluator.
    pub fn expand(&self, including: bool) -> String {
        let mut out = String::with_capacity(self.source.len());
        let suppress = including && self.has_onlyinclude;
        self.emit(&self.segments, including, suppress, &mut out);
        out
    }

    fn emit(
        &self,
        segments: &[Spanned<Segment>],
        including: bool,
        suppress: bool,
        out: &mut String,
    ) {
        for segment in segments {
            match &segment.node {
                Segment::Ignore => {}
                Segment::Comment { alone: true, .. } => {
                    if !suppress {
                        // Absorb the blanks between the preceding newline
                        // and the comment; they were emitted as part of the
                        // previous text run.
                        while out.ends_with(' ') || out.ends_with('\t') {
                            out.pop();
                        }
                    }
                }
                Segment::Text
                | Segment::Comment { .. }
                | Segment::Template { .. }
                | Segment::Parameter { .. }
                | Segment::Link { .. } => {
                    if !suppress {
                        out.push_str(self.slice(segment.span));
                    }
                }
                Segment::Include { mode, content, .. } => match mode {
                    InclusionMode::NoInclude => {
                        if !including {
                            self.emit(content, including, suppress, out);
                        }
                    }
                    InclusionMode::IncludeOnly => {
                        if including && !suppress {
                            self.emit(content, including, false, out);
                        }
                    }
                    InclusionMode::OnlyInclude => {
                        self.emit(content, including, false, out);
                    }
                },
            }
        }
    }
}
