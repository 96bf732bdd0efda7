//! Parser configuration data.

use phf::Set;
use regex::{Regex, RegexBuilder};

/// Caller-supplied parser options.
#[derive(Clone, Debug)]
pub struct Options {
    /// Treat a comment on the very first line of the document as a
    /// comment-alone even though no newline precedes it.
    ///
    /// The default preserves the historical quirk where such comments (and
    /// the newline after them) survive preprocessing.
    pub strip_comments_on_first_line: bool,
    /// URL prefixes recognized for external and plain links, including the
    /// scheme separator (`"https://"`, `"mailto:"`, or the protocol-relative
    /// `"//"`).
    pub allow_schemes: Vec<String>,
    /// Whether the packrat memoization table is consulted. Disabling it
    /// never changes the parse result, only its complexity.
    pub memoization: bool,
    /// Maps a named entity reference (without `&`/`;`) to its code point.
    /// When `None`, a resolver backed by the HTML5 entity table is used.
    pub entity_resolver: Option<fn(&str) -> Option<char>>,
}

/// The default URL prefixes.
pub const DEFAULT_SCHEMES: &[&str] = &[
    "http://", "https://", "ftp://", "telnet://", "irc://", "ircs://",
    "nntp://", "worldwind://", "mailto:", "news:", "svn://", "git://",
    "mms://", "//",
];

impl Default for Options {
    fn default() -> Self {
        Self {
            strip_comments_on_first_line: false,
            allow_schemes: DEFAULT_SCHEMES.iter().map(|s| (*s).to_string()).collect(),
            memoization: true,
            entity_resolver: None,
        }
    }
}

/// An options validation error.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// A scheme prefix was empty, which would turn every word boundary into
    /// a link.
    #[error("empty entry in allow_schemes")]
    EmptyScheme,
}

impl Options {
    /// Compiles the options into the pattern tables used by the grammars.
    pub fn compile(&self) -> Result<Compiled, OptionsError> {
        if self.allow_schemes.iter().any(String::is_empty) {
            return Err(OptionsError::EmptyScheme);
        }

        let mut alternates = String::new();
        for scheme in &self.allow_schemes {
            if !alternates.is_empty() {
                alternates.push('|');
            }
            alternates += &regex::escape(scheme);
        }
        let scheme = Regex::new(&format!("^(?i:{alternates})")).unwrap();

        // A heading terminator is a run of exactly N `=`, then blanks and
        // comments, then end of line or input.
        let heading_end = core::array::from_fn(|i| {
            RegexBuilder::new(&format!(
                "^={{{}}}[ \t]*(?:<!--.*?-->[ \t]*)*(?:\r?\n|$)",
                i + 1
            ))
            .dot_matches_new_line(true)
            .build()
            .unwrap()
        });

        let table_line = Regex::new("^[ \t]*[|!]").unwrap();

        Ok(Compiled {
            options: self.clone(),
            scheme,
            heading_end,
            table_line,
            purge_on_cut: true,
        })
    }
}

/// Options plus the patterns precompiled from them.
#[derive(Clone, Debug)]
pub struct Compiled {
    /// The source options.
    pub options: Options,
    /// Matches any configured URL prefix, anchored.
    pub scheme: Regex,
    /// `heading_end[n - 1]` matches the line-closing `=`-run of a level-`n`
    /// heading, anchored.
    pub heading_end: [Regex; 6],
    /// Matches the start of a table content line (`^[ \t]*[|!]`), anchored.
    pub table_line: Regex,
    /// Whether cut purges the memo table. Cleared only by the equivalence
    /// tests; purging is a space optimization, never a semantic change.
    pub(crate) purge_on_cut: bool,
}

impl Compiled {
    /// Resolves a named entity reference through the configured resolver.
    pub fn resolve_entity(&self, name: &str) -> Option<char> {
        match self.options.entity_resolver {
            Some(resolve) => resolve(name),
            None => html5_entity(name),
        }
    }
}

/// Decodes a named HTML5 entity reference via the `html_escape` table.
fn html5_entity(name: &str) -> Option<char> {
    let raw = format!("&{name};");
    let decoded = html_escape::decode_html_entities(&raw);
    if decoded == raw {
        // &<not-an-entity>;
        None
    } else {
        decoded.chars().next()
    }
}

/// HTML-like tags whose content is inline.
pub static INLINE_TAGS: Set<&str> = phf::phf_set! {
    "abbr", "b", "big", "br", "cite", "code", "data", "del", "dfn", "em",
    "font", "i", "ins", "kbd", "mark", "s", "samp", "small", "span",
    "strike", "strong", "sub", "sup", "time", "tt", "u", "var",
};

/// Void tags which never take content or a close tag.
pub static VOID_TAGS: Set<&str> = phf::phf_set! {
    "br", "hr", "wbr",
};

/// Tags of the HTML table and list families, which nest block documents
/// according to HTML semantics.
pub static STRUCTURE_TAGS: Set<&str> = phf::phf_set! {
    "table", "caption", "tr", "td", "th",
    "ul", "ol", "dl", "li", "dt", "dd",
};

/// How an HTML-like element name is parsed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ElementClass {
    /// Inline content, optional close tag.
    Inline,
    /// A nested block document (`div`, `center`, `references`).
    BlockDocument,
    /// A nested block document with indent-pre disabled (`blockquote`).
    BlockNoPre,
    /// Inline content with indent-pre disabled (`p`).
    ParagraphLike,
    /// Verbatim until the close tag, nowiki respected inside (`pre`).
    Pre,
    /// Verbatim content, entities still decoded (`nowiki`).
    Nowiki,
    /// Inline position, block content (`ref`).
    Ref,
    /// Heading content (`h1`…`h6`).
    Heading,
    /// Table/list family, nested per HTML semantics.
    Structure,
}

/// Classifies a tag name, or returns `None` for names that are plain text.
pub fn element_class(name: &str) -> Option<ElementClass> {
    let lower = name.to_ascii_lowercase();
    Some(match lower.as_str() {
        "div" | "center" | "references" => ElementClass::BlockDocument,
        "blockquote" => ElementClass::BlockNoPre,
        "p" => ElementClass::ParagraphLike,
        "pre" => ElementClass::Pre,
        "nowiki" => ElementClass::Nowiki,
        "ref" => ElementClass::Ref,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => ElementClass::Heading,
        _ if STRUCTURE_TAGS.contains(lower.as_str()) => ElementClass::Structure,
        _ if INLINE_TAGS.contains(lower.as_str()) => ElementClass::Inline,
        _ => return None,
    })
}

/// Returns true if an element class opens a block-level scope.
pub fn is_block_class(class: ElementClass) -> bool {
    !matches!(
        class,
        ElementClass::Inline | ElementClass::Nowiki | ElementClass::Ref
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_pattern() {
        let compiled = Options::default().compile().unwrap();
        assert!(compiled.scheme.is_match("https://example.org"));
        assert!(compiled.scheme.is_match("MAILTO:user@example.org"));
        assert!(compiled.scheme.is_match("//example.org"));
        assert!(!compiled.scheme.is_match("gopher://example.org"));
    }

    #[test]
    fn empty_scheme_rejected() {
        let options = Options {
            allow_schemes: vec![String::new()],
            ..Options::default()
        };
        assert!(matches!(options.compile(), Err(OptionsError::EmptyScheme)));
    }

    #[test]
    fn heading_end_anchoring() {
        let compiled = Options::default().compile().unwrap();
        assert!(compiled.heading_end[1].is_match("==\n"));
        assert!(compiled.heading_end[1].is_match("== <!-- c -->\n"));
        assert!(compiled.heading_end[1].is_match("=="));
        assert!(!compiled.heading_end[1].is_match("===\n"));
        assert!(!compiled.heading_end[1].is_match("==x\n"));
    }

    #[test]
    fn entity_table() {
        assert_eq!(html5_entity("amp"), Some('&'));
        assert_eq!(html5_entity("nbsp"), Some('\u{a0}'));
        assert_eq!(html5_entity("notanentity"), None);
    }
}
