//! Compiled matchers for side-stack entries.
//!
//! Stack entries are never raw pattern strings; the fixed-form patterns are
//! compiled once at options-compile time and referenced here by tag, and the
//! only runtime-variable pattern (an HTML close tag) is matched by a hand
//! scanner instead of compiling a fresh regex per tag name.

use super::buffer::Buffer;
use crate::config::Compiled;

/// A matcher held on one of the side stacks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum StackPattern {
    /// An exact literal.
    Literal(&'static str),
    /// The first matching literal of a fixed set.
    AnyLiteral(&'static [&'static str]),
    /// A `\r?\n` line break.
    Newline,
    /// The closing `=`-run of a level-`n` heading (compiled in
    /// [`Compiled::heading_end`]).
    HeadingEnd(u8),
    /// The start of a table content line, `^[ \t]*[|!]`.
    TableLine,
    /// Any single character from the set.
    Marker(&'static str),
    /// A `</name >` close tag, matched case-insensitively.
    CloseTag(String),
}

impl StackPattern {
    /// Matches this pattern at `pos`, returning the end position of the
    /// match.
    pub fn matches(&self, buf: &Buffer<'_>, pos: usize, config: &Compiled) -> Option<usize> {
        match self {
            Self::Literal(lit) => buf.starts_with(pos, lit).then(|| pos + lit.len()),
            Self::AnyLiteral(alternates) => alternates
                .iter()
                .find(|lit| buf.starts_with(pos, lit))
                .map(|lit| pos + lit.len()),
            Self::Newline => {
                if buf.starts_with(pos, "\r\n") {
                    Some(pos + 2)
                } else {
                    buf.starts_with(pos, "\n").then(|| pos + 1)
                }
            }
            Self::HeadingEnd(level) => {
                buf.match_regex(pos, &config.heading_end[usize::from(level - 1)])
            }
            Self::TableLine => {
                // Table content lines only exist at the beginning of a line.
                if buf.is_bol(pos) {
                    buf.match_regex(pos, &config.table_line)
                } else {
                    None
                }
            }
            Self::Marker(set) => {
                let c = buf.at(pos)?;
                set.contains(c).then(|| pos + c.len_utf8())
            }
            Self::CloseTag(name) => match_close_tag(buf.rest(pos), name).map(|len| pos + len),
        }
    }
}

/// Matches `</name`, optional whitespace, `>` at the start of `input`,
/// comparing the tag name case-insensitively. Returns the matched length.
// A hand scanner, because compiling a regular expression for every tag name
// that appears in a document would dwarf the cost of the match itself.
pub(crate) fn match_close_tag(input: &str, name: &str) -> Option<usize> {
    let rest = input.strip_prefix("</")?;
    if rest.len() < name.len() || !rest.is_char_boundary(name.len()) {
        return None;
    }
    let (tag, rest) = rest.split_at(name.len());
    if !tag.eq_ignore_ascii_case(name) {
        return None;
    }
    let trailing = rest.len() - rest.trim_start().len();
    let rest = &rest[trailing..];
    rest.starts_with('>')
        .then(|| input.len() - rest.len() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_tag() {
        assert_eq!(match_close_tag("</ref>", "ref"), Some(6));
        assert_eq!(match_close_tag("</REF  >x", "ref"), Some(8));
        assert_eq!(match_close_tag("</reflist>", "ref"), None);
        assert_eq!(match_close_tag("<ref>", "ref"), None);
        assert_eq!(match_close_tag("</re", "ref"), None);
    }

    #[test]
    fn newline() {
        let buf = Buffer::new("\r\nx");
        let config = crate::config::Options::default().compile().unwrap();
        assert_eq!(StackPattern::Newline.matches(&buf, 0, &config), Some(2));
    }
}
