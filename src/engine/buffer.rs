//! The parse input buffer.

use regex::Regex;

/// An immutable view of the source text with position-anchored matching.
///
/// All regex matching is performed against `&src[pos..]` slices with
/// `^`-anchored patterns, so a match can never silently begin past the
/// requested position and never skips whitespace.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Buffer<'src> {
    src: &'src str,
}

impl<'src> Buffer<'src> {
    /// Creates a buffer over `src`.
    pub fn new(src: &'src str) -> Self {
        Self { src }
    }

    /// The length of the source, in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.src.len()
    }

    /// The whole source.
    #[inline]
    pub fn as_str(&self) -> &'src str {
        self.src
    }

    /// The source from `pos` to the end.
    #[inline]
    pub fn rest(&self, pos: usize) -> &'src str {
        &self.src[pos..]
    }

    /// The character at `pos`, if any.
    #[inline]
    pub fn at(&self, pos: usize) -> Option<char> {
        self.src[pos..].chars().next()
    }

    /// The raw byte at `pos`, if any.
    #[inline]
    pub fn byte(&self, pos: usize) -> Option<u8> {
        self.src.as_bytes().get(pos).copied()
    }

    /// Returns true if the literal occurs at `pos`.
    #[inline]
    pub fn starts_with(&self, pos: usize, literal: &str) -> bool {
        self.src[pos..].starts_with(literal)
    }

    /// Matches an anchored pattern at `pos` and returns the end position of
    /// the match.
    ///
    /// The pattern must begin with `^`; matching is performed on the tail
    /// slice so the anchor binds to `pos`.
    #[inline]
    pub fn match_regex(&self, pos: usize, pattern: &Regex) -> Option<usize> {
        debug_assert!(pattern.as_str().starts_with('^'));
        pattern.find(&self.src[pos..]).map(|m| pos + m.end())
    }

    /// Returns true at position 0 or directly after a newline.
    #[inline]
    pub fn is_bol(&self, pos: usize) -> bool {
        pos == 0 || self.src.as_bytes()[pos - 1] == b'\n'
    }

    /// Returns true at the end of input.
    #[inline]
    pub fn is_eof(&self, pos: usize) -> bool {
        pos >= self.src.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_matching() {
        let buf = Buffer::new("ab12cd");
        let digits = Regex::new("^[0-9]+").unwrap();
        // No implicit skipping: the match must start at the given position.
        assert_eq!(buf.match_regex(0, &digits), None);
        assert_eq!(buf.match_regex(2, &digits), Some(4));
    }

    #[test]
    fn bol() {
        let buf = Buffer::new("a\nb");
        assert!(buf.is_bol(0));
        assert!(!buf.is_bol(1));
        assert!(buf.is_bol(2));
    }
}
