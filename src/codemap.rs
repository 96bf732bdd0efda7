//! Source position tracking, heavily adapted from
//! [codemap](https://crates.io/crates/codemap).

/// A range of bytes within the parsed source.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Span {
    /// The position of the first byte of the span.
    pub start: usize,
    /// The position after the last byte of the span.
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Returns true if this span covers no bytes.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }

    /// The length of the span, in bytes.
    #[inline]
    pub fn len(self) -> usize {
        self.end - self.start
    }

    /// Creates a span that encloses both `self` and `other`.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Converts the span into a range usable for string indexing.
    // Not `From<Span> for Range<usize>` because type resolution of `.into()`
    // at call sites eliminates any benefit of the standard trait.
    #[inline]
    pub fn into_range(self) -> core::ops::Range<usize> {
        self.start..self.end
    }
}

/// Associates a [`Span`] with a value of arbitrary type (e.g. an AST node).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Spanned<T> {
    /// The value.
    pub node: T,
    /// The span.
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Creates a new [`Spanned`].
    #[inline]
    pub fn new(node: T, start: usize, end: usize) -> Self {
        Self {
            node,
            span: Span { start, end },
        }
    }

    /// Maps a `Spanned<T>` to `Spanned<U>` by applying the function to the
    /// node, leaving the span untouched.
    pub fn map_node<U, F: FnOnce(T) -> U>(self, op: F) -> Spanned<U> {
        Spanned {
            node: op(self.node),
            span: self.span,
        }
    }
}

impl<T> core::ops::Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.node
    }
}

/// A line and column position within the source, for diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LineCol {
    /// The 1-indexed line number.
    pub line: usize,
    /// The 1-indexed column number, in characters.
    pub column: usize,
    /// The byte offset into the source.
    pub offset: usize,
}

/// A record of a source string’s line beginnings.
#[derive(Clone, Debug)]
pub struct LineIndex {
    /// Byte positions of line beginnings.
    lines: Vec<u32>,
}

impl LineIndex {
    /// Indexes the line beginnings of `source`.
    pub fn new(source: &str) -> Self {
        let lines = core::iter::once(0)
            .chain(
                source
                    .match_indices('\n')
                    .map(|(p, _)| u32::try_from(p + 1).unwrap()),
            )
            .collect();

        Self { lines }
    }

    /// Converts a byte position into a [`LineCol`].
    ///
    /// # Panics
    ///
    /// * If `pos` points to a byte in the middle of a UTF-8 character.
    pub fn line_col(&self, source: &str, pos: usize) -> LineCol {
        let pos = pos.min(source.len());
        let line = match self.lines.binary_search(&u32::try_from(pos).unwrap()) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = usize::try_from(self.lines[line]).unwrap();
        LineCol {
            line: line + 1,
            column: source[line_start..pos].chars().count() + 1,
            offset: pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col() {
        let source = "ab\ncdé\nf";
        let index = LineIndex::new(source);
        assert_eq!(
            index.line_col(source, 0),
            LineCol { line: 1, column: 1, offset: 0 }
        );
        assert_eq!(
            index.line_col(source, 3),
            LineCol { line: 2, column: 1, offset: 3 }
        );
        // é is two bytes but one column
        assert_eq!(
            index.line_col(source, 7),
            LineCol { line: 2, column: 4, offset: 7 }
        );
        assert_eq!(
            index.line_col(source, 8),
            LineCol { line: 3, column: 1, offset: 8 }
        );
    }

    #[test]
    fn merge() {
        assert_eq!(Span::new(3, 5).merge(Span::new(1, 4)), Span::new(1, 5));
    }
}
