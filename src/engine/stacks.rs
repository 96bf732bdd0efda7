//! The four named side stacks consulted by the grammars.
//!
//! Stacks are append-only vectors; the combinator evaluator records their
//! heights in every checkpoint and rewinds by truncation, so a failed trial
//! branch can never leak a push.

use super::pattern::StackPattern;

/// A saved set of stack heights.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct StackHeights {
    no: usize,
    ifnot: usize,
    bol_skip: usize,
    wspre: usize,
}

/// The side stacks.
#[derive(Debug, Default)]
pub(crate) struct Stacks {
    /// Patterns that must not match at the current position (heading
    /// terminators, quote runs, newlines, table lines).
    pub no: Vec<StackPattern>,
    /// Patterns which terminate the current inline context when they match
    /// (link closers, cell separators, dt/dd separators, close tags).
    pub ifnot: Vec<StackPattern>,
    /// Prefix patterns consumed at the start of each new line within nested
    /// block contexts (list marker continuations, indent-pre spaces).
    pub bol_skip: Vec<StackPattern>,
    /// Whether indent-pre recognition is enabled; the top entry wins, and an
    /// empty stack means enabled.
    pub wspre: Vec<bool>,
}

impl Stacks {
    /// Records the current heights of all four stacks.
    pub fn heights(&self) -> StackHeights {
        StackHeights {
            no: self.no.len(),
            ifnot: self.ifnot.len(),
            bol_skip: self.bol_skip.len(),
            wspre: self.wspre.len(),
        }
    }

    /// Truncates all four stacks back to previously recorded heights.
    pub fn rewind(&mut self, heights: StackHeights) {
        self.no.truncate(heights.no);
        self.ifnot.truncate(heights.ifnot);
        self.bol_skip.truncate(heights.bol_skip);
        self.wspre.truncate(heights.wspre);
    }

    /// Whether indent-pre recognition is currently enabled.
    pub fn wspre_enabled(&self) -> bool {
        self.wspre.last().copied().unwrap_or(true)
    }

    /// Returns true when all four stacks are empty.
    pub fn is_balanced(&self) -> bool {
        self.no.is_empty()
            && self.ifnot.is_empty()
            && self.bol_skip.is_empty()
            && self.wspre.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewind_truncates() {
        let mut stacks = Stacks::default();
        let before = stacks.heights();
        stacks.no.push(StackPattern::Newline);
        stacks.wspre.push(false);
        assert!(!stacks.wspre_enabled());
        stacks.rewind(before);
        assert!(stacks.is_balanced());
        assert!(stacks.wspre_enabled());
    }
}
