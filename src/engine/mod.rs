//! The stateful PEG engine shared by both grammars.
//!
//! Grammar rules are hand-coded methods over an [`Engine`], which provides
//! the PEG operators (ordered choice via [`Engine::attempt`] chains,
//! repetition, lookahead, cut) plus the record/rewind protocol that keeps
//! the input position, the four side stacks, and pending diagnostics
//! consistent across backtracking.

pub(crate) mod buffer;
pub(crate) mod memo;
pub(crate) mod pattern;
pub(crate) mod stacks;
pub(crate) mod trap;

use crate::{codemap::Span, config::Compiled};
pub(crate) use buffer::Buffer;
pub(crate) use memo::{MemoEntry, MemoTable, RuleId};
pub(crate) use stacks::{StackHeights, Stacks};

use regex::Regex;

/// A diagnostic as recorded by the engine, before the driver stamps which
/// pass produced it.
#[derive(Clone, Debug)]
pub(crate) struct EngineDiagnostic {
    /// What was observed.
    pub message: String,
    /// Where it was observed.
    pub span: Span,
}

/// A saved backtrack point: input position, side-stack heights, and the
/// number of diagnostics emitted so far.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Checkpoint {
    pos: usize,
    heights: StackHeights,
    diagnostics: usize,
}

/// The evaluator state for a single parse.
///
/// `V` is the captured-value type stored in the memo table; the two
/// grammars instantiate it with their own node types.
#[derive(Debug)]
pub(crate) struct Engine<'src, V> {
    /// The input buffer.
    pub buf: Buffer<'src>,
    /// The current input position.
    pub pos: usize,
    /// Compiled configuration and pattern tables. Owned clone; the compiled
    /// regexes are internally reference-counted, so this is cheap.
    pub config: Compiled,
    /// The side stacks.
    pub stacks: Stacks,
    /// Non-fatal diagnostics. Entries emitted inside a failed trial branch
    /// are rolled back with the branch.
    pub diagnostics: Vec<EngineDiagnostic>,
    /// The last character consumed by the topmost `bol_skip` entry during
    /// the most recent successful `check_bol_skip`. Scratch state read
    /// directly after the trap; never checkpointed.
    pub bol_marker: Option<char>,
    memo: MemoTable<V>,
    /// When false, `cut` commits without purging the memo table. Only ever
    /// cleared by the equivalence tests.
    pub purge_on_cut: bool,
}

impl<'src, V: Clone> Engine<'src, V> {
    /// Creates an engine over `src`.
    pub fn new(src: &'src str, config: &Compiled) -> Self {
        Self {
            buf: Buffer::new(src),
            pos: 0,
            purge_on_cut: config.purge_on_cut,
            config: config.clone(),
            stacks: Stacks::default(),
            diagnostics: Vec::new(),
            bol_marker: None,
            memo: MemoTable::new(),
        }
    }

    /// The source text of a span.
    #[inline]
    pub fn slice(&self, span: Span) -> &'src str {
        &self.buf.as_str()[span.into_range()]
    }

    /// Returns true at the end of input.
    #[inline]
    pub fn eof(&self) -> bool {
        self.buf.is_eof(self.pos)
    }

    /// Returns true at position 0 or directly after a newline.
    #[inline]
    pub fn bol(&self) -> bool {
        self.buf.is_bol(self.pos)
    }

    /// Records a backtrack point.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            heights: self.stacks.heights(),
            diagnostics: self.diagnostics.len(),
        }
    }

    /// Restores a backtrack point: position, stack heights, diagnostics.
    pub fn rewind(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.stacks.rewind(checkpoint.heights);
        self.diagnostics.truncate(checkpoint.diagnostics);
    }

    /// Runs one trial branch. On failure the branch's consumption, pushes,
    /// and diagnostics are all undone.
    ///
    /// Ordered choice is an `attempt(..).or_else(|| attempt(..))` chain;
    /// sequencing with backtracking is `attempt` around a `?`-chained body.
    #[inline]
    pub fn attempt<T>(&mut self, body: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let checkpoint = self.checkpoint();
        let result = body(self);
        if result.is_none() {
            self.rewind(checkpoint);
        }
        result
    }

    /// Positive lookahead: runs `body` and always rewinds, succeeding if it
    /// did.
    #[inline]
    pub fn peek<T>(&mut self, body: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let checkpoint = self.checkpoint();
        let result = body(self);
        self.rewind(checkpoint);
        result
    }

    /// Negative lookahead: succeeds when `body` fails. Never advances.
    #[inline]
    pub fn not<T>(&mut self, body: impl FnOnce(&mut Self) -> Option<T>) -> bool {
        self.peek(body).is_none()
    }

    /// Zero-or-more repetition of `body`.
    ///
    /// A match that consumes nothing and leaves the stacks untouched ends
    /// the loop, so a nullable body cannot spin forever.
    pub fn star<T>(&mut self, mut body: impl FnMut(&mut Self) -> Option<T>) -> Vec<T> {
        let mut out = Vec::new();
        loop {
            let before = self.pos;
            let heights = self.stacks.heights();
            match self.attempt(&mut body) {
                Some(value) => {
                    if self.pos == before && self.stacks.heights() == heights {
                        break;
                    }
                    out.push(value);
                }
                None => break,
            }
        }
        out
    }

    /// Consumes an exact literal.
    #[inline]
    pub fn literal(&mut self, literal: &str) -> bool {
        if self.buf.starts_with(self.pos, literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    /// Consumes an anchored regex match and returns its span.
    #[inline]
    pub fn regex(&mut self, pattern: &Regex) -> Option<Span> {
        let end = self.buf.match_regex(self.pos, pattern)?;
        let span = Span::new(self.pos, end);
        self.pos = end;
        Some(span)
    }

    /// Consumes any single character.
    #[inline]
    pub fn any_char(&mut self) -> Option<char> {
        let c = self.buf.at(self.pos)?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consumes a `\r?\n` line break.
    pub fn newline(&mut self) -> bool {
        if self.literal("\r\n") {
            true
        } else {
            self.literal("\n")
        }
    }

    /// Consumes a run of blanks (spaces and tabs). Returns its span.
    pub fn blanks(&mut self) -> Span {
        let start = self.pos;
        while matches!(self.buf.byte(self.pos), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
        Span::new(start, self.pos)
    }

    /// The cut operator: commits all prior choices and purges memo entries
    /// below the current position.
    ///
    /// Only issued from the top-level drivers between elements, where no
    /// saved backtrack point can refer below the current position.
    pub fn cut(&mut self) {
        if self.purge_on_cut {
            self.memo.cut(self.pos);
        }
    }

    /// Evaluates a memoizable rule.
    ///
    /// The rule body must not read or mutate the side stacks; everything
    /// that does is evaluated fresh (and has no [`RuleId`]).
    pub fn memoized(
        &mut self,
        rule: RuleId,
        body: impl FnOnce(&mut Self) -> Option<V>,
    ) -> Option<V> {
        if !self.config.options.memoization {
            return self.attempt(body);
        }

        match self.memo.get(rule, self.pos) {
            Some(MemoEntry::Failure) => return None,
            Some(MemoEntry::Success { end, value }) => {
                self.pos = end;
                return Some(value);
            }
            None => {}
        }

        let start = self.pos;
        let result = self.attempt(body);
        let entry = match &result {
            None => MemoEntry::Failure,
            Some(value) => MemoEntry::Success {
                end: self.pos,
                value: value.clone(),
            },
        };
        self.memo.insert(rule, start, entry);
        result
    }

    /// Emits a non-fatal diagnostic.
    pub fn warn(&mut self, span: Span, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{}..{}: {message}", span.start, span.end);
        self.diagnostics.push(EngineDiagnostic { message, span });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;

    fn engine<'a>(src: &'a str, config: &'a Compiled) -> Engine<'a, Span> {
        Engine::new(src, config)
    }

    #[test]
    fn attempt_rewinds_everything() {
        let config = Options::default().compile().unwrap();
        let mut e = engine("abc", &config);
        let result: Option<()> = e.attempt(|e| {
            assert!(e.literal("ab"));
            e.stacks.no.push(pattern::StackPattern::Newline);
            e.warn(Span::new(0, 2), "speculative");
            None
        });
        assert!(result.is_none());
        assert_eq!(e.pos, 0);
        assert!(e.stacks.is_balanced());
        assert!(e.diagnostics.is_empty());
    }

    #[test]
    fn lookahead_does_not_advance() {
        let config = Options::default().compile().unwrap();
        let mut e = engine("abc", &config);
        assert!(e.peek(|e| e.literal("ab").then_some(())).is_some());
        assert_eq!(e.pos, 0);
        assert!(e.not(|e| e.literal("zz").then_some(())));
    }

    #[test]
    fn star_stops_on_empty_match() {
        let config = Options::default().compile().unwrap();
        let mut e = engine("aaa", &config);
        let all: Vec<()> = e.star(|_| Some(()));
        assert!(all.is_empty());
        let all: Vec<()> = e.star(|e| e.literal("a").then_some(()));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn memoized_failure_is_cached() {
        let config = Options::default().compile().unwrap();
        let mut e = engine("abc", &config);
        let mut calls = 0;
        for _ in 0..2 {
            let r = e.memoized(RuleId::PreText, |_| {
                calls += 1;
                None
            });
            assert!(r.is_none());
        }
        assert_eq!(calls, 1);
    }
}
