//! The semantic trap layer.
//!
//! Traps are the empty-right-hand-side rules of the grammars whose effect
//! is implemented by the engine: they mutate or consult the side stacks and
//! either succeed silently or fail the enclosing rule. The set is closed
//! and dispatch is a single flat `match`.

use super::{Engine, pattern::StackPattern};

/// A semantic trap.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Trap {
    /// Pushes the level-`n` heading terminator pattern onto `no`.
    PushNoH(u8),
    /// Pushes a newline pattern onto `no`, keeping inline rules within one
    /// line.
    PushNoNl,
    /// Pushes the table-content-line pattern onto `no`, terminating
    /// embedded block mode inside table cells.
    PushNoTableLine,
    /// Pushes the bold re-entry pattern (`'''`) onto `no`.
    PushNoBold,
    /// Pushes the italic re-entry pattern (`''`) onto `no`.
    PushNoItalic,
    /// Removes the top `no` entry.
    PopNo,
    /// Fails if any `no` entry matches at the current position.
    CheckNo,

    /// Pushes the `*` continuation marker onto `bol_skip`.
    PushBolSkipUl,
    /// Pushes the `#` continuation marker onto `bol_skip`.
    PushBolSkipOl,
    /// Pushes the `;`/`:` continuation marker onto `bol_skip`.
    PushBolSkipDl,
    /// Pushes the indent-pre single-space prefix onto `bol_skip`.
    PushBolSkipWspre,
    /// Removes the top `bol_skip` entry.
    PopBolSkip,
    /// At the start of a line, consumes every `bol_skip` entry bottom to
    /// top; fails if any entry does not match.
    CheckBolSkip,

    /// Pushes the `]]` internal-link closer onto `ifnot`.
    PushIfnotLinkEnd,
    /// Pushes the `]` external-link closer onto `ifnot`.
    PushIfnotBracket,
    /// Pushes the `|` separator onto `ifnot`.
    PushIfnotPipe,
    /// Pushes the `||` data-cell separator onto `ifnot`.
    PushIfnotPipePipe,
    /// Pushes the header-cell separators (`!!`, `||`) onto `ifnot`.
    PushIfnotHeaderSep,
    /// Pushes the `:` dt/dd separator onto `ifnot`.
    PushIfnotColon,
    /// Pushes a `</name >` close-tag pattern onto `ifnot`.
    PushIfnotCloseTag(String),
    /// Removes the top `ifnot` entry.
    PopIfnot,
    /// Fails if any `ifnot` entry matches at the current position.
    CheckIfnot,
    /// [`Trap::CheckIfnot`] followed by [`Trap::CheckNo`]; used before
    /// every generic character consumption in inline contexts.
    CheckIfnots,

    /// Disables indent-pre recognition for a nested context.
    PushWspreOff,
    /// Explicitly re-enables indent-pre recognition.
    SetWspreOn,
    /// Removes the top `wspre` entry.
    PopWspre,
    /// Fails while indent-pre recognition is disabled.
    CheckWspre,
}

impl<V: Clone> Engine<'_, V> {
    /// Executes a trap. Returns false when the trap fails.
    pub fn trap(&mut self, trap: Trap) -> bool {
        match trap {
            Trap::PushNoH(level) => self.stacks.no.push(StackPattern::HeadingEnd(level)),
            Trap::PushNoNl => self.stacks.no.push(StackPattern::Newline),
            Trap::PushNoTableLine => self.stacks.no.push(StackPattern::TableLine),
            Trap::PushNoBold => self.stacks.no.push(StackPattern::Literal("'''")),
            Trap::PushNoItalic => self.stacks.no.push(StackPattern::Literal("''")),
            Trap::PopNo => {
                self.stacks.no.pop().expect("pop from empty no stack");
            }
            Trap::CheckNo => return self.check_no(),

            Trap::PushBolSkipUl => self.stacks.bol_skip.push(StackPattern::Literal("*")),
            Trap::PushBolSkipOl => self.stacks.bol_skip.push(StackPattern::Literal("#")),
            Trap::PushBolSkipDl => self.stacks.bol_skip.push(StackPattern::Marker(";:")),
            Trap::PushBolSkipWspre => self.stacks.bol_skip.push(StackPattern::Literal(" ")),
            Trap::PopBolSkip => {
                self.stacks
                    .bol_skip
                    .pop()
                    .expect("pop from empty bol_skip stack");
            }
            Trap::CheckBolSkip => return self.consume_bol_skip().is_some(),

            Trap::PushIfnotLinkEnd => self.stacks.ifnot.push(StackPattern::Literal("]]")),
            Trap::PushIfnotBracket => self.stacks.ifnot.push(StackPattern::Literal("]")),
            Trap::PushIfnotPipe => self.stacks.ifnot.push(StackPattern::Literal("|")),
            Trap::PushIfnotPipePipe => self.stacks.ifnot.push(StackPattern::Literal("||")),
            Trap::PushIfnotHeaderSep => {
                self.stacks.ifnot.push(StackPattern::AnyLiteral(&["!!", "||"]));
            }
            Trap::PushIfnotColon => self.stacks.ifnot.push(StackPattern::Literal(":")),
            Trap::PushIfnotCloseTag(name) => {
                self.stacks.ifnot.push(StackPattern::CloseTag(name));
            }
            Trap::PopIfnot => {
                self.stacks.ifnot.pop().expect("pop from empty ifnot stack");
            }
            Trap::CheckIfnot => return self.check_ifnot(),
            Trap::CheckIfnots => return self.check_ifnot() && self.check_no(),

            Trap::PushWspreOff => self.stacks.wspre.push(false),
            Trap::SetWspreOn => self.stacks.wspre.push(true),
            Trap::PopWspre => {
                self.stacks.wspre.pop().expect("pop from empty wspre stack");
            }
            Trap::CheckWspre => return self.stacks.wspre_enabled(),
        }
        true
    }

    /// True when no `no` entry matches at the current position.
    pub fn check_no(&mut self) -> bool {
        for i in 0..self.stacks.no.len() {
            if self.stacks.no[i]
                .matches(&self.buf, self.pos, &self.config)
                .is_some()
            {
                return false;
            }
        }
        true
    }

    /// True when no `ifnot` entry matches at the current position.
    pub fn check_ifnot(&mut self) -> bool {
        for i in 0..self.stacks.ifnot.len() {
            if self.stacks.ifnot[i]
                .matches(&self.buf, self.pos, &self.config)
                .is_some()
            {
                return false;
            }
        }
        true
    }

    /// Consumes every `bol_skip` entry bottom to top at the start of a new
    /// line. On success returns the last character consumed by the topmost
    /// entry (the innermost list marker), if any, and records it in
    /// [`Engine::bol_marker`]; on failure the position is restored.
    pub fn consume_bol_skip(&mut self) -> Option<Option<char>> {
        let start = self.pos;
        let mut last = None;
        for i in 0..self.stacks.bol_skip.len() {
            let matched = self.stacks.bol_skip[i].matches(&self.buf, self.pos, &self.config);
            match matched {
                Some(end) => {
                    last = self.buf.at(self.pos);
                    self.pos = end;
                }
                None => {
                    self.pos = start;
                    return None;
                }
            }
        }
        self.bol_marker = last;
        Some(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;

    #[test]
    fn push_check_pop() {
        let config = Options::default().compile().unwrap();
        let mut e: Engine<'_, ()> = Engine::new("x ==\ny", &config);
        assert!(e.trap(Trap::PushNoH(2)));
        // "x" is not a heading terminator.
        assert!(e.trap(Trap::CheckNo));
        // "==\n" is.
        e.pos = 2;
        assert!(!e.trap(Trap::CheckNo));
        assert!(e.trap(Trap::PopNo));
        assert!(e.stacks.is_balanced());
    }

    #[test]
    fn bol_skip_consumes_bottom_up() {
        let config = Options::default().compile().unwrap();
        let mut e: Engine<'_, ()> = Engine::new("*#rest", &config);
        e.trap(Trap::PushBolSkipUl);
        e.trap(Trap::PushBolSkipOl);
        assert_eq!(e.consume_bol_skip(), Some(Some('#')));
        assert_eq!(e.pos, 2);

        // A missing parent marker fails and restores the position.
        e.pos = 1;
        assert_eq!(e.consume_bol_skip(), None);
        assert_eq!(e.pos, 1);
    }

    #[test]
    fn wspre_toggles() {
        let config = Options::default().compile().unwrap();
        let mut e: Engine<'_, ()> = Engine::new("", &config);
        assert!(e.trap(Trap::CheckWspre));
        e.trap(Trap::PushWspreOff);
        assert!(!e.trap(Trap::CheckWspre));
        e.trap(Trap::SetWspreOn);
        assert!(e.trap(Trap::CheckWspre));
        e.trap(Trap::PopWspre);
        e.trap(Trap::PopWspre);
        assert!(e.stacks.is_balanced());
    }
}
