//! The packrat memoization table.
//!
//! Only rules that never read the side stacks are memoized; everything else
//! is evaluated fresh, so an entry recorded once is valid for the rest of
//! the parse — up to the cut watermark, below which entries are purged and
//! never re-used.

use ahash::RandomState;
use std::collections::HashMap;

/// Identifiers for the memoizable grammar rules.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum RuleId {
    /// Preprocessor plain-text run.
    PreText,
    /// Preprocessor `{{…}}` template.
    PreTemplate,
    /// Preprocessor `{{{…}}}` parameter.
    PreParameter,
    /// Preprocessor `[[…]]` link.
    PreLink,
    /// `<!-- … -->` comment (both grammars).
    Comment,
    /// `&…;` HTML entity.
    Entity,
    /// An XML-like attribute name.
    AttributeName,
}

/// A memoized outcome for one `(rule, position)` pair.
#[derive(Clone, Debug)]
pub(crate) enum MemoEntry<V> {
    /// The rule failed at this position.
    Failure,
    /// The rule matched, ending at `end`.
    Success {
        /// The position after the match.
        end: usize,
        /// The captured value.
        value: V,
    },
}

/// The memoization table.
#[derive(Debug)]
pub(crate) struct MemoTable<V> {
    map: HashMap<(RuleId, usize), MemoEntry<V>, RandomState>,
    /// Entries below this position have been discarded by a cut and must
    /// never be recorded or consulted again.
    watermark: usize,
}

impl<V: Clone> MemoTable<V> {
    pub fn new() -> Self {
        Self {
            map: HashMap::with_hasher(RandomState::new()),
            watermark: 0,
        }
    }

    /// Looks up a previously recorded outcome.
    pub fn get(&self, rule: RuleId, pos: usize) -> Option<MemoEntry<V>> {
        if pos < self.watermark {
            return None;
        }
        self.map.get(&(rule, pos)).cloned()
    }

    /// Records an outcome. Positions below the watermark are refused.
    pub fn insert(&mut self, rule: RuleId, pos: usize, entry: MemoEntry<V>) {
        if pos >= self.watermark {
            self.map.insert((rule, pos), entry);
        }
    }

    /// Raises the cut watermark and purges every entry recorded below it.
    pub fn cut(&mut self, pos: usize) {
        if pos <= self.watermark {
            return;
        }
        self.watermark = pos;
        let before = self.map.len();
        self.map.retain(|&(_, start), _| start >= pos);
        log::trace!("cut@{pos}: purged {} memo entries", before - self.map.len());
    }

    /// The number of live entries, for tests.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_purges_below_watermark() {
        let mut memo = MemoTable::<()>::new();
        memo.insert(RuleId::PreText, 0, MemoEntry::Success { end: 4, value: () });
        memo.insert(RuleId::PreText, 8, MemoEntry::Failure);
        memo.cut(5);
        assert!(memo.get(RuleId::PreText, 0).is_none());
        assert!(memo.get(RuleId::PreText, 8).is_some());
        assert_eq!(memo.len(), 1);

        // Entries below the watermark are refused outright.
        memo.insert(RuleId::PreText, 2, MemoEntry::Failure);
        assert!(memo.get(RuleId::PreText, 2).is_none());
        assert_eq!(memo.len(), 1);
    }
}
