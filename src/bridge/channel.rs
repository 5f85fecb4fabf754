//! Output channel: bounded ring of code points, interpreter → UI.

use serde::{Deserialize, Serialize};

/// What happens when the interpreter produces output faster than the UI
/// drains it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Discard the oldest unread character to make room. Favors recency.
    #[default]
    EvictOldest,
    /// Discard the incoming character.
    DropNewest,
}

/// Result of a single push, reported so callers can log loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Stored,
    EvictedOldest(char),
    DroppedNewest,
}

/// Fixed-capacity FIFO. `tail` indexes the oldest character and `len`
/// counts stored ones. Drains advance `tail`; a push into a full ring under
/// [`OverflowPolicy::EvictOldest`] also advances it, dropping the oldest.
#[derive(Debug)]
pub struct OutputRing {
    slots: Box<[char]>,
    tail: usize,
    len: usize,
    policy: OverflowPolicy,
}

impl OutputRing {
    /// `capacity` must be non-zero; the caller validates it.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            slots: vec!['\0'; capacity].into_boxed_slice(),
            tail: 0,
            len: 0,
            policy,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    fn head(&self) -> usize {
        (self.tail + self.len) % self.slots.len()
    }

    pub fn push(&mut self, ch: char) -> PushOutcome {
        if self.len < self.slots.len() {
            let head = self.head();
            self.slots[head] = ch;
            self.len += 1;
            return PushOutcome::Stored;
        }
        match self.policy {
            OverflowPolicy::DropNewest => PushOutcome::DroppedNewest,
            OverflowPolicy::EvictOldest => {
                let evicted = self.slots[self.tail];
                self.slots[self.tail] = ch;
                self.tail = (self.tail + 1) % self.slots.len();
                PushOutcome::EvictedOldest(evicted)
            }
        }
    }

    /// Moves up to `max` characters into `out` in FIFO order. Never blocks;
    /// an empty ring yields 0.
    pub fn drain_into(&mut self, out: &mut Vec<char>, max: usize) -> usize {
        let count = max.min(self.len);
        for _ in 0..count {
            out.push(self.slots[self.tail]);
            self.tail = (self.tail + 1) % self.slots.len();
        }
        self.len -= count;
        count
    }

    pub fn clear(&mut self) {
        self.tail = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_all(ring: &mut OutputRing) -> String {
        let mut out = Vec::new();
        ring.drain_into(&mut out, usize::MAX);
        out.into_iter().collect()
    }

    #[test]
    fn test_fifo_within_capacity() {
        let mut ring = OutputRing::new(8, OverflowPolicy::EvictOldest);
        for ch in "hello".chars() {
            assert_eq!(ring.push(ch), PushOutcome::Stored);
        }
        assert_eq!(ring.len(), 5);
        assert_eq!(drain_all(&mut ring), "hello");
        assert!(ring.is_empty());
    }

    #[test]
    fn test_evict_oldest_keeps_last_capacity_items() {
        let mut ring = OutputRing::new(4, OverflowPolicy::EvictOldest);
        let mut evicted = Vec::new();
        for ch in "abcdefg".chars() {
            if let PushOutcome::EvictedOldest(old) = ring.push(ch) {
                evicted.push(old);
            }
        }
        assert_eq!(evicted, vec!['a', 'b', 'c']);
        assert_eq!(drain_all(&mut ring), "defg");
    }

    #[test]
    fn test_drop_newest_keeps_first_capacity_items() {
        let mut ring = OutputRing::new(4, OverflowPolicy::DropNewest);
        let dropped = "abcdefg"
            .chars()
            .filter(|&ch| ring.push(ch) == PushOutcome::DroppedNewest)
            .count();
        assert_eq!(dropped, 3);
        assert_eq!(drain_all(&mut ring), "abcd");
    }

    #[test]
    fn test_partial_drains_wrap_around() {
        let mut ring = OutputRing::new(3, OverflowPolicy::EvictOldest);
        let mut out = Vec::new();
        ring.push('1');
        ring.push('2');
        assert_eq!(ring.drain_into(&mut out, 1), 1);
        ring.push('3');
        ring.push('4');
        assert_eq!(ring.drain_into(&mut out, 10), 3);
        assert_eq!(out, vec!['1', '2', '3', '4']);
        assert_eq!(ring.drain_into(&mut out, 10), 0);
    }

    #[test]
    fn test_overflow_policy_parses_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            overflow: OverflowPolicy,
        }
        let parsed: Wrapper = toml::from_str("overflow = \"drop-newest\"").unwrap();
        assert_eq!(parsed.overflow, OverflowPolicy::DropNewest);
    }
}
