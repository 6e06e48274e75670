// history.rs

use tracing::trace;

/// Result of stepping the browse cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    /// Nothing changed: empty history, clamped at the oldest entry, or not browsing.
    Unchanged,
    /// Stepped past the newest entry; browsing has ended.
    Cleared,
    /// The cursor now points at this slot.
    Moved(usize),
}

/// Fixed-capacity ring of accepted command lines with an up/down browse cursor.
///
/// Once full, each new entry overwrites the oldest one. The slot at `next` is
/// always the next one written, so when the ring is full it is also the oldest.
#[derive(Debug)]
pub struct History {
    slots: Vec<String>,
    count: usize,
    next: usize,
    cursor: Option<usize>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![String::new(); capacity.max(1)],
            count: 0,
            next: 0,
            cursor: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = None;
    }

    /// Stores `entry` unless it is empty or repeats the newest entry.
    /// Returns whether it was stored.
    pub fn add(&mut self, entry: &str) -> bool {
        if entry.is_empty() || self.last() == Some(entry) {
            return false;
        }
        let cap = self.capacity();
        self.slots[self.next].clear();
        self.slots[self.next].push_str(entry);
        self.next = (self.next + 1) % cap;
        if self.count < cap {
            self.count += 1;
        }
        self.cursor = None;
        trace!(count = self.count, next = self.next, "history entry added");
        true
    }

    pub fn oldest_index(&self) -> usize {
        if self.count < self.capacity() {
            0
        } else {
            self.next
        }
    }

    pub fn most_recent_index(&self) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        Some((self.oldest_index() + self.count - 1) % self.capacity())
    }

    pub fn last(&self) -> Option<&str> {
        self.most_recent_index().map(|i| self.slots[i].as_str())
    }

    pub fn entry_at(&self, index: usize) -> Option<&str> {
        if index >= self.capacity() || self.count == 0 {
            return None;
        }
        let offset = (index + self.capacity() - self.oldest_index()) % self.capacity();
        (offset < self.count).then(|| self.slots[index].as_str())
    }

    /// Up arrow. Clamps at the oldest entry instead of wrapping.
    pub fn move_back(&mut self) -> CursorMove {
        let Some(newest) = self.most_recent_index() else {
            return CursorMove::Unchanged;
        };
        let target = match self.cursor {
            None => newest,
            Some(current) if current == self.oldest_index() => return CursorMove::Unchanged,
            Some(current) => (current + self.capacity() - 1) % self.capacity(),
        };
        self.cursor = Some(target);
        CursorMove::Moved(target)
    }

    /// Down arrow. Stepping past the newest entry ends browsing.
    pub fn move_forward(&mut self) -> CursorMove {
        let Some(current) = self.cursor else {
            return CursorMove::Unchanged;
        };
        if Some(current) == self.most_recent_index() {
            self.cursor = None;
            return CursorMove::Cleared;
        }
        let target = (current + 1) % self.capacity();
        self.cursor = Some(target);
        CursorMove::Moved(target)
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        let start = self.oldest_index();
        (0..self.count).map(move |i| self.slots[(start + i) % self.capacity()].as_str())
    }
}
