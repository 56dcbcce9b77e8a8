//! Sequential id allocation for declaration arenas.

use std::num::NonZeroU32;

use super::DeclId;

/// Type-safe counter for declaration ids.
///
/// - Ids start at 1 (never 0)
/// - Ids are generated sequentially, so an id doubles as an arena slot
/// - One counter per arena; arenas are built single-threaded
#[derive(Debug, Clone)]
pub struct DeclCounter {
    next_id: NonZeroU32,
}

impl DeclCounter {
    /// Creates a new counter starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: NonZeroU32::MIN,
        }
    }

    /// Generates the next declaration id.
    ///
    /// # Panics
    /// Panics if the counter would overflow (after 4 billion declarations).
    pub fn next_id(&mut self) -> DeclId {
        let current = self.next_id;
        self.next_id = current
            .checked_add(1)
            .expect("Declaration counter overflow - more than 4 billion declarations");
        DeclId(current.get())
    }

    /// Number of ids handed out so far.
    #[must_use]
    pub fn current_count(&self) -> u32 {
        self.next_id.get() - 1
    }

    pub fn reset(&mut self) {
        self.next_id = NonZeroU32::MIN;
    }
}

impl Default for DeclCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_starts_at_one() {
        let mut counter = DeclCounter::new();
        assert_eq!(counter.next_id().0, 1);
        assert_eq!(counter.next_id().0, 2);
    }

    #[test]
    fn test_current_count_and_reset() {
        let mut counter = DeclCounter::new();
        assert_eq!(counter.current_count(), 0);

        counter.next_id();
        counter.next_id();
        counter.next_id();
        assert_eq!(counter.current_count(), 3);

        counter.reset();
        assert_eq!(counter.current_count(), 0);
        assert_eq!(counter.next_id().0, 1);
    }
}
