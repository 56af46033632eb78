//! Bounded FIFO log ring

use std::collections::VecDeque;

use crate::domain::{LogEntry, LogFilter};

/// Keeps the newest `capacity` entries, evicting the oldest first
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, returning the evicted entry if the ring was full
    pub fn push(&mut self, entry: LogEntry) -> Option<LogEntry> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest retained entry
    pub fn oldest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Entries matching `filter`, oldest first
    pub fn filtered(&self, filter: &LogFilter) -> Vec<LogEntry> {
        self.entries.iter().filter(|e| filter.matches(e)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LogLevel;
    use chrono::Utc;
    use proptest::prelude::*;

    fn entry(id: u64) -> LogEntry {
        LogEntry {
            id,
            timestamp: Utc::now(),
            level: LogLevel::Info,
            component: "System".to_string(),
            message: format!("entry {id}"),
        }
    }

    #[test]
    fn test_thousand_and_first_evicts_oldest() {
        let mut buffer = LogBuffer::new(1000);
        for id in 1..=1000 {
            assert!(buffer.push(entry(id)).is_none());
        }
        assert_eq!(buffer.len(), 1000);

        let evicted = buffer.push(entry(1001)).unwrap();
        assert_eq!(evicted.id, 1);
        assert_eq!(buffer.len(), 1000);
        assert_eq!(buffer.oldest().unwrap().id, 2);
    }

    #[test]
    fn test_clear() {
        let mut buffer = LogBuffer::new(4);
        buffer.push(entry(1));
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let buffer = LogBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
    }

    proptest! {
        #[test]
        fn prop_length_never_exceeds_capacity(capacity in 1usize..64, pushes in 0u64..256) {
            let mut buffer = LogBuffer::new(capacity);
            for id in 0..pushes {
                buffer.push(entry(id));
                prop_assert!(buffer.len() <= capacity);
            }
            let expected_oldest = pushes.saturating_sub(capacity as u64);
            if pushes > 0 {
                prop_assert_eq!(buffer.oldest().unwrap().id, expected_oldest);
            }
        }
    }
}
