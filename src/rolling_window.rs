//! Fixed-capacity, oldest-evicted-first buffer.
//!
//! Used for both the bounded session history and the health-check window.
//! Insertion order is preserved; pushing into a full window evicts the
//! oldest entry.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::VecDeque;
use std::collections::vec_deque;

/// A FIFO buffer that never holds more than `capacity` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingWindow<T> {
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T> RollingWindow<T> {
    /// Creates an empty window.
    ///
    /// A capacity of zero is raised to one so the window can always hold
    /// the most recent entry.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let bounded = capacity.max(1);
        Self {
            capacity: bounded,
            entries: VecDeque::with_capacity(bounded),
        }
    }

    /// Appends an entry, returning the evicted oldest entry when full.
    pub fn push(&mut self, entry: T) -> Option<T> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Returns the maximum number of retained entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the window holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the oldest retained entry.
    #[must_use]
    pub fn oldest(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Iterates entries from oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.entries.iter()
    }
}

impl<T: Clone> RollingWindow<T> {
    /// Copies the retained entries, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<'a, T> IntoIterator for &'a RollingWindow<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[derive(Serialize, Deserialize)]
struct WindowRepr<T> {
    capacity: usize,
    entries: Vec<T>,
}

impl<T: Serialize + Clone> Serialize for RollingWindow<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WindowRepr {
            capacity: self.capacity,
            entries: self.to_vec(),
        }
        .serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for RollingWindow<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = WindowRepr::<T>::deserialize(deserializer)?;
        let mut window = Self::new(repr.capacity);
        for entry in repr.entries {
            window.push(entry);
        }
        Ok(window)
    }
}
