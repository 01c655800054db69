//! Fixed-capacity history with oldest-first eviction
//!
//! Used for every capped record in the learning core: learning curves,
//! adaptation histories, strategy performance logs, and sliding windows.
//! Eviction happens on push, so the container never grows past capacity.

use serde::{Deserialize, Serialize};
use std::collections::vec_deque::{self, VecDeque};

/// A bounded deque that drops its oldest entry when full
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// Create an empty history holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, returning the evicted oldest entry if the history was full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Remove and return the newest entry
    pub fn pop_newest(&mut self) -> Option<T> {
        self.items.pop_back()
    }

    pub fn newest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    /// Mutable access to the first entry matching `pred`
    pub fn find_mut(&mut self, mut pred: impl FnMut(&T) -> bool) -> Option<&mut T> {
        self.items.iter_mut().find(|item| pred(item))
    }

    /// Mutable access to the newest entry matching `pred`
    pub fn rfind_mut(&mut self, mut pred: impl FnMut(&T) -> bool) -> Option<&mut T> {
        self.items.iter_mut().rev().find(|item| pred(item))
    }

    /// Keep only the entries matching `pred`, preserving order
    pub fn retain(&mut self, pred: impl FnMut(&T) -> bool) {
        self.items.retain(pred);
    }
}

impl<T: Clone> BoundedHistory<T> {
    /// Copy the contents oldest to newest
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<'a, T> IntoIterator for &'a BoundedHistory<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut history = BoundedHistory::new(3);
        for i in 0..5 {
            history.push(i);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.to_vec(), vec![2, 3, 4]);
    }

    #[test]
    fn test_push_reports_evicted() {
        let mut history = BoundedHistory::new(2);
        assert_eq!(history.push("a"), None);
        assert_eq!(history.push("b"), None);
        assert_eq!(history.push("c"), Some("a"));
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut history = BoundedHistory::new(0);
        history.push(1);
        history.push(2);
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.to_vec(), vec![2]);
    }

    #[test]
    fn test_pop_newest() {
        let mut history = BoundedHistory::new(4);
        history.push(1);
        history.push(2);
        assert_eq!(history.pop_newest(), Some(2));
        assert_eq!(history.newest(), Some(&1));
    }

    #[test]
    fn test_find_from_either_end() {
        let mut history = BoundedHistory::new(4);
        for i in [1, 2, 3, 4] {
            history.push(i);
        }
        *history.find_mut(|v| v % 2 == 0).unwrap() *= 10;
        *history.rfind_mut(|v| v % 2 == 0).unwrap() *= 10;
        assert_eq!(history.to_vec(), vec![1, 20, 3, 40]);
    }

    #[test]
    fn test_retain_keeps_order() {
        let mut history = BoundedHistory::new(4);
        for i in [1, 2, 3, 4] {
            history.push(i);
        }
        history.retain(|v| *v != 2);
        assert_eq!(history.to_vec(), vec![1, 3, 4]);
        assert!(!history.is_full());
    }
}
