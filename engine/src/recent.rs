use std::collections::VecDeque;

/// Newest-first sequence that keeps at most `capacity` entries.
#[derive(Debug, Clone)]
pub struct Recent<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Recent<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Prepends `item` and returns whatever fell off the tail.
    pub fn push(&mut self, item: T) -> Option<T> {
        self.items.push_front(item);
        if self.items.len() > self.capacity {
            self.items.pop_back()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn find_mut<P>(&mut self, mut pred: P) -> Option<&mut T>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.iter_mut().find(|item| pred(item))
    }
}

impl<T: Clone> Recent<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_newest_first() {
        let mut recent = Recent::new(3);
        recent.push(1);
        recent.push(2);
        recent.push(3);
        assert_eq!(recent.to_vec(), vec![3, 2, 1]);
    }

    #[test]
    fn test_push_beyond_capacity_evicts_oldest() {
        let mut recent = Recent::new(3);
        for n in 1..=3 {
            assert_eq!(recent.push(n), None);
        }
        assert_eq!(recent.push(4), Some(1));
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.to_vec(), vec![4, 3, 2]);
    }

    #[test]
    fn test_capacity_one_keeps_only_latest() {
        let mut recent = Recent::new(1);
        assert_eq!(recent.push("a"), None);
        assert_eq!(recent.push("b"), Some("a"));
        assert_eq!(recent.to_vec(), vec!["b"]);
    }

    #[test]
    fn test_find_mut_edits_in_place() {
        let mut recent = Recent::new(4);
        for n in 1..=4 {
            recent.push(n);
        }
        if let Some(item) = recent.find_mut(|n| *n == 2) {
            *item = 20;
        }
        assert_eq!(recent.to_vec(), vec![4, 3, 20, 1]);
        assert!(recent.find_mut(|n| *n == 99).is_none());
    }
}
