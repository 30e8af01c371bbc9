use core::hash::Hash;
use core::ops::Deref;

use hashbrown::HashSet;

/// A vector that keeps only the first occurrence of each value.
#[derive(Debug, Clone)]
pub struct UniqueVec<T> {
    items: Vec<T>,
    seen: HashSet<T>,
}

impl<T> Default for UniqueVec<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

impl<T: Hash + Eq + Clone> UniqueVec<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the value was new.
    pub fn push(&mut self, value: T) -> bool {
        if self.seen.insert(value.clone()) {
            self.items.push(value);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.seen.contains(value)
    }
}

impl<T: Hash + Eq + Clone> Extend<T> for UniqueVec<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<T: Hash + Eq + Clone> FromIterator<T> for UniqueVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut result = Self::new();
        result.extend(iter);
        result
    }
}

impl<T> Deref for UniqueVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_first_occurrence_order() {
        let v: UniqueVec<_> = [3, 1, 3, 2, 1].into_iter().collect();
        assert_eq!(&*v, &[3, 1, 2]);
        assert!(v.contains(&2));
        assert!(!v.contains(&4));
    }
}
