use std::collections::HashSet;

use gnosis_codec::Identity;

use crate::{CollectionError, Result};

/// Design-time bound on signature size; the original's `CAPACITY_OF_SYNDROME`.
pub const DEFAULT_SIGNATURE_CAPACITY: usize = 127;

/// Set of identities attached to an entity. Enumeration order is
/// unspecified and must not be relied upon; only membership and size are
/// observable contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    members: HashSet<Identity>,
    capacity: usize,
}

impl Signature {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SIGNATURE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Signature {
            members: HashSet::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: Identity) -> bool {
        self.members.contains(&id)
    }

    /// Returns `true` if every member of `self` is also a member of
    /// `other` — equivalent to `self ⊆ other`.
    pub fn is_subset_of(&self, other: &Signature) -> bool {
        self.members.is_subset(&other.members)
    }

    /// Insert `id`; fails if the signature is already at capacity and
    /// `id` is not already a member.
    pub fn insert(&mut self, id: Identity) -> Result<bool> {
        if self.members.contains(&id) {
            return Ok(false);
        }
        if self.members.len() >= self.capacity {
            return Err(CollectionError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        Ok(self.members.insert(id))
    }

    pub fn remove(&mut self, id: Identity) -> bool {
        self.members.remove(&id)
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = Identity> + '_ {
        self.members.iter().copied()
    }

    pub fn intersection(&self, other: &Signature) -> Signature {
        Signature {
            members: self.members.intersection(&other.members).copied().collect(),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains() {
        let mut s = Signature::new();
        assert!(s.insert(7).unwrap());
        assert!(s.contains(7));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn reinserting_is_a_noop() {
        let mut s = Signature::new();
        s.insert(7).unwrap();
        assert!(!s.insert(7).unwrap());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut s = Signature::with_capacity(2);
        s.insert(1).unwrap();
        s.insert(2).unwrap();
        assert!(matches!(
            s.insert(3),
            Err(CollectionError::CapacityExceeded { capacity: 2 })
        ));
    }

    #[test]
    fn subset_relation() {
        let mut a = Signature::new();
        let mut b = Signature::new();
        a.insert(1).unwrap();
        b.insert(1).unwrap();
        b.insert(2).unwrap();
        assert!(a.is_subset_of(&b));
        assert!(!b.is_subset_of(&a));
    }
}
