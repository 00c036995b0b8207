use gnosis_codec::Identity;

/// Ordered list of identities attached to an entity, distinct from its
/// signature. No deduplication — identities may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    elements: Vec<Identity>,
}

impl Sequence {
    pub fn new() -> Self {
        Sequence { elements: Vec::new() }
    }

    pub fn append(&mut self, id: Identity) {
        self.elements.push(id);
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Identity> {
        self.elements.get(index).copied()
    }

    pub fn reserve(&mut self, capacity: usize) {
        self.elements.reserve(capacity);
    }

    pub fn shrink(&mut self) {
        self.elements.shrink_to_fit();
    }

    pub fn iter(&self) -> impl Iterator<Item = Identity> + '_ {
        self.elements.iter().copied()
    }
}

impl From<Vec<Identity>> for Sequence {
    fn from(elements: Vec<Identity>) -> Self {
        Sequence { elements }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order_and_duplicates() {
        let mut q = Sequence::new();
        q.append(1);
        q.append(1);
        q.append(2);
        assert_eq!(q.len(), 3);
        assert_eq!(q.get(0), Some(1));
        assert_eq!(q.get(1), Some(1));
        assert_eq!(q.get(2), Some(2));
    }

    #[test]
    fn clear_empties() {
        let mut q = Sequence::new();
        q.append(1);
        q.clear();
        assert!(q.is_empty());
    }
}
