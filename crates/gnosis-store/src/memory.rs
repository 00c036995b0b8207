use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};

use parking_lot::RwLock;
use tracing::info;

use gnosis_codec::{pair, unpair, Encoded, Identity, Key, NIHIL};

use crate::{AttributeStore, Cargo, Result, StoreError};

/// Default in-memory [`AttributeStore`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<Key, Cargo>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn key(object: Identity, attribute: Identity) -> Key {
        pair(object, attribute)
    }
}

impl AttributeStore for MemoryStore {
    fn put(&self, key: Key, value: Cargo) {
        self.data.write().insert(key, value);
    }

    fn get(&self, key: Key) -> Option<Cargo> {
        self.data.read().get(&key).cloned()
    }

    fn erase(&self, key: Key) -> bool {
        self.data.write().remove(&key).is_some()
    }

    fn contains(&self, key: Key) -> bool {
        self.data.read().contains_key(&key)
    }

    fn size(&self) -> usize {
        self.data.read().len()
    }

    fn clear(&self) {
        self.data.write().clear();
    }

    fn change(&self, id: Identity, new_id: Identity, is_attribute: bool) {
        let mut data = self.data.write();

        // Snapshot the affected keys before mutating, so the rewrite is
        // atomic with respect to iteration order.
        let affected: Vec<Key> = data
            .keys()
            .copied()
            .filter(|&k| {
                let (obj, atr) = unpair(k);
                if is_attribute {
                    atr == id
                } else {
                    obj == id
                }
            })
            .collect();

        if new_id == NIHIL {
            for key in affected {
                data.remove(&key);
            }
            return;
        }

        for old_key in affected {
            let (obj, atr) = unpair(old_key);
            let new_key = if is_attribute {
                pair(obj, new_id)
            } else {
                pair(new_id, atr)
            };
            if let Some(value) = data.remove(&old_key) {
                // Last-writer-wins: a pre-existing entry under `new_key`
                // is silently overwritten.
                data.insert(new_key, value);
            }
        }
    }

    fn save(&self, path: &std::path::Path) -> Result<()> {
        let mut out = File::create(path)?;
        let data = self.data.read();
        for (&key, value) in data.iter() {
            let (obj, atr) = unpair(key);
            let line = match value {
                Cargo::Integer(v) => format!("{} {} i{}\n", Encoded::new(obj), Encoded::new(atr), v),
                Cargo::Rational(v) => format!("{} {} r{}\n", Encoded::new(obj), Encoded::new(atr), v),
                Cargo::Text(s) => format!("{} {} t{}\n", Encoded::new(obj), Encoded::new(atr), s),
                Cargo::None => format!("{} {} n\n", Encoded::new(obj), Encoded::new(atr)),
            };
            out.write_all(line.as_bytes())?;
        }
        info!(entries = data.len(), "attribute store saved");
        Ok(())
    }

    fn load(&self, path: &std::path::Path) -> Result<()> {
        let file = File::open(path)?;
        let mut data = self.data.write();
        data.clear();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(3, ' ');
            let obj = parts
                .next()
                .ok_or_else(|| StoreError::Malformed(line.clone()))?;
            let atr = parts
                .next()
                .ok_or_else(|| StoreError::Malformed(line.clone()))?;
            let tagged = parts
                .next()
                .ok_or_else(|| StoreError::Malformed(line.clone()))?;
            let obj = Encoded::parse(obj)
                .map_err(|e| StoreError::Malformed(e.to_string()))?
                .id();
            let atr = Encoded::parse(atr)
                .map_err(|e| StoreError::Malformed(e.to_string()))?
                .id();
            let (tag, rest) = tagged.split_at(1);
            let value = match tag {
                "i" => Cargo::Integer(
                    rest.parse()
                        .map_err(|_| StoreError::Malformed(line.clone()))?,
                ),
                "r" => Cargo::Rational(
                    rest.parse()
                        .map_err(|_| StoreError::Malformed(line.clone()))?,
                ),
                "t" => Cargo::text(rest),
                "n" => Cargo::None,
                _ => return Err(StoreError::Malformed(line)),
            };
            data.insert(pair(obj, atr), value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_erase() {
        let store = MemoryStore::new();
        let k = MemoryStore::key(1, 2);
        store.put(k, Cargo::Integer(42));
        assert_eq!(store.get(k), Some(Cargo::Integer(42)));
        assert!(store.erase(k));
        assert_eq!(store.get(k), None);
    }

    #[test]
    fn forget_drops_entries_with_matching_object() {
        let store = MemoryStore::new();
        store.put(MemoryStore::key(1, 2), Cargo::Integer(1));
        store.put(MemoryStore::key(1, 3), Cargo::Integer(2));
        store.put(MemoryStore::key(4, 2), Cargo::Integer(3));
        store.change(1, NIHIL, false);
        assert_eq!(store.size(), 1);
        assert!(store.contains(MemoryStore::key(4, 2)));
    }

    #[test]
    fn forget_drops_entries_with_matching_attribute() {
        let store = MemoryStore::new();
        store.put(MemoryStore::key(1, 2), Cargo::Integer(1));
        store.put(MemoryStore::key(3, 2), Cargo::Integer(2));
        store.change(2, NIHIL, true);
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn rename_rewrites_object_component() {
        let store = MemoryStore::new();
        store.put(MemoryStore::key(1, 2), Cargo::Integer(7));
        store.change(1, 99, false);
        assert_eq!(store.get(MemoryStore::key(99, 2)), Some(Cargo::Integer(7)));
        assert_eq!(store.get(MemoryStore::key(1, 2)), None);
    }

    #[test]
    fn rename_rewrites_attribute_component() {
        let store = MemoryStore::new();
        store.put(MemoryStore::key(1, 2), Cargo::Integer(7));
        store.change(2, 99, true);
        assert_eq!(store.get(MemoryStore::key(1, 99)), Some(Cargo::Integer(7)));
    }
}
