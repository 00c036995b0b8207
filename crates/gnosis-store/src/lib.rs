//! Attribute store: maps a `(object, attribute)` composite key to a tagged
//! [`Cargo`] value, and keeps those keys referentially sound as entities
//! are renamed, absorbed, or forgotten. See `spec.md` §4.5.

mod cargo;
mod memory;

pub use cargo::{Cargo, TEXT_CAPACITY};
pub use memory::MemoryStore;

use thiserror::Error;

use gnosis_codec::{Identity, Key};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed attribute store record: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A mapping from composite key to tagged value, with referential
/// integrity maintained via [`AttributeStore::change`].
pub trait AttributeStore {
    fn put(&self, key: Key, value: Cargo);
    fn get(&self, key: Key) -> Option<Cargo>;
    fn erase(&self, key: Key) -> bool;
    fn contains(&self, key: Key) -> bool;
    fn size(&self) -> usize;
    fn clear(&self);

    /// Reacts to a Gnosis change event `(id, new_id, is_attribute)`:
    /// `new_id == NIHIL` drops every entry whose key component selected
    /// by `is_attribute` equals `id`; otherwise every such entry is
    /// rewritten to use `new_id` in that component, preserving the value
    /// (last-writer-wins on collision).
    fn change(&self, id: Identity, new_id: Identity, is_attribute: bool);

    fn save(&self, path: &std::path::Path) -> Result<()>;
    fn load(&self, path: &std::path::Path) -> Result<()>;
}
