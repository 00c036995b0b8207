//! Bounded signature sets and unbounded ordered sequences of identities.

mod sequence;
mod signature;

pub use sequence::Sequence;
pub use signature::{Signature, DEFAULT_SIGNATURE_CAPACITY};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("signature capacity {capacity} exceeded")]
    CapacityExceeded { capacity: usize },
}

pub type Result<T> = std::result::Result<T, CollectionError>;
