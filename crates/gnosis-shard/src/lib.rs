//! A shard owns `id mod N` of the graph: `id -> signature` and
//! `id -> sequence` tables, and serves asynchronous selection requests on
//! its own service thread. See `spec.md` §4.3.

mod query;

pub use query::{ShardQuery, ShardRequest};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

use gnosis_codec::Identity;
use gnosis_collections::{Sequence, Signature};

#[derive(Error, Debug)]
pub enum ShardError {
    #[error("shard {0} did not report live within the start timeout")]
    StartTimeout(String),
    #[error("signature capacity exceeded in shard {0}")]
    CapacityExceeded(String),
    #[error("shard {0} selection handshake failed after all attempts")]
    HandshakeFailed(String),
}

pub type Result<T> = std::result::Result<T, ShardError>;

struct Entry {
    signature: Signature,
    sequence: Option<Sequence>,
}

struct Shared {
    index: usize,
    name: String,
    capacity: usize,
    table: RwLock<HashMap<Identity, Entry>>,
    request: AtomicPtr<ShardRequest>,
    idle: AtomicBool,
    stop: AtomicBool,
    live: AtomicBool,
    spurt: Arc<AtomicBool>,
    no_job_pause: Duration,
}

/// A single-writer partition of the graph, `id mod N`.
#[derive(Clone)]
pub struct Shard {
    shared: Arc<Shared>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

const ATTEMPT_LIMIT: u32 = 8;
const START_TIMEOUT: Duration = Duration::from_millis(1000);

impl Shard {
    /// Starts the shard's service thread and waits for it to report live.
    pub fn start(
        index: usize,
        name: impl Into<String>,
        capacity: usize,
        spurt: Arc<AtomicBool>,
        no_job_pause: Duration,
    ) -> Result<Shard> {
        let name = name.into();
        let shared = Arc::new(Shared {
            index,
            name: name.clone(),
            capacity,
            table: RwLock::new(HashMap::new()),
            request: AtomicPtr::new(std::ptr::null_mut()),
            idle: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            live: AtomicBool::new(false),
            spurt,
            no_job_pause,
        });

        let service_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("gnosis-shard-{name}"))
            .spawn(move || service(service_shared))
            .expect("failed to spawn shard service thread");

        let started = Instant::now();
        while !shared.live.load(Ordering::Acquire) {
            if started.elapsed() > START_TIMEOUT {
                warn!(shard = %name, "shard failed to report live within start timeout");
                return Err(ShardError::StartTimeout(name));
            }
            thread::yield_now();
        }
        info!(shard = %name, "shard started");

        Ok(Shard {
            shared,
            worker: Arc::new(Mutex::new(Some(handle))),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn index(&self) -> usize {
        self.shared.index
    }

    pub fn active(&self) -> bool {
        self.shared.live.load(Ordering::Acquire)
    }

    pub fn idling(&self) -> bool {
        self.shared.idle.load(Ordering::Acquire)
    }

    pub fn size(&self) -> usize {
        self.shared.table.read().len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn contains(&self, id: Identity) -> bool {
        self.shared.table.read().contains_key(&id)
    }

    /// Returns `true` if `id` can be safely assigned a new entity: at
    /// tolerance 0 this is exact non-membership; at tolerance `t > 0` it
    /// additionally requires no existing key within Hamming distance `t`
    /// (the widening-proximity-tolerance rule `Gnosis::entity()` uses to
    /// retry after repeated collisions).
    pub fn vacant(&self, id: Identity, tolerance: u32) -> bool {
        let table = self.shared.table.read();
        if tolerance == 0 {
            return !table.contains_key(&id);
        }
        !table.keys().any(|&k| (k ^ id).count_ones() <= tolerance)
    }

    /// Inserts a freshly allocated entity with an empty signature.
    /// Returns `false` if `id` already exists.
    pub fn insert_entity(&self, id: Identity) -> bool {
        let mut table = self.shared.table.write();
        if table.contains_key(&id) {
            return false;
        }
        table.insert(
            id,
            Entry {
                signature: Signature::new(),
                sequence: None,
            },
        );
        true
    }

    /// Loads an entity with a pre-built signature (used by persistence
    /// load and by `entity()`'s congenital-setup / construction paths).
    pub fn insert_with_signature(&self, id: Identity, signature: Signature) {
        let mut table = self.shared.table.write();
        table.insert(
            id,
            Entry {
                signature,
                sequence: None,
            },
        );
    }

    pub fn remove_entity(&self, id: Identity) -> bool {
        self.shared.table.write().remove(&id).is_some()
    }

    pub fn signature(&self, id: Identity) -> Option<Signature> {
        self.shared.table.read().get(&id).map(|e| e.signature.clone())
    }

    pub fn sequence(&self, id: Identity) -> Option<Sequence> {
        self.shared
            .table
            .read()
            .get(&id)
            .and_then(|e| e.sequence.clone())
    }

    /// Assigns or clears the sequence attached to `id`. A default
    /// (empty) `seq` clears the stored sequence, matching the original's
    /// assign-or-erase behaviour.
    pub fn assign_sequence(&self, id: Identity, seq: Sequence) {
        let mut table = self.shared.table.write();
        if let Some(entry) = table.get_mut(&id) {
            if seq.is_empty() {
                entry.sequence = None;
            } else {
                entry.sequence = Some(seq);
            }
        }
    }

    /// Inserts `sign` into `id`'s signature. No heritable/mutex rewrite
    /// happens here — that logic belongs to `gnosis-core`, which calls
    /// this once per sign after resolving the rewrite rules.
    pub fn include_sign(&self, id: Identity, sign: Identity) -> Result<bool> {
        let mut table = self.shared.table.write();
        let entry = table
            .get_mut(&id)
            .expect("include_sign called with an id absent from its shard");
        entry
            .signature
            .insert(sign)
            .map_err(|_| ShardError::CapacityExceeded(self.shared.name.clone()))
    }

    pub fn exclude_sign(&self, id: Identity, sign: Identity) -> bool {
        let mut table = self.shared.table.write();
        match table.get_mut(&id) {
            Some(entry) => entry.signature.remove(sign),
            None => false,
        }
    }

    /// Deletion propagation: remove `sign` from every signature held by
    /// this shard. Keys (entity existence) are unchanged. Returns the
    /// number of signatures touched.
    pub fn forgotten(&self, sign: Identity) -> usize {
        let mut table = self.shared.table.write();
        let mut touched = 0;
        for entry in table.values_mut() {
            if entry.signature.remove(sign) {
                touched += 1;
            }
        }
        touched
    }

    /// Publishes a selection request via the two-atomic handshake
    /// protocol (`spec.md` §4.3, §9). Returns once the request has been
    /// accepted by the service thread — not once it has completed;
    /// callers poll [`Shard::idling`] for completion.
    ///
    /// # Safety invariant
    /// `request` must outlive the call to completion: the caller must
    /// observe `idling() == true` again before dropping or mutating it.
    /// The shard thread only dereferences the stored pointer between
    /// accepting a request (`idle` flips to `false`) and finishing it
    /// (`idle` flips back to `true`), so there is never more than one
    /// outstanding borrow.
    pub fn select(&self, request: &mut ShardRequest) -> Result<()> {
        for _ in 0..ATTEMPT_LIMIT {
            if self
                .shared
                .idle
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let ptr: *mut ShardRequest = request;
                for _ in 0..ATTEMPT_LIMIT {
                    if self
                        .shared
                        .request
                        .compare_exchange(
                            std::ptr::null_mut(),
                            ptr,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok()
                    {
                        return Ok(());
                    }
                    thread::yield_now();
                }
                // Failed to publish after accepting idle; hand idle back.
                self.shared.idle.store(true, Ordering::Release);
            }
            thread::yield_now();
        }
        Err(ShardError::HandshakeFailed(self.shared.name.clone()))
    }

    /// Removes every entity from this shard. Used by persistence load,
    /// which rebuilds shard contents from a dump.
    pub fn clear(&self) {
        self.shared.table.write().clear();
    }

    /// Snapshot of every `(id, signature)` pair currently held, for save.
    pub fn snapshot_signatures(&self) -> Vec<(Identity, Signature)> {
        self.shared
            .table
            .read()
            .iter()
            .map(|(&id, entry)| (id, entry.signature.clone()))
            .collect()
    }

    /// Snapshot of every `(id, sequence)` pair currently assigned, for save.
    pub fn snapshot_sequences(&self) -> Vec<(Identity, Sequence)> {
        self.shared
            .table
            .read()
            .iter()
            .filter_map(|(&id, entry)| entry.sequence.clone().map(|seq| (id, seq)))
            .collect()
    }

    pub fn terminate(&self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        debug!(shard = %self.name, "shard shared state dropped");
    }
}

fn service(shared: Arc<Shared>) {
    shared.idle.store(true, Ordering::Release);
    shared.live.store(true, Ordering::Release);

    while !shared.stop.load(Ordering::Acquire) {
        let ptr = shared.request.load(Ordering::Acquire);
        if ptr.is_null() {
            if shared.spurt.load(Ordering::Relaxed) {
                thread::yield_now();
            } else {
                thread::sleep(shared.no_job_pause);
            }
            continue;
        }

        // SAFETY: the dispatcher published this pointer via `select` and
        // will not touch it again until it observes `idle == true`, which
        // only happens after this block stores it back to null below.
        let request: &mut ShardRequest = unsafe { &mut *ptr };

        for query in request.iter_mut() {
            query.reset();
        }
        {
            let table = shared.table.read();
            for (&key, entry) in table.iter() {
                for query in request.iter_mut() {
                    if query.overrun {
                        continue;
                    }
                    if query.syndrome.len() > entry.signature.len() {
                        continue;
                    }
                    let matches = query.syndrome.is_empty()
                        || query
                            .syndrome
                            .iter()
                            .all(|&s| entry.signature.contains(s));
                    if matches {
                        query.push(key);
                    }
                }
            }
        }

        shared.request.store(std::ptr::null_mut(), Ordering::Release);
        shared.idle.store(true, Ordering::Release);
        thread::yield_now();
    }

    shared.live.store(false, Ordering::Release);
    shared.stop.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool as StdAtomicBool;

    fn spurt() -> Arc<StdAtomicBool> {
        Arc::new(StdAtomicBool::new(false))
    }

    #[test]
    fn start_and_terminate() {
        let shard = Shard::start(0, "test:000", 1024, spurt(), Duration::from_millis(5)).unwrap();
        assert!(shard.active());
        assert_eq!(shard.name(), "test:000");
        shard.terminate();
    }

    #[test]
    fn insert_contains_remove() {
        let shard = Shard::start(0, "test:001", 1024, spurt(), Duration::from_millis(5)).unwrap();
        assert!(shard.insert_entity(7));
        assert!(shard.contains(7));
        assert!(!shard.insert_entity(7));
        assert!(shard.remove_entity(7));
        assert!(!shard.contains(7));
        shard.terminate();
    }

    #[test]
    fn vacancy_tolerance_widens() {
        let shard = Shard::start(0, "test:002", 1024, spurt(), Duration::from_millis(5)).unwrap();
        shard.insert_entity(0b1000);
        assert!(!shard.vacant(0b1000, 0));
        assert!(shard.vacant(0b0001, 0));
        assert!(!shard.vacant(0b1001, 1)); // :one bit away from an occupied id
        shard.terminate();
    }

    #[test]
    fn forgotten_strips_sign_from_every_signature() {
        let shard = Shard::start(0, "test:003", 1024, spurt(), Duration::from_millis(5)).unwrap();
        shard.insert_entity(1);
        shard.insert_entity(2);
        shard.include_sign(1, 99).unwrap();
        shard.include_sign(2, 99).unwrap();
        let touched = shard.forgotten(99);
        assert_eq!(touched, 2);
        assert!(shard.contains(1));
        assert!(shard.contains(2));
        shard.terminate();
    }
}
