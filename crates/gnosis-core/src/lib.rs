//! Gnosis core: owns the shard pool and congenital concepts, and exposes
//! the operations that read and write the knowledge graph. See
//! `spec.md` §4.4.

mod congenital;

pub use congenital::Congenital;

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use gnosis_codec::{Encoded, Identity, NIHIL, RANDOM_ID_BITS};
use gnosis_collections::{Sequence, Signature, DEFAULT_SIGNATURE_CAPACITY};
use gnosis_shard::{Shard, ShardError, ShardQuery, ShardRequest};

#[derive(Error, Debug)]
pub enum GnosisError {
    #[error("no vacant id found within the widest proximity tolerance")]
    CapacityExceeded,
    #[error("entity {0} does not exist")]
    NoSuchEntity(Identity),
    #[error("signature capacity exceeded for entity {0}")]
    SignatureCapacityExceeded(Identity),
    #[error(transparent)]
    Shard(#[from] ShardError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed persistence record: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, GnosisError>;

/// Numeric constants the original fixes in `Config::gnosis`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub number_of_segments: usize,
    pub capacity_of_segment: usize,
    pub capacity_of_syndrome: usize,
    pub capacity_of_selection: usize,
    pub no_job_pause_ms: u64,
    pub attempt_limit: u32,
    pub max_tolerance: u32,
    pub syndromes_filename: String,
    pub sequences_filename: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            number_of_segments: 8,
            capacity_of_segment: 128 * 1024,
            capacity_of_syndrome: DEFAULT_SIGNATURE_CAPACITY,
            capacity_of_selection: 1024,
            no_job_pause_ms: 50,
            attempt_limit: 32,
            max_tolerance: 6,
            syndromes_filename: "syndromes".to_string(),
            sequences_filename: "sequences".to_string(),
        }
    }
}

type ChangeHandler = Box<dyn Fn(Identity, Identity, bool) + Send + 'static>;

/// A knowledge graph: a pool of shards, the congenital concepts every
/// instance is born with, and the change-event bus the attribute store
/// and glossary subscribe to.
pub struct Gnosis {
    title: String,
    config: CoreConfig,
    shards: Vec<Shard>,
    congenital: Congenital,
    handlers: Mutex<HashMap<Identity, ChangeHandler>>,
    rng: Mutex<ChaCha20Rng>,
    /// Raised by the pattern matcher while a match is in flight; shard
    /// idle loops switch from sleeping to yielding while it is set.
    spurt: Arc<AtomicBool>,
}

impl Gnosis {
    pub fn new(title: impl Into<String>, config: CoreConfig) -> Result<Self> {
        let title = title.into();
        let spurt = Arc::new(AtomicBool::new(false));
        let no_job_pause = Duration::from_millis(config.no_job_pause_ms);

        let mut shards = Vec::with_capacity(config.number_of_segments);
        for index in 0..config.number_of_segments {
            let name = format!("{title}:{:03}", index + 1);
            shards.push(Shard::start(
                index,
                name,
                config.capacity_of_segment,
                Arc::clone(&spurt),
                no_job_pause,
            )?);
        }
        info!(title = %title, segments = config.number_of_segments, "gnosis segments activated");

        let gnosis = Gnosis {
            title,
            shards,
            congenital: Congenital::new(),
            handlers: Mutex::new(HashMap::new()),
            rng: Mutex::new(ChaCha20Rng::from_entropy()),
            spurt,
            config,
        };
        gnosis.bootstrap_congenital()?;
        Ok(gnosis)
    }

    fn bootstrap_congenital(&self) -> Result<()> {
        let c = &self.congenital;
        for (_, id) in c.entries() {
            if !self.shard(id).insert_entity(id) {
                return Err(GnosisError::Malformed(format!(
                    "duplicate congenital id {id}"
                )));
            }
        }
        // NAME must carry STRING and ATTRIBUTE before every congenital
        // entity (including NAME itself) becomes IMMUTABLE below.
        self.shard(c.name).include_sign(c.name, c.string)?;
        self.shard(c.name).include_sign(c.name, c.attribute)?;

        for (_, id) in c.entries() {
            self.shard(id).include_sign(id, c.immutable)?;
            self.shard(id).include_sign(id, c.immortal)?;
        }

        if self.size() != c.entries().len() {
            return Err(GnosisError::Malformed(format!(
                "invalid initial size: expected {}, actual {}",
                c.entries().len(),
                self.size()
            )));
        }
        info!(count = c.entries().len(), "congenital concepts created");
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn congenital(&self) -> &Congenital {
        &self.congenital
    }

    pub fn spurt(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.spurt)
    }

    fn shard(&self, id: Identity) -> &Shard {
        &self.shards[(id as usize) % self.shards.len()]
    }

    pub fn exist(&self, id: Identity) -> bool {
        id != NIHIL && self.shard(id).contains(id)
    }

    pub fn none(&self) -> Identity {
        NIHIL
    }

    pub fn size(&self) -> usize {
        self.shards.iter().map(|s| s.size()).sum()
    }

    /// Every entity id currently held across all shards. Used by the
    /// glossary's `dump` and similar whole-graph sweeps; not meant for
    /// hot paths.
    pub fn entities(&self) -> Vec<Identity> {
        self.shards
            .iter()
            .flat_map(|s| s.snapshot_signatures().into_iter().map(|(id, _)| id))
            .collect()
    }

    /// Reconstructs a handle to an existing entity by id.
    pub fn recover(&self, id: Identity) -> Result<Identity> {
        if !self.exist(id) {
            return Err(GnosisError::NoSuchEntity(id));
        }
        Ok(id)
    }

    /// Allocates a fresh entity with an empty signature. Id is a uniform
    /// draw masked to [`RANDOM_ID_BITS`]; on repeated collision the
    /// vacancy check's proximity tolerance widens up to
    /// `config.max_tolerance`, matching `Gnosis::entity()`.
    pub fn entity(&self) -> Result<Identity> {
        for tolerance in 0..=self.config.max_tolerance {
            for _ in 0..self.config.attempt_limit {
                let id = self.random_id_draw();
                if id == NIHIL {
                    continue;
                }
                let shard = self.shard(id);
                if shard.vacant(id, tolerance) {
                    shard.insert_entity(id);
                    return Ok(id);
                }
            }
        }
        warn!(
            capacity = self.size(),
            "no vacant id found within the widest proximity tolerance"
        );
        Err(GnosisError::CapacityExceeded)
    }

    pub fn entity_with_syndrome(&self, syndrome: &[Identity]) -> Result<Identity> {
        let id = self.entity()?;
        for &sign in syndrome {
            self.incl(id, sign)?;
        }
        Ok(id)
    }

    fn random_id_draw(&self) -> Identity {
        let mask: u32 = (1u32 << RANDOM_ID_BITS) - 1;
        self.rng.lock().next_u32() & mask
    }

    pub fn signature(&self, id: Identity) -> Signature {
        self.shard(id)
            .signature(id)
            .unwrap_or_else(|| Signature::with_capacity(self.config.capacity_of_syndrome))
    }

    pub fn sequence(&self, id: Identity) -> Option<Sequence> {
        self.shard(id).sequence(id)
    }

    /// Assigns (or, given an empty sequence, clears) `id`'s sequence.
    /// Refused (returns `false`) if `id` is `IMMUTABLE`.
    pub fn assign_sequence(&self, id: Identity, seq: Sequence) -> bool {
        if self.is(id, self.congenital.immutable) {
            return false;
        }
        self.shard(id).assign_sequence(id, seq);
        true
    }

    pub fn is(&self, id: Identity, sign: Identity) -> bool {
        if id == NIHIL || sign == NIHIL {
            return false;
        }
        self.signature(id).contains(sign)
    }

    /// `ATTRIBUTE`'s concrete subtype, or `NIHIL` if `id` isn't an
    /// attribute at all.
    pub fn type_of(&self, id: Identity) -> Identity {
        let c = &self.congenital;
        if !self.is(id, c.attribute) {
            return NIHIL;
        }
        if self.is(id, c.integer) {
            return c.integer;
        }
        if self.is(id, c.rational) {
            return c.rational;
        }
        if self.is(id, c.string) {
            return c.string;
        }
        NIHIL
    }

    /// Members of `id`'s own signature that are themselves tagged
    /// `ATTRIBUTE`.
    pub fn attributes(&self, id: Identity) -> Vec<Identity> {
        self.signature(id)
            .iter()
            .filter(|&sign| self.is(sign, self.congenital.attribute))
            .collect()
    }

    /// `incl(entity, sign)`: applies the heritable and mutual-exclusion
    /// rewrite rules derived from `sign`'s own signature, then inserts
    /// `sign` itself. Silently ignored if `entity` is `IMMUTABLE`.
    pub fn incl(&self, id: Identity, sign: Identity) -> Result<()> {
        if sign == NIHIL {
            return Ok(());
        }
        if self.is(id, self.congenital.immutable) {
            return Ok(());
        }
        for sign_sign in self.signature(sign).iter() {
            if self.is(sign_sign, self.congenital.heritable) {
                self.shard(id)
                    .include_sign(id, sign_sign)
                    .map_err(|_| GnosisError::SignatureCapacityExceeded(id))?;
            }
            if self.is(sign_sign, self.congenital.mutex) {
                for excluded in self.explicate(sign_sign)? {
                    self.shard(id).exclude_sign(id, excluded);
                }
            }
        }
        self.shard(id)
            .include_sign(id, sign)
            .map_err(|_| GnosisError::SignatureCapacityExceeded(id))?;
        Ok(())
    }

    pub fn incl_many(&self, id: Identity, signs: &[Identity]) -> Result<()> {
        for &sign in signs {
            self.incl(id, sign)?;
        }
        Ok(())
    }

    pub fn excl(&self, id: Identity, sign: Identity) -> Result<()> {
        if sign == NIHIL || self.is(id, self.congenital.immutable) {
            return Ok(());
        }
        self.shard(id).exclude_sign(id, sign);
        Ok(())
    }

    pub fn excl_many(&self, id: Identity, signs: &[Identity]) -> Result<()> {
        for &sign in signs {
            self.excl(id, sign)?;
        }
        Ok(())
    }

    /// `{ e : sign ∈ e.signature }`, via a single-syndrome selection.
    pub fn explicate(&self, sign: Identity) -> Result<Vec<Identity>> {
        let mut syndrome = Signature::with_capacity(1);
        let _ = syndrome.insert(sign);
        let mut out = Vec::new();
        self.select(&[&syndrome], |_, id| out.push(id))?;
        Ok(out)
    }

    /// Entities sharing `id`'s own signature, excluding the signs in
    /// `mask` from the comparison.
    pub fn affined(&self, id: Identity, mask: &[Identity]) -> Result<Vec<Identity>> {
        let mut syndrome = self.signature(id);
        for &m in mask {
            syndrome.remove(m);
        }
        let mut out = Vec::new();
        self.select(&[&syndrome], |_, e| out.push(e))?;
        Ok(out)
    }

    /// `forget(id, skip_check)`: refused for `IMMORTAL` entities. Unless
    /// `skip_check`, strips `id` from every signature before deleting the
    /// node; callers that already know `id`'s explication is empty may
    /// pass `skip_check = true` to skip that sweep.
    pub fn forget(&self, id: Identity, skip_check: bool) -> Result<bool> {
        if id == NIHIL || !self.exist(id) {
            return Ok(false);
        }
        if self.is(id, self.congenital.immortal) {
            return Ok(false);
        }
        let is_attribute = self.is(id, self.congenital.attribute);
        self.notify(id, NIHIL, is_attribute);
        if !skip_check {
            let touched: usize = self.shards.iter().map(|s| s.forgotten(id)).sum();
            if touched > 0 {
                info!(id, touched, "entity excluded from dependent syndromes");
            }
        }
        self.shard(id).remove_entity(id);
        Ok(true)
    }

    /// `host` absorbs `guest`: signs and children of `guest` are
    /// reparented onto `host`, then `guest` is forgotten. Refused if
    /// `guest` is `IMMORTAL`, `host` is `IMMUTABLE`, or any child of
    /// `guest` is `IMMUTABLE`.
    pub fn absorb(&self, host: Identity, guest: Identity) -> Result<bool> {
        if self.is(guest, self.congenital.immortal) {
            return Ok(false);
        }
        if self.is(host, self.congenital.immutable) {
            return Ok(false);
        }
        let children = self.explicate(guest)?;
        for &child in &children {
            if self.is(child, self.congenital.immutable) {
                return Ok(false);
            }
        }
        for sign in self.signature(guest).iter() {
            self.incl(host, sign)?;
            self.excl(guest, sign)?;
        }
        for &child in &children {
            self.incl(child, host)?;
            self.excl(child, guest)?;
        }
        self.notify(guest, host, false);
        self.forget(guest, false)?;
        Ok(true)
    }

    /// Dispatches one query per syndrome to every shard and invokes `f`
    /// for each match with `(syndrome_index, id)`. Returns the total
    /// number of matches across every syndrome and shard.
    pub fn select(
        &self,
        syndromes: &[&Signature],
        mut f: impl FnMut(usize, Identity),
    ) -> Result<usize> {
        let n = syndromes.len();
        if n == 0 {
            return Ok(0);
        }
        let capacity = self.config.capacity_of_selection;
        let mut requests: Vec<ShardRequest> = (0..self.shards.len())
            .map(|_| {
                syndromes
                    .iter()
                    .map(|s| ShardQuery::new(s.iter().collect(), capacity))
                    .collect()
            })
            .collect();

        for (shard, request) in self.shards.iter().zip(requests.iter_mut()) {
            shard.select(request)?;
        }

        let mut finished = vec![false; self.shards.len()];
        let mut total = 0usize;
        loop {
            std::thread::yield_now();
            let mut done = true;
            for (i, shard) in self.shards.iter().enumerate() {
                if finished[i] {
                    continue;
                }
                if shard.idling() {
                    for (idx, query) in requests[i].iter().enumerate() {
                        total += query.num();
                        for &id in &query.storage {
                            f(idx, id);
                        }
                    }
                    finished[i] = true;
                } else {
                    done = false;
                }
            }
            if done {
                break;
            }
        }
        Ok(total)
    }

    pub fn set_of_entities(&self, syndrome: &Signature) -> Result<Vec<Identity>> {
        let mut out = Vec::new();
        self.select(&[syndrome], |_, id| out.push(id))?;
        Ok(out)
    }

    pub fn set_of_entities_tabu(&self, syndrome: &Signature, tabu: &Signature) -> Result<Vec<Identity>> {
        let mut out = Vec::new();
        self.select(&[syndrome], |_, id| {
            if self.signature(id).intersection(tabu).is_empty() {
                out.push(id);
            }
        })?;
        Ok(out)
    }

    /// `id` iff exactly one entity matches `syndrome`, else `NIHIL`.
    pub fn unique_entity_id(&self, syndrome: &Signature) -> Result<Identity> {
        let mut found = NIHIL;
        let mut ambiguous = false;
        self.select(&[syndrome], |_, id| {
            if ambiguous {
                return;
            }
            if found == NIHIL {
                found = id;
            } else if found != id {
                ambiguous = true;
            }
        })?;
        Ok(if ambiguous { NIHIL } else { found })
    }

    /// As [`Gnosis::unique_entity_id`], additionally requiring the
    /// match's own signature not to intersect `tabu`.
    pub fn unique_entity(&self, syndrome: &Signature, tabu: &Signature) -> Result<Identity> {
        let mut found = NIHIL;
        let mut ambiguous = false;
        self.select(&[syndrome], |_, id| {
            if ambiguous || !self.signature(id).intersection(tabu).is_empty() {
                return;
            }
            if found == NIHIL {
                found = id;
            } else if found != id {
                ambiguous = true;
            }
        })?;
        Ok(if ambiguous { NIHIL } else { found })
    }

    /// Registers a change-event handler; returns a handle drawn from the
    /// same random-identity pool `entity()` uses, guaranteed not to
    /// collide with an existing entity id or another live handle.
    pub fn on_change_incl(&self, f: impl Fn(Identity, Identity, bool) + Send + 'static) -> Identity {
        let mut handlers = self.handlers.lock();
        loop {
            let key = self.random_id_draw();
            if key == NIHIL || self.exist(key) || handlers.contains_key(&key) {
                continue;
            }
            handlers.insert(key, Box::new(f));
            return key;
        }
    }

    pub fn on_change_excl(&self, handle: Identity) -> bool {
        self.handlers.lock().remove(&handle).is_some()
    }

    fn notify(&self, old_id: Identity, new_id: Identity, is_attribute: bool) {
        for handler in self.handlers.lock().values() {
            handler(old_id, new_id, is_attribute);
        }
    }

    /// Saves every shard's signatures and sequences as two text files
    /// under `folder`: one line per entity, encoded id then encoded
    /// members separated by spaces.
    pub fn save(&self, folder: &Path) -> Result<()> {
        info!(folder = %folder.display(), "saving gnosis graph");
        fs::create_dir_all(folder)?;
        let mut syndromes = File::create(folder.join(&self.config.syndromes_filename))?;
        let mut sequences = File::create(folder.join(&self.config.sequences_filename))?;

        let mut ns = 0usize;
        let mut nq = 0usize;
        for shard in &self.shards {
            for (id, signature) in shard.snapshot_signatures() {
                write_record(&mut syndromes, id, signature.iter())?;
                ns += 1;
            }
            for (id, sequence) in shard.snapshot_sequences() {
                write_record(&mut sequences, id, sequence.iter())?;
                nq += 1;
            }
        }
        info!(syndromes = ns, sequences = nq, "gnosis graph saved");
        Ok(())
    }

    /// Loads a dump written by [`Gnosis::save`], replacing every shard's
    /// contents. Congenital concepts are not re-seeded; the dump is
    /// expected to already contain them.
    pub fn load(&self, folder: &Path) -> Result<()> {
        info!(folder = %folder.display(), "loading gnosis graph");
        for shard in &self.shards {
            shard.clear();
        }

        let syndromes_path = folder.join(&self.config.syndromes_filename);
        let mut num = 0usize;
        for line in BufReader::new(File::open(&syndromes_path)?).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let id = parse_token(tokens.next(), &line)?;
            let mut signature = Signature::with_capacity(self.config.capacity_of_syndrome);
            for token in tokens {
                let sign = Encoded::parse(token)
                    .map_err(|e| GnosisError::Malformed(e.to_string()))?
                    .id();
                signature
                    .insert(sign)
                    .map_err(|_| GnosisError::SignatureCapacityExceeded(id))?;
            }
            self.shard(id).insert_with_signature(id, signature);
            num += 1;
        }
        info!(entities = num, "gnosis syndromes loaded");

        let sequences_path = folder.join(&self.config.sequences_filename);
        let mut nq = 0usize;
        for line in BufReader::new(File::open(&sequences_path)?).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let id = parse_token(tokens.next(), &line)?;
            if !self.exist(id) {
                return Err(GnosisError::Malformed(format!(
                    "sequence of the non-existing entity {id}"
                )));
            }
            let mut sequence = Sequence::new();
            for token in tokens {
                let elem = Encoded::parse(token)
                    .map_err(|e| GnosisError::Malformed(e.to_string()))?
                    .id();
                sequence.append(elem);
            }
            self.shard(id).assign_sequence(id, sequence);
            nq += 1;
        }
        info!(sequences = nq, "gnosis sequences loaded");
        Ok(())
    }

    pub fn finish(&self) {
        for shard in &self.shards {
            shard.terminate();
        }
    }
}

fn write_record(out: &mut File, id: Identity, members: impl Iterator<Item = Identity>) -> Result<()> {
    let mut line = Encoded::new(id).to_string();
    for member in members {
        line.push(' ');
        line.push_str(&Encoded::new(member).to_string());
    }
    line.push('\n');
    out.write_all(line.as_bytes())?;
    Ok(())
}

fn parse_token(token: Option<&str>, line: &str) -> Result<Identity> {
    let token = token.ok_or_else(|| GnosisError::Malformed(line.to_string()))?;
    Ok(Encoded::parse(token)
        .map_err(|e| GnosisError::Malformed(e.to_string()))?
        .id())
}

impl Drop for Gnosis {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> CoreConfig {
        CoreConfig {
            number_of_segments: 2,
            capacity_of_segment: 1024,
            ..CoreConfig::default()
        }
    }

    #[test]
    fn congenital_concepts_are_immutable_and_immortal() {
        let g = Gnosis::new("test", small_config()).unwrap();
        let c = *g.congenital();
        assert!(g.is(c.verb, c.immutable));
        assert!(g.is(c.verb, c.immortal));
        assert_eq!(g.size(), c.entries().len());
    }

    #[test]
    fn entity_allocation_and_recovery() {
        let g = Gnosis::new("test", small_config()).unwrap();
        let id = g.entity().unwrap();
        assert!(g.exist(id));
        assert_eq!(g.recover(id).unwrap(), id);
        assert!(g.recover(NIHIL).is_err());
    }

    #[test]
    fn scenario_immortality() {
        // spec.md §8, scenario 3
        let g = Gnosis::new("test", small_config()).unwrap();
        let c = *g.congenital();
        assert_eq!(g.forget(c.verb, false).unwrap(), false);
        assert!(g.exist(c.verb));
    }

    #[test]
    fn scenario_mutual_exclusion_at_assignment() {
        // spec.md §8, scenario 5
        let g = Gnosis::new("test", small_config()).unwrap();
        let c = *g.congenital();
        let category = g.entity().unwrap();
        g.incl(category, c.mutex).unwrap();

        let red = g.entity().unwrap();
        g.incl(red, category).unwrap();
        let blue = g.entity().unwrap();
        g.incl(blue, category).unwrap();

        let apple = g.entity().unwrap();
        g.incl(apple, red).unwrap();
        assert!(g.is(apple, red));
        g.incl(apple, blue).unwrap();
        assert!(g.is(apple, blue));
        assert!(!g.is(apple, red));
    }

    #[test]
    fn scenario_heritable_signs_propagate() {
        let g = Gnosis::new("test", small_config()).unwrap();
        let c = *g.congenital();
        let trait_sign = g.entity().unwrap();
        g.incl(trait_sign, c.heritable).unwrap();

        let base = g.entity().unwrap();
        g.incl(base, trait_sign).unwrap();

        let derived = g.entity().unwrap();
        g.incl(derived, base).unwrap();
        assert!(g.is(derived, trait_sign));
    }

    #[test]
    fn scenario_forget_with_references() {
        // spec.md §8, scenario 2
        let g = Gnosis::new("test", small_config()).unwrap();
        let sign = g.entity().unwrap();
        let holder = g.entity().unwrap();
        g.incl(holder, sign).unwrap();
        assert!(g.forget(sign, false).unwrap());
        assert!(!g.is(holder, sign));
    }

    #[test]
    fn scenario_absorption_of_children() {
        // spec.md §8, scenario 4
        let g = Gnosis::new("test", small_config()).unwrap();
        let host = g.entity().unwrap();
        let guest = g.entity().unwrap();
        let shared_sign = g.entity().unwrap();
        g.incl(guest, shared_sign).unwrap();
        let child = g.entity().unwrap();
        g.incl(child, guest).unwrap();

        assert!(g.absorb(host, guest).unwrap());
        assert!(!g.exist(guest));
        assert!(g.is(host, shared_sign));
        assert!(g.is(child, host));
    }

    #[test]
    fn unique_entity_id_requires_exactly_one_match() {
        let g = Gnosis::new("test", small_config()).unwrap();
        let tag = g.entity().unwrap();
        let mut syndrome = Signature::new();
        syndrome.insert(tag).unwrap();

        assert_eq!(g.unique_entity_id(&syndrome).unwrap(), NIHIL);

        let only = g.entity().unwrap();
        g.incl(only, tag).unwrap();
        assert_eq!(g.unique_entity_id(&syndrome).unwrap(), only);

        let other = g.entity().unwrap();
        g.incl(other, tag).unwrap();
        assert_eq!(g.unique_entity_id(&syndrome).unwrap(), NIHIL);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("gnosis-core-test-{}", std::process::id()));
        let g = Gnosis::new("test", small_config()).unwrap();
        let a = g.entity().unwrap();
        let b = g.entity().unwrap();
        g.incl(a, b).unwrap();

        g.save(&dir).unwrap();

        let g2 = Gnosis::new("test-reload", small_config()).unwrap();
        g2.load(&dir).unwrap();
        assert!(g2.exist(a));
        assert!(g2.is(a, b));

        let _ = fs::remove_dir_all(&dir);
    }
}
