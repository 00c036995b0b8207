//! Bidirectional name <-> entity map layered over a [`Gnosis`] instance.
//! Not part of `Gnosis` itself — a unit may keep several glossaries (for
//! several conversation channels) over the same graph. See `spec.md` §4.6.

mod names;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::info;

use gnosis_codec::{Encoded, Identity, NIHIL};
use gnosis_core::{Gnosis, GnosisError};

#[derive(Error, Debug)]
pub enum GlossaryError {
    #[error(transparent)]
    Gnosis(#[from] GnosisError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed glossary record: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, GlossaryError>;

struct Inner {
    gnosis: Arc<Gnosis>,
    lex: RwLock<HashMap<Identity, String>>,
    identity: RwLock<HashMap<String, Identity>>,
}

impl Inner {
    fn forget(&self, id: Identity) -> bool {
        let removed = self.lex.write().remove(&id);
        match removed {
            Some(name) => {
                self.identity.write().remove(&name);
                true
            }
            None => false,
        }
    }

    /// Defines, changes, or removes `id`'s name. Refuses to steal a name
    /// that currently resolves to a *different* identity.
    fn bind(&self, id: Identity, name: &str) -> bool {
        let mut lex = self.lex.write();
        let mut identity = self.identity.write();
        if let Some(old_name) = lex.get(&id).cloned() {
            if identity.get(&old_name) != Some(&id) {
                return false;
            }
            identity.remove(&old_name);
        }
        lex.insert(id, name.to_string());
        identity.insert(name.to_string(), id);
        true
    }
}

/// A glossary bound to exactly one [`Gnosis`] instance. Subscribes to its
/// change-event bus so a name is dropped the moment its entity is
/// forgotten or absorbed.
pub struct Glossary {
    inner: Arc<Inner>,
    change_handle: Identity,
}

impl Glossary {
    pub fn new(gnosis: Arc<Gnosis>) -> Self {
        let inner = Arc::new(Inner {
            gnosis: Arc::clone(&gnosis),
            lex: RwLock::new(HashMap::new()),
            identity: RwLock::new(HashMap::new()),
        });
        for (name, id) in names::congenital_names(gnosis.congenital()) {
            inner.bind(id, name);
        }
        info!(count = inner.lex.read().len(), "congenital names bound");

        let handler_inner = Arc::clone(&inner);
        let change_handle = gnosis.on_change_incl(move |id, _new_id, _is_attribute| {
            handler_inner.forget(id);
        });

        Glossary { inner, change_handle }
    }

    pub fn size(&self) -> usize {
        self.inner.lex.read().len()
    }

    /// Removes `id`'s name, if any. Returns `false` if it had none.
    pub fn forget(&self, id: Identity) -> bool {
        self.inner.forget(id)
    }

    /// Defines, renames, or (given an empty name) erases `id`'s binding.
    /// Fails only if `name` is already bound to a *different* identity.
    pub fn let_name(&self, id: Identity, name: &str) -> bool {
        if name.is_empty() {
            self.inner.forget(id);
            return true;
        }
        self.inner.bind(id, name)
    }

    /// Returns the entity already named `name`, or allocates a fresh one
    /// and binds it.
    pub fn entity(&self, name: &str) -> Result<Identity> {
        if name.is_empty() {
            return Ok(self.inner.gnosis.none());
        }
        if let Some(&id) = self.inner.identity.read().get(name) {
            return Ok(self.inner.gnosis.recover(id)?);
        }
        let id = self.inner.gnosis.entity()?;
        self.let_name(id, name);
        Ok(id)
    }

    pub fn entity_with_syndrome(&self, name: &str, syndrome: &[Identity]) -> Result<Identity> {
        let id = self.entity(name)?;
        if id != NIHIL {
            self.inner.gnosis.incl_many(id, syndrome)?;
        }
        Ok(id)
    }

    /// The entity named `name`, or `NIHIL` if no such name is bound.
    /// Never allocates.
    pub fn known(&self, name: &str) -> Identity {
        if name.is_empty() {
            return NIHIL;
        }
        self.inner.identity.read().get(name).copied().unwrap_or(NIHIL)
    }

    pub fn lex(&self, id: Identity) -> Option<String> {
        self.inner.lex.read().get(&id).cloned()
    }

    /// `id`'s name if bound, else its encoded-id token — always non-empty.
    pub fn lex_or_id(&self, id: Identity) -> String {
        self.lex(id).unwrap_or_else(|| Encoded::new(id).to_string())
    }

    /// Plain-text rendering of `id`'s own signature: `name: s1 s2 s3`.
    /// The original's color decoration (`arg` containing `'c'`) is out of
    /// scope and not reproduced here.
    pub fn definition(&self, id: Identity) -> String {
        let mut out = self.lex_or_id(id);
        out.push(':');
        for sign in self.inner.gnosis.signature(id).iter() {
            out.push(' ');
            out.push_str(&self.lex_or_id(sign));
        }
        out
    }

    /// Writes one definition line per non-congenital entity in the graph
    /// to `path`, for ad hoc inspection.
    pub fn dump(&self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "dumping glossary");
        let mut out = File::create(path)?;
        let congenital = *self.inner.gnosis.congenital();
        let mut n = 0usize;
        for id in self.inner.gnosis.entities() {
            if congenital.contains(id) {
                continue;
            }
            writeln!(out, "{};", self.definition(id))?;
            n += 1;
        }
        info!(entities = n, "glossary dumped");
        Ok(())
    }

    /// Saves every `(id, name)` binding as `ENC(id) name\n`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = File::create(path)?;
        let lex = self.inner.lex.read();
        for (&id, name) in lex.iter() {
            writeln!(out, "{} {}", Encoded::new(id), name)?;
        }
        info!(names = lex.len(), path = %path.display(), "glossary saved");
        Ok(())
    }

    /// Replaces every binding with the contents of a file written by
    /// [`Glossary::save`]. Every id must already exist in the bound
    /// `Gnosis` instance.
    pub fn load(&self, path: &Path) -> Result<()> {
        let file = File::open(path)?;
        self.inner.lex.write().clear();
        self.inner.identity.write().clear();
        let mut n = 0usize;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (token, name) = line
                .split_once(' ')
                .ok_or_else(|| GlossaryError::Malformed(line.clone()))?;
            if name.is_empty() {
                return Err(GlossaryError::Malformed(line));
            }
            let id = Encoded::parse(token)
                .map_err(|e| GlossaryError::Malformed(e.to_string()))?
                .id();
            if !self.inner.gnosis.exist(id) {
                return Err(GlossaryError::Malformed(format!(
                    "entity not found: `{name}` ({token})"
                )));
            }
            self.inner.bind(id, name);
            n += 1;
        }
        info!(names = n, path = %path.display(), "glossary loaded");
        Ok(())
    }
}

impl Drop for Glossary {
    fn drop(&mut self) {
        self.inner.gnosis.on_change_excl(self.change_handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnosis_core::CoreConfig;

    fn small_gnosis() -> Arc<Gnosis> {
        Arc::new(
            Gnosis::new(
                "glossary-test",
                CoreConfig {
                    number_of_segments: 2,
                    capacity_of_segment: 1024,
                    ..CoreConfig::default()
                },
            )
            .unwrap(),
        )
    }

    #[test]
    fn congenital_names_are_preseeded() {
        let g = small_gnosis();
        let glossary = Glossary::new(Arc::clone(&g));
        assert_eq!(glossary.known("VERB"), g.congenital().verb);
        assert_eq!(glossary.lex_or_id(g.congenital().verb), "VERB");
    }

    #[test]
    fn entity_creates_then_resolves_by_name() {
        let g = small_gnosis();
        let glossary = Glossary::new(g);
        let apple = glossary.entity("apple").unwrap();
        assert_eq!(glossary.known("apple"), apple);
        assert_eq!(glossary.entity("apple").unwrap(), apple);
    }

    #[test]
    fn forgetting_an_entity_drops_its_name() {
        let g = small_gnosis();
        let glossary = Glossary::new(Arc::clone(&g));
        let apple = glossary.entity("apple").unwrap();
        g.forget(apple, false).unwrap();
        assert_eq!(glossary.known("apple"), NIHIL);
    }

    #[test]
    fn let_name_rejects_stealing_a_bound_name() {
        let g = small_gnosis();
        let glossary = Glossary::new(g);
        let a = glossary.entity("a").unwrap();
        let b = glossary.entity("b").unwrap();
        assert!(!glossary.let_name(b, "a"));
        assert_eq!(glossary.known("a"), a);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("gnosis-glossary-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("glossary");

        let g = small_gnosis();
        let glossary = Glossary::new(Arc::clone(&g));
        let apple = glossary.entity("apple").unwrap();
        glossary.save(&path).unwrap();

        let glossary2 = Glossary::new(g);
        glossary2.load(&path).unwrap();
        assert_eq!(glossary2.known("apple"), apple);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
