//! Gnosis: a sharded concurrent entity-attribute graph, the declarative
//! core of a conversational engine. This crate wires the graph
//! (`gnosis-core`), the attribute store (`gnosis-store`), the glossary
//! (`gnosis-glossary`), the pattern matcher (`gnosis-match`), and the
//! UDP front end (`gnosis-net`) into one [`Unit`].

mod config;

pub use config::{GnosisConfig, MatcherConfig, PersistenceConfig};

pub use gnosis_codec::{pair, unpair, Encoded, Identity, Key, NIHIL};
pub use gnosis_collections::{Sequence, Signature};
pub use gnosis_core::{Congenital, CoreConfig, Gnosis, GnosisError};
pub use gnosis_glossary::{Glossary, GlossaryError};
pub use gnosis_match::{analogic, MatchConfig, MatchError};
pub use gnosis_net::{Channel, Frame, NetConfig, NetError, Prefix};
pub use gnosis_store::{AttributeStore, Cargo, MemoryStore, StoreError};

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

/// Installs a `tracing-subscriber` `fmt` layer honouring `RUST_LOG`, for
/// example binaries and integration tests that want readable output
/// without wiring their own subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// A complete, independently addressable knowledge base: one graph, its
/// attribute store, and a glossary over it. Several [`Unit`]s may coexist
/// in a process; each owns its own shards and threads.
pub struct Unit {
    gnosis: Arc<Gnosis>,
    glossary: Glossary,
    attributes: Arc<MemoryStore>,
    config: GnosisConfig,
}

impl Unit {
    pub fn new(title: impl Into<String>, config: GnosisConfig) -> Result<Unit> {
        let gnosis = Arc::new(Gnosis::new(title, config.core.clone()).context("starting gnosis core")?);
        let glossary = Glossary::new(Arc::clone(&gnosis));
        let attributes = Arc::new(MemoryStore::new());

        let store_for_events = Arc::clone(&attributes);
        gnosis.on_change_incl(move |id, new_id, is_attribute| {
            store_for_events.change(id, new_id, is_attribute);
        });

        info!(title = gnosis.title(), "unit ready");
        Ok(Unit {
            gnosis,
            glossary,
            attributes,
            config,
        })
    }

    pub fn gnosis(&self) -> &Arc<Gnosis> {
        &self.gnosis
    }

    pub fn glossary(&self) -> &Glossary {
        &self.glossary
    }

    pub fn attributes(&self) -> &MemoryStore {
        &self.attributes
    }

    /// Searches for entity tuples analogical to `pattern`, per
    /// `gnosis_match::analogic`, using this unit's configured matcher
    /// concurrency.
    pub fn analogic<F>(&self, pattern: &[Identity], mask: &Signature, f: F) -> Result<bool>
    where
        F: Fn(&Sequence) -> bool + Sync,
    {
        let match_config: MatchConfig = (&self.config.matcher).into();
        analogic(&self.gnosis, pattern, mask, f, &match_config).context("running pattern match")
    }

    /// Opens a UDP front end for this unit if `config.net` is set.
    pub fn channel(&self, port: u16, peer: impl std::net::ToSocketAddrs) -> Result<Channel> {
        let net_config = self
            .config
            .net
            .clone()
            .unwrap_or_default();
        Channel::open(port, peer, &net_config).context("opening UDP channel")
    }

    /// Persists the graph's syndromes/sequences, the glossary, and the
    /// attribute store, each to its own file in `folder`.
    pub fn save(&self, folder: &Path) -> Result<()> {
        std::fs::create_dir_all(folder).context("creating persistence folder")?;
        self.gnosis.save(folder).context("saving gnosis core")?;
        self.glossary
            .save(&folder.join(&self.config.persistence.glossary_filename))
            .context("saving glossary")?;
        self.attributes
            .save(&folder.join(&self.config.persistence.attributes_filename))
            .context("saving attribute store")?;
        info!(folder = %folder.display(), "unit saved");
        Ok(())
    }

    /// Replaces this unit's state with what was written by
    /// [`Unit::save`] to `folder`.
    pub fn load(&self, folder: &Path) -> Result<()> {
        self.gnosis.load(folder).context("loading gnosis core")?;
        self.glossary
            .load(&folder.join(&self.config.persistence.glossary_filename))
            .context("loading glossary")?;
        self.attributes
            .load(&folder.join(&self.config.persistence.attributes_filename))
            .context("loading attribute store")?;
        info!(folder = %folder.display(), "unit loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_starts_and_resolves_congenital_names() {
        let config = GnosisConfig {
            core: CoreConfig {
                number_of_segments: 2,
                capacity_of_segment: 1024,
                ..CoreConfig::default()
            },
            ..GnosisConfig::default()
        };
        let unit = Unit::new("test-unit", config).unwrap();
        assert_eq!(unit.glossary().known("VERB"), unit.gnosis().congenital().verb);
    }

    #[test]
    fn attribute_store_reacts_to_forget_events() {
        let config = GnosisConfig {
            core: CoreConfig {
                number_of_segments: 2,
                capacity_of_segment: 1024,
                ..CoreConfig::default()
            },
            ..GnosisConfig::default()
        };
        let unit = Unit::new("attr-unit", config).unwrap();
        let object = unit.gnosis().entity().unwrap();
        let attribute = unit.gnosis().entity().unwrap();
        let key = pair(object, attribute);
        unit.attributes().put(key, Cargo::Integer(7));
        assert!(unit.attributes().contains(key));

        unit.gnosis().forget(object, false).unwrap();
        assert!(!unit.attributes().contains(key));
    }

    #[test]
    fn save_and_load_roundtrip_across_all_three_stores() {
        let dir = std::env::temp_dir().join(format!("gnosis-unit-test-{}", std::process::id()));
        let config = || GnosisConfig {
            core: CoreConfig {
                number_of_segments: 2,
                capacity_of_segment: 1024,
                ..CoreConfig::default()
            },
            ..GnosisConfig::default()
        };

        let unit = Unit::new("save-unit", config()).unwrap();
        let apple = unit.glossary().entity("apple").unwrap();
        let color = unit.gnosis().entity().unwrap();
        let key = pair(apple, color);
        unit.attributes().put(key, Cargo::Text("red".to_string()));
        unit.save(&dir).unwrap();

        let unit2 = Unit::new("save-unit-reloaded", config()).unwrap();
        unit2.load(&dir).unwrap();
        assert_eq!(unit2.glossary().known("apple"), apple);
        assert_eq!(unit2.attributes().get(key), Some(Cargo::Text("red".to_string())));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
