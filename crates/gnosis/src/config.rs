//! Configuration for a [`crate::Unit`]. Mirrors the nested
//! `Default`-and-`serde` shape used across the workspace, with every
//! numeric constant the original `Config::gnosis` namespace fixes.

use serde::{Deserialize, Serialize};

use gnosis_core::CoreConfig;
use gnosis_match::MatchConfig;
use gnosis_net::NetConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GnosisConfig {
    pub core: CoreConfig,
    pub matcher: MatcherConfig,
    pub persistence: PersistenceConfig,
    /// UDP front end is optional; `None` means no [`crate::Unit::channel`]
    /// is opened.
    pub net: Option<NetConfig>,
}

impl Default for GnosisConfig {
    fn default() -> Self {
        GnosisConfig {
            core: CoreConfig::default(),
            matcher: MatcherConfig::default(),
            persistence: PersistenceConfig::default(),
            net: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub capacity_of_analogy: usize,
    pub number_of_matcher_threads: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            capacity_of_analogy: gnosis_match::PATTERN_CAPACITY,
            number_of_matcher_threads: gnosis_match::DEFAULT_NUMBER_OF_THREADS,
        }
    }
}

impl From<&MatcherConfig> for MatchConfig {
    fn from(config: &MatcherConfig) -> Self {
        MatchConfig {
            pattern_capacity: config.capacity_of_analogy,
            number_of_threads: config.number_of_matcher_threads,
        }
    }
}

/// Filenames for the parts of a [`crate::Unit`] that `CoreConfig` doesn't
/// already name (syndromes/sequences live there).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub glossary_filename: String,
    pub attributes_filename: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            glossary_filename: "glossary".to_string(),
            attributes_filename: "attributes".to_string(),
        }
    }
}
