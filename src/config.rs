use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::io::serialize::{self, Format};
use crate::syntax::projectivity::DEFAULT_MARKER;
use crate::syntax::transition::oracle::{ILLEGAL_COST, MAX_PREDICTABLE_COST};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplorationConfig {
    /// Epochs trained on oracle transitions only.
    pub warmup_epochs: u32,
    pub probability: f64,
    /// Falls back to the `SEED` environment variable, then to a fixed seed.
    pub seed: Option<u64>,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        ExplorationConfig {
            warmup_epochs: 2,
            probability: 0.9,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub marker: char,
    /// Lift bound per sentence; `n * n` for `n` tokens when unset.
    pub max_lifts: Option<usize>,
    pub max_predictable_cost: u32,
    pub exploration: ExplorationConfig,
    pub n_epochs: u32,
    pub shuffle: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            marker: DEFAULT_MARKER,
            max_lifts: None,
            max_predictable_cost: MAX_PREDICTABLE_COST,
            exploration: ExplorationConfig::default(),
            n_epochs: 20,
            shuffle: true,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Config = serialize::load(path, Format::Json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serialize::deserialize(json.as_bytes(), Format::Json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_predictable_cost >= ILLEGAL_COST {
            return Err(Error::invalid_argument(format!(
                "max_predictable_cost must be below {}",
                ILLEGAL_COST
            )));
        }
        if !(0.0..=1.0).contains(&self.exploration.probability) {
            return Err(Error::invalid_argument(
                "exploration probability must be within [0, 1]",
            ));
        }
        if self.marker.is_whitespace() {
            return Err(Error::invalid_argument("marker must not be whitespace"));
        }
        Ok(())
    }
}
