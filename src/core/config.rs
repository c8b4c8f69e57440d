/// Tool configuration for order bounds, default starts, and walk limits.
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::core::chain::MarkovError;
use crate::core::state::State;
use crate::core::transitions::{TextEncoding, DEFAULT_ENCODINGS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings shared by the command-line tools. Every field has a default,
/// so a RON file only needs the values it overrides:
///
/// ```ron
/// (order: 2, max_branches: 5, seed: Some(7))
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Order used when the caller does not name one.
    pub order: usize,
    pub min_order: usize,
    pub max_order: usize,
    /// Start state per order, used when no start is supplied.
    pub default_starts: BTreeMap<usize, String>,
    /// Steps taken by a story walk over a built chain.
    pub story_limit: usize,
    /// Steps taken by a walk over a loaded transition table.
    pub walk_limit: usize,
    pub depth: usize,
    pub max_branches: usize,
    /// Fixed RNG seed; entropy-seeded when absent.
    pub seed: Option<u64>,
    /// Encodings tried, in order, when loading a transition file.
    pub encodings: Vec<TextEncoding>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        let default_starts = [
            (1, "the"),
            (2, "the murder"),
            (3, "the murder of"),
            (4, "the murder of roger"),
            (5, "the murder of roger ackroyd"),
        ]
        .into_iter()
        .map(|(order, start)| (order, start.to_string()))
        .collect();

        Self {
            order: 3,
            min_order: 1,
            max_order: 5,
            default_starts,
            story_limit: 20,
            walk_limit: 25,
            depth: 2,
            max_branches: 3,
            seed: None,
            encodings: DEFAULT_ENCODINGS.to_vec(),
        }
    }
}

impl ChainConfig {
    /// Load and validate a config from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ChainConfig = ron::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_order == 0 {
            return Err(ConfigError::Invalid("min_order must be >= 1".to_string()));
        }
        if self.max_order < self.min_order {
            return Err(ConfigError::Invalid(format!(
                "max_order ({}) is below min_order ({})",
                self.max_order, self.min_order
            )));
        }
        if !(self.min_order..=self.max_order).contains(&self.order) {
            return Err(ConfigError::Invalid(format!(
                "order {} is outside {}..={}",
                self.order, self.min_order, self.max_order
            )));
        }
        if self.max_branches == 0 {
            return Err(ConfigError::Invalid("max_branches must be >= 1".to_string()));
        }
        if self.encodings.is_empty() {
            return Err(ConfigError::Invalid("at least one encoding is required".to_string()));
        }
        Ok(())
    }

    /// Check that `order` is within the configured bounds.
    pub fn check_order(&self, order: usize) -> Result<(), MarkovError> {
        if (self.min_order..=self.max_order).contains(&order) {
            Ok(())
        } else {
            Err(MarkovError::InvalidConfiguration(format!(
                "order must be between {} and {}, got {}",
                self.min_order, self.max_order, order
            )))
        }
    }

    /// Resolve the start state for a walk of the given order.
    ///
    /// Uses `start` when given, otherwise the configured default for
    /// `order`. The result must have exactly `order` tokens.
    pub fn resolve_start(&self, order: usize, start: Option<&str>) -> Result<State, MarkovError> {
        self.check_order(order)?;
        let text = match start {
            Some(text) => text,
            None => self.default_starts.get(&order).map(String::as_str).ok_or_else(|| {
                MarkovError::InvalidConfiguration(format!("no default start for order {}", order))
            })?,
        };
        let state = State::parse(text);
        if state.order() != order {
            return Err(MarkovError::InvalidConfiguration(format!(
                "start '{}' has {} tokens, expected {}",
                text,
                state.order(),
                order
            )));
        }
        Ok(state)
    }

    /// RNG seeded from `seed`, or from entropy when unset.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn defaults_are_valid() {
        let config = ChainConfig::default();
        config.validate().unwrap();
        assert_eq!(config.encodings[0], TextEncoding::Utf8);
    }

    #[test]
    fn default_start_per_order() {
        let config = ChainConfig::default();
        for order in 1..=5 {
            let state = config.resolve_start(order, None).unwrap();
            assert_eq!(state.order(), order);
        }
        assert_eq!(
            config.resolve_start(2, None).unwrap(),
            State::from("the murder")
        );
    }

    #[test]
    fn explicit_start_must_match_order() {
        let config = ChainConfig::default();
        assert_eq!(
            config.resolve_start(2, Some("my god")).unwrap(),
            State::from("my god")
        );
        assert!(matches!(
            config.resolve_start(3, Some("my god")),
            Err(MarkovError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn order_out_of_bounds() {
        let config = ChainConfig::default();
        assert!(config.check_order(0).is_err());
        assert!(config.check_order(6).is_err());
        assert!(config.resolve_start(6, Some("a b c d e f")).is_err());
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.ron");
        std::fs::write(&path, "(order: 2, max_branches: 5, seed: Some(7), encodings: [Latin1])").unwrap();

        let config = ChainConfig::load_from_ron(&path).unwrap();
        assert_eq!(config.order, 2);
        assert_eq!(config.max_branches, 5);
        assert_eq!(config.depth, 2);
        assert_eq!(config.encodings, vec![TextEncoding::Latin1]);
        assert_eq!(config.default_starts.len(), 5);

        let a: u64 = config.rng().gen();
        let b: u64 = config.rng().gen();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_ron_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.ron");
        std::fs::write(&path, "(max_branches: 0)").unwrap();
        assert!(matches!(
            ChainConfig::load_from_ron(&path),
            Err(ConfigError::Invalid(_))
        ));
    }
}
