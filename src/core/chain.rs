/// Markov chain model: building, invariants, and RON snapshots.
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::core::state::State;

/// Tolerance used when checking that a distribution sums to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum MarkovError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("unknown state '{state}' ({} states produced before it)", .partial.len())]
    UnknownState { state: State, partial: Vec<State> },
    #[error("state '{state}' has no positively weighted successor")]
    DeadEnd { state: State, partial: Vec<State> },
    #[error("no states available (model is empty)")]
    EmptyModel,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

impl MarkovError {
    /// The walk produced before a generation failure, if any.
    pub fn partial(&self) -> Option<&[State]> {
        match self {
            MarkovError::UnknownState { partial, .. } | MarkovError::DeadEnd { partial, .. } => {
                Some(partial)
            }
            _ => None,
        }
    }
}

/// Read access to a state → weighted-successors mapping.
///
/// Implemented by the normalized [`MarkovChain`] and by raw
/// [`TransitionTable`](crate::core::transitions::TransitionTable)s, so
/// generation and exploration work on either.
pub trait Transitions {
    /// Successors of `state` with their weights, in stable insertion order.
    /// `None` when `state` is not a key.
    fn successors(&self, state: &State) -> Option<&[(State, f64)]>;

    /// All keys, sorted.
    fn states(&self) -> Vec<&State>;

    fn state_count(&self) -> usize;

    fn contains(&self, state: &State) -> bool {
        self.successors(state).is_some()
    }
}

/// A built, read-only Markov chain over word windows.
///
/// # Invariants
/// - every key has at least one successor
/// - successor probabilities of each key sum to 1 (within
///   [`PROBABILITY_TOLERANCE`]) and lie in `(0, 1]`
/// - every key and successor holds exactly `order` tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkovChain {
    order: usize,
    transitions: FxHashMap<State, Vec<(State, f64)>>,
}

impl MarkovChain {
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of states with at least one successor.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Total number of distinct (state, successor) pairs.
    pub fn transition_count(&self) -> usize {
        self.transitions.values().map(Vec::len).sum()
    }

    pub fn get(&self, state: &State) -> Option<&[(State, f64)]> {
        self.transitions.get(state).map(Vec::as_slice)
    }

    /// Probability of moving from `from` to `to`, if that transition was observed.
    pub fn probability(&self, from: &State, to: &State) -> Option<f64> {
        self.get(from)?
            .iter()
            .find(|(next, _)| next == to)
            .map(|(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&State, &[(State, f64)])> {
        self.transitions.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Check the model invariants, e.g. after loading a snapshot.
    pub fn validate(&self) -> Result<(), MarkovError> {
        if self.order == 0 {
            return Err(MarkovError::InvalidConfiguration(
                "order must be >= 1".to_string(),
            ));
        }
        for (state, successors) in &self.transitions {
            if state.order() != self.order {
                return Err(MarkovError::InvalidConfiguration(format!(
                    "state '{}' has {} tokens, expected {}",
                    state,
                    state.order(),
                    self.order
                )));
            }
            if successors.is_empty() {
                return Err(MarkovError::InvalidConfiguration(format!(
                    "state '{}' has no successors",
                    state
                )));
            }
            let mut total = 0.0;
            for (next, p) in successors {
                if next.order() != self.order || !(*p > 0.0 && *p <= 1.0) {
                    return Err(MarkovError::InvalidConfiguration(format!(
                        "invalid transition '{}' -> '{}' ({})",
                        state, next, p
                    )));
                }
                total += p;
            }
            if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
                return Err(MarkovError::InvalidConfiguration(format!(
                    "probabilities of '{}' sum to {}",
                    state, total
                )));
            }
        }
        Ok(())
    }
}

impl Transitions for MarkovChain {
    fn successors(&self, state: &State) -> Option<&[(State, f64)]> {
        self.get(state)
    }

    fn states(&self) -> Vec<&State> {
        let mut states: Vec<&State> = self.transitions.keys().collect();
        states.sort();
        states
    }

    fn state_count(&self) -> usize {
        self.len()
    }
}

/// Builds Markov chains from token sequences.
pub struct ChainBuilder;

impl ChainBuilder {
    /// Build a chain of the given order from an ordered token sequence.
    ///
    /// Each window of `2 * order` tokens contributes one observation: its
    /// first half is the current state, its second half the successor.
    /// Counts are then normalized per state into probabilities.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `order` is zero.
    pub fn build<S: AsRef<str>>(tokens: &[S], order: usize) -> Result<MarkovChain, MarkovError> {
        if order == 0 {
            return Err(MarkovError::InvalidConfiguration(
                "order must be >= 1".to_string(),
            ));
        }

        let mut counts: FxHashMap<State, Vec<(State, u32)>> = FxHashMap::default();
        // windows() yields nothing when tokens.len() < 2 * order
        for window in tokens.windows(2 * order) {
            let curr = State::new(window[..order].iter().map(|t| t.as_ref()));
            let next = State::new(window[order..].iter().map(|t| t.as_ref()));
            add_transition(&mut counts, curr, next);
        }

        let transitions: FxHashMap<State, Vec<(State, f64)>> = counts
            .into_iter()
            .map(|(state, successors)| {
                let total: u32 = successors.iter().map(|(_, c)| c).sum();
                let probabilities = successors
                    .into_iter()
                    .map(|(next, count)| (next, count as f64 / total as f64))
                    .collect();
                (state, probabilities)
            })
            .collect();

        debug!(
            order,
            tokens = tokens.len(),
            states = transitions.len(),
            "built markov chain"
        );

        Ok(MarkovChain { order, transitions })
    }
}

/// Weights whose sum fits in an `f64`. When the sum overflows, every
/// weight is divided by the largest one, which keeps their ratios.
pub(crate) fn summable_weights<I: IntoIterator<Item = f64>>(weights: I) -> Vec<f64> {
    let weights: Vec<f64> = weights.into_iter().collect();
    let total: f64 = weights.iter().sum();
    if total.is_finite() {
        return weights;
    }
    let max = weights.iter().copied().fold(0.0, f64::max);
    if max > 0.0 && max.is_finite() {
        weights.iter().map(|w| w / max).collect()
    } else {
        weights
    }
}

/// Add a transition to a count table, incrementing the count.
fn add_transition(table: &mut FxHashMap<State, Vec<(State, u32)>>, state: State, next: State) {
    let entries = table.entry(state).or_default();
    if let Some(entry) = entries.iter_mut().find(|(s, _)| s == &next) {
        entry.1 += 1;
    } else {
        entries.push((next, 1));
    }
}

/// Save a MarkovChain to a RON file.
pub fn save_chain(chain: &MarkovChain, path: &Path) -> Result<(), MarkovError> {
    let serialized = ron::ser::to_string_pretty(chain, ron::ser::PrettyConfig::default())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    std::fs::write(path, serialized)?;
    Ok(())
}

/// Load a MarkovChain from a RON file, rejecting snapshots that break
/// the model invariants.
pub fn load_chain(path: &Path) -> Result<MarkovChain, MarkovError> {
    let contents = std::fs::read_to_string(path)?;
    let chain: MarkovChain = ron::from_str(&contents)?;
    chain.validate()?;
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn first_order_example() {
        let chain = ChainBuilder::build(&words("the cat sat the cat ran"), 1).unwrap();
        assert_eq!(chain.order(), 1);
        assert_eq!(
            chain.get(&State::from("the")),
            Some(&[(State::from("cat"), 1.0)][..])
        );
        assert_eq!(chain.probability(&"cat".into(), &"sat".into()), Some(0.5));
        assert_eq!(chain.probability(&"cat".into(), &"ran".into()), Some(0.5));
        // the final token never gets a successor
        assert!(chain.get(&"ran".into()).is_none());
    }

    #[test]
    fn second_order_uses_disjoint_windows() {
        let chain = ChainBuilder::build(&words("a b c d e f"), 2).unwrap();
        // windows of four: (a b -> c d), (b c -> d e), (c d -> e f)
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.probability(&"a b".into(), &"c d".into()), Some(1.0));
        assert_eq!(chain.probability(&"c d".into(), &"e f".into()), Some(1.0));
        assert!(chain.get(&"d e".into()).is_none());
    }

    #[test]
    fn short_input_yields_empty_chain() {
        let chain = ChainBuilder::build(&words("one two three"), 2).unwrap();
        assert!(chain.is_empty());
        let chain = ChainBuilder::build::<&str>(&[], 1).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn zero_order_is_rejected() {
        let err = ChainBuilder::build(&words("a b c"), 0).unwrap_err();
        assert!(matches!(err, MarkovError::InvalidConfiguration(_)));
    }

    #[test]
    fn probabilities_are_normalized() {
        let chain = ChainBuilder::build(&words("a b a c a b a b c a"), 1).unwrap();
        chain.validate().unwrap();
        let a = chain.get(&"a".into()).unwrap();
        let total: f64 = a.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < PROBABILITY_TOLERANCE);
        assert_eq!(chain.probability(&"a".into(), &"b".into()), Some(0.75));
    }

    #[test]
    fn successor_order_follows_first_observation() {
        let chain = ChainBuilder::build(&words("x z x y x z"), 1).unwrap();
        let succ: Vec<String> = chain
            .get(&"x".into())
            .unwrap()
            .iter()
            .map(|(s, _)| s.to_string())
            .collect();
        assert_eq!(succ, vec!["z", "y"]);
    }

    #[test]
    fn validate_rejects_broken_snapshot() {
        let mut transitions = FxHashMap::default();
        transitions.insert(State::from("a"), vec![(State::from("b"), 0.4)]);
        let chain = MarkovChain {
            order: 1,
            transitions,
        };
        assert!(matches!(
            chain.validate(),
            Err(MarkovError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn overflowing_weights_are_rescaled() {
        assert_eq!(summable_weights([2.0, 6.0]), vec![2.0, 6.0]);
        assert_eq!(summable_weights([1e308, 1e308, 0.0]), vec![1.0, 1.0, 0.0]);
        let scaled = summable_weights([f64::MAX, f64::MAX / 2.0]);
        assert_eq!(scaled, vec![1.0, 0.5]);
    }

    #[test]
    fn ron_round_trip() {
        let chain = ChainBuilder::build(&words("the cat sat the cat ran"), 1).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.ron");

        save_chain(&chain, &path).unwrap();
        let loaded = load_chain(&path).unwrap();

        assert_eq!(loaded.order(), chain.order());
        assert_eq!(loaded.len(), chain.len());
        assert_eq!(
            loaded.probability(&"cat".into(), &"ran".into()),
            Some(0.5)
        );
    }
}
