/// Weighted random walks over a chain or transition table.
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::chain::{summable_weights, MarkovError, Transitions};
use crate::core::state::State;

/// Walk `limit` steps from `start`, sampling each successor in proportion
/// to its weight.
///
/// Returns `limit + 1` states beginning with `start`. The final state is
/// emitted without being looked up, so it may be a state with no
/// outgoing transitions.
///
/// # Errors
/// - `UnknownState` if `start`, or a sampled state that still has to be
///   stepped from, is not a key of `source`. `partial` holds every state
///   emitted so far, including the unknown one.
/// - `DeadEnd` if a state has no successor with positive weight (only
///   possible for raw transition tables).
pub fn generate<T, R>(
    source: &T,
    start: &State,
    limit: usize,
    rng: &mut R,
) -> Result<Vec<State>, MarkovError>
where
    T: Transitions + ?Sized,
    R: Rng + ?Sized,
{
    if !source.contains(start) {
        return Err(MarkovError::UnknownState {
            state: start.clone(),
            partial: Vec::new(),
        });
    }

    let mut walk = Vec::with_capacity(limit + 1);
    walk.push(start.clone());

    for _ in 0..limit {
        let current = &walk[walk.len() - 1];
        let options = match source.successors(current) {
            Some(options) => options,
            None => {
                return Err(MarkovError::UnknownState {
                    state: current.clone(),
                    partial: walk,
                })
            }
        };

        let weights = summable_weights(options.iter().map(|(_, w)| *w));
        let dist = match WeightedIndex::new(&weights) {
            Ok(dist) => dist,
            Err(_) => {
                return Err(MarkovError::DeadEnd {
                    state: current.clone(),
                    partial: walk,
                })
            }
        };
        let next = options[dist.sample(rng)].0.clone();
        walk.push(next);
    }

    Ok(walk)
}

/// Pick a start state uniformly from the keys of `source`.
///
/// # Errors
/// Returns `EmptyModel` when `source` has no states.
pub fn random_start<T, R>(source: &T, rng: &mut R) -> Result<State, MarkovError>
where
    T: Transitions + ?Sized,
    R: Rng + ?Sized,
{
    source
        .states()
        .choose(rng)
        .map(|state| (*state).clone())
        .ok_or(MarkovError::EmptyModel)
}

/// Join a walk into text. Each state contributes all of its tokens.
pub fn render_states(walk: &[State]) -> String {
    walk.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
