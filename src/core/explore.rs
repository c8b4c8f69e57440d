/// Bounded breadth-first exploration of a chain, producing a small
/// directed graph for inspection and rendering.
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::core::chain::{summable_weights, MarkovError, Transitions};
use crate::core::state::State;

/// A visited state and the BFS level it was discovered at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgraphNode {
    pub state: State,
    pub depth: usize,
}

/// A kept transition. `probability` is `weight` divided by the summed
/// weight of all edges kept for the same source node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgraphEdge {
    pub from: State,
    pub to: State,
    pub weight: f64,
    pub probability: f64,
}

/// Result of [`extract`]. Nodes and edges are listed in discovery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    requested_start: State,
    start: State,
    depth: usize,
    max_branches: usize,
    nodes: Vec<SubgraphNode>,
    edges: Vec<SubgraphEdge>,
}

impl Subgraph {
    /// The start state the caller asked for.
    pub fn requested_start(&self) -> &State {
        &self.requested_start
    }

    /// The start state actually explored from.
    pub fn start(&self) -> &State {
        &self.start
    }

    /// Whether the requested start was missing and replaced.
    pub fn substituted_start(&self) -> bool {
        self.requested_start != self.start
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_branches(&self) -> usize {
        self.max_branches
    }

    pub fn nodes(&self) -> &[SubgraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[SubgraphEdge] {
        &self.edges
    }

    pub fn contains(&self, state: &State) -> bool {
        self.nodes.iter().any(|node| &node.state == state)
    }

    pub fn outgoing<'a>(&'a self, state: &'a State) -> impl Iterator<Item = &'a SubgraphEdge> + 'a {
        self.edges.iter().filter(move |edge| &edge.from == state)
    }

    /// Largest edge weight, for scaling edge widths in a renderer.
    pub fn max_weight(&self) -> Option<f64> {
        self.edges.iter().map(|edge| edge.weight).reduce(f64::max)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Explore `source` breadth-first from `start`.
///
/// Each node discovered at a level below `depth` is expanded: its
/// successors are ranked by descending weight (stable, so ties keep their
/// stored order) and the first `max_branches` become edges. Nodes first
/// reached at level `depth` are kept as leaves. Every node is expanded at
/// most once.
///
/// If `start` is not a key of `source`, the smallest existing key is used
/// instead; see [`Subgraph::start`].
///
/// # Errors
/// - `InvalidConfiguration` if `max_branches` is zero.
/// - `EmptyModel` if `start` must be replaced and `source` has no states.
pub fn extract<T>(
    source: &T,
    start: &State,
    depth: usize,
    max_branches: usize,
) -> Result<Subgraph, MarkovError>
where
    T: Transitions + ?Sized,
{
    if max_branches == 0 {
        return Err(MarkovError::InvalidConfiguration(
            "max_branches must be >= 1".to_string(),
        ));
    }

    let actual_start = if source.contains(start) {
        start.clone()
    } else {
        let fallback = source
            .states()
            .first()
            .map(|state| (*state).clone())
            .ok_or(MarkovError::EmptyModel)?;
        debug!(requested = %start, used = %fallback, "start state not found, substituting");
        fallback
    };

    let mut nodes = vec![SubgraphNode {
        state: actual_start.clone(),
        depth: 0,
    }];
    let mut edges = Vec::new();
    let mut visited: FxHashSet<State> = FxHashSet::default();
    visited.insert(actual_start.clone());
    let mut queue: VecDeque<(State, usize)> = VecDeque::new();
    queue.push_back((actual_start.clone(), 0));

    while let Some((current, level)) = queue.pop_front() {
        if level >= depth {
            continue;
        }
        let successors = match source.successors(&current) {
            Some(successors) => successors,
            None => continue,
        };

        let mut ranked: Vec<&(State, f64)> = successors.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(max_branches);

        let scaled = summable_weights(ranked.iter().map(|(_, w)| *w));
        let total: f64 = scaled.iter().sum();
        for ((next, weight), share) in ranked.into_iter().zip(scaled) {
            let probability = if total > 0.0 { share / total } else { 0.0 };
            edges.push(SubgraphEdge {
                from: current.clone(),
                to: next.clone(),
                weight: *weight,
                probability,
            });
            if visited.insert(next.clone()) {
                nodes.push(SubgraphNode {
                    state: next.clone(),
                    depth: level + 1,
                });
                queue.push_back((next.clone(), level + 1));
            }
        }
    }

    debug!(
        start = %actual_start,
        depth,
        max_branches,
        nodes = nodes.len(),
        edges = edges.len(),
        "extracted subgraph"
    );

    Ok(Subgraph {
        requested_start: start.clone(),
        start: actual_start,
        depth,
        max_branches,
        nodes,
        edges,
    })
}
