//! Word Chain — word-level Markov chains for text generation and inspection.
//!
//! Builds fixed-order chains from a token sequence, walks them with
//! seedable weighted sampling, and extracts bounded subgraphs that a
//! renderer can draw.

pub mod core;

pub use crate::core::chain::{ChainBuilder, MarkovChain, MarkovError, Transitions};
pub use crate::core::explore::{extract, Subgraph, SubgraphEdge, SubgraphNode};
pub use crate::core::generator::generate;
pub use crate::core::state::State;
pub use crate::core::transitions::TransitionTable;
