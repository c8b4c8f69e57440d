pub mod chain;
pub mod config;
pub mod corpus;
pub mod explore;
pub mod generator;
pub mod state;
pub mod transitions;
