//! Demand-driven resolver for matrix computation graphs.
//!
//! The [`LinearAlgebraEngine`] repeatedly picks an operator node whose
//! operands are all concrete matrices, splits it into one task per row,
//! runs the batch on the fatigue-weighted pool, and writes the result back
//! into the graph until the root is a matrix.
//!
//! - `graph`: arena of nodes that flip once from operator to matrix
//! - `input`: JSON graph description and its conversion into the arena
//! - `tasks`: per-operator row task builders
//! - `engine`: the resolver loop and its scratch matrices

pub mod engine;
pub mod graph;
pub mod input;
pub mod tasks;

pub use engine::{LinearAlgebraEngine, RunOutcome};
pub use graph::{ComputationGraph, Node, NodeId, NodeType, Operator};
pub use input::{parse_graph, GraphInput};
