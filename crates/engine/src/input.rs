//! JSON graph descriptions.
//!
//! A node is either a 2-D number array or an operator object:
//!
//! ```json
//! {"operator": "*", "operands": [[[1, 2]], {"operator": "T", "operands": [[[3, 4]]]}]}
//! ```
//!
//! `+` and `*` take two or more operands and fold left into binary nodes.
//! `-` and `T` take exactly one.

use lae_core::{LaeError, Matrix2D, Result};
use serde::{Deserialize, Serialize};

use crate::graph::{ComputationGraph, NodeId, Operator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphInput {
    Matrix(Matrix2D),
    Operation {
        operator: String,
        operands: Vec<GraphInput>,
    },
}

impl GraphInput {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add this description to `graph`, returning the id of its top node.
    pub fn build(&self, graph: &mut ComputationGraph) -> Result<NodeId> {
        match self {
            GraphInput::Matrix(m) => graph.add_matrix(m.clone()),
            GraphInput::Operation { operator, operands } => {
                let op: Operator = operator.parse()?;
                let ids = operands
                    .iter()
                    .map(|o| o.build(graph))
                    .collect::<Result<Vec<_>>>()?;
                match op {
                    Operator::Add | Operator::Multiply => {
                        match ids.split_first() {
                            Some((&first, rest)) if !rest.is_empty() => rest
                                .iter()
                                .try_fold(first, |acc, &next| graph.add_operation(op, vec![acc, next])),
                            _ => Err(arity(op, "at least 2", ids.len())),
                        }
                    }
                    Operator::Negate | Operator::Transpose => {
                        if ids.len() != 1 {
                            return Err(arity(op, "1", ids.len()));
                        }
                        graph.add_operation(op, ids)
                    }
                }
            }
        }
    }
}

fn arity(op: Operator, expected: &str, found: usize) -> LaeError {
    LaeError::Arity {
        operator: op.to_string(),
        expected: expected.to_string(),
        found,
    }
}

/// Parse a JSON description into a fresh graph and its root.
pub fn parse_graph(json: &str) -> Result<(ComputationGraph, NodeId)> {
    let input = GraphInput::from_json(json)?;
    let mut graph = ComputationGraph::new();
    let root = input.build(&mut graph)?;
    Ok((graph, root))
}
