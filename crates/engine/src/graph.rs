use std::fmt;
use std::str::FromStr;

use lae_core::{LaeError, Matrix2D, Result};
use serde::{Deserialize, Serialize};

/// Index of a node inside a [`ComputationGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Matrix operations the engine knows how to split into row tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Multiply,
    Negate,
    Transpose,
}

impl Operator {
    /// Number of operands a resolvable node of this operator has.
    pub fn arity(self) -> usize {
        match self {
            Operator::Add | Operator::Multiply => 2,
            Operator::Negate | Operator::Transpose => 1,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Multiply => "*",
            Operator::Negate => "-",
            Operator::Transpose => "T",
        }
    }
}

impl FromStr for Operator {
    type Err = LaeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "+" | "add" => Ok(Operator::Add),
            "*" | "multiply" => Ok(Operator::Multiply),
            "-" | "negate" => Ok(Operator::Negate),
            "T" | "transpose" => Ok(Operator::Transpose),
            other => Err(LaeError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Type tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Matrix,
    Operation(Operator),
}

/// A graph node: either a concrete value or a pending operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Matrix(Matrix2D),
    Operation {
        operator: Operator,
        children: Vec<NodeId>,
    },
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Matrix(_) => NodeType::Matrix,
            Node::Operation { operator, .. } => NodeType::Operation(*operator),
        }
    }
}

/// Arena of computation nodes.
///
/// Children must exist before their parents, so graphs built through this
/// API are acyclic. A node may be shared by several parents. Resolution
/// replaces an operation's variant with [`Node::Matrix`] exactly once.
#[derive(Debug, Clone, Default)]
pub struct ComputationGraph {
    nodes: Vec<Node>,
}

impl ComputationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_matrix(&mut self, matrix: Matrix2D) -> Result<NodeId> {
        check_rectangular(&matrix)?;
        Ok(self.push(Node::Matrix(matrix)))
    }

    /// Add an operation over existing nodes.
    ///
    /// Operand counts are not checked here; a node with the wrong count is
    /// never resolvable and leaves the graph stuck.
    pub fn add_operation(&mut self, operator: Operator, children: Vec<NodeId>) -> Result<NodeId> {
        if let Some(missing) = children.iter().find(|c| c.0 >= self.nodes.len()) {
            return Err(LaeError::NodeNotFound(missing.0));
        }
        Ok(self.push(Node::Operation { operator, children }))
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(LaeError::NodeNotFound(id.0))
    }

    pub fn node_type(&self, id: NodeId) -> Result<NodeType> {
        self.node(id).map(Node::node_type)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        match self.node(id)? {
            Node::Matrix(_) => Ok(&[]),
            Node::Operation { children, .. } => Ok(children.as_slice()),
        }
    }

    pub fn matrix(&self, id: NodeId) -> Result<&Matrix2D> {
        match self.node(id)? {
            Node::Matrix(m) => Ok(m),
            Node::Operation { .. } => Err(LaeError::NotAMatrix(id.0)),
        }
    }

    pub fn is_resolved(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0), Some(Node::Matrix(_)))
    }

    /// Replace a pending operation with its computed value.
    pub fn resolve(&mut self, id: NodeId, matrix: Matrix2D) -> Result<()> {
        let slot = self.nodes.get_mut(id.0).ok_or(LaeError::NodeNotFound(id.0))?;
        if let Node::Matrix(_) = slot {
            return Err(LaeError::Other(format!("node {} is already resolved", id)));
        }
        *slot = Node::Matrix(matrix);
        Ok(())
    }

    /// Leftmost operation under `root` whose operands are all matrices.
    pub fn find_resolvable(&self, root: NodeId) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(Node::Operation { operator, children }) = self.nodes.get(id.0) else {
                continue;
            };
            let pending: Vec<NodeId> = children
                .iter()
                .copied()
                .filter(|c| !self.is_resolved(*c))
                .collect();
            if pending.is_empty() {
                if children.len() == operator.arity() {
                    return Some(id);
                }
                continue;
            }
            stack.extend(pending.into_iter().rev());
        }
        None
    }

    /// Unresolved operations reachable from `root`, each listed once.
    pub fn pending(&self, root: NodeId) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut pending = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            match self.nodes.get(id.0) {
                Some(Node::Operation { children, .. }) if !seen[id.0] => {
                    seen[id.0] = true;
                    pending.push(id);
                    stack.extend(children.iter().rev());
                }
                _ => {}
            }
        }
        pending
    }
}

fn check_rectangular(matrix: &Matrix2D) -> Result<()> {
    let cols = matrix.first().map_or(0, Vec::len);
    match matrix.iter().position(|row| row.len() != cols) {
        Some(row) => Err(LaeError::RaggedMatrix {
            row,
            expected: cols,
            found: matrix[row].len(),
        }),
        None => Ok(()),
    }
}
