use std::time::Instant;

use lae_core::{Config, EngineConfig, LaeError, Matrix2D, Result};
use lae_memory::SharedMatrix;
use lae_scheduler::{BatchReport, Task, TiredExecutor, WorkerReport};
use tracing::{debug, info, warn};

use crate::graph::{ComputationGraph, Node, NodeId, Operator};
use crate::tasks::row_tasks;

/// How a call to [`LinearAlgebraEngine::run`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The root is a matrix; this is its value.
    Resolved(Matrix2D),
    /// No operation under the root can be computed. `pending` lists the
    /// operations still unresolved, root first.
    Stuck { pending: Vec<NodeId> },
}

impl RunOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, RunOutcome::Resolved(_))
    }

    pub fn matrix(&self) -> Option<&Matrix2D> {
        match self {
            RunOutcome::Resolved(m) => Some(m),
            RunOutcome::Stuck { .. } => None,
        }
    }
}

/// Resolves computation graphs one node at a time on a [`TiredExecutor`].
///
/// The two scratch matrices are reused for every node, so `run` takes
/// `&mut self`: one engine resolves one graph at a time. Give each
/// concurrent graph its own engine.
pub struct LinearAlgebraEngine {
    executor: TiredExecutor,
    left: SharedMatrix,
    right: SharedMatrix,
    config: EngineConfig,
}

impl LinearAlgebraEngine {
    pub fn new(num_threads: usize) -> Result<Self> {
        let executor = TiredExecutor::new(num_threads)?;
        Ok(Self::with_executor(executor, EngineConfig::default()))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let executor = TiredExecutor::from_config(&config.pool)?;
        Ok(Self::with_executor(executor, config.engine.clone()))
    }

    pub fn with_executor(executor: TiredExecutor, config: EngineConfig) -> Self {
        Self {
            executor,
            left: SharedMatrix::new(),
            right: SharedMatrix::new(),
            config,
        }
    }

    /// Compute resolvable nodes under `root` until it is a matrix or no
    /// further progress is possible.
    pub fn run(&mut self, graph: &mut ComputationGraph, root: NodeId) -> Result<RunOutcome> {
        graph.node(root)?;
        let started = Instant::now();
        let mut computed = 0usize;

        while !graph.is_resolved(root) {
            let Some(next) = graph.find_resolvable(root) else {
                let pending = graph.pending(root);
                warn!(
                    root = %root,
                    "Graph stuck after {} nodes, {} operations unresolved",
                    computed,
                    pending.len()
                );
                return Ok(RunOutcome::Stuck { pending });
            };
            self.load_and_compute(graph, next)?;
            computed += 1;
        }

        info!(
            root = %root,
            "Graph resolved: {} nodes computed in {:?}",
            computed,
            started.elapsed()
        );
        Ok(RunOutcome::Resolved(graph.matrix(root)?.clone()))
    }

    /// Compute one operation whose operands are already matrices and
    /// resolve it in place.
    pub fn load_and_compute(&mut self, graph: &mut ComputationGraph, id: NodeId) -> Result<BatchReport> {
        let (operator, children) = match graph.node(id)? {
            Node::Operation { operator, children } => (*operator, children.clone()),
            Node::Matrix(_) => {
                return Err(LaeError::Other(format!("node {} is already resolved", id)))
            }
        };
        if children.len() != operator.arity() {
            return Err(LaeError::Arity {
                operator: operator.to_string(),
                expected: operator.arity().to_string(),
                found: children.len(),
            });
        }

        let first = graph.matrix(children[0])?;
        if let Some(&second) = children.get(1) {
            let second = graph.matrix(second)?;
            check_shapes(operator, first, second)?;
            self.right.load_row_major(second)?;
        }
        self.left.load_row_major(first)?;

        let tasks = row_tasks(operator, &self.left.snapshot(), &self.right.snapshot());
        debug!(node = %id, "Computing {} over {} rows", operator, tasks.len());
        let report = self.run_batch(tasks)?;

        let result = self.left.read_row_major()?;
        graph.resolve(id, result)?;
        Ok(report)
    }

    /// Submit a batch and apply the failure policy: in strict mode any
    /// failed task turns into [`LaeError::TaskFailed`].
    pub fn run_batch(&self, tasks: Vec<Task>) -> Result<BatchReport> {
        let report = self.executor.submit_all(tasks);
        if report.is_clean() {
            return Ok(report);
        }
        if self.config.strict {
            return report.into_result();
        }
        warn!(
            "{} of {} tasks failed, continuing (strict mode off)",
            report.failures.len(),
            report.submitted
        );
        Ok(report)
    }

    pub fn worker_report(&self) -> WorkerReport {
        self.executor.worker_report()
    }

    pub fn executor(&self) -> &TiredExecutor {
        &self.executor
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stop the pool. Later runs fail with rejected tasks.
    pub fn shutdown(&self) {
        self.executor.shutdown();
    }
}

fn shape(m: &Matrix2D) -> (usize, usize) {
    (m.len(), m.first().map_or(0, Vec::len))
}

fn check_shapes(operator: Operator, left: &Matrix2D, right: &Matrix2D) -> Result<()> {
    let (lr, lc) = shape(left);
    let (rr, rc) = shape(right);
    match operator {
        Operator::Add if (lr, lc) != (rr, rc) => Err(LaeError::Dimension(format!(
            "cannot add {}x{} and {}x{}",
            lr, lc, rr, rc
        ))),
        Operator::Multiply if lc != rr => Err(LaeError::Dimension(format!(
            "cannot multiply {}x{} by {}x{}",
            lr, lc, rr, rc
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_checks() {
        let a = vec![vec![1.0, 2.0]];
        let b = vec![vec![1.0], vec![2.0]];
        assert!(check_shapes(Operator::Add, &a, &a).is_ok());
        assert!(matches!(
            check_shapes(Operator::Add, &a, &b),
            Err(LaeError::Dimension(_))
        ));
        assert!(check_shapes(Operator::Multiply, &a, &b).is_ok());
        assert!(matches!(
            check_shapes(Operator::Multiply, &a, &a),
            Err(LaeError::Dimension(_))
        ));
    }

    #[test]
    fn unary_operations_ignore_the_right_operand_shape() {
        let a = vec![vec![1.0, 2.0]];
        assert!(check_shapes(Operator::Negate, &a, &vec![]).is_ok());
        assert!(check_shapes(Operator::Transpose, &a, &vec![]).is_ok());
    }

    #[test]
    fn computing_a_leaf_is_an_error() {
        let mut engine = LinearAlgebraEngine::new(1).unwrap();
        let mut graph = ComputationGraph::new();
        let a = graph.add_matrix(vec![vec![1.0]]).unwrap();
        assert!(engine.load_and_compute(&mut graph, a).is_err());
    }

    #[test]
    fn run_on_a_leaf_returns_it() {
        let mut engine = LinearAlgebraEngine::new(1).unwrap();
        let mut graph = ComputationGraph::new();
        let a = graph.add_matrix(vec![vec![4.0, 2.0]]).unwrap();
        let outcome = engine.run(&mut graph, a).unwrap();
        assert_eq!(outcome, RunOutcome::Resolved(vec![vec![4.0, 2.0]]));
    }
}
