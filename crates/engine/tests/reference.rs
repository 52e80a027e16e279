//! Engine results on random matrices against a plain sequential computation.
//!
//! Every matrix has more rows than the pool has workers, so each batch
//! recycles workers mid-batch.

use lae_core::Matrix2D;
use lae_engine::{ComputationGraph, LinearAlgebraEngine, NodeId, Operator, RunOutcome};
use proptest::prelude::*;

const WORKERS: usize = 4;

/// Small integers keep every sum exact regardless of accumulation order.
fn entry() -> impl Strategy<Value = f64> {
    (-100i32..100).prop_map(f64::from)
}

fn matrix(rows: usize, cols: usize) -> impl Strategy<Value = Matrix2D> {
    prop::collection::vec(prop::collection::vec(entry(), cols), rows)
}

fn tall() -> impl Strategy<Value = Matrix2D> {
    (WORKERS + 1..24usize, 1..12usize).prop_flat_map(|(rows, cols)| matrix(rows, cols))
}

fn same_shape_pair() -> impl Strategy<Value = (Matrix2D, Matrix2D)> {
    (WORKERS + 1..24usize, 1..12usize)
        .prop_flat_map(|(rows, cols)| (matrix(rows, cols), matrix(rows, cols)))
}

fn chained_pair() -> impl Strategy<Value = (Matrix2D, Matrix2D)> {
    (WORKERS + 1..24usize, 1..12usize, 1..12usize)
        .prop_flat_map(|(rows, inner, cols)| (matrix(rows, inner), matrix(inner, cols)))
}

fn naive_add(a: &Matrix2D, b: &Matrix2D) -> Matrix2D {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.iter().zip(y).map(|(p, q)| p + q).collect())
        .collect()
}

fn naive_multiply(a: &Matrix2D, b: &Matrix2D) -> Matrix2D {
    let cols = b.first().map_or(0, Vec::len);
    a.iter()
        .map(|row| {
            (0..cols)
                .map(|c| row.iter().zip(b).map(|(x, b_row)| x * b_row[c]).sum())
                .collect()
        })
        .collect()
}

fn naive_transpose(a: &Matrix2D) -> Matrix2D {
    let cols = a.first().map_or(0, Vec::len);
    (0..cols).map(|c| a.iter().map(|row| row[c]).collect()).collect()
}

fn evaluate(graph: &mut ComputationGraph, root: NodeId) -> Matrix2D {
    let mut engine = LinearAlgebraEngine::new(WORKERS).unwrap();
    match engine.run(graph, root).unwrap() {
        RunOutcome::Resolved(m) => m,
        other => panic!("graph did not resolve: {:?}", other),
    }
}

fn binary(op: Operator, a: &Matrix2D, b: &Matrix2D) -> Matrix2D {
    let mut graph = ComputationGraph::new();
    let a = graph.add_matrix(a.clone()).unwrap();
    let b = graph.add_matrix(b.clone()).unwrap();
    let root = graph.add_operation(op, vec![a, b]).unwrap();
    evaluate(&mut graph, root)
}

fn unary(op: Operator, a: &Matrix2D) -> Matrix2D {
    let mut graph = ComputationGraph::new();
    let a = graph.add_matrix(a.clone()).unwrap();
    let root = graph.add_operation(op, vec![a]).unwrap();
    evaluate(&mut graph, root)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_add_matches_naive((a, b) in same_shape_pair()) {
        prop_assert_eq!(binary(Operator::Add, &a, &b), naive_add(&a, &b));
    }

    #[test]
    fn prop_multiply_matches_naive((a, b) in chained_pair()) {
        prop_assert_eq!(binary(Operator::Multiply, &a, &b), naive_multiply(&a, &b));
    }

    #[test]
    fn prop_negate_matches_naive(a in tall()) {
        let expected: Matrix2D = a.iter().map(|row| row.iter().map(|x| -x).collect()).collect();
        prop_assert_eq!(unary(Operator::Negate, &a), expected);
    }

    #[test]
    fn prop_transpose_matches_naive(a in tall()) {
        prop_assert_eq!(unary(Operator::Transpose, &a), naive_transpose(&a));
    }

    #[test]
    fn prop_transposed_product_round_trips((a, b) in chained_pair()) {
        // T(T(a * b)) == a * b, with every intermediate going through the pool.
        let mut graph = ComputationGraph::new();
        let a_id = graph.add_matrix(a.clone()).unwrap();
        let b_id = graph.add_matrix(b.clone()).unwrap();
        let product = graph.add_operation(Operator::Multiply, vec![a_id, b_id]).unwrap();
        let once = graph.add_operation(Operator::Transpose, vec![product]).unwrap();
        let twice = graph.add_operation(Operator::Transpose, vec![once]).unwrap();

        prop_assert_eq!(evaluate(&mut graph, twice), naive_multiply(&a, &b));
        prop_assert_eq!(graph.matrix(once).unwrap(), &naive_transpose(&naive_multiply(&a, &b)));
    }
}

#[test]
fn large_product_spreads_over_every_worker() {
    let a: Matrix2D = (0..64)
        .map(|r| (0..48).map(|c| ((r * 7 + c * 3) % 11) as f64 - 5.0).collect())
        .collect();
    let b: Matrix2D = (0..48)
        .map(|r| (0..32).map(|c| ((r * 5 + c) % 13) as f64 - 6.0).collect())
        .collect();

    let mut graph = ComputationGraph::new();
    let a_id = graph.add_matrix(a.clone()).unwrap();
    let b_id = graph.add_matrix(b.clone()).unwrap();
    let root = graph.add_operation(Operator::Multiply, vec![a_id, b_id]).unwrap();

    let mut engine = LinearAlgebraEngine::new(WORKERS).unwrap();
    let outcome = engine.run(&mut graph, root).unwrap();
    assert_eq!(outcome.matrix(), Some(&naive_multiply(&a, &b)));

    let report = engine.worker_report();
    assert_eq!(report.workers.len(), WORKERS);
    assert!(report.workers.iter().all(|w| w.idle));
}
