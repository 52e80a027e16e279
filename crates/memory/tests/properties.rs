//! Algebraic properties of the shared containers.

use lae_memory::{Orientation, SharedMatrix, SharedVector};
use proptest::prelude::*;

fn finite() -> impl Strategy<Value = f64> {
    -1.0e6..1.0e6f64
}

/// Two equal-length vectors.
fn vector_pair() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (1usize..32).prop_flat_map(|n| {
        (
            prop::collection::vec(finite(), n),
            prop::collection::vec(finite(), n),
        )
    })
}

/// A rectangular matrix with at least one row; zero columns allowed.
fn rectangular() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1usize..8, 0usize..8).prop_flat_map(|(rows, cols)| {
        prop::collection::vec(prop::collection::vec(finite(), cols), rows)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_add_is_elementwise((a, b) in vector_pair()) {
        let left = SharedVector::new(a.clone(), Orientation::Row);
        let right = SharedVector::new(b.clone(), Orientation::Row);
        left.add(&right).unwrap();

        prop_assert_eq!(right.to_vec(), b.clone());
        for (i, v) in left.to_vec().into_iter().enumerate() {
            prop_assert_eq!(v, a[i] + b[i]);
        }
    }

    #[test]
    fn prop_dot_matches_sum_of_products((a, b) in vector_pair()) {
        let row = SharedVector::new(a.clone(), Orientation::Row);
        let column = SharedVector::new(b.clone(), Orientation::Column);
        let expected: f64 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        prop_assert_eq!(row.dot(&column).unwrap(), expected);

        let other_row = SharedVector::new(b, Orientation::Row);
        prop_assert!(row.dot(&other_row).is_err());
    }

    #[test]
    fn prop_load_then_read_recovers_input(m in rectangular()) {
        let matrix = SharedMatrix::new();
        matrix.load_row_major(&m).unwrap();
        prop_assert_eq!(matrix.read_row_major().unwrap(), m.clone());

        matrix.load_column_major(&m).unwrap();
        prop_assert_eq!(matrix.read_row_major().unwrap(), m);
    }

    #[test]
    fn prop_double_transpose_restores_orientation(values in prop::collection::vec(finite(), 0..16)) {
        let v = SharedVector::new(values.clone(), Orientation::Row);
        v.transpose();
        v.transpose();
        prop_assert_eq!(v.orientation(), Orientation::Row);
        prop_assert_eq!(v.to_vec(), values);
    }
}
