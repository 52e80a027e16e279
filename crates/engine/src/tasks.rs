//! Row task builders.
//!
//! Each task owns handles to exactly the vectors it touches: its own row of
//! the left operand, plus either the matching right row (add) or a snapshot
//! of the whole right operand (multiply). Tasks only ever write their own
//! row, so no two tasks in a batch contend for a write lock.

use std::sync::Arc;

use lae_core::LaeError;
use lae_memory::MatrixSnapshot;
use lae_scheduler::Task;

use crate::graph::Operator;

/// One task per stored vector of `left`.
pub fn row_tasks(operator: Operator, left: &MatrixSnapshot, right: &MatrixSnapshot) -> Vec<Task> {
    match operator {
        Operator::Add => add_tasks(left, right),
        Operator::Multiply => multiply_tasks(left, right),
        Operator::Negate => negate_tasks(left),
        Operator::Transpose => transpose_tasks(left),
    }
}

/// `left[r] += right[r]`.
pub fn add_tasks(left: &MatrixSnapshot, right: &MatrixSnapshot) -> Vec<Task> {
    let right_len = right.len();
    left.iter()
        .enumerate()
        .map(|(r, row)| {
            let row = Arc::clone(row);
            let other = right.row(r).cloned();
            Box::new(move || {
                let other = other.ok_or(LaeError::IndexOutOfBounds {
                    index: r,
                    len: right_len,
                })?;
                row.add(&other)
            }) as Task
        })
        .collect()
}

/// `left[r] = left[r] × right`.
pub fn multiply_tasks(left: &MatrixSnapshot, right: &MatrixSnapshot) -> Vec<Task> {
    left.iter()
        .map(|row| {
            let row = Arc::clone(row);
            let right = right.clone();
            Box::new(move || row.vec_mat_mul(&right)) as Task
        })
        .collect()
}

pub fn negate_tasks(left: &MatrixSnapshot) -> Vec<Task> {
    left.iter()
        .map(|row| {
            let row = Arc::clone(row);
            Box::new(move || {
                row.negate();
                Ok(())
            }) as Task
        })
        .collect()
}

/// Flip every row's orientation; reading the matrix back then yields the
/// transpose without copying any values.
pub fn transpose_tasks(left: &MatrixSnapshot) -> Vec<Task> {
    left.iter()
        .map(|row| {
            let row = Arc::clone(row);
            Box::new(move || {
                row.transpose();
                Ok(())
            }) as Task
        })
        .collect()
}
