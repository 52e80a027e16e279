use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use lae_core::{LaeError, Result};
use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};

use crate::matrix::MatrixSnapshot;

/// Logical role of a vector inside a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// The vector holds one row of its matrix.
    Row = 0,
    /// The vector holds one column of its matrix.
    Column = 1,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Row => Orientation::Column,
            Orientation::Column => Orientation::Row,
        }
    }

    fn from_tag(tag: u8) -> Self {
        if tag == Orientation::Column as u8 {
            Orientation::Column
        } else {
            Orientation::Row
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Row => write!(f, "row"),
            Orientation::Column => write!(f, "column"),
        }
    }
}

/// A fixed-length run of doubles behind its own read/write lock.
///
/// Length and orientation are mirrored into atomics so they can be read
/// without taking the lock. Both are only ever changed while the write lock
/// is held: orientation by [`transpose`](Self::transpose), length by the
/// wholesale replacement at the end of [`vec_mat_mul`](Self::vec_mat_mul).
pub struct SharedVector {
    values: RwLock<Vec<f64>>,
    len: AtomicUsize,
    orientation: AtomicU8,
}

impl SharedVector {
    pub fn new(values: Vec<f64>, orientation: Orientation) -> Self {
        Self {
            len: AtomicUsize::new(values.len()),
            values: RwLock::new(values),
            orientation: AtomicU8::new(orientation as u8),
        }
    }

    /// Read one element under the shared lock.
    pub fn get(&self, index: usize) -> Result<f64> {
        let values = self.values.read();
        values
            .get(index)
            .copied()
            .ok_or(LaeError::IndexOutOfBounds { index, len: values.len() })
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from_tag(self.orientation.load(Ordering::Acquire))
    }

    /// Copy of the current values.
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.read().clone()
    }

    /// Shared guard used by matrix-wide reads. Recursive so that a reader
    /// already holding this lock never queues behind a waiting writer.
    pub(crate) fn read_lock(&self) -> RwLockReadGuard<'_, Vec<f64>> {
        self.values.read_recursive()
    }

    /// Flip the orientation tag. Values are untouched.
    pub fn transpose(&self) {
        let _guard = self.values.write();
        self.orientation.fetch_xor(1, Ordering::AcqRel);
    }

    /// In-place elementwise `self += other`.
    ///
    /// Both vectors must have the same length and orientation. `other` is
    /// read under its shared lock while `self` is held exclusively; callers
    /// must not run `a.add(b)` and `b.add(a)` concurrently.
    pub fn add(&self, other: &SharedVector) -> Result<()> {
        if std::ptr::eq(self, other) {
            let mut values = self.values.write();
            values.iter_mut().for_each(|v| *v += *v);
            return Ok(());
        }

        let mut values = self.values.write();
        let theirs = other.values.read();
        if values.len() != theirs.len() {
            return Err(LaeError::Dimension(format!(
                "cannot add vectors of length {} and {}",
                values.len(),
                theirs.len()
            )));
        }
        if self.orientation() != other.orientation() {
            return Err(LaeError::Orientation(format!(
                "cannot add a {} vector to a {} vector",
                other.orientation(),
                self.orientation()
            )));
        }
        for (v, o) in values.iter_mut().zip(theirs.iter()) {
            *v += *o;
        }
        Ok(())
    }

    pub fn negate(&self) {
        let mut values = self.values.write();
        values.iter_mut().for_each(|v| *v = -*v);
    }

    /// Row-against-column dot product.
    pub fn dot(&self, other: &SharedVector) -> Result<f64> {
        if std::ptr::eq(self, other) {
            return Err(LaeError::Orientation(
                "dot product of a vector with itself has matching orientations".into(),
            ));
        }

        let values = self.values.read();
        let theirs = other.values.read();
        if values.len() != theirs.len() {
            return Err(LaeError::Dimension(format!(
                "cannot take dot product of vectors of length {} and {}",
                values.len(),
                theirs.len()
            )));
        }
        if self.orientation() == other.orientation() {
            return Err(LaeError::Orientation(format!(
                "dot product needs opposite orientations, both are {}",
                self.orientation()
            )));
        }
        Ok(values.iter().zip(theirs.iter()).map(|(a, b)| a * b).sum())
    }

    /// Replace `self` with `self × matrix`.
    ///
    /// The product is accumulated while only a shared lock is held on `self`
    /// and each matrix row is locked independently as it is read. The
    /// exclusive lock is taken afterwards just long enough to swap in the
    /// result, so tasks writing different rows never contend.
    pub fn vec_mat_mul(&self, matrix: &MatrixSnapshot) -> Result<()> {
        let product = {
            let values = self.values.read();
            let rows = matrix.row_count();
            if values.len() != rows {
                return Err(LaeError::Dimension(format!(
                    "vector of length {} cannot multiply a matrix with {} rows",
                    values.len(),
                    rows
                )));
            }

            let cols = matrix.col_count();
            let mut acc = vec![0.0; cols];
            for (r, &scalar) in values.iter().enumerate() {
                if scalar == 0.0 {
                    continue;
                }
                let row = matrix.row_values(r)?;
                if row.len() != cols {
                    return Err(LaeError::RaggedMatrix {
                        row: r,
                        expected: cols,
                        found: row.len(),
                    });
                }
                for (a, x) in acc.iter_mut().zip(row) {
                    *a += scalar * x;
                }
            }
            acc
        };

        let mut values = self.values.write();
        self.len.store(product.len(), Ordering::Release);
        *values = product;
        Ok(())
    }
}

impl fmt::Debug for SharedVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedVector")
            .field("orientation", &self.orientation())
            .field("values", &*self.values.read())
            .finish()
    }
}
