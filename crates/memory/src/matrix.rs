use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use lae_core::{LaeError, Matrix2D, Result};

use crate::vector::{Orientation, SharedVector};

/// An immutable view of a matrix's vector sequence.
///
/// Cloning is cheap (one `Arc` bump). A snapshot keeps working on the
/// sequence it captured even if the owning [`SharedMatrix`] is reloaded.
#[derive(Debug, Clone, Default)]
pub struct MatrixSnapshot {
    vectors: Arc<Vec<Arc<SharedVector>>>,
}

impl MatrixSnapshot {
    /// Number of stored vectors (rows for row storage, columns otherwise).
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&Arc<SharedVector>> {
        self.vectors.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SharedVector>> {
        self.vectors.iter()
    }

    /// Orientation of the first stored vector; empty matrices count as row storage.
    pub fn orientation(&self) -> Orientation {
        self.vectors
            .first()
            .map(|v| v.orientation())
            .unwrap_or(Orientation::Row)
    }

    /// Logical row count, independent of storage orientation.
    pub fn row_count(&self) -> usize {
        match self.orientation() {
            Orientation::Row => self.vectors.len(),
            Orientation::Column => self.vectors.first().map_or(0, |v| v.len()),
        }
    }

    /// Logical column count, independent of storage orientation.
    pub fn col_count(&self) -> usize {
        match self.orientation() {
            Orientation::Row => self.vectors.first().map_or(0, |v| v.len()),
            Orientation::Column => self.vectors.len(),
        }
    }

    /// Values of logical row `r`. Each touched vector is locked on its own.
    pub fn row_values(&self, r: usize) -> Result<Vec<f64>> {
        match self.orientation() {
            Orientation::Row => self
                .vectors
                .get(r)
                .map(|v| v.read_lock().clone())
                .ok_or(LaeError::IndexOutOfBounds {
                    index: r,
                    len: self.vectors.len(),
                }),
            Orientation::Column => self
                .vectors
                .iter()
                .map(|column| {
                    let values = column.read_lock();
                    values.get(r).copied().ok_or(LaeError::IndexOutOfBounds {
                        index: r,
                        len: values.len(),
                    })
                })
                .collect(),
        }
    }

    /// Rebuild the logical matrix in row-major order.
    ///
    /// Every stored vector is read-locked for the whole reconstruction, so
    /// no row can change halfway through. Guards drop on every exit path.
    pub fn read_row_major(&self) -> Result<Matrix2D> {
        let guards: Vec<_> = self.vectors.iter().map(|v| v.read_lock()).collect();
        let Some(first) = guards.first() else {
            return Ok(Vec::new());
        };

        let orientation = self.orientation();
        let inner = first.len();
        for (i, (vector, values)) in self.vectors.iter().zip(&guards).enumerate() {
            if vector.orientation() != orientation {
                return Err(LaeError::Orientation(format!(
                    "vector {} is {} but the matrix is stored as {}",
                    i,
                    vector.orientation(),
                    orientation
                )));
            }
            if values.len() != inner {
                return Err(LaeError::RaggedMatrix {
                    row: i,
                    expected: inner,
                    found: values.len(),
                });
            }
        }

        let out = match orientation {
            Orientation::Row => guards.iter().map(|values| values.to_vec()).collect(),
            Orientation::Column => (0..inner)
                .map(|i| guards.iter().map(|column| column[i]).collect())
                .collect(),
        };
        Ok(out)
    }
}

/// A 2-D array stored as a sequence of [`SharedVector`]s.
///
/// The sequence is replaced as a whole on every load. Readers load the
/// current sequence without locking, so a concurrent load never yields a
/// torn view.
pub struct SharedMatrix {
    vectors: ArcSwap<Vec<Arc<SharedVector>>>,
}

impl Default for SharedMatrix {
    fn default() -> Self {
        Self {
            vectors: ArcSwap::from_pointee(Vec::new()),
        }
    }
}

impl fmt::Debug for SharedMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMatrix")
            .field("vectors", &self.snapshot())
            .finish()
    }
}

impl SharedMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(matrix: &[Vec<f64>]) -> Result<Self> {
        let m = Self::new();
        m.load_row_major(matrix)?;
        Ok(m)
    }

    /// One row vector per input row.
    pub fn load_row_major(&self, matrix: &[Vec<f64>]) -> Result<()> {
        check_rectangular(matrix)?;
        let vectors = matrix
            .iter()
            .map(|row| Arc::new(SharedVector::new(row.clone(), Orientation::Row)))
            .collect();
        self.vectors.store(Arc::new(vectors));
        Ok(())
    }

    /// One column vector per input column, so storage is the transpose of
    /// the input while the logical matrix is unchanged.
    ///
    /// Zero column vectors cannot record a row count, so an input with rows
    /// but no columns is stored as empty row vectors instead.
    pub fn load_column_major(&self, matrix: &[Vec<f64>]) -> Result<()> {
        let cols = check_rectangular(matrix)?;
        if cols == 0 {
            return self.load_row_major(matrix);
        }
        let vectors = (0..cols)
            .map(|j| {
                let column = matrix.iter().map(|row| row[j]).collect();
                Arc::new(SharedVector::new(column, Orientation::Column))
            })
            .collect();
        self.vectors.store(Arc::new(vectors));
        Ok(())
    }

    /// Capture the current vector sequence.
    pub fn snapshot(&self) -> MatrixSnapshot {
        MatrixSnapshot {
            vectors: self.vectors.load_full(),
        }
    }

    pub fn row(&self, index: usize) -> Option<Arc<SharedVector>> {
        self.vectors.load().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.vectors.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.load().is_empty()
    }

    pub fn orientation(&self) -> Orientation {
        self.snapshot().orientation()
    }

    pub fn read_row_major(&self) -> Result<Matrix2D> {
        self.snapshot().read_row_major()
    }
}

/// Column count of a rectangular input, or the first ragged row.
fn check_rectangular(matrix: &[Vec<f64>]) -> Result<usize> {
    let cols = matrix.first().map_or(0, |row| row.len());
    for (i, row) in matrix.iter().enumerate() {
        if row.len() != cols {
            return Err(LaeError::RaggedMatrix {
                row: i,
                expected: cols,
                found: row.len(),
            });
        }
    }
    Ok(cols)
}
