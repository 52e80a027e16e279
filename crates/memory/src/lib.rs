//! Concurrent numeric containers with per-row locking.
//!
//! A [`SharedVector`] guards its values with its own read/write lock, and a
//! [`SharedMatrix`] is nothing more than an atomically swappable sequence of
//! vector handles. Row tasks therefore only ever contend on the rows they
//! actually touch.

pub mod matrix;
pub mod vector;

pub use matrix::{MatrixSnapshot, SharedMatrix};
pub use vector::{Orientation, SharedVector};
