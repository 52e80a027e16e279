pub mod config;
pub mod error;

pub use config::{Config, EngineConfig, PoolConfig};
pub use error::*;

/// A dense, row-major 2-D array of doubles as exchanged with callers.
pub type Matrix2D = Vec<Vec<f64>>;
