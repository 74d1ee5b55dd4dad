//! Parallel compilation support
//!
//! Compiles independent effect sources concurrently.

mod executor;

pub use executor::{compile_all, ParallelConfig};
