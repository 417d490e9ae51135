//! Storage layer for the Rule Card compiler.
//!
//! The output directory is the only resource a run mutates.

mod writer;

pub use writer::*;
