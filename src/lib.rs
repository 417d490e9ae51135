//! Rule Card Compiler
//!
//! Turns a corpus of declarative YAML security Rule Cards into versioned,
//! integrity-stamped JSON agent packages consumed by guidance runtimes and
//! CI scanner orchestration.

pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod logging;
pub mod storage;

pub use error::{CompileError, CompileResult};
