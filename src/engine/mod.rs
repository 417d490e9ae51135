//! Compile engine for Rule Card packages.
//!
//! This module contains the build pipeline:
//! - Loader: parses and schema-checks Rule Cards into an immutable corpus
//! - Guard: keeps manifest globs inside the corpus root
//! - Resolver: maps each agent to its validated rule set
//! - Hooks: merges scanner detection metadata
//! - Stamp: source digest, build date and version
//! - Compiler: assembles the package
//! - Coordinator: runs the pipeline across agents

mod compiler;
mod coordinator;
mod guard;
mod hooks;
mod loader;
mod resolver;
mod stamp;

pub use compiler::*;
pub use coordinator::*;
pub use guard::*;
pub use hooks::*;
pub use loader::{load_card, load_corpus, parse_card, Corpus, CorpusLoad};
pub use resolver::*;
pub use stamp::*;
