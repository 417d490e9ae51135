//! Domain types for the Rule Card compiler.
//!
//! This module contains the authored inputs and the derived artifact.

mod manifest;
mod package;
mod rule_card;

pub use manifest::*;
pub use package::*;
pub use rule_card::*;
