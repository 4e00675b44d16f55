//! CLI command implementations.

pub mod common;
pub mod nodes;
pub mod resolve;
pub mod run;
pub mod split;
pub mod validate;
