//! CLI command implementations.

pub mod blocks;
pub mod common;
pub mod generate;
pub mod resolve;
pub mod validate;
