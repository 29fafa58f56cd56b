//! CLI command implementations.

pub mod blocks;
pub mod export;
pub mod status;
