//! CLI command implementations.

pub mod find;
pub mod scan;
pub mod show;
