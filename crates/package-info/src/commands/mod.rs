//! CLI command implementations - one command per file.

pub mod config;
pub mod info;
