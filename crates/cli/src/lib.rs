//! opfonts CLI library.

pub mod cli;
pub mod commands;
pub mod fetch;
pub mod parallel;

pub use fetch::{CachedSources, Fetcher};
