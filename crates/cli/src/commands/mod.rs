//! CLI command implementations.

mod build;
mod charsets;
mod download;

pub use build::{build, list_scripts, plan};
pub use charsets::{extract_charset, generate_charsets};
pub use download::download;
