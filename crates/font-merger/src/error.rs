use std::result;

use opfonts_font_ops::{Codepoint, FontError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error(transparent)]
    Font(#[from] FontError),

    #[error("no fonts provided for merging")]
    NoFonts,

    #[error("script '{script}' has unitsPerEm {actual}, expected {expected}")]
    IncompatibleUnitsPerEm { script: String, expected: u16, actual: u16 },

    #[error("{codepoint} from script '{script}' is already mapped by script '{owner}'")]
    CodepointConflict { codepoint: Codepoint, script: String, owner: String },
}

pub type Result<T> = result::Result<T, MergeError>;
