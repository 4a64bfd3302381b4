use std::{io, path::PathBuf, result};

use opfonts_font_merger::MergeError;
use opfonts_font_metadata::MetadataError;
use opfonts_font_ops::FontError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid range '{expr}' in script '{script}': end is before start")]
    InvalidRange { script: String, expr: String },

    #[error("source font for script '{script}' ({path}): {message}")]
    SourceFont { script: String, path: PathBuf, message: String },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("metadata for weight '{weight}': {source}")]
    Metadata {
        weight: String,
        #[source]
        source: MetadataError,
    },

    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("build aborted")]
    Aborted,
}

pub type Result<T> = result::Result<T, BuildError>;

impl BuildError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for errors that end the whole build rather than one script or weight
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidRange { .. } | Self::InvariantViolation(_) | Self::Aborted)
    }
}

impl From<MergeError> for BuildError {
    fn from(err: MergeError) -> Self {
        match err {
            MergeError::NoFonts => Self::config("no script contributed any glyphs"),
            MergeError::Font(err) => Self::from(err),
            err @ (MergeError::CodepointConflict { .. }
            | MergeError::IncompatibleUnitsPerEm { .. }) => Self::InvariantViolation(err.to_string()),
        }
    }
}

impl From<FontError> for BuildError {
    fn from(err: FontError) -> Self {
        match err {
            FontError::TooManyGlyphs(_) => Self::Config(err.to_string()),
            err => Self::InvariantViolation(err.to_string()),
        }
    }
}
