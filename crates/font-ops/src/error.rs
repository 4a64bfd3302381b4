use std::result;

use read_fonts::ReadError;
use thiserror::Error;
use write_fonts::{BuilderError, error};

use crate::{GlyphName, TableTag};

#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to read font: {0}")]
    ReadError(#[from] ReadError),

    #[error("failed to write font: {0}")]
    WriteError(#[from] error::Error),

    #[error("failed to build font: {0}")]
    BuilderError(#[from] BuilderError),

    #[error("required table '{0}' not found")]
    MissingTable(TableTag),

    #[error("font has no outlines (neither glyf nor CFF)")]
    NoOutlines,

    #[error("failed to draw glyph {gid}: {message}")]
    Outline { gid: u32, message: String },

    #[error("glyph '{glyph}' references missing component '{component}'")]
    MissingComponent { glyph: GlyphName, component: GlyphName },

    #[error("font has {0} glyphs, more than the 65535 a font can hold")]
    TooManyGlyphs(usize),
}

pub type Result<T> = result::Result<T, FontError>;
