//! Editable font model shared by the opfonts pipeline.
//!
//! Fonts are loaded into a [`FontModel`] keyed by glyph name, transformed in
//! memory (subset, rescaled, merged, compacted) and serialized once as a
//! TrueType font.

mod closure;
mod cmap;
mod compact;
mod compile;
mod error;
mod glyph_name;
mod layout;
mod load;
mod model;
mod scale;
mod types;

pub use error::{FontError, Result};
pub use glyph_name::{GlyphName, NOTDEF};
pub use layout::{SubstKind, Substitution, SubstitutionGraph};
pub use model::{
    Component, ComponentAnchor, Contour, DecorationMetrics, FontModel, Glyph, IDENTITY, NameEntry,
    Outline, OutlinePoint, ScriptBox, SourceRecord, StyleInfo, TableData, VerticalMetrics,
};
pub use scale::SCALE_EPSILON;
pub use types::{Codepoint, TableTag};
