//! Glyph name types and utilities
//!
//! Glyphs are keyed by name inside a [`FontModel`](crate::FontModel) so that
//! glyph sets from different fonts can be combined without juggling glyph ids.

use std::{
    borrow::Borrow,
    fmt::{Display, Formatter, Result},
    ops::Deref,
};

/// Name of the glyph every font must carry at glyph id 0
pub const NOTDEF: &str = ".notdef";

/// A glyph name, unique within one font model
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphName(String);

impl GlyphName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Fallback name for a glyph id without a name in the source font
    pub fn from_gid(gid: u32) -> Self {
        Self(format!("glyph{gid:05}"))
    }

    pub fn notdef() -> Self {
        Self::new(NOTDEF)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Append a dotted suffix, e.g. `uni4E00` + `sc` = `uni4E00.sc`
    pub fn with_suffix(&self, suffix: impl Display) -> Self {
        Self(format!("{}.{suffix}", self.0))
    }
}

impl Deref for GlyphName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for GlyphName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for GlyphName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for GlyphName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for GlyphName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Display for GlyphName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GlyphName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for GlyphName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<GlyphName> for String {
    fn from(GlyphName(name): GlyphName) -> Self {
        name
    }
}
