//! Codepoint-driven glyph subsetting of a [`FontModel`].
//!
//! The subset keeps the glyphs mapped from the requested codepoints, the
//! notdef glyph, and everything those glyphs reach through composite
//! components and substitutions. Glyph order is preserved, so subsetting an
//! already subset font with the same codepoints changes nothing.
//!
//! # Example
//!
//! ```no_run
//! use opfonts_font_subsetter::Subsetter;
//!
//! let font_data: &[u8] = &[];
//! let (subset, report) = Subsetter::new()
//!     .with_unicode_ranges([(0x3040, 0x309F)])
//!     .drop_vf_tables(true)
//!     .subset_font(font_data)
//!     .unwrap();
//! println!("kept {} glyphs", report.glyphs_kept);
//! ```

use std::collections::BTreeSet;

use log::debug;
use opfonts_font_ops::{Codepoint, FontModel, Result, TableTag};

/// Variable font tables to drop during subsetting.
///
/// Outlines are read at the default instance, so these tables no longer
/// describe the subset font.
pub const VF_TABLES_TO_DROP: &[&[u8; 4]] = &[
    b"HVAR", b"MVAR", b"STAT", b"avar", b"fvar", b"gvar", b"cvar",
];

/// Glyph and codepoint counts of one subsetting run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubsetReport {
    /// Requested codepoints the font maps to a glyph
    pub codepoints_matched: usize,
    pub glyphs_kept: usize,
    pub glyphs_removed: usize,
}

/// Font subsetter with builder pattern.
#[derive(Debug, Default, Clone)]
pub struct Subsetter {
    codepoints: BTreeSet<Codepoint>,
    drop_vf_tables: bool,
}

impl Subsetter {
    /// Creates a subsetter that keeps nothing but the notdef glyph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds individual codepoints to include in the subset.
    pub fn with_codepoints(mut self, codepoints: impl IntoIterator<Item = Codepoint>) -> Self {
        self.codepoints.extend(codepoints);
        self
    }

    /// Adds Unicode ranges to include in the subset.
    ///
    /// Each range is a tuple of (start, end) code points, inclusive.
    pub fn with_unicode_ranges(mut self, ranges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        for (start, end) in ranges {
            self.codepoints.extend((start..=end).map(Codepoint::new));
        }
        self
    }

    /// Sets whether to drop variable font tables.
    pub fn drop_vf_tables(mut self, drop: bool) -> Self {
        self.drop_vf_tables = drop;
        self
    }

    /// Subset the model in place.
    ///
    /// Codepoints outside the requested set are unmapped. A set that matches
    /// nothing leaves only the notdef glyph and is not an error.
    pub fn subset(&self, model: &mut FontModel) -> SubsetReport {
        let before = model.num_glyphs();

        model.cmap.retain(|cp, _| self.codepoints.contains(cp));
        let keep = model.reachable_glyphs();
        model.retain_glyphs(&keep);

        if self.drop_vf_tables {
            for tag in VF_TABLES_TO_DROP {
                model.tables.remove(&TableTag::new(tag));
            }
        }

        let report = SubsetReport {
            codepoints_matched: model.cmap.len(),
            glyphs_kept: model.num_glyphs(),
            glyphs_removed: before - model.num_glyphs(),
        };
        debug!(
            "Subset {} requested codepoints: {} matched, {} glyphs kept, {} removed",
            self.codepoints.len(),
            report.codepoints_matched,
            report.glyphs_kept,
            report.glyphs_removed
        );
        report
    }

    /// Parse font data and subset it.
    pub fn subset_font(&self, data: &[u8]) -> Result<(FontModel, SubsetReport)> {
        let mut model = FontModel::from_bytes(data)?;
        let report = self.subset(&mut model);
        Ok((model, report))
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Vec2;
    use opfonts_font_ops::{
        Component, Glyph, Outline, OutlinePoint, Substitution, SubstitutionGraph, TableData,
    };
    use read_fonts::types::Tag;

    use super::*;

    fn dot() -> Glyph {
        Glyph::new(Outline::Simple(vec![vec![OutlinePoint::on(0.0, 0.0)]]), 500.0)
    }

    fn make_model() -> FontModel {
        let mut model = FontModel::default();
        for name in ["a", "b", "acute", "a.sc", "uni3042", "uni3044"] {
            model.glyphs.insert(name.into(), dot());
        }
        model.glyphs.insert(
            "aacute".into(),
            Glyph::new(
                Outline::Composite(vec![
                    Component::offset("a".into(), Vec2::ZERO),
                    Component::offset("acute".into(), Vec2::new(80.0, 0.0)),
                ]),
                500.0,
            ),
        );
        for (cp, name) in [
            (0x61, "a"),
            (0x62, "b"),
            (0xE1, "aacute"),
            (0x3042, "uni3042"),
            (0x3044, "uni3044"),
        ] {
            model.cmap.insert(Codepoint::new(cp), name.into());
        }
        model.tables.insert(
            TableTag::new(b"GSUB"),
            TableData::Substitutions(SubstitutionGraph {
                rules: vec![
                    Substitution::single(Tag::new(b"smcp"), "a", "a.sc"),
                    Substitution::single(Tag::new(b"smcp"), "b", "a.sc"),
                ],
            }),
        );
        model.tables.insert(TableTag::new(b"fvar"), TableData::GlyphBound { len: 16 });
        model
    }

    fn names(model: &FontModel) -> Vec<&str> {
        model.glyphs.keys().map(|n| n.as_str()).collect()
    }

    #[test]
    fn test_subset_keeps_closure_in_glyph_order() {
        let mut model = make_model();
        let report = Subsetter::new().with_codepoints([Codepoint::new(0xE1)]).subset(&mut model);

        assert_eq!(names(&model), vec![".notdef", "a", "acute", "a.sc", "aacute"]);
        assert_eq!(model.cmap.len(), 1);
        assert_eq!(report.codepoints_matched, 1);
        assert_eq!(report.glyphs_kept, 5);
        assert_eq!(report.glyphs_removed, 3);

        // The rule from `b` lost its input
        assert_eq!(model.substitutions().map(|g| g.len()), Some(1));
    }

    #[test]
    fn test_subset_by_range() {
        let mut model = make_model();
        Subsetter::new().with_unicode_ranges([(0x3040, 0x309F)]).subset(&mut model);
        assert_eq!(names(&model), vec![".notdef", "uni3042", "uni3044"]);
    }

    #[test]
    fn test_subset_is_idempotent() {
        let subsetter = Subsetter::new().with_unicode_ranges([(0x61, 0x61), (0x3042, 0x3042)]);
        let mut model = make_model();
        subsetter.subset(&mut model);
        let once = model.clone();
        let report = subsetter.subset(&mut model);

        assert_eq!(model, once);
        assert_eq!(report.glyphs_removed, 0);
    }

    #[test]
    fn test_no_matches_keeps_notdef() {
        let mut model = make_model();
        let report = Subsetter::new().with_unicode_ranges([(0xAC00, 0xD7A3)]).subset(&mut model);

        assert_eq!(names(&model), vec![".notdef"]);
        assert_eq!(report.codepoints_matched, 0);
        assert!(model.cmap.is_empty());
    }

    #[test]
    fn test_drop_vf_tables() {
        let mut model = make_model();
        Subsetter::new().drop_vf_tables(true).subset(&mut model);
        assert!(!model.tables.contains_key(&TableTag::new(b"fvar")));

        let mut model = make_model();
        Subsetter::new().subset(&mut model);
        assert!(model.tables.contains_key(&TableTag::new(b"fvar")));
    }

    #[test]
    fn test_builder_chain() {
        let subsetter = Subsetter::new()
            .with_unicode_ranges([(0x41, 0x43)])
            .with_codepoints([Codepoint::new(0x42), Codepoint::new(0x3000)])
            .drop_vf_tables(true);

        assert!(subsetter.drop_vf_tables);
        assert_eq!(subsetter.codepoints.len(), 4);
    }
}
