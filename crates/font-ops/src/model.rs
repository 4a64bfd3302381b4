//! Editable in-memory font model
//!
//! A [`FontModel`] keeps glyphs keyed by name with floating point outlines so
//! that several fonts can be subset, rescaled and combined before a single
//! serialization step.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use kurbo::{Affine, Point, Rect, Vec2};
use read_fonts::types::{LongDateTime, Tag};
use write_fonts::tables::{
    glyf::ComponentFlags,
    os2::SelectionFlags,
};

use crate::{Codepoint, GlyphName, SubstitutionGraph, TableTag};

/// Composite nesting deeper than this is treated as a cycle
const MAX_COMPONENT_DEPTH: usize = 64;

/// One point of a quadratic TrueType contour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlinePoint {
    pub pos: Point,
    pub on_curve: bool,
}

impl OutlinePoint {
    pub fn on(x: f64, y: f64) -> Self {
        Self { pos: Point::new(x, y), on_curve: true }
    }

    pub fn off(x: f64, y: f64) -> Self {
        Self { pos: Point::new(x, y), on_curve: false }
    }
}

/// A closed contour
pub type Contour = Vec<OutlinePoint>;

/// How a component is positioned inside its composite
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComponentAnchor {
    Offset(Vec2),
    /// Align point `base` of the composite with point `component` of the component
    Point { base: u16, component: u16 },
}

/// Identity 2x2 matrix in `[xx, yx, xy, yy]` order
pub const IDENTITY: [f64; 4] = [1.0, 0.0, 0.0, 1.0];

/// A reference to another glyph by name
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub glyph: GlyphName,
    pub anchor: ComponentAnchor,
    /// Linear part of the placement as `[xx, yx, xy, yy]`
    pub transform: [f64; 4],
    pub flags: ComponentFlags,
}

impl Component {
    /// A plain translated reference
    pub fn offset(glyph: GlyphName, offset: Vec2) -> Self {
        Self {
            glyph,
            anchor: ComponentAnchor::Offset(offset),
            transform: IDENTITY,
            flags: ComponentFlags::default(),
        }
    }

    /// The affine transform applied to the component's outline
    pub fn affine(&self) -> Affine {
        let offset = match self.anchor {
            ComponentAnchor::Offset(offset) => offset,
            ComponentAnchor::Point { .. } => Vec2::ZERO,
        };
        let [xx, yx, xy, yy] = self.transform;
        Affine::new([xx, yx, xy, yy, offset.x, offset.y])
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Outline {
    #[default]
    Empty,
    Simple(Vec<Contour>),
    Composite(Vec<Component>),
}

impl Outline {
    /// Names of directly referenced component glyphs
    pub fn components(&self) -> impl Iterator<Item = &GlyphName> {
        let components: &[Component] = match self {
            Outline::Composite(components) => components,
            _ => &[],
        };
        components.iter().map(|c| &c.glyph)
    }

    pub fn point_count(&self) -> usize {
        match self {
            Outline::Simple(contours) => contours.iter().map(Vec::len).sum(),
            _ => 0,
        }
    }

    /// Control box of a simple outline
    fn simple_bounds(contours: &[Contour]) -> Option<Rect> {
        let mut points = contours.iter().flatten().map(|p| p.pos);
        let first = points.next()?;
        Some(points.fold(Rect::from_points(first, first), |r, p| r.union_pt(p)))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Glyph {
    pub outline: Outline,
    pub advance: f64,
    pub lsb: f64,
    /// Index of the script this glyph was merged from
    pub source: Option<usize>,
}

impl Glyph {
    pub fn new(outline: Outline, advance: f64) -> Self {
        Self { outline, advance, ..Default::default() }
    }
}

/// Vertical metrics in font units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VerticalMetrics {
    pub ascender: f64,
    pub descender: f64,
    pub line_gap: f64,
    pub win_ascent: f64,
    pub win_descent: f64,
    pub cap_height: f64,
    pub x_height: f64,
}

/// Size and offset of a sub- or superscript box
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScriptBox {
    pub size: Vec2,
    pub offset: Vec2,
}

/// Decoration metrics in font units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecorationMetrics {
    pub underline_position: f64,
    pub underline_thickness: f64,
    pub strikeout_size: f64,
    pub strikeout_position: f64,
    pub subscript: ScriptBox,
    pub superscript: ScriptBox,
}

/// Style and classification fields carried from the source fonts
#[derive(Debug, Clone, PartialEq)]
pub struct StyleInfo {
    pub font_revision: f64,
    pub created: LongDateTime,
    pub weight_class: u16,
    pub width_class: u16,
    pub fs_type: u16,
    pub selection: SelectionFlags,
    pub family_class: i16,
    pub panose: [u8; 10],
    pub vendor: Tag,
    pub italic_angle: f64,
    pub is_fixed_pitch: bool,
    pub unicode_ranges: [u32; 4],
    pub code_page_ranges: [u32; 2],
}

impl Default for StyleInfo {
    fn default() -> Self {
        Self {
            font_revision: 1.0,
            created: LongDateTime::new(0),
            weight_class: 400,
            width_class: 5,
            fs_type: 0,
            selection: SelectionFlags::REGULAR,
            family_class: 0,
            panose: [0; 10],
            vendor: Tag::new(b"NONE"),
            italic_angle: 0.0,
            is_fixed_pitch: false,
            unicode_ranges: [0; 4],
            code_page_ranges: [0; 2],
        }
    }
}

/// One `name` table record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub name_id: u16,
    pub value: String,
}

impl NameEntry {
    /// Windows, Unicode BMP, US English
    pub fn windows(name_id: u16, value: impl Into<String>) -> Self {
        Self { platform_id: 3, encoding_id: 1, language_id: 0x409, name_id, value: value.into() }
    }

    /// Macintosh, Roman, English
    pub fn mac(name_id: u16, value: impl Into<String>) -> Self {
        Self { platform_id: 1, encoding_id: 0, language_id: 0, name_id, value: value.into() }
    }
}

/// Content of a table that is not rebuilt from the glyph model
#[derive(Debug, Clone, PartialEq)]
pub enum TableData {
    /// Glyph-independent table copied verbatim
    Raw(Vec<u8>),
    /// Glyph substitutions, re-encoded against the final glyph order
    Substitutions(SubstitutionGraph),
    /// Table tied to source glyph ids or units; listed and droppable but never written
    GlyphBound { len: usize },
}

/// Provenance of the glyphs merged from one script
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub script: String,
    /// Cap height over units-per-em of the source before subsetting
    pub cap_ratio: Option<f64>,
    /// Whether glyphs from this script take part in cap-height alignment
    pub scale: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontModel {
    pub units_per_em: u16,
    pub metrics: VerticalMetrics,
    pub decoration: DecorationMetrics,
    pub style: StyleInfo,
    /// Glyphs in glyph order; the first entry is the notdef glyph
    pub glyphs: IndexMap<GlyphName, Glyph>,
    pub cmap: BTreeMap<Codepoint, GlyphName>,
    pub names: Vec<NameEntry>,
    pub tables: BTreeMap<TableTag, TableData>,
    pub sources: Vec<SourceRecord>,
    /// Write glyph names into a version 2 `post` table
    pub keep_glyph_names: bool,
}

impl Default for FontModel {
    fn default() -> Self {
        let mut glyphs = IndexMap::new();
        glyphs.insert(GlyphName::notdef(), Glyph::default());
        Self {
            units_per_em: 1000,
            metrics: VerticalMetrics::default(),
            decoration: DecorationMetrics::default(),
            style: StyleInfo::default(),
            glyphs,
            cmap: BTreeMap::new(),
            names: Vec::new(),
            tables: BTreeMap::new(),
            sources: Vec::new(),
            keep_glyph_names: false,
        }
    }
}

impl FontModel {
    pub fn num_glyphs(&self) -> usize {
        self.glyphs.len()
    }

    /// Name of the glyph at glyph id 0
    pub fn notdef(&self) -> Option<&GlyphName> {
        self.glyphs.keys().next()
    }

    pub fn glyph(&self, name: &str) -> Option<&Glyph> {
        self.glyphs.get(name)
    }

    /// Glyph mapped from `cp`
    pub fn glyph_for(&self, cp: Codepoint) -> Option<&Glyph> {
        self.cmap.get(&cp).and_then(|name| self.glyphs.get(name))
    }

    /// Cap height over units-per-em, when the font defines a cap height
    pub fn cap_ratio(&self) -> Option<f64> {
        (self.metrics.cap_height > 0.0 && self.units_per_em > 0)
            .then(|| self.metrics.cap_height / self.units_per_em as f64)
    }

    pub fn substitutions(&self) -> Option<&SubstitutionGraph> {
        self.tables.values().find_map(|t| match t {
            TableData::Substitutions(graph) => Some(graph),
            _ => None,
        })
    }

    pub fn substitutions_mut(&mut self) -> Option<&mut SubstitutionGraph> {
        self.tables.values_mut().find_map(|t| match t {
            TableData::Substitutions(graph) => Some(graph),
            _ => None,
        })
    }

    /// Get the string for a name id, preferring the Windows English record
    pub fn name(&self, name_id: u16) -> Option<&str> {
        let mut candidates = self.names.iter().filter(|n| n.name_id == name_id);
        let first = candidates.clone().next();
        candidates
            .find(|n| n.platform_id == 3 && n.language_id == 0x409)
            .or(first)
            .map(|n| n.value.as_str())
    }

    /// Replace (or add) the Windows and Mac records for a name id
    pub fn set_name(&mut self, name_id: u16, value: &str) {
        self.names.retain(|n| {
            n.name_id != name_id
                || !matches!((n.platform_id, n.language_id), (3, 0x409) | (1, 0))
        });
        self.names.push(NameEntry::windows(name_id, value));
        self.names.push(NameEntry::mac(name_id, value));
        self.names.sort_by_key(|n| (n.platform_id, n.encoding_id, n.language_id, n.name_id));
    }

    /// Bounding box of a glyph with components resolved
    ///
    /// Returns None for empty glyphs and for glyphs whose components cannot
    /// be resolved.
    pub fn bounds(&self, name: &str) -> Option<Rect> {
        self.bounds_at_depth(name, 0)
    }

    fn bounds_at_depth(&self, name: &str, depth: usize) -> Option<Rect> {
        if depth > MAX_COMPONENT_DEPTH {
            return None;
        }
        match &self.glyphs.get(name)?.outline {
            Outline::Empty => None,
            Outline::Simple(contours) => Outline::simple_bounds(contours),
            Outline::Composite(components) => components
                .iter()
                .filter_map(|c| {
                    let rect = self.bounds_at_depth(&c.glyph, depth + 1)?;
                    Some(c.affine().transform_rect_bbox(rect))
                })
                .reduce(|a, b| a.union(b)),
        }
    }

    /// Keep only the named glyphs
    ///
    /// Codepoints mapped to removed glyphs are unmapped and substitutions
    /// touching removed glyphs are dropped. The notdef glyph is always kept.
    pub fn retain_glyphs(&mut self, keep: &HashSet<GlyphName>) {
        let notdef = self.notdef().cloned();
        self.glyphs
            .retain(|name, _| keep.contains(name) || Some(name) == notdef.as_ref());
        let glyphs = &self.glyphs;
        self.cmap.retain(|_, name| glyphs.contains_key(name));
        for table in self.tables.values_mut() {
            if let TableData::Substitutions(graph) = table {
                graph.retain_glyphs(|name| glyphs.contains_key(name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Contour {
        vec![
            OutlinePoint::on(x0, y0),
            OutlinePoint::on(x0, y0 + size),
            OutlinePoint::on(x0 + size, y0 + size),
            OutlinePoint::on(x0 + size, y0),
        ]
    }

    #[test]
    fn test_default_model_has_notdef() {
        let model = FontModel::default();
        assert_eq!(model.num_glyphs(), 1);
        assert_eq!(model.notdef().map(|n| n.as_str()), Some(".notdef"));
    }

    #[test]
    fn test_composite_bounds() {
        let mut model = FontModel::default();
        model
            .glyphs
            .insert("base".into(), Glyph::new(Outline::Simple(vec![square(0.0, 0.0, 100.0)]), 500.0));
        let mut scaled = Component::offset("base".into(), Vec2::new(50.0, 10.0));
        scaled.transform = [0.5, 0.0, 0.0, 0.5];
        model.glyphs.insert(
            "comp".into(),
            Glyph::new(
                Outline::Composite(vec![
                    Component::offset("base".into(), Vec2::new(200.0, 0.0)),
                    scaled,
                ]),
                500.0,
            ),
        );

        let rect = model.bounds("comp").unwrap();
        assert_eq!(rect, Rect::new(50.0, 0.0, 300.0, 100.0));
        assert!(model.bounds(".notdef").is_none());
    }

    #[test]
    fn test_retain_glyphs_unmaps_codepoints() {
        let mut model = FontModel::default();
        model.glyphs.insert("A".into(), Glyph::default());
        model.glyphs.insert("B".into(), Glyph::default());
        model.cmap.insert(Codepoint::new(0x41), "A".into());
        model.cmap.insert(Codepoint::new(0x42), "B".into());

        model.retain_glyphs(&HashSet::from([GlyphName::new("A")]));

        assert_eq!(model.num_glyphs(), 2);
        assert!(model.glyph(".notdef").is_some());
        assert_eq!(model.cmap.len(), 1);
        assert!(model.glyph_for(Codepoint::new(0x41)).is_some());
    }

    #[test]
    fn test_set_name_replaces_both_platforms() {
        let mut model = FontModel::default();
        model.names.push(NameEntry::windows(1, "Old"));
        model.names.push(NameEntry::mac(1, "Old"));
        model.set_name(1, "New");

        assert_eq!(model.names.len(), 2);
        assert_eq!(model.name(1), Some("New"));
    }
}
