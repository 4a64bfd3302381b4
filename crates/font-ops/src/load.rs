//! Loading a binary font into a [`FontModel`]

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use kurbo::{CubicBez, Point, Vec2};
use log::{debug, warn};
use read_fonts::{
    FontRef, TableProvider,
    tables::glyf::{Anchor, Glyph as ReadGlyph},
    types::{GlyphId, Tag},
};
use skrifa::{
    GlyphNames, MetadataProvider,
    outline::{DrawSettings, OutlinePen},
    prelude::{LocationRef, Size},
};
use write_fonts::tables::{
    glyf::ComponentFlags,
    os2::SelectionFlags,
};

use crate::{
    Codepoint, FontError, GlyphName, Result, SubstitutionGraph, TableTag,
    model::{
        Component, ComponentAnchor, Contour, DecorationMetrics, FontModel, Glyph, NameEntry,
        Outline, OutlinePoint, ScriptBox, StyleInfo, TableData, VerticalMetrics,
    },
};

/// Maximum distance between a cubic and its quadratic approximation, in font units
const CUBIC_TOLERANCE: f64 = 1.0;

/// Tables rebuilt from the model when writing
const MODELLED_TABLES: [Tag; 13] = [
    Tag::new(b"head"),
    Tag::new(b"hhea"),
    Tag::new(b"maxp"),
    Tag::new(b"OS/2"),
    Tag::new(b"post"),
    Tag::new(b"name"),
    Tag::new(b"cmap"),
    Tag::new(b"hmtx"),
    Tag::new(b"glyf"),
    Tag::new(b"loca"),
    Tag::new(b"CFF "),
    Tag::new(b"CFF2"),
    Tag::new(b"GSUB"),
];

/// Tables without glyph ids or coordinates, copied verbatim
const PASSTHROUGH_TABLES: [Tag; 2] = [Tag::new(b"gasp"), Tag::new(b"meta")];

impl FontModel {
    /// Parse a TrueType or CFF flavoured OpenType font
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let font = FontRef::new(data)?;
        let head = font.head()?;
        let hhea = font.hhea()?;
        let num_glyphs = font.maxp()?.num_glyphs() as u32;

        let names = glyph_names(&font, num_glyphs);
        let outlines = if font.glyf().is_ok() {
            read_glyf_outlines(&font, &names)?
        } else if font.cff().is_ok() || font.cff2().is_ok() {
            draw_outlines(&font, num_glyphs)?
        } else {
            return Err(FontError::NoOutlines);
        };

        let hmtx = font.hmtx()?;
        let mut glyphs = IndexMap::with_capacity(names.len());
        for (gid, (name, outline)) in names.iter().zip(outlines).enumerate() {
            let gid = GlyphId::new(gid as u32);
            let glyph = Glyph {
                outline,
                advance: hmtx.advance(gid).unwrap_or(0) as f64,
                lsb: hmtx.side_bearing(gid).unwrap_or(0) as f64,
                source: None,
            };
            glyphs.insert(name.clone(), glyph);
        }

        let cmap: BTreeMap<Codepoint, GlyphName> = font
            .charmap()
            .mappings()
            .filter(|(_, gid)| gid.to_u32() != 0)
            .filter_map(|(cp, gid)| {
                Some((Codepoint::new(cp), names.get(gid.to_u32() as usize)?.clone()))
            })
            .collect();

        let mut metrics = VerticalMetrics {
            ascender: hhea.ascender().to_i16() as f64,
            descender: hhea.descender().to_i16() as f64,
            line_gap: hhea.line_gap().to_i16() as f64,
            win_ascent: hhea.ascender().to_i16() as f64,
            win_descent: -(hhea.descender().to_i16() as f64),
            ..Default::default()
        };
        let mut decoration = DecorationMetrics::default();
        let mut style = StyleInfo {
            font_revision: head.font_revision().to_f64(),
            created: head.created(),
            ..Default::default()
        };

        if let Ok(os2) = font.os2() {
            metrics.win_ascent = os2.us_win_ascent() as f64;
            metrics.win_descent = os2.us_win_descent() as f64;
            metrics.cap_height = os2.s_cap_height().unwrap_or(0) as f64;
            metrics.x_height = os2.sx_height().unwrap_or(0) as f64;

            decoration.strikeout_size = os2.y_strikeout_size() as f64;
            decoration.strikeout_position = os2.y_strikeout_position() as f64;
            decoration.subscript = ScriptBox {
                size: Vec2::new(os2.y_subscript_x_size() as f64, os2.y_subscript_y_size() as f64),
                offset: Vec2::new(
                    os2.y_subscript_x_offset() as f64,
                    os2.y_subscript_y_offset() as f64,
                ),
            };
            decoration.superscript = ScriptBox {
                size: Vec2::new(
                    os2.y_superscript_x_size() as f64,
                    os2.y_superscript_y_size() as f64,
                ),
                offset: Vec2::new(
                    os2.y_superscript_x_offset() as f64,
                    os2.y_superscript_y_offset() as f64,
                ),
            };

            style.weight_class = os2.us_weight_class();
            style.width_class = os2.us_width_class();
            style.fs_type = os2.fs_type();
            style.selection = SelectionFlags::from_bits_truncate(os2.fs_selection().bits());
            style.family_class = os2.s_family_class();
            style.panose.copy_from_slice(os2.panose_10());
            style.vendor = os2.ach_vend_id();
            style.unicode_ranges = [
                os2.ul_unicode_range_1(),
                os2.ul_unicode_range_2(),
                os2.ul_unicode_range_3(),
                os2.ul_unicode_range_4(),
            ];
            style.code_page_ranges = [
                os2.ul_code_page_range_1().unwrap_or(0),
                os2.ul_code_page_range_2().unwrap_or(0),
            ];
        }

        if let Ok(post) = font.post() {
            decoration.underline_position = post.underline_position().to_i16() as f64;
            decoration.underline_thickness = post.underline_thickness().to_i16() as f64;
            style.italic_angle = post.italic_angle().to_f64();
            style.is_fixed_pitch = post.is_fixed_pitch() != 0;
        }

        let mut model = FontModel {
            units_per_em: head.units_per_em(),
            metrics,
            decoration,
            style,
            glyphs,
            cmap,
            names: read_names(&font),
            tables: BTreeMap::new(),
            sources: Vec::new(),
            keep_glyph_names: false,
        };

        // Older OS/2 versions carry no cap or x height
        if model.metrics.cap_height <= 0.0 {
            model.metrics.cap_height = model.ink_top('H').unwrap_or(0.0);
        }
        if model.metrics.x_height <= 0.0 {
            model.metrics.x_height = model.ink_top('x').unwrap_or(0.0);
        }

        model.tables = read_other_tables(&font, &names);
        debug!(
            "Loaded font: {} glyphs, {} codepoints, {} upm",
            model.num_glyphs(),
            model.cmap.len(),
            model.units_per_em
        );
        Ok(model)
    }

    /// Top of the outline mapped from `ch`
    fn ink_top(&self, ch: char) -> Option<f64> {
        let name = self.cmap.get(&Codepoint::from(ch))?;
        self.bounds(name).map(|r| r.max_y())
    }
}

/// Glyph names from `post` or CFF, synthesized for unnamed glyphs
///
/// Duplicate names within one font get a numeric suffix.
fn glyph_names(font: &FontRef, num_glyphs: u32) -> Vec<GlyphName> {
    let source = GlyphNames::new(font);
    let mut seen: HashMap<GlyphName, usize> = HashMap::new();

    (0..num_glyphs)
        .map(|gid| {
            let name = match source.get(GlyphId::new(gid)) {
                Some(name) if !name.is_synthesized() => GlyphName::new(name.as_str()),
                _ if gid == 0 => GlyphName::notdef(),
                _ => GlyphName::from_gid(gid),
            };
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count == 1 { name } else { name.with_suffix(*count - 1) }
        })
        .collect()
}

fn read_glyf_outlines(font: &FontRef, names: &[GlyphName]) -> Result<Vec<Outline>> {
    let glyf = font.glyf()?;
    let loca = font.loca(None)?;

    let outlines = (0..names.len())
        .map(|gid| match loca.get_glyf(GlyphId::new(gid as u32), &glyf) {
            Ok(Some(ReadGlyph::Simple(simple))) => {
                let points: Vec<_> = simple.points().collect();
                let mut contours = Vec::new();
                let mut start = 0usize;
                for end in simple.end_pts_of_contours() {
                    let end = (end.get() as usize + 1).min(points.len());
                    if start >= end {
                        continue;
                    }
                    let contour: Contour = points[start..end]
                        .iter()
                        .map(|p| OutlinePoint {
                            pos: Point::new(p.x as f64, p.y as f64),
                            on_curve: p.on_curve,
                        })
                        .collect();
                    contours.push(contour);
                    start = end;
                }
                if contours.is_empty() { Outline::Empty } else { Outline::Simple(contours) }
            }
            Ok(Some(ReadGlyph::Composite(composite))) => {
                let components: Vec<Component> = composite
                    .components()
                    .filter_map(|comp| {
                        let glyph = names.get(comp.glyph.to_u32() as usize)?.clone();
                        let anchor = match comp.anchor {
                            Anchor::Offset { x, y } => {
                                ComponentAnchor::Offset(Vec2::new(x as f64, y as f64))
                            }
                            Anchor::Point { base, component } => {
                                ComponentAnchor::Point { base, component }
                            }
                        };
                        let flags: ComponentFlags = comp.flags.into();
                        let t = &comp.transform;
                        let transform = [t.xx, t.yx, t.xy, t.yy].map(|v| v.to_f32() as f64);
                        Some(Component { glyph, anchor, transform, flags })
                    })
                    .collect();
                if components.is_empty() {
                    Outline::Empty
                } else {
                    Outline::Composite(components)
                }
            }
            Ok(None) => Outline::Empty,
            Err(e) => {
                warn!("Glyph {} is unreadable, treating it as empty: {e}", names[gid]);
                Outline::Empty
            }
        })
        .collect();

    Ok(outlines)
}

/// Draw CFF or CFF2 outlines and convert them to quadratic contours
fn draw_outlines(font: &FontRef, num_glyphs: u32) -> Result<Vec<Outline>> {
    let outlines = font.outline_glyphs();
    let settings = || DrawSettings::unhinted(Size::unscaled(), LocationRef::default());

    (0..num_glyphs)
        .map(|gid| {
            let Some(glyph) = outlines.get(GlyphId::new(gid)) else {
                return Ok(Outline::Empty);
            };
            let mut pen = QuadraticPen::default();
            glyph
                .draw(settings(), &mut pen)
                .map_err(|e| FontError::Outline { gid, message: e.to_string() })?;
            let contours = pen.finish();
            Ok(if contours.is_empty() { Outline::Empty } else { Outline::Simple(contours) })
        })
        .collect()
}

/// Pen collecting quadratic TrueType contours
///
/// Cubic segments are approximated with quadratic splines and contour
/// direction is reversed to follow the TrueType winding convention.
#[derive(Default)]
struct QuadraticPen {
    contours: Vec<Contour>,
    current: Contour,
    last: Point,
}

impl QuadraticPen {
    fn push(&mut self, x: f64, y: f64, on_curve: bool) {
        let pos = Point::new(x, y);
        self.current.push(OutlinePoint { pos, on_curve });
        if on_curve {
            self.last = pos;
        }
    }

    fn finish_contour(&mut self) {
        let mut contour = std::mem::take(&mut self.current);
        // An explicit closing segment repeats the start point
        if contour.len() > 1
            && let (Some(first), Some(last)) = (contour.first(), contour.last())
            && first.on_curve
            && last.on_curve
            && first.pos == last.pos
        {
            contour.pop();
        }
        if contour.len() > 1 {
            contour[1..].reverse();
            self.contours.push(contour);
        }
    }

    fn finish(mut self) -> Vec<Contour> {
        self.finish_contour();
        self.contours
    }
}

impl OutlinePen for QuadraticPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.finish_contour();
        self.push(x as f64, y as f64, true);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push(x as f64, y as f64, true);
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.push(cx0 as f64, cy0 as f64, false);
        self.push(x as f64, y as f64, true);
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let cubic = CubicBez::new(
            self.last,
            Point::new(cx0 as f64, cy0 as f64),
            Point::new(cx1 as f64, cy1 as f64),
            Point::new(x as f64, y as f64),
        );
        let quads: Vec<_> = cubic.to_quads(CUBIC_TOLERANCE).map(|(_, _, q)| q).collect();
        for quad in quads {
            self.push(quad.p1.x, quad.p1.y, false);
            self.push(quad.p2.x, quad.p2.y, true);
        }
    }

    fn close(&mut self) {
        self.finish_contour();
    }
}

fn read_names(font: &FontRef) -> Vec<NameEntry> {
    let Ok(name) = font.name() else {
        return Vec::new();
    };
    name.name_record()
        .iter()
        .filter_map(|record| {
            let value = record.string(name.string_data()).ok()?.chars().collect::<String>();
            Some(NameEntry {
                platform_id: record.platform_id(),
                encoding_id: record.encoding_id(),
                language_id: record.language_id(),
                name_id: record.name_id().to_u16(),
                value,
            })
        })
        .collect()
}

fn read_other_tables(font: &FontRef, names: &[GlyphName]) -> BTreeMap<TableTag, TableData> {
    let mut tables = BTreeMap::new();

    if font.table_data(Tag::new(b"GSUB")).is_some() {
        match SubstitutionGraph::read(font, names) {
            Ok(graph) => {
                tables.insert(TableTag::new(b"GSUB"), TableData::Substitutions(graph));
            }
            Err(e) => warn!("Ignoring unreadable GSUB table: {e}"),
        }
    }

    for record in font.table_directory.table_records() {
        let tag = record.tag();
        if MODELLED_TABLES.contains(&tag) {
            continue;
        }
        let Some(data) = font.table_data(tag) else {
            continue;
        };
        let table = if PASSTHROUGH_TABLES.contains(&tag) {
            TableData::Raw(data.as_bytes().to_vec())
        } else {
            TableData::GlyphBound { len: data.len() }
        };
        tables.insert(TableTag::from(tag), table);
    }

    tables
}
