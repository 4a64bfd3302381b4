//! Serializing a [`FontModel`] as a TrueType font

use std::collections::HashMap;

use font_types::{F2Dot14, FWord, Fixed, GlyphId16, UfWord, Version16Dot16};
use kurbo::Rect;
use log::{debug, warn};
use read_fonts::{
    tables::{
        glyf::CurvePoint,
        name::{Encoding, MacRomanMapping},
    },
    types::NameId,
};
use write_fonts::{
    FontBuilder,
    tables::{
        glyf::{
            Anchor, Bbox, Component as WriteComponent, CompositeGlyph, Contour as WriteContour,
            GlyfLocaBuilder, Glyph as WriteGlyph, SimpleGlyph, Transform,
        },
        head::{Flags, Head, MacStyle},
        hhea::Hhea,
        hmtx::{Hmtx, LongMetric},
        loca::LocaFormat,
        maxp::Maxp,
        name::{Name, NameRecord},
        os2::{Os2, SelectionFlags},
        post::Post,
    },
};

use crate::{
    FontError, GlyphName, Result, cmap,
    model::{ComponentAnchor, FontModel, Outline, TableData},
    scale::{otround, round_vec},
};

/// Glyph ids are 16 bit
const MAX_GLYPHS: usize = u16::MAX as usize;

/// Per-glyph values the font-wide tables are derived from
struct GlyphStats {
    bbox: Option<Bbox>,
    advance: u16,
    lsb: i16,
}

impl FontModel {
    /// Serialize the model as a TrueType (`glyf`) font
    pub fn compile(&self) -> Result<Vec<u8>> {
        if self.num_glyphs() > MAX_GLYPHS {
            return Err(FontError::TooManyGlyphs(self.num_glyphs()));
        }

        let glyph_ids: HashMap<&str, u16> = self
            .glyphs
            .keys()
            .enumerate()
            .map(|(gid, name)| (name.as_str(), gid as u16))
            .collect();

        let mut glyf_builder = GlyfLocaBuilder::new();
        let mut stats = Vec::with_capacity(self.num_glyphs());
        for (name, glyph) in &self.glyphs {
            let write_glyph = self.write_glyph(name, &glyph_ids)?;
            let bbox = match &write_glyph {
                WriteGlyph::Simple(simple) => Some(simple.bbox),
                WriteGlyph::Composite(composite) => Some(composite.bbox),
                WriteGlyph::Empty => None,
            };
            glyf_builder.add_glyph(&write_glyph)?;
            stats.push(GlyphStats {
                bbox,
                advance: otround(glyph.advance).clamp(0.0, u16::MAX as f64) as u16,
                lsb: bbox.map(|b| b.x_min).unwrap_or_else(|| clamp_i16(glyph.lsb)),
            });
        }
        let (glyf, loca, loca_format) = glyf_builder.build();

        let font_bbox = stats.iter().filter_map(|s| s.bbox).reduce(|a, b| a.union(b));
        let font_bbox = font_bbox.unwrap_or(Bbox { x_min: 0, y_min: 0, x_max: 0, y_max: 0 });

        let mut builder = FontBuilder::new();
        builder.add_table(&self.build_head(font_bbox, loca_format))?;
        builder.add_table(&self.build_hhea(&stats))?;
        builder.add_table(&Hmtx::new(
            stats
                .iter()
                .map(|s| LongMetric { advance: s.advance, side_bearing: s.lsb })
                .collect(),
            vec![],
        ))?;
        builder.add_table(&self.build_maxp())?;
        builder.add_table(&self.build_os2(&stats))?;
        builder.add_table(&self.build_post())?;
        builder.add_table(&self.build_name())?;

        let mappings: Vec<(u32, u32)> = self
            .cmap
            .iter()
            .filter_map(|(cp, name)| Some((cp.to_u32(), *glyph_ids.get(name.as_str())? as u32)))
            .collect();
        builder.add_table(&cmap::build_cmap_format12(&mappings))?;
        builder.add_table(&glyf)?;
        builder.add_table(&loca)?;

        for (tag, table) in &self.tables {
            match table {
                TableData::Raw(data) => {
                    builder.add_raw(tag.tag(), data.as_slice());
                }
                TableData::Substitutions(graph) => match graph.build(&glyph_ids) {
                    Some(gsub) => {
                        builder.add_table(&gsub)?;
                    }
                    None => debug!("No encodable substitutions left, omitting {tag}"),
                },
                TableData::GlyphBound { .. } => {
                    warn!("Table '{tag}' cannot follow glyph or unit changes, omitting it")
                }
            }
        }

        Ok(builder.build())
    }

    fn write_glyph(&self, name: &GlyphName, glyph_ids: &HashMap<&str, u16>) -> Result<WriteGlyph> {
        let glyph = &self.glyphs[name];
        let write_glyph = match &glyph.outline {
            Outline::Empty => WriteGlyph::Empty,
            Outline::Simple(contours) => {
                let contours: Vec<WriteContour> = contours
                    .iter()
                    .map(|contour| {
                        contour
                            .iter()
                            .map(|p| {
                                CurvePoint::new(clamp_i16(p.pos.x), clamp_i16(p.pos.y), p.on_curve)
                            })
                            .collect::<Vec<_>>()
                            .into()
                    })
                    .collect();
                let bbox = points_bbox(&contours);
                match bbox {
                    Some(bbox) => {
                        WriteGlyph::Simple(SimpleGlyph { bbox, contours, instructions: vec![] })
                    }
                    None => WriteGlyph::Empty,
                }
            }
            Outline::Composite(components) => {
                let mut write_components = Vec::with_capacity(components.len());
                for component in components {
                    let gid = glyph_ids.get(component.glyph.as_str()).ok_or_else(|| {
                        FontError::MissingComponent {
                            glyph: name.clone(),
                            component: component.glyph.clone(),
                        }
                    })?;
                    // Composites referencing empty glyphs are rejected by OTS
                    if self.bounds(&component.glyph).is_none() {
                        continue;
                    }
                    let anchor = match component.anchor {
                        ComponentAnchor::Offset(offset) => {
                            let offset = round_vec(offset);
                            Anchor::Offset { x: clamp_i16(offset.x), y: clamp_i16(offset.y) }
                        }
                        ComponentAnchor::Point { base, component } => {
                            Anchor::Point { base, component }
                        }
                    };
                    write_components.push(WriteComponent::new(
                        GlyphId16::new(*gid),
                        anchor,
                        write_transform(component.transform),
                        component.flags,
                    ));
                }
                let bbox = self.bounds(name).map(Bbox::from);
                let mut write_components = write_components.into_iter();
                match (write_components.next(), bbox) {
                    (Some(first), Some(bbox)) => {
                        let mut composite = CompositeGlyph::new(first, bbox);
                        for component in write_components {
                            composite.add_component(component, bbox);
                        }
                        WriteGlyph::Composite(composite)
                    }
                    _ => WriteGlyph::Empty,
                }
            }
        };
        Ok(write_glyph)
    }

    fn build_head(&self, bbox: Bbox, loca_format: LocaFormat) -> Head {
        let mut mac_style = MacStyle::empty();
        if self.style.selection.contains(SelectionFlags::BOLD) {
            mac_style |= MacStyle::BOLD;
        }
        if self.style.selection.contains(SelectionFlags::ITALIC) {
            mac_style |= MacStyle::ITALIC;
        }

        Head {
            font_revision: Fixed::from_f64(self.style.font_revision),
            checksum_adjustment: 0,
            magic_number: 0x5F0F3CF5,
            // Baseline at y=0, left sidebearing point at x=0
            flags: Flags::from_bits_truncate(0x0003),
            units_per_em: self.units_per_em,
            created: self.style.created,
            modified: self.style.created,
            x_min: bbox.x_min,
            y_min: bbox.y_min,
            x_max: bbox.x_max,
            y_max: bbox.y_max,
            mac_style,
            lowest_rec_ppem: 8,
            font_direction_hint: 2,
            index_to_loc_format: match loca_format {
                LocaFormat::Short => 0,
                LocaFormat::Long => 1,
            },
        }
    }

    fn build_hhea(&self, stats: &[GlyphStats]) -> Hhea {
        let advance_width_max = stats.iter().map(|s| s.advance).max().unwrap_or(0);
        let inked = || stats.iter().filter_map(|s| Some((s, s.bbox?)));
        let min_lsb = inked().map(|(s, _)| s.lsb).min().unwrap_or(0);
        let min_rsb = inked()
            .map(|(s, b)| clamp_i16(s.advance as f64 - s.lsb as f64 - (b.x_max - b.x_min) as f64))
            .min()
            .unwrap_or(0);
        let x_max_extent = inked()
            .map(|(s, b)| clamp_i16(s.lsb as f64 + (b.x_max - b.x_min) as f64))
            .max()
            .unwrap_or(0);

        Hhea {
            ascender: FWord::new(clamp_i16(self.metrics.ascender)),
            descender: FWord::new(clamp_i16(self.metrics.descender)),
            line_gap: FWord::new(clamp_i16(self.metrics.line_gap)),
            advance_width_max: UfWord::new(advance_width_max),
            min_left_side_bearing: FWord::new(min_lsb),
            min_right_side_bearing: FWord::new(min_rsb),
            x_max_extent: FWord::new(x_max_extent),
            caret_slope_rise: 1,
            caret_slope_run: 0,
            caret_offset: 0,
            number_of_h_metrics: stats.len() as u16,
        }
    }

    fn build_maxp(&self) -> Maxp {
        let mut max_points = 0;
        let mut max_contours = 0;
        let mut max_composite_points = 0;
        let mut max_composite_contours = 0;
        let mut max_component_elements = 0;
        let mut max_component_depth = 0;

        for (name, glyph) in &self.glyphs {
            match &glyph.outline {
                Outline::Simple(contours) => {
                    max_points = max_points.max(glyph.outline.point_count());
                    max_contours = max_contours.max(contours.len());
                }
                Outline::Composite(components) => {
                    let (points, contours, depth) = self.flattened_size(name, 0);
                    max_composite_points = max_composite_points.max(points);
                    max_composite_contours = max_composite_contours.max(contours);
                    max_component_elements = max_component_elements.max(components.len());
                    max_component_depth = max_component_depth.max(depth);
                }
                Outline::Empty => {}
            }
        }

        let clamp = |v: usize| Some(v.min(u16::MAX as usize) as u16);
        Maxp {
            num_glyphs: self.num_glyphs() as u16,
            max_points: clamp(max_points),
            max_contours: clamp(max_contours),
            max_composite_points: clamp(max_composite_points),
            max_composite_contours: clamp(max_composite_contours),
            max_zones: Some(1),
            max_twilight_points: Some(0),
            max_storage: Some(0),
            max_function_defs: Some(0),
            max_instruction_defs: Some(0),
            max_stack_elements: Some(0),
            max_size_of_instructions: Some(0),
            max_component_elements: clamp(max_component_elements),
            max_component_depth: clamp(max_component_depth),
        }
    }

    /// Points, contours and nesting depth of a glyph with components expanded
    fn flattened_size(&self, name: &str, depth: usize) -> (usize, usize, usize) {
        if depth > 64 {
            return (0, 0, depth);
        }
        match self.glyphs.get(name).map(|g| &g.outline) {
            Some(Outline::Simple(contours)) => {
                (contours.iter().map(Vec::len).sum(), contours.len(), depth)
            }
            Some(Outline::Composite(components)) => components.iter().fold(
                (0, 0, depth + 1),
                |(points, contours, max_depth), c| {
                    let (p, n, d) = self.flattened_size(&c.glyph, depth + 1);
                    (points + p, contours + n, max_depth.max(d))
                },
            ),
            _ => (0, 0, depth),
        }
    }

    fn build_os2(&self, stats: &[GlyphStats]) -> Os2 {
        let advances: Vec<u32> =
            stats.iter().filter(|s| s.advance > 0).map(|s| s.advance as u32).collect();
        let x_avg_char_width = match advances.len() {
            0 => 0,
            n => (advances.iter().sum::<u32>() as f64 / n as f64).round() as i16,
        };
        let first_char = self.cmap.keys().next().map(|c| c.to_u32()).unwrap_or(0);
        let last_char = self.cmap.keys().next_back().map(|c| c.to_u32()).unwrap_or(0);
        let max_context = self
            .substitutions()
            .and_then(|g| g.rules.iter().map(|r| r.input.len()).max())
            .unwrap_or(0);

        let m = &self.metrics;
        let d = &self.decoration;
        Os2 {
            x_avg_char_width,
            us_weight_class: self.style.weight_class,
            us_width_class: self.style.width_class,
            fs_type: self.style.fs_type,
            y_subscript_x_size: clamp_i16(d.subscript.size.x),
            y_subscript_y_size: clamp_i16(d.subscript.size.y),
            y_subscript_x_offset: clamp_i16(d.subscript.offset.x),
            y_subscript_y_offset: clamp_i16(d.subscript.offset.y),
            y_superscript_x_size: clamp_i16(d.superscript.size.x),
            y_superscript_y_size: clamp_i16(d.superscript.size.y),
            y_superscript_x_offset: clamp_i16(d.superscript.offset.x),
            y_superscript_y_offset: clamp_i16(d.superscript.offset.y),
            y_strikeout_size: clamp_i16(d.strikeout_size),
            y_strikeout_position: clamp_i16(d.strikeout_position),
            s_family_class: self.style.family_class,
            panose_10: self.style.panose,
            ul_unicode_range_1: self.style.unicode_ranges[0],
            ul_unicode_range_2: self.style.unicode_ranges[1],
            ul_unicode_range_3: self.style.unicode_ranges[2],
            ul_unicode_range_4: self.style.unicode_ranges[3],
            ach_vend_id: self.style.vendor,
            fs_selection: self.style.selection,
            us_first_char_index: first_char.min(0xFFFF) as u16,
            us_last_char_index: last_char.min(0xFFFF) as u16,
            s_typo_ascender: clamp_i16(m.ascender),
            s_typo_descender: clamp_i16(m.descender),
            s_typo_line_gap: clamp_i16(m.line_gap),
            us_win_ascent: otround(m.win_ascent).clamp(0.0, u16::MAX as f64) as u16,
            us_win_descent: otround(m.win_descent).clamp(0.0, u16::MAX as f64) as u16,
            ul_code_page_range_1: Some(self.style.code_page_ranges[0]),
            ul_code_page_range_2: Some(self.style.code_page_ranges[1]),
            sx_height: Some(clamp_i16(m.x_height)),
            s_cap_height: Some(clamp_i16(m.cap_height)),
            us_default_char: Some(0),
            us_break_char: Some(0x20),
            us_max_context: Some(max_context as u16),
            us_lower_optical_point_size: None,
            us_upper_optical_point_size: None,
        }
    }

    fn build_post(&self) -> Post {
        let mut post = Post {
            version: Version16Dot16::VERSION_3_0,
            italic_angle: Fixed::from_f64(self.style.italic_angle),
            underline_position: FWord::new(clamp_i16(self.decoration.underline_position)),
            underline_thickness: FWord::new(clamp_i16(self.decoration.underline_thickness)),
            is_fixed_pitch: self.style.is_fixed_pitch as u32,
            min_mem_type42: 0,
            max_mem_type42: 0,
            min_mem_type1: 0,
            max_mem_type1: 0,
            num_glyphs: None,
            glyph_name_index: None,
            string_data: None,
        };
        if self.keep_glyph_names {
            let named = Post::new_v2(self.glyphs.keys().map(|n| n.as_str()));
            post.version = named.version;
            post.num_glyphs = named.num_glyphs;
            post.glyph_name_index = named.glyph_name_index;
            post.string_data = named.string_data;
        }
        post
    }

    fn build_name(&self) -> Name {
        let mut entries: Vec<_> = self
            .names
            .iter()
            .filter(|n| {
                let encodable = Encoding::new(n.platform_id, n.encoding_id) != Encoding::MacRoman
                    || n.value.chars().all(|c| MacRomanMapping.encode(c).is_some());
                if !encodable {
                    debug!("Dropping Mac name {} not representable in MacRoman", n.name_id);
                }
                encodable
            })
            .collect();
        entries.sort_by_key(|n| (n.platform_id, n.encoding_id, n.language_id, n.name_id));
        entries.dedup_by_key(|n| (n.platform_id, n.encoding_id, n.language_id, n.name_id));
        Name::new(
            entries
                .into_iter()
                .map(|n| {
                    NameRecord::new(
                        n.platform_id,
                        n.encoding_id,
                        n.language_id,
                        NameId::new(n.name_id),
                        n.value.clone().into(),
                    )
                })
                .collect(),
        )
    }
}

/// Control box of rounded contours
fn points_bbox(contours: &[WriteContour]) -> Option<Bbox> {
    let mut points = contours.iter().flat_map(|c| c.iter());
    let first = points.next()?;
    let start = Rect::new(first.x as f64, first.y as f64, first.x as f64, first.y as f64);
    let rect = points.fold(start, |r, p| r.union_pt((p.x as f64, p.y as f64)));
    Some(Bbox::from(rect))
}

fn clamp_i16(value: f64) -> i16 {
    otround(value).clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

fn write_transform([xx, yx, xy, yy]: [f64; 4]) -> Transform {
    Transform {
        xx: F2Dot14::from_f32(xx as f32),
        yx: F2Dot14::from_f32(yx as f32),
        xy: F2Dot14::from_f32(xy as f32),
        yy: F2Dot14::from_f32(yy as f32),
    }
}
