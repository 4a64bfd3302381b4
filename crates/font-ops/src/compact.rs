//! Sharing repeated outlines between glyphs
//!
//! Many scripts draw the same shape for several glyphs (full-width forms,
//! compatibility ideographs, positional variants). A simple glyph whose
//! contours repeat an earlier glyph's contours up to a translation is turned
//! into a composite with one offset component, which `glyf` stores in a
//! handful of bytes.

use std::collections::HashMap;

use kurbo::Vec2;
use log::debug;

use crate::{
    GlyphName,
    model::{Component, Contour, FontModel, Outline},
    scale::otround,
};

/// Header plus an empty instruction length
const SIMPLE_OVERHEAD: usize = 10 + 2;
/// Header, flags, glyph id and two word arguments
const COMPOSITE_SIZE: usize = 10 + 2 + 2 + 4;

/// Contours on the integer grid, relative to their first point
type ShapeKey = Vec<Vec<(i32, i32, bool)>>;

impl FontModel {
    /// Replace translated copies of earlier simple glyphs with components
    ///
    /// Only glyphs whose encoded form would shrink are rewritten; the
    /// rendered outline is unchanged. Returns the number of shared glyphs.
    pub fn compact_outlines(&mut self) -> usize {
        let mut first_seen: HashMap<ShapeKey, (GlyphName, (i32, i32))> = HashMap::new();
        let mut replacements: Vec<(GlyphName, Component)> = Vec::new();

        for (name, glyph) in &self.glyphs {
            let Outline::Simple(contours) = &glyph.outline else {
                continue;
            };
            let Some((key, origin)) = shape_key(contours) else {
                continue;
            };
            if encoded_simple_size(contours) <= COMPOSITE_SIZE {
                first_seen.entry(key).or_insert_with(|| (name.clone(), origin));
                continue;
            }
            match first_seen.get(&key) {
                Some((base, base_origin)) => {
                    let offset = Vec2::new(
                        (origin.0 - base_origin.0) as f64,
                        (origin.1 - base_origin.1) as f64,
                    );
                    replacements.push((name.clone(), Component::offset(base.clone(), offset)));
                }
                None => {
                    first_seen.insert(key, (name.clone(), origin));
                }
            }
        }

        let shared = replacements.len();
        for (name, component) in replacements {
            debug!("Sharing outline of '{}' with '{name}'", component.glyph);
            if let Some(glyph) = self.glyphs.get_mut(&name) {
                glyph.outline = Outline::Composite(vec![component]);
            }
        }
        shared
    }
}

/// Rounded contours relative to the first point, and that point
fn shape_key(contours: &[Contour]) -> Option<(ShapeKey, (i32, i32))> {
    let first = contours.iter().flatten().next()?;
    let origin = (otround(first.pos.x) as i32, otround(first.pos.y) as i32);
    let key = contours
        .iter()
        .map(|contour| {
            contour
                .iter()
                .map(|p| {
                    (
                        otround(p.pos.x) as i32 - origin.0,
                        otround(p.pos.y) as i32 - origin.1,
                        p.on_curve,
                    )
                })
                .collect()
        })
        .collect();
    Some((key, origin))
}

/// Lower bound of the encoded size: end points, one flag byte and at least
/// one coordinate byte per axis for each point
fn encoded_simple_size(contours: &[Contour]) -> usize {
    let points: usize = contours.iter().map(Vec::len).sum();
    SIMPLE_OVERHEAD + contours.len() * 2 + points * 3
}
