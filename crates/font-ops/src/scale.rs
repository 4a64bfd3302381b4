//! Uniform scaling of outlines and metrics

use kurbo::Vec2;

use crate::model::{ComponentAnchor, DecorationMetrics, FontModel, Glyph, Outline, VerticalMetrics};

/// Factors this close to 1.0 leave the font untouched
pub const SCALE_EPSILON: f64 = 1e-3;

impl Glyph {
    /// Scale outline coordinates, component offsets, advance and side bearing
    ///
    /// Point count, on-curve flags and contour order are unchanged.
    pub fn scale(&mut self, factor: f64) {
        match &mut self.outline {
            Outline::Empty => {}
            Outline::Simple(contours) => {
                for point in contours.iter_mut().flatten() {
                    point.pos = (point.pos.to_vec2() * factor).to_point();
                }
            }
            Outline::Composite(components) => {
                for component in components {
                    if let ComponentAnchor::Offset(offset) = &mut component.anchor {
                        *offset = *offset * factor;
                    }
                }
            }
        }
        self.advance *= factor;
        self.lsb *= factor;
    }
}

impl VerticalMetrics {
    pub fn scale(&mut self, factor: f64) {
        self.ascender *= factor;
        self.descender *= factor;
        self.line_gap *= factor;
        self.win_ascent *= factor;
        self.win_descent *= factor;
        self.cap_height *= factor;
        self.x_height *= factor;
    }
}

impl DecorationMetrics {
    pub fn scale(&mut self, factor: f64) {
        self.underline_position *= factor;
        self.underline_thickness *= factor;
        self.strikeout_size *= factor;
        self.strikeout_position *= factor;
        for script_box in [&mut self.subscript, &mut self.superscript] {
            script_box.size = script_box.size * factor;
            script_box.offset = script_box.offset * factor;
        }
    }
}

impl FontModel {
    /// Scale every glyph and every metric by `factor`, keeping units-per-em
    pub fn scale(&mut self, factor: f64) {
        if (factor - 1.0).abs() < f64::EPSILON {
            return;
        }
        for glyph in self.glyphs.values_mut() {
            glyph.scale(factor);
        }
        self.metrics.scale(factor);
        self.decoration.scale(factor);
    }

    /// Rescale the font to `target` units-per-em
    ///
    /// Applying this again with the same target is a no-op.
    pub fn normalize_units(&mut self, target: u16) {
        if self.units_per_em == target || self.units_per_em == 0 {
            return;
        }
        let factor = target as f64 / self.units_per_em as f64;
        self.scale(factor);
        self.units_per_em = target;
    }
}

/// Round a scaled coordinate for the font's integer grid
pub(crate) fn otround(value: f64) -> f64 {
    (value + 0.5).floor()
}

pub(crate) fn round_vec(v: Vec2) -> Vec2 {
    Vec2::new(otround(v.x), otround(v.y))
}
