//! Cap-height alignment and final vertical metrics of the unified font.

use log::{debug, info};
use opfonts_font_ops::{FontModel, SCALE_EPSILON};

use crate::config::FontSettings;

/// Vertical metric targets
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsTarget {
    /// Explicit ascender; 0 keeps the scaled value
    pub ascender: i16,
    /// Explicit descender; 0 keeps the scaled value
    pub descender: i16,
    /// Cap height over units-per-em; 0 or less takes the first script's ratio
    pub cap_ratio: f64,
}

impl From<&FontSettings> for MetricsTarget {
    fn from(font: &FontSettings) -> Self {
        Self {
            ascender: font.ascender,
            descender: font.descender,
            cap_ratio: font.target_cap_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsReport {
    /// Cap ratio glyphs were aligned to, if one could be determined
    pub target_ratio: Option<f64>,
    /// Factor applied to the unified vertical metrics
    pub unified_factor: f64,
    pub scaled_glyphs: usize,
}

fn significant(factor: f64) -> bool {
    factor.is_finite() && factor > 0.0 && (factor - 1.0).abs() >= SCALE_EPSILON
}

/// Scale each script's glyphs to the target cap ratio and set the vertical
/// metrics of the unified model.
pub fn normalize_metrics(model: &mut FontModel, target: &MetricsTarget) -> MetricsReport {
    let target_ratio = if target.cap_ratio > 0.0 {
        Some(target.cap_ratio)
    } else {
        model.sources.first().and_then(|s| s.cap_ratio)
    };
    let unified_factor = match (target_ratio, model.cap_ratio()) {
        (Some(target), Some(unified)) => target / unified,
        _ => 1.0,
    };

    let mut report = MetricsReport { target_ratio, unified_factor, scaled_glyphs: 0 };

    if let Some(target_ratio) = target_ratio {
        info!("Target cap ratio: {target_ratio:.4}");
        let factors: Vec<f64> = model
            .sources
            .iter()
            .map(|source| {
                if !source.scale {
                    debug!("Skipping scale for script '{}'", source.script);
                    return 1.0;
                }
                match source.cap_ratio {
                    Some(ratio) => target_ratio / ratio,
                    None => unified_factor,
                }
            })
            .collect();
        for (source, factor) in model.sources.iter().zip(&factors) {
            if significant(*factor) {
                info!("Scaling script '{}' by {factor:.4}", source.script);
            }
        }

        for glyph in model.glyphs.values_mut() {
            let factor = glyph
                .source
                .and_then(|i| factors.get(i).copied())
                .unwrap_or(unified_factor);
            if significant(factor) {
                glyph.scale(factor);
                report.scaled_glyphs += 1;
            }
        }
    }

    let metrics = &mut model.metrics;
    if significant(unified_factor) {
        metrics.cap_height *= unified_factor;
        metrics.x_height *= unified_factor;
    }
    if target.ascender != 0 || target.descender != 0 {
        metrics.ascender = target.ascender as f64;
        metrics.descender = target.descender as f64;
        metrics.line_gap = 0.0;
        metrics.win_ascent = target.ascender as f64;
        metrics.win_descent = (target.descender as f64).abs();
        info!("Fixed metrics: ascender={}, descender={}", target.ascender, target.descender);
    } else if significant(unified_factor) {
        metrics.ascender *= unified_factor;
        metrics.descender *= unified_factor;
        metrics.win_ascent *= unified_factor;
        metrics.win_descent *= unified_factor;
    }

    report
}
