//! Combining per-script font models into one glyph namespace

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use log::{debug, info};
use opfonts_font_ops::{
    FontModel, GlyphName, Outline, SourceRecord, SubstitutionGraph, TableData, TableTag,
};

use crate::{MergeError, Result, strategies};

/// One script's subset, unit-normalized font
#[derive(Debug, Clone)]
pub struct ScriptFont {
    pub script: String,
    pub model: FontModel,
    /// Cap height over units-per-em of the full source font
    pub cap_ratio: Option<f64>,
    /// Whether the script takes part in cap-height alignment
    pub scale: bool,
}

impl ScriptFont {
    pub fn new(script: impl Into<String>, model: FontModel) -> Self {
        let cap_ratio = model.cap_ratio();
        Self { script: script.into(), model, cap_ratio, scale: true }
    }
}

/// What the merge did, per script in merge order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Glyphs contributed by each script, notdef excluded for all but the first
    pub glyphs: Vec<(String, usize)>,
    /// Glyphs renamed to avoid a name already taken
    pub renamed: usize,
}

/// Merges script fonts in order; the first one provides metrics, style,
/// names and the notdef glyph.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    glyph_names: bool,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the merged font keeps glyph names in its `post` table
    pub fn glyph_names(mut self, keep: bool) -> Self {
        self.glyph_names = keep;
        self
    }

    pub fn merge(&self, fonts: Vec<ScriptFont>) -> Result<(FontModel, MergeReport)> {
        let Some(baseline) = fonts.first() else {
            return Err(MergeError::NoFonts);
        };
        let units_per_em = baseline.model.units_per_em;
        if let Some(font) = fonts.iter().find(|f| f.model.units_per_em != units_per_em) {
            return Err(MergeError::IncompatibleUnitsPerEm {
                script: font.script.clone(),
                expected: units_per_em,
                actual: font.model.units_per_em,
            });
        }

        let unicode_ranges: Vec<[u32; 4]> =
            fonts.iter().map(|f| f.model.style.unicode_ranges).collect();
        let code_page_ranges: Vec<[u32; 2]> =
            fonts.iter().map(|f| f.model.style.code_page_ranges).collect();

        let mut unified = FontModel {
            units_per_em,
            metrics: baseline.model.metrics,
            decoration: baseline.model.decoration,
            style: baseline.model.style.clone(),
            glyphs: IndexMap::new(),
            cmap: BTreeMap::new(),
            names: baseline.model.names.clone(),
            tables: BTreeMap::new(),
            sources: Vec::with_capacity(fonts.len()),
            keep_glyph_names: self.glyph_names,
        };
        unified.style.unicode_ranges = strategies::union_bits(&unicode_ranges)?;
        unified.style.code_page_ranges = strategies::union_bits(&code_page_ranges)?;

        let mut report = MergeReport::default();
        for (index, font) in fonts.into_iter().enumerate() {
            let ScriptFont { script, model, cap_ratio, scale } = font;
            let before = unified.num_glyphs();
            report.renamed += add_script(&mut unified, index, &script, model)?;
            report.glyphs.push((script.clone(), unified.num_glyphs() - before));
            unified.sources.push(SourceRecord { script, cap_ratio, scale });
        }

        info!(
            "Merged {} scripts: {} glyphs, {} codepoints, {} renamed",
            unified.sources.len(),
            unified.num_glyphs(),
            unified.cmap.len(),
            report.renamed
        );
        Ok((unified, report))
    }
}

/// Move one script's glyphs, mappings and tables into the unified model,
/// returning how many glyphs were renamed
fn add_script(
    unified: &mut FontModel,
    index: usize,
    script: &str,
    mut model: FontModel,
) -> Result<usize> {
    let (renames, renamed) = qualify_names(unified, script, &model);
    let source_notdef = model.notdef().cloned();

    for (name, mut glyph) in model.glyphs.drain(..) {
        // Only the first script's notdef survives
        if index > 0 && Some(&name) == source_notdef.as_ref() {
            continue;
        }
        if let Outline::Composite(components) = &mut glyph.outline {
            for component in components {
                if let Some(new) = renames.get(&component.glyph) {
                    component.glyph = new.clone();
                }
            }
        }
        glyph.source = Some(index);
        let name = renames.get(&name).cloned().unwrap_or(name);
        unified.glyphs.insert(name, glyph);
    }

    for (codepoint, name) in model.cmap {
        let name = renames.get(&name).cloned().unwrap_or(name);
        if let Some(existing) = unified.cmap.get(&codepoint) {
            let owner = unified
                .glyphs
                .get(existing)
                .and_then(|g| g.source)
                .and_then(|i| unified.sources.get(i))
                .map(|s| s.script.clone())
                .unwrap_or_default();
            return Err(MergeError::CodepointConflict {
                codepoint,
                script: script.to_string(),
                owner,
            });
        }
        unified.cmap.insert(codepoint, name);
    }

    for (tag, table) in model.tables {
        match table {
            TableData::Substitutions(mut graph) => {
                graph.rename(&renames);
                merge_substitutions(unified, tag, graph);
            }
            table => {
                unified.tables.entry(tag).or_insert(table);
            }
        }
    }

    Ok(renamed)
}

/// New names for glyphs whose name is taken in the unified model
///
/// A taken name `a` becomes `a.script`, then `a.script.1`, `a.script.2`, …
/// Later scripts' notdef glyphs map to the unified notdef. Also returns the
/// number of qualified names.
fn qualify_names(
    unified: &FontModel,
    script: &str,
    model: &FontModel,
) -> (HashMap<GlyphName, GlyphName>, usize) {
    let mut renames = HashMap::new();
    let Some(unified_notdef) = unified.notdef() else {
        return (renames, 0);
    };
    let source_notdef = model.notdef();

    let mut assigned: Vec<GlyphName> = Vec::new();
    let taken = |name: &GlyphName, assigned: &[GlyphName]| {
        unified.glyphs.contains_key(name.as_str())
            || model.glyphs.contains_key(name.as_str())
            || assigned.contains(name)
    };

    for name in model.glyphs.keys() {
        if Some(name) == source_notdef {
            if name != unified_notdef {
                renames.insert(name.clone(), unified_notdef.clone());
            }
            continue;
        }
        if !unified.glyphs.contains_key(name.as_str()) {
            continue;
        }
        let qualified = name.with_suffix(script);
        let mut candidate = qualified.clone();
        let mut n = 1;
        while taken(&candidate, &assigned) {
            candidate = qualified.with_suffix(n);
            n += 1;
        }
        debug!("Renaming '{name}' from script '{script}' to '{candidate}'");
        assigned.push(candidate.clone());
        renames.insert(name.clone(), candidate);
    }
    (renames, assigned.len())
}

fn merge_substitutions(unified: &mut FontModel, tag: TableTag, graph: SubstitutionGraph) {
    match unified.tables.get_mut(&tag) {
        Some(TableData::Substitutions(existing)) => existing.extend(graph),
        Some(_) => {}
        None => {
            unified.tables.insert(tag, TableData::Substitutions(graph));
        }
    }
}
