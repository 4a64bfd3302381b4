//! The stages of one source group.

use std::{
    fs::{create_dir_all, read, write},
    io,
    path::PathBuf,
};

use log::{debug, info, warn};
use opfonts_font_merger::{Merger, Options, ScriptFont, filter_tables};
use opfonts_font_metadata::{FontNaming, FontVersion};
use opfonts_font_ops::FontModel;
use opfonts_font_subsetter::Subsetter;
use rayon::prelude::*;

use super::{ScriptReport, SourceProvider, WeightOutput};
use crate::{
    BuildError, Result,
    config::{FontSettings, ScriptSource, UNITS_PER_EM},
    metrics::{MetricsReport, MetricsTarget, normalize_metrics},
    plan::{ResolvedScript, WeightPlan},
};

/// Load, subset and normalize every script of a group in parallel.
///
/// Returns the loaded fonts in script order, a report per script and the
/// isolated source failures.
pub(super) fn load_scripts(
    scripts: &[ResolvedScript],
    sources: &[ScriptSource],
    provider: &dyn SourceProvider,
) -> (Vec<ScriptFont>, Vec<ScriptReport>, Vec<BuildError>) {
    let results: Vec<Result<Option<ScriptFont>>> = scripts
        .par_iter()
        .zip(sources.par_iter())
        .map(|(script, source)| load_script(script, source, provider))
        .collect();

    let mut fonts = Vec::new();
    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (script, result) in scripts.iter().zip(results) {
        match result {
            Ok(Some(font)) => {
                reports.push(ScriptReport {
                    script: script.name.clone(),
                    glyphs: Some(font.model.num_glyphs()),
                });
                fonts.push(font);
            }
            Ok(None) => {
                reports.push(ScriptReport { script: script.name.clone(), glyphs: None });
            }
            Err(err) => {
                warn!("Skipping {}: {err}", script.name);
                failures.push(err);
            }
        }
    }
    (fonts, reports, failures)
}

fn load_script(
    script: &ResolvedScript,
    source: &ScriptSource,
    provider: &dyn SourceProvider,
) -> Result<Option<ScriptFont>> {
    if script.exclusive.is_empty() {
        info!("Skipping {}: all codepoints already covered", script.name);
        return Ok(None);
    }

    let source_error = |path: PathBuf, message: String| BuildError::SourceFont {
        script: script.name.clone(),
        path,
        message,
    };
    let path = provider
        .locate(&script.name, source)
        .map_err(|e| source_error(PathBuf::from(&source.font), format!("{e:#}")))?;
    let data = read(&path).map_err(|e| source_error(path.clone(), e.to_string()))?;
    let mut model =
        FontModel::from_bytes(&data).map_err(|e| source_error(path.clone(), e.to_string()))?;

    let cap_ratio = model.cap_ratio();
    let report = Subsetter::new()
        .with_codepoints(script.exclusive.iter().copied())
        .drop_vf_tables(true)
        .subset(&mut model);
    info!(
        "{}: {} glyphs ({} of {} codepoints)",
        script.name,
        report.glyphs_kept,
        report.codepoints_matched,
        script.exclusive.len()
    );
    if model.units_per_em != UNITS_PER_EM {
        debug!("{}: normalizing {} units per em", script.name, model.units_per_em);
        model.normalize_units(UNITS_PER_EM);
    }

    Ok(Some(ScriptFont {
        script: script.name.clone(),
        model,
        cap_ratio,
        scale: script.scale,
    }))
}

pub(super) fn merge_scripts(fonts: Vec<ScriptFont>, glyph_names: bool) -> Result<FontModel> {
    let (unified, report) = Merger::new().glyph_names(glyph_names).merge(fonts)?;
    for (script, glyphs) in &report.glyphs {
        debug!("  {script}: {glyphs} glyphs");
    }
    Ok(unified)
}

pub(super) fn filter(unified: &mut FontModel, options: &Options) {
    let report = filter_tables(unified, options);
    if !report.dropped_tables.is_empty() {
        let tags: Vec<String> = report.dropped_tables.iter().map(|t| t.to_string()).collect();
        info!("Dropped tables: {}", tags.join(", "));
    }
}

pub(super) fn normalize(unified: &mut FontModel, font: &FontSettings) -> MetricsReport {
    normalize_metrics(unified, &MetricsTarget::from(font))
}

/// Stamp, compact and write one weight from its own clone of the unified model
pub(super) fn materialize_weight(
    unified: &FontModel,
    weight: &WeightPlan,
    font: &FontSettings,
    version: &FontVersion,
) -> Result<WeightOutput> {
    let mut model = unified.clone();
    FontNaming::new(&font.name, &weight.name, weight.value)
        .with_copyright(&font.copyright)
        .with_designer(&font.designer)
        .with_version(version.clone())
        .apply(&mut model)
        .map_err(|source| BuildError::Metadata { weight: weight.name.clone(), source })?;

    let shared_glyphs = model.compact_outlines();
    let data = model.compile()?;

    let output_error =
        |source: io::Error| BuildError::Output { path: weight.output.clone(), source };
    if let Some(parent) = weight.output.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).map_err(output_error)?;
    }
    write(&weight.output, &data).map_err(output_error)?;

    info!(
        "Wrote {} ({:.1} KB, {} glyphs, {shared_glyphs} shared outlines)",
        weight.output.display(),
        data.len() as f64 / 1024.0,
        model.num_glyphs()
    );
    Ok(WeightOutput {
        weight: weight.name.clone(),
        path: weight.output.clone(),
        size: data.len(),
        glyph_count: model.num_glyphs(),
        shared_glyphs,
    })
}
