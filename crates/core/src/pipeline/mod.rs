//! Build pipeline: load → subset → merge → filter → metrics → per-weight output.

mod source;
mod steps;

pub use source::{LocalSources, SourceProvider};

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use opfonts_font_merger::Options;
use opfonts_font_metadata::FontVersion;
use rayon::prelude::*;

use crate::{BuildError, BuildPlan, Result, plan::SourceGroup};

/// Stages run for each group of weights sharing source fonts
const STEPS_PER_GROUP: usize = 5;

/// Cancellation flag checked between stages
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_aborted() { Err(BuildError::Aborted) } else { Ok(()) }
    }
}

/// Receives stage events while a build runs
pub trait Progress: Sync {
    fn step_started(&self, _step: usize, _total: usize, _name: &str) {}
    fn step_finished(&self, _name: &str, _elapsed: Duration) {}
}

/// Reports stages through the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn step_started(&self, step: usize, total: usize, name: &str) {
        info!("[{step}/{total}] {name}");
    }

    fn step_finished(&self, name: &str, elapsed: Duration) {
        debug!("{name} done in {:.2}s", elapsed.as_secs_f64());
    }
}

/// One script's contribution to a source group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReport {
    pub script: String,
    /// Glyphs kept after subsetting; None when every codepoint was claimed earlier
    pub glyphs: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightOutput {
    pub weight: String,
    pub path: PathBuf,
    pub size: usize,
    pub glyph_count: usize,
    /// Glyphs re-expressed as references to an identical outline
    pub shared_glyphs: usize,
}

#[derive(Debug)]
pub struct WeightOutcome {
    pub weight: String,
    pub result: Result<WeightOutput>,
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub scripts: Vec<ScriptReport>,
    /// Scripts whose source font could not be loaded
    pub script_failures: Vec<BuildError>,
    pub weights: Vec<WeightOutcome>,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn outputs(&self) -> impl Iterator<Item = &WeightOutput> {
        self.weights.iter().filter_map(|w| w.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &BuildError)> {
        self.weights
            .iter()
            .filter_map(|w| w.result.as_ref().err().map(|e| (w.weight.as_str(), e)))
    }

    pub fn is_success(&self) -> bool {
        self.script_failures.is_empty() && self.failures().next().is_none()
    }
}

fn run_step<T>(
    ctx: &PipelineContext,
    name: &str,
    step_num: usize,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    ctx.abort.check()?;
    ctx.progress.step_started(step_num, ctx.total, name);
    let start = Instant::now();
    let value = f()?;
    ctx.progress.step_finished(name, start.elapsed());
    Ok(value)
}

/// Everything the stages of a build share
struct PipelineContext<'a> {
    plan: &'a BuildPlan,
    provider: &'a dyn SourceProvider,
    abort: &'a AbortSignal,
    progress: &'a dyn Progress,
    options: Options,
    version: FontVersion,
    total: usize,
}

/// Run the whole plan, reporting stages through the `log` facade.
///
/// Source and per-weight failures are collected in the report; configuration
/// errors, invariant violations and aborts end the build.
pub fn build(
    plan: &BuildPlan,
    provider: &dyn SourceProvider,
    abort: &AbortSignal,
) -> Result<BuildReport> {
    build_with_progress(plan, provider, abort, &LogProgress)
}

/// [`build`] with stage events sent to `progress`
pub fn build_with_progress(
    plan: &BuildPlan,
    provider: &dyn SourceProvider,
    abort: &AbortSignal,
    progress: &dyn Progress,
) -> Result<BuildReport> {
    let version =
        FontVersion::parse(&plan.font.version).map_err(|e| BuildError::Config(e.to_string()))?;
    let options = Options::new()
        .drop_tables(&plan.merge.drop_tables)
        .keep_features(&plan.merge.keep_features);
    let groups = plan.source_groups();
    let ctx = PipelineContext {
        plan,
        provider,
        abort,
        progress,
        options,
        version,
        total: groups.len() * STEPS_PER_GROUP,
    };

    let start = Instant::now();
    info!("Building {} ({} weights)", plan.font.name, plan.weights.len());

    let mut report = BuildReport::default();
    for (i, group) in groups.iter().enumerate() {
        build_group(&ctx, group, i * STEPS_PER_GROUP, &mut report)?;
    }
    report.elapsed = start.elapsed();
    info!("Build finished in {:.2}s", report.elapsed.as_secs_f64());
    Ok(report)
}

fn build_group(
    ctx: &PipelineContext,
    group: &SourceGroup,
    offset: usize,
    report: &mut BuildReport,
) -> Result<()> {
    let PipelineContext { plan, provider, .. } = *ctx;

    let fonts = run_step(ctx, "Load and subset scripts", offset + 1, || {
        let (fonts, scripts, failures) =
            steps::load_scripts(&plan.scripts, &group.sources, provider);
        report.scripts.extend(scripts);
        let failed = failures.len();
        report.script_failures.extend(failures);
        if fonts.is_empty() {
            return Err(if failed > 0 {
                BuildError::config(format!("every script failed to load ({failed} failures)"))
            } else {
                BuildError::config("all subsets were empty, nothing to merge")
            });
        }
        Ok(fonts)
    })?;

    let mut unified = run_step(ctx, "Merge scripts", offset + 2, || {
        steps::merge_scripts(fonts, plan.merge.glyph_names)
    })?;

    run_step(ctx, "Filter tables", offset + 3, || {
        steps::filter(&mut unified, &ctx.options);
        Ok(())
    })?;

    run_step(ctx, "Normalize metrics", offset + 4, || {
        steps::normalize(&mut unified, &plan.font);
        Ok(())
    })?;

    let outcomes = run_step(ctx, "Write weights", offset + 5, || {
        let outcomes: Vec<WeightOutcome> = group
            .weights
            .par_iter()
            .filter_map(|&i| plan.weights.get(i))
            .map(|weight| WeightOutcome {
                weight: weight.name.clone(),
                result: steps::materialize_weight(&unified, weight, &plan.font, &ctx.version),
            })
            .collect();
        let (fatal, outcomes): (Vec<_>, Vec<_>) = outcomes
            .into_iter()
            .partition(|o| matches!(&o.result, Err(e) if e.is_fatal()));
        if let Some(WeightOutcome { result: Err(err), .. }) = fatal.into_iter().next() {
            return Err(err);
        }
        Ok(outcomes)
    })?;

    for outcome in &outcomes {
        if let Err(err) = &outcome.result {
            warn!("Weight {} failed: {err}", outcome.weight);
        }
    }
    report.weights.extend(outcomes);
    Ok(())
}
