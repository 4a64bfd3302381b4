//! opfonts core: builds compact multi-script fonts from per-script sources.
//!
//! A [`BuildConfig`] resolves into a [`BuildPlan`] (codepoints per script,
//! deduplicated across scripts, and the output weights) which can be shown
//! as a dry run or handed to [`build`] together with a [`SourceProvider`].

pub mod charset;
pub mod config;
pub mod dedup;
mod error;
pub mod metrics;
pub mod pipeline;
pub mod plan;

pub use charset::CodepointSet;
pub use config::{BuildConfig, FontSettings, MergeSettings, ScriptSource, ScriptSpec};
pub use dedup::ScriptPartition;
pub use error::{BuildError, Result};
pub use metrics::{MetricsReport, MetricsTarget, normalize_metrics};
pub use pipeline::{
    AbortSignal, BuildReport, LocalSources, LogProgress, Progress, ScriptReport, SourceProvider,
    WeightOutcome, WeightOutput, build, build_with_progress,
};
pub use plan::{BuildPlan, PlanSummary, ResolvedScript, ScriptSummary, WeightPlan};

pub use opfonts_font_metadata::FontVersion;
pub use opfonts_font_ops::{Codepoint, FontModel};
