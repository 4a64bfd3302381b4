//! The fully resolved build, inspectable without touching any font.

use std::{
    fmt::{self, Display, Formatter},
    path::PathBuf,
};

use indexmap::IndexMap;
use log::info;

use crate::{
    BuildConfig, BuildError, CodepointSet, Result, ScriptPartition,
    charset::{load_charset_file, resolve_ranges},
    config::{FontSettings, MergeSettings, ScriptSource},
};

/// One enabled script with its resolved codepoints
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScript {
    pub name: String,
    /// Codepoints requested by ranges and charset file
    pub raw: CodepointSet,
    /// Codepoints left after earlier scripts claimed theirs
    pub exclusive: CodepointSet,
    pub scale: bool,
    pub charset_file: Option<PathBuf>,
    /// Source font per output weight
    pub sources: IndexMap<String, ScriptSource>,
}

/// One output font
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightPlan {
    pub name: String,
    pub value: i64,
    pub output: PathBuf,
}

/// Weights built from the same source fonts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceGroup {
    /// Indices into [`BuildPlan::weights`]
    pub weights: Vec<usize>,
    /// Source per script, in script order
    pub sources: Vec<ScriptSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildPlan {
    pub scripts: Vec<ResolvedScript>,
    pub weights: Vec<WeightPlan>,
    pub font: FontSettings,
    pub merge: MergeSettings,
}

impl BuildPlan {
    /// Resolve codepoints, deduplicate them across scripts and lay out the
    /// output weights. Reads charset files but no fonts.
    pub fn resolve(config: &BuildConfig) -> Result<Self> {
        let enabled: Vec<_> = config.enabled_scripts().collect();
        if enabled.is_empty() {
            return Err(BuildError::config("no scripts enabled, nothing to build"));
        }

        let mut raw_sets = Vec::with_capacity(enabled.len());
        for script in &enabled {
            let mut raw = resolve_ranges(&script.name, &script.unicode_ranges)?;
            if let Some(charset) = &script.charset_file {
                let path = config.resolve_path(charset);
                let from_file = load_charset_file(&script.name, &path)?;
                info!(
                    "{}: loaded {} codepoints from charset file {}",
                    script.name,
                    from_file.len(),
                    path.display()
                );
                raw.extend(from_file);
            }
            raw_sets.push((script.name.clone(), raw));
        }
        let partition = ScriptPartition::new(raw_sets.clone());

        let weights: Vec<WeightPlan> = config
            .font
            .weights()
            .into_iter()
            .map(|(name, value)| WeightPlan {
                output: config.output_path(&name),
                name,
                value,
            })
            .collect();

        let scripts = enabled
            .iter()
            .zip(raw_sets)
            .zip(partition.into_inner())
            .map(|((spec, (name, raw)), (_, exclusive))| ResolvedScript {
                name,
                raw,
                exclusive,
                scale: spec.scale,
                charset_file: spec.charset_file.clone(),
                sources: weights
                    .iter()
                    .map(|w| (w.name.clone(), spec.source_for(&w.name)))
                    .collect(),
            })
            .collect();

        Ok(Self {
            scripts,
            weights,
            font: config.font.clone(),
            merge: config.merge.clone(),
        })
    }

    /// Group weights by their source fonts, in weight order
    pub fn source_groups(&self) -> Vec<SourceGroup> {
        let mut groups: Vec<SourceGroup> = Vec::new();
        for (index, weight) in self.weights.iter().enumerate() {
            let sources: Vec<ScriptSource> = self
                .scripts
                .iter()
                .filter_map(|s| s.sources.get(&weight.name).cloned())
                .collect();
            match groups.iter_mut().find(|g| g.sources == sources) {
                Some(group) => group.weights.push(index),
                None => groups.push(SourceGroup { weights: vec![index], sources }),
            }
        }
        groups
    }

    /// Distinct source fonts across all weights, one per cache file name
    pub fn all_sources(&self) -> Vec<ScriptSource> {
        let mut sources: Vec<ScriptSource> = Vec::new();
        for source in self.scripts.iter().flat_map(|s| s.sources.values()) {
            if !sources.iter().any(|s| s.font == source.font) {
                sources.push(source.clone());
            }
        }
        sources
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            family: self.font.name.clone(),
            output_dir: self.font.output_dir.clone(),
            cache_dir: self.font.cache_dir.clone(),
            scripts: self
                .scripts
                .iter()
                .map(|s| ScriptSummary {
                    name: s.name.clone(),
                    fonts: s.sources.values().map(|src| src.font.clone()).fold(
                        Vec::new(),
                        |mut fonts, font| {
                            if !fonts.contains(&font) {
                                fonts.push(font);
                            }
                            fonts
                        },
                    ),
                    raw_codepoints: s.raw.len(),
                    exclusive_codepoints: s.exclusive.len(),
                    charset_file: s.charset_file.clone(),
                    scale: s.scale,
                })
                .collect(),
            weights: self.weights.clone(),
            source_sets: self.source_groups().len(),
            drop_tables: self.merge.drop_tables.clone(),
            keep_features: self.merge.keep_features.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSummary {
    pub name: String,
    pub fonts: Vec<String>,
    pub raw_codepoints: usize,
    pub exclusive_codepoints: usize,
    pub charset_file: Option<PathBuf>,
    pub scale: bool,
}

/// Dry-run view of a [`BuildPlan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub family: String,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub scripts: Vec<ScriptSummary>,
    pub weights: Vec<WeightPlan>,
    /// Distinct source font sets, each merged once
    pub source_sets: usize,
    pub drop_tables: Vec<String>,
    pub keep_features: Vec<String>,
}

impl Display for PlanSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Family: {}", self.family)?;
        writeln!(f, "Output: {}", self.output_dir.display())?;
        writeln!(f, "Cache:  {}", self.cache_dir.display())?;

        writeln!(f, "\nMerge order (first = baseline metrics):")?;
        for (i, script) in self.scripts.iter().enumerate() {
            let charset = script
                .charset_file
                .as_ref()
                .map(|p| format!(" [charset: {}]", p.display()))
                .unwrap_or_default();
            let scale = if script.scale { "" } else { " [no scale]" };
            writeln!(
                f,
                "  {}. {:<12} {} → {} codepoints ({} exclusive){charset}{scale}",
                i + 1,
                script.name,
                script.fonts.join(", "),
                script.raw_codepoints,
                script.exclusive_codepoints,
            )?;
        }

        writeln!(f, "\nWeights ({} source sets):", self.source_sets)?;
        for weight in &self.weights {
            writeln!(f, "  {:<12} {:>4}  {}", weight.name, weight.value, weight.output.display())?;
        }

        writeln!(f, "\nDrop tables:   {}", list_or_none(&self.drop_tables))?;
        write!(f, "Keep features: {}", list_or_none(&self.keep_features))
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() { "(none)".to_string() } else { items.join(", ") }
}
