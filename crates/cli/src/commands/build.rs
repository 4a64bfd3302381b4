use std::{path::Path, time::Duration};

use anyhow::{Result, bail};
use opfonts_core::{
    AbortSignal, BuildConfig, BuildPlan, BuildReport, Progress, ScriptSource, build_with_progress,
};

use crate::fetch::CachedSources;

const RULE: &str =
    "═══════════════════════════════════════════════════════════════════════════════";

/// Stage banners on stdout
struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn step_started(&self, step: usize, total: usize, name: &str) {
        println!("\n[{step}/{total}] {name}");
    }

    fn step_finished(&self, name: &str, elapsed: Duration) {
        println!("  ✓ {name} ({:.2}s)", elapsed.as_secs_f64());
    }
}

fn load_plan(config_path: &Path) -> Result<(BuildConfig, BuildPlan)> {
    let config = BuildConfig::load(config_path)?;
    let plan = BuildPlan::resolve(&config)?;
    Ok((config, plan))
}

pub fn build(config_path: &Path, dry_run: bool) -> Result<()> {
    let (_, plan) = load_plan(config_path)?;
    if dry_run {
        print_plan(&plan);
        return Ok(());
    }

    let sources = CachedSources::new(&plan.font.cache_dir)?;
    println!("{RULE}\n{} Build Pipeline\n{RULE}", plan.font.name);
    let report = build_with_progress(&plan, &sources, &AbortSignal::new(), &ConsoleProgress)?;
    print_report(&report);
    println!("{RULE}\nOutput: {}", plan.font.output_dir.display());

    if !report.is_success() {
        bail!("Build finished with failures");
    }
    Ok(())
}

pub fn plan(config_path: &Path) -> Result<()> {
    let (_, plan) = load_plan(config_path)?;
    print_plan(&plan);
    Ok(())
}

pub fn list_scripts(config_path: &Path) -> Result<()> {
    let (config, _) = load_plan(config_path)?;
    for (i, script) in config.scripts.iter().enumerate() {
        let state = if script.enabled { "enabled" } else { "disabled" };
        println!("{:>2}. {} [{state}]", i + 1, script.name);
        println!("    font: {}", script.font);
        if !script.unicode_ranges.is_empty() {
            println!("    ranges: {}", script.unicode_ranges.join(", "));
        }
        if let Some(charset) = &script.charset_file {
            println!("    charset: {}", config.resolve_path(charset).display());
        }
    }
    Ok(())
}

fn print_plan(plan: &BuildPlan) {
    println!("{}", plan.summary());
    println!("Sources:");
    for source in plan.all_sources() {
        println!("  [{}] {}", source_status(&plan.font.cache_dir, &source), source.font);
    }
}

/// Cache status from the file system alone; fonts are validated when built
fn source_status(cache_dir: &Path, source: &ScriptSource) -> &'static str {
    if cache_dir.join(&source.font).is_file() {
        "cached"
    } else if source.url.is_empty() {
        "missing"
    } else {
        "download"
    }
}

fn print_report(report: &BuildReport) {
    println!();
    for script in &report.scripts {
        match script.glyphs {
            Some(glyphs) => println!("  {}: {glyphs} glyphs", script.script),
            None => println!("  {}: skipped, no exclusive codepoints", script.script),
        }
    }
    for error in &report.script_failures {
        eprintln!("  Failed: {error}");
    }
    for output in report.outputs() {
        println!(
            "Built: {} ({:.1} KB, {} glyphs, {} shared)",
            output.path.display(),
            output.size as f64 / 1024.0,
            output.glyph_count,
            output.shared_glyphs
        );
    }
    for (weight, error) in report.failures() {
        eprintln!("Failed: {weight}: {error}");
    }
    println!("Finished in {:.2}s", report.elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use super::*;

    fn source(font: &str, url: &str) -> ScriptSource {
        ScriptSource { font: font.to_string(), url: url.to_string() }
    }

    #[test]
    fn test_source_status_does_not_open_fonts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path().join("Corrupt.ttf"), b"not a font").unwrap();

        assert_eq!(source_status(dir.path(), &source("Corrupt.ttf", "")), "cached");
        assert_eq!(source_status(dir.path(), &source("Absent.ttf", "")), "missing");
        assert_eq!(
            source_status(dir.path(), &source("Absent.ttf", "https://example.com/Absent.ttf")),
            "download"
        );
    }
}
