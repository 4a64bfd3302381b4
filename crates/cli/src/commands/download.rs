use std::path::Path;

use anyhow::Result;
use opfonts_core::{BuildConfig, BuildPlan};

use crate::{fetch::CachedSources, parallel::process_parallel_iter};

pub fn download(config_path: &Path) -> Result<()> {
    let config = BuildConfig::load(config_path)?;
    let plan = BuildPlan::resolve(&config)?;
    let cache = CachedSources::new(&plan.font.cache_dir)?;

    let sources = plan.all_sources();
    println!("Ensuring {} source fonts in {}", sources.len(), plan.font.cache_dir.display());

    let result = process_parallel_iter("Download", sources, |source| {
        let path = cache.ensure(&source)?;
        println!("  {}", path.display());
        Ok(())
    });
    result.ok_or_bail("Download")
}
