use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::config::ScriptSource;

/// Supplies a local file for each script's source font
pub trait SourceProvider: Sync {
    fn locate(&self, script: &str, source: &ScriptSource) -> Result<PathBuf>;
}

/// Sources already present in a directory, looked up by file name
#[derive(Debug, Clone)]
pub struct LocalSources {
    dir: PathBuf,
}

impl LocalSources {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SourceProvider for LocalSources {
    fn locate(&self, _script: &str, source: &ScriptSource) -> Result<PathBuf> {
        let path = self.dir.join(&source.font);
        if !path.is_file() {
            bail!("{} not found in {}", source.font, self.dir.display());
        }
        Ok(path)
    }
}
