//! Downloading source fonts and data files into the cache directory.

use std::{
    fs::{create_dir_all, read, read_to_string},
    io::Write,
    path::{Path, PathBuf},
    thread::sleep,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use opfonts_core::{ScriptSource, SourceProvider};
use read_fonts::FontRef;
use reqwest::blocking::Client;
use tempfile::NamedTempFile;

const USER_AGENT: &str = concat!("opfonts/", env!("CARGO_PKG_VERSION"));
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client with linear back-off between attempts
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    pub fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut attempt = 1;
        loop {
            match self.try_fetch(url) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!("Attempt {attempt}/{MAX_ATTEMPTS} failed for {url}: {e:#}");
                    sleep(RETRY_DELAY * attempt);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to download {url} after {MAX_ATTEMPTS} attempts"));
                }
            }
        }
    }

    fn try_fetch(&self, url: &str) -> Result<Vec<u8>> {
        info!("Downloading {url}");
        let response =
            self.client.get(url).send().with_context(|| format!("Failed to fetch {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {status} for {url}");
        }
        Ok(response.bytes()?.to_vec())
    }

    /// Read a local file or download a URL as UTF-8 text
    pub fn read_text(&self, source: &str) -> Result<String> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let bytes = self.fetch(source)?;
            return String::from_utf8(bytes).with_context(|| format!("{source} is not UTF-8"));
        }
        read_to_string(source).with_context(|| format!("Failed to read {source}"))
    }
}

/// True when the file exists and parses as an OpenType font
fn is_valid_font(path: &Path) -> bool {
    read(path).map(|data| FontRef::new(&data).is_ok()).unwrap_or(false)
}

/// Source fonts kept in a cache directory, downloaded on first use
#[derive(Debug, Clone)]
pub struct CachedSources {
    cache_dir: PathBuf,
    fetcher: Fetcher,
}

impl CachedSources {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self { cache_dir: cache_dir.into(), fetcher: Fetcher::new()? })
    }

    pub fn cache_path(&self, source: &ScriptSource) -> PathBuf {
        self.cache_dir.join(&source.font)
    }

    /// Return the cached font, downloading and validating it if needed
    pub fn ensure(&self, source: &ScriptSource) -> Result<PathBuf> {
        let path = self.cache_path(source);
        if is_valid_font(&path) {
            debug!("Cache hit: {}", path.display());
            return Ok(path);
        }
        if source.url.is_empty() {
            bail!("{} is not cached and has no download URL", source.font);
        }

        let data = self.fetcher.fetch(&source.url)?;
        FontRef::new(&data)
            .map_err(|e| anyhow::anyhow!("{}: downloaded file is not a font: {e}", source.url))?;
        create_dir_all(&self.cache_dir)
            .with_context(|| format!("Failed to create directory: {}", self.cache_dir.display()))?;
        write_atomic(&self.cache_dir, &path, &data)?;

        let size_mb = data.len() as f64 / 1024.0 / 1024.0;
        info!("Saved {} ({size_mb:.2} MB)", path.display());
        Ok(path)
    }
}

/// Write through a temporary file in `dir` and rename it into place, so
/// concurrent readers never see a partial font
fn write_atomic(dir: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
    file.write_all(data).with_context(|| format!("Failed to write {}", path.display()))?;
    file.persist(path).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

impl SourceProvider for CachedSources {
    fn locate(&self, script: &str, source: &ScriptSource) -> Result<PathBuf> {
        self.ensure(source).with_context(|| format!("Source font for script '{script}'"))
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{read_dir, write};

    use super::*;

    fn source(font: &str, url: &str) -> ScriptSource {
        ScriptSource { font: font.to_string(), url: url.to_string() }
    }

    #[test]
    fn test_junk_file_is_not_a_font() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Broken.ttf");
        write(&path, b"<html>404</html>").unwrap();
        assert!(!is_valid_font(&path));
        assert!(!is_valid_font(&dir.path().join("Absent.ttf")));
    }

    #[test]
    fn test_atomic_write_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Latin.ttf");
        write(&path, b"partial").unwrap();

        write_atomic(dir.path(), &path, b"complete").unwrap();
        assert_eq!(read(&path).unwrap(), b"complete");
        let entries: Vec<_> = read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_concurrent_atomic_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Shared.ttf");
        let payloads: Vec<Vec<u8>> = (0u8..8).map(|i| vec![i; 4096]).collect();

        std::thread::scope(|scope| {
            for payload in &payloads {
                let (dir, path) = (dir.path(), &path);
                scope.spawn(move || write_atomic(dir, path, payload).unwrap());
            }
        });

        let data = read(&path).unwrap();
        assert_eq!(data.len(), 4096);
        assert!(data.iter().all(|&b| b == data[0]));
        assert_eq!(read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_uncached_source_without_url_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CachedSources::new(dir.path()).unwrap();
        let err = cache.locate("latin", &source("Latin.ttf", "")).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("latin"));
        assert!(message.contains("no download URL"));
    }

    #[test]
    fn test_local_text_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.pot");
        write(&path, "msgid \"caf\u{e9}\"\nmsgstr \"\"\n").unwrap();
        let text = Fetcher::new().unwrap().read_text(path.to_str().unwrap()).unwrap();
        assert!(text.contains("caf\u{e9}"));
    }
}
