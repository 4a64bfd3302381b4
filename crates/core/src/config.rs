//! Build configuration loaded from `opfonts.toml`.
//!
//! ```toml
//! [font]
//! name = "OpFont"
//! copyright = "Copyright 2024 The OpFont Authors"
//! target_cap_ratio = 0.7273
//!
//! [font.weight_values]
//! Regular = 400
//! Bold = 700
//!
//! [[scripts]]
//! name = "latin"
//! font = "Inter-Regular.ttf"
//! url = "https://example.com/Inter-Regular.ttf"
//! unicode_ranges = ["U+0020-007E"]
//!
//! [merge]
//! drop_tables = ["GPOS", "GDEF"]
//! keep_features = ["liga"]
//! ```

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use log::debug;
use opfonts_font_ops::TableTag;
use serde::Deserialize;

use crate::{BuildError, Result};

/// File name looked up in the working directory when no config is given
pub const CONFIG_FILENAME: &str = "opfonts.toml";

/// Weight built when the weight table is empty
pub const DEFAULT_WEIGHT: &str = "Regular";

/// Name of the source font weight substituted for each output weight
pub const SOURCE_WEIGHT_PLACEHOLDER: &str = "Regular";

/// Working units-per-em every source is normalized to
pub const UNITS_PER_EM: u16 = 1000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default)]
    pub font: FontSettings,
    #[serde(default)]
    pub scripts: Vec<ScriptSpec>,
    #[serde(default)]
    pub merge: MergeSettings,
    /// Directory relative charset paths resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontSettings {
    pub name: String,
    /// Style of a single-weight build; defaults to the first weight
    pub style: Option<String>,
    /// Output file name of a single-weight build
    pub output: Option<String>,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub copyright: String,
    pub designer: String,
    pub version: String,
    /// Explicit ascender; 0 keeps the scaled source value
    pub ascender: i16,
    /// Explicit descender (negative); 0 keeps the scaled source value
    pub descender: i16,
    /// Cap height over units-per-em; 0 or less takes the first script's ratio
    pub target_cap_ratio: f64,
    /// Output weights in build order; values are range-checked per weight
    pub weight_values: IndexMap<String, i64>,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            name: "OpFont".to_string(),
            style: None,
            output: None,
            output_dir: PathBuf::from("dist"),
            cache_dir: PathBuf::from("./cache"),
            copyright: String::new(),
            designer: String::new(),
            version: "1.000".to_string(),
            ascender: 0,
            descender: 0,
            target_cap_ratio: 0.0,
            weight_values: IndexMap::new(),
        }
    }
}

impl FontSettings {
    /// The weight table, or the configured style alone when it is empty
    pub fn weights(&self) -> IndexMap<String, i64> {
        if !self.weight_values.is_empty() {
            return self.weight_values.clone();
        }
        let style = self.style.clone().unwrap_or_else(|| DEFAULT_WEIGHT.to_string());
        let value = standard_weight(&style).map_or(400, i64::from);
        IndexMap::from([(style, value)])
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptSpec {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Source font file name inside the cache directory
    pub font: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub unicode_ranges: Vec<String>,
    #[serde(default)]
    pub charset_file: Option<PathBuf>,
    /// Whether glyphs are scaled to the target cap ratio
    #[serde(default = "default_true")]
    pub scale: bool,
    /// Weights with their own source file; empty means every weight
    #[serde(default)]
    pub weights: Vec<String>,
}

impl ScriptSpec {
    /// Font file name and URL of the source used for `weight`
    pub fn source_for(&self, weight: &str) -> ScriptSource {
        if self.weights.is_empty() || self.weights.iter().any(|w| w == weight) {
            ScriptSource {
                font: self.font.replace(SOURCE_WEIGHT_PLACEHOLDER, weight),
                url: self.url.replace(SOURCE_WEIGHT_PLACEHOLDER, weight),
            }
        } else {
            ScriptSource { font: self.font.clone(), url: self.url.clone() }
        }
    }
}

/// Where one script's source font comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptSource {
    pub font: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeSettings {
    pub drop_tables: Vec<String>,
    pub keep_features: Vec<String>,
    /// Keep glyph names in the output `post` table
    pub glyph_names: bool,
}

fn default_true() -> bool {
    true
}

/// usWeightClass of a conventional weight name
pub fn standard_weight(name: &str) -> Option<u16> {
    let base = name.trim().trim_end_matches("Italic").trim();
    let value = match base.to_ascii_lowercase().replace([' ', '-'], "").as_str() {
        "thin" | "hairline" => 100,
        "extralight" | "ultralight" => 200,
        "light" => 300,
        "regular" | "normal" | "" => 400,
        "medium" => 500,
        "semibold" | "demibold" => 600,
        "bold" => 700,
        "extrabold" | "ultrabold" => 800,
        "black" | "heavy" => 900,
        _ => return None,
    };
    Some(value)
}

impl BuildConfig {
    /// Parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path).map_err(|e| {
            BuildError::config(format!("failed to read config '{}': {e}", path.display()))
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let config = Self::from_toml(&contents, base_dir).map_err(|e| match e {
            BuildError::Config(msg) => BuildError::config(format!("{}: {msg}", path.display())),
            e => e,
        })?;
        debug!("Loaded config {}: {} scripts", path.display(), config.scripts.len());
        Ok(config)
    }

    /// Parse a config from TOML text; charset paths resolve against `base_dir`
    pub fn from_toml(contents: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config: Self =
            toml::from_str(contents).map_err(|e| BuildError::config(e.to_string()))?;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.font.name.trim().is_empty() {
            return Err(BuildError::config("font.name must not be empty"));
        }
        for script in &self.scripts {
            if script.unicode_ranges.is_empty() && script.charset_file.is_none() {
                return Err(BuildError::config(format!(
                    "script '{}' has neither unicode_ranges nor charset_file",
                    script.name
                )));
            }
        }
        for (i, script) in self.scripts.iter().enumerate() {
            if self.scripts[..i].iter().any(|s| s.name == script.name) {
                return Err(BuildError::config(format!("duplicate script '{}'", script.name)));
            }
        }
        let mut tags = self.merge.drop_tables.iter().chain(&self.merge.keep_features);
        if let Some(bad) = tags.find(|t| TableTag::parse(t).is_none()) {
            return Err(BuildError::config(format!("invalid OpenType tag '{bad}' in [merge]")));
        }
        Ok(())
    }

    pub fn enabled_scripts(&self) -> impl Iterator<Item = &ScriptSpec> {
        self.scripts.iter().filter(|s| s.enabled)
    }

    /// Resolve a charset path from the config against its directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.base_dir.join(path) }
    }

    /// Output path for `weight`; a single-weight build honours `font.output`
    pub fn output_path(&self, weight: &str) -> PathBuf {
        let single = self.font.weight_values.len() <= 1;
        match &self.font.output {
            Some(output) if single => self.font.output_dir.join(output),
            _ => self.font.output_dir.join(format!("{}-{weight}.ttf", self.font.name)),
        }
    }
}

/// Find `opfonts.toml` in the working directory
pub fn find_config() -> Option<PathBuf> {
    let path = PathBuf::from(CONFIG_FILENAME);
    path.exists().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[scripts]]
        name = "latin"
        font = "Inter-Regular.ttf"
        unicode_ranges = ["U+0020-007E"]
    "#;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::from_toml(MINIMAL, "/configs").unwrap();
        assert_eq!(config.font.name, "OpFont");
        assert_eq!(config.font.output_dir, PathBuf::from("dist"));
        assert_eq!(config.font.cache_dir, PathBuf::from("./cache"));
        assert_eq!(config.font.version, "1.000");
        assert_eq!(config.font.weights(), IndexMap::from([("Regular".to_string(), 400)]));
        assert!(config.scripts[0].enabled);
        assert!(config.scripts[0].scale);
        assert!(!config.merge.glyph_names);
        assert_eq!(config.output_path("Regular"), PathBuf::from("dist/OpFont-Regular.ttf"));
    }

    #[test]
    fn test_weight_table_keeps_order() {
        let toml = format!(
            "{MINIMAL}\n[font]\nname = \"Op Sans\"\n[font.weight_values]\nBold = 700\nLight = 300\n"
        );
        let config = BuildConfig::from_toml(&toml, "").unwrap();
        let weights: Vec<_> = config.font.weights().into_iter().collect();
        assert_eq!(weights, vec![("Bold".to_string(), 700), ("Light".to_string(), 300)]);
        assert_eq!(config.output_path("Light"), PathBuf::from("dist/Op Sans-Light.ttf"));
    }

    #[test]
    fn test_out_of_range_weights_parse() {
        let toml = format!("{MINIMAL}\n[font.weight_values]\nRegular = 400\nThin = -5\nHuge = 70000\n");
        let config = BuildConfig::from_toml(&toml, "").unwrap();
        assert_eq!(config.font.weights()["Thin"], -5);
        assert_eq!(config.font.weights()["Huge"], 70_000);
    }

    #[test]
    fn test_single_weight_output_and_style() {
        let toml = format!("{MINIMAL}\n[font]\nstyle = \"Bold\"\noutput = \"custom.ttf\"\n");
        let config = BuildConfig::from_toml(&toml, "").unwrap();
        assert_eq!(config.font.weights(), IndexMap::from([("Bold".to_string(), 700)]));
        assert_eq!(config.output_path("Bold"), PathBuf::from("dist/custom.ttf"));
    }

    #[test]
    fn test_script_without_codepoints_is_rejected() {
        let toml = "[[scripts]]\nname = \"kana\"\nfont = \"Kana.ttf\"\n";
        let err = BuildConfig::from_toml(toml, "").unwrap_err();
        assert!(matches!(err, BuildError::Config(msg) if msg.contains("kana")));
    }

    #[test]
    fn test_duplicate_script_is_rejected() {
        let toml = format!("{MINIMAL}\n{MINIMAL}");
        assert!(BuildConfig::from_toml(&toml, "").is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let toml = format!("{MINIMAL}\n[merge]\ndrop_table = [\"GPOS\"]\n");
        assert!(matches!(BuildConfig::from_toml(&toml, ""), Err(BuildError::Config(_))));
    }

    #[test]
    fn test_invalid_tag_is_rejected() {
        let toml = format!("{MINIMAL}\n[merge]\nkeep_features = [\"liga\", \"toolong\"]\n");
        let err = BuildConfig::from_toml(&toml, "").unwrap_err();
        assert!(matches!(err, BuildError::Config(msg) if msg.contains("toolong")));
    }

    #[test]
    fn test_source_for_weight() {
        let script = ScriptSpec {
            name: "latin".to_string(),
            enabled: true,
            font: "Inter-Regular.ttf".to_string(),
            url: "https://example.com/Inter-Regular.ttf".to_string(),
            unicode_ranges: vec!["U+0041".to_string()],
            charset_file: None,
            scale: true,
            weights: vec!["Bold".to_string()],
        };
        assert_eq!(script.source_for("Bold").font, "Inter-Bold.ttf");
        assert_eq!(script.source_for("Bold").url, "https://example.com/Inter-Bold.ttf");
        assert_eq!(script.source_for("Light").font, "Inter-Regular.ttf");

        let all = ScriptSpec { weights: Vec::new(), ..script };
        assert_eq!(all.source_for("Light").font, "Inter-Light.ttf");
    }

    #[test]
    fn test_standard_weight() {
        assert_eq!(standard_weight("Semi Bold"), Some(600));
        assert_eq!(standard_weight("Bold Italic"), Some(700));
        assert_eq!(standard_weight("Italic"), Some(400));
        assert_eq!(standard_weight("Wide"), None);
    }

    #[test]
    fn test_resolve_path() {
        let config = BuildConfig::from_toml(MINIMAL, "/configs").unwrap();
        assert_eq!(
            config.resolve_path(Path::new("charsets/cjk.txt")),
            PathBuf::from("/configs/charsets/cjk.txt")
        );
        assert_eq!(config.resolve_path(Path::new("/abs.txt")), PathBuf::from("/abs.txt"));
    }
}
