//! Font naming and version metadata for one output weight.

use chrono::{Datelike, NaiveDate};
use opfonts_font_ops::FontModel;
use thiserror::Error;
use write_fonts::tables::os2::SelectionFlags;

/// Name table IDs.
const NAME_ID_COPYRIGHT: u16 = 0;
const NAME_ID_FAMILY: u16 = 1;
const NAME_ID_SUBFAMILY: u16 = 2;
const NAME_ID_UNIQUE_ID: u16 = 3;
const NAME_ID_FULL_NAME: u16 = 4;
const NAME_ID_VERSION: u16 = 5;
const NAME_ID_POSTSCRIPT: u16 = 6;
const NAME_ID_DESIGNER: u16 = 9;
const NAME_ID_TYPOGRAPHIC_FAMILY: u16 = 16;
const NAME_ID_TYPOGRAPHIC_SUBFAMILY: u16 = 17;

/// Styles a legacy family can express with name IDs 1 and 2 alone
const RIBBI_STYLES: [&str; 4] = ["Regular", "Italic", "Bold", "Bold Italic"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("weight {weight} of style '{style}' is outside 1..=1000")]
    InvalidWeight { style: String, weight: i64 },

    #[error("family name is empty")]
    EmptyFamily,

    #[error("style name is empty")]
    EmptyStyle,

    #[error("invalid version '{0}', expected a number like 1.000 or a date like YYYY-MM-DD[.N]")]
    InvalidVersion(String),
}

pub type Result<T> = std::result::Result<T, MetadataError>;

/// Font version information.
#[derive(Debug, Clone, PartialEq)]
pub struct FontVersion {
    /// Version tag as configured (e.g., "1.000" or "2024-01-15.1").
    pub tag: String,
    revision: f64,
}

impl Default for FontVersion {
    fn default() -> Self {
        Self { tag: "1.000".to_string(), revision: 1.0 }
    }
}

impl FontVersion {
    /// Parse a numeric version (`1.000`) or a date version (`YYYY-MM-DD` or
    /// `YYYY-MM-DD.N`).
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if let Ok(revision) = value.parse::<f64>()
            && revision.is_finite()
            && revision >= 0.0
        {
            return Ok(Self { tag: value.to_string(), revision });
        }

        let date = match value.rsplit_once('.') {
            Some((date_part, build_num)) if build_num.parse::<u32>().is_ok() => date_part,
            _ => value,
        };
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(|date| Self { tag: value.to_string(), revision: date_revision(date) })
            .map_err(|_| MetadataError::InvalidVersion(value.to_string()))
    }

    /// Get the version string (e.g., "Version 1.000").
    pub fn version_string(&self) -> String {
        format!("Version {}", self.tag)
    }

    /// Font revision for `head`; dates become YYYY.MMDD.
    pub fn revision(&self) -> f64 {
        self.revision
    }
}

fn date_revision(date: NaiveDate) -> f64 {
    date.year() as f64 + (date.month() * 100 + date.day()) as f64 / 10000.0
}

/// Family, style and credits stamped into one output font
#[derive(Debug, Clone, PartialEq)]
pub struct FontNaming {
    pub family: String,
    pub style: String,
    /// OS/2 weight class, as configured
    pub weight: i64,
    pub copyright: Option<String>,
    pub designer: Option<String>,
    pub version: FontVersion,
}

impl FontNaming {
    pub fn new(family: impl Into<String>, style: impl Into<String>, weight: i64) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
            weight,
            copyright: None,
            designer: None,
            version: FontVersion::default(),
        }
    }

    pub fn with_copyright(mut self, copyright: impl Into<String>) -> Self {
        self.copyright = Some(copyright.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn with_designer(mut self, designer: impl Into<String>) -> Self {
        self.designer = Some(designer.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn with_version(mut self, version: FontVersion) -> Self {
        self.version = version;
        self
    }

    /// True for Regular, Italic, Bold and Bold Italic
    pub fn is_ribbi(&self) -> bool {
        RIBBI_STYLES.iter().any(|s| s.eq_ignore_ascii_case(self.style.trim()))
    }

    /// `Family-Style` with spaces removed
    pub fn postscript_name(&self) -> String {
        format!("{}-{}", self.family, self.style).replace(' ', "")
    }

    pub fn validate(&self) -> Result<()> {
        if self.family.trim().is_empty() {
            return Err(MetadataError::EmptyFamily);
        }
        if self.style.trim().is_empty() {
            return Err(MetadataError::EmptyStyle);
        }
        self.weight_class().map(|_| ())
    }

    /// The weight as a `usWeightClass` value in 1..=1000
    pub fn weight_class(&self) -> Result<u16> {
        u16::try_from(self.weight).ok().filter(|w| (1..=1000).contains(w)).ok_or_else(|| {
            MetadataError::InvalidWeight { style: self.style.clone(), weight: self.weight }
        })
    }

    /// Stamp names, weight class, selection flags and revision onto `model`.
    ///
    /// Updates the following name IDs:
    /// - 0 (Copyright) and 9 (Designer) when given
    /// - 1 (Family): `"{family}"`, or `"{family} {style}"` outside RIBBI
    /// - 2 (Subfamily): `"{style}"`, or `"Regular"` outside RIBBI
    /// - 3 (Unique ID): `"{version};{postscript name}"`
    /// - 4 (Full name): `"{family} {style}"`
    /// - 5 (Version): `"Version {version}"`
    /// - 6 (PostScript name): `"{family}-{style}"` (spaces removed)
    /// - 16/17 (Typographic family/subfamily) outside RIBBI; removed otherwise
    pub fn apply(&self, model: &mut FontModel) -> Result<()> {
        self.validate()?;
        let weight_class = self.weight_class()?;
        let ribbi = self.is_ribbi();
        let postscript_name = self.postscript_name();
        let full_name = format!("{} {}", self.family, self.style);

        if let Some(copyright) = &self.copyright {
            model.set_name(NAME_ID_COPYRIGHT, copyright);
        }
        if ribbi {
            model.set_name(NAME_ID_FAMILY, &self.family);
            model.set_name(NAME_ID_SUBFAMILY, &self.style);
            model.names.retain(|n| {
                n.name_id != NAME_ID_TYPOGRAPHIC_FAMILY
                    && n.name_id != NAME_ID_TYPOGRAPHIC_SUBFAMILY
            });
        } else {
            model.set_name(NAME_ID_FAMILY, &full_name);
            model.set_name(NAME_ID_SUBFAMILY, "Regular");
            model.set_name(NAME_ID_TYPOGRAPHIC_FAMILY, &self.family);
            model.set_name(NAME_ID_TYPOGRAPHIC_SUBFAMILY, &self.style);
        }
        model.set_name(NAME_ID_UNIQUE_ID, &format!("{};{postscript_name}", self.version.tag));
        model.set_name(NAME_ID_FULL_NAME, &full_name);
        model.set_name(NAME_ID_VERSION, &self.version.version_string());
        model.set_name(NAME_ID_POSTSCRIPT, &postscript_name);
        if let Some(designer) = &self.designer {
            model.set_name(NAME_ID_DESIGNER, designer);
        }

        model.style.weight_class = weight_class;
        model.style.font_revision = self.version.revision();
        model.style.selection = self.selection(model.style.selection);
        Ok(())
    }

    /// Selection flags with the RIBBI bits derived from the style name
    fn selection(&self, current: SelectionFlags) -> SelectionFlags {
        let style = self.style.to_ascii_lowercase();
        let bold = ribbi_bold(&style) && self.is_ribbi();
        let italic = style.contains("italic") || style.contains("oblique");

        let ribbi_bits = (SelectionFlags::REGULAR | SelectionFlags::BOLD | SelectionFlags::ITALIC).bits();
        let mut selection = SelectionFlags::from_bits_truncate(current.bits() & !ribbi_bits);
        if bold {
            selection |= SelectionFlags::BOLD;
        }
        if italic {
            selection |= SelectionFlags::ITALIC;
        }
        if !bold && !italic {
            selection |= SelectionFlags::REGULAR;
        }
        selection
    }
}

fn ribbi_bold(style: &str) -> bool {
    style.split_whitespace().next() == Some("bold")
}
