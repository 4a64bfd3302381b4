//! Merging per-script font models and filtering the result.
//!
//! # Example
//!
//! ```no_run
//! use opfonts_font_merger::{Merger, Options, ScriptFont, filter_tables};
//! use opfonts_font_ops::FontModel;
//!
//! let latin = FontModel::from_bytes(&std::fs::read("latin.ttf").unwrap()).unwrap();
//! let kana = FontModel::from_bytes(&std::fs::read("kana.ttf").unwrap()).unwrap();
//! let (mut merged, _) = Merger::new()
//!     .merge(vec![ScriptFont::new("latin", latin), ScriptFont::new("kana", kana)])
//!     .unwrap();
//! filter_tables(&mut merged, &Options::new().drop_tables(["GPOS"]).keep_features(["liga"]));
//! ```

mod error;
mod filter;
mod merger;
mod options;
mod strategies;

pub use error::{MergeError, Result};
pub use filter::{FilterReport, filter_tables};
pub use merger::{MergeReport, Merger, ScriptFont};
pub use options::Options;
