//! Options for table filtering

use opfonts_font_ops::TableTag;
use read_fonts::types::Tag;

/// Tables to drop and GSUB features to keep after merging
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Tables to drop from the merged font
    pub drop_tables: Vec<TableTag>,

    /// Substitution features to keep; every other feature is removed
    pub keep_features: Vec<Tag>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add tables to drop (accepts any iterable of string-like values)
    pub fn drop_tables(mut self, tables: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.drop_tables
            .extend(tables.into_iter().filter_map(|s| TableTag::parse(s.as_ref())));
        self
    }

    /// Add a single table to drop
    pub fn drop_table(mut self, table: impl AsRef<str>) -> Self {
        if let Some(tag) = TableTag::parse(table.as_ref()) {
            self.drop_tables.push(tag);
        }
        self
    }

    /// Add features to keep (tags shorter than four bytes are space padded)
    pub fn keep_features(mut self, features: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.keep_features.extend(
            features.into_iter().filter_map(|s| TableTag::parse(s.as_ref())).map(|t| t.tag()),
        );
        self
    }

    /// Check if a table should be dropped
    pub fn should_drop(&self, tag: &TableTag) -> bool {
        self.drop_tables.contains(tag)
    }

    pub fn keeps_feature(&self, feature: Tag) -> bool {
        self.keep_features.contains(&feature)
    }
}
