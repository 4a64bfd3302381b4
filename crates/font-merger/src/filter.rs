//! Dropping tables, features and unreachable glyphs after a merge

use log::{debug, info};
use opfonts_font_ops::{FontModel, TableTag};

use crate::Options;

/// What the filter removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub dropped_tables: Vec<TableTag>,
    /// Substitution rules removed by feature or because a glyph was pruned
    pub removed_substitutions: usize,
    pub pruned_glyphs: usize,
}

/// Apply `options` to the model.
///
/// Named tables are deleted. Substitutions of features that are not kept
/// are removed, then glyphs that cannot be reached from the notdef glyph
/// or any mapped codepoint (through components and the remaining
/// substitutions) are swept.
pub fn filter_tables(model: &mut FontModel, options: &Options) -> FilterReport {
    let mut report = FilterReport::default();

    let dropped: Vec<TableTag> =
        model.tables.keys().copied().filter(|tag| options.should_drop(tag)).collect();
    for tag in &dropped {
        model.tables.remove(tag);
        debug!("Dropped table '{tag}'");
    }
    report.dropped_tables = dropped;

    let rules_before = model.substitutions().map(|g| g.len()).unwrap_or(0);
    if let Some(graph) = model.substitutions_mut() {
        let removed = graph.retain_features(|feature| options.keeps_feature(feature));
        debug!("Removed {removed} substitutions of dropped features");
    }

    let before = model.num_glyphs();
    let reachable = model.reachable_glyphs();
    model.retain_glyphs(&reachable);
    report.pruned_glyphs = before - model.num_glyphs();
    report.removed_substitutions =
        rules_before - model.substitutions().map(|g| g.len()).unwrap_or(0);

    info!(
        "Filtered font: {} tables dropped, {} substitutions removed, {} glyphs pruned",
        report.dropped_tables.len(),
        report.removed_substitutions,
        report.pruned_glyphs
    );
    report
}
