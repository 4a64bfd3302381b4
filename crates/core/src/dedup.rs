//! Assigning every codepoint to exactly one script.

use log::debug;

use crate::CodepointSet;

/// Scripts with their exclusive codepoints, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptPartition {
    entries: Vec<(String, CodepointSet)>,
}

impl ScriptPartition {
    /// Partition ordered script sets; an earlier script keeps every codepoint
    /// it shares with a later one.
    pub fn new(scripts: impl IntoIterator<Item = (String, CodepointSet)>) -> Self {
        let (entries, _claimed) = scripts.into_iter().fold(
            (Vec::new(), CodepointSet::new()),
            |(mut entries, mut claimed), (script, codepoints)| {
                let exclusive: CodepointSet = codepoints.difference(&claimed).copied().collect();
                debug!(
                    "Script '{script}': {} codepoints, {} exclusive",
                    codepoints.len(),
                    exclusive.len()
                );
                claimed.extend(exclusive.iter().copied());
                entries.push((script, exclusive));
                (entries, claimed)
            },
        );
        Self { entries }
    }

    pub fn get(&self, script: &str) -> Option<&CodepointSet> {
        self.entries.iter().find(|(name, _)| name == script).map(|(_, set)| set)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CodepointSet)> {
        self.entries.iter().map(|(name, set)| (name.as_str(), set))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_inner(self) -> Vec<(String, CodepointSet)> {
        self.entries
    }
}
