//! Glyph substitution graph
//!
//! GSUB lookups are read into a flat list of rules keyed by glyph name so the
//! graph survives subsetting and merging. Only the substitution types that
//! map glyphs to glyphs directly are modelled, including those wrapped in
//! extension lookups; contextual lookups are not.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use font_types::GlyphId16;
use log::debug;
use read_fonts::{
    FontRef, TableProvider,
    tables::gsub::{
        SingleSubst as ReadSingleSubst, SubstitutionLookup as ReadLookup, SubstitutionSubtables,
    },
    types::Tag,
};
use write_fonts::tables::{
    gsub::{
        AlternateSet, AlternateSubstFormat1, Gsub, Ligature, LigatureSet, LigatureSubstFormat1,
        MultipleSubstFormat1, Sequence, SingleSubst, SubstitutionLookup, SubstitutionLookupList,
    },
    layout::{
        CoverageTable, Feature, FeatureList, FeatureRecord, LangSys, Lookup, LookupFlag, Script,
        ScriptList, ScriptRecord,
    },
};

use crate::{GlyphName, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubstKind {
    /// One glyph to one glyph
    Single,
    /// One glyph to a sequence
    Multiple,
    /// One glyph to one of a set of alternates
    Alternate,
    /// A sequence of glyphs to one glyph
    Ligature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub feature: Tag,
    pub kind: SubstKind,
    pub input: Vec<GlyphName>,
    pub output: Vec<GlyphName>,
}

impl Substitution {
    pub fn single(feature: Tag, from: impl Into<GlyphName>, to: impl Into<GlyphName>) -> Self {
        Self { feature, kind: SubstKind::Single, input: vec![from.into()], output: vec![to.into()] }
    }

    pub fn alternate(feature: Tag, from: impl Into<GlyphName>, alternates: Vec<GlyphName>) -> Self {
        Self { feature, kind: SubstKind::Alternate, input: vec![from.into()], output: alternates }
    }

    pub fn ligature(feature: Tag, components: Vec<GlyphName>, to: impl Into<GlyphName>) -> Self {
        Self { feature, kind: SubstKind::Ligature, input: components, output: vec![to.into()] }
    }

    fn glyphs(&self) -> impl Iterator<Item = &GlyphName> {
        self.input.iter().chain(&self.output)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubstitutionGraph {
    pub rules: Vec<Substitution>,
}

impl SubstitutionGraph {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn features(&self) -> BTreeSet<Tag> {
        self.rules.iter().map(|r| r.feature).collect()
    }

    /// Glyphs produced by rules whose inputs are all in `reached`
    pub fn outputs_from<'a>(
        &'a self,
        reached: &'a HashSet<GlyphName>,
    ) -> impl Iterator<Item = &'a GlyphName> + 'a {
        self.rules
            .iter()
            .filter(|r| r.input.iter().all(|g| reached.contains(g)))
            .flat_map(|r| r.output.iter())
    }

    /// Drop rules whose feature is not kept, returning how many were removed
    pub fn retain_features(&mut self, keep: impl Fn(Tag) -> bool) -> usize {
        let before = self.rules.len();
        self.rules.retain(|r| keep(r.feature));
        before - self.rules.len()
    }

    /// Drop rules referencing any glyph that is not kept
    pub fn retain_glyphs(&mut self, keep: impl Fn(&GlyphName) -> bool) {
        self.rules.retain(|r| r.glyphs().all(&keep));
    }

    pub fn rename(&mut self, renames: &HashMap<GlyphName, GlyphName>) {
        for rule in &mut self.rules {
            for glyph in rule.input.iter_mut().chain(rule.output.iter_mut()) {
                if let Some(new) = renames.get(glyph) {
                    *glyph = new.clone();
                }
            }
        }
    }

    pub fn extend(&mut self, other: SubstitutionGraph) {
        self.rules.extend(other.rules);
    }

    /// Read the GSUB table of `font`, naming glyphs through `names` (indexed by glyph id)
    pub fn read(font: &FontRef, names: &[GlyphName]) -> Result<Self> {
        let gsub = font.gsub()?;
        let feature_list = gsub.feature_list()?;
        let lookup_list = gsub.lookup_list()?;
        let lookups = lookup_list.lookups();

        let mut rules = Vec::new();
        let mut seen: HashSet<(Tag, u16)> = HashSet::new();
        let records = feature_list.feature_records();

        for record in records {
            let tag = record.feature_tag();
            let Ok(feature) = record.feature(feature_list.offset_data()) else {
                continue;
            };
            for index in feature.lookup_list_indices() {
                let index = index.get();
                if !seen.insert((tag, index)) {
                    continue;
                }
                match lookups.get(index as usize) {
                    Ok(lookup) => read_lookup(&lookup, tag, names, &mut rules),
                    Err(e) => debug!("Skipping unreadable GSUB lookup {index}: {e}"),
                }
            }
        }

        Ok(Self { rules })
    }

    /// Encode the graph as a GSUB table against a final glyph order
    ///
    /// One lookup is emitted per feature and substitution type, registered
    /// for the default script. Returns None when no rule can be encoded.
    pub fn build(&self, glyph_ids: &HashMap<&str, u16>) -> Option<Gsub> {
        let gid = |name: &GlyphName| glyph_ids.get(name.as_str()).copied().map(GlyphId16::new);

        let mut grouped: BTreeMap<(Tag, SubstKind), Vec<&Substitution>> = BTreeMap::new();
        for rule in &self.rules {
            grouped.entry((rule.feature, rule.kind)).or_default().push(rule);
        }

        let mut lookups: Vec<SubstitutionLookup> = Vec::new();
        let mut features: BTreeMap<Tag, Vec<u16>> = BTreeMap::new();

        for ((tag, kind), rules) in grouped {
            let encoded: Vec<(GlyphId16, Vec<GlyphId16>, Vec<GlyphId16>)> = rules
                .iter()
                .filter_map(|r| {
                    let input: Option<Vec<_>> = r.input.iter().map(gid).collect();
                    let output: Option<Vec<_>> = r.output.iter().map(gid).collect();
                    let input = input?;
                    Some((*input.first()?, input, output?))
                })
                .collect();

            let Some(lookup) = build_lookup(kind, encoded) else {
                continue;
            };
            lookups.push(lookup);
            features.entry(tag).or_default().push((lookups.len() - 1) as u16);
        }

        if lookups.is_empty() {
            return None;
        }

        let feature_records: Vec<FeatureRecord> = features
            .into_iter()
            .map(|(tag, lookup_indices)| FeatureRecord::new(tag, Feature::new(None, lookup_indices)))
            .collect();
        let all_features = (0..feature_records.len() as u16).collect();
        let script = Script::new(Some(LangSys::new(all_features)), vec![]);
        let script_list = ScriptList::new(vec![ScriptRecord::new(Tag::new(b"DFLT"), script)]);

        Some(Gsub::new(
            script_list,
            FeatureList::new(feature_records),
            SubstitutionLookupList::new(lookups),
        ))
    }
}

fn read_lookup(
    lookup: &ReadLookup,
    feature: Tag,
    names: &[GlyphName],
    rules: &mut Vec<Substitution>,
) {
    let name = |gid: u32| names.get(gid as usize).cloned();
    let one = |gid: u32| name(gid).map(|n| vec![n]);
    let mut push = |kind, input: Option<Vec<GlyphName>>, output: Option<Vec<GlyphName>>| {
        if let (Some(input), Some(output)) = (input, output)
            && !output.is_empty()
        {
            rules.push(Substitution { feature, kind, input, output });
        }
    };

    // Extension lookups resolve to the subtable type they wrap
    let subtables = match lookup.subtables() {
        Ok(subtables) => subtables,
        Err(e) => {
            debug!("Skipping unreadable lookup in '{feature}': {e}");
            return;
        }
    };

    match subtables {
        SubstitutionSubtables::Single(subtables) => {
            for subtable in subtables.iter().filter_map(|s| s.ok()) {
                match subtable {
                    ReadSingleSubst::Format1(f1) => {
                        let Ok(coverage) = f1.coverage() else { continue };
                        let delta = f1.delta_glyph_id() as i32;
                        for gid in coverage.iter() {
                            let target = ((gid.to_u32() as i32 + delta) & 0xFFFF) as u32;
                            push(SubstKind::Single, one(gid.to_u32()), one(target));
                        }
                    }
                    ReadSingleSubst::Format2(f2) => {
                        let Ok(coverage) = f2.coverage() else { continue };
                        for (gid, target) in coverage.iter().zip(f2.substitute_glyph_ids()) {
                            push(SubstKind::Single, one(gid.to_u32()), one(target.get().to_u32()));
                        }
                    }
                }
            }
        }
        SubstitutionSubtables::Multiple(subtables) => {
            for subtable in subtables.iter().filter_map(|s| s.ok()) {
                let Ok(coverage) = subtable.coverage() else { continue };
                for (gid, seq) in coverage.iter().zip(subtable.sequences().iter()) {
                    let Ok(seq) = seq else { continue };
                    let output =
                        seq.substitute_glyph_ids().iter().map(|g| name(g.get().to_u32())).collect();
                    push(SubstKind::Multiple, one(gid.to_u32()), output);
                }
            }
        }
        SubstitutionSubtables::Alternate(subtables) => {
            for subtable in subtables.iter().filter_map(|s| s.ok()) {
                let Ok(coverage) = subtable.coverage() else { continue };
                for (gid, set) in coverage.iter().zip(subtable.alternate_sets().iter()) {
                    let Ok(set) = set else { continue };
                    let output =
                        set.alternate_glyph_ids().iter().map(|g| name(g.get().to_u32())).collect();
                    push(SubstKind::Alternate, one(gid.to_u32()), output);
                }
            }
        }
        SubstitutionSubtables::Ligature(subtables) => {
            for subtable in subtables.iter().filter_map(|s| s.ok()) {
                let Ok(coverage) = subtable.coverage() else { continue };
                for (gid, set) in coverage.iter().zip(subtable.ligature_sets().iter()) {
                    let Ok(set) = set else { continue };
                    for lig in set.ligatures().iter().filter_map(|l| l.ok()) {
                        let components = lig.component_glyph_ids().iter();
                        let input = std::iter::once(name(gid.to_u32()))
                            .chain(components.map(|g| name(g.get().to_u32())))
                            .collect();
                        push(SubstKind::Ligature, input, one(lig.ligature_glyph().to_u32()));
                    }
                }
            }
        }
        _ => debug!("Skipping contextual lookup in '{feature}'"),
    }
}

/// Build one lookup from (first input, input, output) triples
fn build_lookup(
    kind: SubstKind,
    mut encoded: Vec<(GlyphId16, Vec<GlyphId16>, Vec<GlyphId16>)>,
) -> Option<SubstitutionLookup> {
    // Coverage must be sorted by glyph id; the first rule for a glyph wins
    encoded.sort_by_key(|(first, _, _)| *first);

    let lookup = match kind {
        SubstKind::Single | SubstKind::Multiple | SubstKind::Alternate => {
            encoded.dedup_by_key(|(first, _, _)| *first);
            if encoded.is_empty() {
                return None;
            }
            let coverage = CoverageTable::format_1(encoded.iter().map(|(g, _, _)| *g).collect());
            match kind {
                SubstKind::Single => {
                    let substitutes =
                        encoded.iter().filter_map(|(_, _, out)| out.first().copied()).collect();
                    SubstitutionLookup::Single(Lookup::new(
                        LookupFlag::empty(),
                        vec![SingleSubst::format_2(coverage, substitutes)],
                    ))
                }
                SubstKind::Multiple => {
                    let sequences =
                        encoded.into_iter().map(|(_, _, out)| Sequence::new(out)).collect();
                    SubstitutionLookup::Multiple(Lookup::new(
                        LookupFlag::empty(),
                        vec![MultipleSubstFormat1::new(coverage, sequences)],
                    ))
                }
                _ => {
                    let sets =
                        encoded.into_iter().map(|(_, _, out)| AlternateSet::new(out)).collect();
                    SubstitutionLookup::Alternate(Lookup::new(
                        LookupFlag::empty(),
                        vec![AlternateSubstFormat1::new(coverage, sets)],
                    ))
                }
            }
        }
        SubstKind::Ligature => {
            let mut sets: BTreeMap<GlyphId16, Vec<Ligature>> = BTreeMap::new();
            for (first, input, output) in encoded {
                let Some(&ligature) = output.first() else { continue };
                let ligatures = sets.entry(first).or_default();
                let components = input[1..].to_vec();
                // Longer sequences must be tried first
                let at = ligatures
                    .iter()
                    .position(|l| l.component_glyph_ids.len() < components.len())
                    .unwrap_or(ligatures.len());
                ligatures.insert(at, Ligature::new(ligature, components));
            }
            if sets.is_empty() {
                return None;
            }
            let coverage = CoverageTable::format_1(sets.keys().copied().collect());
            let sets = sets.into_values().map(LigatureSet::new).collect();
            SubstitutionLookup::Ligature(Lookup::new(
                LookupFlag::empty(),
                vec![LigatureSubstFormat1::new(coverage, sets)],
            ))
        }
    };
    Some(lookup)
}
