//! Glyph reachability through components and substitutions

use std::collections::HashSet;

use crate::{GlyphName, model::FontModel};

impl FontModel {
    /// Every glyph reachable from `roots`
    ///
    /// A glyph is reachable when it is a root, a component of a reachable
    /// glyph, or the output of a substitution whose inputs are all reachable.
    /// The notdef glyph is always included. Unknown root names are ignored.
    pub fn glyph_closure<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a GlyphName>,
    ) -> HashSet<GlyphName> {
        let mut reached: HashSet<GlyphName> = HashSet::new();
        let mut pending: Vec<GlyphName> = roots
            .into_iter()
            .filter(|name| self.glyphs.contains_key(name.as_str()))
            .cloned()
            .collect();
        pending.extend(self.notdef().cloned());

        loop {
            while let Some(name) = pending.pop() {
                if !reached.insert(name.clone()) {
                    continue;
                }
                if let Some(glyph) = self.glyphs.get(&name) {
                    pending.extend(
                        glyph
                            .outline
                            .components()
                            .filter(|c| !reached.contains(*c) && self.glyphs.contains_key(*c))
                            .cloned(),
                    );
                }
            }

            let Some(graph) = self.substitutions() else {
                break;
            };
            pending.extend(
                graph
                    .outputs_from(&reached)
                    .filter(|g| !reached.contains(*g) && self.glyphs.contains_key(*g))
                    .cloned(),
            );
            if pending.is_empty() {
                break;
            }
        }

        reached
    }

    /// Glyphs reachable from the notdef glyph and every mapped codepoint
    pub fn reachable_glyphs(&self) -> HashSet<GlyphName> {
        self.glyph_closure(self.cmap.values())
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Vec2;
    use read_fonts::types::Tag;

    use super::*;
    use crate::{
        Codepoint, Substitution, SubstitutionGraph, TableTag,
        model::{Component, Glyph, Outline, OutlinePoint, TableData},
    };

    fn simple() -> Glyph {
        Glyph::new(Outline::Simple(vec![vec![OutlinePoint::on(0.0, 0.0)]]), 500.0)
    }

    fn model() -> FontModel {
        let mut model = FontModel::default();
        for name in ["a", "acute", "f", "i", "f_i", "a.sc", "orphan"] {
            model.glyphs.insert(name.into(), simple());
        }
        model.glyphs.insert(
            "aacute".into(),
            Glyph::new(
                Outline::Composite(vec![
                    Component::offset("a".into(), Vec2::ZERO),
                    Component::offset("acute".into(), Vec2::new(100.0, 0.0)),
                ]),
                500.0,
            ),
        );
        let smcp = Tag::new(b"smcp");
        let liga = Tag::new(b"liga");
        model.tables.insert(
            TableTag::new(b"GSUB"),
            TableData::Substitutions(SubstitutionGraph {
                rules: vec![
                    Substitution::single(smcp, "a", "a.sc"),
                    Substitution::ligature(liga, vec!["f".into(), "i".into()], "f_i"),
                ],
            }),
        );
        model
    }

    #[test]
    fn test_closure_follows_components() {
        let model = model();
        let closure = model.glyph_closure([&GlyphName::new("aacute")]);
        assert!(closure.contains("aacute"));
        assert!(closure.contains("acute"));
        assert!(closure.contains(".notdef"));
        // `a` is reached as a component and feeds the small-caps rule
        assert!(closure.contains("a.sc"));
        assert!(!closure.contains("orphan"));
    }

    #[test]
    fn test_ligature_needs_every_input() {
        let model = model();
        let only_f = model.glyph_closure([&GlyphName::new("f")]);
        assert!(!only_f.contains("f_i"));

        let both = model.glyph_closure([&GlyphName::new("f"), &GlyphName::new("i")]);
        assert!(both.contains("f_i"));
    }

    #[test]
    fn test_reachable_glyphs_from_cmap() {
        let mut model = model();
        model.cmap.insert(Codepoint::new(0x66), "f".into());
        model.cmap.insert(Codepoint::new(0x69), "i".into());

        let reached = model.reachable_glyphs();
        let mut names: Vec<&str> = reached.iter().map(|n| n.as_str()).collect();
        names.sort();
        assert_eq!(names, vec![".notdef", "f", "f_i", "i"]);
    }

    #[test]
    fn test_unknown_roots_are_ignored() {
        let model = model();
        let closure = model.glyph_closure([&GlyphName::new("missing")]);
        assert_eq!(closure.len(), 1);
    }
}
