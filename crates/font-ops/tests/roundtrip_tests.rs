//! Load and compile tests on synthetic fonts

use kurbo::Vec2;
use opfonts_font_ops::{
    Codepoint, Component, FontError, FontModel, Glyph, GlyphName, NameEntry, Outline,
    OutlinePoint, Substitution, SubstitutionGraph, TableData, TableTag,
};
use read_fonts::{
    FontRef, TableProvider,
    tables::cmap::CmapSubtable,
    types::{GlyphId, GlyphId16, Tag},
};
use write_fonts::{
    FontBuilder, dump_table,
    tables::{
        cmap::Cmap,
        gsub::{
            ExtensionSubstFormat1, ExtensionSubtable, Gsub, SingleSubst, SubstitutionLookup,
            SubstitutionLookupList,
        },
        layout::{
            CoverageTable, Feature, FeatureList, FeatureRecord, LangSys, Lookup, LookupFlag,
            Script, ScriptList, ScriptRecord,
        },
    },
};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<OutlinePoint> {
    vec![
        OutlinePoint::on(x0, y0),
        OutlinePoint::on(x0, y1),
        OutlinePoint::on(x1, y1),
        OutlinePoint::on(x1, y0),
    ]
}

/// A small Latin font: notdef, space, A, acute, Aacute, f, i, f_i
fn make_model() -> FontModel {
    let mut model = FontModel::default();
    model.metrics.ascender = 800.0;
    model.metrics.descender = -200.0;
    model.metrics.win_ascent = 900.0;
    model.metrics.win_descent = 250.0;
    model.metrics.cap_height = 700.0;
    model.metrics.x_height = 500.0;
    model.decoration.underline_position = -100.0;
    model.decoration.underline_thickness = 50.0;

    model.glyphs[".notdef"] = Glyph::new(Outline::Simple(vec![rect(50.0, 0.0, 450.0, 700.0)]), 500.0);
    model.glyphs.insert("space".into(), Glyph::new(Outline::Empty, 250.0));
    model.glyphs.insert("A".into(), Glyph::new(Outline::Simple(vec![rect(20.0, 0.0, 580.0, 700.0)]), 600.0));
    model.glyphs.insert(
        "acute".into(),
        Glyph::new(
            Outline::Simple(vec![vec![
                OutlinePoint::on(0.0, 750.0),
                OutlinePoint::off(60.0, 800.0),
                OutlinePoint::on(120.0, 900.0),
            ]]),
            300.0,
        ),
    );
    model.glyphs.insert(
        "Aacute".into(),
        Glyph::new(
            Outline::Composite(vec![
                Component::offset("A".into(), Vec2::ZERO),
                Component::offset("acute".into(), Vec2::new(240.0, 10.0)),
            ]),
            600.0,
        ),
    );
    model.glyphs.insert("f".into(), Glyph::new(Outline::Simple(vec![rect(40.0, 0.0, 200.0, 720.0)]), 300.0));
    model.glyphs.insert("i".into(), Glyph::new(Outline::Simple(vec![rect(60.0, 0.0, 120.0, 500.0)]), 200.0));
    model.glyphs.insert("f_i".into(), Glyph::new(Outline::Simple(vec![rect(40.0, 0.0, 420.0, 720.0)]), 500.0));

    for (cp, name) in [(0x20, "space"), (0x41, "A"), (0xC1, "Aacute"), (0x66, "f"), (0x69, "i")] {
        model.cmap.insert(Codepoint::new(cp), name.into());
    }
    model.tables.insert(
        TableTag::new(b"GSUB"),
        TableData::Substitutions(SubstitutionGraph {
            rules: vec![Substitution::ligature(
                Tag::new(b"liga"),
                vec!["f".into(), "i".into()],
                "f_i",
            )],
        }),
    );
    model.tables.insert(
        TableTag::new(b"gasp"),
        TableData::Raw(vec![0, 1, 0, 1, 0xFF, 0xFF, 0, 0x0F]),
    );
    model.set_name(1, "Test Sans");
    model.set_name(2, "Regular");
    model.keep_glyph_names = true;
    model
}

#[test]
fn test_compile_then_load_preserves_glyphs() {
    let model = make_model();
    let data = model.compile().unwrap();
    let loaded = FontModel::from_bytes(&data).unwrap();

    let names: Vec<&str> = loaded.glyphs.keys().map(|n| n.as_str()).collect();
    assert_eq!(names, vec![".notdef", "space", "A", "acute", "Aacute", "f", "i", "f_i"]);
    assert_eq!(loaded.units_per_em, 1000);
    assert_eq!(loaded.cmap.len(), 5);
    assert_eq!(loaded.cmap[&Codepoint::new(0xC1)], "Aacute");
    assert_eq!(loaded.glyphs["space"].advance, 250.0);
    assert_eq!(loaded.glyphs["A"].advance, 600.0);

    let Outline::Composite(components) = &loaded.glyphs["Aacute"].outline else {
        panic!("Aacute should stay a composite");
    };
    assert_eq!(components.len(), 2);
    assert_eq!(components[1].glyph, "acute");
    assert_eq!(loaded.bounds("Aacute"), model.bounds("Aacute"));

    let Outline::Simple(contours) = &loaded.glyphs["acute"].outline else {
        panic!("acute should stay simple");
    };
    let flags: Vec<bool> = contours[0].iter().map(|p| p.on_curve).collect();
    assert_eq!(flags, vec![true, false, true]);
}

#[test]
fn test_compile_then_load_preserves_metrics_and_tables() {
    let model = make_model();
    let loaded = FontModel::from_bytes(&model.compile().unwrap()).unwrap();

    assert_eq!(loaded.metrics.ascender, 800.0);
    assert_eq!(loaded.metrics.descender, -200.0);
    assert_eq!(loaded.metrics.win_ascent, 900.0);
    assert_eq!(loaded.metrics.cap_height, 700.0);
    assert_eq!(loaded.decoration.underline_thickness, 50.0);
    assert_eq!(loaded.name(1), Some("Test Sans"));

    let graph = loaded.substitutions().expect("GSUB should survive");
    assert_eq!(graph.len(), 1);
    assert_eq!(graph.rules[0].output[0], "f_i");
    assert!(matches!(loaded.tables.get(&TableTag::new(b"gasp")), Some(TableData::Raw(_))));
}

#[test]
fn test_compiled_font_tables() {
    let data = make_model().compile().unwrap();
    let font = FontRef::new(&data).unwrap();

    let maxp = font.maxp().unwrap();
    assert_eq!(maxp.num_glyphs(), 8);
    assert_eq!(maxp.max_component_elements(), Some(2));

    let head = font.head().unwrap();
    assert_eq!(head.units_per_em(), 1000);
    assert_eq!(head.x_min(), 0);
    assert_eq!(head.y_max(), 910);

    let os2 = font.os2().unwrap();
    assert_eq!(os2.us_first_char_index(), 0x20);
    assert_eq!(os2.us_last_char_index(), 0xC1);
    assert_eq!(os2.us_max_context(), Some(2));

    let hhea = font.hhea().unwrap();
    assert_eq!(hhea.advance_width_max().to_u16(), 600);
    assert_eq!(hhea.number_of_h_metrics(), 8);
}

#[test]
fn test_post_v3_without_glyph_names() {
    let mut model = make_model();
    model.keep_glyph_names = false;
    let data = model.compile().unwrap();

    let font = FontRef::new(&data).unwrap();
    assert_eq!(font.post().unwrap().version().to_major_minor(), (3, 0));

    let loaded = FontModel::from_bytes(&data).unwrap();
    assert_eq!(loaded.notdef().map(|n| n.as_str()), Some(".notdef"));
    assert!(loaded.glyphs.contains_key("glyph00002"));
    assert_eq!(loaded.cmap[&Codepoint::new(0x41)], "glyph00002");
}

#[test]
fn test_opaque_tables_are_not_written() {
    let mut model = make_model();
    model.tables.insert(TableTag::new(b"kern"), TableData::GlyphBound { len: 42 });
    let data = model.compile().unwrap();

    let font = FontRef::new(&data).unwrap();
    assert!(font.table_data(Tag::new(b"kern")).is_none());
    assert!(font.table_data(Tag::new(b"gasp")).is_some());
}

#[test]
fn test_composite_of_empty_glyphs_becomes_empty() {
    let mut model = make_model();
    model.glyphs.insert(
        "nbspace".into(),
        Glyph::new(Outline::Composite(vec![Component::offset("space".into(), Vec2::ZERO)]), 250.0),
    );
    let loaded = FontModel::from_bytes(&model.compile().unwrap()).unwrap();
    assert_eq!(loaded.glyphs["nbspace"].outline, Outline::Empty);
    assert_eq!(loaded.glyphs["nbspace"].advance, 250.0);
}

#[test]
fn test_missing_component_is_an_error() {
    let mut model = make_model();
    model.glyphs.insert(
        "broken".into(),
        Glyph::new(Outline::Composite(vec![Component::offset("nowhere".into(), Vec2::ZERO)]), 500.0),
    );
    match model.compile() {
        Err(FontError::MissingComponent { glyph, component }) => {
            assert_eq!(glyph, "broken");
            assert_eq!(component, "nowhere");
        }
        other => panic!("expected MissingComponent, got {other:?}"),
    }
}

#[test]
fn test_too_many_glyphs() {
    let mut model = FontModel::default();
    for gid in 1..=65535 {
        model.glyphs.insert(GlyphName::from_gid(gid), Glyph::default());
    }
    assert!(matches!(model.compile(), Err(FontError::TooManyGlyphs(65536))));
}

#[test]
fn test_compacted_font_round_trips() {
    let mut model = make_model();
    model.glyphs.insert(
        "uni0410".into(),
        Glyph::new(Outline::Simple(vec![rect(120.0, 0.0, 680.0, 700.0)]), 600.0),
    );
    model.glyphs["A"].outline = Outline::Simple(vec![
        rect(20.0, 0.0, 580.0, 700.0),
        rect(200.0, 200.0, 400.0, 300.0),
    ]);
    model.glyphs["uni0410"].outline = Outline::Simple(vec![
        rect(120.0, 0.0, 680.0, 700.0),
        rect(300.0, 200.0, 500.0, 300.0),
    ]);
    let before = model.bounds("uni0410");

    assert_eq!(model.compact_outlines(), 1);
    let loaded = FontModel::from_bytes(&model.compile().unwrap()).unwrap();
    assert!(matches!(loaded.glyphs["uni0410"].outline, Outline::Composite(_)));
    assert_eq!(loaded.bounds("uni0410"), before);
}

#[test]
fn test_name_records_are_written_for_both_platforms() {
    let model = make_model();
    let loaded = FontModel::from_bytes(&model.compile().unwrap()).unwrap();
    assert!(loaded.names.contains(&NameEntry::windows(1, "Test Sans")));
    assert!(loaded.names.contains(&NameEntry::mac(1, "Test Sans")));
}

/// Re-assemble a font with `replace` tables swapped in and `drop` tables left out
fn reassemble(data: &[u8], replace: Vec<(Tag, Vec<u8>)>, drop: &[Tag]) -> Vec<u8> {
    let font = FontRef::new(data).unwrap();
    let mut builder = FontBuilder::new();
    for (tag, bytes) in replace {
        builder.add_raw(tag, bytes);
    }
    for record in font.table_directory.table_records() {
        let tag = record.tag();
        if drop.contains(&tag) || builder.contains(tag) {
            continue;
        }
        builder.add_raw(tag, font.table_data(tag).unwrap().as_bytes().to_vec());
    }
    builder.build()
}

/// GSUB with a single `vert` lookup wrapped in an extension subtable
fn extension_gsub(from: u16, to: u16) -> Gsub {
    let single = SingleSubst::format_2(
        CoverageTable::format_1(vec![GlyphId16::new(from)]),
        vec![GlyphId16::new(to)],
    );
    let lookup = SubstitutionLookup::Extension(Lookup::new(
        LookupFlag::empty(),
        vec![ExtensionSubtable::Single(ExtensionSubstFormat1::new(1, single))],
    ));
    let script = Script::new(Some(LangSys::new(vec![0])), vec![]);
    Gsub::new(
        ScriptList::new(vec![ScriptRecord::new(Tag::new(b"DFLT"), script)]),
        FeatureList::new(vec![FeatureRecord::new(Tag::new(b"vert"), Feature::new(None, vec![0]))]),
        SubstitutionLookupList::new(vec![lookup]),
    )
}

#[test]
fn test_extension_lookups_are_read() {
    let mut model = make_model();
    model.tables.remove(&TableTag::new(b"GSUB"));
    model.glyphs.insert(
        "A.vert".into(),
        Glyph::new(Outline::Simple(vec![rect(0.0, 0.0, 700.0, 580.0)]), 600.0),
    );
    let data = model.compile().unwrap();
    let gsub = dump_table(&extension_gsub(2, 8)).unwrap();
    let data = reassemble(&data, vec![(Tag::new(b"GSUB"), gsub)], &[]);

    let loaded = FontModel::from_bytes(&data).unwrap();
    let graph = loaded.substitutions().expect("GSUB should be read");
    assert_eq!(graph.rules, vec![Substitution::single(Tag::new(b"vert"), "A", "A.vert")]);
    assert!(loaded.reachable_glyphs().contains(&GlyphName::from("A.vert")));
}

#[test]
fn test_format_4_source_cmap() {
    let data = make_model().compile().unwrap();
    let mappings = [(' ', 1), ('A', 2), ('f', 5), ('i', 6), ('\u{C1}', 4)]
        .map(|(ch, gid)| (ch, GlyphId::new(gid)));
    let cmap = dump_table(&Cmap::from_mappings(mappings).unwrap()).unwrap();
    let data = reassemble(&data, vec![(Tag::new(b"cmap"), cmap)], &[]);

    let font = FontRef::new(&data).unwrap();
    let cmap = font.cmap().unwrap();
    assert!(cmap.encoding_records().iter().all(|record| matches!(
        record.subtable(cmap.offset_data()),
        Ok(CmapSubtable::Format4(_))
    )));

    let loaded = FontModel::from_bytes(&data).unwrap();
    assert_eq!(loaded.cmap.len(), 5);
    assert_eq!(loaded.cmap[&Codepoint::new(0x41)], "A");
    assert_eq!(loaded.cmap[&Codepoint::new(0xC1)], "Aacute");
    assert_eq!(loaded.cmap[&Codepoint::new(0x69)], "i");
}

/// A CFF table with the given Type 2 charstrings and no subroutines
fn cff_table(charstrings: &[&[u8]]) -> Vec<u8> {
    fn index(items: &[&[u8]]) -> Vec<u8> {
        let mut out = (items.len() as u16).to_be_bytes().to_vec();
        if items.is_empty() {
            return out;
        }
        out.push(1);
        let mut offset = 1;
        out.push(offset);
        for item in items {
            offset += item.len() as u8;
            out.push(offset);
        }
        for item in items {
            out.extend_from_slice(item);
        }
        out
    }
    fn int(v: usize) -> Vec<u8> {
        let mut out = vec![29];
        out.extend((v as i32).to_be_bytes());
        out
    }

    let header = [1u8, 0, 4, 1];
    let name = index(&[b"Test"]);
    let strings = index(&[]);
    let global_subrs = index(&[]);
    // nominalWidthX 0
    let private = [139u8, 21];
    // CharStrings and Private entries, all operands as 5-byte integers
    let top_dict_len = 6 + 11;
    let top_index_len = 2 + 1 + 2 + top_dict_len;

    let charstrings_offset =
        header.len() + name.len() + top_index_len + strings.len() + global_subrs.len();
    let charstrings = index(charstrings);
    let private_offset = charstrings_offset + charstrings.len();

    let mut top_dict = int(charstrings_offset);
    top_dict.push(17);
    top_dict.extend(int(private.len()));
    top_dict.extend(int(private_offset));
    top_dict.push(18);
    assert_eq!(top_dict.len(), top_dict_len);

    let mut cff = header.to_vec();
    cff.extend(name);
    cff.extend(index(&[&top_dict]));
    cff.extend(strings);
    cff.extend(global_subrs);
    cff.extend(charstrings);
    cff.extend(private);
    cff
}

#[test]
fn test_cff_outlines_become_quadratic() {
    let mut model = FontModel::default();
    model.glyphs.insert(
        "A".into(),
        Glyph::new(Outline::Simple(vec![rect(10.0, 0.0, 60.0, 100.0)]), 500.0),
    );
    model.cmap.insert(Codepoint::new(0x41), "A".into());
    model.keep_glyph_names = true;

    // 10 0 rmoveto, 0 100 rlineto, 50 0 0 -100 -50 0 rrcurveto, endchar
    let curve: &[u8] = &[149, 139, 21, 139, 239, 5, 189, 139, 139, 39, 89, 139, 8, 14];
    let cff = cff_table(&[&[14], curve]);
    let data = reassemble(
        &model.compile().unwrap(),
        vec![(Tag::new(b"CFF "), cff)],
        &[Tag::new(b"glyf"), Tag::new(b"loca")],
    );

    let loaded = FontModel::from_bytes(&data).unwrap();
    assert_eq!(loaded.glyphs[".notdef"].outline, Outline::Empty);
    assert_eq!(loaded.glyphs["A"].advance, 500.0);
    let Outline::Simple(contours) = &loaded.glyphs["A"].outline else {
        panic!("A should be a simple outline");
    };
    assert_eq!(contours.len(), 1);
    let contour = &contours[0];
    assert!(contour[0].on_curve);
    assert_eq!((contour[0].pos.x, contour[0].pos.y), (10.0, 0.0));
    // Reversed: the straight edge is now the closing segment
    let last = contour.last().unwrap();
    assert!(last.on_curve);
    assert_eq!((last.pos.x, last.pos.y), (10.0, 100.0));
    assert!(contour.iter().any(|p| !p.on_curve));
    let bounds = loaded.bounds("A").unwrap();
    // Between the curve's extreme at 47.5 and the cubic's control hull at 60
    assert!((46.5..=55.0).contains(&bounds.max_x()), "max x {}", bounds.max_x());
    assert!(bounds.min_y().abs() <= 1.0 && (bounds.max_y() - 100.0).abs() <= 1.0);

    let compiled = loaded.compile().unwrap();
    assert!(FontRef::new(&compiled).unwrap().glyf().is_ok());
    let reloaded = FontModel::from_bytes(&compiled).unwrap();
    assert_eq!(reloaded.glyphs["A"].advance, 500.0);
    let Outline::Simple(written) = &reloaded.glyphs["A"].outline else {
        panic!("A should stay simple in glyf");
    };
    let flags = |c: &Vec<OutlinePoint>| c.iter().map(|p| p.on_curve).collect::<Vec<_>>();
    assert_eq!(flags(&written[0]), flags(contour));
    let written_bounds = reloaded.bounds("A").unwrap();
    assert!((written_bounds.max_x() - bounds.max_x()).abs() <= 1.0);
}
