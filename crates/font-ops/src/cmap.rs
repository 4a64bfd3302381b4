//! cmap format 12 encoding
//!
//! Source cmaps are read through skrifa's charmap, which picks the best
//! Unicode subtable.

use write_fonts::tables::cmap::{
    Cmap, Cmap12, CmapSubtable, EncodingRecord, PlatformId, SequentialMapGroup,
};

/// Build a cmap table using only format 12 subtables.
///
/// Format 4 overflows with the large character sets of CJK fonts, so a single
/// format 12 subtable is shared by the Unicode and Windows encoding records.
/// `mappings` must be sorted by codepoint.
pub fn build_cmap_format12(mappings: &[(u32, u32)]) -> Cmap {
    let cmap12 = Cmap12 { language: 0, groups: build_sequential_groups(mappings) };

    Cmap::new(vec![
        EncodingRecord::new(PlatformId::Unicode, 4, CmapSubtable::Format12(cmap12.clone())),
        EncodingRecord::new(PlatformId::Windows, 10, CmapSubtable::Format12(cmap12)),
    ])
}

/// Groups consecutive codepoints that map to consecutive glyph IDs.
fn build_sequential_groups(mappings: &[(u32, u32)]) -> Vec<SequentialMapGroup> {
    let Some(&(first_cp, first_gid)) = mappings.first() else {
        return Vec::new();
    };

    let mut groups = Vec::new();
    let (mut start_cp, mut start_gid) = (first_cp, first_gid);
    let (mut prev_cp, mut prev_gid) = (first_cp, first_gid);

    for &(cp, gid) in &mappings[1..] {
        if cp == prev_cp + 1 && gid == prev_gid + 1 {
            prev_cp = cp;
            prev_gid = gid;
        } else {
            groups.push(SequentialMapGroup::new(start_cp, prev_cp, start_gid));
            (start_cp, start_gid) = (cp, gid);
            (prev_cp, prev_gid) = (cp, gid);
        }
    }

    groups.push(SequentialMapGroup::new(start_cp, prev_cp, start_gid));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_groups() {
        let mappings = [(0x41, 1), (0x42, 2), (0x43, 3), (0x4E00, 4), (0x4E01, 9)];
        let groups = build_sequential_groups(&mappings);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0], SequentialMapGroup::new(0x41, 0x43, 1));
        assert_eq!(groups[1], SequentialMapGroup::new(0x4E00, 0x4E00, 4));
        assert_eq!(groups[2], SequentialMapGroup::new(0x4E01, 0x4E01, 9));
    }

    #[test]
    fn test_empty_groups() {
        assert!(build_sequential_groups(&[]).is_empty());
    }
}
