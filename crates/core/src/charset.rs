//! Resolving Unicode range expressions and charset files into codepoint sets.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Write as _,
    fs::{create_dir_all, read_to_string, write},
    path::Path,
};

use anyhow::Context;
use log::debug;
use opfonts_font_ops::Codepoint;

use crate::{BuildError, Result};

/// Ordered set of Unicode scalar values
pub type CodepointSet = BTreeSet<Codepoint>;

/// Parse `U+XXXX-YYYY` or `U+XXXX` (case insensitive, whitespace tolerated)
pub fn parse_range(script: &str, expr: &str) -> Result<(u32, u32)> {
    let malformed =
        || BuildError::config(format!("malformed range '{expr}' in script '{script}'"));
    let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let (start, end) = match compact.split_once('-') {
        Some((start, end)) => (start, Some(end)),
        None => (compact.as_str(), None),
    };
    let parse = |token: &str| {
        let digits = token
            .strip_prefix("U+")
            .or_else(|| token.strip_prefix("u+"))
            .unwrap_or(token);
        if digits.is_empty() || digits.len() > 6 {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().filter(|cp| *cp <= Codepoint::MAX.to_u32())
    };
    let start = parse(start).ok_or_else(malformed)?;
    let end = match end {
        Some(end) => parse(end).ok_or_else(malformed)?,
        None => start,
    };
    if end < start {
        return Err(BuildError::InvalidRange { script: script.to_string(), expr: expr.to_string() });
    }
    Ok((start, end))
}

/// Union of all range expressions, surrogates skipped
pub fn resolve_ranges(script: &str, exprs: &[String]) -> Result<CodepointSet> {
    let mut set = CodepointSet::new();
    for expr in exprs {
        let (start, end) = parse_range(script, expr)?;
        set.extend((start..=end).map(Codepoint::new).filter(|cp| cp.is_scalar()));
    }
    Ok(set)
}

/// Parse charset file contents.
///
/// One entry per line: a single character, or a hex codepoint with an
/// optional `U+` prefix. Blank lines and `#` comments are skipped; any
/// other line contributes its first character.
pub fn parse_charset(contents: &str) -> CodepointSet {
    let mut set = CodepointSet::new();
    for line in contents.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let mut chars = line.chars();
        let (Some(first), rest) = (chars.next(), chars.as_str()) else {
            continue;
        };
        if rest.is_empty() {
            set.insert(Codepoint::from(first));
            continue;
        }
        let token = line.trim();
        let digits = token
            .strip_prefix("U+")
            .or_else(|| token.strip_prefix("u+"))
            .unwrap_or(token);
        let cp = u32::from_str_radix(digits, 16).map(Codepoint::new).unwrap_or(first.into());
        if cp.is_scalar() {
            set.insert(cp);
        }
    }
    set
}

/// Read a charset file; an empty or unreadable file is an error
pub fn load_charset_file(script: &str, path: &Path) -> Result<CodepointSet> {
    let contents = read_to_string(path).map_err(|e| {
        BuildError::config(format!(
            "charset file '{}' of script '{script}': {e}",
            path.display()
        ))
    })?;
    let set = parse_charset(&contents);
    if set.is_empty() {
        return Err(BuildError::config(format!(
            "charset file '{}' of script '{script}' is empty",
            path.display()
        )));
    }
    debug!("Loaded {} codepoints from {}", set.len(), path.display());
    Ok(set)
}

/// Write codepoints as one hex value per line, the header as `#` comments
pub fn save_charset_file(
    path: &Path,
    codepoints: &CodepointSet,
    header: &str,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let mut contents = String::new();
    if !header.is_empty() {
        for line in header.lines() {
            let _ = writeln!(contents, "# {line}");
        }
        contents.push('\n');
    }
    for cp in codepoints {
        let _ = writeln!(contents, "{:04X}", cp.to_u32());
    }
    write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Unihan fields selecting the common ideographs of each locale
pub const UNIHAN_FIELDS: [(&str, &str); 3] = [
    ("kGB0", "SC (GB 2312)"),
    ("kBigFive", "TC (Big5 Level 1)"),
    ("kJis0", "JP (JIS X 0208)"),
];

/// Big5 level 1 (frequently used characters)
const BIG5_LEVEL_1: std::ops::RangeInclusive<u32> = 0xA440..=0xC67E;

/// Codepoints per Unihan field from `Unihan_OtherMappings.txt`
pub fn parse_unihan_mappings(data: &str) -> BTreeMap<&'static str, CodepointSet> {
    let mut result: BTreeMap<&'static str, CodepointSet> =
        UNIHAN_FIELDS.iter().map(|(field, _)| (*field, CodepointSet::new())).collect();

    for line in data.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split('\t');
        let (Some(cp), Some(field), Some(value)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let Some((field, set)) = result.iter_mut().find(|(f, _)| **f == field) else {
            continue;
        };
        let Some(cp) = cp.strip_prefix("U+").and_then(|hex| u32::from_str_radix(hex, 16).ok())
        else {
            continue;
        };
        if *field == "kBigFive" {
            let code = value.trim().get(..4).and_then(|hex| u32::from_str_radix(hex, 16).ok());
            if !code.is_some_and(|code| BIG5_LEVEL_1.contains(&code)) {
                continue;
            }
        }
        set.insert(Codepoint::new(cp));
    }
    result
}

/// Non-ASCII codepoints used by the `msgid` strings of a gettext template
pub fn extract_pot_codepoints(text: &str) -> CodepointSet {
    let mut set = CodepointSet::new();
    let mut in_msgid = false;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("msgid ") {
            in_msgid = true;
            extract_quoted(rest, &mut set);
        } else if line.starts_with("msgstr ") {
            in_msgid = false;
        } else if in_msgid && line.starts_with('"') {
            extract_quoted(line, &mut set);
        }
    }
    set.retain(|cp| cp.to_u32() > 0x7F);
    set
}

fn extract_quoted(s: &str, out: &mut CodepointSet) {
    let Some(inner) = s.trim().strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return;
    };
    let unescaped = inner.replace("\\\"", "\"").replace("\\n", "\n").replace("\\t", "\t");
    out.extend(unescaped.chars().map(Codepoint::from));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cps(values: &[u32]) -> CodepointSet {
        values.iter().copied().map(Codepoint::new).collect()
    }

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(parse_range("latin", "U+0020-007E").unwrap(), (0x20, 0x7E));
        assert_eq!(parse_range("latin", "u+3040 - u+309f").unwrap(), (0x3040, 0x309F));
        assert_eq!(parse_range("latin", " U+4E00 ").unwrap(), (0x4E00, 0x4E00));
    }

    #[test]
    fn test_parse_range_errors() {
        assert!(matches!(
            parse_range("kana", "U+30FF-3040"),
            Err(BuildError::InvalidRange { script, .. }) if script == "kana"
        ));
        for expr in ["", "U+", "U+XYZ", "U+0041-", "U+110000"] {
            assert!(
                matches!(parse_range("kana", expr), Err(BuildError::Config(_))),
                "{expr:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_resolve_ranges_skips_surrogates() {
        let set = resolve_ranges("x", &["U+D7FF-E000".to_string()]).unwrap();
        assert_eq!(set, cps(&[0xD7FF, 0xE000]));
    }

    #[test]
    fn test_parse_charset_formats() {
        let set = parse_charset("# common\n中\n\n4E00\nU+6587\n文字\n");
        assert_eq!(set, cps(&[0x4E00, 0x6587, 0x4E2D]));
    }

    #[test]
    fn test_parse_charset_duplicate_lines_collapse() {
        assert_eq!(parse_charset("中\n中\n").len(), 1);
    }

    #[test]
    fn test_parse_charset_hex_surrogate_skipped() {
        assert_eq!(parse_charset("D800\n"), CodepointSet::new());
    }

    #[test]
    fn test_load_empty_charset_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        write(&path, "# nothing\n").unwrap();
        assert!(matches!(load_charset_file("cjk", &path), Err(BuildError::Config(_))));
        assert!(matches!(
            load_charset_file("cjk", &dir.path().join("missing.txt")),
            Err(BuildError::Config(_))
        ));
    }

    #[test]
    fn test_save_then_load_charset_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/cjk.txt");
        let set = cps(&[0x4E00, 0x20000]);
        save_charset_file(&path, &set, "Unified CJK\nGenerated").unwrap();

        let contents = read_to_string(&path).unwrap();
        assert!(contents.starts_with("# Unified CJK\n# Generated\n\n4E00\n"));
        assert_eq!(load_charset_file("cjk", &path).unwrap(), set);
    }

    #[test]
    fn test_parse_unihan_mappings() {
        let data = "# header\n\
            U+4E00\tkGB0\t5027\n\
            U+4E01\tkBigFive\tA442\n\
            U+4E02\tkBigFive\tC940\n\
            U+4E03\tkJis0\t2823\n\
            U+4E04\tkOther\t1234\n";
        let fields = parse_unihan_mappings(data);
        assert_eq!(fields["kGB0"], cps(&[0x4E00]));
        assert_eq!(fields["kBigFive"], cps(&[0x4E01]));
        assert_eq!(fields["kJis0"], cps(&[0x4E03]));
    }

    #[test]
    fn test_extract_pot_codepoints() {
        let pot = "msgid \"\"\nmsgstr \"\"\n\n\
            msgid \"Café \\\"ok\\\"\"\n\
            \"naïve\"\n\
            msgstr \"ignored ü\"\n";
        assert_eq!(extract_pot_codepoints(pot), cps(&[0xE9, 0xEF]));
    }
}
