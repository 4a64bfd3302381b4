use std::{
    fs::{create_dir_all, read, write},
    io::{Cursor, Read},
    path::Path,
};

use anyhow::{Context, Result};
use opfonts_core::{
    CodepointSet,
    charset::{UNIHAN_FIELDS, extract_pot_codepoints, parse_unihan_mappings, save_charset_file},
};
use zip::ZipArchive;

use crate::fetch::Fetcher;

const UNIHAN_URL: &str = "https://www.unicode.org/Public/UCD/latest/ucd/Unihan.zip";
const UNIHAN_ARCHIVE: &str = "Unihan.zip";
const UNIHAN_MAPPINGS: &str = "Unihan_OtherMappings.txt";
const CJK_CHARSET: &str = "cjk_unified.txt";

fn unihan_archive(cache_dir: &Path) -> Result<Vec<u8>> {
    let path = cache_dir.join(UNIHAN_ARCHIVE);
    if path.exists() {
        return read(&path).with_context(|| format!("Failed to read {}", path.display()));
    }
    let bytes = Fetcher::new()?.fetch(UNIHAN_URL)?;
    create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create directory: {}", cache_dir.display()))?;
    write(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(bytes)
}

fn read_mappings(archive: Vec<u8>) -> Result<String> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).context("Unihan archive is not a zip")?;
    let mut file = zip
        .by_name(UNIHAN_MAPPINGS)
        .with_context(|| format!("{UNIHAN_MAPPINGS} not found in archive"))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Union of the SC, TC and JP common ideograph sets as one charset file
pub fn generate_charsets(output_dir: &Path, cache_dir: &Path) -> Result<()> {
    println!("Reading {UNIHAN_MAPPINGS}");
    let mappings = read_mappings(unihan_archive(cache_dir)?)?;
    let per_field = parse_unihan_mappings(&mappings);

    let mut union = CodepointSet::new();
    let mut header = String::from("CJK unified ideographs from the Unihan database");
    for (field, label) in UNIHAN_FIELDS {
        let set = per_field.get(field).cloned().unwrap_or_default();
        println!("  {label}: {} characters", set.len());
        header.push_str(&format!("\n{label}: {}", set.len()));
        union.extend(set);
    }
    header.push_str(&format!("\nTotal: {}", union.len()));

    let output = output_dir.join(CJK_CHARSET);
    save_charset_file(&output, &union, &header)?;
    println!("Wrote {} characters to {}", union.len(), output.display());
    Ok(())
}

pub fn extract_charset(source: &str, output: Option<&Path>) -> Result<()> {
    let text = Fetcher::new()?.read_text(source)?;
    let codepoints = extract_pot_codepoints(&text);

    match output {
        Some(path) => {
            save_charset_file(path, &codepoints, &format!("Characters used by {source}"))?;
            println!("Wrote {} characters to {}", codepoints.len(), path.display());
        }
        None => {
            let chars: String = codepoints.iter().filter_map(|cp| char::from_u32(cp.to_u32())).collect();
            println!("{chars}");
        }
    }
    Ok(())
}
