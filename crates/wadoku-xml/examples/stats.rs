use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use wadoku_xml::{DumpFile, LoadMode};

fn main() -> Result<()> {
    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: cargo run -p wadoku-xml --example stats -- <path-to-wadoku.xml>")?;

    let dump = DumpFile::open_with_mode(&path, LoadMode::Mmap)
        .with_context(|| format!("loading dump from {}", path.display()))?;
    let entries = dump.entries()?;

    let mut orth_count = 0usize;
    let mut midashigo_count = 0usize;
    let mut reading_count = 0usize;
    let mut sense_count = 0usize;
    let mut fragment_count = 0usize;
    let mut ambiguous = 0usize;
    let mut categories: BTreeMap<&'static str, usize> = BTreeMap::new();

    for entry in &entries {
        orth_count += entry.orthography.len();
        midashigo_count += entry.orthography.iter().filter(|o| o.midashigo).count();
        reading_count += entry.readings.len();
        sense_count += entry.senses.len();
        fragment_count += entry.senses.iter().map(|s| s.translations.len()).sum::<usize>();
        if entry.markers.is_ambiguous() {
            ambiguous += 1;
        }
        *categories.entry(entry.markers.resolve().tag()).or_default() += 1;
    }

    println!("Dump: {} ({} bytes)", path.display(), dump.len());
    println!("Entries      : {}", entries.len());
    println!("Orthographies: {} ({} midashigo)", orth_count, midashigo_count);
    println!("Readings     : {}", reading_count);
    println!("Senses       : {}", sense_count);
    println!("Translations : {}", fragment_count);
    println!("Ambiguous gramGrp: {}", ambiguous);
    for (name, count) in categories {
        println!("  {name:<18} {count}");
    }

    Ok(())
}
