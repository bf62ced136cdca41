use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use wadoku_xml::{DumpFile, LoadMode};

fn dump_path() -> Option<PathBuf> {
    env::var("WADOKU_FILE").ok().map(PathBuf::from)
}

#[test]
fn loads_full_wadoku_dump() {
    let Some(path) = dump_path() else {
        eprintln!("skipping: WADOKU_FILE not set");
        return;
    };
    let dump = DumpFile::open_with_mode(&path, LoadMode::Mmap).expect("open wadoku dump");
    let entries = dump.entries().expect("parse wadoku dump");

    assert!(entries.len() > 10_000, "dump too small");
    let ids: HashSet<i64> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), entries.len(), "entry ids are not unique");
    assert!(entries.iter().any(|e| !e.markers.is_empty()));
}
