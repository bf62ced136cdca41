use std::path::PathBuf;

use wadoku_types::Category;
use wadoku_xml::{DumpFile, LoadMode, parse_entries};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("wadoku.xml")
}

#[test]
fn parses_entries_in_source_order() {
    let dump = DumpFile::open(fixture()).expect("load fixture");
    let entries = dump.entries().expect("parse fixture");
    let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1001, 1002, 1003]);
}

#[test]
fn parses_forms_and_readings() {
    let dump = DumpFile::open_with_mode(fixture(), LoadMode::Owned).expect("load fixture");
    let entries = dump.entries().expect("parse fixture");

    let genki = &entries[0];
    assert_eq!(genki.orthography.len(), 3);
    assert_eq!(genki.orthography[0].text, "△元気");
    assert!(genki.orthography[0].midashigo);
    assert!(!genki.orthography[1].midashigo);
    assert_eq!(genki.orthography[2].text, "ｹﾞﾝｷ");
    assert_eq!(genki.readings.len(), 1);
    assert_eq!(genki.readings[0].hiragana, "げんき");
    assert_eq!(genki.readings[0].hatsuon, "げんき");

    let kan = &entries[1];
    assert!(kan.orthography[0].midashigo);
    assert_eq!(kan.readings.len(), 2);
    assert_eq!(kan.readings[1].hiragana, "おとこ");
}

#[test]
fn collects_category_markers() {
    let entries = DumpFile::open(fixture()).unwrap().entries().unwrap();

    assert!(entries[0].markers.contains(Category::Meishi));
    assert_eq!(entries[0].markers.len(), 1);

    assert!(entries[1].markers.is_ambiguous());
    assert_eq!(entries[1].markers.resolve(), Category::Kanji);

    assert!(entries[2].markers.is_empty());
}

#[test]
fn captures_translation_fragments_verbatim() {
    let entries = DumpFile::open(fixture()).unwrap().entries().unwrap();

    let genki = &entries[0];
    assert_eq!(genki.senses.len(), 2);
    assert_eq!(
        genki.senses[0].translations,
        vec![
            r#"<token genus="f" type="N">Gesundheit</token>"#,
            r#"<token type="N">Munterkeit</token> <bracket><expl>körperlich</expl></bracket>"#,
        ]
    );

    let kan = &entries[1];
    assert_eq!(kan.senses.len(), 2);
    assert_eq!(kan.senses[0].translations, vec![String::new()]);
    assert!(kan.senses[1].translations.is_empty());

    assert_eq!(
        entries[2].senses[0].translations[0],
        "<iron>Ach</iron>! &amp; <transl>Oh</transl>!"
    );
}

#[test]
fn ignores_entries_below_the_top_level() {
    let xml = r#"<entries><group><entry id="5"/></group><entry id="6"/></entries>"#;
    let entries = parse_entries(xml).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, 6);
}

#[test]
fn skips_byte_order_mark() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bom.xml");
    std::fs::write(&path, "\u{feff}<entries><entry id=\"9\"/></entries>").unwrap();
    let entries = DumpFile::open(&path).unwrap().entries().unwrap();
    assert_eq!(entries[0].id, 9);
}

#[test]
fn reports_missing_file_and_malformed_xml() {
    let dir = tempfile::tempdir().unwrap();
    assert!(DumpFile::open(dir.path().join("missing.xml")).is_err());

    let path = dir.path().join("broken.xml");
    std::fs::write(&path, "<entries><entry id=\"1\"></form></entries>").unwrap();
    let dump = DumpFile::open(&path).expect("file is readable");
    let err = dump.entries().unwrap_err();
    assert!(format!("{err:#}").contains("broken.xml"));
}
