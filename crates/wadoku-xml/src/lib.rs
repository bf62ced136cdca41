//! Load the Wadoku XML dump and parse it into [`ParsedEntry`] records.
//!
//! The dump is read in one piece, either memory-mapped or copied into an
//! owned buffer ([`LoadMode`]), and then walked with a streaming XML reader.
//! Only the parts of the schema the converter needs are kept:
//!
//! - `entry/@id`
//! - `entry/form/orth` (character data and the `midashigo` attribute)
//! - `entry/form/reading/{hira,hatsuon}`
//! - `entry/gramGrp/*` marker elements
//! - `entry/sense/trans/tr`, whose inner markup is captured verbatim
//!
//! Everything else is skipped. Reading and parsing are separate steps so that
//! callers can tell an unreadable file from a malformed one.
//!
//! # Example
//! ```no_run
//! use wadoku_xml::{DumpFile, LoadMode};
//!
//! # fn main() -> anyhow::Result<()> {
//! let dump = DumpFile::open_with_mode("data/wadoku.xml", LoadMode::Mmap)?;
//! for entry in dump.entries()? {
//!     println!("{}: {} senses", entry.id, entry.senses.len());
//! }
//! # Ok(()) }
//! ```
//!
//! For a runnable demo, see `cargo run -p wadoku-xml --example stats -- <dump>`.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memmap2::Mmap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;
use wadoku_types::{Category, Orthography, ParsedEntry, ReadingRecord, Sense};

const UTF8_BOM: &str = "\u{feff}";

/// Strategy for loading the dump file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map the dump (fast, zero-copy).
    Mmap,
    /// Read the dump into an owned buffer (portable fallback).
    Owned,
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

/// A dump file held in memory, ready to be parsed.
pub struct DumpFile {
    path: PathBuf,
    buffer: Buffer,
}

impl DumpFile {
    /// Open a dump, memory-mapping it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_mode(path, LoadMode::Mmap)
    }

    /// Open a dump choosing between mmap and an owned buffer at runtime.
    pub fn open_with_mode(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let buffer = load_file(&path, mode)?;
        debug!(
            "read {} bytes from {} ({:?})",
            buffer.as_slice().len(),
            path.display(),
            mode
        );
        Ok(Self { path, buffer })
    }

    /// Size of the dump in bytes.
    pub fn len(&self) -> usize {
        self.buffer.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The dump as text, without a leading byte order mark.
    pub fn text(&self) -> Result<&str> {
        let text = std::str::from_utf8(self.buffer.as_slice())
            .with_context(|| format!("{} is not valid UTF-8", self.path.display()))?;
        Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text))
    }

    /// Parse every `<entry>` in source order.
    pub fn entries(&self) -> Result<Vec<ParsedEntry>> {
        parse_entries(self.text()?).with_context(|| format!("parse {}", self.path.display()))
    }
}

fn load_file(path: &Path, mode: LoadMode) -> Result<Buffer> {
    match mode {
        LoadMode::Mmap => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .with_context(|| format!("mmap {}", path.display()))
        }
        LoadMode::Owned => {
            let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            Ok(Buffer::Owned(buf))
        }
    }
}

/// Element kinds the parser cares about, tracked on a stack.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Node {
    Root,
    Entry,
    Form,
    Orth,
    Reading,
    Hira,
    Hatsuon,
    GramGrp,
    Sense,
    Trans,
    Tr,
    Other,
}

fn classify(parent: Option<Node>, name: &[u8]) -> Node {
    match (parent, name) {
        (None, _) => Node::Root,
        (Some(Node::Root), b"entry") => Node::Entry,
        (Some(Node::Entry), b"form") => Node::Form,
        (Some(Node::Entry), b"gramGrp") => Node::GramGrp,
        (Some(Node::Entry), b"sense") => Node::Sense,
        (Some(Node::Form), b"orth") => Node::Orth,
        (Some(Node::Form), b"reading") => Node::Reading,
        (Some(Node::Reading), b"hira") => Node::Hira,
        (Some(Node::Reading), b"hatsuon") => Node::Hatsuon,
        (Some(Node::Sense), b"trans") => Node::Trans,
        (Some(Node::Trans), b"tr") => Node::Tr,
        _ => Node::Other,
    }
}

#[derive(Default)]
struct EntryBuilder {
    entries: Vec<ParsedEntry>,
    entry: Option<ParsedEntry>,
    orth: Option<Orthography>,
    reading: Option<ReadingRecord>,
    sense: Option<Sense>,
}

impl EntryBuilder {
    fn open(&mut self, node: Node, parent: Option<Node>, start: &BytesStart<'_>) -> Result<()> {
        match node {
            Node::Entry => {
                let id = match attribute(start, "id")? {
                    Some(raw) => {
                        parse_id(&raw).with_context(|| format!("invalid entry id {raw:?}"))?
                    }
                    None => 0,
                };
                self.entry = Some(ParsedEntry {
                    id,
                    ..ParsedEntry::default()
                });
            }
            Node::Orth => {
                let midashigo = match attribute(start, "midashigo")? {
                    Some(raw) => parse_bool(&raw)
                        .with_context(|| format!("invalid midashigo attribute {raw:?}"))?,
                    None => false,
                };
                self.orth = Some(Orthography {
                    text: String::new(),
                    midashigo,
                });
            }
            Node::Reading => self.reading = Some(ReadingRecord::default()),
            Node::Hira => {
                if let Some(reading) = self.reading.as_mut() {
                    reading.hiragana.clear();
                }
            }
            Node::Hatsuon => {
                if let Some(reading) = self.reading.as_mut() {
                    reading.hatsuon.clear();
                }
            }
            Node::Sense => self.sense = Some(Sense::default()),
            Node::Other if parent == Some(Node::GramGrp) => {
                let local = start.local_name();
                let tag = std::str::from_utf8(local.as_ref()).unwrap_or_default();
                match (Category::from_tag(tag), self.entry.as_mut()) {
                    (Some(category), Some(entry)) => entry.markers.insert(category),
                    (None, Some(entry)) => {
                        debug!("entry {}: ignoring gramGrp child <{tag}>", entry.id)
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, node: Node) {
        match node {
            Node::Entry => {
                if let Some(entry) = self.entry.take() {
                    self.entries.push(entry);
                }
            }
            Node::Orth => {
                if let (Some(orth), Some(entry)) = (self.orth.take(), self.entry.as_mut()) {
                    entry.orthography.push(orth);
                }
            }
            Node::Reading => {
                if let (Some(reading), Some(entry)) = (self.reading.take(), self.entry.as_mut()) {
                    entry.readings.push(reading);
                }
            }
            Node::Sense => {
                if let (Some(sense), Some(entry)) = (self.sense.take(), self.entry.as_mut()) {
                    entry.senses.push(sense);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, node: Option<Node>, text: &str) {
        match node {
            Some(Node::Orth) => {
                if let Some(orth) = self.orth.as_mut() {
                    orth.text.push_str(text);
                }
            }
            Some(Node::Hira) => {
                if let Some(reading) = self.reading.as_mut() {
                    reading.hiragana.push_str(text);
                }
            }
            Some(Node::Hatsuon) => {
                if let Some(reading) = self.reading.as_mut() {
                    reading.hatsuon.push_str(text);
                }
            }
            _ => {}
        }
    }

    fn translation(&mut self, raw: String) {
        if let Some(sense) = self.sense.as_mut() {
            sense.translations.push(raw);
        }
    }
}

/// Parse a complete dump document into entries, in source order.
///
/// `<entry>` elements are only recognised as direct children of the root.
/// The inner markup of each `<tr>` is kept verbatim for later stripping.
pub fn parse_entries(xml: &str) -> Result<Vec<ParsedEntry>> {
    let mut reader = Reader::from_str(xml);
    let mut builder = EntryBuilder::default();
    let mut stack: Vec<Node> = Vec::new();
    let mut saw_root = false;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .with_context(|| format!("malformed XML near byte {position}"))?;
        match event {
            Event::Start(start) => {
                let parent = stack.last().copied();
                let node = classify(parent, start.local_name().as_ref());
                saw_root = true;
                if node == Node::Tr {
                    let raw = reader
                        .read_text(start.name())
                        .with_context(|| format!("unterminated <tr> near byte {position}"))?;
                    builder.translation(raw.into_owned());
                    continue;
                }
                builder
                    .open(node, parent, &start)
                    .with_context(|| format!("near byte {position}"))?;
                stack.push(node);
            }
            Event::Empty(start) => {
                let parent = stack.last().copied();
                let node = classify(parent, start.local_name().as_ref());
                saw_root = true;
                if node == Node::Tr {
                    builder.translation(String::new());
                    continue;
                }
                builder
                    .open(node, parent, &start)
                    .with_context(|| format!("near byte {position}"))?;
                builder.close(node);
            }
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    builder.close(node);
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .with_context(|| format!("bad character data near byte {position}"))?;
                builder.text(stack.last().copied(), &text);
            }
            Event::CData(data) => {
                let text = std::str::from_utf8(&data)
                    .with_context(|| format!("bad CDATA near byte {position}"))?;
                builder.text(stack.last().copied(), text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        anyhow::bail!("document has no root element");
    }
    if let Some(open) = stack.last() {
        anyhow::bail!(
            "unexpected end of document inside {:?} ({} elements open)",
            open,
            stack.len()
        );
    }

    debug!("parsed {} entries", builder.entries.len());
    Ok(builder.entries)
}

fn attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match start.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Surrounding whitespace is ignored; an empty value means 0.
fn parse_id(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    Ok(raw.parse::<i64>()?)
}

/// Boolean literals accepted for `midashigo`; an empty value means false.
fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim() {
        "" => Ok(false),
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => anyhow::bail!("expected a boolean"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boolean_literals() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("False").unwrap());
        assert!(parse_bool("yes").is_err());
    }

    #[test]
    fn attribute_values_are_trimmed_and_may_be_empty() {
        assert!(parse_bool(" true ").unwrap());
        assert!(!parse_bool("").unwrap());
        assert!(!parse_bool("  ").unwrap());
        assert_eq!(parse_id(" 42 ").unwrap(), 42);
        assert_eq!(parse_id("").unwrap(), 0);
        assert!(parse_id("4 2").is_err());
    }

    #[test]
    fn lenient_attributes_do_not_abort_the_parse() {
        let xml = r#"<entries><entry id=""><form><orth midashigo=" true ">△元気</orth><orth midashigo="">元気</orth></form></entry><entry id=" 7 "/></entries>"#;
        let entries = parse_entries(xml).unwrap();
        assert_eq!(entries[0].id, 0);
        assert!(entries[0].orthography[0].midashigo);
        assert!(!entries[0].orthography[1].midashigo);
        assert_eq!(entries[1].id, 7);
    }

    #[test]
    fn classifies_only_schema_paths() {
        assert_eq!(classify(None, b"entries"), Node::Root);
        assert_eq!(classify(Some(Node::Root), b"entry"), Node::Entry);
        assert_eq!(classify(Some(Node::Entry), b"entry"), Node::Other);
        assert_eq!(classify(Some(Node::Trans), b"tr"), Node::Tr);
        assert_eq!(classify(Some(Node::Sense), b"tr"), Node::Other);
    }

    #[test]
    fn keeps_raw_translation_markup() {
        let xml = r#"<entries><entry id="7"><sense><trans><tr>a <emph>b</emph> &amp; c</tr></trans></sense></entry></entries>"#;
        let entries = parse_entries(xml).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].senses[0].translations, vec!["a <emph>b</emph> &amp; c"]);
    }

    #[test]
    fn orth_keeps_direct_text_only() {
        let xml = r#"<entries><entry id="1"><form><orth>元<x>skip</x>気</orth></form></entry></entries>"#;
        let entries = parse_entries(xml).unwrap();
        assert_eq!(entries[0].orthography[0].text, "元気");
    }

    #[test]
    fn missing_id_defaults_to_zero() {
        let entries = parse_entries("<entries><entry/></entries>").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 0);
    }

    #[test]
    fn rejects_bad_id_and_unclosed_document() {
        assert!(parse_entries(r#"<entries><entry id="x"/></entries>"#).is_err());
        assert!(parse_entries("<entries><entry id=\"1\">").is_err());
        assert!(parse_entries("").is_err());
    }
}
