use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};
use wadoku_types::{Category, ParsedEntry};
use wadoku_xml::{DumpFile, LoadMode};

use crate::reshape::reshape;
use crate::store::{CollectionWriter, StoreError};

/// Every failure aborts the run; entries already written stay written.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("can't read wadoku XML file {}: {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("can't parse wadoku XML: {0}")]
    Parse(String),
    #[error("can't save entry {id}: {cause}")]
    Write {
        id: i64,
        #[source]
        cause: StoreError,
    },
    #[error("can't create indexes: {0}")]
    Index(#[source] StoreError),
}

/// Counters reported after a successful run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExportSummary {
    pub entries: usize,
    pub uncategorized: usize,
    pub ambiguous: usize,
}

/// Load, parse, reshape and persist a whole dump, then ensure indexes.
pub fn export<W>(
    file: &Path,
    mode: LoadMode,
    writer: &mut W,
) -> Result<ExportSummary, ExportError>
where
    W: CollectionWriter + ?Sized,
{
    let start = Instant::now();
    let dump = DumpFile::open_with_mode(file, mode).map_err(|err| ExportError::Read {
        path: file.to_path_buf(),
        message: format!("{err:#}"),
    })?;
    info!(
        "read {} bytes from {} in {} ms",
        dump.len(),
        file.display(),
        start.elapsed().as_millis()
    );

    let parse_start = Instant::now();
    let entries = dump
        .entries()
        .map_err(|err| ExportError::Parse(format!("{err:#}")))?;
    info!(
        "parsed {} entries in {} ms",
        entries.len(),
        parse_start.elapsed().as_millis()
    );

    write_entries(&entries, writer)
}

/// Reshape and insert entries in order, stopping at the first failed write.
pub fn write_entries<W>(
    entries: &[ParsedEntry],
    writer: &mut W,
) -> Result<ExportSummary, ExportError>
where
    W: CollectionWriter + ?Sized,
{
    let start = Instant::now();
    let mut summary = ExportSummary::default();

    for parsed in entries {
        let entry = reshape(parsed);
        if parsed.markers.is_ambiguous() {
            summary.ambiguous += 1;
            warn!(
                "entry {} has {} category markers, using {}",
                entry.id,
                parsed.markers.len(),
                entry.category
            );
        }
        if entry.category == Category::Undefined {
            summary.uncategorized += 1;
        }
        writer.insert(&entry).map_err(|cause| ExportError::Write {
            id: entry.id,
            cause,
        })?;
        summary.entries += 1;
    }
    info!(
        "stored {} entries in {} ms",
        summary.entries,
        start.elapsed().as_millis()
    );

    writer.ensure_indexes().map_err(ExportError::Index)?;
    Ok(summary)
}
