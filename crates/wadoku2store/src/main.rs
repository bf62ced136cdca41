use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wadoku_xml::LoadMode;

use wadoku2store::{DEFAULT_COLLECTION, Destination, WriteMode, export};

const DEFAULT_FILE: &str = "data/wadoku.xml";
const DEFAULT_DESTINATION: &str = "wadoku.sqlite";

#[derive(Parser, Debug)]
#[command(name = "wadoku2store", version)]
#[command(about = "Converts a wadoku XML dump into an indexed dictionary collection")]
struct Cli {
    /// Path to the wadoku XML dump.
    #[arg(long, env = "WADOKU_FILE", default_value = DEFAULT_FILE)]
    file: PathBuf,
    /// SQLite path (optionally `sqlite:<path>`), `jsonl:<path>`, a `.jsonl` file, or `-`.
    #[arg(long, env = "WADOKU_DESTINATION", default_value = DEFAULT_DESTINATION)]
    destination: String,
    /// Collection (table) name.
    #[arg(long, env = "WADOKU_COLLECTION", default_value = DEFAULT_COLLECTION)]
    collection: String,
    /// How to load the dump: `mmap` or `owned`.
    #[arg(long, env = "WADOKU_LOAD_MODE", default_value = "mmap", value_parser = parse_load_mode)]
    load_mode: LoadMode,
    /// Replace entries with an existing id instead of failing.
    #[arg(long)]
    upsert: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let destination = Destination::parse(&cli.destination);
    let mode = if cli.upsert {
        WriteMode::Upsert
    } else {
        WriteMode::Insert
    };
    info!("using wadoku dump at {}", cli.file.display());
    info!(
        "writing collection {} to {:?} ({:?})",
        cli.collection, destination, mode
    );

    let start = Instant::now();
    let mut writer = destination.open(&cli.collection, mode)?;
    let summary = export(&cli.file, cli.load_mode, &mut writer)?;
    info!(
        "exported {} entries ({} without category, {} with conflicting markers) in {} ms",
        summary.entries,
        summary.uncategorized,
        summary.ambiguous,
        start.elapsed().as_millis()
    );
    Ok(())
}

fn parse_load_mode(raw: &str) -> Result<LoadMode, String> {
    match raw.to_ascii_lowercase().as_str() {
        "mmap" => Ok(LoadMode::Mmap),
        "owned" => Ok(LoadMode::Owned),
        other => Err(format!("unknown load mode {other:?} (expected mmap or owned)")),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so `--destination -` keeps stdout clean.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_with_defaults() {
        let cli = Cli::parse_from(["wadoku2store"]);
        assert_eq!(cli.collection, DEFAULT_COLLECTION);
        assert_eq!(cli.load_mode, LoadMode::Mmap);
        assert!(!cli.upsert);

        let cli = Cli::parse_from([
            "wadoku2store",
            "--file",
            "dump.xml",
            "--destination",
            "-",
            "--load-mode",
            "OWNED",
            "--upsert",
        ]);
        assert_eq!(cli.file, PathBuf::from("dump.xml"));
        assert_eq!(cli.destination, "-");
        assert_eq!(cli.load_mode, LoadMode::Owned);
        assert!(cli.upsert);
    }

    #[test]
    fn rejects_unknown_load_mode() {
        assert!(Cli::try_parse_from(["wadoku2store", "--load-mode", "lazy"]).is_err());
    }
}
