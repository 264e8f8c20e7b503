use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bookdex_core::BookRecord;
use shelf_ingest::{backfill_records, to_rows, IngestConfig, Ingestor, RunReport, SkipNote};

const TICK_MS: u64 = 80;

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(":: {spinner} {msg:<24} ━{bar:30}━ {pos}/{len}")
        .unwrap()
        .tick_chars("▏▎▍▌▋▊▉█▉▋▌▍▎")
        .progress_chars("━━░")
}

#[derive(Parser)]
#[command(name = "shelf-ingest")]
#[command(version)]
#[command(about = "Discover book folders and extract catalog metadata")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a library root and build canonical records
    Scan {
        #[arg(help = "Library root to walk")]
        root: PathBuf,
        #[arg(short, long, help = "Write records as JSON to this file")]
        output: Option<PathBuf>,
        #[arg(long, help = "Stop after this many item folders")]
        cap: Option<usize>,
        #[arg(short, long, help = "Config file (JSON)")]
        config: Option<PathBuf>,
    },
    /// Resolve a single item folder and print the record
    Inspect {
        #[arg(help = "Item folder")]
        folder: PathBuf,
    },
    /// Reduce a records file to flat spreadsheet rows
    Sheet {
        #[arg(help = "Records JSON written by scan")]
        input: PathBuf,
        #[arg(short, long, help = "Write rows as JSON to this file")]
        output: Option<PathBuf>,
    },
    /// Rebuild missing page sequences from legacy screenshot names
    Backfill {
        #[arg(help = "Records JSON written by scan")]
        input: PathBuf,
        #[arg(long, help = "Write changes back to the input file")]
        write: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            root,
            output,
            cap,
            config,
        } => cmd_scan(&root, output.as_deref(), cap, config.as_deref()),
        Commands::Inspect { folder } => cmd_inspect(&folder),
        Commands::Sheet { input, output } => cmd_sheet(&input, output.as_deref()),
        Commands::Backfill { input, write } => cmd_backfill(&input, write),
    }
}

fn cmd_scan(
    root: &Path,
    output: Option<&Path>,
    cap: Option<usize>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => IngestConfig::load(path)?,
        None => IngestConfig::default(),
    };
    if let Some(cap) = cap {
        config.folder_cap = cap;
    }

    let ingestor = Ingestor::new(config, bookdex_core::builtin_registry());
    let discovery = ingestor.discover(root)?;

    let pb = ProgressBar::new(discovery.items.len() as u64);
    pb.set_style(bar_style());
    pb.enable_steady_tick(Duration::from_millis(TICK_MS));

    let mut report = RunReport {
        skipped: discovery.skipped,
        truncated: discovery.truncated,
        ..Default::default()
    };

    for item in &discovery.items {
        pb.set_message(
            item.path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        );
        match ingestor.process_item(item, &mut report.skipped) {
            Ok(record) => report.records.push(record),
            Err(e) => report.skipped.push(SkipNote {
                path: item.path.clone(),
                reason: e.to_string(),
            }),
        }
        pb.inc(1);
    }

    pb.finish_and_clear();

    println!("Found {} records.", report.records.len());
    if report.truncated {
        println!("Stopped at the folder cap; more folders remain.");
    }
    if !report.skipped.is_empty() {
        println!("\nSkipped {}:", report.skipped.len());
        for skip in &report.skipped {
            println!("  [!] {}: {}", skip.path.display(), skip.reason);
        }
    }

    print_media_summary(&report.records);

    if let Some(output) = output {
        let json = serde_json::to_string_pretty(&report.records)?;
        std::fs::write(output, json)?;
        println!("\nWrote {} records to {}", report.records.len(), output.display());
    }

    Ok(())
}

fn print_media_summary(records: &[BookRecord]) {
    let mut by_media: std::collections::BTreeMap<&str, usize> = Default::default();
    for record in records {
        *by_media.entry(record.media_type.as_str()).or_default() += 1;
    }

    if !by_media.is_empty() {
        println!("\nBy media type:");
        for (media, count) in by_media {
            println!("  {}: {}", media, count);
        }
    }
}

fn cmd_inspect(folder: &Path) -> Result<()> {
    let ingestor = Ingestor::with_defaults();
    let (record, diagnostics) = ingestor.process_folder(folder)?;

    println!("Folder: {}", folder.display());
    println!("Title: {}", record.title);
    println!("Author: {}", record.author);
    println!("Genre: {}", record.genre);
    println!("Media: {}", record.media_type);
    println!("Reading level: {}", record.reading_level);
    if let Some(cover) = &record.cover_image {
        println!("Cover: {}", cover);
    }
    if !record.description.is_empty() {
        println!("Description: {}", record.description);
    }
    if !record.provenance.page_sequence.is_empty() {
        println!(
            "Pages: {} ({} content)",
            record.provenance.page_sequence.len(),
            record.provenance.total_pages
        );
    }
    if !record.extras.is_empty() {
        println!("\nExtras:");
        for (key, value) in &record.extras {
            println!("  {}: {}", key, value);
        }
    }
    println!("\nField sources:");
    for (field, source) in &record.provenance.sources {
        println!("  {}: {}", field, source);
    }
    if !diagnostics.is_empty() {
        println!("\nDiagnostics:");
        for note in &diagnostics {
            println!("  [!] {}: {}", note.path.display(), note.reason);
        }
    }

    Ok(())
}

fn cmd_sheet(input: &Path, output: Option<&Path>) -> Result<()> {
    let records: Vec<BookRecord> = serde_json::from_str(&std::fs::read_to_string(input)?)?;
    let rows = to_rows(&records);

    let json = serde_json::to_string_pretty(&rows)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Wrote {} rows to {}", rows.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn cmd_backfill(input: &Path, write: bool) -> Result<()> {
    let mut records: Vec<BookRecord> = serde_json::from_str(&std::fs::read_to_string(input)?)?;
    let fixed = backfill_records(&mut records);

    println!("Backfilled {} of {} records.", fixed, records.len());

    if write && fixed > 0 {
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(input, json)?;
        println!("Updated {}", input.display());
    } else if fixed > 0 {
        println!("Re-run with --write to save the changes.");
    }

    Ok(())
}
