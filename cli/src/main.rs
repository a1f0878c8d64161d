use std::path::{Path, PathBuf};
use std::process::exit;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use open_bibles_backend::db::{self, MemorySink, SqliteSink, VerseSink};
use open_bibles_backend::importer::{ImportStats, analyze_file, list_bible_files};
use open_bibles_backend::logger::{self, Level, format_duration};
use open_bibles_backend::{BibleImporter, DEFAULT_BATCH_SIZE, ParsedDocument, detect_dialect};
use open_bibles_backend::encoding::read_xml_file;

#[derive(Parser, Debug)]
#[command(author, version, about = "Import USFX, OSIS and Zefania bible translations into SQLite", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// silent, error, warn, info or debug. Debug also logs every skipped verse element.
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<Level>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import every translation file of the bibles directory
    Import {
        /// SQLite database to write to
        #[arg(long, value_name = "DATABASE_URL", env = "DATABASE_URL", default_value = "bibles.sqlite3")]
        database_url: String,

        /// Directory with the translation files, named like eng-kjv.osis.xml
        #[arg(long, value_name = "DIRECTORY_PATH", env = "BIBLES_PATH", default_value = "./bibles")]
        bibles_path: PathBuf,

        /// Only import this file of the bibles directory
        #[arg(long, value_name = "FILE_NAME")]
        translation: Option<String>,

        /// Replace earlier imports of the same translation
        #[arg(long, default_value_t = false)]
        overwrite: bool,

        /// Drop and re-create the tables before importing
        #[arg(long, default_value_t = false)]
        drop_tables: bool,

        /// Parse and walk the files without writing to the database
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Verses written between two commits
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Print the import results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the dialect of a translation file
    #[command(arg_required_else_help = true)]
    Detect {
        #[arg(value_name = "FILE_PATH")]
        path: PathBuf,
    },

    /// Print the root tag, namespaces and first elements of a translation file
    #[command(arg_required_else_help = true)]
    Analyze {
        #[arg(value_name = "FILE_PATH")]
        path: PathBuf,
    },
}

struct ImportOptions {
    bibles_path: PathBuf,
    translation: Option<String>,
    overwrite: bool,
    batch_size: usize,
    json: bool,
}

fn run_import<S: VerseSink>(sink: S, opts: &ImportOptions) -> Result<ImportStats> {
    let total = match &opts.translation {
        Some(_) => 1,
        None => list_bible_files(&opts.bibles_path)?.len(),
    };

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );
    if opts.json {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let mut results = Vec::new();
    let mut importer = BibleImporter::new(sink)
        .with_batch_size(opts.batch_size)
        .with_overwrite(opts.overwrite);

    let stats = importer.import_directory(
        &opts.bibles_path,
        opts.translation.as_deref(),
        |path, result| {
            let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            match result {
                Ok(summary) => {
                    pb.set_message(format!("{} ({} verses)", name, summary.verses_imported));
                    results.push(serde_json::json!({ "ok": true, "summary": summary }));
                }
                Err(e) => {
                    warn!("Skipping {}: {:#}", name, e);
                    pb.set_message(format!("{} failed", name));
                    results.push(serde_json::json!({ "ok": false, "filename": name, "error": format!("{:#}", e) }));
                }
            }
            pb.inc(1);
        },
    )?;
    pb.finish_with_message("Done");

    if opts.json {
        let out = serde_json::json!({ "stats": stats, "files": results });
        println!("{}", serde_json::to_string_pretty(&out)?);
    }

    Ok(stats)
}

fn import_command(
    database_url: &str,
    drop_tables: bool,
    dry_run: bool,
    opts: ImportOptions,
) -> Result<()> {
    logger::info(&format!("=== import: {:?} ===", opts.bibles_path));
    let start = Instant::now();

    let stats = if dry_run {
        logger::info("Dry run, nothing is written to the database");
        run_import(MemorySink::new(), &opts)?
    } else {
        let mut conn = db::establish_connection(database_url)?;
        if drop_tables {
            logger::info("Dropping and re-creating tables");
            db::drop_tables(&mut conn)?;
        } else {
            db::run_migrations(&mut conn)?;
        }
        run_import(SqliteSink::new(conn), &opts)?
    };

    logger::info(&format!(
        "Import finished in {}: {} files, {} failed, {} verses imported, {} skipped",
        format_duration(start.elapsed()),
        stats.files_processed,
        stats.files_failed,
        stats.verses_imported,
        stats.verses_skipped,
    ));

    if !opts.json {
        println!("Files processed: {}", stats.files_processed);
        println!("Files failed:    {}", stats.files_failed);
        println!("Verses imported: {}", stats.verses_imported);
        println!("Verses skipped:  {}", stats.verses_skipped);
    }

    if stats.files_failed > 0 {
        bail!("{} of {} files failed to import", stats.files_failed, stats.files_processed);
    }
    Ok(())
}

fn detect_command(path: &Path) -> Result<()> {
    let content = read_xml_file(path)?;
    let doc = ParsedDocument::parse(&content)?;
    let dialect = detect_dialect(&doc)?;
    println!("{}", dialect);
    Ok(())
}

fn analyze_command(path: &Path) -> Result<()> {
    let outline = analyze_file(path)?;

    println!("Root tag: {}", outline.root_tag);
    match outline.dialect {
        Some(d) => println!("Dialect: {}", d),
        None => println!("Dialect: unrecognized"),
    }
    for (key, value) in &outline.namespaces {
        println!("Namespace: {}=\"{}\"", key, value);
    }
    for child in &outline.children {
        println!("Child: {}", child.tag);
        for (key, value) in &child.attributes {
            println!("  {}=\"{}\"", key, value);
        }
        if let Some(tag) = &child.first_child_tag {
            println!("  First child: {}", tag);
        }
    }
    Ok(())
}

fn main() {
    // DATABASE_URL and BIBLES_PATH may come from a .env file, clap picks them up via `env = ...`.
    if dotenv().is_err() {
        eprintln!("Info: No .env file found or failed to load.");
    }

    let cli = Cli::parse();

    if let Some(level) = cli.log_level {
        logger::set_log_level(level);
    }

    let command_result = match cli.command {
        Commands::Import {
            database_url,
            bibles_path,
            translation,
            overwrite,
            drop_tables,
            dry_run,
            batch_size,
            json,
        } => {
            let opts = ImportOptions { bibles_path, translation, overwrite, batch_size, json };
            import_command(&database_url, drop_tables, dry_run, opts)
        }

        Commands::Detect { path } => detect_command(&path),

        Commands::Analyze { path } => analyze_command(&path),
    };

    if let Err(e) = command_result {
        logger::error(&format!("{:#}", e));
        eprintln!("Error executing command: {:#}", e);
        exit(1);
    }
}
