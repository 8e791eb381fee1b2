//! PDF Reorder CLI tool
//!
//! A command-line tool for merging PDFs and reordering their pages.

use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use glob::glob;
use tracing_subscriber::EnvFilter;

use pdf_reorder::pdf::extract_metadata;
use pdf_reorder::{spawn_session, LopdfService, SaveStatus, Session, SessionConfig};

/// PDF Reorder - Merge PDFs and rearrange their pages
#[derive(Parser)]
#[command(name = "pdf-reorder")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Merge PDFs in order
    pdf-reorder merge -o combined.pdf intro.pdf \"[0-9]*.pdf\"

    # Merge two files and move page 5 to the front
    pdf-reorder reorder --move 5:1 -o reorganized.pdf a.pdf b.pdf

    # Show page count and thumbnail sizes
    pdf-reorder info combined.pdf")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge multiple PDF files into one
    Merge {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Merge PDF files, move pages around and save the result
    Reorder {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Page move as FROM:TO using 1-based positions; repeat for several moves
        #[arg(short = 'm', long = "move", value_parser = parse_move)]
        moves: Vec<(usize, usize)>,

        /// Output PDF file path, rewritten on every auto-save
        #[arg(short, long, default_value = "reorganized.pdf")]
        output: PathBuf,

        /// Quiet period in milliseconds before an auto-save
        #[arg(long, env = "PDF_REORDER_DEBOUNCE_MS", default_value_t = 1000)]
        debounce_ms: u64,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,

        /// Scale applied to page sizes when listing thumbnails
        #[arg(long, env = "PDF_REORDER_THUMBNAIL_SCALE", default_value_t = 0.2)]
        thumbnail_scale: f32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Merge { inputs, output, open } => cmd_merge(inputs, output, open),
        Commands::Reorder { inputs, moves, output, debounce_ms, open } => {
            cmd_reorder(inputs, moves, output, debounce_ms, open).await
        }
        Commands::Info { input, thumbnail_scale } => cmd_info(input, thumbnail_scale),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Parse a `FROM:TO` move with 1-based positions into 0-based positions
fn parse_move(value: &str) -> Result<(usize, usize), String> {
    let (from, to) = value
        .split_once(':')
        .ok_or_else(|| format!("expected FROM:TO, got '{value}'"))?;
    let position = |s: &str| -> Result<usize, String> {
        match s.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n - 1),
            _ => Err(format!("'{s}' is not a page position (positions start at 1)")),
        }
    };
    Ok((position(from)?, position(to)?))
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = Vec::new();
            let entries = glob(&pattern)
                .map_err(|e| pdf_reorder::Error::InvalidGlob(format!("{pattern}: {e}")))?;
            for entry in entries {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => eprintln!("Warning: glob error for {}: {}", pattern, e),
                }
            }
            if matched.is_empty() {
                return Err(pdf_reorder::Error::NoFilesMatched(pattern).into());
            }
            // Glob results come back in filesystem order; sort for consistent ordering
            matched.sort();
            paths.extend(matched);
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    for path in &paths {
        if !path.exists() {
            return Err(pdf_reorder::Error::FileNotFound(path.clone()).into());
        }
    }

    Ok(paths)
}

/// Open a file with the system default application
fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(path).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

fn format_order(order: &[usize]) -> String {
    order
        .iter()
        .map(|page| (page + 1).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Merge multiple PDFs into one
fn cmd_merge(inputs: Vec<String>, output: PathBuf, open: bool) -> Result<()> {
    let inputs = expand_globs(inputs)?;

    eprintln!("Merging {} PDF files...", inputs.len());

    let mut session = Session::new(LopdfService, SessionConfig::default())?;
    for path in &inputs {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        session
            .on_file_loaded(&bytes)
            .with_context(|| format!("Cannot load {}", path.display()))?;
    }

    let bytes = session.on_save_requested()?;
    std::fs::write(&output, bytes.as_slice())
        .with_context(|| format!("Cannot write {}", output.display()))?;

    eprintln!("Merged {} pages to: {}", session.registry().len(), output.display());

    if open {
        open_file(&output)?;
    }

    Ok(())
}

/// Merge PDFs, apply page moves and save with auto-save running
async fn cmd_reorder(
    inputs: Vec<String>,
    moves: Vec<(usize, usize)>,
    output: PathBuf,
    debounce_ms: u64,
    open: bool,
) -> Result<()> {
    let inputs = expand_globs(inputs)?;

    let config = SessionConfig {
        debounce: Duration::from_millis(debounce_ms),
        autosave_path: Some(output.clone()),
        ..SessionConfig::default()
    };

    let mut session = Session::new(LopdfService, config)?;
    session.set_observer(|status: SaveStatus, order: &[usize]| {
        eprintln!(
            "[{}] {}: {}",
            Local::now().format("%H:%M:%S"),
            status,
            format_order(order)
        );
    });
    let (handle, task) = spawn_session(session);

    for path in &inputs {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let added = handle
            .file_loaded(bytes)
            .await
            .with_context(|| format!("Cannot load {}", path.display()))?;
        eprintln!("Loaded {} ({} pages)", path.display(), added);
    }

    let total = handle.snapshot().await?.total_pages;
    for &(from, to) in &moves {
        if from >= total || to >= total {
            bail!("Cannot move page {} to {}: document has {} pages", from + 1, to + 1, total);
        }
        handle.page_dragged(from, to).await?;
    }

    // Let any scheduled auto-save run, then export the final order
    handle.settle().await?;
    let bytes = handle.save_requested().await?;

    drop(handle);
    task.await.context("Session task failed")?;

    eprintln!("Saved {} bytes to: {}", bytes.len(), output.display());

    if open {
        open_file(&output)?;
    }

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf, thumbnail_scale: f32) -> Result<()> {
    if !input.exists() {
        return Err(pdf_reorder::Error::FileNotFound(input).into());
    }

    let metadata = extract_metadata(&input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    let config = SessionConfig {
        thumbnail_scale,
        ..SessionConfig::default()
    };
    let mut session = Session::new(LopdfService, config)?;
    session.on_file_loaded(&std::fs::read(&input)?)?;
    for thumbnail in session.thumbnails()? {
        println!(
            "{}: {:.0} x {:.0} px",
            thumbnail.label, thumbnail.viewport.width, thumbnail.viewport.height
        );
    }

    Ok(())
}
