//! Main entry point for the zipserve CLI application.
//!
//! Serves a ZIP archive over HTTP by default; `-l`/`-v` list its files and
//! `-p` prints entries to stdout.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use zipserve::{Archive, Cli, LocalFileReader};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let archive = Archive::open(&cli.archive)
        .with_context(|| format!("cannot open archive {}", cli.archive.display()))?;

    if let Some(expected) = &cli.content_type {
        if !archive.has_content_type(expected) {
            bail!(
                "{}: declared content type {:?} does not match {:?}",
                cli.archive.display(),
                archive.declared_content_type(),
                expected
            );
        }
    }

    if cli.is_listing() {
        return list_files(&archive, cli.verbose);
    }
    if cli.pipe {
        return print_files(&archive, &cli.files);
    }
    serve(Arc::new(archive), &cli).await
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for directive in cli.log_directives() {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Serve the archive until Ctrl-C, then close it.
async fn serve(archive: Arc<Archive<LocalFileReader>>, cli: &Cli) -> Result<()> {
    let app = zipserve::http::router(Arc::clone(&archive), &cli.prefix)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("cannot bind {}", cli.listen))?;

    info!(
        archive = %cli.archive.display(),
        files = archive.len(),
        content_type = archive.declared_content_type(),
        address = %cli.listen,
        prefix = %cli.prefix,
        "serving archive"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    archive.close()?;
    info!("archive closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl-C, shutting down");
    }
}

/// List files in the archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just paths, one per line
/// - Verbose format (`-v`): Table with size, compression ratio, and DOS timestamps
fn list_files(archive: &Archive<LocalFileReader>, verbose: bool) -> Result<()> {
    let entries = archive.entries();

    if !verbose {
        for entry in &entries {
            println!("{}", entry.path());
        }
        return Ok(());
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;

    for entry in &entries {
        let (date, time) = match entry.record().dos_modified() {
            Some(t) => (t.format("%Y-%m-%d").to_string(), t.format("%H:%M").to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        println!(
            "{:>10}  {:>10}  {}  {:>10}  {:>5}  {}",
            entry.size(),
            entry.compressed_size(),
            ratio(entry.compressed_size(), entry.size()),
            date,
            time,
            entry.path()
        );
        total_uncompressed += entry.size();
        total_compressed += entry.compressed_size();
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>18}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        entries.len()
    );

    Ok(())
}

/// Space saved as a right-aligned percentage.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 || compressed >= uncompressed {
        return "   0%".to_string();
    }
    format!("{:>4}%", 100 - compressed * 100 / uncompressed)
}

/// Copy entries to stdout; all of them when no names are given.
///
/// Each name goes through the same lookup as an HTTP request, index
/// fallback included.
fn print_files(archive: &Archive<LocalFileReader>, names: &[String]) -> Result<()> {
    let names: Vec<String> = if names.is_empty() {
        archive
            .entries()
            .iter()
            .map(|entry| entry.path().to_string())
            .collect()
    } else {
        names.to_vec()
    };

    let show_filename = names.len() > 1;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for name in &names {
        let mut stream = archive
            .open_file(name)
            .with_context(|| format!("cannot open {name}"))?;
        if show_filename {
            writeln!(out, "--- {} ---", stream.path())?;
        }
        std::io::copy(&mut stream, &mut out).with_context(|| format!("cannot read {name}"))?;
        stream.close()?;
    }

    out.flush()?;
    Ok(())
}
