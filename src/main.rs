//! Siteloader - media metadata extraction for a handful of sites
//!
//! Prints the extracted record as JSON lines: a single item is one line, a
//! playlist is a header line followed by one line per entry.

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use serde::Serialize;
use siteloader::extractor::{Entry, Extraction, ExtractorRegistry, Playlist};
use siteloader::utils::{ExtractError, ExtractorSettings};
use std::io::Write;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "siteloader", version, about = "Extract media metadata from supported sites")]
struct Args {
    /// Page, album, profile or listing URL
    url: String,

    /// Seconds to wait between listing pages (default 0.5)
    #[arg(long, value_name = "SECS")]
    sleep_requests: Option<f64>,

    /// Retries for rate-limited API calls
    #[arg(long, value_name = "N")]
    retries: Option<usize>,

    /// Stop after this many playlist entries
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Extract URL entries of a playlist instead of printing the references
    #[arg(long)]
    resolve: bool,

    /// Fail on a listing page that cannot be downloaded instead of stopping there
    #[arg(long)]
    fatal_page_errors: bool,
}

impl Args {
    fn settings(&self) -> ExtractorSettings {
        let mut settings = ExtractorSettings::default();
        if let Some(secs) = self.sleep_requests {
            settings.sleep_interval_requests = Some(Duration::from_secs_f64(secs.max(0.0)));
        }
        if let Some(retries) = self.retries {
            settings.extractor_retries = retries;
        }
        settings.fatal_page_errors = self.fatal_page_errors;
        settings
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let rt = tokio::runtime::Runtime::new()?;
    match rt.block_on(run(&args)) {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast_ref::<ExtractError>() {
            Some(extract_error) if extract_error.is_expected() => {
                eprintln!("ERROR: {}", extract_error);
                std::process::exit(1);
            }
            _ => Err(e),
        },
    }
}

async fn run(args: &Args) -> Result<()> {
    let registry = ExtractorRegistry::with_defaults(&args.settings())?;
    let mut out = std::io::stdout().lock();

    match registry.extract(&args.url).await? {
        Extraction::Media(item) => print_line(&mut out, &item)?,
        Extraction::Playlist(playlist) => {
            print_playlist(&registry, &mut out, playlist, args.limit, args.resolve).await?
        }
    }
    Ok(())
}

async fn print_playlist(
    registry: &ExtractorRegistry,
    out: &mut impl Write,
    playlist: Playlist,
    limit: Option<usize>,
    resolve: bool,
) -> Result<()> {
    print_line(out, &PlaylistHeader::from(&playlist))?;

    let mut entries = playlist.entries.into_stream();
    let mut printed = 0;
    while limit.map_or(true, |limit| printed < limit) {
        let Some(entry) = entries.next().await else {
            break;
        };
        match entry? {
            Entry::Url(reference) if resolve => match registry.resolve(&reference).await? {
                Extraction::Media(item) => print_line(out, &item)?,
                Extraction::Playlist(nested) => {
                    print_line(out, &PlaylistHeader::from(&nested))?;
                    let mut nested_entries = nested.entries.into_stream();
                    while let Some(nested_entry) = nested_entries.next().await {
                        print_line(out, &nested_entry?)?;
                    }
                }
            },
            entry => print_line(out, &entry)?,
        }
        printed += 1;
    }
    Ok(())
}

#[derive(Serialize)]
struct PlaylistHeader<'a> {
    #[serde(rename = "_type")]
    kind: &'static str,
    #[serde(flatten)]
    playlist: &'a Playlist,
}

impl<'a> From<&'a Playlist> for PlaylistHeader<'a> {
    fn from(playlist: &'a Playlist) -> Self {
        Self {
            kind: "playlist",
            playlist,
        }
    }
}

fn print_line(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
