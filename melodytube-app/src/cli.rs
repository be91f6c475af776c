use clap::{Parser, Subcommand};
use melodytube_core::{
    LookupBackend, LookupOutcome, LookupService, TrackDescriptor, VideoId, WidgetOptions,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, warn};

const LOG_TARGET: &str = "melodytube::cli";

/// Exit code for bad links and identifiers
pub const EXIT_INVALID_INPUT: i32 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "melodytube",
    version,
    about = "Search and resolve tracks for the embedded music player"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Lookup backend to use instead of the configured one (scrape, api, catalog)
    #[arg(long, global = true)]
    pub backend: Option<LookupBackend>,

    /// Config file to use instead of ~/.config/melodytube/config.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum number of search results
    #[arg(long, global = true)]
    pub limit: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search for tracks; an empty query lists the fallback catalog
    Search {
        query: Vec<String>,
    },
    /// Extract the track from a pasted link and describe it
    Resolve {
        link: String,
    },
    /// Describe one track identifier
    Details {
        id: String,
    },
}

/// Run one command, writing results to stdout. Returns the process exit code.
pub async fn run(command: &Commands, lookup: &LookupService, widget: &WidgetOptions) -> i32 {
    let result = match command {
        Commands::Search { query } => {
            let outcome = lookup.search(&query.join(" ")).await;
            write_results(&mut io::stdout().lock(), &outcome)
        }
        Commands::Resolve { link } => match lookup.resolve_link(link).await {
            Ok(outcome) => write_resolved(&mut io::stdout().lock(), &outcome, widget),
            Err(e) => {
                error!(target: LOG_TARGET, "{e}");
                return if e.is_invalid_input() { EXIT_INVALID_INPUT } else { 1 };
            }
        },
        Commands::Details { id } => match VideoId::parse(id) {
            Ok(id) => {
                let outcome = lookup.details(&id).await;
                write_descriptor(&mut io::stdout().lock(), &outcome)
            }
            Err(e) => {
                error!(target: LOG_TARGET, "{e}");
                return EXIT_INVALID_INPUT;
            }
        },
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            error!(target: LOG_TARGET, "Failed to write output: {e}");
            1
        }
    }
}

fn write_degraded<T>(out: &mut impl Write, outcome: &LookupOutcome<T>) -> io::Result<()> {
    if let Some(reason) = outcome.fallback_reason() {
        warn!(target: LOG_TARGET, "Lookup degraded: {reason}");
        writeln!(out, "(fallback: {reason})")?;
    }
    Ok(())
}

fn write_track(out: &mut impl Write, track: &TrackDescriptor) -> io::Result<()> {
    writeln!(out, "{}", track.title)?;
    writeln!(out, "    id:        {}", track.id)?;
    writeln!(out, "    thumbnail: {}", track.thumbnail_url)
}

pub fn write_results(
    out: &mut impl Write,
    outcome: &LookupOutcome<Vec<TrackDescriptor>>,
) -> io::Result<()> {
    write_degraded(out, outcome)?;
    for (index, track) in outcome.value().iter().enumerate() {
        write!(out, "{:>2}. ", index + 1)?;
        write_track(out, track)?;
    }
    Ok(())
}

pub fn write_descriptor(
    out: &mut impl Write,
    outcome: &LookupOutcome<TrackDescriptor>,
) -> io::Result<()> {
    write_degraded(out, outcome)?;
    write_track(out, outcome.value())
}

fn write_resolved(
    out: &mut impl Write,
    outcome: &LookupOutcome<TrackDescriptor>,
    widget: &WidgetOptions,
) -> io::Result<()> {
    write_descriptor(out, outcome)?;
    match widget.embed_url(&outcome.value().id) {
        Ok(url) => writeln!(out, "    embed:     {url}"),
        Err(e) => {
            warn!(target: LOG_TARGET, "Could not build embed URL: {e}");
            Ok(())
        }
    }
}
