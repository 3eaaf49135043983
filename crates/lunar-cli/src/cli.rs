use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};

/// Lunar day lookup for a lunar calendar site.
#[derive(Parser)]
#[command(
    name = "lunar",
    version,
    about = "Resolve and render lunar days from a lunar calendar page"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Page fetch timeout in seconds (overrides HTTP_TIMEOUT).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Calendar URL template containing `{date}` (overrides LUNAR_BASE_URL).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Print the lunar day text for a date.
    Text(TextArgs),
    /// Print the resolved description of a date as JSON.
    Intervals(DateArgs),
    /// Print the lunar day current at an instant as JSON.
    Current(CurrentArgs),
    /// Extract a saved page offline, without any network access.
    Parse(ParseArgs),
    /// Print a liveness line.
    Health,
}

/// A calendar date argument.
#[derive(clap::Args)]
pub struct DateArgs {
    /// Calendar date, YYYY-MM-DD.
    #[arg(short, long)]
    pub date: NaiveDate,
}

/// Arguments for the `text` subcommand.
#[derive(clap::Args)]
pub struct TextArgs {
    /// Calendar date, YYYY-MM-DD.
    #[arg(short, long)]
    pub date: NaiveDate,

    /// Print the structured response as JSON instead of plain lines.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `current` subcommand.
#[derive(clap::Args)]
pub struct CurrentArgs {
    /// Calendar date, YYYY-MM-DD. Defaults to today in UTC+3.
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Reference instant, RFC 3339. Defaults to the system clock.
    #[arg(long)]
    pub now: Option<DateTime<FixedOffset>>,
}

/// Arguments for the `parse` subcommand.
#[derive(clap::Args)]
pub struct ParseArgs {
    /// Saved HTML page. Reads stdin when omitted.
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Calendar date the page describes, YYYY-MM-DD.
    #[arg(short, long)]
    pub date: NaiveDate,

    /// Print rendered lines instead of the JSON description.
    #[arg(long)]
    pub render: bool,
}
