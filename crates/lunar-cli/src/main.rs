mod cli;
mod logging;

use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lunar_engine::{
    describe_text, normalize_markup, render::lunar_text, EngineConfig, Extractor, HttpPageFetcher,
    LunarCalendar, LunarError,
};

use crate::cli::{Cli, Command, CurrentArgs, ParseArgs};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<LunarError>() {
                Some(lunar) => {
                    let kind = lunar.kind();
                    eprintln!("error [{kind:?}, status {}]: {err:#}", kind.gateway_status());
                }
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut stdout = io::stdout().lock();
    let timeout = cli.timeout;
    let base_url = cli.base_url;

    match cli.command {
        Command::Health => {
            writeln!(stdout, "{}", serde_json::json!({ "status": "ok" }))?;
        }
        Command::Parse(args) => run_parse(args, &mut stdout)?,
        Command::Text(args) => {
            let calendar = build_calendar(timeout, base_url)?;
            let text = calendar.lunar_text(args.date)?;
            if args.json {
                writeln!(stdout, "{}", serde_json::to_string_pretty(&text)?)?;
            } else {
                writeln!(stdout, "{}", text.text)?;
            }
        }
        Command::Intervals(args) => {
            let calendar = build_calendar(timeout, base_url)?;
            let description = calendar.describe(args.date)?;
            writeln!(stdout, "{}", serde_json::to_string_pretty(&description)?)?;
        }
        Command::Current(CurrentArgs { date, now }) => {
            let calendar = build_calendar(timeout, base_url)?;
            let date = date.unwrap_or_else(|| calendar.today());
            let current = match now {
                Some(now) => calendar.current_at(date, &now)?,
                None => calendar.current(date)?,
            };
            writeln!(stdout, "{}", serde_json::to_string_pretty(&current)?)?;
        }
    }
    Ok(())
}

/// Environment configuration with command-line overrides applied.
fn build_calendar(
    timeout: Option<u64>,
    base_url: Option<String>,
) -> Result<LunarCalendar<HttpPageFetcher>> {
    let mut config = EngineConfig::from_env()?;
    if let Some(secs) = timeout {
        anyhow::ensure!(secs > 0, "--timeout must be at least 1 second");
        config.http_timeout = Duration::from_secs(secs);
    }
    if let Some(url) = base_url {
        config.base_url = url;
    }
    tracing::debug!(?config, "engine configuration");

    let fetcher = HttpPageFetcher::new(&config)?;
    Ok(LunarCalendar::new(fetcher, config))
}

fn run_parse(args: ParseArgs, out: &mut impl Write) -> Result<()> {
    let raw = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read page from stdin")?;
            buf
        }
    };

    let config = EngineConfig::from_env()?;
    let extractor = Extractor::new(config.max_intervals);
    let text = normalize_markup(&raw);
    let description = describe_text(&extractor, &text, args.date, config.source_offset)?;

    if args.render {
        // a saved page has no previous date to consult
        writeln!(out, "{}", lunar_text(args.date, &description, None).text)?;
    } else {
        writeln!(out, "{}", serde_json::to_string_pretty(&description)?)?;
    }
    Ok(())
}
