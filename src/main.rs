use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use catchnet::cli::{grouping, location_filter, Cli, Command};
use catchnet::temporal::parse_request_date;
use catchnet::{BaselineQuery, CatchNetModel, Config, SeriesQuery};

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_json<T: Serialize>(payload: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(payload)?
    } else {
        serde_json::to_string(payload)?
    };
    println!("{text}");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_or_default(cli.config.as_deref()).with_context(|| {
        format!(
            "reading config {}",
            cli.config.as_deref().unwrap_or(Path::new("<default>")).display()
        )
    })?;
    if let Some(dir) = &cli.data_dir {
        config.data.dir = dir.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = load_config(&cli)?;
    let model = CatchNetModel::open(&config)
        .with_context(|| format!("loading tables from {}", config.data.dir.display()))?;

    match &cli.command {
        Command::DailyView { port, date } => {
            let date = parse_request_date(date)?;
            print_json(&model.daily_snapshot(port, date)?, cli.pretty)
        }
        Command::DailyExports { port, date } => {
            let date = parse_request_date(date)?;
            print_json(&model.daily_exports(port, date)?, cli.pretty)
        }
        Command::VesselCatch { port, date } => {
            let date = parse_request_date(date)?;
            print_json(&model.vessel_catch(port, date)?, cli.pretty)
        }
        Command::Routine { vessel } => print_json(&model.vessel_routine(vessel)?, cli.pretty),
        Command::Baseline {
            vessel,
            locations,
            by_area,
            source,
        } => {
            let query = BaselineQuery {
                vessel: vessel.clone(),
                locations: location_filter(locations),
                grouping: grouping(*by_area),
                source: (*source).into(),
            };
            print_json(&model.dwell_baseline(&query)?, cli.pretty)
        }
        Command::Series {
            end,
            locations,
            source,
        } => {
            let query = SeriesQuery {
                end: parse_request_date(end)?,
                locations: location_filter(locations),
                source: (*source).into(),
            };
            print_json(&model.dwell_series(&query)?, cli.pretty)
        }
    }
}
