use clap::{Parser, Subcommand};
use log::{info, warn, LevelFilter};
use mapfold::constants::DEFAULT_CONFIG_PATH;
use mapfold::schema::mapper::{format_mapping_dsl, DispatchOutcome};
use mapfold::{build_runtime, MapFoldConfig, MapFoldError, MapFoldResult, SourceEvent};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map newline-delimited JSON events and print the resulting records
    Map {
        /// Input file; reads stdin when omitted
        #[arg(long, short)]
        input: Option<PathBuf>,
        /// Treat every line as a bare event of this record type instead of
        /// a `{"type": ..., "event": ...}` envelope
        #[arg(long)]
        record_type: Option<String>,
    },
    /// Validate the configuration
    Check {},
    /// Print the compiled rule sets
    Rules {},
    /// List the configured metric charts and their load groups
    Charts {},
}

fn load_config(path: Option<&Path>) -> MapFoldResult<MapFoldConfig> {
    match path {
        Some(path) => MapFoldConfig::load_from_file(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => MapFoldConfig::load_from_file(DEFAULT_CONFIG_PATH),
        None => {
            let mut config = MapFoldConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }
}

fn parse_line(line: &str, record_type: Option<&str>) -> MapFoldResult<(String, SourceEvent)> {
    let value: Value = serde_json::from_str(line)?;
    let (record_type, event) = match record_type {
        Some(record_type) => (record_type.to_string(), value),
        None => {
            let record_type = value
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| MapFoldError::Serialization("envelope has no \"type\"".into()))?
                .to_string();
            let event = value
                .get("event")
                .cloned()
                .ok_or_else(|| MapFoldError::Serialization("envelope has no \"event\"".into()))?;
            (record_type, event)
        }
    };
    let event = SourceEvent::from_value(event)
        .ok_or_else(|| MapFoldError::Serialization("event is not a JSON object".into()))?;
    Ok((record_type, event))
}

fn handle_map(config: &MapFoldConfig, input: Option<PathBuf>, record_type: Option<String>) -> MapFoldResult<()> {
    let runtime = build_runtime(config)?;
    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut events = Vec::new();
    let mut unreadable = 0;
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line, record_type.as_deref()) {
            Ok(parsed) => events.push(parsed),
            Err(e) => {
                warn!("Skipping line {}: {}", number + 1, e);
                unreadable += 1;
            }
        }
    }

    let (outcomes, summary) = runtime
        .mappers
        .dispatch_batch(events.iter().map(|(t, e)| (t.as_str(), e)))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for outcome in outcomes {
        if let DispatchOutcome::Mapped(report) = outcome {
            writeln!(out, "{}", serde_json::to_string(&report.record)?)?;
        }
    }
    info!(
        "Mapped {} events ({} changed, {} dropped, {} unreadable)",
        summary.mapped, summary.changed, summary.dropped, unreadable
    );
    Ok(())
}

fn handle_check(config: &MapFoldConfig) -> MapFoldResult<()> {
    let runtime = build_runtime(config)?;
    println!(
        "Configuration OK: {} record types, {} charts",
        runtime.mappers.record_types().len(),
        config.metrics.all_charts().len()
    );
    Ok(())
}

fn handle_rules(config: &MapFoldConfig) -> MapFoldResult<()> {
    let runtime = build_runtime(config)?;
    for name in runtime.rules.record_type_names() {
        let rule_set = runtime.rules.rules_for(&name)?;
        let rules: Vec<_> = rule_set.rules().iter().map(|r| r.to_rule()).collect();
        println!(
            "# {} (key: {}, on failure: {:?})",
            name,
            rule_set.record_type().key_field,
            rule_set.policy()
        );
        println!("{}", format_mapping_dsl(&rules));
    }
    Ok(())
}

fn handle_charts(config: &MapFoldConfig) -> MapFoldResult<()> {
    for chart in config.metrics.all_charts() {
        println!("{:<60} {:<8} {}", chart.id, format!("{:?}", chart.renderer), chart.load_group.key());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    mapfold::logging::init(config.log_level().unwrap_or(LevelFilter::Info)).ok();
    info!("MapFold {} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Map { input, record_type } => handle_map(&config, input, record_type)?,
        Commands::Check {} => handle_check(&config)?,
        Commands::Rules {} => handle_rules(&config)?,
        Commands::Charts {} => handle_charts(&config)?,
    }
    Ok(())
}
