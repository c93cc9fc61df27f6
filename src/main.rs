use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::*;
use env_logger::Builder;
use log::{error, info, LevelFilter};
use prettytable::{row, Table};

use flight_surety_core::primitives::format_amount;
use flight_surety_core::simulation::{self, SimulationParams};
use flight_surety_core::utils::{current_time, format_timestamp};
use flight_surety_core::{
    Address, Event, FlightSurety, RecordingPayoutSink, SuretyConfig, SuretyResult,
};

#[derive(Parser)]
#[clap(author, version, about)]
/// Flight delay insurance marketplace core
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// Log level for output
    #[clap(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default configuration as TOML
    Config {
        /// Write to this file instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a TOML configuration file
    #[clap(alias = "check")]
    ValidateConfig {
        path: PathBuf,
    },

    /// Run an end-to-end scenario with an oracle fleet
    #[clap(alias = "sim")]
    Simulate {
        /// Configuration file (defaults apply otherwise)
        #[clap(short, long)]
        config: Option<PathBuf>,

        #[clap(short, long, default_value = "20")]
        oracles: usize,

        #[clap(short, long, default_value = "3")]
        passengers: usize,

        #[clap(short, long, default_value = "AA100")]
        flight: String,

        /// Probability that an oracle reports an airline-caused delay
        #[clap(short, long, default_value = "0.8")]
        bias: f64,

        #[clap(long, default_value = "42")]
        seed: u64,

        /// Save the final state to this JSON file
        #[clap(long)]
        snapshot: Option<PathBuf>,

        /// Print every committed event
        #[clap(long)]
        events: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };

    Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let result = match cli.command {
        Commands::Config { output } => print_default_config(output),
        Commands::ValidateConfig { path } => validate_config(path),
        Commands::Simulate {
            config,
            oracles,
            passengers,
            flight,
            bias,
            seed,
            snapshot,
            events,
        } => {
            let params = SimulationParams {
                flight,
                timestamp: current_time(),
                oracles,
                passengers,
                late_airline_bias: bias,
                seed,
                ..SimulationParams::default()
            };
            run_simulation(config, params, snapshot, events)
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

fn print_default_config(output: Option<PathBuf>) -> SuretyResult<()> {
    let text = SuretyConfig::default().to_toml_string()?;
    match output {
        Some(path) => {
            fs::write(&path, text)?;
            info!("Wrote default configuration to {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn validate_config(path: PathBuf) -> SuretyResult<()> {
    let config = SuretyConfig::load(&path)?;
    let result = config.validate();
    if result.is_valid {
        println!("{} {}", "OK".green().bold(), path.display());
    } else {
        println!("{} {}", "INVALID".red().bold(), path.display());
    }
    print!("{}", result.get_summary());
    if !result.is_valid {
        process::exit(2);
    }
    Ok(())
}

fn run_simulation(
    config_path: Option<PathBuf>,
    params: SimulationParams,
    snapshot: Option<PathBuf>,
    print_events: bool,
) -> SuretyResult<()> {
    let config = match config_path {
        Some(path) => SuretyConfig::load(path)?,
        None => SuretyConfig::default(),
    };

    let owner = Address::from_low_u64(1);
    let airline = Address::from_low_u64(2);
    let sink = RecordingPayoutSink::new();
    let payouts = Box::new(sink.clone());
    let surety = FlightSurety::new(config, owner, airline, "Founder Air", payouts)?;

    println!("{}", "Running flight surety simulation".green().bold());
    println!("Flight: {} at {}", params.flight, format_timestamp(params.timestamp));
    println!(
        "Oracles: {}  Passengers: {}  Seed: {}",
        params.oracles, params.passengers, params.seed
    );

    let report = simulation::run(&surety, airline, &params)?;

    println!(
        "Request routed to index {} and answered by {} oracles",
        report.request_index, report.responders
    );
    match report.resolved {
        Some(status) if status.is_airline_fault() => {
            println!("Resolved status: {}", status.to_string().red().bold())
        }
        Some(status) => println!("Resolved status: {}", status.to_string().yellow()),
        None => println!("{}", "No quorum reached; request remains open".yellow()),
    }

    if print_events {
        for event in surety.events() {
            println!("  {} {}", event.name().cyan(), describe(&event));
        }
    }

    let mut table = Table::new();
    table.add_row(row!["Passenger", "Credited", "Paid out", "Wallet"]);
    for (passenger, credited) in &report.credits {
        let paid = report
            .payouts
            .iter()
            .find(|(p, _)| p == passenger)
            .map_or(0, |(_, amount)| *amount);
        table.add_row(row![
            passenger.to_string(),
            format_amount(*credited),
            format_amount(paid),
            format_amount(sink.balance_of(passenger))
        ]);
    }
    if report.credits.is_empty() {
        println!("No passenger was credited");
    } else {
        table.printstd();
    }

    println!(
        "Contract balance: {} (accounted: {})",
        format_amount(surety.contract_balance()),
        if surety.is_balanced() { "yes".green() } else { "no".red() }
    );

    if let Some(path) = snapshot {
        surety.save_snapshot(&path)?;
        println!("Snapshot written to {}", path.display());
    }
    Ok(())
}

fn describe(event: &Event) -> String {
    serde_json::to_string(event).unwrap_or_else(|_| format!("{:?}", event))
}
