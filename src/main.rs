//! Relay Race CLI
//!
//! Runs headless races and checks config files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use relay_race::{run_headless, RaceConfig, RaceOutcome, RaceSummary};

#[derive(Parser)]
#[command(name = "relay-race", about = "Relay race stage machine simulator")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a race to completion
    Run {
        /// JSON race config (defaults apply to omitted fields)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Random seed for the per-team draws
        #[arg(long)]
        seed: Option<u64>,

        /// Number of teams (named Team 1, Team 2, ...)
        #[arg(long)]
        teams: Option<usize>,

        /// Runners per team (must be even)
        #[arg(long)]
        runners: Option<u32>,

        /// Give up after this many ticks
        #[arg(long, default_value_t = 20_000)]
        max_ticks: u64,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a JSON race config
    CheckConfig {
        /// Path to the config file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Run {
            config,
            seed,
            teams,
            runners,
            max_ticks,
            json,
        } => {
            let mut race_config = match config {
                Some(path) => RaceConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => RaceConfig::default(),
            };
            if let Some(seed) = seed {
                race_config.seed = seed;
            }
            if let Some(teams) = teams {
                race_config.team_names = (1..=teams).map(|i| format!("Team {}", i)).collect();
            }
            if let Some(runners) = runners {
                race_config.team.runner_count = runners;
            }

            let summary = run_headless(race_config, max_ticks).context("invalid race config")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }

        Commands::CheckConfig { path } => {
            let config = RaceConfig::load(&path)
                .with_context(|| format!("checking config {}", path.display()))?;
            println!(
                "{}: ok ({} teams, {} runners each, {} zones)",
                path.display(),
                config.team_names.len(),
                config.team.runner_count,
                config.track.zones.len()
            );
        }
    }

    Ok(())
}

fn print_summary(summary: &RaceSummary) {
    println!(
        "Race {:?} after {} ticks ({:.3}s)",
        summary.status, summary.ticks, summary.elapsed_time
    );
    for result in &summary.results {
        match (result.outcome, result.position) {
            (RaceOutcome::Completed, Some(position)) => println!(
                "  {}. {} - {:.3}s",
                position, result.team_name, result.finish_time
            ),
            _ => println!(
                "  DNF {} - out of energy at {:.3}s after {} legs",
                result.team_name, result.finish_time, result.legs_completed
            ),
        }
    }
    for team in &summary.snapshot.teams {
        if !summary.results.iter().any(|r| r.team_name == team.name) {
            println!(
                "  --- {} - {:?}, runner {} of {}",
                team.name, team.team.stage, team.team.active_runner, team.team.runner_count
            );
        }
    }
}
