use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use optimistic_cache::config::EngineConfig;
use optimistic_cache::domain::pledge::PledgeState;
use optimistic_cache::infrastructure::session::TracingNotifier;
use optimistic_cache::interfaces::csv::schedule_writer::ScheduleWriter;
use optimistic_cache::interfaces::json::replayer::Replayer;
use optimistic_cache::interfaces::json::scenario_reader::ScenarioReader;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file (poll schedule, log filter)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSON-lines scenario against an in-memory cache and print the final cache
    Replay {
        /// Input scenario file
        input: PathBuf,
    },
    /// Print the pledge poll schedule as CSV
    Schedule {
        /// Pledge state the schedule is computed for
        #[arg(long, value_enum, default_value_t = StateArg::Pending)]
        state: StateArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
    Pending,
    Settled,
    Expired,
    Failed,
}

impl From<StateArg> for PledgeState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Pending => PledgeState::Pending,
            StateArg::Settled => PledgeState::Settled,
            StateArg::Expired => PledgeState::Expired,
            StateArg::Failed => PledgeState::Failed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref()).into_diagnostic()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Command::Replay { input } => {
            let replayer = Replayer::new(Arc::new(TracingNotifier));

            let file = File::open(input).into_diagnostic()?;
            let reader = ScenarioReader::new(file);
            for step_result in reader.steps() {
                match step_result {
                    Ok(step) => {
                        if let Err(e) = replayer.apply(step).await {
                            eprintln!("Error processing step: {}", e);
                        }
                    }
                    Err(e) => {
                        eprintln!("Error reading step: {}", e);
                    }
                }
            }

            let cache = replayer.into_results().await;
            let stdout = io::stdout();
            serde_json::to_writer_pretty(stdout.lock(), &cache).into_diagnostic()?;
            println!();
        }
        Command::Schedule { state } => {
            let stdout = io::stdout();
            let mut writer = ScheduleWriter::new(stdout.lock());
            let polls = writer
                .write_schedule(&config.poll, state.into())
                .into_diagnostic()?;
            tracing::debug!(polls, "schedule written");
        }
    }

    Ok(())
}
