use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "smart-alarm", version, about = "Smart alarm clock")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Alarm management
    Alarm {
        #[command(subcommand)]
        action: commands::alarm::AlarmAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Current conditions, forecast and alerts
    Weather {
        #[command(subcommand)]
        action: commands::weather::WeatherAction,
    },
    /// Alarms and calendar events coming up
    Upcoming {
        /// Maximum number of entries
        #[arg(long, default_value = "5")]
        limit: usize,
    },
    /// Evaluate the alarm rules once and print the decision
    Check {
        /// Instant to evaluate (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Run the alarm loop until interrupted; stored alarms are re-read every minute
    Run,
    /// Device identity
    Device {
        #[command(subcommand)]
        action: commands::device::DeviceAction,
    },
    /// Calendar credentials
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Alarm { action } => commands::alarm::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Weather { action } => commands::weather::run(action),
        Commands::Upcoming { limit } => commands::upcoming::run(limit),
        Commands::Check { at } => commands::check::run(at),
        Commands::Run => commands::run::run(),
        Commands::Device { action } => commands::device::run(action),
        Commands::Auth { action } => commands::auth::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
