use clap::{Parser, Subcommand};

mod commands;
mod prompt;

#[derive(Parser)]
#[command(name = "moodlog", version, about = "Hourly mood logger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn the recurring mood check on or off
    Track {
        #[command(subcommand)]
        action: commands::track::TrackAction,
    },
    /// Run one mood check now, as the scheduler would
    Fire {
        /// Ask on this terminal instead of leaving a notice
        #[arg(long)]
        interactive: bool,
    },
    /// Record a mood for the pending prompt or a given hour
    Record {
        /// Mood name (case-insensitive)
        mood: String,
        /// Hour id (YYYYMMDDHH) to record for instead of the pending prompt
        #[arg(long)]
        hour: Option<i64>,
    },
    /// Browse recorded entries
    Entries {
        #[command(subcommand)]
        action: commands::entries::EntriesAction,
    },
    /// List the mood catalog
    Moods,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Entry import/export and reset
    Data {
        #[command(subcommand)]
        action: commands::data::DataAction,
    },
    /// Run queued checks in the foreground until interrupted
    Daemon {
        /// Ask on this terminal instead of leaving notices
        #[arg(long)]
        interactive: bool,
    },
}

fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(match cli.command {
        Commands::Daemon { .. } => "info",
        _ => "warn",
    });

    let result = match cli.command {
        Commands::Track { action } => commands::track::run(action),
        Commands::Fire { interactive } => commands::fire::run(interactive),
        Commands::Record { mood, hour } => commands::record::run(&mood, hour),
        Commands::Entries { action } => commands::entries::run(action),
        Commands::Moods => commands::moods::run(),
        Commands::Config { action } => commands::config::run(action),
        Commands::Data { action } => commands::data::run(action),
        Commands::Daemon { interactive } => commands::daemon::run(interactive),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
