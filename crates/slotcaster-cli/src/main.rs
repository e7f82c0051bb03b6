use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "slotcaster-cli", version, about = "Slotcaster CLI")]
struct Cli {
    /// Preference store path (defaults to the data directory)
    #[arg(long, global = true)]
    store: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Slot catalog
    Slots {
        #[command(subcommand)]
        action: commands::slots::SlotsAction,
    },
    /// Per-user preference management
    Prefs {
        #[command(subcommand)]
        action: commands::prefs::PrefsAction,
    },
    /// Scheduling engine control
    Engine {
        #[command(subcommand)]
        action: commands::engine::EngineAction,
    },
    /// Run the long-lived dispatcher
    Run,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Slots { action } => commands::slots::run(action),
        Commands::Prefs { action } => commands::prefs::run(cli.store, action),
        Commands::Engine { action } => commands::engine::run(cli.store, action).await,
        Commands::Run => commands::run::run(cli.store).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
