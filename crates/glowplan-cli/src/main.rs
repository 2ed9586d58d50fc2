use clap::{Parser, Subcommand};

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "glowplan", version, about = "GlowPlan wellness habit tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Day plan: materialize, sweep and show occurrences
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },
    /// Occurrence status management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Activity management
    Activity {
        #[command(subcommand)]
        action: commands::activity::ActivityAction,
    },
    /// Wellness score
    Score {
        #[command(subcommand)]
        action: commands::score::ScoreAction,
    },
    /// Achievement levels
    Level {
        #[command(subcommand)]
        action: commands::level::LevelAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Plan { action } => commands::plan::run(action).await,
        Commands::Task { action } => commands::task::run(action).await,
        Commands::Activity { action } => commands::activity::run(action).await,
        Commands::Score { action } => commands::score::run(action).await,
        Commands::Level { action } => commands::level::run(action).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
