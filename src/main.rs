use clap::{Parser, Subcommand};
use modelstage::builder::Toolchain;
use modelstage::commands::{self, Outcome};
use modelstage::config::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modelstage")]
#[command(about = "Stage an image classifier as TensorFlow.js assets", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/modelstage/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target directory, overriding output.dir
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a classifier on a pre-trained feature extractor and export it
    Build,
    /// Download a hosted model.json and its weight files
    Fetch {
        /// Exit with status 1 when the fetch fails
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = cli.output_dir {
        config.output.dir = dir;
    }

    let outcome = match cli.command {
        Commands::Build => {
            tracing::info!("Starting model build");
            let toolchain = Toolchain::from_config(&config.builder);
            commands::build::run(&config, &toolchain).await
        }
        Commands::Fetch { strict } => {
            tracing::info!("Starting model fetch");
            config.fetcher.strict_exit |= strict;
            commands::fetch::run(&config).await
        }
    };

    if outcome != Outcome::Completed {
        tracing::debug!("Finished with {outcome:?}");
    }
    ExitCode::from(outcome.exit_code())
}
