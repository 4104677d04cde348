//! AppMarket CLI - prepare Helm chart values for the AppMarket

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use appmarket_core::MarketConfig;

mod commands;
mod display;
mod error;
mod exit_codes;
mod logging;

use error::{CliError, Result};
use logging::LogFormat;

#[derive(Parser)]
#[command(name = "appmarket")]
#[command(version)]
#[command(about = "Rewrite Helm chart values for the AppMarket platform", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Charts processed concurrently
    #[arg(short, long, global = true, default_value_t = 4)]
    jobs: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite nodeSelector, storageClass and ingress in chart values
    Rewrite {
        /// Chart directories
        #[arg(required = true)]
        charts: Vec<PathBuf>,

        /// Do not query the registry; every image counts as single-arch
        #[arg(long)]
        skip_probe: bool,

        /// Configuration file (defaults to $APPMARKET_CONF, then ./appmarket.yaml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Evaluate the admission policy over every chart below a directory
    Check {
        /// Directory holding one chart per sub-directory
        root: PathBuf,

        /// Exclude charts whose README has no TL;DR section
        #[arg(long)]
        require_tldr: bool,
    },

    /// Print one resolved configuration value
    Config {
        /// Section name (kubernetes, registry)
        section: String,

        /// Key within the section
        key: String,

        /// Configuration file (defaults to $APPMARKET_CONF, then ./appmarket.yaml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the indentation record and structural path of each line
    Structure {
        /// Values file
        file: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<MarketConfig> {
    let config = match path {
        Some(path) => MarketConfig::load_from(path)?,
        None => MarketConfig::load()?,
    };
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Structure { file } => commands::structure::run(&file),

        Commands::Rewrite {
            charts,
            skip_probe,
            config,
        } => {
            let config = load_config(config.as_ref())?;
            runtime()?.block_on(commands::rewrite::run(&charts, &config, skip_probe, cli.jobs))
        }

        Commands::Check { root, require_tldr } => {
            runtime()?.block_on(commands::check::run(&root, require_tldr, cli.jobs))
        }

        Commands::Config {
            section,
            key,
            config,
        } => {
            let config = load_config(config.as_ref())?;
            commands::config::run(&config, &section, &key)
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| CliError::internal(format!("tokio runtime: {}", e)))
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    logging::setup_logging(cli.log_format, cli.debug);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
