//! `jobmesh config` — initialize, show, and validate the dispatch
//! platform's configuration file.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use jobmesh_core::config::{init_config_file, Config, ConfigLoader};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file to the standard location
    Init,

    /// Show the effective configuration (defaults + file + environment)
    Show,

    /// Validate a configuration file
    Validate {
        /// Path to the config file; defaults to the standard location
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,
    },
}

pub async fn execute(cmd: ConfigCommands, verbose: bool) -> Result<()> {
    match cmd {
        ConfigCommands::Init => init(verbose).await,
        ConfigCommands::Show => show(verbose).await,
        ConfigCommands::Validate { config } => validate(config, verbose).await,
    }
}

async fn init(verbose: bool) -> Result<()> {
    let path = init_config_file()?;
    println!("{} {}", "configuration written to:".green(), path.display());
    if verbose {
        let content = std::fs::read_to_string(&path)?;
        println!("\n{}", content);
    }
    Ok(())
}

async fn show(verbose: bool) -> Result<()> {
    let config = ConfigLoader::new().load()?;
    let toml_string = toml::to_string_pretty(&config)?;
    println!("{}", toml_string);

    if verbose {
        if let Some(path) = ConfigLoader::default_config_path() {
            println!("\nconfig file location: {}", path.display());
        }
    }
    Ok(())
}

async fn validate(config_path: Option<std::path::PathBuf>, verbose: bool) -> Result<()> {
    let loader = match &config_path {
        Some(path) => ConfigLoader::new().with_file(path).skip_env(),
        None => ConfigLoader::new(),
    };

    let config: Config = loader
        .load()
        .context("configuration failed to load or validate")?;

    println!("{}", "configuration is valid".green().bold());
    if verbose {
        println!("\n{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
