use clap::{Parser, Subcommand};
use std::process;

mod commands;

use commands::{cancel, config, serve, status, submit, worker, workers};
use jobmesh_core::config::ConfigLoader;

/// jobmesh - a distributed command-execution dispatch platform
#[derive(Parser)]
#[command(name = "jobmesh")]
#[command(author = "jobmesh Contributors")]
#[command(version)]
#[command(about = "Run a dispatcher, run a worker agent, submit and track jobs", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Dispatcher API
    Serve(serve::ServeArgs),

    /// Run a Worker Agent that polls a dispatcher for jobs
    Worker(worker::WorkerArgs),

    /// Submit a job: upload a bundle and queue a command sequence
    Submit(submit::SubmitArgs),

    /// Show a job's status, or list every job
    Status(status::StatusArgs),

    /// Request cancellation of a queued or running job
    Cancel(cancel::CancelArgs),

    /// List registered workers and their resource state
    Workers(workers::WorkersArgs),

    /// Configuration management commands
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let verbose = cli.verbose;
    match cli.command {
        Commands::Serve(args) => {
            let config = ConfigLoader::new().load()?;
            serve::execute(args, config, verbose).await
        }
        Commands::Worker(args) => {
            let config = ConfigLoader::new().load()?;
            worker::execute(args, config, verbose).await
        }
        Commands::Submit(args) => submit::execute(args, verbose).await,
        Commands::Status(args) => status::execute(args).await,
        Commands::Cancel(args) => cancel::execute(args).await,
        Commands::Workers(args) => workers::execute(args).await,
        Commands::Config(cmd) => config::execute(cmd, verbose).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    }
    .map_err(|e| {
        if verbose {
            for cause in e.chain().skip(1) {
                eprintln!("  caused by: {}", cause);
            }
        }
        e
    })
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
