//! `jobmesh worker` — run a Worker Agent that polls a dispatcher for jobs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use jobmesh_core::config::Config;
use jobmesh_core::dispatch::worker_agent::{AgentConfig, NetworkMode, ResourceLimits, WorkerAgent};

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Dispatcher base URL, e.g. http://localhost:8080
    #[arg(long)]
    pub dispatcher_url: String,

    /// Worker ID; defaults to a generated UUID
    #[arg(long)]
    pub worker_id: Option<String>,

    /// Maximum concurrently executing jobs; defaults to max(1, cpus/2)
    #[arg(long)]
    pub max_parallel: Option<usize>,
}

pub async fn execute(args: WorkerArgs, config: Config, verbose: bool) -> Result<()> {
    let worker_id = args
        .worker_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let hostname = gethostname::gethostname()
        .into_string()
        .unwrap_or_else(|_| "unknown".to_string());
    let max_parallel = args
        .max_parallel
        .or(config.worker.max_parallel_jobs)
        .unwrap_or_else(AgentConfig::default_max_parallel);
    let network = match config.sandbox.network_mode.as_str() {
        "host" => NetworkMode::HostOnly,
        _ => NetworkMode::None,
    };

    let agent_config = AgentConfig {
        worker_id: worker_id.clone(),
        hostname: hostname.clone(),
        dispatcher_url: args.dispatcher_url.clone(),
        max_parallel,
        heartbeat_interval: Duration::from_millis(config.worker.heartbeat_interval_ms),
        poll_interval: Duration::from_millis(config.worker.poll_interval_ms),
        workspace_root: config.worker.workspace_root.clone(),
        oci_runtime_binary: config.sandbox.oci_runtime_binary.clone(),
        resource_limits: ResourceLimits {
            memory_limit: config.sandbox.memory_limit.clone(),
            cpu_limit: config.sandbox.cpu_limit.clone(),
            pids_limit: config.sandbox.pids_limit,
            tmpfs_mb: config.sandbox.tmpfs_mb,
        },
        network,
        image_pull_binary: config.sandbox.image_pull_binary.clone(),
        image_cache_root: config.sandbox.image_cache_root.clone(),
    };

    std::fs::create_dir_all(&agent_config.workspace_root)?;
    std::fs::create_dir_all(&agent_config.image_cache_root)?;

    println!("{}", "jobmesh worker".bold().cyan());
    println!("  worker id:  {}", worker_id.green());
    println!("  dispatcher: {}", args.dispatcher_url);
    if verbose {
        println!("  max parallel jobs: {}", max_parallel);
        println!(
            "  workspace root: {}",
            PathBuf::from(&agent_config.workspace_root).display()
        );
    }

    let agent = Arc::new(WorkerAgent::new(agent_config));
    agent.run().await?;
    Ok(())
}
