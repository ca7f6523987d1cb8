//! `jobmesh workers` — list registered workers and their resource state.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use jobmesh_core::dispatch::worker_agent::DispatcherClient;

#[derive(Args, Debug)]
pub struct WorkersArgs {
    /// Dispatcher base URL
    #[arg(long)]
    pub dispatcher_url: String,

    /// Print raw JSON instead of a formatted table
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: WorkersArgs) -> Result<()> {
    let client = DispatcherClient::new(args.dispatcher_url.clone());
    let resp = client.list_workers().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resp.workers)?);
        return Ok(());
    }

    println!(
        "{} total, {} idle, {} busy, {} unhealthy",
        resp.total_workers, resp.idle_workers, resp.busy_workers, resp.unhealthy_workers
    );
    println!();
    for worker in &resp.workers {
        println!("{} {}", "worker:".bold(), worker.worker_id);
        println!("  status:   {}", worker.status);
        println!("  host:     {} ({})", worker.hostname, worker.os);
        println!(
            "  cpu:      {:.1} cores, {:.1}% used, {:.1} reserved",
            worker.cpu_count, worker.cpu_usage, worker.reserved_cpu
        );
        println!(
            "  ram:      {} MB free / {} MB total, {} MB reserved",
            worker.ram_free_mb, worker.ram_total_mb, worker.reserved_ram_mb
        );
        if !worker.current_job_ids.is_empty() {
            println!("  jobs:     {}", worker.current_job_ids.len().to_string().cyan());
        }
        if let Some(reason) = &worker.health_reason {
            println!("  health:   {}", reason.red());
        }
        println!();
    }
    Ok(())
}
