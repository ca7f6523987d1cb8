//! `jobmesh cancel` — request cancellation of a queued or running job.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use jobmesh_core::dispatch::worker_agent::DispatcherClient;

#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Dispatcher base URL
    #[arg(long)]
    pub dispatcher_url: String,

    /// Job ID to cancel
    pub job_id: String,
}

pub async fn execute(args: CancelArgs) -> Result<()> {
    let client = DispatcherClient::new(args.dispatcher_url.clone());
    let resp = client.cancel_job(&args.job_id).await?;
    println!("{} {}", "cancel requested:".yellow().bold(), resp.message);
    Ok(())
}
