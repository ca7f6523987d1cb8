//! `jobmesh submit` — upload a bundle and queue a job.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use jobmesh_core::dispatch::worker_agent::DispatcherClient;

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Dispatcher base URL
    #[arg(long)]
    pub dispatcher_url: String,

    /// Newline-separated command sequence to run
    #[arg(long)]
    pub command: String,

    /// Path to the bundle archive (zip or tar.gz) to upload
    #[arg(long)]
    pub bundle: PathBuf,

    /// CPU cores to reserve
    #[arg(long)]
    pub cpu: Option<f64>,

    /// RAM in megabytes to reserve
    #[arg(long)]
    pub ram_mb: Option<i64>,

    /// Wall-clock timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<i64>,

    /// Maximum retry attempts before permanent failure
    #[arg(long)]
    pub max_retries: Option<u32>,
}

pub async fn execute(args: SubmitArgs, verbose: bool) -> Result<()> {
    let bytes = std::fs::read(&args.bundle)
        .with_context(|| format!("failed to read bundle: {}", args.bundle.display()))?;
    let bundle_name = args
        .bundle
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "bundle".to_string());

    let client = DispatcherClient::new(args.dispatcher_url.clone());

    if verbose {
        println!("uploading bundle {} ({} bytes)...", bundle_name, bytes.len());
    }
    let bundle_ref = client.put_blob(bytes).await?;

    let resp = client
        .create_job(
            &args.command,
            &bundle_ref,
            &bundle_name,
            args.cpu,
            args.ram_mb,
            args.timeout_ms,
            args.max_retries,
        )
        .await?;

    println!("{} {}", "job queued:".green().bold(), resp.job_id);
    Ok(())
}
