//! `jobmesh status` — show one job's status, or list every job.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use jobmesh_core::dispatch::protocol::JobProjection;
use jobmesh_core::dispatch::worker_agent::DispatcherClient;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Dispatcher base URL
    #[arg(long)]
    pub dispatcher_url: String,

    /// Job ID to look up; omit to list every job
    pub job_id: Option<String>,

    /// Print raw JSON instead of a formatted summary
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: StatusArgs) -> Result<()> {
    let client = DispatcherClient::new(args.dispatcher_url.clone());

    match args.job_id {
        Some(job_id) => {
            let job = client.get_job_status(&job_id).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&job)?);
            } else {
                print_job(&job);
            }
        }
        None => {
            let jobs = client.list_jobs().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&jobs)?);
            } else {
                for job in &jobs {
                    print_job(job);
                    println!();
                }
                println!("{} job(s)", jobs.len());
            }
        }
    }

    Ok(())
}

fn print_job(job: &JobProjection) {
    println!("{} {}", "job:".bold(), job.job_id);
    println!("  status:     {}", job.status);
    println!("  command:    {}", job.command);
    println!("  attempts:   {}", job.attempts);
    if let Some(worker) = &job.assigned_worker_id {
        println!("  worker:     {}", worker);
    }
    if let Some(code) = job.exit_code {
        println!("  exit code:  {}", code);
    }
    if let Some(err) = &job.error_message {
        println!("  error:      {}", err.red());
    }
    if let Some(result_ref) = &job.result_ref {
        println!("  result:     {}", result_ref);
    }
}
