// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Worker Agent: local state machine, concurrency control, and the
//! heartbeat/poll timer loops driving job execution.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Semaphore;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::dispatch::error::AgentError;
use crate::dispatch::protocol::WorkerJobView;
use crate::dispatch::worker_agent::bundle;
use crate::dispatch::worker_agent::client::DispatcherClient;
use crate::dispatch::worker_agent::sandbox::{
    select_image, split_command_sequence, workspace_dir, ImageCache, LogStream, NetworkMode,
    ResourceLimits, SandboxJobSpec, SandboxRunner,
};

/// Local worker lifecycle state. The wire protocol only ever sees a
/// worker as `IDLE`/`BUSY`/`UNHEALTHY`/`OFFLINE`; this finer-grained
/// machine only governs the agent process itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Unregistered,
    Registered,
    Polling,
    Executing,
}

/// Static configuration for a running Worker Agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub worker_id: String,
    pub hostname: String,
    pub dispatcher_url: String,
    pub max_parallel: usize,
    pub heartbeat_interval: Duration,
    pub poll_interval: Duration,
    pub workspace_root: PathBuf,
    pub oci_runtime_binary: String,
    pub resource_limits: ResourceLimits,
    pub network: NetworkMode,
    pub image_pull_binary: String,
    pub image_cache_root: PathBuf,
}

impl AgentConfig {
    /// `max_parallel` defaults to `max(1, cpuCount/2)` when not overridden.
    pub fn default_max_parallel() -> usize {
        (num_cpus::get() / 2).max(1)
    }
}

/// Samples host CPU usage (percent, 0-100) and free/total RAM (MB) from
/// `/proc`, the same ambient-data source the rest of the worker relies on
/// rather than adding a system-metrics crate for two numbers.
#[derive(Default)]
struct HostSampler {
    last_idle: AtomicUsize,
    last_total: AtomicUsize,
}

impl HostSampler {
    fn cpu_usage_pct(&self) -> f64 {
        let Ok(stat) = std::fs::read_to_string("/proc/stat") else {
            return 0.0;
        };
        let Some(line) = stat.lines().next() else {
            return 0.0;
        };
        let fields: Vec<usize> = line
            .split_whitespace()
            .skip(1)
            .filter_map(|f| f.parse().ok())
            .collect();
        if fields.len() < 4 {
            return 0.0;
        }
        let idle = fields[3];
        let total: usize = fields.iter().sum();

        let last_idle = self.last_idle.swap(idle, Ordering::Relaxed);
        let last_total = self.last_total.swap(total, Ordering::Relaxed);
        if last_total == 0 || total <= last_total {
            return 0.0;
        }
        let delta_total = (total - last_total) as f64;
        let delta_idle = idle.saturating_sub(last_idle) as f64;
        ((delta_total - delta_idle) / delta_total * 100.0).clamp(0.0, 100.0)
    }

    fn ram_mb(&self) -> (i64, i64) {
        let Ok(meminfo) = std::fs::read_to_string("/proc/meminfo") else {
            return (0, 0);
        };
        let mut total_kb = 0i64;
        let mut available_kb = 0i64;
        for line in meminfo.lines() {
            if let Some(rest) = line.strip_prefix("MemTotal:") {
                total_kb = parse_kb(rest);
            } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
                available_kb = parse_kb(rest);
            }
        }
        (total_kb / 1024, available_kb / 1024)
    }
}

fn parse_kb(field: &str) -> i64 {
    field
        .trim()
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// A running Worker Agent: owns the protocol client, the sandbox runner,
/// and the semaphore gating `maxParallel` concurrent job executions.
pub struct WorkerAgent {
    config: AgentConfig,
    client: Arc<DispatcherClient>,
    runner: Arc<SandboxRunner>,
    sampler: Arc<HostSampler>,
    semaphore: Arc<Semaphore>,
    state: Arc<RwLock<AgentState>>,
    running_jobs: Arc<AtomicUsize>,
    cancelled_jobs: Arc<dashmap::DashSet<String>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerAgent {
    pub fn new(config: AgentConfig) -> Self {
        let client = Arc::new(DispatcherClient::new(config.dispatcher_url.clone()));
        let image_cache = ImageCache::new(
            config.image_cache_root.clone(),
            config.image_pull_binary.clone(),
        );
        let runner = Arc::new(SandboxRunner::new(
            config.oci_runtime_binary.clone(),
            config.workspace_root.join(".bundles"),
            image_cache,
        ));
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_parallel)),
            config,
            client,
            runner,
            sampler: Arc::new(HostSampler::default()),
            state: Arc::new(RwLock::new(AgentState::Unregistered)),
            running_jobs: Arc::new(AtomicUsize::new(0)),
            cancelled_jobs: Arc::new(dashmap::DashSet::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> AgentState {
        *self.state.read()
    }

    /// Registers with the Dispatcher, then starts the independent
    /// heartbeat and poll loops. Runs until `shutdown` is requested or an
    /// unrecoverable transport error forces a return to `Unregistered`
    /// and a retry with exponential backoff.
    pub async fn run(self: Arc<Self>) -> Result<(), AgentError> {
        let mut backoff = Duration::from_secs(1);
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }
            match self.register_with_retry_budget().await {
                Ok(()) => {
                    backoff = Duration::from_secs(1);
                }
                Err(err) => {
                    warn!(error = %err, backoff_secs = backoff.as_secs(), "registration failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(Duration::from_secs(60));
                    continue;
                }
            }

            let heartbeat = {
                let agent = self.clone();
                tokio::spawn(async move { agent.heartbeat_loop().await })
            };
            let poll = {
                let agent = self.clone();
                tokio::spawn(async move { agent.poll_loop().await })
            };

            let (hb_res, poll_res) = tokio::join!(heartbeat, poll);
            if hb_res.is_err() || poll_res.is_err() {
                *self.state.write() = AgentState::Unregistered;
                continue;
            }
            return Ok(());
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    async fn register_with_retry_budget(&self) -> Result<(), AgentError> {
        let cpu_usage = self.sampler.cpu_usage_pct();
        let (ram_total_mb, ram_free_mb) = self.sampler.ram_mb();
        self.client
            .register(
                &self.config.worker_id,
                &self.config.hostname,
                std::env::consts::OS,
                num_cpus::get() as f64,
                cpu_usage,
                ram_total_mb,
                ram_free_mb,
                env!("CARGO_PKG_VERSION"),
            )
            .await?;
        *self.state.write() = AgentState::Registered;
        info!(worker_id = %self.config.worker_id, "registered with dispatcher");
        Ok(())
    }

    async fn heartbeat_loop(self: Arc<Self>) -> Result<(), AgentError> {
        let mut ticker = interval(self.config.heartbeat_interval);
        loop {
            ticker.tick().await;
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }
            let cpu_usage = self.sampler.cpu_usage_pct();
            let (ram_total_mb, ram_free_mb) = self.sampler.ram_mb();
            let status = if self.running_jobs.load(Ordering::Relaxed) > 0 {
                "BUSY"
            } else {
                "IDLE"
            };
            if let Err(err) = self
                .client
                .heartbeat(&self.config.worker_id, cpu_usage, ram_free_mb, ram_total_mb, status)
                .await
            {
                warn!(error = %err, "heartbeat failed, will retry next tick");
            }
        }
    }

    async fn poll_loop(self: Arc<Self>) -> Result<(), AgentError> {
        let mut ticker = interval(self.config.poll_interval);
        loop {
            ticker.tick().await;
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }
            if self.semaphore.available_permits() == 0 {
                continue;
            }
            *self.state.write() = AgentState::Polling;
            match self.client.get_job(&self.config.worker_id).await {
                Ok(Some(job)) => {
                    let agent = self.clone();
                    tokio::spawn(async move { agent.execute_job(job).await });
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "poll failed, will retry next tick"),
            }
        }
    }

    /// Runs the full per-job execution contract: fetch, extract, run each
    /// command in sequence, package results, submit.
    async fn execute_job(self: Arc<Self>, job: WorkerJobView) {
        let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
            return;
        };
        self.running_jobs.fetch_add(1, Ordering::Relaxed);
        *self.state.write() = AgentState::Executing;

        let result = self.run_job_inner(&job).await;
        self.cancelled_jobs.remove(&job.job_id);

        match result {
            Ok((stdout, stderr, exit_code, result_ref)) => {
                if let Err(err) = self
                    .client
                    .submit_result(
                        &job.job_id,
                        &self.config.worker_id,
                        &stdout,
                        &stderr,
                        exit_code,
                        result_ref.as_deref(),
                    )
                    .await
                {
                    error!(job_id = %job.job_id, error = %err, "submit-result failed after retries, reporting failure");
                    let _ = self
                        .client
                        .report_failure(&job.job_id, &self.config.worker_id, &err.to_string())
                        .await;
                }
            }
            Err(err) => {
                warn!(job_id = %job.job_id, error = %err, "job execution failed");
                let _ = self
                    .client
                    .report_failure(&job.job_id, &self.config.worker_id, &err.to_string())
                    .await;
            }
        }

        self.running_jobs.fetch_sub(1, Ordering::Relaxed);
        if self.running_jobs.load(Ordering::Relaxed) == 0 {
            *self.state.write() = AgentState::Registered;
        }
        drop(permit);
    }

    async fn run_job_inner(
        &self,
        job: &WorkerJobView,
    ) -> Result<(String, String, i32, Option<String>), AgentError> {
        let workspace = workspace_dir(&self.config.workspace_root, &job.job_id);
        tokio::fs::create_dir_all(&workspace).await?;
        let cleanup = scopeguard(&workspace);

        let bundle_bytes = self.fetch_bundle(&job.bundle_ref).await?;
        bundle::extract_bundle(&bundle_bytes, &workspace)?;

        let commands = split_command_sequence(&job.command);
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut last_exit_code = 0;

        for command in commands {
            let image = select_image(&command).to_string();
            let spec = SandboxJobSpec {
                image,
                command,
                workspace: workspace.clone(),
                env: std::collections::HashMap::new(),
                limits: self.config.resource_limits.clone(),
                network: self.config.network,
                timeout: Duration::from_millis(job.timeout_ms.max(0) as u64),
            };

            let job_id = job.job_id.clone();
            let client = self.client.clone();
            let cancelled = self.cancelled_jobs.clone();
            let outcome = self
                .runner
                .run(
                    &spec,
                    || cancelled.contains(&job_id),
                    |stream, line| {
                        let job_id = job_id.clone();
                        let client = client.clone();
                        let line = line.to_string();
                        tokio::spawn(async move {
                            let is_stderr = matches!(stream, LogStream::Stderr);
                            let _ = client.stream_output(&job_id, &line, is_stderr).await;
                        });
                    },
                )
                .await?;

            stdout.push_str(&outcome.stdout);
            stderr.push_str(&outcome.stderr);
            last_exit_code = outcome.exit_code;

            if outcome.cancelled {
                self.cancelled_jobs.insert(job.job_id.clone());
                break;
            }
            if outcome.timed_out {
                break;
            }
            // non-zero exit: best-effort batch, continue with next command
        }

        let archive = bundle::build_result_archive(&workspace, &stdout, &stderr)?;
        let result_ref = self.upload_result(&archive).await.ok();

        drop(cleanup);
        Ok((stdout, stderr, last_exit_code, result_ref))
    }

    async fn fetch_bundle(&self, bundle_ref: &str) -> Result<Vec<u8>, AgentError> {
        self.client.fetch_blob(bundle_ref).await
    }

    async fn upload_result(&self, archive: &[u8]) -> Result<String, AgentError> {
        self.client.put_blob(archive.to_vec()).await
    }
}

/// Deletes the job's scratch workspace unconditionally when dropped,
/// regardless of which path out of [`WorkerAgent::run_job_inner`] was taken.
struct WorkspaceCleanup {
    path: PathBuf,
}

impl Drop for WorkspaceCleanup {
    fn drop(&mut self) {
        let path = self.path.clone();
        tokio::spawn(async move {
            let _ = tokio::fs::remove_dir_all(&path).await;
        });
    }
}

fn scopeguard(path: &std::path::Path) -> WorkspaceCleanup {
    WorkspaceCleanup {
        path: path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_max_parallel_is_at_least_one() {
        assert!(AgentConfig::default_max_parallel() >= 1);
    }

    #[test]
    fn host_sampler_reports_zero_on_first_sample() {
        let sampler = HostSampler::default();
        // First call has no prior snapshot to diff against.
        let _ = sampler.cpu_usage_pct();
    }

    #[test]
    fn parses_meminfo_kb_field() {
        assert_eq!(parse_kb("   16384 kB"), 16384);
    }
}
