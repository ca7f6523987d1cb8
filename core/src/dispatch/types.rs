// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Core data model: `Job` and `Worker`, plus the status enums governing
//! their lifecycles.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default resource and timing values used when a job submission omits them.
pub mod defaults {
    /// Logical CPU cores reserved for a job that does not specify one.
    pub const CPU: f64 = 1.0;
    /// RAM in megabytes reserved for a job that does not specify one.
    pub const RAM_MB: i64 = 256;
    /// Wall-clock execution budget in milliseconds.
    pub const TIMEOUT_MS: i64 = 300_000;
    /// Maximum attempts before a job is permanently failed.
    pub const MAX_RETRIES: u32 = 3;
}

/// Lifecycle status of a [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitted,
    Queued,
    Assigned,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal statuses never transition further (except the explicit retry
    /// path, which re-enters `Queued` rather than continuing from `Failed`).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Submitted => "SUBMITTED",
            Self::Queued => "QUEUED",
            Self::Assigned => "ASSIGNED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle status of a [`Worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    Idle,
    Busy,
    Unhealthy,
    Offline,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "IDLE",
            Self::Busy => "BUSY",
            Self::Unhealthy => "UNHEALTHY",
            Self::Offline => "OFFLINE",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for WorkerStatus {
    type Err = std::convert::Infallible;

    /// Unknown strings normalize to `Idle`, per the heartbeat contract.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "BUSY" => Self::Busy,
            "UNHEALTHY" => Self::Unhealthy,
            "OFFLINE" => Self::Offline,
            _ => Self::Idle,
        })
    }
}

/// One unit of work: a command sequence plus an input bundle, carried
/// through submission, scheduling, execution, and completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub command: String,
    pub bundle_ref: String,
    pub bundle_name: String,
    pub required_cpu: f64,
    pub required_ram_mb: i64,
    pub timeout_ms: i64,
    pub max_retries: u32,
    pub attempts: u32,
    pub status: JobStatus,
    pub assigned_worker_id: Option<String>,
    pub cancel_requested: bool,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
    pub result_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub queued_at: Option<DateTime<Utc>>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_streamed_at: Option<DateTime<Utc>>,
}

/// Fields accepted from a job-creation request; resource fields are
/// optional and fall back to [`defaults`].
#[derive(Debug, Clone)]
pub struct NewJob {
    pub command: String,
    pub bundle_ref: String,
    pub bundle_name: String,
    pub required_cpu: Option<f64>,
    pub required_ram_mb: Option<i64>,
    pub timeout_ms: Option<i64>,
    pub max_retries: Option<u32>,
}

impl Job {
    /// Construct a freshly submitted job, already `QUEUED` (the Dispatcher
    /// API never exposes a bare `SUBMITTED` job — creation and queueing are
    /// one atomic step from the caller's point of view).
    pub fn create(job_id: String, req: NewJob, now: DateTime<Utc>) -> Self {
        Self {
            job_id,
            command: req.command,
            bundle_ref: req.bundle_ref,
            bundle_name: req.bundle_name,
            required_cpu: req.required_cpu.unwrap_or(defaults::CPU),
            required_ram_mb: req.required_ram_mb.unwrap_or(defaults::RAM_MB),
            timeout_ms: req.timeout_ms.unwrap_or(defaults::TIMEOUT_MS),
            max_retries: req.max_retries.unwrap_or(defaults::MAX_RETRIES),
            attempts: 0,
            status: JobStatus::Queued,
            assigned_worker_id: None,
            cancel_requested: false,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            error_message: None,
            result_ref: None,
            created_at: now,
            queued_at: Some(now),
            assigned_at: None,
            started_at: None,
            completed_at: None,
            last_streamed_at: None,
        }
    }

    /// A minimal cache-tier projection: the fields `getJobStatus` needs on
    /// the hot path, per §4.1.
    pub fn status_projection(&self) -> JobStatusProjection {
        JobStatusProjection {
            job_id: self.job_id.clone(),
            status: self.status,
            exit_code: self.exit_code,
            error_message: self.error_message.clone(),
            assigned_worker_id: self.assigned_worker_id.clone(),
            attempts: self.attempts,
            created_at: self.created_at,
            queued_at: self.queued_at,
            assigned_at: self.assigned_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

/// The cache-tier shape for a job status read. TTL policy (§4.1): 300s
/// non-terminal, 3600s terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusProjection {
    pub job_id: String,
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
    pub assigned_worker_id: Option<String>,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub queued_at: Option<DateTime<Utc>>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A connected worker agent and the scheduler's resource accounting for
/// it. `camelCase` on the wire: this is the shape `WorkerListResponse`
/// nests directly (unlike `Job`, which is never wire-exposed raw — see
/// `JobProjection`/`WorkerJobView` for its DTOs).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub worker_id: String,
    pub hostname: String,
    pub os: String,
    pub version: String,
    pub cpu_count: f64,
    pub cpu_usage: f64,
    pub ram_total_mb: i64,
    pub ram_free_mb: i64,
    pub status: WorkerStatus,
    pub current_job_ids: HashSet<String>,
    pub reserved_cpu: f64,
    pub reserved_ram_mb: i64,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub health_reason: Option<String>,
    pub last_heartbeat: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted from a worker registration request.
#[derive(Debug, Clone)]
pub struct RegisterWorker {
    pub worker_id: String,
    pub hostname: String,
    pub os: String,
    pub version: String,
    pub cpu_count: f64,
    pub cpu_usage: f64,
    pub ram_total_mb: i64,
    pub ram_free_mb: i64,
}

impl Worker {
    /// Upsert-register: a worker that re-registers clears its reservations
    /// and returns to `IDLE`, per §4.3's `registerWorker` contract.
    pub fn register(req: RegisterWorker, now: DateTime<Utc>, created_at: DateTime<Utc>) -> Self {
        Self {
            worker_id: req.worker_id,
            hostname: req.hostname,
            os: req.os,
            version: req.version,
            cpu_count: req.cpu_count,
            cpu_usage: req.cpu_usage,
            ram_total_mb: req.ram_total_mb,
            ram_free_mb: req.ram_free_mb,
            status: WorkerStatus::Idle,
            current_job_ids: HashSet::new(),
            reserved_cpu: 0.0,
            reserved_ram_mb: 0,
            cooldown_until: None,
            health_reason: None,
            last_heartbeat: now,
            created_at,
            updated_at: now,
        }
    }

    /// Whether this worker is in an eligible pool for Phase C assignment,
    /// ignoring the per-job resource fit (checked separately).
    /// `max_cpu_usage_pct` is the operator-configured ceiling
    /// (`SchedulerConfig::max_cpu_usage_pct`), not a fixed constant.
    pub fn is_eligible_pool(&self, now: DateTime<Utc>, max_cpu_usage_pct: f64) -> bool {
        let in_cooldown = self.cooldown_until.is_some_and(|t| t > now);
        matches!(self.status, WorkerStatus::Idle | WorkerStatus::Busy)
            && !in_cooldown
            && self.cpu_usage <= max_cpu_usage_pct
    }

    /// Whether this worker has enough unreserved capacity for `job`.
    pub fn fits(&self, job: &Job) -> bool {
        self.cpu_count - self.reserved_cpu >= job.required_cpu
            && self.ram_total_mb - self.reserved_ram_mb >= job.required_ram_mb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new_job() -> NewJob {
        NewJob {
            command: "echo hello".to_string(),
            bundle_ref: "blob://abc".to_string(),
            bundle_name: "bundle.zip".to_string(),
            required_cpu: None,
            required_ram_mb: None,
            timeout_ms: None,
            max_retries: None,
        }
    }

    #[test]
    fn create_applies_defaults_and_queues() {
        let now = Utc::now();
        let job = Job::create("j1".to_string(), sample_new_job(), now);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.required_cpu, defaults::CPU);
        assert_eq!(job.required_ram_mb, defaults::RAM_MB);
        assert_eq!(job.timeout_ms, defaults::TIMEOUT_MS);
        assert_eq!(job.max_retries, defaults::MAX_RETRIES);
        assert_eq!(job.attempts, 0);
        assert_eq!(job.queued_at, Some(now));
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
    }

    #[test]
    fn worker_status_from_str_normalizes_unknown_to_idle() {
        assert_eq!("busy".parse::<WorkerStatus>().unwrap(), WorkerStatus::Busy);
        assert_eq!(
            "bogus".parse::<WorkerStatus>().unwrap(),
            WorkerStatus::Idle
        );
    }

    #[test]
    fn fits_checks_both_cpu_and_ram() {
        let now = Utc::now();
        let mut worker = Worker::register(
            RegisterWorker {
                worker_id: "w1".to_string(),
                hostname: "h1".to_string(),
                os: "linux".to_string(),
                version: "1.0".to_string(),
                cpu_count: 2.0,
                cpu_usage: 10.0,
                ram_total_mb: 1024,
                ram_free_mb: 1024,
            },
            now,
            now,
        );
        let mut job = Job::create("j1".to_string(), sample_new_job(), now);
        job.required_cpu = 1.0;
        job.required_ram_mb = 1024;
        assert!(worker.fits(&job));

        worker.reserved_ram_mb = 1; // exactly-equal boundary still fits, 1 short does not
        assert!(!worker.fits(&job));
    }
}
