// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Wire DTOs for the Worker-to-Dispatcher protocol (§6). Every request
//! and response shape here travels as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dispatch::types::{Job, JobStatus, Worker, WorkerStatus};

// ---- /workers/register ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterWorkerRequest {
    pub worker_id: String,
    pub hostname: String,
    pub os: String,
    pub cpu_count: f64,
    pub cpu_usage: f64,
    pub ram_total_mb: i64,
    pub ram_free_mb: i64,
    pub version: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterWorkerResponse {
    pub success: bool,
    pub worker_id: String,
    /// Worker bearer token (§6's HMAC-signed, 24h-expiry token), issued
    /// here since registration is the only point at which a worker has
    /// not yet authenticated anything.
    pub token: String,
}

// ---- /workers/heartbeat ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub worker_id: String,
    pub cpu_usage: f64,
    pub ram_free_mb: i64,
    pub ram_total_mb: i64,
    pub status: String,
    #[serde(default)]
    pub docker_containers: Option<i32>,
    #[serde(default)]
    pub docker_cpu_usage: Option<f64>,
    #[serde(default)]
    pub docker_memory_mb: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

// ---- /workers/list ----

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerListResponse {
    pub workers: Vec<Worker>,
    pub total_workers: usize,
    pub idle_workers: usize,
    pub busy_workers: usize,
    pub unhealthy_workers: usize,
}

impl WorkerListResponse {
    pub fn from_workers(workers: Vec<Worker>) -> Self {
        let idle_workers = workers.iter().filter(|w| w.status == WorkerStatus::Idle).count();
        let busy_workers = workers.iter().filter(|w| w.status == WorkerStatus::Busy).count();
        let unhealthy_workers = workers
            .iter()
            .filter(|w| w.status == WorkerStatus::Unhealthy)
            .count();
        Self {
            total_workers: workers.len(),
            idle_workers,
            busy_workers,
            unhealthy_workers,
            workers,
        }
    }
}

// ---- /workers/{workerId} DELETE ----

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteWorkerResponse {
    pub success: bool,
    pub existed: bool,
}

// ---- /jobs/create ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub command: String,
    pub bundle_ref: String,
    pub bundle_name: String,
    #[serde(default)]
    pub required_cpu: Option<f64>,
    #[serde(default)]
    pub required_ram_mb: Option<i64>,
    #[serde(default)]
    pub timeout_ms: Option<i64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobResponse {
    pub success: bool,
    pub job_id: String,
}

// ---- /jobs/get-job ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetJobQuery {
    pub worker_id: String,
}

/// The minimal job shape a worker needs to start execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerJobView {
    pub job_id: String,
    pub command: String,
    pub bundle_ref: String,
    pub bundle_name: String,
    pub timeout_ms: i64,
}

impl From<&Job> for WorkerJobView {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.job_id.clone(),
            command: job.command.clone(),
            bundle_ref: job.bundle_ref.clone(),
            bundle_name: job.bundle_name.clone(),
            timeout_ms: job.timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetJobResponse {
    pub success: bool,
    pub job: Option<WorkerJobView>,
}

// ---- /jobs/stream-output ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOutputRequest {
    pub job_id: String,
    pub data: String,
    #[serde(rename = "type")]
    pub kind: StreamKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOutputResponse {
    pub success: bool,
}

// ---- /jobs/submit-result (POST: success path) ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResultRequest {
    pub job_id: String,
    pub worker_id: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    #[serde(default)]
    pub result_ref: Option<String>,
    #[serde(default)]
    pub result_name: Option<String>,
}

// ---- /jobs/submit-result (PUT: failure path) ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFailureRequest {
    pub job_id: String,
    pub worker_id: String,
    pub error_message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResultResponse {
    pub success: bool,
    pub job_id: String,
}

// ---- /jobs/status, /jobs/list ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusQuery {
    pub job_id: String,
}

/// Full job projection returned by `/jobs/status` and `/jobs/list`,
/// distinct from [`WorkerJobView`] (workers only ever see the fields
/// needed to execute, never the other party's bookkeeping).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProjection {
    pub job_id: String,
    pub command: String,
    pub status: JobStatus,
    pub assigned_worker_id: Option<String>,
    pub attempts: u32,
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
    pub result_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub queued_at: Option<DateTime<Utc>>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Job> for JobProjection {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.job_id.clone(),
            command: job.command.clone(),
            status: job.status,
            assigned_worker_id: job.assigned_worker_id.clone(),
            attempts: job.attempts,
            exit_code: job.exit_code,
            error_message: job.error_message.clone(),
            result_ref: job.result_ref.clone(),
            created_at: job.created_at,
            queued_at: job.queued_at,
            assigned_at: job.assigned_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

// ---- /jobs/cancel ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelJobRequest {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelJobResponse {
    pub success: bool,
    pub message: String,
}

// ---- /jobs/check-cancel ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckCancelQuery {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckCancelResponse {
    pub success: bool,
    pub cancel_requested: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_list_response_tallies_by_status() {
        use crate::dispatch::types::RegisterWorker;
        let now = Utc::now();
        let mut busy = Worker::register(
            RegisterWorker {
                worker_id: "w1".to_string(),
                hostname: "h1".to_string(),
                os: "linux".to_string(),
                version: "1.0".to_string(),
                cpu_count: 4.0,
                cpu_usage: 10.0,
                ram_total_mb: 4096,
                ram_free_mb: 4096,
            },
            now,
            now,
        );
        busy.status = WorkerStatus::Busy;
        let idle = Worker::register(
            RegisterWorker {
                worker_id: "w2".to_string(),
                hostname: "h2".to_string(),
                os: "linux".to_string(),
                version: "1.0".to_string(),
                cpu_count: 4.0,
                cpu_usage: 10.0,
                ram_total_mb: 4096,
                ram_free_mb: 4096,
            },
            now,
            now,
        );
        let response = WorkerListResponse::from_workers(vec![busy, idle]);
        assert_eq!(response.total_workers, 2);
        assert_eq!(response.busy_workers, 1);
        assert_eq!(response.idle_workers, 1);
        assert_eq!(response.unhealthy_workers, 0);
    }

    #[test]
    fn worker_job_view_hides_bookkeeping_fields() {
        use crate::dispatch::types::NewJob;
        let job = Job::create(
            "j1".to_string(),
            NewJob {
                command: "echo hi".to_string(),
                bundle_ref: "blob://x".to_string(),
                bundle_name: "b.zip".to_string(),
                required_cpu: None,
                required_ram_mb: None,
                timeout_ms: None,
                max_retries: None,
            },
            Utc::now(),
        );
        let view = WorkerJobView::from(&job);
        assert_eq!(view.job_id, "j1");
        assert_eq!(view.command, "echo hi");
    }
}
