// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Database models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Benchmark record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BenchmarkRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub provider: String,
    pub model: String,
    pub dataset: String,
    pub status: String,
    pub total_iterations: i32,
    pub completed_iterations: i32,
    pub failed_iterations: i32,
    pub results: Option<serde_json::Value>,
    pub metrics: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

/// Evaluation record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationRecord {
    pub id: Uuid,
    pub benchmark_id: Option<Uuid>,
    pub provider: String,
    pub model: String,
    pub input: String,
    pub output: String,
    pub expected: Option<String>,
    pub metrics: serde_json::Value,
    pub score: f64,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

/// Row shape of the `jobs` table, matching [`crate::dispatch::types::Job`]
/// field for field. `FromRow` lets `sqlx::query_as!` decode it directly.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub job_id: String,
    pub command: String,
    pub bundle_ref: String,
    pub bundle_name: String,
    pub required_cpu: f64,
    pub required_ram_mb: i64,
    pub timeout_ms: i64,
    pub max_retries: i64,
    pub attempts: i64,
    pub status: String,
    pub assigned_worker_id: Option<String>,
    pub cancel_requested: bool,
    pub stdout: String,
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

#[cfg(feature = "database")]
impl JobRow {
    pub async fn fetch(
        pool: &sqlx::PgPool,
        job_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as!(Self, "SELECT * FROM jobs WHERE job_id = $1", job_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn fetch_all(pool: &sqlx::PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as!(Self, "SELECT * FROM jobs ORDER BY created_at ASC")
            .fetch_all(pool)
            .await
    }
}

impl From<JobRow> for crate::dispatch::types::Job {
    fn from(row: JobRow) -> Self {
        use crate::dispatch::types::JobStatus;
        let status = match row.status.as_str() {
            "SUBMITTED" => JobStatus::Submitted,
            "QUEUED" => JobStatus::Queued,
            "ASSIGNED" => JobStatus::Assigned,
            "RUNNING" => JobStatus::Running,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" => JobStatus::Failed,
            _ => JobStatus::Cancelled,
        };
        Self {
            job_id: row.job_id,
            command: row.command,
            bundle_ref: row.bundle_ref,
            bundle_name: row.bundle_name,
            required_cpu: row.required_cpu,
            required_ram_mb: row.required_ram_mb,
            timeout_ms: row.timeout_ms,
            max_retries: row.max_retries as u32,
            attempts: row.attempts as u32,
            status,
            assigned_worker_id: row.assigned_worker_id,
            cancel_requested: row.cancel_requested,
            stdout: row.stdout,
            stderr: row.stderr,
            exit_code: row.exit_code,
            error_message: row.error_message,
            result_ref: row.result_ref,
            created_at: row.created_at,
            queued_at: row.queued_at,
            assigned_at: row.assigned_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            last_streamed_at: row.last_streamed_at,
        }
    }
}

/// Row shape of the `workers` table, matching
/// [`crate::dispatch::types::Worker`] field for field.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkerRow {
    pub worker_id: String,
    pub hostname: String,
    pub os: String,
    pub version: String,
    pub cpu_count: f64,
    pub cpu_usage: f64,
    pub ram_total_mb: i64,
    pub ram_free_mb: i64,
    pub status: String,
    pub current_job_ids: Vec<String>,
    pub reserved_cpu: f64,
    pub reserved_ram_mb: i64,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub health_reason: Option<String>,
    pub last_heartbeat: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl WorkerRow {
    pub async fn fetch(
        pool: &sqlx::PgPool,
        worker_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as!(Self, "SELECT * FROM workers WHERE worker_id = $1", worker_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn fetch_all(pool: &sqlx::PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as!(Self, "SELECT * FROM workers ORDER BY worker_id ASC")
            .fetch_all(pool)
            .await
    }

    pub async fn upsert(
        pool: &sqlx::PgPool,
        worker: &crate::dispatch::types::Worker,
    ) -> Result<(), sqlx::Error> {
        let current_job_ids: Vec<String> = worker.current_job_ids.iter().cloned().collect();
        sqlx::query!(
            r#"
            INSERT INTO workers (
                worker_id, hostname, os, version, cpu_count, cpu_usage,
                ram_total_mb, ram_free_mb, status, current_job_ids,
                reserved_cpu, reserved_ram_mb, cooldown_until, health_reason,
                last_heartbeat, created_at, updated_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)
            ON CONFLICT (worker_id) DO UPDATE SET
                hostname = EXCLUDED.hostname,
                os = EXCLUDED.os,
                version = EXCLUDED.version,
                cpu_count = EXCLUDED.cpu_count,
                cpu_usage = EXCLUDED.cpu_usage,
                ram_total_mb = EXCLUDED.ram_total_mb,
                ram_free_mb = EXCLUDED.ram_free_mb,
                status = EXCLUDED.status,
                current_job_ids = EXCLUDED.current_job_ids,
                reserved_cpu = EXCLUDED.reserved_cpu,
                reserved_ram_mb = EXCLUDED.reserved_ram_mb,
                cooldown_until = EXCLUDED.cooldown_until,
                health_reason = EXCLUDED.health_reason,
                last_heartbeat = EXCLUDED.last_heartbeat,
                updated_at = EXCLUDED.updated_at
            "#,
            worker.worker_id,
            worker.hostname,
            worker.os,
            worker.version,
            worker.cpu_count,
            worker.cpu_usage,
            worker.ram_total_mb,
            worker.ram_free_mb,
            worker.status.to_string(),
            &current_job_ids,
            worker.reserved_cpu,
            worker.reserved_ram_mb,
            worker.cooldown_until,
            worker.health_reason,
            worker.last_heartbeat,
            worker.created_at,
            worker.updated_at,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

impl From<WorkerRow> for crate::dispatch::types::Worker {
    fn from(row: WorkerRow) -> Self {
        Self {
            worker_id: row.worker_id,
            hostname: row.hostname,
            os: row.os,
            version: row.version,
            cpu_count: row.cpu_count,
            cpu_usage: row.cpu_usage,
            ram_total_mb: row.ram_total_mb,
            ram_free_mb: row.ram_free_mb,
            status: row.status.parse().unwrap_or(crate::dispatch::types::WorkerStatus::Idle),
            current_job_ids: row.current_job_ids.into_iter().collect(),
            reserved_cpu: row.reserved_cpu,
            reserved_ram_mb: row.reserved_ram_mb,
            cooldown_until: row.cooldown_until,
            health_reason: row.health_reason,
            last_heartbeat: row.last_heartbeat,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// User record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub active: bool,
    pub email_verified: bool,
    pub metadata: Option<serde_json::Value>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// API key record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub key_hash: String,
    pub name: String,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Audit log record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLogRecord {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub changes: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Benchmark insert data
#[derive(Debug, Clone)]
pub struct NewBenchmark {
    pub name: String,
    pub description: Option<String>,
    pub provider: String,
    pub model: String,
    pub dataset: String,
    pub total_iterations: i32,
    pub created_by: Option<Uuid>,
}

/// Evaluation insert data
#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub benchmark_id: Option<Uuid>,
    pub provider: String,
    pub model: String,
    pub input: String,
    pub output: String,
    pub expected: Option<String>,
    pub metrics: serde_json::Value,
    pub score: f64,
    pub metadata: Option<serde_json::Value>,
    pub created_by: Option<Uuid>,
}

/// User insert data
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

/// API key insert data
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub user_id: Uuid,
    pub key_hash: String,
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Audit log insert data
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub changes: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Benchmark update data
#[derive(Debug, Clone, Default)]
pub struct UpdateBenchmark {
    pub status: Option<String>,
    pub completed_iterations: Option<i32>,
    pub failed_iterations: Option<i32>,
    pub results: Option<serde_json::Value>,
    pub metrics: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_benchmark() {
        let benchmark = NewBenchmark {
            name: "Test Benchmark".to_string(),
            description: Some("Test description".to_string()),
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            dataset: "mmlu".to_string(),
            total_iterations: 100,
            created_by: None,
        };

        assert_eq!(benchmark.name, "Test Benchmark");
        assert_eq!(benchmark.total_iterations, 100);
    }

    #[test]
    fn test_update_benchmark() {
        let update = UpdateBenchmark {
            status: Some("running".to_string()),
            completed_iterations: Some(50),
            ..Default::default()
        };

        assert_eq!(update.status.as_ref().unwrap(), "running");
        assert_eq!(update.completed_iterations.unwrap(), 50);
    }

    #[test]
    fn job_row_round_trips_into_dispatch_job() {
        let now = Utc::now();
        let row = JobRow {
            job_id: "j1".to_string(),
            command: "echo hi".to_string(),
            bundle_ref: "blob://x".to_string(),
            bundle_name: "b.zip".to_string(),
            required_cpu: 1.0,
            required_ram_mb: 256,
            timeout_ms: 300_000,
            max_retries: 3,
            attempts: 0,
            status: "QUEUED".to_string(),
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
        };
        let job: crate::dispatch::types::Job = row.into();
        assert_eq!(job.status, crate::dispatch::types::JobStatus::Queued);
        assert_eq!(job.job_id, "j1");
    }
}
