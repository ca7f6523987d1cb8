// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The Registry: typed access to Jobs and Workers, backed by an
//! authoritative tier ([`MemoryRegistry`] or, with the `database` feature,
//! [`PostgresRegistry`]) plus a lightweight TTL cache tier for the
//! high-traffic status/cancel-flag reads.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::dispatch::error::RegistryError;
use crate::dispatch::types::{Job, JobStatusProjection, Worker};

/// TTL for a cached non-terminal job status read.
const STATUS_CACHE_TTL_NON_TERMINAL: Duration = Duration::from_secs(300);
/// TTL for a cached terminal job status read (these never change again).
const STATUS_CACHE_TTL_TERMINAL: Duration = Duration::from_secs(3600);
/// TTL for a cached cancel flag.
const CANCEL_CACHE_TTL: Duration = Duration::from_secs(120);

/// Typed, backend-agnostic access to the Job and Worker authoritative
/// state, plus the cache tier used on the worker-polling hot path.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn put_job(&self, job: Job) -> Result<(), RegistryError>;
    async fn get_job(&self, job_id: &str) -> Result<Job, RegistryError>;
    async fn list_jobs(&self) -> Result<Vec<Job>, RegistryError>;

    async fn put_worker(&self, worker: Worker) -> Result<(), RegistryError>;
    async fn get_worker(&self, worker_id: &str) -> Result<Worker, RegistryError>;
    async fn list_workers(&self) -> Result<Vec<Worker>, RegistryError>;
    async fn delete_worker(&self, worker_id: &str) -> Result<(), RegistryError>;

    /// Populate the job-status cache tier. Callers choose the TTL bucket
    /// via `JobStatusProjection::status.is_terminal()`.
    fn cache_job_status(&self, projection: JobStatusProjection);
    /// Read the job-status cache tier; `None` on miss or expiry.
    fn cached_job_status(&self, job_id: &str) -> Option<JobStatusProjection>;

    /// Populate the cancel-flag cache tier.
    fn cache_cancel_flag(&self, job_id: &str, cancelled: bool);
    /// Read the cancel-flag cache tier; `None` on miss or expiry.
    fn cached_cancel_flag(&self, job_id: &str) -> Option<bool>;
}

struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

/// In-memory authoritative tier plus the shared cache tier. Grounded in the
/// teacher's dashmap-backed cluster state: concurrent reads/writes without
/// an external lock, sharded internally by `dashmap`.
pub struct MemoryRegistry {
    jobs: DashMap<String, Job>,
    workers: DashMap<String, Worker>,
    status_cache: DashMap<String, CacheEntry<JobStatusProjection>>,
    cancel_cache: DashMap<String, CacheEntry<bool>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
            workers: DashMap::new(),
            status_cache: DashMap::new(),
            cancel_cache: DashMap::new(),
        }
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn put_job(&self, job: Job) -> Result<(), RegistryError> {
        self.jobs.insert(job.job_id.clone(), job);
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, RegistryError> {
        self.jobs
            .get(job_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| RegistryError::JobNotFound(job_id.to_string()))
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, RegistryError> {
        Ok(self.jobs.iter().map(|r| r.value().clone()).collect())
    }

    async fn put_worker(&self, worker: Worker) -> Result<(), RegistryError> {
        self.workers.insert(worker.worker_id.clone(), worker);
        Ok(())
    }

    async fn get_worker(&self, worker_id: &str) -> Result<Worker, RegistryError> {
        self.workers
            .get(worker_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| RegistryError::WorkerNotFound(worker_id.to_string()))
    }

    async fn list_workers(&self) -> Result<Vec<Worker>, RegistryError> {
        Ok(self.workers.iter().map(|r| r.value().clone()).collect())
    }

    async fn delete_worker(&self, worker_id: &str) -> Result<(), RegistryError> {
        self.workers.remove(worker_id);
        Ok(())
    }

    fn cache_job_status(&self, projection: JobStatusProjection) {
        let ttl = if projection.status.is_terminal() {
            STATUS_CACHE_TTL_TERMINAL
        } else {
            STATUS_CACHE_TTL_NON_TERMINAL
        };
        self.status_cache.insert(
            projection.job_id.clone(),
            CacheEntry {
                value: projection,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn cached_job_status(&self, job_id: &str) -> Option<JobStatusProjection> {
        let entry = self.status_cache.get(job_id)?;
        if entry.expires_at < Instant::now() {
            drop(entry);
            self.status_cache.remove(job_id);
            return None;
        }
        Some(entry.value.clone())
    }

    fn cache_cancel_flag(&self, job_id: &str, cancelled: bool) {
        self.cancel_cache.insert(
            job_id.to_string(),
            CacheEntry {
                value: cancelled,
                expires_at: Instant::now() + CANCEL_CACHE_TTL,
            },
        );
    }

    fn cached_cancel_flag(&self, job_id: &str) -> Option<bool> {
        let entry = self.cancel_cache.get(job_id)?;
        if entry.expires_at < Instant::now() {
            drop(entry);
            self.cancel_cache.remove(job_id);
            return None;
        }
        Some(entry.value)
    }
}

/// PostgreSQL-backed authoritative tier, sharing the same in-process cache
/// tier shape as [`MemoryRegistry`]. Grounded in the teacher's
/// `JobRepository`/`WorkerRepository` `query_as!` idiom.
#[cfg(feature = "database")]
pub struct PostgresRegistry {
    pool: sqlx::PgPool,
    status_cache: DashMap<String, CacheEntry<JobStatusProjection>>,
    cancel_cache: DashMap<String, CacheEntry<bool>>,
    // Monotonic counter used only to prove the cache tier is exercised
    // independently of the database round trip in tests.
    cache_hits: AtomicI64,
}

#[cfg(feature = "database")]
impl PostgresRegistry {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            pool,
            status_cache: DashMap::new(),
            cancel_cache: DashMap::new(),
            cache_hits: AtomicI64::new(0),
        }
    }

    pub fn cache_hit_count(&self) -> i64 {
        self.cache_hits.load(Ordering::Relaxed)
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl Registry for PostgresRegistry {
    async fn put_job(&self, job: Job) -> Result<(), RegistryError> {
        sqlx::query!(
            r#"
            INSERT INTO jobs (
                job_id, command, bundle_ref, bundle_name, required_cpu,
                required_ram_mb, timeout_ms, max_retries, attempts, status,
                assigned_worker_id, cancel_requested, stdout, stderr,
                exit_code, error_message, result_ref, created_at, queued_at,
                assigned_at, started_at, completed_at, last_streamed_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,$23)
            ON CONFLICT (job_id) DO UPDATE SET
                status = EXCLUDED.status,
                attempts = EXCLUDED.attempts,
                assigned_worker_id = EXCLUDED.assigned_worker_id,
                cancel_requested = EXCLUDED.cancel_requested,
                stdout = EXCLUDED.stdout,
                stderr = EXCLUDED.stderr,
                exit_code = EXCLUDED.exit_code,
                error_message = EXCLUDED.error_message,
                result_ref = EXCLUDED.result_ref,
                queued_at = EXCLUDED.queued_at,
                assigned_at = EXCLUDED.assigned_at,
                started_at = EXCLUDED.started_at,
                completed_at = EXCLUDED.completed_at,
                last_streamed_at = EXCLUDED.last_streamed_at
            "#,
            job.job_id,
            job.command,
            job.bundle_ref,
            job.bundle_name,
            job.required_cpu,
            job.required_ram_mb,
            job.timeout_ms,
            job.max_retries as i64,
            job.attempts as i64,
            job.status.to_string(),
            job.assigned_worker_id,
            job.cancel_requested,
            job.stdout,
            job.stderr,
            job.exit_code,
            job.error_message,
            job.result_ref,
            job.created_at,
            job.queued_at,
            job.assigned_at,
            job.started_at,
            job.completed_at,
            job.last_streamed_at,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, RegistryError> {
        let row = crate::database::models::JobRow::fetch(&self.pool, job_id)
            .await?
            .ok_or_else(|| RegistryError::JobNotFound(job_id.to_string()))?;
        Ok(row.into())
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, RegistryError> {
        let rows = crate::database::models::JobRow::fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn put_worker(&self, worker: Worker) -> Result<(), RegistryError> {
        crate::database::models::WorkerRow::upsert(&self.pool, &worker).await?;
        Ok(())
    }

    async fn get_worker(&self, worker_id: &str) -> Result<Worker, RegistryError> {
        let row = crate::database::models::WorkerRow::fetch(&self.pool, worker_id)
            .await?
            .ok_or_else(|| RegistryError::WorkerNotFound(worker_id.to_string()))?;
        Ok(row.into())
    }

    async fn list_workers(&self) -> Result<Vec<Worker>, RegistryError> {
        let rows = crate::database::models::WorkerRow::fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_worker(&self, worker_id: &str) -> Result<(), RegistryError> {
        sqlx::query!("DELETE FROM workers WHERE worker_id = $1", worker_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn cache_job_status(&self, projection: JobStatusProjection) {
        let ttl = if projection.status.is_terminal() {
            STATUS_CACHE_TTL_TERMINAL
        } else {
            STATUS_CACHE_TTL_NON_TERMINAL
        };
        self.status_cache.insert(
            projection.job_id.clone(),
            CacheEntry {
                value: projection,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn cached_job_status(&self, job_id: &str) -> Option<JobStatusProjection> {
        let entry = self.status_cache.get(job_id)?;
        if entry.expires_at < Instant::now() {
            drop(entry);
            self.status_cache.remove(job_id);
            return None;
        }
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.value.clone())
    }

    fn cache_cancel_flag(&self, job_id: &str, cancelled: bool) {
        self.cancel_cache.insert(
            job_id.to_string(),
            CacheEntry {
                value: cancelled,
                expires_at: Instant::now() + CANCEL_CACHE_TTL,
            },
        );
    }

    fn cached_cancel_flag(&self, job_id: &str) -> Option<bool> {
        let entry = self.cancel_cache.get(job_id)?;
        if entry.expires_at < Instant::now() {
            drop(entry);
            self.cancel_cache.remove(job_id);
            return None;
        }
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::types::{JobStatus, NewJob, RegisterWorker};
    use chrono::Utc;

    fn sample_job(id: &str) -> Job {
        Job::create(
            id.to_string(),
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
        )
    }

    #[tokio::test]
    async fn put_and_get_job_round_trips() {
        let reg = MemoryRegistry::new();
        reg.put_job(sample_job("j1")).await.unwrap();
        let got = reg.get_job("j1").await.unwrap();
        assert_eq!(got.job_id, "j1");
        assert_eq!(got.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn get_missing_job_errors() {
        let reg = MemoryRegistry::new();
        let err = reg.get_job("missing").await.unwrap_err();
        assert!(matches!(err, RegistryError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn worker_delete_removes_from_list() {
        let reg = MemoryRegistry::new();
        let now = Utc::now();
        reg.put_worker(Worker::register(
            RegisterWorker {
                worker_id: "w1".to_string(),
                hostname: "h".to_string(),
                os: "linux".to_string(),
                version: "1.0".to_string(),
                cpu_count: 4.0,
                cpu_usage: 5.0,
                ram_total_mb: 8192,
                ram_free_mb: 8192,
            },
            now,
            now,
        ))
        .await
        .unwrap();
        assert_eq!(reg.list_workers().await.unwrap().len(), 1);
        reg.delete_worker("w1").await.unwrap();
        assert_eq!(reg.list_workers().await.unwrap().len(), 0);
    }

    #[test]
    fn status_cache_respects_ttl_buckets() {
        let reg = MemoryRegistry::new();
        let projection = sample_job("j1").status_projection();
        reg.cache_job_status(projection.clone());
        assert!(reg.cached_job_status("j1").is_some());
        assert!(reg.cached_job_status("missing").is_none());
    }

    #[test]
    fn cancel_flag_cache_round_trips() {
        let reg = MemoryRegistry::new();
        reg.cache_cancel_flag("j1", true);
        assert_eq!(reg.cached_cancel_flag("j1"), Some(true));
        assert_eq!(reg.cached_cancel_flag("missing"), None);
    }
}
