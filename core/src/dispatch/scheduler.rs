// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The Scheduler: a single logical actor that, on trigger, refreshes
//! worker health, reclaims timed-out jobs, and assigns queued jobs to
//! eligible workers by weighted score.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::dispatch::error::SchedulerError;
use crate::dispatch::registry::Registry;
use crate::dispatch::types::{Job, JobStatus, Worker, WorkerStatus};

/// Tunable knobs governing the three scheduler phases.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub heartbeat_timeout: ChronoDuration,
    pub cooldown: ChronoDuration,
    pub max_cpu_usage_pct: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: ChronoDuration::seconds(30),
            cooldown: ChronoDuration::seconds(30),
            max_cpu_usage_pct: 90.0,
        }
    }
}

/// Extension point for a distributed scheduler lease. The single-node
/// in-process [`Mutex`] below is the only shipped implementation; a
/// Postgres-advisory-lock-backed implementation is the natural multi-node
/// extension and is intentionally not implemented here (see DESIGN.md).
#[async_trait]
pub trait SchedulerLock: Send + Sync {
    async fn try_acquire(&self) -> bool;
    async fn release(&self);
}

/// The Scheduler's exclusive section plus trigger coalescing. One process
/// holds one `Scheduler`; multiple callers invoke [`Scheduler::trigger`]
/// concurrently, and get coalesced into the in-flight or next run.
///
/// Holds the Registry as a trait object rather than a generic parameter
/// so the Dispatcher API's `AppState` and the Worker Agent can both share
/// one `Scheduler` type regardless of which Registry backend is active.
pub struct Scheduler {
    registry: Arc<dyn Registry>,
    config: SchedulerConfig,
    run_lock: Mutex<()>,
    rerun_requested: AtomicBool,
}

impl Scheduler {
    pub fn new(registry: Arc<dyn Registry>, config: SchedulerConfig) -> Self {
        Self {
            registry,
            config,
            run_lock: Mutex::new(()),
            rerun_requested: AtomicBool::new(false),
        }
    }

    /// Request a scheduler run. If a run is already in flight, this just
    /// flags a rerun and returns immediately rather than queuing a second
    /// concurrent run — trigger storms collapse into at most one extra
    /// pass after the in-flight one completes.
    pub async fn trigger(&self) -> Result<(), SchedulerError> {
        if let Ok(_guard) = self.run_lock.try_lock() {
            self.run_once().await?;
            while self.rerun_requested.swap(false, Ordering::AcqRel) {
                self.run_once().await?;
            }
            Ok(())
        } else {
            self.rerun_requested.store(true, Ordering::Release);
            Ok(())
        }
    }

    async fn run_once(&self) -> Result<(), SchedulerError> {
        let now = Utc::now();
        self.phase_a_health_refresh(now).await?;
        self.phase_b_timeout_reclamation(now).await?;
        self.phase_c_assignment(now).await?;
        Ok(())
    }

    async fn phase_a_health_refresh(&self, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        for worker in self.registry.list_workers().await? {
            let mut worker = worker;
            let in_cooldown = worker.cooldown_until.is_some_and(|t| t > now);

            if in_cooldown {
                if worker.status != WorkerStatus::Unhealthy {
                    worker.status = WorkerStatus::Unhealthy;
                    worker.health_reason = Some("cooldown".to_string());
                    worker.updated_at = now;
                    self.registry.put_worker(worker).await?;
                }
                continue;
            }

            let stale = now - worker.last_heartbeat > self.config.heartbeat_timeout;
            if stale {
                if worker.status != WorkerStatus::Offline {
                    self.release_worker_jobs(&mut worker, now).await?;
                    worker.status = WorkerStatus::Offline;
                    worker.health_reason = Some("heartbeat_timeout".to_string());
                    worker.updated_at = now;
                    self.registry.put_worker(worker).await?;
                    warn!("worker went offline on heartbeat timeout");
                }
                continue;
            }

            if matches!(worker.status, WorkerStatus::Offline | WorkerStatus::Unhealthy) {
                worker.status = if worker.current_job_ids.is_empty() {
                    WorkerStatus::Idle
                } else {
                    WorkerStatus::Busy
                };
                worker.health_reason = None;
                worker.updated_at = now;
                self.registry.put_worker(worker).await?;
            }
        }
        Ok(())
    }

    async fn phase_b_timeout_reclamation(&self, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        for job in self.registry.list_jobs().await? {
            if job.status != JobStatus::Running {
                continue;
            }
            let Some(started_at) = job.started_at else {
                continue;
            };
            let deadline = started_at + ChronoDuration::milliseconds(job.timeout_ms);
            if deadline >= now {
                continue;
            }

            let mut job = job;
            if let Some(worker_id) = job.assigned_worker_id.clone() {
                if let Ok(mut worker) = self.registry.get_worker(&worker_id).await {
                    self.release_job_from_worker(&mut worker, &job, now).await?;
                    self.registry.put_worker(worker).await?;
                }
            }

            if job.attempts + 1 > job.max_retries {
                job.status = JobStatus::Failed;
                job.error_message = Some("Execution timeout".to_string());
                job.completed_at = Some(now);
            } else {
                job.status = JobStatus::Queued;
                job.queued_at = Some(now);
                job.attempts += 1;
                job.error_message = Some("Execution timeout".to_string());
            }
            job.assigned_worker_id = None;
            job.assigned_at = None;
            job.started_at = None;
            self.registry.put_job(job).await?;
            info!("reclaimed timed-out job");
        }
        Ok(())
    }

    async fn phase_c_assignment(&self, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        let mut queued: Vec<Job> = self
            .registry
            .list_jobs()
            .await?
            .into_iter()
            .filter(|j| j.status == JobStatus::Queued)
            .collect();
        queued.sort_by_key(|j| j.queued_at.unwrap_or(j.created_at));

        for job in queued {
            let workers = self.registry.list_workers().await?;
            let mut candidates: Vec<Worker> = workers
                .into_iter()
                .filter(|w| w.is_eligible_pool(now, self.config.max_cpu_usage_pct))
                .filter(|w| w.fits(&job))
                .collect();
            if candidates.is_empty() {
                continue;
            }

            candidates.sort_by(|a, b| {
                score(a)
                    .partial_cmp(&score(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.last_heartbeat.cmp(&a.last_heartbeat))
                    .then_with(|| a.worker_id.cmp(&b.worker_id))
            });
            let mut winner = candidates.into_iter().next().expect("non-empty candidates");

            let mut job = job;
            winner.reserved_cpu += job.required_cpu;
            winner.reserved_ram_mb += job.required_ram_mb;
            winner.current_job_ids.insert(job.job_id.clone());
            winner.status = WorkerStatus::Busy;
            winner.updated_at = now;

            job.status = JobStatus::Assigned;
            job.assigned_worker_id = Some(winner.worker_id.clone());
            job.assigned_at = Some(now);

            self.registry.put_worker(winner).await?;
            self.registry.put_job(job).await?;
            debug!("assigned queued job");
        }
        Ok(())
    }

    /// Job release protocol (§4.2), steps 1-3 applied to the worker side.
    /// Callers still need to clear the job's own assignment fields (step
    /// 4) and decide requeue-vs-terminal (step 5).
    async fn release_job_from_worker(
        &self,
        worker: &mut Worker,
        job: &Job,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        worker.reserved_cpu = (worker.reserved_cpu - job.required_cpu).max(0.0);
        worker.reserved_ram_mb = (worker.reserved_ram_mb - job.required_ram_mb).max(0);
        worker.current_job_ids.remove(&job.job_id);
        if worker.current_job_ids.is_empty() && worker.status != WorkerStatus::Offline {
            worker.status = WorkerStatus::Idle;
        }
        worker.updated_at = now;
        Ok(())
    }

    /// Release every job currently assigned to `worker` (used by Phase A's
    /// heartbeat-timeout path and by the failure penalty), each
    /// individually evaluated for retry vs. permanent failure.
    async fn release_worker_jobs(
        &self,
        worker: &mut Worker,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let job_ids: Vec<String> = worker.current_job_ids.iter().cloned().collect();
        for job_id in job_ids {
            let Ok(mut job) = self.registry.get_job(&job_id).await else {
                continue;
            };
            if job.status.is_terminal() {
                worker.current_job_ids.remove(&job_id);
                continue;
            }
            self.release_job_from_worker(worker, &job, now).await?;
            // `attempts` is incremented at `pollJob`, not at assignment: a
            // job that was only ASSIGNED (never polled) goes back to the
            // queue unchanged. Only a job that had actually started
            // (RUNNING) counts this release as a spent attempt.
            if job.status == JobStatus::Running {
                if job.attempts + 1 > job.max_retries {
                    job.status = JobStatus::Failed;
                    job.error_message = Some("Worker went offline".to_string());
                    job.completed_at = Some(now);
                } else {
                    job.status = JobStatus::Queued;
                    job.queued_at = Some(now);
                    job.attempts += 1;
                }
            } else {
                job.status = JobStatus::Queued;
                job.queued_at = Some(now);
            }
            job.assigned_worker_id = None;
            job.assigned_at = None;
            job.started_at = None;
            self.registry.put_job(job).await?;
        }
        Ok(())
    }

    /// Apply the failure penalty to a worker that self-reported a job
    /// failure: cooldown plus release of all its current jobs.
    pub async fn apply_failure_penalty(
        &self,
        worker_id: &str,
        reason: String,
    ) -> Result<(), SchedulerError> {
        let now = Utc::now();
        let mut worker = self.registry.get_worker(worker_id).await?;
        worker.status = WorkerStatus::Unhealthy;
        worker.cooldown_until = Some(now + self.config.cooldown);
        worker.health_reason = Some(reason);
        self.release_worker_jobs(&mut worker, now).await?;
        self.registry.put_worker(worker).await?;
        Ok(())
    }

    /// `pollJob` (§4.3): the single job currently `ASSIGNED` to `worker_id`,
    /// if any, atomically transitioned to `RUNNING`. Callers trigger the
    /// Scheduler themselves before calling this.
    pub async fn poll_job(&self, worker_id: &str) -> Result<Option<Job>, SchedulerError> {
        let now = Utc::now();
        let assigned = self
            .registry
            .list_jobs()
            .await?
            .into_iter()
            .find(|j| j.status == JobStatus::Assigned && j.assigned_worker_id.as_deref() == Some(worker_id));

        let Some(mut job) = assigned else {
            return Ok(None);
        };
        job.status = JobStatus::Running;
        job.started_at = Some(now);
        job.attempts += 1;
        self.registry.put_job(job.clone()).await?;
        Ok(Some(job))
    }

    /// `cancelJob` (§4.3). `RUNNING` jobs get a cooperative cancel flag;
    /// `QUEUED`/`ASSIGNED` jobs are released and marked `CANCELLED`
    /// immediately since no worker is actively executing them yet.
    pub async fn cancel_job(&self, job_id: &str) -> Result<(), SchedulerError> {
        let now = Utc::now();
        let mut job = self.registry.get_job(job_id).await?;

        match job.status {
            JobStatus::Running => {
                job.cancel_requested = true;
                self.registry.put_job(job).await?;
            }
            JobStatus::Queued => {
                job.status = JobStatus::Cancelled;
                job.error_message = Some("Job cancelled by user".to_string());
                job.completed_at = Some(now);
                self.registry.put_job(job).await?;
            }
            JobStatus::Assigned => {
                if let Some(worker_id) = job.assigned_worker_id.clone() {
                    if let Ok(mut worker) = self.registry.get_worker(&worker_id).await {
                        self.release_job_from_worker(&mut worker, &job, now).await?;
                        self.registry.put_worker(worker).await?;
                    }
                }
                job.status = JobStatus::Cancelled;
                job.error_message = Some("Job cancelled by user".to_string());
                job.completed_at = Some(now);
                job.assigned_worker_id = None;
                job.assigned_at = None;
                self.registry.put_job(job).await?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Weighted scheduling score (§4.2); lower is better.
fn score(worker: &Worker) -> f64 {
    let free_cpu = worker.cpu_count - worker.reserved_cpu;
    let free_ram = (worker.ram_total_mb - worker.reserved_ram_mb) as f64;
    0.6 * worker.cpu_usage
        + 0.3 * (worker.reserved_cpu / worker.cpu_count) * 100.0
        + 0.1 * (worker.reserved_ram_mb as f64 / worker.ram_total_mb as f64) * 100.0
        + 5.0 / free_cpu
        + 0.01 / free_ram
}

/// Single-node scheduler lease: always immediately acquirable, since the
/// process-local [`Mutex`] already serializes runs. Kept so call sites can
/// depend on [`SchedulerLock`] without caring whether they're single- or
/// multi-node.
pub struct LocalSchedulerLock;

#[async_trait]
impl SchedulerLock for LocalSchedulerLock {
    async fn try_acquire(&self) -> bool {
        true
    }

    async fn release(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::registry::MemoryRegistry;
    use crate::dispatch::types::{NewJob, RegisterWorker};

    fn new_job(id: &str, cpu: f64, ram_mb: i64) -> Job {
        let mut job = Job::create(
            id.to_string(),
            NewJob {
                command: "echo hi".to_string(),
                bundle_ref: "blob://x".to_string(),
                bundle_name: "b.zip".to_string(),
                required_cpu: Some(cpu),
                required_ram_mb: Some(ram_mb),
                timeout_ms: Some(60_000),
                max_retries: Some(3),
            },
            Utc::now(),
        );
        job.queued_at = Some(Utc::now());
        job
    }

    fn new_worker(id: &str, cpu: f64, ram_mb: i64, usage: f64) -> Worker {
        Worker::register(
            RegisterWorker {
                worker_id: id.to_string(),
                hostname: id.to_string(),
                os: "linux".to_string(),
                version: "1.0".to_string(),
                cpu_count: cpu,
                cpu_usage: usage,
                ram_total_mb: ram_mb,
                ram_free_mb: ram_mb,
            },
            Utc::now(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn assigns_queued_job_to_fitting_idle_worker() {
        let registry = Arc::new(MemoryRegistry::new());
        registry
            .put_worker(new_worker("w1", 4.0, 4096, 10.0))
            .await
            .unwrap();
        registry.put_job(new_job("j1", 1.0, 256)).await.unwrap();

        let scheduler = Scheduler::new(registry.clone(), SchedulerConfig::default());
        scheduler.trigger().await.unwrap();

        let job = registry.get_job("j1").await.unwrap();
        assert_eq!(job.status, JobStatus::Assigned);
        assert_eq!(job.assigned_worker_id.as_deref(), Some("w1"));

        let worker = registry.get_worker("w1").await.unwrap();
        assert_eq!(worker.status, WorkerStatus::Busy);
        assert_eq!(worker.reserved_cpu, 1.0);
        assert!(worker.current_job_ids.contains("j1"));
    }

    #[tokio::test]
    async fn prefers_lower_score_worker() {
        let registry = Arc::new(MemoryRegistry::new());
        registry
            .put_worker(new_worker("busy", 4.0, 4096, 80.0))
            .await
            .unwrap();
        registry
            .put_worker(new_worker("idle", 4.0, 4096, 5.0))
            .await
            .unwrap();
        registry.put_job(new_job("j1", 1.0, 256)).await.unwrap();

        let scheduler = Scheduler::new(registry.clone(), SchedulerConfig::default());
        scheduler.trigger().await.unwrap();

        let job = registry.get_job("j1").await.unwrap();
        assert_eq!(job.assigned_worker_id.as_deref(), Some("idle"));
    }

    #[tokio::test]
    async fn job_with_no_eligible_worker_stays_queued() {
        let registry = Arc::new(MemoryRegistry::new());
        registry
            .put_worker(new_worker("w1", 1.0, 512, 10.0))
            .await
            .unwrap();
        registry.put_job(new_job("j1", 4.0, 4096)).await.unwrap();

        let scheduler = Scheduler::new(registry.clone(), SchedulerConfig::default());
        scheduler.trigger().await.unwrap();

        let job = registry.get_job("j1").await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn timed_out_running_job_requeues_under_retry_budget() {
        let registry = Arc::new(MemoryRegistry::new());
        let mut worker = new_worker("w1", 4.0, 4096, 10.0);
        worker.status = WorkerStatus::Busy;
        worker.current_job_ids.insert("j1".to_string());
        worker.reserved_cpu = 1.0;
        worker.reserved_ram_mb = 256;
        registry.put_worker(worker).await.unwrap();

        let mut job = new_job("j1", 1.0, 256);
        job.status = JobStatus::Running;
        job.assigned_worker_id = Some("w1".to_string());
        job.started_at = Some(Utc::now() - ChronoDuration::milliseconds(job.timeout_ms + 1000));
        registry.put_job(job).await.unwrap();

        let scheduler = Scheduler::new(registry.clone(), SchedulerConfig::default());
        scheduler.trigger().await.unwrap();

        let job = registry.get_job("j1").await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.attempts, 1);

        let worker = registry.get_worker("w1").await.unwrap();
        assert_eq!(worker.reserved_cpu, 0.0);
        assert!(worker.current_job_ids.is_empty());
    }

    #[tokio::test]
    async fn offline_release_of_unpolled_assigned_job_leaves_attempts_unchanged() {
        let registry = Arc::new(MemoryRegistry::new());
        let mut worker = new_worker("w1", 4.0, 4096, 10.0);
        worker.status = WorkerStatus::Busy;
        worker.current_job_ids.insert("j1".to_string());
        worker.reserved_cpu = 1.0;
        worker.reserved_ram_mb = 256;
        worker.last_heartbeat = Utc::now() - ChronoDuration::seconds(60);
        registry.put_worker(worker).await.unwrap();

        let mut job = new_job("j1", 1.0, 256);
        job.status = JobStatus::Assigned;
        job.assigned_worker_id = Some("w1".to_string());
        job.assigned_at = Some(Utc::now());
        registry.put_job(job).await.unwrap();

        let scheduler = Scheduler::new(
            registry.clone(),
            SchedulerConfig {
                heartbeat_timeout: ChronoDuration::seconds(30),
                ..SchedulerConfig::default()
            },
        );
        scheduler.trigger().await.unwrap();

        let worker = registry.get_worker("w1").await.unwrap();
        assert_eq!(worker.status, WorkerStatus::Offline);

        let job = registry.get_job("j1").await.unwrap();
        assert_eq!(job.attempts, 0);
    }

    #[tokio::test]
    async fn failure_penalty_sets_cooldown_and_releases_jobs() {
        let registry = Arc::new(MemoryRegistry::new());
        let mut worker = new_worker("w1", 4.0, 4096, 10.0);
        worker.status = WorkerStatus::Busy;
        worker.current_job_ids.insert("j1".to_string());
        worker.reserved_cpu = 1.0;
        worker.reserved_ram_mb = 256;
        registry.put_worker(worker).await.unwrap();

        let mut job = new_job("j1", 1.0, 256);
        job.status = JobStatus::Running;
        job.assigned_worker_id = Some("w1".to_string());
        job.started_at = Some(Utc::now());
        registry.put_job(job).await.unwrap();

        let scheduler = Scheduler::new(registry.clone(), SchedulerConfig::default());
        scheduler
            .apply_failure_penalty("w1", "boom".to_string())
            .await
            .unwrap();

        let worker = registry.get_worker("w1").await.unwrap();
        assert_eq!(worker.status, WorkerStatus::Unhealthy);
        assert!(worker.cooldown_until.is_some());

        let job = registry.get_job("j1").await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.attempts, 1);
    }

    #[tokio::test]
    async fn poll_job_transitions_assigned_to_running() {
        let registry = Arc::new(MemoryRegistry::new());
        let mut job = new_job("j1", 1.0, 256);
        job.status = JobStatus::Assigned;
        job.assigned_worker_id = Some("w1".to_string());
        registry.put_job(job).await.unwrap();

        let scheduler = Scheduler::new(registry.clone(), SchedulerConfig::default());
        let polled = scheduler.poll_job("w1").await.unwrap().unwrap();
        assert_eq!(polled.status, JobStatus::Running);
        assert_eq!(polled.attempts, 1);
        assert!(polled.started_at.is_some());
    }

    #[tokio::test]
    async fn poll_job_returns_none_when_nothing_assigned() {
        let registry = Arc::new(MemoryRegistry::new());
        let scheduler = Scheduler::new(registry.clone(), SchedulerConfig::default());
        assert!(scheduler.poll_job("w1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_queued_job_is_immediately_terminal() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.put_job(new_job("j1", 1.0, 256)).await.unwrap();

        let scheduler = Scheduler::new(registry.clone(), SchedulerConfig::default());
        scheduler.cancel_job("j1").await.unwrap();

        let job = registry.get_job("j1").await.unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_running_job_sets_cooperative_flag_not_terminal() {
        let registry = Arc::new(MemoryRegistry::new());
        let mut job = new_job("j1", 1.0, 256);
        job.status = JobStatus::Running;
        registry.put_job(job).await.unwrap();

        let scheduler = Scheduler::new(registry.clone(), SchedulerConfig::default());
        scheduler.cancel_job("j1").await.unwrap();

        let job = registry.get_job("j1").await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.cancel_requested);
    }

    #[tokio::test]
    async fn cancel_assigned_job_releases_worker_reservation() {
        let registry = Arc::new(MemoryRegistry::new());
        let mut worker = new_worker("w1", 4.0, 4096, 10.0);
        worker.status = WorkerStatus::Busy;
        worker.current_job_ids.insert("j1".to_string());
        worker.reserved_cpu = 1.0;
        worker.reserved_ram_mb = 256;
        registry.put_worker(worker).await.unwrap();

        let mut job = new_job("j1", 1.0, 256);
        job.status = JobStatus::Assigned;
        job.assigned_worker_id = Some("w1".to_string());
        registry.put_job(job).await.unwrap();

        let scheduler = Scheduler::new(registry.clone(), SchedulerConfig::default());
        scheduler.cancel_job("j1").await.unwrap();

        let job = registry.get_job("j1").await.unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);

        let worker = registry.get_worker("w1").await.unwrap();
        assert_eq!(worker.reserved_cpu, 0.0);
        assert!(worker.current_job_ids.is_empty());
    }
}
