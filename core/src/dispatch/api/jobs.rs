// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `/jobs/*` handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::dispatch::api::server::AppState;
use crate::dispatch::error::DispatchError;
use crate::dispatch::protocol::{
    CancelJobRequest, CancelJobResponse, CheckCancelQuery, CheckCancelResponse, CreateJobRequest,
    CreateJobResponse, GetJobQuery, GetJobResponse, JobProjection, JobStatusQuery,
    ReportFailureRequest, StreamKind, StreamOutputRequest, StreamOutputResponse,
    SubmitResultRequest, SubmitResultResponse, WorkerJobView,
};
use crate::dispatch::types::{Job, JobStatus, NewJob};

fn trigger_err(e: impl std::fmt::Display) -> DispatchError {
    DispatchError::Internal(format!("scheduler trigger failed: {e}"))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateJobRequest>,
) -> Result<Json<CreateJobResponse>, DispatchError> {
    let job_id = uuid::Uuid::new_v4().to_string();
    let job = Job::create(
        job_id.clone(),
        NewJob {
            command: req.command,
            bundle_ref: req.bundle_ref,
            bundle_name: req.bundle_name,
            required_cpu: req.required_cpu,
            required_ram_mb: req.required_ram_mb,
            timeout_ms: req.timeout_ms,
            max_retries: req.max_retries,
        },
        Utc::now(),
    );
    state.registry.put_job(job).await?;
    state.scheduler.trigger().await.map_err(trigger_err)?;
    Ok(Json(CreateJobResponse {
        success: true,
        job_id,
    }))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GetJobQuery>,
) -> Result<(StatusCode, Json<GetJobResponse>), DispatchError> {
    state.scheduler.trigger().await.map_err(trigger_err)?;
    let job = state
        .scheduler
        .poll_job(&query.worker_id)
        .await
        .map_err(trigger_err)?;

    match job {
        Some(job) => Ok((
            StatusCode::OK,
            Json(GetJobResponse {
                success: true,
                job: Some(WorkerJobView::from(&job)),
            }),
        )),
        None => Ok((
            StatusCode::ACCEPTED,
            Json(GetJobResponse {
                success: true,
                job: None,
            }),
        )),
    }
}

pub async fn stream_output(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StreamOutputRequest>,
) -> Result<Json<StreamOutputResponse>, DispatchError> {
    let mut job = state.registry.get_job(&req.job_id).await?;
    match req.kind {
        StreamKind::Stdout => job.stdout.push_str(&req.data),
        StreamKind::Stderr => job.stderr.push_str(&req.data),
    }
    job.last_streamed_at = Some(Utc::now());
    state.registry.cache_job_status(job.status_projection());
    state.registry.put_job(job).await?;
    Ok(Json(StreamOutputResponse { success: true }))
}

pub async fn submit_result(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitResultRequest>,
) -> Result<Json<SubmitResultResponse>, DispatchError> {
    let mut job = state.registry.get_job(&req.job_id).await?;
    if job.assigned_worker_id.as_deref() != Some(req.worker_id.as_str()) {
        return Err(DispatchError::JobNotOwned);
    }

    let now = Utc::now();
    job.status = JobStatus::Completed;
    job.stdout = req.stdout;
    job.stderr = req.stderr;
    job.exit_code = Some(req.exit_code);
    job.result_ref = req.result_ref;
    job.completed_at = Some(now);
    state.registry.cache_job_status(job.status_projection());
    state.registry.put_job(job).await?;

    if let Ok(mut worker) = state.registry.get_worker(&req.worker_id).await {
        worker.current_job_ids.remove(&req.job_id);
        if worker.current_job_ids.is_empty() {
            worker.status = crate::dispatch::types::WorkerStatus::Idle;
        }
        worker.updated_at = now;
        state.registry.put_worker(worker).await?;
    }

    state.scheduler.trigger().await.map_err(trigger_err)?;
    Ok(Json(SubmitResultResponse {
        success: true,
        job_id: req.job_id,
    }))
}

pub async fn report_failure(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReportFailureRequest>,
) -> Result<Json<SubmitResultResponse>, DispatchError> {
    state
        .scheduler
        .apply_failure_penalty(&req.worker_id, req.error_message)
        .await
        .map_err(trigger_err)?;
    state.scheduler.trigger().await.map_err(trigger_err)?;
    Ok(Json(SubmitResultResponse {
        success: true,
        job_id: req.job_id,
    }))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobStatusQuery>,
) -> Result<Json<JobProjection>, DispatchError> {
    if let Some(cached) = state.registry.cached_job_status(&query.job_id) {
        return Ok(Json(JobProjection {
            job_id: cached.job_id,
            command: String::new(),
            status: cached.status,
            assigned_worker_id: cached.assigned_worker_id,
            attempts: cached.attempts,
            exit_code: cached.exit_code,
            error_message: cached.error_message,
            result_ref: None,
            created_at: cached.created_at,
            queued_at: cached.queued_at,
            assigned_at: cached.assigned_at,
            started_at: cached.started_at,
            completed_at: cached.completed_at,
        }));
    }

    let job = state.registry.get_job(&query.job_id).await?;
    state.registry.cache_job_status(job.status_projection());
    Ok(Json(JobProjection::from(&job)))
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CancelJobRequest>,
) -> Result<Json<CancelJobResponse>, DispatchError> {
    state
        .scheduler
        .cancel_job(&req.job_id)
        .await
        .map_err(trigger_err)?;
    state
        .registry
        .cache_cancel_flag(&req.job_id, true);
    Ok(Json(CancelJobResponse {
        success: true,
        message: "cancel requested".to_string(),
    }))
}

pub async fn check_cancel(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckCancelQuery>,
) -> Result<Json<CheckCancelResponse>, DispatchError> {
    if let Some(cancelled) = state.registry.cached_cancel_flag(&query.job_id) {
        return Ok(Json(CheckCancelResponse {
            success: true,
            cancel_requested: cancelled,
        }));
    }
    let job = state.registry.get_job(&query.job_id).await?;
    state
        .registry
        .cache_cancel_flag(&query.job_id, job.cancel_requested);
    Ok(Json(CheckCancelResponse {
        success: true,
        cancel_requested: job.cancel_requested,
    }))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<JobProjection>>, DispatchError> {
    let jobs = state.registry.list_jobs().await?;
    Ok(Json(jobs.iter().map(JobProjection::from).collect()))
}
