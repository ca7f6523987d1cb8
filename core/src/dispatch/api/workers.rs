// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `/workers/*` handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;

use crate::dispatch::api::server::AppState;
use crate::dispatch::error::DispatchError;
use crate::dispatch::protocol::{
    DeleteWorkerResponse, HeartbeatRequest, HeartbeatResponse, RegisterWorkerRequest,
    RegisterWorkerResponse, WorkerListResponse,
};
use crate::dispatch::types::{RegisterWorker, Worker, WorkerStatus};

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterWorkerRequest>,
) -> Result<Json<RegisterWorkerResponse>, DispatchError> {
    if req.worker_id.trim().is_empty() || req.hostname.trim().is_empty() {
        return Err(DispatchError::BadRequest(
            "workerId and hostname are required".to_string(),
        ));
    }

    let now = Utc::now();
    let created_at = match state.registry.get_worker(&req.worker_id).await {
        Ok(existing) => existing.created_at,
        Err(_) => now,
    };
    let worker = Worker::register(
        RegisterWorker {
            worker_id: req.worker_id.clone(),
            hostname: req.hostname.clone(),
            os: req.os,
            version: req.version,
            cpu_count: req.cpu_count,
            cpu_usage: req.cpu_usage,
            ram_total_mb: req.ram_total_mb,
            ram_free_mb: req.ram_free_mb,
        },
        now,
        created_at,
    );
    state.registry.put_worker(worker).await?;
    state.scheduler.trigger().await.map_err(|e| {
        DispatchError::Internal(format!("scheduler trigger failed: {e}"))
    })?;

    let token = state.token_service.issue(&req.worker_id, &req.hostname)?;
    Ok(Json(RegisterWorkerResponse {
        success: true,
        worker_id: req.worker_id,
        token,
    }))
}

pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HeartbeatRequest>,
) -> Result<Json<HeartbeatResponse>, DispatchError> {
    let mut worker = state
        .registry
        .get_worker(&req.worker_id)
        .await
        .map_err(|_| DispatchError::WorkerUnknown(req.worker_id.clone()))?;

    let now = Utc::now();
    worker.cpu_usage = req.cpu_usage;
    worker.ram_free_mb = req.ram_free_mb;
    worker.ram_total_mb = req.ram_total_mb;
    worker.status = req.status.parse::<WorkerStatus>().unwrap_or(WorkerStatus::Idle);
    worker.last_heartbeat = now;
    worker.updated_at = now;
    state.registry.put_worker(worker).await?;

    state.scheduler.trigger().await.map_err(|e| {
        DispatchError::Internal(format!("scheduler trigger failed: {e}"))
    })?;

    Ok(Json(HeartbeatResponse {
        success: true,
        timestamp: now,
    }))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<WorkerListResponse>, DispatchError> {
    let workers = state.registry.list_workers().await?;
    Ok(Json(WorkerListResponse::from_workers(workers)))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(worker_id): Path<String>,
) -> Result<Json<DeleteWorkerResponse>, DispatchError> {
    let existed = state.registry.get_worker(&worker_id).await.is_ok();
    state.registry.delete_worker(&worker_id).await?;
    Ok(Json(DeleteWorkerResponse {
        success: true,
        existed,
    }))
}
