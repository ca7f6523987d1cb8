// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Dispatcher server bootstrap: wires the Registry, Scheduler, Blob
//! Store, worker-token auth, metrics, and rate limiter into one
//! `Arc<AppState>`-scoped axum router.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::dispatch::api::blobs;
use crate::dispatch::api::jobs;
use crate::dispatch::api::middleware::{rate_limit_layer, CorsConfig, RateLimiter, RateLimiterConfig};
use crate::dispatch::api::workers;
use crate::dispatch::auth::WorkerTokenService;
use crate::dispatch::blob_store::BlobStore;
use crate::dispatch::metrics::DispatchMetrics;
use crate::dispatch::registry::Registry;
use crate::dispatch::scheduler::Scheduler;

/// Shared state behind every Dispatcher API handler.
pub struct AppState {
    pub registry: Arc<dyn Registry>,
    pub scheduler: Arc<Scheduler>,
    pub blob_store: Arc<dyn BlobStore>,
    pub token_service: Arc<WorkerTokenService>,
    pub metrics: Arc<DispatchMetrics>,
    pub(crate) rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        registry: Arc<dyn Registry>,
        scheduler: Arc<Scheduler>,
        blob_store: Arc<dyn BlobStore>,
        token_service: Arc<WorkerTokenService>,
        rate_limiter_config: RateLimiterConfig,
    ) -> Self {
        Self {
            registry,
            scheduler,
            blob_store,
            token_service,
            metrics: Arc::new(DispatchMetrics::new()),
            rate_limiter: Arc::new(RateLimiter::new(rate_limiter_config)),
        }
    }
}

/// Builds and (eventually) serves the Dispatcher API router.
pub struct DispatcherServer {
    state: Arc<AppState>,
    cors: CorsConfig,
}

impl DispatcherServer {
    pub fn new(state: Arc<AppState>, cors: CorsConfig) -> Self {
        Self { state, cors }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/workers/register", post(workers::register))
            .route("/workers/heartbeat", post(workers::heartbeat))
            .route("/workers/list", get(workers::list))
            .route("/workers/:worker_id", delete(workers::delete))
            .route("/jobs/create", post(jobs::create))
            .route("/jobs/get-job", get(jobs::get_job))
            .route("/jobs/stream-output", post(jobs::stream_output))
            .route(
                "/jobs/submit-result",
                post(jobs::submit_result).put(jobs::report_failure),
            )
            .route("/jobs/status", get(jobs::status))
            .route("/jobs/cancel", post(jobs::cancel))
            .route("/jobs/check-cancel", get(jobs::check_cancel))
            .route("/jobs/list", get(jobs::list))
            .route("/blobs", post(blobs::put))
            .route(
                "/blobs/:blob_ref",
                get(blobs::get).delete(blobs::delete),
            )
            .route("/health", get(health))
            .route("/metrics", get(metrics_endpoint))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                rate_limit_layer,
            ))
            .layer(self.cors.to_layer())
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .with_state(self.state.clone())
    }
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn metrics_endpoint(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> String {
    state.metrics.render()
}
