// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error kinds for the Registry, Scheduler, Dispatcher API, and Worker
//! Agent, each narrow to its own module and converging on [`DispatchError`]
//! at the API boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Errors from the Registry's authoritative or cache tier.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("worker not found: {0}")]
    WorkerNotFound(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors from a single Scheduler run. The Scheduler never surfaces these
/// to callers (§7); it logs and aborts the in-progress run, to be retried
/// on the next trigger.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("registry error during scheduler run: {0}")]
    Registry(#[from] RegistryError),
    #[error("scheduler lock unavailable")]
    LockUnavailable,
}

/// Errors surfaced by the Worker Agent's own execution and protocol-client
/// logic (never returned to the Dispatcher API; logged and retried locally).
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("bad bundle: {0}")]
    BadBundle(String),
    #[error("sandbox launch failed: {0}")]
    SandboxLaunchFailed(String),
    #[error("sandbox timed out")]
    SandboxTimedOut,
    #[error("job cancelled")]
    Cancelled,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The Dispatcher API's unified error type, one variant per §7 error kind.
/// Implements [`IntoResponse`] so every handler can return
/// `Result<Json<T>, DispatchError>` directly.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("job not owned by worker")]
    JobNotOwned,
    #[error("worker unknown: {0}")]
    WorkerUnknown(String),
    #[error("bad bundle: {0}")]
    BadBundle(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("sandbox launch failed: {0}")]
    SandboxLaunchFailed(String),
    #[error("sandbox timed out")]
    SandboxTimedOut,
    #[error("cancelled")]
    Cancelled,
    #[error("rate limited")]
    RateLimited { retry_after_secs: u64 },
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RegistryError> for DispatchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::JobNotFound(id) => Self::NotFound(format!("job {id}")),
            RegistryError::WorkerNotFound(id) => Self::NotFound(format!("worker {id}")),
            RegistryError::StoreUnavailable(msg) => Self::StoreUnavailable(msg),
            RegistryError::Serialization(e) => Self::Internal(e.to_string()),
            #[cfg(feature = "database")]
            RegistryError::Database(e) => Self::StoreUnavailable(e.to_string()),
        }
    }
}

impl DispatchError {
    /// HTTP status code per §7's propagation policy.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::BadBundle(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) | Self::WorkerUnknown(_) => StatusCode::NOT_FOUND,
            Self::JobNotOwned => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::StoreUnavailable(_) | Self::SandboxLaunchFailed(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::SandboxTimedOut => StatusCode::REQUEST_TIMEOUT,
            Self::Cancelled => StatusCode::CONFLICT,
        }
    }

    /// Short machine-readable code used as the `error` field of the body.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::JobNotOwned => "job_not_owned",
            Self::WorkerUnknown(_) => "worker_unknown",
            Self::BadBundle(_) => "bad_bundle",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::SandboxLaunchFailed(_) => "sandbox_launch_failed",
            Self::SandboxTimedOut => "sandbox_timed_out",
            Self::Cancelled => "cancelled",
            Self::RateLimited { .. } => "rate_limited",
            Self::Internal(_) => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.error_code(),
            detail: self.to_string(),
        };
        if let Self::RateLimited { retry_after_secs } = self {
            return (
                status,
                [("Retry-After", retry_after_secs.to_string())],
                Json(body),
            )
                .into_response();
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_policy() {
        assert_eq!(
            DispatchError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DispatchError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DispatchError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DispatchError::JobNotOwned.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            DispatchError::RateLimited { retry_after_secs: 5 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn registry_not_found_maps_to_dispatch_not_found() {
        let err: DispatchError = RegistryError::JobNotFound("j1".into()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "not_found");
    }
}
