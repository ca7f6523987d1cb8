// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Worker-side HTTP client for the Dispatcher API, replacing a
//! debug-log-only stub with real request/response round-trips against
//! every `§6` route, authenticated with the worker's bearer token.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::dispatch::error::AgentError;
use crate::dispatch::protocol::{
    CancelJobResponse, CheckCancelResponse, CreateJobResponse, DeleteWorkerResponse,
    GetJobResponse, HeartbeatResponse, JobProjection, RegisterWorkerResponse,
    StreamOutputResponse, SubmitResultResponse, WorkerJobView, WorkerListResponse,
};

/// Maximum attempts for `submitResult`, matching the worker's per-job
/// execution contract.
const SUBMIT_RETRY_ATTEMPTS: u32 = 3;

/// Exponential backoff base and cap for `submitResult` retries.
const SUBMIT_RETRY_BASE: Duration = Duration::from_secs(1);
const SUBMIT_RETRY_CAP: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterWorkerRequest<'a> {
    worker_id: &'a str,
    hostname: &'a str,
    os: &'a str,
    cpu_count: f64,
    cpu_usage: f64,
    ram_total_mb: i64,
    ram_free_mb: i64,
    version: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct HeartbeatRequest<'a> {
    worker_id: &'a str,
    cpu_usage: f64,
    ram_free_mb: i64,
    ram_total_mb: i64,
    status: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamOutputRequest<'a> {
    job_id: &'a str,
    data: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResultRequest<'a> {
    job_id: &'a str,
    worker_id: &'a str,
    stdout: &'a str,
    stderr: &'a str,
    exit_code: i32,
    result_ref: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportFailureRequest<'a> {
    job_id: &'a str,
    worker_id: &'a str,
    error_message: &'a str,
}

/// Thin client over the Dispatcher API, holding the base URL and the
/// worker's bearer token once registration succeeds.
pub struct DispatcherClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl DispatcherClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client"),
            base_url: base_url.into(),
            token: RwLock::new(None),
        }
    }

    async fn auth_header(&self) -> Option<String> {
        self.token.read().await.clone().map(|t| format!("Bearer {t}"))
    }

    async fn set_token(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    pub async fn register(
        &self,
        worker_id: &str,
        hostname: &str,
        os: &str,
        cpu_count: f64,
        cpu_usage: f64,
        ram_total_mb: i64,
        ram_free_mb: i64,
        version: &str,
    ) -> Result<RegisterWorkerResponse, AgentError> {
        let body = RegisterWorkerRequest {
            worker_id,
            hostname,
            os,
            cpu_count,
            cpu_usage,
            ram_total_mb,
            ram_free_mb,
            version,
        };
        let resp: RegisterWorkerResponse = self
            .http
            .post(format!("{}/workers/register", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        self.set_token(resp.token.clone()).await;
        Ok(resp)
    }

    pub async fn heartbeat(
        &self,
        worker_id: &str,
        cpu_usage: f64,
        ram_free_mb: i64,
        ram_total_mb: i64,
        status: &str,
    ) -> Result<HeartbeatResponse, AgentError> {
        let body = HeartbeatRequest {
            worker_id,
            cpu_usage,
            ram_free_mb,
            ram_total_mb,
            status,
        };
        let mut req = self
            .http
            .post(format!("{}/workers/heartbeat", self.base_url))
            .json(&body);
        if let Some(auth) = self.auth_header().await {
            req = req.header("Authorization", auth);
        }
        Ok(req.send().await?.error_for_status()?.json().await?)
    }

    pub async fn list_workers(&self) -> Result<WorkerListResponse, AgentError> {
        Ok(self
            .http
            .get(format!("{}/workers/list", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    pub async fn delete_worker(&self, worker_id: &str) -> Result<DeleteWorkerResponse, AgentError> {
        Ok(self
            .http
            .delete(format!("{}/workers/{worker_id}", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Fetches a blob's raw bytes by reference (e.g. a job's bundle).
    pub async fn fetch_blob(&self, blob_ref: &str) -> Result<Vec<u8>, AgentError> {
        let mut req = self.http.get(format!("{}/blobs/{blob_ref}", self.base_url));
        if let Some(auth) = self.auth_header().await {
            req = req.header("Authorization", auth);
        }
        let bytes = req.send().await?.error_for_status()?.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Uploads bytes (e.g. a result archive) and returns the blob ref
    /// assigned by the store.
    pub async fn put_blob(&self, bytes: Vec<u8>) -> Result<String, AgentError> {
        let mut req = self.http.post(format!("{}/blobs", self.base_url)).body(bytes);
        if let Some(auth) = self.auth_header().await {
            req = req.header("Authorization", auth);
        }
        #[derive(Deserialize)]
        struct PutBlobResponse {
            #[serde(rename = "ref")]
            blob_ref: String,
        }
        let resp: PutBlobResponse = req.send().await?.error_for_status()?.json().await?;
        Ok(resp.blob_ref)
    }

    pub async fn create_job(
        &self,
        command: &str,
        bundle_ref: &str,
        bundle_name: &str,
        required_cpu: Option<f64>,
        required_ram_mb: Option<i64>,
        timeout_ms: Option<i64>,
        max_retries: Option<u32>,
    ) -> Result<CreateJobResponse, AgentError> {
        Ok(self
            .http
            .post(format!("{}/jobs/create", self.base_url))
            .json(&serde_json::json!({
                "command": command,
                "bundleRef": bundle_ref,
                "bundleName": bundle_name,
                "requiredCpu": required_cpu,
                "requiredRamMb": required_ram_mb,
                "timeoutMs": timeout_ms,
                "maxRetries": max_retries,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Fetches the full status projection for a single job.
    pub async fn get_job_status(&self, job_id: &str) -> Result<JobProjection, AgentError> {
        Ok(self
            .http
            .get(format!("{}/jobs/status", self.base_url))
            .query(&[("jobId", job_id)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Lists every job currently known to the Registry.
    pub async fn list_jobs(&self) -> Result<Vec<JobProjection>, AgentError> {
        Ok(self
            .http
            .get(format!("{}/jobs/list", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Polls for an assigned job. A `202` with `job: null` means nothing
    /// is ready yet; this is not an error.
    pub async fn get_job(&self, worker_id: &str) -> Result<Option<WorkerJobView>, AgentError> {
        let mut req = self
            .http
            .get(format!("{}/jobs/get-job", self.base_url))
            .query(&[("workerId", worker_id)]);
        if let Some(auth) = self.auth_header().await {
            req = req.header("Authorization", auth);
        }
        let resp: GetJobResponse = req.send().await?.error_for_status()?.json().await?;
        Ok(resp.job)
    }

    pub async fn stream_output(
        &self,
        job_id: &str,
        data: &str,
        stderr: bool,
    ) -> Result<StreamOutputResponse, AgentError> {
        let body = StreamOutputRequest {
            job_id,
            data,
            kind: if stderr { "stderr" } else { "stdout" },
        };
        let mut req = self
            .http
            .post(format!("{}/jobs/stream-output", self.base_url))
            .json(&body);
        if let Some(auth) = self.auth_header().await {
            req = req.header("Authorization", auth);
        }
        Ok(req.send().await?.error_for_status()?.json().await?)
    }

    /// Submits a job's final result, retrying with exponential backoff up
    /// to [`SUBMIT_RETRY_ATTEMPTS`] times on transport failure.
    pub async fn submit_result(
        &self,
        job_id: &str,
        worker_id: &str,
        stdout: &str,
        stderr: &str,
        exit_code: i32,
        result_ref: Option<&str>,
    ) -> Result<SubmitResultResponse, AgentError> {
        let body = SubmitResultRequest {
            job_id,
            worker_id,
            stdout,
            stderr,
            exit_code,
            result_ref,
        };
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut req = self
                .http
                .post(format!("{}/jobs/submit-result", self.base_url))
                .json(&body);
            if let Some(auth) = self.auth_header().await {
                req = req.header("Authorization", auth);
            }
            match req.send().await.and_then(reqwest::Response::error_for_status) {
                Ok(resp) => return Ok(resp.json().await?),
                Err(err) if attempt < SUBMIT_RETRY_ATTEMPTS => {
                    let backoff = (SUBMIT_RETRY_BASE * 2u32.pow(attempt - 1)).min(SUBMIT_RETRY_CAP);
                    tokio::time::sleep(backoff).await;
                    tracing::warn!(job_id, attempt, error = %err, "submit-result retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub async fn report_failure(
        &self,
        job_id: &str,
        worker_id: &str,
        error_message: &str,
    ) -> Result<SubmitResultResponse, AgentError> {
        let body = ReportFailureRequest {
            job_id,
            worker_id,
            error_message,
        };
        let mut req = self
            .http
            .put(format!("{}/jobs/submit-result", self.base_url))
            .json(&body);
        if let Some(auth) = self.auth_header().await {
            req = req.header("Authorization", auth);
        }
        Ok(req.send().await?.error_for_status()?.json().await?)
    }

    pub async fn check_cancel(&self, job_id: &str) -> Result<CheckCancelResponse, AgentError> {
        let mut req = self
            .http
            .get(format!("{}/jobs/check-cancel", self.base_url))
            .query(&[("jobId", job_id)]);
        if let Some(auth) = self.auth_header().await {
            req = req.header("Authorization", auth);
        }
        Ok(req.send().await?.error_for_status()?.json().await?)
    }

    pub async fn cancel_job(&self, job_id: &str) -> Result<CancelJobResponse, AgentError> {
        Ok(self
            .http
            .post(format!("{}/jobs/cancel", self.base_url))
            .json(&serde_json::json!({ "jobId": job_id }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn register_stores_returned_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/workers/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "workerId": "w1",
                "token": "tok-123",
            })))
            .mount(&server)
            .await;

        let client = DispatcherClient::new(server.uri());
        let resp = client
            .register("w1", "host", "linux", 4.0, 0.0, 4096, 4096, "1.0")
            .await
            .unwrap();
        assert_eq!(resp.token, "tok-123");
        assert_eq!(client.auth_header().await, Some("Bearer tok-123".to_string()));
    }

    #[tokio::test]
    async fn get_job_returns_none_on_202() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/get-job"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "success": true,
                "job": null,
            })))
            .mount(&server)
            .await;

        let client = DispatcherClient::new(server.uri());
        let job = client.get_job("w1").await.unwrap();
        assert!(job.is_none());
    }

    #[tokio::test]
    async fn submit_result_retries_on_server_error_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jobs/submit-result"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/jobs/submit-result"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "jobId": "j1",
            })))
            .mount(&server)
            .await;

        let client = DispatcherClient::new(server.uri());
        let resp = client
            .submit_result("j1", "w1", "out", "", 0, None)
            .await
            .unwrap();
        assert_eq!(resp.job_id, "j1");
    }
}
