//! Configuration data structures for the dispatch platform.
//!
//! This module defines the complete configuration schema: dispatcher
//! networking and rate limiting, scheduler timing, worker concurrency,
//! sandbox isolation defaults, and the security secrets every deployment
//! must set.

use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::path::PathBuf;

/// Root configuration structure for the dispatch platform.
///
/// Configuration sources are merged in this precedence (highest to lowest):
/// 1. CLI Arguments
/// 2. Environment Variables (`JOBMESH_` prefix)
/// 3. Config Files (~/.config/jobmesh/config.toml)
/// 4. Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Dispatcher API networking and rate-limit settings.
    pub dispatcher: DispatcherConfig,

    /// Scheduler timing: heartbeat timeout, cooldown, tick interval.
    pub scheduler: SchedulerConfig,

    /// Worker Agent defaults applied when a job omits them.
    pub worker: WorkerConfig,

    /// Sandbox isolation defaults for job execution.
    pub sandbox: SandboxConfig,

    /// Shared secrets and token lifetimes.
    pub security: SecurityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            scheduler: SchedulerConfig::default(),
            worker: WorkerConfig::default(),
            sandbox: SandboxConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Dispatcher API configuration: bind address, CORS, rate limiting, and
/// the filesystem root backing the reference Blob Store.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Address the Dispatcher API binds to.
    pub bind_address: String,

    /// Allowed CORS origins; `["*"]` allows any origin.
    pub allowed_origins: Vec<String>,

    /// Rate-limit window, in milliseconds.
    #[validate(minimum = 1000)]
    pub rate_limit_window_ms: u64,

    /// Maximum requests per rate-limit window per client address.
    #[validate(minimum = 1)]
    pub rate_limit_max: u32,

    /// Filesystem root for the reference `FilesystemBlobStore`.
    pub blob_store_root: PathBuf,

    /// Days to retain blobs before they become eligible for deletion.
    /// `None` means blobs are never automatically deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_retention_days: Option<u32>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            allowed_origins: vec!["*".to_string()],
            rate_limit_window_ms: 60_000,
            rate_limit_max: 100,
            blob_store_root: PathBuf::from("./data/blobs"),
            blob_retention_days: None,
        }
    }
}

/// Scheduler timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How long a worker may go without a heartbeat before it is
    /// considered stale and marked `OFFLINE`, in milliseconds.
    #[validate(minimum = 1000)]
    pub heartbeat_timeout_ms: i64,

    /// How long an `Unhealthy` worker stays in cooldown before it is
    /// reconsidered eligible, in milliseconds.
    #[validate(minimum = 1000)]
    pub cooldown_ms: i64,

    /// Maximum CPU usage percent at which a worker is still considered
    /// eligible for assignment.
    #[validate(minimum = 0.0)]
    #[validate(maximum = 100.0)]
    pub max_cpu_usage_pct: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ms: 30_000,
            cooldown_ms: 30_000,
            max_cpu_usage_pct: 90.0,
        }
    }
}

/// Defaults applied to a job submission that omits them, and Worker
/// Agent tuning.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Default CPU reservation for a job that does not specify one.
    #[validate(minimum = 0.0)]
    pub default_cpu: f64,

    /// Default RAM reservation (MB) for a job that does not specify one.
    #[validate(minimum = 1)]
    pub default_ram_mb: i64,

    /// Default wall-clock execution budget, in milliseconds.
    #[validate(minimum = 1000)]
    pub default_timeout_ms: i64,

    /// Default maximum retry attempts before a job is permanently failed.
    pub default_max_retries: u32,

    /// Maximum concurrently executing jobs per worker. `None` derives
    /// `max(1, cpuCount/2)` at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parallel_jobs: Option<usize>,

    /// Heartbeat interval, in milliseconds.
    #[validate(minimum = 1000)]
    pub heartbeat_interval_ms: u64,

    /// Job-poll interval, in milliseconds.
    #[validate(minimum = 500)]
    pub poll_interval_ms: u64,

    /// Root directory for per-job scratch workspaces.
    pub workspace_root: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            default_cpu: crate::dispatch::types::defaults::CPU,
            default_ram_mb: crate::dispatch::types::defaults::RAM_MB,
            default_timeout_ms: crate::dispatch::types::defaults::TIMEOUT_MS,
            default_max_retries: crate::dispatch::types::defaults::MAX_RETRIES,
            max_parallel_jobs: None,
            heartbeat_interval_ms: 10_000,
            poll_interval_ms: 5_000,
            workspace_root: PathBuf::from("./data/workspaces"),
        }
    }
}

/// Sandbox isolation defaults (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct SandboxConfig {
    /// `cgroups` memory limit, e.g. `"512m"`.
    #[validate(min_length = 1)]
    pub memory_limit: String,

    /// `cgroups` CPU quota, in whole/fractional cores.
    #[validate(min_length = 1)]
    pub cpu_limit: String,

    /// Size of the `/tmp` tmpfs mount, in megabytes.
    #[validate(minimum = 1)]
    pub tmpfs_mb: i64,

    /// Maximum process count (`pids` cgroup controller).
    #[validate(minimum = 1)]
    pub pids_limit: i64,

    /// Networking mode: `"none"` (default, isolated) or `"host"`.
    pub network_mode: String,

    /// Path to the OCI-compatible runtime binary (`runc`, `crun`).
    pub oci_runtime_binary: String,

    /// External binary used to materialize a selected image's root
    /// filesystem into the local image cache (invoked as `<binary>
    /// <image> <destination-dir>`) when it isn't already cached.
    pub image_pull_binary: String,

    /// Root directory holding unpacked image rootfs directories, keyed
    /// by image reference.
    pub image_cache_root: PathBuf,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            memory_limit: "512m".to_string(),
            cpu_limit: "1.0".to_string(),
            tmpfs_mb: 256,
            pids_limit: 256,
            network_mode: "none".to_string(),
            oci_runtime_binary: "runc".to_string(),
            image_pull_binary: "jobmesh-image-pull".to_string(),
            image_cache_root: PathBuf::from("./data/images"),
        }
    }
}

/// Shared secrets and token lifetimes. These have no safe defaults in a
/// production deployment; `Config::validate`-time checks are limited to
/// shape, not secrecy, since actual secret strength is an operational
/// concern outside what this crate can enforce.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// HMAC secret used to sign worker bearer tokens.
    #[validate(min_length = 1)]
    pub worker_token_secret: String,

    /// Worker token lifetime, in hours.
    #[validate(minimum = 1)]
    pub worker_token_ttl_hours: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            worker_token_secret: "dev-insecure-change-me".to_string(),
            worker_token_ttl_hours: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_worker_config_pulls_dispatch_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.default_cpu, crate::dispatch::types::defaults::CPU);
        assert_eq!(config.default_ram_mb, crate::dispatch::types::defaults::RAM_MB);
    }

    #[test]
    fn default_scheduler_config_matches_dispatch_scheduler_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.heartbeat_timeout_ms, 30_000);
        assert_eq!(config.max_cpu_usage_pct, 90.0);
    }

    #[test]
    fn config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).expect("failed to serialize");
        let deserialized: Config = toml::from_str(&toml_str).expect("failed to deserialize");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn dispatcher_config_default_rate_limit_matches_spec() {
        let config = DispatcherConfig::default();
        assert_eq!(config.rate_limit_max, 100);
        assert_eq!(config.rate_limit_window_ms, 60_000);
    }
}
