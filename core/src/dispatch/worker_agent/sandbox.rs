// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sandbox job specification and OCI-runtime execution.
//!
//! Isolation is implemented by shelling out to a `runc`/`crun`-compatible
//! OCI runtime present on the host, the same way the rest of the worker
//! supervises subprocesses. No bespoke sandbox crate is invented: a
//! minimal OCI bundle (`config.json` plus the selected image's rootfs,
//! materialized by [`ImageCache`]) is generated per command and handed
//! to the runtime binary via `tokio::process::Command`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::Instant;

use crate::dispatch::error::AgentError;

/// How long to wait after a forced kill before giving up on reaping the
/// child process.
const KILL_GRACE: Duration = Duration::from_secs(3);

/// Probe interval for cooperative cancellation while a command runs.
pub const CANCEL_PROBE_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Resource limits applied to every sandboxed command.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// `cgroups` memory limit, e.g. `"512m"`.
    pub memory_limit: String,
    /// `cgroups` CPU quota, expressed as whole/fractional cores, e.g. `"1.0"`.
    pub cpu_limit: String,
    /// Maximum number of processes (`pids` cgroup controller).
    pub pids_limit: i64,
    /// Size of the `/tmp` tmpfs mount, in megabytes.
    pub tmpfs_mb: i64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_limit: "512m".to_string(),
            cpu_limit: "1.0".to_string(),
            pids_limit: 256,
            tmpfs_mb: 256,
        }
    }
}

/// Host networking mode for the sandbox. Networking is disabled by
/// default; `HostOnly` is an explicit opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkMode {
    #[default]
    None,
    HostOnly,
}

/// A single command to run inside an isolated sandbox, grounded in the
/// `JobSpec`/`ResourceRequirements`/`VolumeMount` shapes of a container-job
/// execution engine: an image selector, a command, a workspace bind mount,
/// and cpu/memory limits expressed the same cpu/memory-limit-as-optional-string
/// way, here made concrete to this worker's cgroup invocation.
#[derive(Debug, Clone)]
pub struct SandboxJobSpec {
    pub image: String,
    pub command: String,
    pub workspace: PathBuf,
    pub env: HashMap<String, String>,
    pub limits: ResourceLimits,
    pub network: NetworkMode,
    pub timeout: Duration,
}

/// Outcome of running one command to completion (or to a forced stop).
#[derive(Debug, Clone)]
pub struct SandboxOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub cancelled: bool,
}

/// Selects a sandbox image by prefix-matching the command against a
/// known-runtime table. Falls through to a minimal default image when no
/// prefix matches.
pub fn select_image(command: &str) -> &'static str {
    let trimmed = command.trim_start();
    const TABLE: &[(&str, &str)] = &[
        ("python", "jobmesh/sandbox-python:latest"),
        ("pip", "jobmesh/sandbox-python:latest"),
        ("node", "jobmesh/sandbox-node:latest"),
        ("npm", "jobmesh/sandbox-node:latest"),
        ("npx", "jobmesh/sandbox-node:latest"),
        ("gcc", "jobmesh/sandbox-gcc:latest"),
        ("g++", "jobmesh/sandbox-gcc:latest"),
        ("make", "jobmesh/sandbox-gcc:latest"),
        ("java", "jobmesh/sandbox-java:latest"),
        ("javac", "jobmesh/sandbox-java:latest"),
        ("dotnet", "jobmesh/sandbox-dotnet:latest"),
    ];
    for (prefix, image) in TABLE {
        if trimmed.starts_with(prefix) {
            return image;
        }
    }
    "jobmesh/sandbox-minimal:latest"
}

/// Upper bound on how long fetching a missing image into the local
/// cache may take.
pub const IMAGE_PULL_TIMEOUT: Duration = Duration::from_secs(600);

/// Caches unpacked OCI image root filesystems by image reference, so
/// repeated jobs selecting the same image don't re-fetch it. Fetching
/// shells out to an external puller binary the same way `SandboxRunner`
/// shells out to the OCI runtime: no registry-client crate is pulled in
/// for what amounts to "run this binary, point it at a directory."
#[derive(Debug, Clone)]
pub struct ImageCache {
    pub cache_root: PathBuf,
    pub pull_binary: String,
}

impl ImageCache {
    pub fn new(cache_root: impl Into<PathBuf>, pull_binary: impl Into<String>) -> Self {
        Self {
            cache_root: cache_root.into(),
            pull_binary: pull_binary.into(),
        }
    }

    fn rootfs_dir(&self, image: &str) -> PathBuf {
        self.cache_root.join(sanitize_image_ref(image)).join("rootfs")
    }

    /// Returns the path to `image`'s unpacked rootfs, pulling it into
    /// the cache first if it isn't already present.
    pub async fn ensure_rootfs(&self, image: &str) -> Result<PathBuf, AgentError> {
        let rootfs = self.rootfs_dir(image);
        if rootfs.exists() {
            return Ok(rootfs);
        }

        tokio::fs::create_dir_all(&rootfs).await?;

        let status = tokio::time::timeout(
            IMAGE_PULL_TIMEOUT,
            Command::new(&self.pull_binary)
                .arg(image)
                .arg(&rootfs)
                .status(),
        )
        .await
        .map_err(|_| AgentError::SandboxLaunchFailed(format!("image pull timed out: {image}")))?
        .map_err(|e| AgentError::SandboxLaunchFailed(e.to_string()))?;

        if !status.success() {
            let _ = tokio::fs::remove_dir_all(&rootfs).await;
            return Err(AgentError::SandboxLaunchFailed(format!(
                "image pull failed for {image}: {status}"
            )));
        }

        Ok(rootfs)
    }
}

fn sanitize_image_ref(image: &str) -> String {
    image
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Splits a job's multi-line `command` field into the sequence of
/// commands to execute, dropping blank lines.
pub fn split_command_sequence(command: &str) -> Vec<String> {
    command
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Generates a minimal OCI `config.json` expressing the sandbox contract:
/// read-only rootfs, all capabilities dropped, `no_new_privileges`, the
/// given resource limits, and a tmpfs mount for `/tmp`. `rootfs` is the
/// image's already-materialized root filesystem directory (see
/// [`ImageCache::ensure_rootfs`]); it is used as-is rather than a
/// bundle-relative `"rootfs"` placeholder.
pub fn generate_oci_config(spec: &SandboxJobSpec, argv: &[&str], rootfs: &Path) -> OciConfig {
    OciConfig {
        oci_version: "1.0.2".to_string(),
        process: OciProcess {
            terminal: false,
            args: argv.iter().map(|s| s.to_string()).collect(),
            env: spec
                .env
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .chain(std::iter::once(format!(
                    "HOME={}",
                    spec.workspace.display()
                )))
                .chain(std::iter::once(format!(
                    "XDG_CACHE_HOME={}/.cache",
                    spec.workspace.display()
                )))
                .collect(),
            cwd: "/workspace".to_string(),
            capabilities: OciCapabilities::default(),
            no_new_privileges: true,
        },
        root: OciRoot {
            path: rootfs.display().to_string(),
            readonly: true,
        },
        mounts: vec![
            OciMount {
                destination: "/tmp".to_string(),
                typ: "tmpfs".to_string(),
                options: vec![
                    "nosuid".to_string(),
                    "nodev".to_string(),
                    format!("size={}m", spec.limits.tmpfs_mb),
                ],
            },
            OciMount {
                destination: "/workspace".to_string(),
                typ: "bind".to_string(),
                options: vec!["rbind".to_string(), "rw".to_string()],
            },
        ],
        linux: OciLinux {
            resources: OciResources {
                memory: OciMemory {
                    limit: parse_memory_bytes(&spec.limits.memory_limit),
                },
                cpu: OciCpu {
                    quota: parse_cpu_quota(&spec.limits.cpu_limit),
                    period: 100_000,
                },
                pids: OciPids {
                    limit: spec.limits.pids_limit,
                },
            },
            namespaces: if spec.network == NetworkMode::None {
                vec!["pid", "mount", "ipc", "uts", "network"]
            } else {
                vec!["pid", "mount", "ipc", "uts"]
            }
            .into_iter()
            .map(|t| OciNamespace { typ: t.to_string() })
            .collect(),
        },
    }
}

fn parse_memory_bytes(limit: &str) -> i64 {
    let lower = limit.to_lowercase();
    if let Some(n) = lower.strip_suffix('m') {
        n.trim().parse::<i64>().unwrap_or(512) * 1024 * 1024
    } else if let Some(n) = lower.strip_suffix('g') {
        n.trim().parse::<i64>().unwrap_or(1) * 1024 * 1024 * 1024
    } else {
        lower.trim().parse::<i64>().unwrap_or(512 * 1024 * 1024)
    }
}

fn parse_cpu_quota(limit: &str) -> i64 {
    let cores: f64 = limit.trim().parse().unwrap_or(1.0);
    (cores * 100_000.0) as i64
}

#[derive(Debug, Serialize)]
pub struct OciConfig {
    #[serde(rename = "ociVersion")]
    pub oci_version: String,
    pub process: OciProcess,
    pub root: OciRoot,
    pub mounts: Vec<OciMount>,
    pub linux: OciLinux,
}

#[derive(Debug, Serialize)]
pub struct OciProcess {
    pub terminal: bool,
    pub args: Vec<String>,
    pub env: Vec<String>,
    pub cwd: String,
    pub capabilities: OciCapabilities,
    #[serde(rename = "noNewPrivileges")]
    pub no_new_privileges: bool,
}

#[derive(Debug, Serialize, Default)]
pub struct OciCapabilities {
    pub bounding: Vec<String>,
    pub effective: Vec<String>,
    pub inheritable: Vec<String>,
    pub permitted: Vec<String>,
    pub ambient: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OciRoot {
    pub path: String,
    pub readonly: bool,
}

#[derive(Debug, Serialize)]
pub struct OciMount {
    pub destination: String,
    #[serde(rename = "type")]
    pub typ: String,
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OciLinux {
    pub resources: OciResources,
    pub namespaces: Vec<OciNamespace>,
}

#[derive(Debug, Serialize)]
pub struct OciResources {
    pub memory: OciMemory,
    pub cpu: OciCpu,
    pub pids: OciPids,
}

#[derive(Debug, Serialize)]
pub struct OciMemory {
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct OciCpu {
    pub quota: i64,
    pub period: i64,
}

#[derive(Debug, Serialize)]
pub struct OciPids {
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct OciNamespace {
    #[serde(rename = "type")]
    pub typ: String,
}

/// Invokes the configured OCI runtime binary (`runc` by default) against
/// a generated bundle directory, enforcing the timeout and polling a
/// cancellation probe at [`CANCEL_PROBE_INTERVAL`].
pub struct SandboxRunner {
    pub runtime_binary: String,
    pub bundle_root: PathBuf,
    pub image_cache: ImageCache,
}

impl SandboxRunner {
    pub fn new(
        runtime_binary: impl Into<String>,
        bundle_root: impl Into<PathBuf>,
        image_cache: ImageCache,
    ) -> Self {
        Self {
            runtime_binary: runtime_binary.into(),
            bundle_root: bundle_root.into(),
            image_cache,
        }
    }

    /// Runs a single command inside a sandbox, streaming each line of
    /// stdout/stderr to `on_line` as it is produced.
    pub async fn run<F>(
        &self,
        spec: &SandboxJobSpec,
        mut should_cancel: impl FnMut() -> bool + Send,
        mut on_line: F,
    ) -> Result<SandboxOutcome, AgentError>
    where
        F: FnMut(LogStream, &str) + Send,
    {
        let container_id = uuid::Uuid::new_v4().to_string();
        let bundle_dir = self.bundle_root.join(&container_id);
        tokio::fs::create_dir_all(&bundle_dir).await?;

        let rootfs = self.image_cache.ensure_rootfs(&spec.image).await?;

        let argv: Vec<&str> = vec!["/bin/sh", "-c", spec.command.as_str()];
        let config = generate_oci_config(spec, &argv, &rootfs);
        let config_json = serde_json::to_vec_pretty(&config)
            .map_err(|e| AgentError::SandboxLaunchFailed(e.to_string()))?;
        tokio::fs::write(bundle_dir.join("config.json"), config_json).await?;

        let mut child = Command::new(&self.runtime_binary)
            .arg("run")
            .arg("--bundle")
            .arg(&bundle_dir)
            .arg(&container_id)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AgentError::SandboxLaunchFailed(e.to_string()))?;

        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");
        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();

        let mut collected_stdout = String::new();
        let mut collected_stderr = String::new();
        let deadline = Instant::now() + spec.timeout;
        let mut next_cancel_probe = Instant::now() + CANCEL_PROBE_INTERVAL;
        let mut timed_out = false;
        let mut cancelled = false;

        let exit_code = loop {
            if Instant::now() >= deadline {
                timed_out = true;
                break forced_stop(&mut child, &self.runtime_binary, &container_id, 124).await;
            }
            if Instant::now() >= next_cancel_probe {
                next_cancel_probe = Instant::now() + CANCEL_PROBE_INTERVAL;
                if should_cancel() {
                    cancelled = true;
                    break forced_stop(&mut child, &self.runtime_binary, &container_id, 130).await;
                }
            }

            tokio::select! {
                line = stdout_lines.next_line() => {
                    if let Ok(Some(line)) = line {
                        on_line(LogStream::Stdout, &line);
                        collected_stdout.push_str(&line);
                        collected_stdout.push('\n');
                    }
                }
                line = stderr_lines.next_line() => {
                    if let Ok(Some(line)) = line {
                        on_line(LogStream::Stderr, &line);
                        collected_stderr.push_str(&line);
                        collected_stderr.push('\n');
                    }
                }
                status = child.wait() => {
                    break status.map(|s| s.code().unwrap_or(-1)).unwrap_or(-1);
                }
                _ = tokio::time::sleep(Duration::from_millis(200)) => {
                    continue;
                }
            }
        };

        if timed_out {
            collected_stderr.push_str("[TIMEOUT]\n");
        }
        if cancelled {
            collected_stderr.push_str("[CANCELLED]\n");
        }
        let _ = tokio::fs::remove_dir_all(&bundle_dir).await;

        Ok(SandboxOutcome {
            exit_code,
            stdout: collected_stdout,
            stderr: collected_stderr,
            timed_out,
            cancelled,
        })
    }
}

async fn forced_stop(
    child: &mut tokio::process::Child,
    runtime_binary: &str,
    container_id: &str,
    exit_code: i32,
) -> i32 {
    let _ = Command::new(runtime_binary)
        .arg("kill")
        .arg(container_id)
        .arg("KILL")
        .status()
        .await;
    let _ = tokio::time::timeout(KILL_GRACE, child.wait()).await;
    exit_code
}

/// Resolves the directory used as a job's scratch workspace.
pub fn workspace_dir(root: &Path, job_id: &str) -> PathBuf {
    root.join(job_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_python_image_for_python_prefix() {
        assert_eq!(select_image("python train.py"), "jobmesh/sandbox-python:latest");
    }

    #[test]
    fn selects_minimal_image_for_unknown_command() {
        assert_eq!(select_image("./run.sh"), "jobmesh/sandbox-minimal:latest");
    }

    #[test]
    fn splits_command_sequence_dropping_blank_lines() {
        let seq = split_command_sequence("echo one\n\n  echo two  \n\n\n");
        assert_eq!(seq, vec!["echo one".to_string(), "echo two".to_string()]);
    }

    #[test]
    fn parses_memory_limit_suffixes() {
        assert_eq!(parse_memory_bytes("512m"), 512 * 1024 * 1024);
        assert_eq!(parse_memory_bytes("1g"), 1024 * 1024 * 1024);
    }

    #[test]
    fn generated_oci_config_marks_rootfs_readonly_and_drops_privileges() {
        let spec = SandboxJobSpec {
            image: "jobmesh/sandbox-minimal:latest".to_string(),
            command: "echo hi".to_string(),
            workspace: PathBuf::from("/tmp/ws"),
            env: HashMap::new(),
            limits: ResourceLimits::default(),
            network: NetworkMode::None,
            timeout: Duration::from_secs(30),
        };
        let rootfs = PathBuf::from("/var/cache/jobmesh/images/minimal/rootfs");
        let config = generate_oci_config(&spec, &["/bin/sh", "-c", "echo hi"], &rootfs);
        assert!(config.root.readonly);
        assert_eq!(config.root.path, rootfs.display().to_string());
        assert!(config.process.no_new_privileges);
        assert!(config.process.capabilities.bounding.is_empty());
    }

    #[test]
    fn sanitizes_image_ref_into_a_filesystem_safe_cache_key() {
        assert_eq!(
            sanitize_image_ref("jobmesh/sandbox-python:latest"),
            "jobmesh_sandbox_python_latest"
        );
    }

    #[tokio::test]
    async fn ensure_rootfs_materializes_and_then_reuses_the_cache() {
        let cache_root = std::env::temp_dir().join(format!("jobmesh-imgtest-{}", uuid::Uuid::new_v4()));
        let cache = ImageCache::new(&cache_root, "true");

        let rootfs = cache.ensure_rootfs("jobmesh/sandbox-minimal:latest").await.unwrap();
        assert!(rootfs.exists());

        // Second call hits the cache; a puller that always fails would
        // surface that as an error if it were invoked again.
        let failing = ImageCache::new(&cache_root, "false");
        let rootfs_again = failing.ensure_rootfs("jobmesh/sandbox-minimal:latest").await.unwrap();
        assert_eq!(rootfs, rootfs_again);

        tokio::fs::remove_dir_all(&cache_root).await.unwrap();
    }

    #[tokio::test]
    async fn ensure_rootfs_surfaces_puller_failure() {
        let cache_root = std::env::temp_dir().join(format!("jobmesh-imgtest-{}", uuid::Uuid::new_v4()));
        let cache = ImageCache::new(&cache_root, "false");

        let result = cache.ensure_rootfs("jobmesh/sandbox-minimal:latest").await;
        assert!(result.is_err());

        let _ = tokio::fs::remove_dir_all(&cache_root).await;
    }
}
