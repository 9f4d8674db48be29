use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt},
    process::Child,
    task::JoinHandle,
};
use tracing::{debug, info, warn, Instrument};

use crate::config::HarnessConfig;
use crate::container::{ContainerRuntime, RunArgs, VolumeSpec};
use crate::log_scope::LogScope;

///////////////////////////////////////////////////////////////////////////////

const CERTS_MOUNT: &str = "/certs";
const TERMINATE_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Success,
    Failure,
}

impl Expectation {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub name: String,
    pub container_name: String,
    pub expectation: Expectation,
    pub exit_code: i32,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

///////////////////////////////////////////////////////////////////////////////

/// Runs one-shot client containers against the database under test.
#[derive(Debug, Clone)]
pub struct Runner {
    config: HarnessConfig,
    runtime: ContainerRuntime,
}

impl Runner {
    pub fn new(config: HarnessConfig) -> Self {
        let runtime = ContainerRuntime::new(config.runtime_config());
        Self { config, runtime }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub async fn run_success(
        &self,
        scope: &LogScope,
        name: &str,
        cmd: Vec<String>,
    ) -> Result<CaseOutcome, HarnessError> {
        self.run(scope, name, cmd, Expectation::Success).await
    }

    pub async fn run_fail(
        &self,
        scope: &LogScope,
        name: &str,
        cmd: Vec<String>,
    ) -> Result<CaseOutcome, HarnessError> {
        self.run(scope, name, cmd, Expectation::Failure).await
    }

    pub async fn run(
        &self,
        scope: &LogScope,
        name: &str,
        cmd: Vec<String>,
        expectation: Expectation,
    ) -> Result<CaseOutcome, HarnessError> {
        let container_name = self.container_name(name);
        let span = tracing::info_span!("run_case", case = name, container = %container_name);

        self.run_container(scope, name, container_name, cmd, expectation)
            .instrument(span)
            .await
    }

    async fn run_container(
        &self,
        scope: &LogScope,
        name: &str,
        container_name: String,
        cmd: Vec<String>,
        expectation: Expectation,
    ) -> Result<CaseOutcome, HarnessError> {
        let run_args = self.run_args(container_name.clone(), cmd)?;
        info!(image = %run_args.image, ?expectation, "Starting client container");

        let started_at = Utc::now();
        let start = Instant::now();

        let mut child = self
            .runtime
            .run_cmd(run_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                binary: self.runtime.binary(),
                source,
            })?;

        let mut forwarders = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(forward_to_logging(
                stdout,
                name.to_owned(),
                "stdout",
                scope.log_path(name, "stdout"),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(forward_to_logging(
                stderr,
                name.to_owned(),
                "stderr",
                scope.log_path(name, "stderr"),
            ));
        }

        let status = match tokio::time::timeout(self.config.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(timeout = ?self.config.timeout, "Container timed out, terminating");
                self.terminate(&mut child, &container_name).await;
                for f in forwarders {
                    f.abort();
                }
                return Err(HarnessError::Timeout {
                    name: name.to_owned(),
                    timeout: self.config.timeout,
                    log_dir: scope.path().to_owned(),
                });
            }
        };

        for f in forwarders {
            f.await.map_err(std::io::Error::other)??;
        }

        let elapsed = start.elapsed();
        let actual = status.code();
        info!(exit_code = ?actual, ?elapsed, "Client container exited");

        if actual != Some(expectation.exit_code()) {
            return Err(HarnessError::UnexpectedExit {
                name: name.to_owned(),
                expected: expectation.exit_code(),
                actual,
                log_dir: scope.path().to_owned(),
            });
        }

        Ok(CaseOutcome {
            name: name.to_owned(),
            container_name,
            expectation,
            exit_code: expectation.exit_code(),
            started_at,
            elapsed,
        })
    }

    fn run_args(&self, container_name: String, cmd: Vec<String>) -> Result<RunArgs, HarnessError> {
        let certs_dir = if self.config.certs_dir.is_absolute() {
            self.config.certs_dir.clone()
        } else {
            std::env::current_dir()?.join(&self.config.certs_dir)
        };

        Ok(RunArgs {
            image: self.config.image.clone(),
            container_name: Some(container_name),
            network: self.config.network.clone(),
            volumes: vec![VolumeSpec {
                source: certs_dir,
                dest: PathBuf::from(CERTS_MOUNT),
                read_only: true,
            }],
            environment: self.config.client_env(),
            entry_point: None,
            args: cmd,
            remove: true,
        })
    }

    fn container_name(&self, name: &str) -> String {
        use rand::Rng;

        let mut container_name = format!("{}-{}-", self.config.container_prefix, name);
        container_name.extend(
            rand::thread_rng()
                .sample_iter(&rand::distributions::Alphanumeric)
                .take(10)
                .map(char::from),
        );
        container_name
    }

    /// SIGTERM to the runtime client (which proxies it to the container), then
    /// a hard kill of both once the grace period runs out.
    async fn terminate(&self, child: &mut Child, container_name: &str) {
        if let Some(pid) = child.id() {
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
            if tokio::time::timeout(TERMINATE_GRACE, child.wait())
                .await
                .is_ok()
            {
                debug!("Runtime client exited after SIGTERM");
            }
        }

        let _ = child.kill().await;

        match self
            .runtime
            .kill_cmd(container_name)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(status) if status.success() => debug!("Container killed"),
            Ok(_) => debug!("Container already gone"),
            Err(e) => warn!(error = %e, "Failed to kill container"),
        }
    }
}

///////////////////////////////////////////////////////////////////////////////

/// Forwards every output line of the container both to tracing and to a log
/// file.
pub fn forward_to_logging<R>(
    reader: R,
    process: String,
    stream: &'static str,
    log_path: PathBuf,
) -> JoinHandle<std::io::Result<()>>
where
    R: tokio::io::AsyncRead + Send + 'static + Unpin,
{
    let mut reader = tokio::io::BufReader::new(reader);
    tokio::spawn(async move {
        let mut log = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await?;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            log.write_all(&buf).await?;

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);
            info!(message = line, process = process.as_str(), stream = stream);
        }

        log.flush().await
    })
}

///////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to spawn container runtime {}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{name}: container did not exit within {timeout:?}, logs in {}", .log_dir.display())]
    Timeout {
        name: String,
        timeout: Duration,
        log_dir: PathBuf,
    },
    #[error(
        "{name}: expected exit code {expected}, got {}, logs in {}",
        .actual.map(|c| c.to_string()).unwrap_or_else(|| "none (killed by signal)".to_owned()),
        .log_dir.display()
    )]
    UnexpectedExit {
        name: String,
        expected: i32,
        actual: Option<i32>,
        log_dir: PathBuf,
    },
}

///////////////////////////////////////////////////////////////////////////////
