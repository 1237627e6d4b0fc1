//! TLC process invocation.
//!
//! [`TlcRunner`] turns a spec path (and optional model config path) into a
//! non-interactive `java -jar tla2tools.jar -tool ...` invocation, runs it to
//! completion and captures everything it wrote. Arguments are always passed
//! as discrete tokens; no shell is involved.
//!
//! # Example
//!
//! ```rust,ignore
//! use tlaviz_checker::runner::TlcRunner;
//! use std::time::Duration;
//!
//! let runner = TlcRunner::builder("/opt/tla/tla2tools.jar")
//!     .with_timeout(Duration::from_secs(600))
//!     .with_heap_size(2048)
//!     .build();
//!
//! let version = runner.check_availability().await?;
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tlaviz_core::JobError;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::RunnerConfig;

/// Absolute, validated paths for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Absolute path of the specification.
    pub spec_path: PathBuf,

    /// Absolute path of the model config, if one was given and exists.
    pub config_path: Option<PathBuf>,
}

impl Invocation {
    /// Validates and absolutises the paths of a run.
    ///
    /// A missing spec is an error. A missing config is dropped silently.
    pub fn resolve(spec_path: &Path, config_path: Option<&Path>) -> Result<Self, JobError> {
        if !spec_path.exists() {
            return Err(JobError::spec_not_found(spec_path.display().to_string()));
        }
        let spec_path = std::path::absolute(spec_path)?;

        let config_path = match config_path {
            Some(path) if path.exists() => Some(std::path::absolute(path)?),
            Some(path) => {
                debug!(config = %path.display(), "Config file not found, omitting it");
                None
            }
            None => None,
        };

        Ok(Invocation {
            spec_path,
            config_path,
        })
    }
}

/// Everything the checker wrote before it exited or was killed.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// Standard output followed by standard error.
    pub text: String,

    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
}

/// Result of one process execution.
#[derive(Debug)]
pub struct ProcessRun {
    /// Time from just before spawn to just after exit, including a kill.
    pub elapsed: Duration,

    /// Captured output. `None` only if the process never started.
    pub output: Option<CapturedOutput>,

    /// Why the run did not end with a normal exit.
    pub error: Option<JobError>,
}

/// How long to keep draining pipes once the process has been killed.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

enum Stop {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut,
}

/// Drains one child pipe into a shared buffer on its own task.
struct PipeReader {
    task: JoinHandle<()>,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl PipeReader {
    fn spawn<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let task = tokio::spawn(async move {
            let Some(mut pipe) = pipe else {
                return;
            };
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        warn!(error = %e, "Failed to read TLC output");
                        break;
                    }
                }
            }
        });
        PipeReader { task, buffer }
    }

    /// Waits for the pipe to close, or at most `grace`, and returns what was
    /// read.
    async fn finish(mut self, grace: Option<Duration>) -> Vec<u8> {
        match grace {
            None => {
                let _ = (&mut self.task).await;
            }
            Some(grace) => {
                if tokio::time::timeout(grace, &mut self.task).await.is_err() {
                    debug!("Pipe still open after kill, keeping partial output");
                    self.task.abort();
                }
            }
        }
        std::mem::take(&mut *self.buffer.lock())
    }
}

/// Kills the child and waits for it to be reaped.
async fn kill_and_reap(child: &mut Child) -> Option<ExitStatus> {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill TLC");
    }
    match child.wait().await {
        Ok(status) => Some(status),
        Err(e) => {
            warn!(error = %e, "Failed to reap TLC");
            None
        }
    }
}

/// Runner for executing TLC as a subprocess.
#[derive(Debug, Clone)]
pub struct TlcRunner {
    /// Path to tla2tools.jar.
    tla2tools_path: PathBuf,

    /// Optional Java home directory.
    java_home: Option<PathBuf>,

    /// Maximum execution time.
    timeout: Option<Duration>,

    /// Number of worker threads.
    workers: Option<u32>,

    /// JVM heap size in megabytes.
    heap_size_mb: Option<u32>,

    /// Additional JVM arguments.
    jvm_args: Vec<String>,

    /// Additional TLC arguments.
    tlc_args: Vec<String>,

    /// Working directory for TLC.
    work_dir: Option<PathBuf>,

    /// Whether cancellation kills the process.
    kill_on_cancel: bool,
}

impl TlcRunner {
    /// Create a new TLC runner with the path to tla2tools.jar.
    pub fn new(tla2tools_path: impl Into<PathBuf>) -> Self {
        TlcRunner {
            tla2tools_path: tla2tools_path.into(),
            java_home: None,
            timeout: None,
            workers: None,
            heap_size_mb: None,
            jvm_args: Vec::new(),
            tlc_args: Vec::new(),
            work_dir: None,
            kill_on_cancel: true,
        }
    }

    /// Create a builder for more complex configuration.
    pub fn builder(tla2tools_path: impl Into<PathBuf>) -> TlcRunnerBuilder {
        TlcRunnerBuilder::new(tla2tools_path)
    }

    /// Create a runner from loaded configuration.
    pub fn from_config(config: &RunnerConfig) -> Self {
        TlcRunner {
            tla2tools_path: config.tla2tools_path.clone(),
            java_home: config.java_home.clone(),
            timeout: config.timeout(),
            workers: config.workers,
            heap_size_mb: config.heap_size_mb,
            jvm_args: config.jvm_args.clone(),
            tlc_args: config.tlc_args.clone(),
            work_dir: config.work_dir.clone(),
            kill_on_cancel: config.kill_on_cancel,
        }
    }

    /// Whether cancellation kills the process.
    pub fn kill_on_cancel(&self) -> bool {
        self.kill_on_cancel
    }

    /// Get the path to the Java executable.
    pub fn java_path(&self) -> PathBuf {
        if let Some(ref java_home) = self.java_home {
            java_home.join("bin").join("java")
        } else {
            PathBuf::from("java")
        }
    }

    /// Argument tokens passed to the Java runtime, in order.
    pub fn command_args(&self, invocation: &Invocation) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        if let Some(heap) = self.heap_size_mb {
            args.push(format!("-Xmx{}m", heap).into());
            args.push(format!("-Xms{}m", heap / 2).into());
        }
        args.extend(self.jvm_args.iter().map(OsString::from));

        args.push("-jar".into());
        args.push(self.tla2tools_path.clone().into());
        args.push("-tool".into());
        args.push(invocation.spec_path.clone().into());

        if let Some(ref config) = invocation.config_path {
            args.push("-config".into());
            args.push(config.clone().into());
        }

        if let Some(workers) = self.workers {
            args.push("-workers".into());
            args.push(workers.to_string().into());
        }
        args.extend(self.tlc_args.iter().map(OsString::from));

        args
    }

    /// Build the command for running TLC.
    fn build_command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(self.java_path());
        cmd.args(self.command_args(invocation));

        if let Some(ref work_dir) = self.work_dir {
            cmd.current_dir(work_dir);
        } else if let Some(parent) = invocation.spec_path.parent() {
            cmd.current_dir(parent);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        cmd
    }

    /// Run TLC to completion and capture its output.
    ///
    /// When the runner kills on cancel, a cancellation signalled through
    /// `cancel` stops the wait and kills the process. Otherwise the signal is
    /// ignored here and the process runs to exit.
    pub async fn execute(
        &self,
        invocation: &Invocation,
        cancel: &mut watch::Receiver<bool>,
    ) -> ProcessRun {
        let mut cmd = self.build_command(invocation);
        debug!(command = ?cmd, "Running TLC command");

        let start = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(error = %e, "Failed to spawn TLC");
                return ProcessRun {
                    elapsed: start.elapsed(),
                    output: None,
                    error: Some(JobError::ProcessLaunch(e)),
                };
            }
        };

        let stdout = PipeReader::spawn(child.stdout.take());
        let stderr = PipeReader::spawn(child.stderr.take());

        let stop = tokio::select! {
            status = child.wait() => Stop::Exited(status),
            _ = cancelled(cancel), if self.kill_on_cancel => Stop::Cancelled,
            _ = deadline(self.timeout) => Stop::TimedOut,
        };

        let (status, error) = match stop {
            Stop::Exited(Ok(status)) => (Some(status), None),
            Stop::Exited(Err(e)) => (None, Some(JobError::ProcessLaunch(e))),
            Stop::Cancelled => {
                warn!("Cancellation requested, killing TLC");
                (kill_and_reap(&mut child).await, Some(JobError::Cancelled))
            }
            Stop::TimedOut => {
                warn!(timeout = ?self.timeout, "TLC timed out, killing it");
                let status = kill_and_reap(&mut child).await;
                (status, Some(JobError::Timeout(self.timeout.unwrap_or_default())))
            }
        };
        let elapsed = start.elapsed();

        let exit_code = status.and_then(|s| s.code());
        debug!(?exit_code, "TLC exited");

        // After a kill, a grandchild may still hold the pipes open.
        let grace = error.as_ref().map(|_| PIPE_DRAIN_GRACE);
        let stdout = stdout.finish(grace).await;
        let stderr = stderr.finish(grace).await;

        let text = combine_output(&stdout, &stderr);
        for line in text.lines() {
            trace!("TLC: {}", line);
        }

        ProcessRun {
            elapsed,
            output: Some(CapturedOutput { text, exit_code }),
            error,
        }
    }

    /// Check if TLC is available (tla2tools.jar exists and Java runs).
    ///
    /// Returns the first line of the Java version banner.
    pub async fn check_availability(&self) -> Result<String, JobError> {
        if !self.tla2tools_path.exists() {
            return Err(JobError::ProcessLaunch(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("TLC not found at path: {}", self.tla2tools_path.display()),
            )));
        }

        let output = Command::new(self.java_path())
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(JobError::ProcessLaunch(std::io::Error::other(
                "Java version check failed",
            )));
        }

        // `java -version` prints to stderr.
        let banner = String::from_utf8_lossy(&output.stderr);
        Ok(banner.lines().next().unwrap_or("unknown").to_string())
    }
}

/// Builder for TlcRunner with additional configuration options.
#[derive(Debug, Clone)]
pub struct TlcRunnerBuilder {
    runner: TlcRunner,
}

impl TlcRunnerBuilder {
    /// Create a new builder.
    pub fn new(tla2tools_path: impl Into<PathBuf>) -> Self {
        TlcRunnerBuilder {
            runner: TlcRunner::new(tla2tools_path),
        }
    }

    /// Set the Java home directory.
    pub fn with_java_home(mut self, java_home: impl Into<PathBuf>) -> Self {
        self.runner.java_home = Some(java_home.into());
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.runner.timeout = Some(timeout);
        self
    }

    /// Set the number of workers.
    pub fn with_workers(mut self, workers: u32) -> Self {
        self.runner.workers = Some(workers);
        self
    }

    /// Set the heap size in megabytes.
    pub fn with_heap_size(mut self, size_mb: u32) -> Self {
        self.runner.heap_size_mb = Some(size_mb);
        self
    }

    /// Add a JVM argument.
    pub fn with_jvm_arg(mut self, arg: impl Into<String>) -> Self {
        self.runner.jvm_args.push(arg.into());
        self
    }

    /// Add a TLC argument.
    pub fn with_tlc_arg(mut self, arg: impl Into<String>) -> Self {
        self.runner.tlc_args.push(arg.into());
        self
    }

    /// Set the working directory.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runner.work_dir = Some(dir.into());
        self
    }

    /// Choose whether cancellation kills the process.
    pub fn kill_on_cancel(mut self, kill: bool) -> Self {
        self.runner.kill_on_cancel = kill;
        self
    }

    /// Build the runner.
    pub fn build(self) -> TlcRunner {
        self.runner
    }
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&String::from_utf8_lossy(stderr));
    text
}

/// Resolves once cancellation has been signalled.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|requested| *requested).await.is_err() {
        // Sender gone without a request: never cancelled.
        std::future::pending::<()>().await;
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending::<()>().await,
    }
}
