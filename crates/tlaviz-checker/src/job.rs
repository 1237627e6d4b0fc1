//! Background model-check jobs.
//!
//! A [`TlcJob`] owns at most one running checker process at a time. Starting
//! a job is synchronous and cheap: the status flips to `Running`, the results
//! are reset, subscribers are told, and the actual work moves onto a Tokio
//! task. Everything that can go wrong in that task is folded into the final
//! status and `error_message`; nothing is returned to the caller.
//!
//! Results are published as whole [`RunResults`] snapshots behind an `Arc`,
//! so a reader sees either the empty snapshot of the current run or its final
//! one.
//!
//! # Example
//!
//! ```rust,ignore
//! use tlaviz_checker::{TlcJob, TlcRunner};
//!
//! let job = TlcJob::new(TlcRunner::new("/opt/tla/tla2tools.jar"));
//! job.on_status(|status| println!("status: {status}"));
//!
//! assert!(job.start("specs/Counter.tla", Some("specs/Counter.cfg".as_ref())));
//! let status = job.wait().await;
//! println!("{}", job.results());
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tlaviz_core::model::{JobId, JobStatus, RunResults};
use tlaviz_core::JobError;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::parser;
use crate::runner::{Invocation, TlcRunner};
use crate::store::{self, StoreError};

/// Callback invoked on every status change.
pub type StatusCallback = Arc<dyn Fn(JobStatus) + Send + Sync>;

/// Callback invoked with a percentage and a message as a job progresses.
pub type ProgressCallback = Arc<dyn Fn(u8, &str) + Send + Sync>;

struct JobState {
    status: JobStatus,
    results: Arc<RunResults>,
    cancel: watch::Sender<bool>,
}

struct JobShared {
    state: Mutex<JobState>,
    status_tx: watch::Sender<JobStatus>,
    status_callbacks: Mutex<Vec<StatusCallback>>,
    progress_callbacks: Mutex<Vec<ProgressCallback>>,
}

impl JobShared {
    fn notify_status(&self, status: JobStatus) {
        let callbacks = self.status_callbacks.lock().clone();
        for callback in callbacks {
            callback(status);
        }
    }

    fn notify_progress(&self, percent: u8, message: &str) {
        debug!(percent, message, "Job progress");
        let callbacks = self.progress_callbacks.lock().clone();
        for callback in callbacks {
            callback(percent, message);
        }
    }

    /// Publishes the final snapshot and fires the terminal status callback.
    fn finish(&self, mut results: RunResults, error: Option<JobError>) {
        let error = error.or_else(|| {
            results
                .has_errors()
                .then(|| JobError::ToolReported(results.error_message.trim_end().to_string()))
        });

        if let Some(ref e) = error {
            if !matches!(e, JobError::ToolReported(_) | JobError::Cancelled) {
                results.error_message.push_str(&e.to_string());
                results.error_message.push('\n');
            }
        }

        let status = {
            let mut state = self.state.lock();
            let cancel_requested = *state.cancel.borrow();
            let status = if cancel_requested {
                JobStatus::Cancelled
            } else {
                error
                    .as_ref()
                    .map_or(JobStatus::Completed, JobError::terminal_status)
            };

            results.status = status;
            state.status = status;
            state.results = Arc::new(results);
            self.status_tx.send_replace(status);
            status
        };

        match (status, error) {
            (JobStatus::Completed, _) => info!("Model check completed"),
            (_, Some(e)) => info!(%status, error = %e, "Model check finished"),
            (_, None) => info!(%status, "Model check finished"),
        }
        self.notify_status(status);
    }
}

/// A spawned run and the runtime it was spawned on.
struct Worker {
    task: JoinHandle<()>,
    runtime: Handle,
}

/// Orchestrates one TLC run at a time in the background.
pub struct TlcJob {
    runner: TlcRunner,
    shared: Arc<JobShared>,
    worker: Mutex<Option<Worker>>,
}

impl TlcJob {
    /// Creates an idle job that will launch TLC through `runner`.
    pub fn new(runner: TlcRunner) -> Self {
        let (cancel, _) = watch::channel(false);
        let (status_tx, _) = watch::channel(JobStatus::NotStarted);

        TlcJob {
            runner,
            shared: Arc::new(JobShared {
                state: Mutex::new(JobState {
                    status: JobStatus::NotStarted,
                    results: Arc::new(RunResults::default()),
                    cancel,
                }),
                status_tx,
                status_callbacks: Mutex::new(Vec::new()),
                progress_callbacks: Mutex::new(Vec::new()),
            }),
            worker: Mutex::new(None),
        }
    }

    /// The runner used to launch TLC.
    pub fn runner(&self) -> &TlcRunner {
        &self.runner
    }

    /// Registers a status callback.
    ///
    /// Callbacks run on whichever thread changes the status, usually the
    /// worker task. They must not call [`TlcJob::start`].
    pub fn on_status(&self, callback: impl Fn(JobStatus) + Send + Sync + 'static) {
        self.shared.status_callbacks.lock().push(Arc::new(callback));
    }

    /// Registers a progress callback. Progress is best-effort and never
    /// reported after the terminal status.
    pub fn on_progress(&self, callback: impl Fn(u8, &str) + Send + Sync + 'static) {
        self.shared.progress_callbacks.lock().push(Arc::new(callback));
    }

    /// Starts checking `spec_path`, optionally with a model config.
    ///
    /// Returns false, changing nothing, if a job is already running. Input
    /// validation happens on the worker, so a missing spec still returns true
    /// and the job then ends `Failed`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self, spec_path: impl AsRef<Path>, config_path: Option<&Path>) -> bool {
        let spec_path = spec_path.as_ref().to_path_buf();
        let config_path = config_path.map(Path::to_path_buf);

        // Held until the handle is stored so waiters never miss a worker.
        let mut worker = self.worker.lock();

        let job_id = JobId::new();
        let cancel_rx = {
            let mut state = self.shared.state.lock();
            if state.status == JobStatus::Running {
                warn!(spec = %spec_path.display(), "Job already running, start ignored");
                return false;
            }

            let (cancel_tx, cancel_rx) = watch::channel(false);
            state.status = JobStatus::Running;
            state.results = Arc::new(RunResults::running(job_id, Utc::now()));
            state.cancel = cancel_tx;
            self.shared.status_tx.send_replace(JobStatus::Running);
            cancel_rx
        };

        info!(
            job_id = %job_id,
            spec = %spec_path.display(),
            config = ?config_path,
            "Starting model check"
        );
        self.shared.notify_status(JobStatus::Running);

        let span = info_span!("tlc_job", job_id = %job_id);
        let runtime = Handle::current();
        let task = runtime.spawn(
            run_job(
                Arc::clone(&self.shared),
                self.runner.clone(),
                spec_path,
                config_path,
                cancel_rx,
            )
            .instrument(span),
        );
        *worker = Some(Worker { task, runtime });
        true
    }

    /// Requests cancellation of the running job. No-op otherwise.
    pub fn cancel(&self) {
        let state = self.shared.state.lock();
        if state.status != JobStatus::Running {
            return;
        }
        let already_requested = *state.cancel.borrow();
        if !already_requested {
            info!("Cancellation requested");
            state.cancel.send_replace(true);
        }
    }

    /// Current status.
    pub fn status(&self) -> JobStatus {
        self.shared.state.lock().status
    }

    /// Whether a cancellation has been requested for the current job.
    pub fn is_cancel_requested(&self) -> bool {
        *self.shared.state.lock().cancel.borrow()
    }

    /// The last fully published results.
    pub fn results(&self) -> Arc<RunResults> {
        Arc::clone(&self.shared.state.lock().results)
    }

    /// Waits until the job is no longer running and its worker has exited.
    pub async fn wait(&self) -> JobStatus {
        let mut rx = self.shared.status_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|status| *status != JobStatus::Running).await;
        self.join_worker().await;
        self.status()
    }

    /// Cancels any running job and waits for its worker to exit.
    pub async fn shutdown(&self) {
        self.cancel();
        self.join_worker().await;
    }

    async fn join_worker(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.task.await {
                warn!(error = %e, "Job worker did not exit cleanly");
            }
        }
    }

    /// Saves the current results snapshot to `path`.
    pub fn save_results(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        store::save(path, &self.results())
    }

    /// Replaces the current results with a saved snapshot.
    ///
    /// Refused while a job is running. The job ends up `Completed`.
    pub fn load_results(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        {
            let mut state = self.shared.state.lock();
            if state.status == JobStatus::Running {
                return Err(StoreError::JobRunning);
            }
            let loaded = store::load(path)?;
            state.status = loaded.status;
            state.results = Arc::new(loaded);
            self.shared.status_tx.send_replace(state.status);
        }
        self.shared.notify_status(JobStatus::Completed);
        Ok(())
    }
}

impl Drop for TlcJob {
    fn drop(&mut self) {
        self.cancel();

        let Some(Worker { task, runtime }) = self.worker.get_mut().take() else {
            return;
        };
        if task.is_finished() {
            return;
        }

        let joined = match Handle::try_current() {
            Ok(current) if current.runtime_flavor() == RuntimeFlavor::MultiThread => {
                debug!("Waiting for job worker to exit");
                tokio::task::block_in_place(|| current.block_on(task))
            }
            // Blocking here would stall the only thread that can drive the worker.
            Ok(_) => {
                warn!("Job dropped on a current-thread runtime, worker not joined");
                return;
            }
            // Outside any runtime: the worker's own runtime drives it to the end.
            Err(_) if runtime.runtime_flavor() == RuntimeFlavor::MultiThread => {
                debug!("Waiting for job worker to exit");
                runtime.block_on(task)
            }
            Err(_) => {
                warn!("Job dropped outside its current-thread runtime, worker not joined");
                return;
            }
        };
        if let Err(e) = joined {
            warn!(error = %e, "Job worker did not exit cleanly");
        }
    }
}

async fn run_job(
    shared: Arc<JobShared>,
    runner: TlcRunner,
    spec_path: PathBuf,
    config_path: Option<PathBuf>,
    mut cancel: watch::Receiver<bool>,
) {
    let mut results = (*shared.state.lock().results).clone();

    shared.notify_progress(0, "Validating inputs");
    let invocation = match Invocation::resolve(&spec_path, config_path.as_deref()) {
        Ok(invocation) => invocation,
        Err(e) => {
            warn!(error = %e, "Model check rejected");
            shared.finish(results, Some(e));
            return;
        }
    };

    let cancel_requested = *cancel.borrow();
    if cancel_requested {
        shared.finish(results, Some(JobError::Cancelled));
        return;
    }

    shared.notify_progress(10, "Running TLC");
    let run = runner.execute(&invocation, &mut cancel).await;
    results.execution_time_seconds = run.elapsed.as_secs_f64();

    // A killed run still reports whatever TLC printed before it died.
    if let Some(captured) = run.output {
        shared.notify_progress(90, "Parsing output");
        let parsed = parser::parse_output(&captured.text);
        results = RunResults {
            job_id: results.job_id,
            started_at: results.started_at,
            execution_time_seconds: results.execution_time_seconds,
            exit_code: captured.exit_code,
            raw_output: Some(captured.text),
            ..parsed
        };
    }

    shared.notify_progress(100, "Finished");
    shared.finish(results, run.error);
}
