//! tlaviz Checker - running TLC and recovering its results.
//!
//! This crate drives the TLC model checker as a background job and turns its
//! free-form output into a [`RunResults`](tlaviz_core::RunResults):
//!
//! - [`job`]: the [`TlcJob`] orchestrator (start, cancel, status, results)
//! - [`runner`]: process invocation through a [`TlcRunner`]
//! - [`parser`]: line classifiers and the output parser
//! - [`config`]: TOML runner configuration
//! - [`store`]: line-oriented result snapshots
//!
//! # Example
//!
//! ```rust,ignore
//! use tlaviz_checker::{RunnerConfig, TlcJob, TlcRunner};
//!
//! let config = RunnerConfig::from_file("tlaviz.toml")?;
//! let job = TlcJob::new(TlcRunner::from_config(&config));
//!
//! job.start("specs/Counter.tla", None);
//! job.wait().await;
//!
//! let results = job.results();
//! println!("{} distinct states", results.distinct_states);
//! ```

pub mod config;
pub mod job;
pub mod parser;
pub mod runner;
pub mod store;

pub use config::{ConfigError, RunnerConfig};
pub use job::{ProgressCallback, StatusCallback, TlcJob};
pub use parser::{classify_line, parse_output, LineMatch};
pub use runner::{Invocation, TlcRunner, TlcRunnerBuilder};
pub use store::StoreError;
