//! # tlaviz-report
//!
//! Presentation-ready views of a TLC run.
//!
//! This crate turns the [`RunResults`](tlaviz_core::RunResults) of a run into
//! things a viewer or a reviewer can consume:
//!
//! - [`trace`]: counterexample steps with the action that led into each state
//! - [`layout`]: a deterministic circular layout
//! - [`graph`]: the laid-out state graph
//! - [`json`] and [`markdown`]: trace exports
//!
//! ## Example
//!
//! ```rust,ignore
//! use tlaviz_report::{
//!     reconstruct_trace, CircularLayout, JsonTraceExporter, MarkdownTraceExporter, StateGraph,
//! };
//!
//! let graph = StateGraph::from_results(&results, &CircularLayout::default());
//!
//! if let Some(ce) = results.counterexamples.first() {
//!     let steps = reconstruct_trace(ce, &results);
//!     let json = JsonTraceExporter::new().export(&steps)?;
//!     let markdown = MarkdownTraceExporter::new().export(&steps);
//! }
//! ```

pub mod error;
pub mod graph;
pub mod json;
pub mod layout;
pub mod markdown;
pub mod trace;

pub use error::ExportError;
pub use graph::{GraphNode, StateGraph};
pub use json::{JsonFormat, JsonTraceExporter};
pub use layout::{CircularLayout, LayoutConfig, Position};
pub use markdown::MarkdownTraceExporter;
pub use trace::{reconstruct_trace, TraceStep, TraceView, INITIAL_ACTION};
