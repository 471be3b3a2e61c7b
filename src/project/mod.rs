//! Project plumbing around the semantic model.
//!
//! - [`FileSet`] - stable file ids, document text and revisions
//! - [`IncludePaths`] - cached listings of include directories
//! - [`stdlib`] - which files form the base library
//! - [`Orchestrator`] - per-file analysis jobs on a worker pool

mod include_paths;
mod job;
mod orchestrator;
mod source;
pub mod stdlib;

pub use include_paths::IncludePaths;
pub use job::{CancelToken, JobOutcome, JobRequest, JobState, Priority};
pub use orchestrator::{AnalysisError, Orchestrator, PublishEvent, PublishListener};
pub use source::{Document, DocumentSource, FileSet, SourceError};
