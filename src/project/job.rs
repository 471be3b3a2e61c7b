//! Analysis job requests, lifecycle states and outcomes.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::base::FileId;
use crate::hir::Features;

use super::source::SourceError;

/// Scheduling priority; lower runs first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    /// Base-library files another job is waiting for.
    Best,
    High,
    #[default]
    Normal,
    /// Jobs rescheduled after waiting for the base library.
    Low,
}

/// Where a job is in its life.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Reading,
    ContextAndDeclarationBuild,
    /// Parked until the base library is published.
    NeedsRebuildLaterDueToMissingBaseLibrary,
    UseBuild,
    Published,
    Cancelled,
    Superseded,
    Failed,
}

impl JobState {
    pub fn is_final(self) -> bool {
        matches!(
            self,
            JobState::Published | JobState::Cancelled | JobState::Superseded | JobState::Failed
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Cooperative cancellation flag shared between a caller and a job.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A request to analyse one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRequest {
    pub file: FileId,
    pub priority: Priority,
    /// How far the analysis has to go.
    pub features: Features,
    /// Rebuild even when an up-to-date result is published.
    pub force: bool,
    /// Set on jobs rescheduled after waiting for the base library.
    pub requires_reparse: bool,
}

impl JobRequest {
    pub fn new(file: FileId) -> Self {
        Self {
            file,
            priority: Priority::Normal,
            features: Features::AllDeclarationsAndUses,
            force: false,
            requires_reparse: false,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// How a job ended.
#[derive(Debug)]
pub enum JobOutcome {
    Published {
        file: FileId,
        generation: u64,
        /// The published result was already up to date.
        reused: bool,
    },
    /// The base library is incomplete; the job was parked.
    RequiresReparse { file: FileId, missing: Vec<FileId> },
    Cancelled(FileId),
    Superseded(FileId),
    Failed { file: FileId, error: SourceError },
}

impl JobOutcome {
    pub fn file(&self) -> FileId {
        match self {
            JobOutcome::Published { file, .. }
            | JobOutcome::RequiresReparse { file, .. }
            | JobOutcome::Failed { file, .. } => *file,
            JobOutcome::Cancelled(file) | JobOutcome::Superseded(file) => *file,
        }
    }

    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Published { .. } => JobState::Published,
            JobOutcome::RequiresReparse { .. } => JobState::NeedsRebuildLaterDueToMissingBaseLibrary,
            JobOutcome::Cancelled(_) => JobState::Cancelled,
            JobOutcome::Superseded(_) => JobState::Superseded,
            JobOutcome::Failed { .. } => JobState::Failed,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, JobOutcome::Published { .. })
    }
}
