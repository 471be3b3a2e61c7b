//! Per-file analysis jobs on a fixed worker pool.
//!
//! A job goes Queued → Reading → ContextAndDeclarationBuild → UseBuild →
//! Published. The declaration pass runs under the store's write lock, the
//! use pass under its read lock; uses are then moved into the pending
//! arena in batches under short write locks before the final publish.
//!
//! A file whose declaration pass finds the base library incomplete is
//! parked at low priority and the missing library files are queued at the
//! best priority. [`Orchestrator::run`] works in waves, one priority level
//! at a time, until nothing is queued or a wave publishes nothing.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::base::{FileId, TextRange, TextSize};
use crate::config::{AnalysisConfig, ConfigError};
use crate::hir::{
    BuildOptions, ContextId, DeclarationBuilder, DeclarationOutcome, DiagnosticCollector, Features,
    FileSymbols, SymbolStore, UseBuilder,
};
use crate::syntax::parse;

use super::include_paths::IncludePaths;
use super::job::{CancelToken, JobOutcome, JobRequest, JobState, Priority};
use super::source::{DocumentSource, FileSet, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to start the worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Sent to every [`PublishListener`] after a file's analysis is published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishEvent {
    pub file: FileId,
    pub generation: u64,
    /// Nothing was rebuilt; the published result was already current.
    pub reused: bool,
    pub error_count: usize,
}

/// Downstream consumers of published results, such as highlighting.
pub trait PublishListener: Send + Sync {
    fn published(&self, event: &PublishEvent);
}

struct QueuedJob {
    request: JobRequest,
    cancel: CancelToken,
}

#[derive(Default)]
struct JobQueue {
    queued: IndexMap<FileId, QueuedJob>,
    /// Jobs waiting for the base library.
    parked: IndexMap<FileId, QueuedJob>,
    running: FxHashMap<FileId, CancelToken>,
    states: FxHashMap<FileId, JobState>,
    superseded: Vec<FileId>,
}

pub struct Orchestrator {
    store: Arc<RwLock<SymbolStore>>,
    files: Arc<FileSet>,
    source: Arc<dyn DocumentSource>,
    config: AnalysisConfig,
    options: BuildOptions,
    pool: rayon::ThreadPool,
    queue: Mutex<JobQueue>,
    listeners: RwLock<Vec<Arc<dyn PublishListener>>>,
    include_paths: IncludePaths,
    includes: RwLock<IndexSet<FileId>>,
    library_settled: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        store: Arc<RwLock<SymbolStore>>,
        files: Arc<FileSet>,
        config: AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("dscript-analysis-{i}"))
            .build()?;
        tracing::info!("analysis pool started with {} workers", config.workers);

        Ok(Self {
            store,
            source: files.clone(),
            files,
            options: config.build_options(),
            include_paths: IncludePaths::new(config.extension.clone()),
            config,
            pool,
            queue: Mutex::new(JobQueue::default()),
            listeners: RwLock::new(Vec::new()),
            includes: RwLock::new(IndexSet::new()),
            library_settled: AtomicBool::new(false),
        })
    }

    /// Read documents from `source` instead of the file set.
    pub fn with_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.source = source;
        self
    }

    pub fn store(&self) -> &Arc<RwLock<SymbolStore>> {
        &self.store
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn add_listener(&self, listener: Arc<dyn PublishListener>) {
        self.listeners.write().push(listener);
    }

    // ========================================================================
    // SCHEDULING
    // ========================================================================

    /// Queue a job, superseding any job still queued for the same file.
    /// New input also gives parked jobs another chance.
    pub fn schedule(&self, request: JobRequest) -> CancelToken {
        let mut queue = self.queue.lock();
        let parked: Vec<(FileId, QueuedJob)> = queue.parked.drain(..).collect();
        for (file, job) in parked {
            queue.states.insert(file, JobState::Queued);
            queue.queued.entry(file).or_insert(job);
        }
        Self::enqueue(&mut queue, request)
    }

    pub fn schedule_file(&self, file: FileId) -> CancelToken {
        self.schedule(JobRequest::new(file))
    }

    fn enqueue(queue: &mut JobQueue, request: JobRequest) -> CancelToken {
        let file = request.file;
        if let Some(old) = queue.queued.shift_remove(&file) {
            old.cancel.cancel();
            queue.superseded.push(file);
            tracing::debug!("job for {} superseded", file);
        }
        queue.parked.shift_remove(&file);
        let cancel = CancelToken::new();
        queue.queued.insert(
            file,
            QueuedJob {
                request,
                cancel: cancel.clone(),
            },
        );
        queue.states.insert(file, JobState::Queued);
        cancel
    }

    /// Cancel the queued, parked or running job of `file`.
    pub fn cancel(&self, file: FileId) -> bool {
        let queue = self.queue.lock();
        let token = queue
            .queued
            .get(&file)
            .or_else(|| queue.parked.get(&file))
            .map(|job| &job.cancel)
            .or_else(|| queue.running.get(&file));
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn job_state(&self, file: FileId) -> Option<JobState> {
        self.queue.lock().states.get(&file).copied()
    }

    /// Queued plus parked jobs.
    pub fn pending_jobs(&self) -> usize {
        let queue = self.queue.lock();
        queue.queued.len() + queue.parked.len()
    }

    /// Stop analysing `file` and drop its published result.
    pub fn remove_file(&self, file: FileId) {
        {
            let mut queue = self.queue.lock();
            if let Some(job) = queue.queued.shift_remove(&file) {
                job.cancel.cancel();
            }
            if let Some(job) = queue.parked.shift_remove(&file) {
                job.cancel.cancel();
            }
            if let Some(token) = queue.running.get(&file) {
                token.cancel();
            }
            queue.states.remove(&file);
        }
        self.includes.write().shift_remove(&file);
        self.store.write().remove_file(file);
    }

    // ========================================================================
    // INCLUDE PATHS
    // ========================================================================

    /// List every include directory (cached) and queue files not seen before.
    pub fn refresh_includes(&self) -> Vec<FileId> {
        let mut added = Vec::new();
        for dir in &self.config.include_dirs {
            for path in self.include_paths.files(dir).iter() {
                let file = self.files.file_id(path);
                if self.includes.write().insert(file) {
                    added.push(file);
                }
            }
        }
        if !added.is_empty() {
            tracing::debug!("{} new include files", added.len());
            let mut queue = self.queue.lock();
            for &file in &added {
                Self::enqueue(&mut queue, JobRequest::new(file));
            }
        }
        added
    }

    /// Forget the listing of an include directory so the next run rescans it.
    pub fn drop_include_cache(&self, dir: &Path) -> bool {
        self.include_paths.drop_cache(dir)
    }

    pub fn include_files(&self) -> Vec<FileId> {
        self.includes.read().iter().copied().collect()
    }

    /// Top contexts of published include files, as imported by `file`.
    fn include_tops(&self, store: &SymbolStore, file: FileId) -> Vec<ContextId> {
        self.includes
            .read()
            .iter()
            .copied()
            .filter(|&f| f != file && !store.is_library_file(f) && store.current(f).is_some())
            .map(ContextId::top)
            .collect()
    }

    // ========================================================================
    // RUNNING
    // ========================================================================

    /// Run queued jobs until idle. Returns every job's outcome in order of
    /// completion.
    pub fn run(&self) -> Vec<JobOutcome> {
        self.refresh_includes();
        self.requeue_dependents();
        let mut outcomes = Vec::new();
        loop {
            self.drain_superseded(&mut outcomes);
            let wave = self.next_wave();
            if wave.is_empty() {
                break;
            }
            tracing::debug!("running wave of {} jobs", wave.len());

            let results: Vec<JobOutcome> = self
                .pool
                .install(|| wave.par_iter().map(|job| self.run_job(job)).collect());

            let mut published = false;
            for (job, outcome) in wave.into_iter().zip(results) {
                published |= outcome.is_published();
                self.finish(job, &outcome);
                outcomes.push(outcome);
            }
            self.settle_library();
            self.requeue_dependents();

            let mut queue = self.queue.lock();
            if published {
                let parked: Vec<(FileId, QueuedJob)> = queue.parked.drain(..).collect();
                for (file, job) in parked {
                    queue.states.insert(file, JobState::Queued);
                    queue.queued.entry(file).or_insert(job);
                }
            } else if queue.queued.is_empty() {
                if !queue.parked.is_empty() {
                    tracing::debug!("{} jobs stay parked", queue.parked.len());
                }
                break;
            }
        }
        self.drain_superseded(&mut outcomes);
        outcomes
    }

    fn drain_superseded(&self, outcomes: &mut Vec<JobOutcome>) {
        let superseded = std::mem::take(&mut self.queue.lock().superseded);
        outcomes.extend(superseded.into_iter().map(JobOutcome::Superseded));
    }

    /// All queued jobs of the best priority present.
    fn next_wave(&self) -> Vec<QueuedJob> {
        let mut queue = self.queue.lock();
        let Some(priority) = queue.queued.values().map(|job| job.request.priority).min() else {
            return Vec::new();
        };
        let files: Vec<FileId> = queue
            .queued
            .iter()
            .filter(|(_, job)| job.request.priority == priority)
            .map(|(&file, _)| file)
            .collect();
        let mut wave = Vec::with_capacity(files.len());
        for file in files {
            if let Some(job) = queue.queued.shift_remove(&file) {
                queue.running.insert(file, job.cancel.clone());
                wave.push(job);
            }
        }
        wave
    }

    fn finish(&self, job: QueuedJob, outcome: &JobOutcome) {
        let file = job.request.file;
        let mut queue = self.queue.lock();
        queue.running.remove(&file);
        if queue.queued.contains_key(&file) {
            // A newer request arrived while this one ran.
            return;
        }
        queue.states.insert(file, outcome.state());

        if let JobOutcome::RequiresReparse { missing, .. } = outcome {
            let mut request = job.request;
            request.priority = Priority::Low;
            request.requires_reparse = true;
            queue.parked.insert(
                file,
                QueuedJob {
                    request,
                    cancel: job.cancel,
                },
            );
            for &library_file in missing {
                if !queue.queued.contains_key(&library_file) && !queue.running.contains_key(&library_file) {
                    Self::enqueue(&mut queue, JobRequest::new(library_file).with_priority(Priority::Best));
                }
            }
        }
    }

    /// Once the whole library is published for the first time, rebuild each
    /// library file so references between library files resolve.
    fn settle_library(&self) {
        if self.library_settled.load(Ordering::Acquire) {
            return;
        }
        let library: Vec<FileId> = {
            let store = self.store.read();
            if store.library_files().is_empty() || !store.library_ready() {
                return;
            }
            store.library_files().to_vec()
        };
        if self.library_settled.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("base library complete, re-queueing {} library files", library.len());
        let mut queue = self.queue.lock();
        for file in library {
            Self::enqueue(&mut queue, JobRequest::new(file).with_priority(Priority::High).forced());
        }
    }

    /// Force a rebuild of every published file importing from a file whose
    /// declarations changed, so their handles into it are re-resolved.
    fn requeue_dependents(&self) {
        let dependents: IndexMap<FileId, (Features, bool)> = {
            let mut store = self.store.write();
            let changed = store.take_changed();
            let mut dependents = IndexMap::new();
            for file in changed {
                for dependent in store.dependents(file) {
                    if let Some(arena) = store.current(dependent) {
                        dependents.insert(dependent, (arena.features, arena.is_library));
                    }
                }
            }
            dependents
        };
        if dependents.is_empty() {
            return;
        }
        tracing::debug!("re-queueing {} dependent files", dependents.len());
        let mut guard = self.queue.lock();
        let queue = &mut *guard;
        for (file, (features, is_library)) in dependents {
            if let Some(job) = queue.queued.get_mut(&file).or_else(|| queue.parked.get_mut(&file)) {
                job.request.force = true;
                continue;
            }
            let priority = if is_library { Priority::High } else { Priority::Normal };
            let request = JobRequest::new(file)
                .with_priority(priority)
                .with_features(features)
                .forced();
            Self::enqueue(queue, request);
        }
    }

    fn set_state(&self, file: FileId, state: JobState) {
        tracing::trace!("{}: {}", file, state);
        self.queue.lock().states.insert(file, state);
    }

    fn notify(&self, event: PublishEvent) {
        for listener in self.listeners.read().iter() {
            listener.published(&event);
        }
    }

    /// Discard whatever the job staged and report it cancelled.
    fn cancelled(&self, file: FileId) -> JobOutcome {
        self.store.write().discard(file);
        tracing::debug!("job for {} cancelled", file);
        JobOutcome::Cancelled(file)
    }

    fn run_job(&self, job: &QueuedJob) -> JobOutcome {
        let request = &job.request;
        let file = request.file;
        if job.cancel.is_cancelled() {
            return JobOutcome::Cancelled(file);
        }

        if let Some(outcome) = self.reuse(request) {
            return outcome;
        }

        self.set_state(file, JobState::Reading);
        let document = match self.source.read(file) {
            Ok(document) => document,
            Err(error) => {
                tracing::warn!("failed to read {}: {}", file, error);
                return JobOutcome::Failed { file, error };
            }
        };
        if job.cancel.is_cancelled() {
            return JobOutcome::Cancelled(file);
        }

        let parsed = parse(&document.text);
        if job.cancel.is_cancelled() {
            return JobOutcome::Cancelled(file);
        }
        let range = TextRange::up_to(TextSize::of(&*document.text));
        let mut syntax = DiagnosticCollector::new(file);
        for error in &parsed.errors {
            syntax.syntax(error.range, &error.message);
        }

        let Some(script) = parsed.script else {
            let generation = {
                let mut store = self.store.write();
                let mut arena = FileSymbols::new(file, range);
                arena.is_library = store.is_library_file(file);
                arena.revision = document.revision;
                arena.features = request.features;
                arena.diagnostics = syntax.take();
                store.stage(arena);
                store.publish(file)
            };
            return self.published(file, generation, false);
        };

        self.set_state(file, JobState::ContextAndDeclarationBuild);
        let outcome = {
            let mut store = self.store.write();
            let mut arena = FileSymbols::new(file, range);
            arena.is_library = store.is_library_file(file);
            arena.revision = document.revision;
            arena.features = request.features;
            let includes = if arena.is_library {
                Vec::new()
            } else {
                self.include_tops(&store, file)
            };
            let outcome = DeclarationBuilder::new(&store, &self.options, arena)
                .with_includes(includes)
                .build(&script);
            match outcome {
                DeclarationOutcome::Built(arena) => {
                    store.stage(arena);
                    None
                }
                DeclarationOutcome::RequiresReparse { missing } => Some(missing),
            }
        };
        if let Some(missing) = outcome {
            tracing::debug!("{} waits for {} base library files", file, missing.len());
            return JobOutcome::RequiresReparse { file, missing };
        }
        if job.cancel.is_cancelled() {
            return self.cancelled(file);
        }

        if request.features < Features::AllDeclarationsAndUses {
            let generation = {
                let mut store = self.store.write();
                if let Some(pending) = store.pending_mut(file) {
                    pending.diagnostics = syntax.take();
                }
                store.publish(file)
            };
            return self.published(file, generation, false);
        }

        self.set_state(file, JobState::UseBuild);
        let batch = {
            let store = self.store.read();
            let Some(arena) = store.pending(file) else {
                return JobOutcome::Cancelled(file);
            };
            UseBuilder::new(store.view_with(arena), arena, &self.options).build(&script)
        };
        if job.cancel.is_cancelled() {
            return self.cancelled(file);
        }

        for chunk in batch.uses.chunks(self.config.use_batch_size) {
            let mut store = self.store.write();
            match store.pending_mut(file) {
                Some(pending) => pending.uses.extend_from_slice(chunk),
                None => return JobOutcome::Cancelled(file),
            }
        }
        let generation = {
            let mut store = self.store.write();
            if let Some(pending) = store.pending_mut(file) {
                pending.diagnostics = syntax.take();
                pending.diagnostics.extend(batch.diagnostics);
            }
            store.publish(file)
        };
        self.published(file, generation, false)
    }

    /// Report an unchanged, sufficiently complete published result without
    /// rebuilding it.
    fn reuse(&self, request: &JobRequest) -> Option<JobOutcome> {
        if request.force {
            return None;
        }
        let file = request.file;
        let revision = self.source.revision(file)?;
        let (generation, error_count) = {
            let store = self.store.read();
            let current = store.current(file)?;
            if current.revision != revision || current.features < request.features {
                return None;
            }
            (
                current.generation,
                current.diagnostics.iter().filter(|d| d.is_error()).count(),
            )
        };
        tracing::debug!("{} is up to date", file);
        self.set_state(file, JobState::Published);
        self.notify(PublishEvent {
            file,
            generation,
            reused: true,
            error_count,
        });
        Some(JobOutcome::Published {
            file,
            generation,
            reused: true,
        })
    }

    fn published(&self, file: FileId, generation: Option<u64>, reused: bool) -> JobOutcome {
        let Some(generation) = generation else {
            return JobOutcome::Cancelled(file);
        };
        let error_count = self
            .store
            .read()
            .current(file)
            .map_or(0, |f| f.diagnostics.iter().filter(|d| d.is_error()).count());
        self.set_state(file, JobState::Published);
        self.notify(PublishEvent {
            file,
            generation,
            reused,
            error_count,
        });
        JobOutcome::Published {
            file,
            generation,
            reused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn orchestrator() -> (Orchestrator, Arc<FileSet>) {
        let files = Arc::new(FileSet::new());
        let store = Arc::new(RwLock::new(SymbolStore::new()));
        let config = AnalysisConfig::new().with_workers(2);
        (Orchestrator::new(store, files.clone(), config).expect("orchestrator"), files)
    }

    fn add(files: &FileSet, name: &str, text: &str) -> FileId {
        let id = files.file_id(&PathBuf::from(format!("/mem/{name}")));
        files.set_contents(id, text);
        id
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<PublishEvent>>);

    impl PublishListener for Recorder {
        fn published(&self, event: &PublishEvent) {
            self.0.lock().push(event.clone());
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let files = Arc::new(FileSet::new());
        let store = Arc::new(RwLock::new(SymbolStore::new()));
        let result = Orchestrator::new(store, files, AnalysisConfig::new().with_workers(0));
        assert!(matches!(result, Err(AnalysisError::Config(ConfigError::ZeroWorkers))));
    }

    #[test]
    fn test_publishes_and_reuses() {
        let (orchestrator, files) = orchestrator();
        let recorder = Arc::new(Recorder::default());
        orchestrator.add_listener(recorder.clone());
        let file = add(&files, "A.ds", "class A\n\tvar int x\nend\n");

        orchestrator.schedule_file(file);
        let outcomes = orchestrator.run();
        assert!(matches!(outcomes.as_slice(), [JobOutcome::Published { reused: false, .. }]));
        assert_eq!(orchestrator.job_state(file), Some(JobState::Published));

        orchestrator.schedule_file(file);
        let outcomes = orchestrator.run();
        assert!(matches!(outcomes.as_slice(), [JobOutcome::Published { reused: true, .. }]));

        let events = recorder.0.lock();
        assert_eq!(events.len(), 2);
        assert!(events[1].reused);
    }

    #[test]
    fn test_syntax_failure_publishes_diagnostics_only() {
        let (orchestrator, files) = orchestrator();
        let file = add(&files, "Broken.ds", "class\n");

        orchestrator.schedule_file(file);
        orchestrator.run();

        let store = orchestrator.store().read();
        let published = store.current(file).expect("published");
        assert_eq!(published.decl_count(), 0);
        assert!(published.top().imports.is_empty());
        assert!(!published.diagnostics.is_empty());
    }

    #[test]
    fn test_superseded_and_cancelled_jobs_publish_nothing() {
        let (orchestrator, files) = orchestrator();
        let a = add(&files, "A.ds", "class A\nend\n");
        let b = add(&files, "B.ds", "class B\nend\n");

        let first = orchestrator.schedule_file(a);
        orchestrator.schedule_file(a);
        assert!(first.is_cancelled());
        orchestrator.schedule_file(b);
        assert!(orchestrator.cancel(b));

        let outcomes = orchestrator.run();
        assert!(outcomes.iter().any(|o| matches!(o, JobOutcome::Superseded(f) if *f == a)));
        assert!(outcomes.iter().any(|o| matches!(o, JobOutcome::Cancelled(f) if *f == b)));
        assert!(outcomes.iter().any(|o| matches!(o, JobOutcome::Published { file, .. } if *file == a)));
        assert!(orchestrator.store().read().current(b).is_none());
    }

    #[test]
    fn test_read_failure_is_isolated() {
        let (orchestrator, files) = orchestrator();
        let missing = files.file_id(Path::new("/no/such/Missing.ds"));
        let ok = add(&files, "Ok.ds", "class Ok\nend\n");

        orchestrator.schedule_file(missing);
        orchestrator.schedule_file(ok);
        let outcomes = orchestrator.run();
        assert!(outcomes.iter().any(|o| matches!(o, JobOutcome::Failed { file, .. } if *file == missing)));
        assert!(orchestrator.store().read().current(ok).is_some());
    }

    #[test]
    fn test_declarations_only_request_skips_uses() {
        let (orchestrator, files) = orchestrator();
        let file = add(&files, "A.ds", "class A\n\tfunc void f()\n\t\tMissing.call()\n\tend\nend\n");

        orchestrator.schedule(JobRequest::new(file).with_features(Features::Declarations));
        orchestrator.run();
        {
            let store = orchestrator.store().read();
            let published = store.current(file).expect("published");
            assert_eq!(published.features, Features::Declarations);
            assert!(published.diagnostics.is_empty());
        }

        // A fuller request cannot reuse the declarations-only result.
        orchestrator.schedule_file(file);
        let outcomes = orchestrator.run();
        assert!(matches!(outcomes.as_slice(), [JobOutcome::Published { reused: false, .. }]));
        assert!(!orchestrator.store().read().current(file).expect("published").diagnostics.is_empty());
    }
}
