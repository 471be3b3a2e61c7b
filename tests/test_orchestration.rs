//! Job scheduling across files: base-library readiness, reuse, cancellation,
//! include paths and publish notifications.

mod common;

use std::path::Path;
use std::sync::Arc;

use dscript::hir::{DeclKind, SymbolStore};
use dscript::project::{stdlib, FileSet, JobRequest, JobState};
use dscript::{AnalysisHost, JobOutcome, LineCol, Orchestrator, PublishEvent, PublishListener};
use parking_lot::{Mutex, RwLock};

use common::{messages, offset_of, single_decl};

#[derive(Default)]
struct Recorder(Mutex<Vec<PublishEvent>>);

impl PublishListener for Recorder {
    fn published(&self, event: &PublishEvent) {
        self.0.lock().push(event.clone());
    }
}

#[test]
fn test_file_waits_for_missing_base_library() {
    let config = common::config();
    let files = Arc::new(FileSet::new());
    let library = stdlib::load_library(&config, &files);
    assert_eq!(library.len(), common::LIBRARY.len());

    let mut store = SymbolStore::new();
    store.set_library_files(library.clone());
    let store = Arc::new(RwLock::new(store));
    let orchestrator = Orchestrator::new(store.clone(), files.clone(), config).expect("orchestrator");

    let user = files.file_id(Path::new("/project/User.ds"));
    files.set_contents(user, "class User\n\tvar int age\nend\n");
    orchestrator.schedule_file(user);
    let outcomes = orchestrator.run();

    let first = outcomes.iter().position(|o| o.file() == user).expect("user outcome");
    assert!(matches!(&outcomes[first], JobOutcome::RequiresReparse { missing, .. } if missing.len() == library.len()));
    let last = outcomes.iter().rposition(|o| o.file() == user).expect("user outcome");
    assert!(matches!(outcomes[last], JobOutcome::Published { reused: false, .. }));
    for &file in &library {
        assert!(outcomes.iter().any(|o| o.file() == file && o.is_published()));
    }

    assert_eq!(orchestrator.job_state(user), Some(JobState::Published));
    let store = store.read();
    assert!(store.library_ready());
    assert!(store.current(user).expect("published").diagnostics.is_empty());
}

#[test]
fn test_forced_rerun_is_idempotent() {
    let text = "\
class Cache
\tvar int hits
\tfunc int total(int extra)
\t\treturn hits + extra
\tend
end
";
    let (host, file) = common::analyze_one("Cache.ds", text);
    let before = host
        .analysis()
        .store()
        .current(file)
        .cloned()
        .expect("published");

    host.orchestrator().schedule(JobRequest::new(file).forced());
    let outcomes = host.analyze();
    assert!(matches!(outcomes.as_slice(), [JobOutcome::Published { reused: false, .. }]));

    let analysis = host.analysis();
    let after = analysis.store().current(file).expect("published");
    assert!(before.same_symbols(after));
    assert!(after.generation > before.generation);
}

#[test]
fn test_unchanged_file_is_reused() {
    let (host, file) = common::analyze_one("Same.ds", "class Same\nend\n");
    let generation = host.analysis().generation();

    host.orchestrator().schedule_file(file);
    let outcomes = host.analyze();
    assert!(matches!(outcomes.as_slice(), [JobOutcome::Published { reused: true, .. }]));
    assert_eq!(host.analysis().generation(), generation);
}

#[test]
fn test_edit_republishes_with_new_results() {
    let (host, file) = common::analyze_one("Edit.ds", "class Edit\n\tvar Missing m\nend\n");
    assert_eq!(messages(&host.analysis(), file), vec!["Unknown type: Missing"]);

    host.set_file_content("/project/Edit.ds", "class Edit\n\tvar int m\nend\n");
    host.analyze();
    assert!(messages(&host.analysis(), file).is_empty());
}

#[test]
fn test_cancelled_job_publishes_nothing() {
    let host = common::host();
    host.analyze();
    let file = host.set_file_content("/project/Late.ds", "class Late\nend\n");
    assert!(host.orchestrator().cancel(file));

    let outcomes = host.analyze();
    assert!(outcomes.iter().any(|o| matches!(o, JobOutcome::Cancelled(f) if *f == file)));
    let analysis = host.analysis();
    assert!(analysis.store().current(file).is_none());
    assert!(analysis.diagnostics(file).is_empty());
}

#[test]
fn test_include_directory_rescan() {
    let includes = tempfile::tempdir().expect("include dir");
    std::fs::write(includes.path().join("Util.ds"), "class Util\nend\n").expect("write");
    let host = AnalysisHost::new(common::config().with_include_dir(includes.path())).expect("host");
    host.analyze();
    assert_eq!(host.orchestrator().include_files().len(), 1);

    // The listing is cached until dropped.
    std::fs::write(includes.path().join("Extra.ds"), "class Extra\nend\n").expect("write");
    assert!(host.orchestrator().refresh_includes().is_empty());
    assert!(host.orchestrator().drop_include_cache(includes.path()));
    host.analyze();
    assert_eq!(host.orchestrator().include_files().len(), 2);

    let text = "\
class App
\tvar Util util
\tvar Extra extra
end
";
    let app = host.set_file_content("/project/App.ds", text);
    host.analyze();

    let analysis = host.analysis();
    assert!(messages(&analysis, app).is_empty(), "{:?}", messages(&analysis, app));
    let extra_file = host
        .file_id(includes.path().join("Extra.ds"))
        .expect("include registered");
    let target = analysis
        .resolve_at(app, offset_of(text, "Extra extra", 0, 0))
        .expect("include class resolves");
    assert_eq!(target.file, extra_file);
    assert_eq!(target.declaration.kind, DeclKind::Class);
}

#[test]
fn test_editing_an_include_rebuilds_its_dependents() {
    let includes = tempfile::tempdir().expect("include dir");
    let util_path = includes.path().join("Util.ds");
    std::fs::write(&util_path, "class Util\n\tfunc void f()\n\tend\nend\n").expect("write");
    let host = AnalysisHost::new(common::config().with_include_dir(includes.path())).expect("host");
    host.analyze();
    let util = host.file_id(&util_path).expect("include registered");

    let text = "\
class App
\tfunc void run(Util u)
\t\tu.f()
\tend
end
";
    let app = host.set_file_content("/project/App.ds", text);
    host.analyze();
    let call = offset_of(text, "f()", 0, 0);
    {
        let analysis = host.analysis();
        let target = analysis.resolve_at(app, call).expect("f resolves");
        assert_eq!(target.declaration.name, "f");
    }

    // A new function ahead of `f` shifts every declaration after it.
    host.set_file_content(&util_path, "class Util\n\tfunc void g()\n\tend\n\tfunc void f()\n\tend\nend\n");
    let outcomes = host.analyze();
    assert!(outcomes.iter().any(|o| o.file() == util && o.is_published()));
    assert!(outcomes.iter().any(|o| matches!(o, JobOutcome::Published { file, reused: false, .. } if *file == app)));

    let analysis = host.analysis();
    let target = analysis.resolve_at(app, call).expect("f still resolves");
    assert_eq!(target.declaration.name, "f");
    assert_eq!(target.file, util);
    assert_eq!(analysis.uses_of(target.decl).len(), 1);
    let g = single_decl(&analysis, util, "g");
    assert!(analysis.uses_of(g).is_empty());
    assert!(messages(&analysis, app).is_empty(), "{:?}", messages(&analysis, app));
}

#[test]
fn test_removing_a_file_rebuilds_its_dependents() {
    let includes = tempfile::tempdir().expect("include dir");
    let util_path = includes.path().join("Util.ds");
    std::fs::write(&util_path, "class Util\nend\n").expect("write");
    let host = AnalysisHost::new(common::config().with_include_dir(includes.path())).expect("host");
    host.analyze();
    let util = host.file_id(&util_path).expect("include registered");
    let app = host.set_file_content("/project/App.ds", "class App\n\tvar Util util\nend\n");
    host.analyze();
    assert!(messages(&host.analysis(), app).is_empty());

    std::fs::remove_file(&util_path).expect("delete");
    assert!(host.orchestrator().drop_include_cache(includes.path()));
    host.remove_file(util);
    host.analyze();
    assert_eq!(messages(&host.analysis(), app), vec!["Unknown type: Util"]);
}

#[test]
fn test_listeners_see_every_publish() {
    let host = common::host();
    let recorder = Arc::new(Recorder::default());
    host.add_listener(recorder.clone());
    host.analyze();

    let file = host.set_file_content("/project/Bad.ds", "class Bad\n\tvar Nope n\nend\n");
    host.analyze();
    host.orchestrator().schedule_file(file);
    host.analyze();

    let events = recorder.0.lock();
    let own: Vec<&PublishEvent> = events.iter().filter(|e| e.file == file).collect();
    assert_eq!(own.len(), 2);
    assert!(!own[0].reused);
    assert!(own[1].reused);
    assert!(own.iter().all(|e| e.error_count == 1));
    assert!(events.iter().any(|e| e.file != file));
}

#[test]
fn test_positions_and_completions() {
    let text = "\
class Bag
\tvar int size
\tfunc void add(int count)
\t\tvar int total = size + count
\t\t
\tend
end
";
    let (host, file) = common::analyze_one("Bag.ds", text);
    let analysis = host.analysis();

    let size = single_decl(&analysis, file, "size");
    let uses = analysis.uses_of(size);
    assert_eq!(uses.len(), 1);
    assert_eq!(
        analysis.line_col(file, uses[0].range.start()),
        Some(LineCol { line: 3, col: 18 })
    );

    // The empty line after `total` sees locals, parameters, members and
    // library classes.
    let offset = offset_of(text, "\t\t\n", 0, 2);
    let names: Vec<String> = analysis
        .completions_at(file, offset)
        .into_iter()
        .map(|item| item.name.to_string())
        .collect();
    for expected in ["total", "count", "size", "add", "Bag", "int", "String"] {
        assert!(names.iter().any(|n| n == expected), "{expected} missing from {names:?}");
    }
    let total = names.iter().position(|n| n == "total");
    let size = names.iter().position(|n| n == "size");
    assert!(total < size);
}
