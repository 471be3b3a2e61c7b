//! IDE-facing queries over published analysis results.
//!
//! Everything here reads; nothing schedules or rebuilds. Each query takes
//! the store (or a snapshot holding its read lock) and returns plain data.
//!
//! ## Usage
//!
//! ```no_run
//! use dscript::{AnalysisConfig, AnalysisHost, TextSize};
//!
//! let host = AnalysisHost::new(AnalysisConfig::default()).unwrap();
//! let file = host.set_file_content("/project/Main.ds", "class Main\nend\n");
//! host.analyze();
//!
//! let analysis = host.analysis();
//! let target = analysis.resolve_at(file, TextSize::from(6));
//! let diagnostics = analysis.diagnostics(file);
//! ```

mod analysis;
mod completion;
mod goto;
mod references;

pub use analysis::{Analysis, AnalysisHost};
pub use completion::{completions_at, completions_in_scope, CompletionItem};
pub use goto::{resolve_at, GotoTarget};
pub use references::uses_of;
