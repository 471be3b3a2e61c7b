//! Shared fixtures: a small base library on disk and host helpers.
#![allow(dead_code)]

use std::path::Path;

use dscript::{Analysis, AnalysisConfig, AnalysisHost, FileId, TextSize};
use once_cell::sync::Lazy;
use tempfile::TempDir;

pub const LIBRARY: &[(&str, &str)] = &[
    (
        "Object.ds",
        "\
class Object
\tfunc new()
\tend
\tnative func bool ==(Object other)
\tnative func bool !=(Object other)
\tnative func String toString()
end
",
    ),
    (
        "bool.ds",
        "\
class bool
\tnative func bool &&(bool other)
\tnative func bool ||(bool other)
\tnative func bool !()
end
",
    ),
    (
        "byte.ds",
        "\
class byte
end
",
    ),
    (
        "int.ds",
        "\
class int
\tnative func int +(int other)
\tnative func float +(float other)
\tnative func int -(int other)
\tnative func int *(int other)
\tnative func bool <(int other)
\tnative func bool >(int other)
\tnative func bool ==(int other)
\tnative func int ++()
\tnative func int -()
end
",
    ),
    (
        "float.ds",
        "\
class float
\tnative func float +(float other)
\tnative func bool <(float other)
end
",
    ),
    (
        "String.ds",
        "\
class String
\tnative func String +(String other)
\tnative func int getLength()
end
",
    ),
    (
        "Block.ds",
        "\
class Block
\tnative func Object run()
end
",
    ),
];

static LIBRARY_DIR: Lazy<TempDir> = Lazy::new(|| {
    let dir = tempfile::tempdir().expect("library dir");
    for (name, text) in LIBRARY {
        std::fs::write(dir.path().join(name), text).expect("write library file");
    }
    dir
});

pub fn library_dir() -> &'static Path {
    LIBRARY_DIR.path()
}

pub fn config() -> AnalysisConfig {
    AnalysisConfig::new()
        .with_workers(2)
        .with_library_dir(library_dir())
        .with_library_files(LIBRARY.iter().map(|(name, _)| *name))
}

pub fn host() -> AnalysisHost {
    AnalysisHost::new(config()).expect("host")
}

/// Analyse `text` as `/project/<name>` against the fixture library.
pub fn analyze_one(name: &str, text: &str) -> (AnalysisHost, FileId) {
    let host = host();
    let file = host.set_file_content(Path::new("/project").join(name), text);
    host.analyze();
    (host, file)
}

/// Offset of the `nth` occurrence of `needle`, plus `delta`.
pub fn offset_of(text: &str, needle: &str, nth: usize, delta: u32) -> TextSize {
    let start = text
        .match_indices(needle)
        .nth(nth)
        .map(|(i, _)| i)
        .unwrap_or_else(|| panic!("{needle:?} #{nth} not in text"));
    TextSize::from(start as u32 + delta)
}

pub fn messages(analysis: &Analysis<'_>, file: FileId) -> Vec<String> {
    analysis
        .diagnostics(file)
        .iter()
        .map(|d| d.message.to_string())
        .collect()
}

pub fn single_decl(analysis: &Analysis<'_>, file: FileId, name: &str) -> dscript::hir::DeclId {
    let found = analysis.declarations_named(file, name);
    assert_eq!(found.len(), 1, "expected one declaration named {name}");
    found[0]
}
