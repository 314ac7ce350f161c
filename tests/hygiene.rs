//! Hygiene: enforces coding standards at test time.
//!
//! Scans the editor's production sources (`src/`, minus `*_test.rs`) for
//! antipatterns. Each pattern has a budget, ideally zero. The budget never
//! grows; fix an existing hit before adding one.
#![allow(clippy::absurd_extreme_comparisons)]

use std::fs;
use std::path::Path;

struct SourceFile {
    path: String,
    content: String,
}

struct Budget {
    pattern: &'static str,
    max: usize,
}

// Panics crash the editor tab.
const PANICS: &[Budget] = &[
    Budget { pattern: ".unwrap()", max: 0 },
    Budget { pattern: ".expect(", max: 0 },
    Budget { pattern: "panic!(", max: 0 },
    Budget { pattern: "unreachable!(", max: 0 },
    Budget { pattern: "todo!(", max: 0 },
    Budget { pattern: "unimplemented!(", max: 0 },
];

// Silent loss discards errors without inspecting them.
const SILENT: &[Budget] = &[Budget { pattern: "let _ =", max: 0 }, Budget { pattern: ".ok()", max: 0 }];

// Output goes through `log`, not the raw console.
const OUTPUT: &[Budget] = &[
    Budget { pattern: "println!(", max: 0 },
    Budget { pattern: "eprintln!(", max: 0 },
    Budget { pattern: "dbg!(", max: 0 },
];

const STRUCTURE: &[Budget] = &[Budget { pattern: "#[allow(dead_code)]", max: 0 }];

/// Modules allowed to name the 2D context type.
const CANVAS_OWNERS: &[&str] = &["render.rs", "engine.rs"];

fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files);
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
            continue;
        }
        let path_str = path.to_string_lossy().to_string();
        if !path_str.ends_with(".rs") || path_str.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { path: path_str, content });
        }
    }
}

fn hits(files: &[SourceFile], pattern: &str) -> Vec<(String, usize)> {
    files
        .iter()
        .filter_map(|file| {
            let count = file.content.lines().filter(|line| line.contains(pattern)).count();
            (count > 0).then(|| (file.path.clone(), count))
        })
        .collect()
}

fn format_hits(hits: &[(String, usize)]) -> String {
    hits.iter().map(|(path, count)| format!("  {path}: {count}")).collect::<Vec<_>>().join("\n")
}

fn check(budgets: &[Budget]) {
    let files = source_files();
    assert!(!files.is_empty(), "no sources found; run from the crate root");
    let mut failures = Vec::new();
    for budget in budgets {
        let found = hits(&files, budget.pattern);
        let count: usize = found.iter().map(|(_, c)| c).sum();
        if count > budget.max {
            failures.push(format!(
                "`{}` budget exceeded: found {count}, max {}.\n{}",
                budget.pattern,
                budget.max,
                format_hits(&found)
            ));
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn panic_budget() {
    check(PANICS);
}

#[test]
fn silent_discard_budget() {
    check(SILENT);
}

#[test]
fn console_output_budget() {
    check(OUTPUT);
}

#[test]
fn allow_dead_code_budget() {
    check(STRUCTURE);
}

#[test]
fn canvas_context_stays_in_render_and_engine() {
    let files = source_files();
    let offenders: Vec<_> = hits(&files, "CanvasRenderingContext2d")
        .into_iter()
        .filter(|(path, _)| !CANVAS_OWNERS.iter().any(|owner| path.ends_with(owner)))
        .collect();
    assert!(offenders.is_empty(), "2D context used outside render/engine:\n{}", format_hits(&offenders));
}
