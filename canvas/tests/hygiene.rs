//! Hygiene: source-level rules for the engine crate, checked at test time.
//!
//! The engine runs inside a browser tab next to the map. A panic there takes
//! the whole editor down mid-drag, and stray prints land in the user's
//! console. Each rule has a budget; budgets only ever go down.
#![allow(clippy::absurd_extreme_comparisons)]

use std::fs;
use std::path::{Path, PathBuf};

struct Budget {
    pattern: &'static str,
    max: usize,
    why: &'static str,
}

const BUDGETS: &[Budget] = &[
    // Panics.
    Budget { pattern: ".unwrap()", max: 0, why: "propagate or default instead" },
    Budget { pattern: ".expect(", max: 0, why: "propagate or default instead" },
    Budget { pattern: "panic!(", max: 0, why: "a panic kills the editor" },
    Budget { pattern: "unreachable!(", max: 0, why: "a panic kills the editor" },
    Budget { pattern: "todo!(", max: 0, why: "unfinished handler" },
    Budget { pattern: "unimplemented!(", max: 0, why: "unfinished handler" },
    // Silent loss.
    Budget { pattern: "let _ =", max: 0, why: "log map failures instead of dropping them" },
    Budget { pattern: ".ok()", max: 0, why: "log map failures instead of dropping them" },
    // Output goes through `log`.
    Budget { pattern: "println!(", max: 0, why: "use log::debug!/warn!" },
    Budget { pattern: "eprintln!(", max: 0, why: "use log::debug!/warn!" },
    Budget { pattern: "dbg!(", max: 0, why: "leftover debugging" },
    // Structure.
    Budget { pattern: "#[allow(dead_code)]", max: 0, why: "delete it or use it" },
];

/// Production `.rs` files under `src/`; `*_test.rs` files are exempt.
fn production_files() -> Vec<(PathBuf, String)> {
    let mut files = Vec::new();
    walk(Path::new("src"), &mut files);
    files.sort();
    files
}

fn walk(dir: &Path, out: &mut Vec<(PathBuf, String)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|e| e.path()) {
        if path.is_dir() {
            walk(&path, out);
            continue;
        }
        let is_rs = path.extension().is_some_and(|e| e == "rs");
        let is_test = path.to_string_lossy().ends_with("_test.rs");
        if is_rs && !is_test {
            if let Ok(content) = fs::read_to_string(&path) {
                out.push((path, content));
            }
        }
    }
}

#[test]
fn budgets_hold() {
    let files = production_files();
    assert!(!files.is_empty(), "no sources found; run from the crate root");

    let mut report = Vec::new();
    for budget in BUDGETS {
        let hits: Vec<String> = files
            .iter()
            .flat_map(|(path, content)| {
                content
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| line.contains(budget.pattern))
                    .map(move |(n, _)| format!("    {}:{}", path.display(), n + 1))
            })
            .collect();
        if hits.len() > budget.max {
            report.push(format!(
                "`{}`: found {}, max {} ({})\n{}",
                budget.pattern,
                hits.len(),
                budget.max,
                budget.why,
                hits.join("\n")
            ));
        }
    }
    assert!(report.is_empty(), "hygiene budgets exceeded:\n{}", report.join("\n"));
}

#[test]
fn every_test_file_is_wired_to_its_module() {
    let Ok(entries) = fs::read_dir("src") else {
        panic!("src/ not found; run from the crate root");
    };
    let mut orphans = Vec::new();
    for path in entries.flatten().map(|e| e.path()) {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let Some(module) = name.strip_suffix("_test.rs") else {
            continue;
        };
        let parent = path.with_file_name(format!("{module}.rs"));
        let wired = fs::read_to_string(&parent).is_ok_and(|src| src.contains(&format!("#[path = \"{name}\"]")));
        if !wired {
            orphans.push(name);
        }
    }
    assert!(orphans.is_empty(), "test files not reachable from their module: {orphans:?}");
}
