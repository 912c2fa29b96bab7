use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_LINES: usize = 750;

const EXCLUDED_DIRS: &[&str] = &["target", ".git", "examples"];

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/main");

    let sha = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=ECHOFORGE_GIT_SHA={}", sha);

    let root = PathBuf::from(
        std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set"),
    );
    let mut files = Vec::new();
    collect_rust_files(&root.join("src"), &mut files);

    for file in &files {
        println!("cargo:rerun-if-changed={}", file.display());
    }

    enforce_line_limits(&root, &files);
    enforce_no_dead_code_allows(&root, &files);
}

fn collect_rust_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let excluded = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| EXCLUDED_DIRS.contains(&name));
            if !excluded {
                collect_rust_files(&path, files);
            }
        } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
            files.push(path);
        }
    }
}

fn enforce_line_limits(root: &Path, files: &[PathBuf]) {
    let violations: Vec<(PathBuf, usize)> = files
        .iter()
        .filter_map(|file| {
            let content = std::fs::read_to_string(file).ok()?;
            let count = content.lines().filter(|l| !l.trim().is_empty()).count();
            (count > MAX_LINES).then(|| (relative(root, file), count))
        })
        .collect();

    if !violations.is_empty() {
        for (path, lines) in &violations {
            eprintln!("  {} - {} lines (max {})", path.display(), lines, MAX_LINES);
        }
        panic!(
            "Build failed: {} file(s) exceed the {} line limit. Split them into smaller modules.",
            violations.len(),
            MAX_LINES
        );
    }
}

fn enforce_no_dead_code_allows(root: &Path, files: &[PathBuf]) {
    let mut violations = Vec::new();

    for file in files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if (trimmed.starts_with("#[allow(") || trimmed.starts_with("#![allow("))
                && trimmed.contains("dead_code")
            {
                violations.push(format!("{}:{}", relative(root, file).display(), line_num + 1));
            }
        }
    }

    if !violations.is_empty() {
        for location in &violations {
            eprintln!("  {}", location);
        }
        panic!(
            "Build failed: {} #[allow(dead_code)] occurrence(s) found. Delete the dead code instead.",
            violations.len()
        );
    }
}

fn relative(root: &Path, file: &Path) -> PathBuf {
    file.strip_prefix(root).unwrap_or(file).to_path_buf()
}
