//! Terminal output formatting utilities.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use ferry_core::Commit;
use ferry_core::report::DATE_FORMAT;

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print a detail line without prefix (suppressed in quiet mode).
pub fn detail(msg: &str) {
    if !is_quiet() {
        println!("{msg}");
    }
}

/// Print essential machine-readable output (always prints).
///
/// Use for results meant to be copied or piped, like pull request bodies.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Render commits as aligned columns: date, repository, hash, author, subject.
///
/// `repo_base` is prepended to each commit's repository name.
#[must_use]
pub fn commit_table(commits: &[Commit], repo_base: &str) -> String {
    let rows: Vec<[String; 5]> = commits
        .iter()
        .map(|commit| {
            [
                commit.date.format(DATE_FORMAT).to_string(),
                format!("{repo_base}{}", commit.repository),
                commit.hash.clone(),
                commit.author.clone(),
                commit.message.clone(),
            ]
        })
        .collect();

    let mut widths = [0usize; 4];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut table = String::new();
    for row in &rows {
        for (cell, width) in row.iter().zip(widths) {
            table.push_str(cell);
            table.push_str(&" ".repeat(width - cell.chars().count() + 2));
        }
        table.push_str(&row[4]);
        table.push('\n');
    }
    table
}

/// A title framed by `=` rules as wide as the title.
#[must_use]
pub fn banner(title: &str) -> String {
    let rule = "=".repeat(title.chars().count());
    format!("{rule}\n{title}\n{rule}")
}
