//! Pull request bodies describing a synchronization.

use std::fmt::Write as _;

use crate::commit::Commit;
use crate::config::Config;
use crate::directive::Directive;
use crate::plan::SynchronizationTarget;

/// GitHub rejects bodies of this many bytes or more.
pub const MAX_BODY_BYTES: usize = 65_536;

const TRUNCATED_BYTES: usize = MAX_BODY_BYTES - 6;

/// Timestamp layout used in tables.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TABLE_HEADER: &str = "| Date | Commit | Author | Message |\n| -    | -      | -      | -       |";

const HANDS_OFF: &str = "This pull request is expected to merge without any human intervention. \
If tests are failing here, changes must land upstream to fix any issues so that future \
downstreaming efforts succeed.";

/// Body for a monorepo synchronization of `commits`.
#[must_use]
pub fn monorepo_body(config: &Config, commits: &[Commit], assign: &[String]) -> String {
    let mut body = format!(
        "The {}/ and vendor/ directories have been synchronized from the upstream repositories, \
         pulling in the following commits:\n\n{TABLE_HEADER}\n",
        config.monorepo.staging_dir.trim_end_matches('/')
    );
    for commit in commits {
        push_row(&mut body, commit, &config.upstream.org, &commit.repository);
    }
    finish(body, assign)
}

/// Body for a mirrored repository moved to `sync.target`.
#[must_use]
pub fn mirror_body(config: &Config, sync: &SynchronizationTarget, assign: &[String]) -> String {
    let target = &sync.target;
    let upstream_org = &config.upstream.org;

    let mut body = format!(
        "The downstream repository has been updated through the following upstream commit:\n\n{TABLE_HEADER}\n"
    );
    push_row(&mut body, target, upstream_org, &target.repository);
    let _ = writeln!(
        body,
        "||[upstream commit list](https://github.com/{upstream_org}/{}/commits/{})|||",
        target.repository, target.hash
    );

    let _ = write!(
        body,
        "\nThe `vendor/` directory has been updated and the following commits were carried:\n\n{TABLE_HEADER}\n"
    );
    let downstream_repo = config.downstream_repo(&target.repository);
    for commit in &sync.additional {
        push_row(&mut body, commit, &config.downstream.org, &downstream_repo);
    }

    let reverts: Vec<&Commit> = sync
        .additional
        .iter()
        .filter(|c| Directive::parse(&c.message).is_some_and(|(d, _)| d.is_revert()))
        .collect();
    if !reverts.is_empty() {
        body.push_str("\nThe following carried commits are reverts and may be droppable:\n\n");
        for commit in reverts {
            let _ = writeln!(body, "- {} {}", commit.short_hash(), escape_cell(&commit.message));
        }
    }

    finish(body, assign)
}

fn push_row(body: &mut String, commit: &Commit, org: &str, repo: &str) {
    let _ = writeln!(
        body,
        "|{}|[{org}/{repo}@{}](https://github.com/{org}/{repo}/commit/{})|{}|{}|",
        commit.date.format(DATE_FORMAT),
        commit.short_hash(),
        commit.hash,
        escape_cell(&commit.author),
        escape_cell(&commit.message),
    );
}

fn finish(mut body: String, assign: &[String]) -> String {
    let _ = write!(body, "\n{HANDS_OFF}\n");
    for who in assign.iter().filter(|w| !w.trim().is_empty()) {
        let _ = write!(body, "\n/cc @{}", who.trim());
    }
    truncate_body(body)
}

/// Escape free text for a markdown table cell.
#[must_use]
pub fn escape_cell(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            '|' => escaped.push_str("\\|"),
            '\n' | '\r' => escaped.push(' '),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Cut `body` below [`MAX_BODY_BYTES`], marking the cut with `...`.
#[must_use]
pub fn truncate_body(mut body: String) -> String {
    if body.len() < MAX_BODY_BYTES {
        return body;
    }
    let mut cut = TRUNCATED_BYTES;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    body.truncate(cut);
    body.push_str("...");
    body
}
