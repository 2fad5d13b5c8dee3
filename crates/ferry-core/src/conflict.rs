//! Recovering from cherry-picks that stop.
//!
//! Only two shapes are resolved without an operator: upstream vendor metadata
//! colliding with a vendor directory that was removed downstream, and
//! conflicts confined to dependency manifests or generated output, which are
//! rewritten by regeneration anyway. Everything else is handed to a
//! [`ConflictHandler`].

use std::path::Path;

use ferry_git::GitOps;

use crate::commit::Commit;
use crate::error::{Error, Result};

const VENDORED_MANIFEST_DELETED: &str = "vendor/modules.txt deleted in HEAD and modified in";

/// How a stopped cherry-pick looks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictShape {
    /// The pick modifies vendor metadata deleted downstream.
    VendoredManifestDeleted,
    /// Every unmerged path is a dependency manifest or generated output.
    GeneratedOnly(Vec<String>),
    /// Needs a human.
    Unresolvable(Vec<String>),
}

/// Classify a stopped pick from its output and unmerged paths.
#[must_use]
pub fn classify_conflict(output: &str, unmerged: &[String], generated_dirs: &[String]) -> ConflictShape {
    if output.contains(VENDORED_MANIFEST_DELETED) {
        return ConflictShape::VendoredManifestDeleted;
    }
    if !unmerged.is_empty() && unmerged.iter().all(|p| is_generated(p, generated_dirs)) {
        return ConflictShape::GeneratedOnly(unmerged.to_vec());
    }
    ConflictShape::Unresolvable(unmerged.to_vec())
}

/// Whether `path` is rewritten by dependency or manifest regeneration.
#[must_use]
pub fn is_generated(path: &str, generated_dirs: &[String]) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    if matches!(file_name, "go.mod" | "go.sum") {
        return true;
    }
    if path.starts_with("vendor/") || path.contains("/vendor/") {
        return true;
    }
    generated_dirs.iter().any(|dir| {
        let dir = dir.trim_end_matches('/');
        !dir.is_empty() && path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Operator's answer to an unresolvable conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The conflict was resolved in the working tree.
    Continue,
    /// Stop the run.
    Abort,
}

/// What the handler is told about a stopped pick.
#[derive(Debug)]
pub struct ConflictContext<'a> {
    pub repository: &'a str,
    pub commit: &'a Commit,
    pub workdir: Option<&'a Path>,
    pub output: &'a str,
    pub files: &'a [String],
}

/// Callback consulted when a pick cannot be recovered automatically.
pub trait ConflictHandler {
    fn on_conflict(&self, context: &ConflictContext<'_>) -> Resolution;
}

/// Handler for unattended runs: never waits, always aborts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnConflict;

impl ConflictHandler for AbortOnConflict {
    fn on_conflict(&self, context: &ConflictContext<'_>) -> Resolution {
        tracing::error!(
            repo = context.repository,
            commit = %context.commit.hash,
            files = ?context.files,
            "cherry-pick conflict requires manual resolution"
        );
        Resolution::Abort
    }
}

/// Where a stopped pick happened.
#[derive(Debug, Clone, Copy)]
pub struct StoppedPick<'a> {
    pub repository: &'a str,
    pub commit: &'a Commit,
    /// Subtree the commit was applied under, if any.
    pub subtree: Option<&'a str>,
    pub output: &'a str,
}

/// Bring a stopped cherry-pick to completion or fail.
///
/// # Errors
/// Returns `UnrecoverableReplayConflict` if the handler aborts or conflicts
/// remain after it asked to continue; git errors are propagated.
pub fn recover<G: GitOps, H: ConflictHandler + ?Sized>(
    repo: &G,
    handler: &H,
    pick: &StoppedPick<'_>,
    generated_dirs: &[String],
) -> Result<()> {
    let unrecoverable = |detail: String| Error::UnrecoverableReplayConflict {
        repo: pick.repository.to_string(),
        commit: pick.commit.hash.clone(),
        detail,
    };

    let mut unmerged = repo.conflicted_files()?;
    if classify_conflict(pick.output, &unmerged, generated_dirs)
        == ConflictShape::VendoredManifestDeleted
    {
        let vendor = pick
            .subtree
            .map_or_else(|| "vendor".to_string(), |s| format!("{s}/vendor"));
        tracing::info!(repo = pick.repository, commit = %pick.commit.hash, path = %vendor, "dropping vendored upstream files");
        repo.rm_cached(&[vendor.as_str()])?;
        unmerged = repo.conflicted_files()?;
    }

    if unmerged.is_empty() && repo.is_cherry_picking() {
        return repo.cherry_pick_continue().map_err(Into::into);
    }

    match classify_conflict("", &unmerged, generated_dirs) {
        ConflictShape::GeneratedOnly(files) => {
            let deleted = repo.deleted_by_them()?;
            let (removed, incoming): (Vec<String>, Vec<String>) =
                files.into_iter().partition(|f| deleted.contains(f));
            tracing::info!(
                repo = pick.repository,
                commit = %pick.commit.hash,
                files = ?incoming,
                removed = ?removed,
                "taking incoming generated files"
            );
            if !removed.is_empty() {
                let paths: Vec<&str> = removed.iter().map(String::as_str).collect();
                repo.rm(&paths)?;
            }
            if !incoming.is_empty() {
                repo.checkout_theirs(&incoming)?;
                let paths: Vec<&str> = incoming.iter().map(String::as_str).collect();
                repo.add(&paths, true)?;
            }
            repo.cherry_pick_continue()?;
            Ok(())
        }
        ConflictShape::Unresolvable(files) => {
            let context = ConflictContext {
                repository: pick.repository,
                commit: pick.commit,
                workdir: repo.workdir(),
                output: pick.output,
                files: &files,
            };
            match handler.on_conflict(&context) {
                Resolution::Abort => Err(unrecoverable(summarize(pick.output, &files))),
                Resolution::Continue => finish_after_operator(repo, &unrecoverable),
            }
        }
        ConflictShape::VendoredManifestDeleted => Err(unrecoverable(pick.output.to_string())),
    }
}

fn finish_after_operator<G: GitOps>(repo: &G, unrecoverable: &dyn Fn(String) -> Error) -> Result<()> {
    if !repo.is_cherry_picking() {
        return Ok(());
    }
    let remaining = repo.conflicted_files()?;
    if !remaining.is_empty() {
        return Err(unrecoverable(format!(
            "conflicts remain in {}",
            remaining.join(", ")
        )));
    }
    repo.cherry_pick_continue()?;
    Ok(())
}

fn summarize(output: &str, files: &[String]) -> String {
    if files.is_empty() {
        output.trim().to_string()
    } else {
        format!("conflicts in {}", files.join(", "))
    }
}
