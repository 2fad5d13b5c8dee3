//! Mock implementations for testing detection and replay.
//!
//! `MockGit` answers inspection calls from scripted tables and records every
//! mutating call as a short command line, so tests can assert on the exact
//! sequence the engine ran.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use ferry_git::{
    CherryPick, CommitOutcome, CommitRequest, Error as GitError, GitOps, LogQuery, PickOutcome,
    Result as GitResult, SecretString,
};

use crate::commit::{Commit, FIELD_SEPARATOR};
use crate::error::{Error, Result};
use crate::modules::{ModuleInfo, ModuleTool};

/// A commit with a hash made of `hash_char`, authored by `dev`.
#[allow(clippy::unwrap_used)]
pub fn commit(hash_char: char, repo: &str, message: &str, date: &str) -> Commit {
    Commit {
        date: DateTime::parse_from_rfc3339(date).unwrap(),
        hash: hash_char.to_string().repeat(40),
        author: "dev".into(),
        message: message.into(),
        repository: repo.into(),
    }
}

/// Render `commit` the way `git show`/`git log` would with the pretty format.
pub fn record(commit: &Commit) -> String {
    let date = commit.date.to_rfc3339();
    let fields: [&str; 4] = [&commit.hash, &date, &commit.author, &commit.message];
    fields.join(&FIELD_SEPARATOR.to_string())
}

fn is_hash(rev: &str) -> bool {
    rev.len() == 40 && rev.chars().all(|c| c.is_ascii_hexdigit())
}

/// Mock implementation of `GitOps`.
pub struct MockGit {
    workdir: Option<PathBuf>,
    branch: RefCell<String>,
    revs: RefCell<HashMap<String, String>>,
    shows: RefCell<HashMap<String, String>>,
    logs: RefCell<Vec<(Vec<String>, String)>>,
    files: RefCell<HashMap<String, String>>,
    ancestors: RefCell<HashSet<(String, String)>>,
    merge_bases: RefCell<HashMap<(String, String), String>>,
    fetch_heads: RefCell<HashMap<String, String>>,
    config: RefCell<HashMap<String, String>>,
    conflicts: RefCell<Vec<String>>,
    deleted: RefCell<Vec<String>>,
    cherry_picking: Cell<bool>,
    pick_outcomes: RefCell<VecDeque<PickOutcome>>,
    commit_outcomes: RefCell<VecDeque<CommitOutcome>>,
    calls: RefCell<Vec<String>>,
}

impl Default for MockGit {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGit {
    pub fn new() -> Self {
        Self {
            workdir: None,
            branch: RefCell::new("main".to_string()),
            revs: RefCell::new(HashMap::new()),
            shows: RefCell::new(HashMap::new()),
            logs: RefCell::new(Vec::new()),
            files: RefCell::new(HashMap::new()),
            ancestors: RefCell::new(HashSet::new()),
            merge_bases: RefCell::new(HashMap::new()),
            fetch_heads: RefCell::new(HashMap::new()),
            config: RefCell::new(HashMap::new()),
            conflicts: RefCell::new(Vec::new()),
            deleted: RefCell::new(Vec::new()),
            cherry_picking: Cell::new(false),
            pick_outcomes: RefCell::new(VecDeque::new()),
            commit_outcomes: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_workdir(mut self, dir: &Path) -> Self {
        self.workdir = Some(dir.to_path_buf());
        self
    }

    pub fn with_rev(self, rev: &str, hash: &str) -> Self {
        self.revs.borrow_mut().insert(rev.to_string(), hash.to_string());
        self
    }

    /// Make `commit` resolvable and showable by its hash.
    pub fn with_commit(self, commit: &Commit) -> Self {
        self.shows
            .borrow_mut()
            .insert(commit.hash.clone(), record(commit));
        self
    }

    /// Answer any log query whose rendered arguments contain `fragment`.
    pub fn with_log(self, fragment: &str, output: &str) -> Self {
        self.with_log_matching(&[fragment], output)
    }

    /// Answer any log query whose rendered arguments contain every fragment.
    pub fn with_log_matching(self, fragments: &[&str], output: &str) -> Self {
        self.logs.borrow_mut().push((
            fragments.iter().map(|f| (*f).to_string()).collect(),
            output.to_string(),
        ));
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.files
            .borrow_mut()
            .insert(path.to_string(), content.to_string());
        self
    }

    /// Record that `ancestor` is reachable from `descendant` (resolved hashes).
    pub fn with_ancestor(self, ancestor: &str, descendant: &str) -> Self {
        self.ancestors
            .borrow_mut()
            .insert((ancestor.to_string(), descendant.to_string()));
        self
    }

    pub fn with_merge_base(self, one: &str, two: &str, base: &str) -> Self {
        self.merge_bases
            .borrow_mut()
            .insert((one.to_string(), two.to_string()), base.to_string());
        self
    }

    /// Point `FETCH_HEAD` at `hash` whenever `remote` is fetched.
    pub fn with_fetch_head(self, remote: &str, hash: &str) -> Self {
        self.fetch_heads
            .borrow_mut()
            .insert(remote.to_string(), hash.to_string());
        self
    }

    pub fn with_config(self, key: &str, value: &str) -> Self {
        self.config
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_conflicts(self, files: &[&str]) -> Self {
        *self.conflicts.borrow_mut() = files.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Mark conflicted paths as deleted by the incoming commit.
    pub fn with_deleted_by_them(self, files: &[&str]) -> Self {
        *self.deleted.borrow_mut() = files.iter().map(|f| (*f).to_string()).collect();
        self
    }

    pub fn cherry_picking(self, picking: bool) -> Self {
        self.cherry_picking.set(picking);
        self
    }

    /// Queue the outcome of the next cherry-pick (default: applied).
    pub fn with_pick_outcome(self, outcome: PickOutcome) -> Self {
        self.pick_outcomes.borrow_mut().push_back(outcome);
        self
    }

    /// Queue the outcome of the next commit (default: created).
    pub fn with_commit_outcome(self, outcome: CommitOutcome) -> Self {
        self.commit_outcomes.borrow_mut().push_back(outcome);
        self
    }

    pub fn clear_conflicts(&self) {
        self.conflicts.borrow_mut().clear();
    }

    /// Mutating calls in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl GitOps for MockGit {
    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn current_branch(&self) -> GitResult<String> {
        let branch = self.branch.borrow();
        if branch.is_empty() {
            Err(GitError::DetachedHead)
        } else {
            Ok(branch.clone())
        }
    }

    fn is_cherry_picking(&self) -> bool {
        self.cherry_picking.get()
    }

    fn rev_parse(&self, rev: &str) -> GitResult<String> {
        if let Some(hash) = self.revs.borrow().get(rev) {
            return Ok(hash.clone());
        }
        if is_hash(rev) {
            return Ok(rev.to_string());
        }
        Err(GitError::UnknownRevision(rev.to_string()))
    }

    fn merge_base(&self, one: &str, two: &str) -> GitResult<String> {
        let bases = self.merge_bases.borrow();
        bases
            .get(&(one.to_string(), two.to_string()))
            .or_else(|| bases.get(&(two.to_string(), one.to_string())))
            .cloned()
            .ok_or_else(|| GitError::UnknownRevision(format!("{one}...{two}")))
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> GitResult<bool> {
        let ancestor = self.rev_parse(ancestor)?;
        let descendant = self.rev_parse(descendant)?;
        Ok(ancestor == descendant || self.ancestors.borrow().contains(&(ancestor, descendant)))
    }

    fn show(&self, rev: &str, _format: &str) -> GitResult<String> {
        let hash = self.rev_parse(rev)?;
        self.shows
            .borrow()
            .get(&hash)
            .cloned()
            .ok_or_else(|| GitError::UnknownRevision(rev.to_string()))
    }

    fn log(&self, query: &LogQuery) -> GitResult<String> {
        let rendered = query.args().join(" ");
        Ok(self
            .logs
            .borrow()
            .iter()
            .find(|(fragments, _)| fragments.iter().all(|f| rendered.contains(f.as_str())))
            .map(|(_, output)| output.clone())
            .unwrap_or_default())
    }

    fn conflicted_files(&self) -> GitResult<Vec<String>> {
        Ok(self.conflicts.borrow().clone())
    }

    fn deleted_by_them(&self) -> GitResult<Vec<String>> {
        Ok(self.deleted.borrow().clone())
    }

    fn file_at(&self, _rev: &str, path: &str) -> GitResult<Option<String>> {
        Ok(self.files.borrow().get(path).cloned())
    }

    fn config_get(&self, key: &str) -> GitResult<Option<String>> {
        Ok(self.config.borrow().get(key).cloned())
    }

    fn fetch(&self, remote: &str, refspecs: &[&str], tags: bool) -> GitResult<()> {
        let mut call = String::from("fetch");
        if tags {
            call.push_str(" --tags");
        }
        call.push(' ');
        call.push_str(remote);
        for refspec in refspecs {
            call.push(' ');
            call.push_str(refspec);
        }
        self.record(call);

        if let Some(hash) = self.fetch_heads.borrow().get(remote) {
            self.revs
                .borrow_mut()
                .insert("FETCH_HEAD".to_string(), hash.clone());
        }
        Ok(())
    }

    fn push(&self, _url: &SecretString, refspec: &str) -> GitResult<()> {
        self.record(format!("push {refspec}"));
        Ok(())
    }

    fn checkout(&self, rev: &str) -> GitResult<()> {
        self.record(format!("checkout {rev}"));
        *self.branch.borrow_mut() = if is_hash(rev) {
            String::new()
        } else {
            rev.to_string()
        };
        Ok(())
    }

    fn force_branch(&self, name: &str, target: &str) -> GitResult<()> {
        self.record(format!("branch --force {name} {target}"));
        Ok(())
    }

    fn merge(&self, branch: &str, strategy: &str, signoff: bool) -> GitResult<()> {
        let signoff = if signoff { " --signoff" } else { "" };
        self.record(format!("merge --strategy {strategy}{signoff} {branch}"));
        Ok(())
    }

    fn cherry_pick(&self, commit: &str, options: &CherryPick) -> GitResult<PickOutcome> {
        let subtree = options
            .subtree
            .as_ref()
            .map(|s| format!(" -Xsubtree={s}"))
            .unwrap_or_default();
        self.record(format!("cherry-pick{subtree} {commit}"));

        let outcome = self
            .pick_outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or(PickOutcome::Applied);
        if matches!(outcome, PickOutcome::Stopped { .. }) {
            self.cherry_picking.set(true);
        }
        Ok(outcome)
    }

    fn cherry_pick_continue(&self) -> GitResult<()> {
        self.record("cherry-pick --continue".to_string());
        self.cherry_picking.set(false);
        self.conflicts.borrow_mut().clear();
        Ok(())
    }

    fn checkout_theirs(&self, paths: &[String]) -> GitResult<()> {
        self.record(format!("checkout --theirs {}", paths.join(" ")));
        Ok(())
    }

    fn add(&self, paths: &[&str], force: bool) -> GitResult<()> {
        let force = if force { " --force" } else { "" };
        self.record(format!("add{force} {}", paths.join(" ")));
        Ok(())
    }

    fn rm_cached(&self, paths: &[&str]) -> GitResult<()> {
        self.record(format!("rm --cached {}", paths.join(" ")));
        Ok(())
    }

    fn rm(&self, paths: &[&str]) -> GitResult<()> {
        self.record(format!("rm {}", paths.join(" ")));
        Ok(())
    }

    fn commit(&self, request: &CommitRequest) -> GitResult<CommitOutcome> {
        self.record(format!("commit {}", request.args().join(" ")));
        Ok(self
            .commit_outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or(CommitOutcome::Created))
    }

    fn config_set(&self, key: &str, value: &str) -> GitResult<()> {
        self.record(format!("config {key} {value}"));
        self.config
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Mock implementation of `ModuleTool`.
pub struct MockModules {
    root: Option<PathBuf>,
    versions: RefCell<HashMap<String, String>>,
    fail_on: RefCell<Option<String>>,
    calls: RefCell<Vec<String>>,
}

impl Default for MockModules {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModules {
    pub fn new() -> Self {
        Self {
            root: None,
            versions: RefCell::new(HashMap::new()),
            fail_on: RefCell::new(None),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Record directories relative to `root`.
    pub fn rooted(mut self, root: &Path) -> Self {
        self.root = Some(root.to_path_buf());
        self
    }

    pub fn with_version(self, module: &str, version: &str) -> Self {
        self.versions
            .borrow_mut()
            .insert(module.to_string(), version.to_string());
        self
    }

    /// Fail the first call whose recorded form starts with `prefix`.
    pub fn failing_on(self, prefix: &str) -> Self {
        *self.fail_on.borrow_mut() = Some(prefix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn relative(&self, dir: &Path) -> String {
        let relative = self
            .root
            .as_deref()
            .and_then(|root| dir.strip_prefix(root).ok())
            .unwrap_or(dir);
        if relative.as_os_str().is_empty() {
            ".".to_string()
        } else {
            relative.display().to_string()
        }
    }

    fn record(&self, call: String, dir: &Path) -> Result<()> {
        let failing = self
            .fail_on
            .borrow()
            .as_ref()
            .is_some_and(|prefix| call.starts_with(prefix.as_str()));
        self.calls.borrow_mut().push(call.clone());
        if failing {
            *self.fail_on.borrow_mut() = None;
            return Err(Error::DependencyRegenerationFailure {
                command: call,
                dir: dir.to_path_buf(),
                output: "mock failure".into(),
            });
        }
        Ok(())
    }
}

impl ModuleTool for MockModules {
    fn module_info(&self, dir: &Path, module: &str) -> Result<ModuleInfo> {
        self.record(format!("list {module} in {}", self.relative(dir)), dir)?;
        let version = self.versions.borrow().get(module).cloned().unwrap_or_default();
        Ok(ModuleInfo {
            path: module.to_string(),
            version,
        })
    }

    fn tidy(&self, dir: &Path) -> Result<()> {
        self.record(format!("tidy {}", self.relative(dir)), dir)
    }

    fn vendor(&self, dir: &Path) -> Result<()> {
        self.record(format!("vendor {}", self.relative(dir)), dir)
    }

    fn verify(&self, dir: &Path) -> Result<()> {
        self.record(format!("verify {}", self.relative(dir)), dir)
    }

    fn replace(&self, dir: &Path, module: &str, replacement: &str) -> Result<()> {
        self.record(
            format!("replace {module}={replacement} in {}", self.relative(dir)),
            dir,
        )
    }

    fn run(&self, dir: &Path, command: &[String]) -> Result<()> {
        self.record(format!("run {} in {}", command.join(" "), self.relative(dir)), dir)
    }
}
