//! Repository wrapper providing the git primitives used by the engine.

use std::path::Path;

use git2::{ConfigLevel, Oid, RepositoryState};
use secrecy::{ExposeSecret, SecretString};

use crate::cancel::CancelToken;
use crate::command::{GitCommand, Output};
use crate::error::{Error, Result};
use crate::traits::GitOps;
use crate::types::{CherryPick, CommitOutcome, CommitRequest, LogQuery, PickOutcome};

/// Messages git prints when a commit has nothing to record.
const NOTHING_TO_COMMIT: [&str; 3] = [
    "nothing to commit",
    "nothing added to commit",
    "no changes added to commit",
];

/// A local clone. Inspection uses git2, mutation shells out to `git`.
pub struct Repository {
    inner: git2::Repository,
    cancel: CancelToken,
}

impl Repository {
    /// Open a repository at the given path.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_cancel(path, CancelToken::new())
    }

    /// Open a repository whose subprocesses honor `cancel`.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent.
    pub fn open_with_cancel(path: impl AsRef<Path>, cancel: CancelToken) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::NotARepository
            } else {
                Error::Git2(e)
            }
        })?;
        Ok(Self { inner, cancel })
    }

    /// Get the path to the .git directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        self.inner.path()
    }

    fn dir(&self) -> Result<&Path> {
        self.inner.workdir().ok_or(Error::NotARepository)
    }

    fn git(&self, command: &GitCommand) -> Result<Output> {
        command.run(self.dir()?, &self.cancel)
    }

    fn oid(&self, rev: &str) -> Result<Oid> {
        let hash = self.rev_parse(rev)?;
        Ok(Oid::from_str(&hash)?)
    }
}

impl GitOps for Repository {
    fn workdir(&self) -> Option<&Path> {
        self.inner.workdir()
    }

    fn current_branch(&self) -> Result<String> {
        let head = self.inner.head()?;
        if !head.is_branch() {
            return Err(Error::DetachedHead);
        }

        head.shorthand()
            .map(String::from)
            .ok_or(Error::DetachedHead)
    }

    fn is_cherry_picking(&self) -> bool {
        matches!(
            self.inner.state(),
            RepositoryState::CherryPick | RepositoryState::CherryPickSequence
        )
    }

    fn rev_parse(&self, rev: &str) -> Result<String> {
        // FETCH_HEAD and peeled tags are resolved by git itself; libgit2 does
        // not understand the FETCH_HEAD file format.
        let command = GitCommand::new(["rev-parse", "--verify", "--quiet"])
            .arg(format!("{rev}^{{commit}}"));
        match self.git(&command) {
            Ok(output) => Ok(output.stdout.trim().to_string()),
            Err(Error::CommandFailed { .. }) => Err(Error::UnknownRevision(rev.to_string())),
            Err(e) => Err(e),
        }
    }

    fn merge_base(&self, one: &str, two: &str) -> Result<String> {
        let base = self.inner.merge_base(self.oid(one)?, self.oid(two)?)?;
        Ok(base.to_string())
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let ancestor = self.oid(ancestor)?;
        let descendant = self.oid(descendant)?;
        if ancestor == descendant {
            return Ok(true);
        }
        Ok(self.inner.graph_descendant_of(descendant, ancestor)?)
    }

    fn show(&self, rev: &str, format: &str) -> Result<String> {
        let command = GitCommand::new(["show", "--quiet"])
            .arg(format!("--pretty=format:{format}"))
            .arg(rev);
        Ok(self.git(&command)?.stdout)
    }

    fn log(&self, query: &LogQuery) -> Result<String> {
        let command = GitCommand::new(["log"]).args(query.args());
        Ok(self.git(&command)?.stdout)
    }

    fn conflicted_files(&self) -> Result<Vec<String>> {
        let mut index = self.inner.index()?;
        index.read(true)?;

        let mut files = Vec::new();
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let entry = conflict
                .our
                .as_ref()
                .or(conflict.their.as_ref())
                .or(conflict.ancestor.as_ref());
            if let Some(entry) = entry {
                let path = String::from_utf8_lossy(&entry.path).into_owned();
                if !files.contains(&path) {
                    files.push(path);
                }
            }
        }
        Ok(files)
    }

    fn deleted_by_them(&self) -> Result<Vec<String>> {
        let mut index = self.inner.index()?;
        index.read(true)?;

        let mut files = Vec::new();
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            if conflict.their.is_some() {
                continue;
            }
            if let Some(entry) = conflict.our.as_ref().or(conflict.ancestor.as_ref()) {
                files.push(String::from_utf8_lossy(&entry.path).into_owned());
            }
        }
        Ok(files)
    }

    fn file_at(&self, rev: &str, path: &str) -> Result<Option<String>> {
        let tree = self.inner.find_commit(self.oid(rev)?)?.tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let Ok(blob) = entry.to_object(&self.inner)?.into_blob() else {
            return Ok(None);
        };
        Ok(Some(String::from_utf8_lossy(blob.content()).into_owned()))
    }

    fn config_get(&self, key: &str) -> Result<Option<String>> {
        match self.inner.config()?.get_string(key) {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn fetch(&self, remote: &str, refspecs: &[&str], tags: bool) -> Result<()> {
        let mut command = GitCommand::new(["fetch"]);
        if tags {
            command = command.arg("--tags");
        }
        command = command.arg(remote).args(refspecs.iter().copied());
        self.git(&command)?;
        Ok(())
    }

    fn push(&self, url: &SecretString, refspec: &str) -> Result<()> {
        let command = GitCommand::new(["push", "--force"])
            .arg(url.expose_secret())
            .arg(refspec)
            .redact(url.expose_secret());
        self.git(&command)?;
        Ok(())
    }

    fn checkout(&self, rev: &str) -> Result<()> {
        self.git(&GitCommand::new(["checkout", rev]))?;
        Ok(())
    }

    fn force_branch(&self, name: &str, target: &str) -> Result<()> {
        self.git(&GitCommand::new(["branch", "--force", name, target]))?;
        Ok(())
    }

    fn merge(&self, branch: &str, strategy: &str, signoff: bool) -> Result<()> {
        let mut command = GitCommand::new(["merge", "--no-ff", "--no-edit", "--strategy", strategy]);
        if signoff {
            command = command.arg("--signoff");
        }
        self.git(&command.arg(branch))?;
        Ok(())
    }

    fn cherry_pick(&self, commit: &str, options: &CherryPick) -> Result<PickOutcome> {
        let mut command = GitCommand::new(["cherry-pick"]);
        if options.allow_empty {
            command = command.args(["--allow-empty", "--keep-redundant-commits"]);
        }
        if let Some(subtree) = &options.subtree {
            command = command.arg(format!("-Xsubtree={subtree}"));
        }
        match self.git(&command.arg(commit)) {
            Ok(_) => Ok(PickOutcome::Applied),
            Err(Error::CommandFailed { output, .. }) => Ok(PickOutcome::Stopped { output }),
            Err(e) => Err(e),
        }
    }

    fn cherry_pick_continue(&self) -> Result<()> {
        self.git(&GitCommand::new(["cherry-pick", "--continue"]))?;
        Ok(())
    }

    fn checkout_theirs(&self, paths: &[String]) -> Result<()> {
        let command = GitCommand::new(["checkout", "--theirs", "--"]).args(paths.iter());
        self.git(&command)?;
        Ok(())
    }

    fn add(&self, paths: &[&str], force: bool) -> Result<()> {
        let mut command = GitCommand::new(["add"]);
        if force {
            command = command.arg("--force");
        }
        self.git(&command.arg("--").args(paths.iter().copied()))?;
        Ok(())
    }

    fn rm_cached(&self, paths: &[&str]) -> Result<()> {
        let command = GitCommand::new(["rm", "--cached", "-r", "--ignore-unmatch", "--"])
            .args(paths.iter().copied());
        self.git(&command)?;
        Ok(())
    }

    fn rm(&self, paths: &[&str]) -> Result<()> {
        let command = GitCommand::new(["rm", "-r", "-f", "--ignore-unmatch", "--"])
            .args(paths.iter().copied());
        self.git(&command)?;
        Ok(())
    }

    fn commit(&self, request: &CommitRequest) -> Result<CommitOutcome> {
        let command = GitCommand::new(["commit"]).args(request.args());
        match self.git(&command) {
            Ok(_) => Ok(CommitOutcome::Created),
            Err(Error::CommandFailed { output, .. })
                if NOTHING_TO_COMMIT.iter().any(|m| output.contains(m)) =>
            {
                Ok(CommitOutcome::NothingToCommit)
            }
            Err(e) => Err(e),
        }
    }

    fn config_set(&self, key: &str, value: &str) -> Result<()> {
        let mut config = self.inner.config()?.open_level(ConfigLevel::Local)?;
        config.set_str(key, value)?;
        Ok(())
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.git_dir())
            .finish_non_exhaustive()
    }
}
