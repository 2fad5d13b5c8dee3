//! Request and outcome types for porcelain operations.

/// A `git log` query.
///
/// Built with chained setters and rendered to arguments by [`LogQuery::args`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Revision or range (`a..b`), empty for HEAD.
    pub range: String,
    /// `--grep` patterns.
    pub grep: Vec<String>,
    /// Require every `--grep` to match.
    pub all_match: bool,
    /// Treat patterns as fixed strings.
    pub fixed_strings: bool,
    /// `--no-merges`.
    pub no_merges: bool,
    /// `--reverse`.
    pub reverse: bool,
    /// `--ancestry-path`.
    pub ancestry_path: bool,
    /// `-n`.
    pub max_count: Option<usize>,
    /// `--pretty=<format>`.
    pub format: String,
    /// Limit to commits touching these paths.
    pub paths: Vec<String>,
}

impl LogQuery {
    /// Query `range`, printing each commit with `format`.
    #[must_use]
    pub fn new(range: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            range: range.into(),
            format: format.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn grep(mut self, pattern: impl Into<String>) -> Self {
        self.grep.push(pattern.into());
        self
    }

    #[must_use]
    pub const fn all_match(mut self) -> Self {
        self.all_match = true;
        self
    }

    #[must_use]
    pub const fn fixed_strings(mut self) -> Self {
        self.fixed_strings = true;
        self
    }

    #[must_use]
    pub const fn no_merges(mut self) -> Self {
        self.no_merges = true;
        self
    }

    #[must_use]
    pub const fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    #[must_use]
    pub const fn ancestry_path(mut self) -> Self {
        self.ancestry_path = true;
        self
    }

    #[must_use]
    pub const fn max_count(mut self, n: usize) -> Self {
        self.max_count = Some(n);
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Render the query as `git log` arguments (without the leading `log`).
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.range.is_empty() {
            args.push(self.range.clone());
        }
        if let Some(n) = self.max_count {
            args.push("-n".into());
            args.push(n.to_string());
        }
        for pattern in &self.grep {
            args.push("--grep".into());
            args.push(pattern.clone());
        }
        if self.all_match {
            args.push("--all-match".into());
        }
        if self.fixed_strings {
            args.push("--fixed-strings".into());
        }
        if self.no_merges {
            args.push("--no-merges".into());
        }
        if self.reverse {
            args.push("--reverse".into());
        }
        if self.ancestry_path {
            args.push("--ancestry-path".into());
        }
        args.push(format!("--pretty=format:{}", self.format));
        if !self.paths.is_empty() {
            args.push("--".into());
            args.extend(self.paths.iter().cloned());
        }
        args
    }
}

/// Options for a cherry-pick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CherryPick {
    /// Apply the commit below this subtree (`-Xsubtree=`).
    pub subtree: Option<String>,
    /// Keep empty and redundant commits instead of failing.
    pub allow_empty: bool,
}

/// Result of a cherry-pick attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// The commit applied cleanly.
    Applied,
    /// The pick stopped; the repository is left mid-cherry-pick.
    Stopped {
        /// Combined output of the failed command.
        output: String,
    },
}

/// A `git commit` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitRequest {
    pub message: Option<String>,
    pub paths: Vec<String>,
    pub amend: bool,
    pub allow_empty: bool,
    pub signoff: bool,
    pub trailers: Vec<(String, String)>,
}

impl CommitRequest {
    /// A new commit with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Amend HEAD, keeping its message.
    #[must_use]
    pub fn amend() -> Self {
        Self {
            amend: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    #[must_use]
    pub const fn signoff(mut self, signoff: bool) -> Self {
        self.signoff = signoff;
        self
    }

    #[must_use]
    pub fn trailer(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.trailers.push((key.into(), value.into()));
        self
    }

    /// Render as `git commit` arguments (without the leading `commit`).
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(message) = &self.message {
            args.push("--message".into());
            args.push(message.clone());
        }
        if self.amend {
            args.push("--amend".into());
            if self.message.is_none() {
                args.push("--no-edit".into());
            }
        }
        if self.allow_empty {
            args.push("--allow-empty".into());
        }
        for (key, value) in &self.trailers {
            args.push("--trailer".into());
            args.push(format!("{key}: {value}"));
        }
        if self.signoff {
            args.push("--signoff".into());
        }
        if !self.paths.is_empty() {
            args.push("--".into());
            args.extend(self.paths.iter().cloned());
        }
        args
    }
}

/// Result of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A commit was written.
    Created,
    /// The selected paths had no changes.
    NothingToCommit,
}
