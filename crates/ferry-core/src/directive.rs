//! Carry-commit directives.
//!
//! Every commit that exists only downstream declares its intent in its subject:
//!
//! ```text
//! UPSTREAM: <carry>: keep the downstream Makefile
//! UPSTREAM: <drop>: generated files
//! UPSTREAM: 1234: fix the watch loop
//! UPSTREAM: revert: operator-framework/api: 98: undo the schema change
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::commit::Commit;
use crate::error::{Error, Result};

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^UPSTREAM: (revert: )?(([\w.-]+/[\w.-]+)?: )?(\d+:|<carry>:|<drop>:)").unwrap()
});

/// The intent declared by a carry commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Directive {
    /// Must be reapplied on every sync.
    Carry,
    /// Downstream-only, regenerated or obsolete; never reapplied.
    Drop,
    /// Cherry-pick of an upstream pull request.
    PullRequest(u64),
    /// Reverts a change; classified like the wrapped directive.
    Revert(Box<Directive>),
}

impl Directive {
    /// Parse the directive at the start of a commit subject.
    ///
    /// Returns the directive together with the optional `<org>/<repo>` scope,
    /// or `None` if the subject does not start with a directive.
    #[must_use]
    pub fn parse(subject: &str) -> Option<(Self, Option<String>)> {
        let caps = DIRECTIVE.captures(subject)?;
        let scope = caps.get(3).map(|m| m.as_str().to_string());

        let base = match caps[4].trim_end_matches(':') {
            "<carry>" => Self::Carry,
            "<drop>" => Self::Drop,
            number => Self::PullRequest(number.parse().ok()?),
        };

        let directive = if caps.get(1).is_some() {
            Self::Revert(Box::new(base))
        } else {
            base
        };
        Some((directive, scope))
    }

    /// Parse the directive of `commit`.
    ///
    /// # Errors
    /// Returns `UnexpectedCommitDirective` if the subject has no directive.
    pub fn of(commit: &Commit) -> Result<Self> {
        Self::parse(&commit.message)
            .map(|(directive, _)| directive)
            .ok_or_else(|| Error::UnexpectedCommitDirective {
                hash: commit.hash.clone(),
                message: commit.message.clone(),
            })
    }

    /// The directive with any revert wrappers removed.
    #[must_use]
    pub fn base(&self) -> &Self {
        match self {
            Self::Revert(inner) => inner.base(),
            other => other,
        }
    }

    /// Whether this is a revert.
    #[must_use]
    pub const fn is_revert(&self) -> bool {
        matches!(self, Self::Revert(_))
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Carry => write!(f, "carry"),
            Self::Drop => write!(f, "drop"),
            Self::PullRequest(n) => write!(f, "#{n}"),
            Self::Revert(inner) => write!(f, "revert {inner}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_carry_and_drop() {
        assert_eq!(
            Directive::parse("UPSTREAM: <carry>: fix bug"),
            Some((Directive::Carry, None))
        );
        assert_eq!(
            Directive::parse("UPSTREAM: <drop>: go mod vendor"),
            Some((Directive::Drop, None))
        );
    }

    #[test]
    fn test_parse_pull_request() {
        assert_eq!(
            Directive::parse("UPSTREAM: 1234: did X"),
            Some((Directive::PullRequest(1234), None))
        );
    }

    #[test]
    fn test_parse_scoped_revert() {
        let (directive, scope) =
            Directive::parse("UPSTREAM: revert: operator-framework/api: 98: undo").unwrap();
        assert_eq!(directive, Directive::Revert(Box::new(Directive::PullRequest(98))));
        assert_eq!(scope.as_deref(), Some("operator-framework/api"));
        assert!(directive.is_revert());
        assert_eq!(directive.base(), &Directive::PullRequest(98));
    }

    #[test]
    fn test_parse_rejects_free_form() {
        for subject in [
            "fix bug",
            "UPSTREAM: fix bug",
            "upstream: <carry>: lower case",
            " UPSTREAM: <carry>: leading space",
            "UPSTREAM: <carry> missing colon",
        ] {
            assert_eq!(Directive::parse(subject), None, "{subject}");
        }
    }

    #[test]
    fn test_of_reports_commit() {
        let commit = Commit {
            date: chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
            hash: "a".repeat(40),
            author: "dev".into(),
            message: "fix bug".into(),
            repository: "api".into(),
        };
        match Directive::of(&commit).unwrap_err() {
            Error::UnexpectedCommitDirective { hash, message } => {
                assert_eq!(hash, "a".repeat(40));
                assert_eq!(message, "fix bug");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
