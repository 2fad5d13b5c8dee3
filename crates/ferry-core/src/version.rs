//! Mapping module versions to commits.
//!
//! A released version is a tag. Anything carrying a pre-release component must
//! name its commit explicitly, either as a Go pseudo-version
//! (`v0.0.0-20240101120000-abcdef123456`, `v1.2.4-0.20240101120000-abcdef123456`)
//! or as a dash-delimited pre-release whose last token is a commit hash.
//! Nothing else is guessed.

use std::sync::LazyLock;

use ferry_git::GitOps;
use regex::Regex;

use crate::error::{Error, Result};

static PSEUDO_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^(?:.*\.)?(\d{14})-([0-9a-f]{12,40})$").unwrap()
});

/// What a module version points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRef {
    /// A release tag.
    Tag(String),
    /// A (possibly abbreviated) commit hash.
    Commit(String),
}

/// Decode `version` of `module` into a ref.
///
/// # Errors
/// Returns `UnresolvableVersion` for pre-releases that do not embed a commit.
pub fn parse_version(module: &str, version: &str) -> Result<VersionRef> {
    let unresolvable = |reason: &str| Error::UnresolvableVersion {
        module: module.to_string(),
        version: version.to_string(),
        reason: reason.to_string(),
    };

    // Build metadata (`+incompatible`) never takes part in resolution.
    let bare = version.trim().split('+').next().unwrap_or_default();
    if bare.is_empty() {
        return Err(unresolvable("empty version"));
    }

    let Some((_, prerelease)) = bare.split_once('-') else {
        return Ok(VersionRef::Tag(bare.to_string()));
    };

    if let Some(caps) = PSEUDO_VERSION.captures(prerelease) {
        return Ok(VersionRef::Commit(caps[2].to_string()));
    }

    let last = bare.rsplit('-').next().unwrap_or_default();
    if (7..=40).contains(&last.len()) && last.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(VersionRef::Commit(last.to_ascii_lowercase()));
    }

    Err(unresolvable(
        "pre-release version does not end in a commit hash",
    ))
}

/// Resolve `version` of `module` to a full commit hash in `repo`.
///
/// # Errors
/// Returns `UnresolvableVersion` if the version cannot be decoded or the ref
/// it names does not exist in `repo`.
pub fn resolve_version<G: GitOps>(repo: &G, module: &str, version: &str) -> Result<String> {
    let rev = match parse_version(module, version)? {
        VersionRef::Tag(tag) => tag,
        VersionRef::Commit(hash) => hash,
    };

    match repo.rev_parse(&rev) {
        Ok(hash) => Ok(hash),
        Err(ferry_git::Error::UnknownRevision(_)) => Err(Error::UnresolvableVersion {
            module: module.to_string(),
            version: version.to_string(),
            reason: format!("{rev} not found in repository"),
        }),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_mocks::MockGit;

    #[test]
    fn test_release_is_tag() {
        assert_eq!(
            parse_version("m", "v1.2.3").unwrap(),
            VersionRef::Tag("v1.2.3".into())
        );
        assert_eq!(
            parse_version("m", "v2.0.0+incompatible").unwrap(),
            VersionRef::Tag("v2.0.0".into())
        );
    }

    #[test]
    fn test_pseudo_versions() {
        for version in [
            "v0.0.0-20240101120000-abcdef123456",
            "v1.2.4-0.20240101120000-abcdef123456",
            "v1.2.3-rc.1.0.20240101120000-abcdef123456",
        ] {
            assert_eq!(
                parse_version("m", version).unwrap(),
                VersionRef::Commit("abcdef123456".into()),
                "{version}"
            );
        }
    }

    #[test]
    fn test_dash_delimited_prerelease_with_hash() {
        assert_eq!(
            parse_version("m", "v0.4.0-alpha-1a2b3c4d").unwrap(),
            VersionRef::Commit("1a2b3c4d".into())
        );
    }

    #[test]
    fn test_prerelease_without_commit_is_rejected() {
        for version in ["v1.0.0-rc.1", "v1.0.0-beta-final", ""] {
            let err = parse_version("m", version).unwrap_err();
            assert!(
                matches!(err, Error::UnresolvableVersion { .. }),
                "{version}: {err}"
            );
        }
    }

    #[test]
    fn test_resolve_version_uses_rev_parse() {
        let repo = MockGit::new()
            .with_rev("v1.2.3", "1111111111111111111111111111111111111111")
            .with_rev("abcdef123456", "abcdef1234560000000000000000000000000000");

        assert_eq!(
            resolve_version(&repo, "m", "v1.2.3").unwrap(),
            "1111111111111111111111111111111111111111"
        );
        assert_eq!(
            resolve_version(&repo, "m", "v0.0.0-20240101120000-abcdef123456").unwrap(),
            "abcdef1234560000000000000000000000000000"
        );
    }

    #[test]
    fn test_resolve_missing_tag() {
        let repo = MockGit::new();
        let err = resolve_version(&repo, "m", "v9.9.9").unwrap_err();
        assert!(matches!(err, Error::UnresolvableVersion { .. }));
    }
}
