//! The record of the last upstream commit merged into a downstream branch.

use std::fs;
use std::path::Path;

use ferry_git::GitOps;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Commit-checker configuration committed at the downstream root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBookkeepingRecord {
    /// Organization of the upstream repository.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub upstream_org: String,

    /// Name of the upstream repository.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub upstream_repo: String,

    /// Upstream branch being tracked.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub upstream_branch: String,

    /// Latest upstream commit expected to be present downstream.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expected_merge_base: String,
}

impl SyncBookkeepingRecord {
    /// Record that `upstream_org/upstream_repo@upstream_branch` was merged up to `commit`.
    #[must_use]
    pub fn new(
        upstream_org: impl Into<String>,
        upstream_repo: impl Into<String>,
        upstream_branch: impl Into<String>,
        commit: impl Into<String>,
    ) -> Self {
        Self {
            upstream_org: upstream_org.into(),
            upstream_repo: upstream_repo.into(),
            upstream_branch: upstream_branch.into(),
            expected_merge_base: commit.into(),
        }
    }

    /// Parse a record.
    ///
    /// # Errors
    /// Returns error if the content is not a valid record.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Serialize the record.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Read the record committed at `rev`, if any.
    ///
    /// A file that does not parse is treated as absent.
    ///
    /// # Errors
    /// Returns error if the revision cannot be read.
    pub fn read_at<G: GitOps>(repo: &G, rev: &str, file: &str) -> Result<Option<Self>> {
        let Some(content) = repo.file_at(rev, file)? else {
            return Ok(None);
        };
        match Self::from_yaml(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(file, error = %e, "ignoring unreadable bookkeeping record");
                Ok(None)
            }
        }
    }

    /// Write the record to `dir/file`.
    ///
    /// # Errors
    /// Returns error if serialization or the write fails.
    pub fn write(&self, dir: &Path, file: &str) -> Result<()> {
        fs::write(dir.join(file), self.to_yaml()?)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_mocks::MockGit;
    use tempfile::TempDir;

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn test_yaml_field_names() {
        let record = SyncBookkeepingRecord::new("operator-framework", "catalogd", "main", HASH);
        let yaml = record.to_yaml().unwrap();

        assert!(yaml.contains("upstreamOrg: operator-framework"));
        assert!(yaml.contains("upstreamRepo: catalogd"));
        assert!(yaml.contains("upstreamBranch: main"));
        assert!(yaml.contains(&format!("expectedMergeBase: {HASH}")));
        assert_eq!(SyncBookkeepingRecord::from_yaml(&yaml).unwrap(), record);
    }

    #[test]
    fn test_write_to_dir() {
        let temp = TempDir::new().unwrap();
        let record = SyncBookkeepingRecord::new("org", "repo", "main", HASH);
        record.write(temp.path(), "commitchecker.yaml").unwrap();

        let content = fs::read_to_string(temp.path().join("commitchecker.yaml")).unwrap();
        assert_eq!(SyncBookkeepingRecord::from_yaml(&content).unwrap(), record);
    }

    #[test]
    fn test_read_at_missing_or_garbage() {
        let repo = MockGit::new().with_file("broken.yaml", "[not: a record");
        assert_eq!(
            SyncBookkeepingRecord::read_at(&repo, "main", "commitchecker.yaml").unwrap(),
            None
        );
        assert_eq!(
            SyncBookkeepingRecord::read_at(&repo, "main", "broken.yaml").unwrap(),
            None
        );
    }
}
