//! The plan file: detection results saved between runs.
//!
//! Writing the plan after detection and feeding it back with
//! `--commits-input` splits a sync into a reviewable detection step and a
//! replay step, and lets a failed replay resume without detecting again.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::commit::Commit;
use crate::error::{Error, Result};

/// The upstream target of one mirrored repository and the downstream commits
/// to carry onto it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynchronizationTarget {
    pub target: Commit,
    /// Carries in downstream order.
    #[serde(default)]
    pub additional: Vec<Commit>,
}

/// Detected work, tagged by strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SyncPlan {
    /// Upstream commits to replay into the staging directory, oldest first.
    Monorepo { commits: Vec<Commit> },
    /// Per-repository targets, keyed by upstream name.
    Mirror {
        targets: BTreeMap<String, SynchronizationTarget>,
    },
}

impl SyncPlan {
    /// Whether there is nothing to replay.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Monorepo { commits } => commits.is_empty(),
            Self::Mirror { targets } => targets.is_empty(),
        }
    }

    /// Load a plan file.
    ///
    /// # Errors
    /// Returns error if the file can't be read or is not a plan.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| Error::ParseError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save the plan as pretty JSON.
    ///
    /// # Errors
    /// Returns error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_mocks::commit;
    use tempfile::TempDir;

    #[test]
    fn test_monorepo_plan_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.json");
        let plan = SyncPlan::Monorepo {
            commits: vec![
                commit('a', "api", "first", "2024-01-01T00:00:00Z"),
                commit('b', "registry", "second", "2024-01-02T00:00:00+02:00"),
            ],
        };

        plan.save(&path).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["strategy"], "monorepo");
        assert_eq!(raw["commits"][1]["repo"], "registry");

        assert_eq!(SyncPlan::load(&path).unwrap(), plan);
    }

    #[test]
    fn test_mirror_plan_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.json");
        let mut targets = BTreeMap::new();
        targets.insert(
            "catalogd".to_string(),
            SynchronizationTarget {
                target: commit('c', "catalogd", "upstream head", "2024-01-03T00:00:00Z"),
                additional: vec![commit('d', "catalogd", "UPSTREAM: <carry>: x", "2024-01-01T00:00:00Z")],
            },
        );
        let plan = SyncPlan::Mirror { targets };

        plan.save(&path).unwrap();
        let loaded = SyncPlan::load(&path).unwrap();
        assert_eq!(loaded, plan);
        assert!(!loaded.is_empty());
    }

    #[test]
    fn test_missing_additional_defaults_to_empty() {
        let json = format!(
            r#"{{"strategy": "mirror", "targets": {{"catalogd": {{"target": {{"date": "2024-01-01T00:00:00Z", "hash": "{}"}}}}}}}}"#,
            "e".repeat(40)
        );
        let plan: SyncPlan = serde_json::from_str(&json).unwrap();
        match plan {
            SyncPlan::Mirror { targets } => assert!(targets["catalogd"].additional.is_empty()),
            SyncPlan::Monorepo { .. } => panic!("wrong strategy"),
        }
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.json");
        fs::write(&path, "[]").unwrap();
        assert!(matches!(
            SyncPlan::load(&path),
            Err(Error::ParseError { .. })
        ));
    }
}
