//! Run modes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a run does with the detected work.
///
/// Each mode includes the previous one: publishing replays first, replaying
/// detects first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Print what would be replayed; only fetches touch the repositories.
    #[default]
    Summarize,
    /// Replay into the local repositories.
    Synchronize,
    /// Replay, push and open or update pull requests.
    Publish,
}

impl Mode {
    /// Whether local branches are rewritten.
    #[must_use]
    pub fn replays(self) -> bool {
        self >= Self::Synchronize
    }

    /// Whether results leave the machine.
    #[must_use]
    pub fn publishes(self) -> bool {
        self == Self::Publish
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Summarize => "summarize",
            Self::Synchronize => "synchronize",
            Self::Publish => "publish",
        };
        f.write_str(name)
    }
}
