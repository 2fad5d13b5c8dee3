//! Commit detection.
//!
//! Each strategy exposes a per-repository function returning that repository's
//! result and an aggregate that collects them into an immutable map; nothing is
//! shared or mutated across repositories while detecting.

pub mod mirror;
pub mod monorepo;

use crate::config::FetchMode;

/// Options shared by both strategies.
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    /// How to reach upstream remotes.
    pub fetch_mode: FetchMode,
    /// Treat up-to-date mirrors as stale.
    pub force_remerge: bool,
    /// Hash prefixes of carries to drop.
    pub drop_list: Vec<String>,
}
