//! # ferry-core
//!
//! The synchronization engine: which upstream commits a downstream is missing,
//! which downstream commits must be carried, and how both are replayed onto a
//! branch that can be published for review.
//!
//! Two layouts are supported. A *monorepo* vendors each upstream component
//! under a staging directory and tracks provenance in commit trailers. A
//! *mirror* keeps one downstream repository per upstream and tracks the
//! merged upstream commit in a bookkeeping file.

pub mod bookkeeping;
pub mod classify;
pub mod commit;
pub mod config;
pub mod conflict;
pub mod detect;
pub mod directive;
pub mod error;
pub mod interleave;
pub mod mode;
pub mod modules;
pub mod plan;
pub mod reconcile;
pub mod registry;
pub mod replay;
pub mod report;
pub mod version;

#[cfg(test)]
mod test_mocks;

pub use bookkeeping::SyncBookkeepingRecord;
pub use classify::Classification;
pub use commit::Commit;
pub use config::{Config, FetchMode};
pub use conflict::{AbortOnConflict, ConflictContext, ConflictHandler, Resolution};
pub use detect::DetectOptions;
pub use directive::Directive;
pub use error::{Error, Result};
pub use mode::Mode;
pub use modules::{GoModules, ModuleTool};
pub use plan::{SyncPlan, SynchronizationTarget};
pub use registry::{RepositoryRegistry, RepositorySet};
pub use replay::{ReplayOptions, ReplayOutcome, ReplayState};
