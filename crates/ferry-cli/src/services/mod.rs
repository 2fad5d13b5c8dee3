//! Service layer for business logic with dependency injection.
//!
//! Services accept trait-based git, module and GitHub dependencies so their
//! logic can be tested against mock implementations.

pub mod mirror;
pub mod monorepo;
pub mod publish;

#[cfg(test)]
pub mod test_mocks;

pub use mirror::{MirrorRun, MirrorService};
pub use monorepo::MonorepoService;
pub use publish::{PublishResult, PublishService, PublishSettings};
