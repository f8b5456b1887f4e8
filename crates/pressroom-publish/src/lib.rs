//! Pressroom Publish
//!
//! Synchronizes a site workspace with a git remote. Publish pushes the
//! generated HTML tree, backup pushes the exported source records, and plan
//! previews a publish without committing.

pub mod git;
pub mod plan;
pub mod publisher;

pub use git::{CommandGit, GitClient, GitError, validate_branch};
pub use plan::ChangePlan;
pub use publisher::{Operation, PublishError, PublishOutcome, Publisher};
