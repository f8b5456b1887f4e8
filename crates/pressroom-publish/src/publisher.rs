//! Publish, backup and plan flows.
//!
//! All three share one skeleton: clone the target into a temporary
//! directory, check out the branch (creating it on first use), replace the
//! working tree with the source trees, stage everything and read the change
//! plan. Publish and backup then commit and push; plan stops there.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use chrono::{SecondsFormat, Utc};
use pressroom_core::{RepoTarget, SiteWorkspace};
use tempfile::TempDir;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    git::{CommandGit, GitClient, GitError, authenticated_remote, redact_remote, validate_branch},
    plan::ChangePlan,
};

/// Publish errors.
#[derive(Debug, Error)]
pub enum PublishError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Git error.
    #[error("git error: {0}")]
    Git(#[from] GitError),

    /// Source walk error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// No remote configured for the operation.
    #[error("no {0} repository configured")]
    NotConfigured(Operation),

    /// The tree to synchronize does not exist.
    #[error("source tree not found: {0}")]
    SourceMissing(PathBuf),
}

/// Result type for publish operations.
pub type Result<T> = std::result::Result<T, PublishError>;

/// Kind of synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Rendered HTML tree.
    Publish,
    /// Exported source records and uploads.
    Backup,
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Backup => "backup",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of a publish or backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A commit was created and pushed.
    Published { commit: String, plan: ChangePlan },
    /// The remote already matches the source tree; nothing was committed.
    NoChanges,
}

impl PublishOutcome {
    pub fn commit(&self) -> Option<&str> {
        match self {
            Self::Published { commit, .. } => Some(commit),
            Self::NoChanges => None,
        }
    }
}

/// A directory copied into the clone at `dest` (empty for the clone root).
struct SourceTree<'s> {
    path: &'s Path,
    dest: &'s str,
}

/// Synchronizes workspace trees with git remotes.
#[derive(Debug, Clone, Default)]
pub struct Publisher<G = CommandGit> {
    git: G,
}

impl<G: GitClient> Publisher<G> {
    #[must_use]
    pub fn new(git: G) -> Self {
        Self { git }
    }

    /// Push the generated HTML tree to the publish target.
    pub fn publish(
        &self,
        target: &RepoTarget,
        html_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PublishOutcome> {
        if !html_dir.is_dir() {
            return Err(PublishError::SourceMissing(html_dir.to_path_buf()));
        }
        let sources = [SourceTree {
            path: html_dir,
            dest: "",
        }];
        self.commit_and_push(Operation::Publish, target, &sources, cancel)
    }

    /// Push the exported source records, images, profiles and metadata.
    ///
    /// Each tree lands in a directory of the same name; missing trees are skipped.
    pub fn backup(
        &self,
        target: &RepoTarget,
        workspace: &SiteWorkspace,
        cancel: &CancellationToken,
    ) -> Result<PublishOutcome> {
        let trees = workspace.backup_sources();
        let sources: Vec<SourceTree<'_>> = trees
            .iter()
            .filter(|(path, _)| path.is_dir())
            .map(|(path, dest)| SourceTree { path, dest })
            .collect();
        if sources.is_empty() {
            return Err(PublishError::SourceMissing(workspace.root().to_path_buf()));
        }
        self.commit_and_push(Operation::Backup, target, &sources, cancel)
    }

    /// Stage the HTML tree against the publish target without committing.
    pub fn plan(
        &self,
        target: &RepoTarget,
        html_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<ChangePlan> {
        if !html_dir.is_dir() {
            return Err(PublishError::SourceMissing(html_dir.to_path_buf()));
        }
        let sources = [SourceTree {
            path: html_dir,
            dest: "",
        }];
        let (_clone, plan) = self.stage(Operation::Publish, target, &sources, cancel)?;
        info!(branch = %target.branch, changes = %plan.summary(), "planned publish");
        Ok(plan)
    }

    fn commit_and_push(
        &self,
        op: Operation,
        target: &RepoTarget,
        sources: &[SourceTree<'_>],
        cancel: &CancellationToken,
    ) -> Result<PublishOutcome> {
        let (clone, plan) = self.stage(op, target, sources, cancel)?;
        let dir = clone.path();

        if plan.is_empty() {
            info!(operation = %op, branch = %target.branch, "nothing to commit");
            return Ok(PublishOutcome::NoChanges);
        }

        let message = commit_message(op, &plan);
        self.git.commit(dir, &message, &target.identity, cancel)?;
        let commit = self.git.head(dir, cancel)?;
        self.git
            .push(dir, &target.branch, cancel)
            .map_err(|e| scrub(e, target.token.as_deref()))?;

        info!(
            operation = %op,
            branch = %target.branch,
            commit = %commit,
            changes = %plan.summary(),
            "pushed"
        );
        Ok(PublishOutcome::Published { commit, plan })
    }

    /// Clone, check out, replace the tree and stage. The clone is removed when
    /// the returned [`TempDir`] drops.
    fn stage(
        &self,
        op: Operation,
        target: &RepoTarget,
        sources: &[SourceTree<'_>],
        cancel: &CancellationToken,
    ) -> Result<(TempDir, ChangePlan)> {
        if !target.is_configured() {
            return Err(PublishError::NotConfigured(op));
        }
        validate_branch(&target.branch)?;

        let clone = tempfile::Builder::new()
            .prefix("pressroom-")
            .tempdir()?;
        let dir = clone.path();
        let token = target.token.as_deref();

        info!(
            operation = %op,
            remote = %redact_remote(&target.url),
            branch = %target.branch,
            "cloning"
        );
        let remote = authenticated_remote(&target.url, token);
        self.git
            .clone_repo(&remote, dir, cancel)
            .map_err(|e| scrub(e, token))?;

        if let Err(e) = self.git.checkout(dir, &target.branch, cancel) {
            if matches!(e, GitError::Cancelled | GitError::InvalidBranch(_)) {
                return Err(e.into());
            }
            debug!(branch = %target.branch, error = %e, "branch checkout failed, creating it");
            self.git.create_branch(dir, &target.branch, cancel)?;
        }

        clear_worktree(dir)?;
        let mut copied = 0;
        for source in sources {
            copied += copy_tree(source.path, &dir.join(source.dest))?;
        }
        debug!(files = copied, "replaced working tree");

        self.git.add_all(dir, cancel)?;
        let plan = ChangePlan::from_porcelain(&self.git.status(dir, cancel)?);
        Ok((clone, plan))
    }
}

fn commit_message(op: Operation, plan: &ChangePlan) -> String {
    format!(
        "{}: site update {}\n\n{}\n",
        op.label(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        plan.summary()
    )
}

/// Strip a token out of git error output.
fn scrub(error: GitError, token: Option<&str>) -> GitError {
    match (error, token.map(str::trim).filter(|t| !t.is_empty())) {
        (GitError::Failed { command, status, stderr }, Some(token)) => GitError::Failed {
            command,
            status,
            stderr: stderr.replace(token, "***"),
        },
        (error, _) => error,
    }
}

/// Remove everything in the clone except `.git`.
fn clear_worktree(dir: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Copy regular files from `source` into `dest`, skipping any `.git` directory.
fn copy_tree(source: &Path, dest: &Path) -> Result<usize> {
    let mut copied = 0;
    let walker = WalkDir::new(source)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

    for entry in walker {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            warn!(path = %entry.path().display(), "skipping symlink");
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
        copied += 1;
    }
    Ok(copied)
}
