//! Git access.
//!
//! [`GitClient`] is the seam the publisher talks to; [`CommandGit`] drives the
//! `git` executable. Every call is blocking and honours a
//! [`CancellationToken`] by killing the child process.

use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    thread,
    time::Duration,
};

use pressroom_core::settings::CommitIdentity;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

/// User name git expects in front of a token in an HTTPS remote.
const TOKEN_USER: &str = "x-access-token";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Git errors.
#[derive(Debug, Error)]
pub enum GitError {
    /// The git executable could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A git command exited unsuccessfully.
    #[error("git {command} failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// IO error while talking to the child process.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation was cancelled.
    #[error("git operation cancelled")]
    Cancelled,

    /// A branch name git could read as an option or that is otherwise unusable.
    #[error("invalid branch name {0:?}")]
    InvalidBranch(String),
}

/// Result type for git operations.
pub type Result<T> = std::result::Result<T, GitError>;

/// Operations the publisher needs from git.
///
/// `dir` is always the working tree of a clone made by [`GitClient::clone_repo`].
pub trait GitClient {
    /// Clone `remote` into `dir`.
    fn clone_repo(&self, remote: &str, dir: &Path, cancel: &CancellationToken) -> Result<()>;

    /// Check out an existing local or remote branch.
    fn checkout(&self, dir: &Path, branch: &str, cancel: &CancellationToken) -> Result<()>;

    /// Create and check out a new branch.
    fn create_branch(&self, dir: &Path, branch: &str, cancel: &CancellationToken) -> Result<()>;

    /// Stage every change in the working tree, deletions included.
    fn add_all(&self, dir: &Path, cancel: &CancellationToken) -> Result<()>;

    /// Staged changes as NUL separated `XY path` records.
    fn status(&self, dir: &Path, cancel: &CancellationToken) -> Result<String>;

    /// Commit the index.
    fn commit(
        &self,
        dir: &Path,
        message: &str,
        identity: &CommitIdentity,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Hash of `HEAD`.
    fn head(&self, dir: &Path, cancel: &CancellationToken) -> Result<String>;

    /// Push `branch` to `origin`.
    fn push(&self, dir: &Path, branch: &str, cancel: &CancellationToken) -> Result<()>;
}

/// [`GitClient`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct CommandGit {
    binary: PathBuf,
}

impl Default for CommandGit {
    fn default() -> Self {
        Self::new("git")
    }
}

impl CommandGit {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run git with `args` in `dir`, returning stdout.
    fn run(&self, dir: Option<&Path>, args: &[&str], cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(GitError::Cancelled);
        }

        let subcommand = args
            .iter()
            .find(|a| !a.starts_with('-') && !a.contains('='))
            .copied()
            .unwrap_or_default()
            .to_string();
        trace!(command = %subcommand, dir = ?dir, "running git");

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| GitError::Spawn {
            program: self.binary.display().to_string(),
            source,
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = loop {
            if cancel.is_cancelled() {
                kill(&mut child, &subcommand);
                return Err(GitError::Cancelled);
            }
            match child.try_wait()? {
                Some(status) => break status,
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(GitError::Failed {
                command: subcommand,
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(stdout)
    }
}

/// Read a child stream to the end on its own thread so the pipe never fills.
fn drain<R: Read + Send + 'static>(stream: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn kill(child: &mut Child, subcommand: &str) {
    debug!(command = subcommand, "cancelling git process");
    let _ = child.kill();
    let _ = child.wait();
}

impl GitClient for CommandGit {
    fn clone_repo(&self, remote: &str, dir: &Path, cancel: &CancellationToken) -> Result<()> {
        let dir = dir.to_string_lossy();
        self.run(None, &["clone", "--quiet", "--", remote, &dir], cancel)
            .map(drop)
    }

    fn checkout(&self, dir: &Path, branch: &str, cancel: &CancellationToken) -> Result<()> {
        validate_branch(branch)?;
        self.run(Some(dir), &["checkout", "--quiet", branch, "--"], cancel)
            .map(drop)
    }

    fn create_branch(&self, dir: &Path, branch: &str, cancel: &CancellationToken) -> Result<()> {
        validate_branch(branch)?;
        self.run(Some(dir), &["checkout", "--quiet", "-b", branch], cancel)
            .map(drop)
    }

    fn add_all(&self, dir: &Path, cancel: &CancellationToken) -> Result<()> {
        self.run(Some(dir), &["add", "--all"], cancel).map(drop)
    }

    fn status(&self, dir: &Path, cancel: &CancellationToken) -> Result<String> {
        self.run(
            Some(dir),
            &["status", "--porcelain=v1", "--no-renames", "-z"],
            cancel,
        )
    }

    fn commit(
        &self,
        dir: &Path,
        message: &str,
        identity: &CommitIdentity,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let name = format!("user.name={}", identity.name);
        let email = format!("user.email={}", identity.email);
        self.run(
            Some(dir),
            &[
                "-c",
                &name,
                "-c",
                &email,
                "-c",
                "commit.gpgsign=false",
                "commit",
                "--quiet",
                "-m",
                message,
            ],
            cancel,
        )
        .map(drop)
    }

    fn head(&self, dir: &Path, cancel: &CancellationToken) -> Result<String> {
        self.run(Some(dir), &["rev-parse", "HEAD"], cancel)
            .map(|out| out.trim().to_string())
    }

    fn push(&self, dir: &Path, branch: &str, cancel: &CancellationToken) -> Result<()> {
        validate_branch(branch)?;
        self.run(Some(dir), &["push", "--quiet", "origin", branch], cancel)
            .map(drop)
    }
}

/// Reject branch names git would parse as an option, and empty or
/// whitespace-bearing names.
pub fn validate_branch(branch: &str) -> Result<()> {
    let usable = !branch.is_empty()
        && !branch.starts_with('-')
        && !branch.chars().any(|c| c.is_whitespace() || c.is_control());
    if usable {
        Ok(())
    } else {
        Err(GitError::InvalidBranch(branch.to_string()))
    }
}

/// Remote URL carrying `token` for HTTPS remotes.
///
/// Other schemes, unparsable remotes (scp-style or plain paths) and a missing
/// token return the remote unchanged and rely on the ambient SSH identity.
pub fn authenticated_remote(remote: &str, token: Option<&str>) -> String {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return remote.to_string();
    };
    match Url::parse(remote) {
        Ok(mut url) if url.scheme() == "https" => {
            if url.set_username(TOKEN_USER).is_err() || url.set_password(Some(token)).is_err() {
                return remote.to_string();
            }
            url.to_string()
        }
        _ => remote.to_string(),
    }
}

/// `remote` with any password replaced, for logs and errors.
pub fn redact_remote(remote: &str) -> String {
    match Url::parse(remote) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => remote.to_string(),
    }
}
