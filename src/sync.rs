// src/sync.rs
//! Remote backup of the committed state file.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::config::GitSyncConfig;

#[async_trait::async_trait]
pub trait PersistenceSync: Send + Sync {
    /// Copy the state file at `path` to remote storage.
    async fn store(&self, path: &Path) -> Result<()>;
}

/// Sync disabled.
pub struct NoopSync;

#[async_trait::async_trait]
impl PersistenceSync for NoopSync {
    async fn store(&self, path: &Path) -> Result<()> {
        tracing::debug!(path = %path.display(), "remote sync disabled");
        Ok(())
    }
}

/// Commits the state file and pushes it to a git remote.
pub struct GitSync {
    repo_dir: PathBuf,
    remote: String,
    branch: String,
    timeout: Duration,
}

impl GitSync {
    pub fn new(cfg: &GitSyncConfig) -> Self {
        Self {
            repo_dir: cfg.repo_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            remote: cfg.remote.clone(),
            branch: cfg.branch.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<std::process::ExitStatus> {
        let out = tokio::time::timeout(
            self.timeout,
            Command::new("git")
                .args(args)
                .current_dir(&self.repo_dir)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .with_context(|| format!("git {} timed out", args.join(" ")))?
        .with_context(|| format!("spawning git {}", args.join(" ")))?;
        if !out.status.success() {
            tracing::debug!(
                args = %args.join(" "),
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "git exited non-zero"
            );
        }
        Ok(out.status)
    }

    /// `path` as git sees it from `repo_dir`. Relative state paths resolve
    /// against the process directory, git resolves against `repo_dir`.
    fn repo_path(&self, path: &Path) -> Result<PathBuf> {
        let file = fs::canonicalize(path)
            .with_context(|| format!("resolving {}", path.display()))?;
        let root = fs::canonicalize(&self.repo_dir)
            .with_context(|| format!("resolving {}", self.repo_dir.display()))?;
        Ok(match file.strip_prefix(&root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => file,
        })
    }

    async fn git_ok(&self, args: &[&str]) -> Result<()> {
        let status = self.git(args).await?;
        if !status.success() {
            bail!("git {} failed with {status}", args.join(" "));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PersistenceSync for GitSync {
    async fn store(&self, path: &Path) -> Result<()> {
        let owned = self.repo_path(path)?.to_string_lossy().into_owned();
        let p = owned.as_str();
        self.git_ok(&["add", "--", p]).await?;
        // exit 0: nothing staged
        if self.git(&["diff", "--cached", "--quiet", "--", p]).await?.success() {
            tracing::debug!(path = %p, "state unchanged; nothing to push");
            return Ok(());
        }
        let msg = format!(
            "chore: update price-watch state ({})",
            chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
        );
        self.git_ok(&["commit", "-m", msg.as_str(), "--", p]).await?;
        let refspec = format!("HEAD:{}", self.branch);
        self.git_ok(&["push", self.remote.as_str(), refspec.as_str()])
            .await?;
        tracing::info!(path = %p, remote = %self.remote, "state pushed");
        Ok(())
    }
}

// --- Test helper ---
pub struct MockSync {
    pub calls: std::sync::Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl MockSync {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(vec![]),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: std::sync::Mutex::new(vec![]),
            fail: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl Default for MockSync {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PersistenceSync for MockSync {
    async fn store(&self, path: &Path) -> Result<()> {
        if let Ok(mut c) = self.calls.lock() {
            c.push(path.to_path_buf());
        }
        if self.fail {
            bail!("remote unreachable");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: PersistenceSync + ?Sized> PersistenceSync for std::sync::Arc<S> {
    async fn store(&self, path: &Path) -> Result<()> {
        (**self).store(path).await
    }
}
