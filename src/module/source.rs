//! Fetching a module's source tree into a temporary working directory.

use crate::module::summary::ModuleError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

static COMMIT_SHA_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{7,40}$").expect("Invalid commit sha regex"));

/// A fetched module tree. Owns the working directory it was cloned into;
/// the directory is removed by [`FetchedModule::cleanup`] or on drop.
#[derive(Debug)]
pub struct FetchedModule {
    workdir: Option<TempDir>,
    root: PathBuf,
}

impl FetchedModule {
    pub fn new(workdir: TempDir, root: PathBuf) -> Self {
        Self {
            workdir: Some(workdir),
            root,
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Remove the working directory now and report failures.
    pub fn cleanup(mut self) -> std::io::Result<()> {
        match self.workdir.take() {
            Some(dir) => {
                debug!("Removing module working directory {}", dir.path().display());
                dir.close()
            }
            None => Ok(()),
        }
    }
}

/// Fetch collaborator: materializes `url` at `reference`, optionally narrowed
/// to `subdir`.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        reference: Option<&str>,
        subdir: Option<&str>,
    ) -> Result<FetchedModule, ModuleError>;
}

/// Shallow-clones with the system `git` binary.
#[derive(Debug, Default, Clone)]
pub struct GitSource;

impl GitSource {
    pub fn new() -> Self {
        Self
    }

    async fn run_git(git: &Path, args: &[&str], cwd: Option<&Path>) -> Result<(), ModuleError> {
        let mut cmd = Command::new(git);
        cmd.args(args).env("GIT_TERMINAL_PROMPT", "0");
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        debug!("Running git {}", args.join(" "));
        let output = cmd
            .output()
            .await
            .map_err(|e| ModuleError::Fetch(format!("failed to run git: {}", e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ModuleError::Fetch(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    async fn clone_into(
        git: &Path,
        url: &str,
        reference: Option<&str>,
        checkout: &Path,
    ) -> Result<(), ModuleError> {
        let target = checkout.to_string_lossy().into_owned();
        let target = target.as_str();

        let Some(reference) = reference else {
            return Self::run_git(
                git,
                &["clone", "--quiet", "--depth", "1", "--", url, target],
                None,
            )
            .await;
        };

        let shallow = Self::run_git(
            git,
            &["clone", "--quiet", "--depth", "1", "--branch", reference, "--", url, target],
            None,
        )
        .await;

        match shallow {
            Ok(()) => Ok(()),
            // --branch only takes branch and tag names
            Err(err) if COMMIT_SHA_REGEX.is_match(reference) => {
                debug!("Shallow clone at {} failed ({}), retrying as commit", reference, err);
                if tokio::fs::try_exists(checkout).await.unwrap_or(false) {
                    tokio::fs::remove_dir_all(checkout)
                        .await
                        .map_err(|e| ModuleError::Fetch(e.to_string()))?;
                }
                Self::run_git(git, &["clone", "--quiet", "--", url, target], None).await?;
                Self::run_git(
                    git,
                    &["checkout", "--quiet", "--detach", reference],
                    Some(checkout),
                )
                .await
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl ModuleSource for GitSource {
    async fn fetch(
        &self,
        url: &str,
        reference: Option<&str>,
        subdir: Option<&str>,
    ) -> Result<FetchedModule, ModuleError> {
        let git = which::which("git")
            .map_err(|e| ModuleError::Fetch(format!("git executable not found: {}", e)))?;

        let workdir = tempfile::Builder::new()
            .prefix("tfdocs-module-")
            .tempdir()
            .map_err(|e| ModuleError::Fetch(format!("failed to create working directory: {}", e)))?;
        let checkout = workdir.path().join("repo");

        info!("Cloning {} (ref: {:?})", url, reference);
        Self::clone_into(&git, url, reference, &checkout).await?;

        let root = resolve_subdir(&checkout, subdir)?;
        Ok(FetchedModule::new(workdir, root))
    }
}

/// Join `subdir` onto `checkout`, refusing paths that leave the checkout.
pub fn resolve_subdir(checkout: &Path, subdir: Option<&str>) -> Result<PathBuf, ModuleError> {
    let Some(subdir) = subdir.map(|s| s.trim().trim_matches('/')).filter(|s| !s.is_empty()) else {
        return Ok(checkout.to_path_buf());
    };

    let relative = Path::new(subdir);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        warn!("Rejected subdirectory outside repository: {}", subdir);
        return Err(ModuleError::Fetch(format!(
            "subdirectory '{}' must stay inside the repository",
            subdir
        )));
    }

    let root = checkout.join(relative);
    if !root.is_dir() {
        return Err(ModuleError::Fetch(format!(
            "subdirectory '{}' not found in repository",
            subdir
        )));
    }
    Ok(root)
}
