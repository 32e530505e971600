// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version-control store access.
//!
//! Barehome never manipulates repository internals by hand. Everything goes
//! through [`StoreAccess`], which exposes only the handful of queries and
//! mutations the reconciliation steps need. The default implementation,
//! [`Git2Store`], uses libgit2 for repository inspection and configuration,
//! and calls the Git binary itself for staging so that the working tree alias
//! is handled exactly as the user's own alias would handle it.
//!
//! # Bare-Alias Repositories
//!
//! Bare repositories lack a working tree by definition, but Git allows users
//! to force one through the "--work-tree" argument. This keeps the Git
//! directory and the working tree separate, so the home directory can be
//! tracked without turning it into a regular checkout.
//!
//! # See Also
//!
//! 1. [ArchWiki - dotfiles](https://wiki.archlinux.org/title/Dotfiles#Tracking_dotfiles_directly_with_Git)

use git2::{ConfigLevel, ErrorCode, Repository};
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, instrument};

/// Layer of indirection for version-control store access.
pub trait StoreAccess {
    /// Check if path holds a valid bare store.
    fn is_store(&self, git_dir: &Path) -> bool;

    /// Initialize new bare store at path.
    fn init_bare(&self, git_dir: &Path) -> Result<()>;

    /// URL of named remote, or empty string if no such remote exists.
    fn remote_url(&self, git_dir: &Path, name: &str) -> Result<String>;

    /// Create new named remote.
    fn add_remote(&self, git_dir: &Path, name: &str, url: &str) -> Result<()>;

    /// Set key in store's local configuration.
    fn set_config(&self, git_dir: &Path, key: &str, value: &str) -> Result<()>;

    /// Read key from store's configuration.
    fn config_value(&self, git_dir: &Path, key: &str) -> Result<Option<String>>;

    /// Stage file into store's index regardless of ignore rules.
    fn force_add(&self, git_dir: &Path, work_tree: &Path, file: &Path) -> Result<()>;

    /// Check if file is present in store's index.
    fn is_tracked(&self, git_dir: &Path, work_tree: &Path, file: &Path) -> Result<bool>;
}

/// Store access through libgit2 and the Git binary.
#[derive(Debug, Default, Clone)]
pub struct Git2Store;

impl Git2Store {
    /// Construct new store accessor.
    pub fn new() -> Self {
        Self
    }
}

impl StoreAccess for Git2Store {
    fn is_store(&self, git_dir: &Path) -> bool {
        Repository::open_bare(git_dir).is_ok()
    }

    #[instrument(skip(self), level = "debug")]
    fn init_bare(&self, git_dir: &Path) -> Result<()> {
        Repository::init_bare(git_dir)?;
        Ok(())
    }

    fn remote_url(&self, git_dir: &Path, name: &str) -> Result<String> {
        let repository = Repository::open_bare(git_dir)?;

        // INVARIANT: Missing remote means empty binding, not an error.
        let url = match repository.find_remote(name) {
            Ok(remote) => remote.url().unwrap_or_default().to_string(),
            Err(err) if err.code() == ErrorCode::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(url)
    }

    #[instrument(skip(self), level = "debug")]
    fn add_remote(&self, git_dir: &Path, name: &str, url: &str) -> Result<()> {
        let repository = Repository::open_bare(git_dir)?;
        repository.remote(name, url)?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn set_config(&self, git_dir: &Path, key: &str, value: &str) -> Result<()> {
        let repository = Repository::open_bare(git_dir)?;
        let mut config = repository.config()?.open_level(ConfigLevel::Local)?;
        config.set_str(key, value)?;
        Ok(())
    }

    fn config_value(&self, git_dir: &Path, key: &str) -> Result<Option<String>> {
        let repository = Repository::open_bare(git_dir)?;
        let snapshot = repository.config()?.snapshot()?;
        let value = match snapshot.get_string(key) {
            Ok(value) => Some(value),
            Err(err) if err.code() == ErrorCode::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        Ok(value)
    }

    #[instrument(skip(self), level = "debug")]
    fn force_add(&self, git_dir: &Path, work_tree: &Path, file: &Path) -> Result<()> {
        let relative = relative_to(work_tree, file)?;
        let args: Vec<OsString> = vec![
            "--git-dir".into(),
            git_dir.as_os_str().into(),
            "--work-tree".into(),
            work_tree.as_os_str().into(),
            "add".into(),
            "--force".into(),
            "--".into(),
            relative.into_os_string(),
        ];

        let output = syscall_non_interactive("git", work_tree, args)?;
        debug!("{output}");

        Ok(())
    }

    fn is_tracked(&self, git_dir: &Path, work_tree: &Path, file: &Path) -> Result<bool> {
        let relative = relative_to(work_tree, file)?;
        let repository = Repository::open_bare(git_dir)?;
        let index = repository.index()?;
        Ok(index.get_path(&relative, 0).is_some())
    }
}

fn relative_to(work_tree: &Path, file: &Path) -> Result<PathBuf> {
    file.strip_prefix(work_tree)
        .map(Path::to_path_buf)
        .map_err(|_| StoreError::OutsideWorkTree {
            file: file.to_path_buf(),
            work_tree: work_tree.to_path_buf(),
        })
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    current_dir: impl AsRef<Path>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref())
        .current_dir(current_dir.as_ref())
        .args(args)
        .output()
        .map_err(|err| StoreError::Syscall {
            source: err,
            command: cmd.as_ref().to_os_string(),
        })?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(StoreError::CommandFailed {
            command: cmd.as_ref().to_os_string(),
            message,
        });
    }

    Ok(message)
}

/// Store access error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// External command could not be spawned.
    #[error("failed to run command {command:?}")]
    Syscall {
        #[source]
        source: std::io::Error,
        command: OsString,
    },

    /// External command exited unsuccessfully.
    #[error("command {command:?} failed:\n{message}")]
    CommandFailed { command: OsString, message: String },

    /// File to stage does not live under the working tree.
    #[error("{:?} is not inside work tree {:?}", file.display(), work_tree.display())]
    OutsideWorkTree { file: PathBuf, work_tree: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
