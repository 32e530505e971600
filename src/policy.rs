// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Exclusion policy handling.
//!
//! A home directory contains far more files than anyone wants tracked, so the
//! bare repository ignores everything by default. The policy lives in a
//! gitignore file under the dotfiles directory, which is wired into the
//! store's configuration through `core.excludesFile`. Showing untracked files
//! is turned off as well, otherwise every status call would list the entire
//! home directory.
//!
//! The policy file itself is the one exception. It is force-added to the
//! store's index so that the policy travels with the repository.
//!
//! # Policy File Layout
//!
//! The policy file is a plain gitignore file with one pattern per line. Barehome
//! only guarantees that one line is exactly `*`. Any other rule the user has
//! written is left alone. Lines are never removed or reordered, the match-all
//! rule is only ever appended.

use crate::store::{Git2Store, StoreAccess};

use std::{
    fs::{read, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

/// Pattern matching every path.
pub const MATCH_ALL: &str = "*";

/// File name of the exclusion policy.
pub const POLICY_FILE_NAME: &str = ".gitignore";

/// Configuration key pointing at the exclusion policy file.
pub const EXCLUDES_FILE_KEY: &str = "core.excludesFile";

/// Configuration key controlling display of untracked files.
pub const SHOW_UNTRACKED_KEY: &str = "status.showUntrackedFiles";

/// What had to happen to the policy file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFileOutcome {
    /// Policy file did not exist and was written.
    Created,

    /// Match-all rule was appended to existing policy file.
    Appended,

    /// Policy file already contained match-all rule.
    Unchanged,
}

/// Reconcile exclusion policy file and its binding to the store.
#[derive(Debug, Clone)]
pub struct ExclusionPolicy<S = Git2Store>
where
    S: StoreAccess,
{
    git_dir: PathBuf,
    dotfiles_dir: PathBuf,
    work_tree: PathBuf,
    store: S,
}

impl<S> ExclusionPolicy<S>
where
    S: StoreAccess,
{
    /// Construct new exclusion policy writer.
    pub fn new(
        git_dir: impl Into<PathBuf>,
        dotfiles_dir: impl Into<PathBuf>,
        work_tree: impl Into<PathBuf>,
        store: S,
    ) -> Self {
        Self {
            git_dir: git_dir.into(),
            dotfiles_dir: dotfiles_dir.into(),
            work_tree: work_tree.into(),
            store,
        }
    }

    /// Path to exclusion policy file.
    pub fn excludes_file(&self) -> PathBuf {
        self.dotfiles_dir.join(POLICY_FILE_NAME)
    }

    /// Write policy file, then bind it to the store.
    ///
    /// # Errors
    ///
    /// - Return [`PolicyError`] if any step fails. Nothing after the failing
    ///   step is attempted.
    #[instrument(skip(self), level = "debug")]
    pub fn reconcile(&self) -> Result<PolicyFileOutcome> {
        let outcome = self.write_policy_file()?;
        self.bind()?;

        Ok(outcome)
    }

    /// Make sure policy file exists and contains match-all rule.
    ///
    /// # Errors
    ///
    /// - Return [`PolicyError::CreateDir`] if dotfiles directory cannot be
    ///   created.
    /// - Return [`PolicyError::ReadPolicyFile`] if existing policy file cannot
    ///   be read.
    /// - Return [`PolicyError::WritePolicyFile`] if policy file cannot be
    ///   written to.
    pub fn write_policy_file(&self) -> Result<PolicyFileOutcome> {
        mkdirp::mkdirp(&self.dotfiles_dir).map_err(|err| PolicyError::CreateDir {
            source: err,
            path: self.dotfiles_dir.clone(),
        })?;

        let excludes_file = self.excludes_file();
        let content = match read(&excludes_file) {
            Ok(content) => Some(content),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                return Err(PolicyError::ReadPolicyFile {
                    source: err,
                    path: excludes_file,
                })
            }
        };

        let Some((outcome, addition)) = plan_addition(content.as_deref()) else {
            info!("{:?} already ignores everything", excludes_file.display());
            return Ok(PolicyFileOutcome::Unchanged);
        };

        append(&excludes_file, &addition)?;
        match outcome {
            PolicyFileOutcome::Created => info!("create {:?}", excludes_file.display()),
            _ => info!("append {MATCH_ALL:?} to {:?}", excludes_file.display()),
        }

        Ok(outcome)
    }

    /// Point store at policy file, hide untracked files, and track the
    /// policy file itself.
    ///
    /// Settings are derived, so they are written unconditionally.
    ///
    /// # Errors
    ///
    /// - Return [`PolicyError::Store`] if store operations fail.
    pub fn bind(&self) -> Result<()> {
        let excludes_file = self.excludes_file();
        let value = excludes_file.to_string_lossy();

        info!("set {EXCLUDES_FILE_KEY} to {value:?}");
        self.store
            .set_config(&self.git_dir, EXCLUDES_FILE_KEY, value.as_ref())?;

        info!("set {SHOW_UNTRACKED_KEY} to \"no\"");
        self.store
            .set_config(&self.git_dir, SHOW_UNTRACKED_KEY, "no")?;

        info!("track {:?}", excludes_file.display());
        self.store
            .force_add(&self.git_dir, &self.work_tree, &excludes_file)?;

        Ok(())
    }
}

/// Check for a line that is exactly the match-all pattern.
///
/// Works on raw bytes, gitignore files are not required to be UTF-8.
pub fn has_match_all(content: &[u8]) -> bool {
    content
        .split(|byte| *byte == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .any(|line| line == MATCH_ALL.as_bytes())
}

/// Decide what to append to a policy file, given its current contents.
///
/// Returns nothing if the match-all rule is already present.
pub fn plan_addition(content: Option<&[u8]>) -> Option<(PolicyFileOutcome, String)> {
    match content {
        None => Some((PolicyFileOutcome::Created, format!("{MATCH_ALL}\n"))),
        Some(content) if has_match_all(content) => None,
        // INVARIANT: Keep the appended rule on its own line.
        Some(content) if content.is_empty() || content.ends_with(b"\n") => {
            Some((PolicyFileOutcome::Appended, format!("{MATCH_ALL}\n")))
        }
        Some(_) => Some((PolicyFileOutcome::Appended, format!("\n{MATCH_ALL}\n"))),
    }
}

fn append(path: &Path, data: &str) -> Result<()> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(data.as_bytes()))
        .map_err(|err| PolicyError::WritePolicyFile {
            source: err,
            path: path.to_path_buf(),
        })
}

/// Exclusion policy error types.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Dotfiles directory cannot be created.
    #[error("failed to create dotfiles directory at {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Policy file cannot be read from.
    #[error("failed to read from policy file at {:?}", path.display())]
    ReadPolicyFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Policy file cannot be written to.
    #[error("failed to write to policy file at {:?}", path.display())]
    WritePolicyFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Store operations fail.
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

/// Friendly result alias :3
pub type Result<T, E = PolicyError> = std::result::Result<T, E>;
