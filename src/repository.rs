// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Bare repository reconciliation.
//!
//! Make sure a bare store exists at the configured git directory, and that it
//! is bound to exactly one "origin" remote. Checks run in a fixed order:
//! existence, file type, store validity, then remote binding. Each failure is
//! therefore attributable to a single cause. A second run with the same
//! arguments is a no-op, and a second run with a different remote is reported
//! as a conflict instead of silently rebinding the store.

use crate::store::{Git2Store, StoreAccess};

use std::{
    fs::{read_link, symlink_metadata},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

/// Name of the remote barehome manages.
pub const ORIGIN: &str = "origin";

/// What the initializer had to do to reach the desired state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryOutcome {
    /// Git directory had to be created.
    pub created_dir: bool,

    /// Bare store had to be initialized.
    pub initialized: bool,

    /// Origin remote had to be bound.
    pub bound_remote: bool,
}

impl RepositoryOutcome {
    /// Check if any mutation took place.
    pub fn changed(&self) -> bool {
        self.created_dir || self.initialized || self.bound_remote
    }
}

/// Reconcile bare store and its origin remote.
#[derive(Debug, Default, Clone)]
pub struct RepositoryInitializer<S = Git2Store>
where
    S: StoreAccess,
{
    store: S,
}

impl<S> RepositoryInitializer<S>
where
    S: StoreAccess,
{
    /// Construct new repository initializer.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Bring git directory in line with desired remote.
    ///
    /// | current origin    | action         | result                        |
    /// |-------------------|----------------|-------------------------------|
    /// | empty             | bind to url    | success                       |
    /// | equal to url      | nothing        | success                       |
    /// | different from url| nothing        | [`RepositoryError::RemoteConflict`] |
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::PathConflict`] if path exists but is not a
    ///   directory.
    /// - Return [`RepositoryError::RemoteConflict`] if origin is bound to a
    ///   different URL.
    /// - Return [`RepositoryError::CreateDir`] if git directory cannot be
    ///   created.
    /// - Return [`RepositoryError::Store`] if store operations fail.
    #[instrument(skip(self), level = "debug")]
    pub fn reconcile(&self, git_dir: &Path, remote_url: &str) -> Result<RepositoryOutcome> {
        let mut outcome = RepositoryOutcome::default();

        match symlink_metadata(git_dir) {
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("create git directory {:?}", git_dir.display());
                mkdirp::mkdirp(git_dir).map_err(|err| RepositoryError::CreateDir {
                    source: err,
                    path: git_dir.to_path_buf(),
                })?;
                outcome.created_dir = true;
            }
            Err(err) => {
                return Err(RepositoryError::Inspect {
                    source: err,
                    path: git_dir.to_path_buf(),
                })
            }
            // INVARIANT: Follow symlinks to directories, reject everything else.
            Ok(_) if !git_dir.is_dir() => {
                return Err(RepositoryError::PathConflict {
                    path: git_dir.to_path_buf(),
                    listing: describe_path(git_dir),
                });
            }
            Ok(_) => {}
        }

        if self.store.is_store(git_dir) {
            info!("bare repository already exists at {:?}", git_dir.display());
        } else {
            info!("initialize bare repository at {:?}", git_dir.display());
            self.store.init_bare(git_dir)?;
            outcome.initialized = true;
        }

        let current = self.store.remote_url(git_dir, ORIGIN)?;
        if current.is_empty() {
            info!("bind remote {ORIGIN} to {remote_url:?}");
            self.store.add_remote(git_dir, ORIGIN, remote_url)?;
            outcome.bound_remote = true;
        } else if current == remote_url {
            info!("remote {ORIGIN} already bound to {remote_url:?}");
        } else {
            return Err(RepositoryError::RemoteConflict {
                current,
                desired: remote_url.to_string(),
            });
        }

        Ok(outcome)
    }
}

// Operator-facing listing of whatever sits at the path, in the spirit of `ls -l`.
fn describe_path(path: &Path) -> String {
    let meta = match symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) => return format!("{}: {err}", path.display()),
    };

    let kind = if meta.file_type().is_symlink() {
        "symlink"
    } else if meta.is_file() {
        "file"
    } else {
        "other"
    };
    let mut listing = format!("{kind} {:>8} {}", meta.len(), path.display());

    if meta.file_type().is_symlink() {
        if let Ok(target) = read_link(path) {
            listing.push_str(&format!(" -> {}", target.display()));
        }
    }

    listing
}

/// Repository reconciliation error types.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Git directory path is taken by something other than a directory.
    #[error("{:?} exists but is not a directory:\n{listing}", path.display())]
    PathConflict { path: PathBuf, listing: String },

    /// Origin remote is bound to a different URL.
    #[error("remote origin is already set to {current:?}, refusing to change it to {desired:?}")]
    RemoteConflict { current: String, desired: String },

    /// Git directory cannot be created.
    #[error("failed to create git directory at {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Git directory cannot be inspected.
    #[error("failed to inspect {:?}", path.display())]
    Inspect {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Store operations fail.
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

/// Friendly result alias :3
pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::fs::write;

    #[sealed_test]
    fn reconcile_fresh_path() -> anyhow::Result<()> {
        let git_dir = std::env::current_dir()?.join("nested").join("dots.git");
        let init = RepositoryInitializer::new(Git2Store::new());

        let result = init.reconcile(&git_dir, "https://blah.org/dots.git")?;
        let expect = RepositoryOutcome {
            created_dir: true,
            initialized: true,
            bound_remote: true,
        };
        assert_eq!(result, expect);

        let store = Git2Store::new();
        assert!(store.is_store(&git_dir));
        assert_eq!(store.remote_url(&git_dir, ORIGIN)?, "https://blah.org/dots.git");

        Ok(())
    }

    #[sealed_test]
    fn reconcile_twice_is_noop() -> anyhow::Result<()> {
        let git_dir = std::env::current_dir()?.join("dots.git");
        let init = RepositoryInitializer::new(Git2Store::new());

        init.reconcile(&git_dir, "https://blah.org/dots.git")?;
        let result = init.reconcile(&git_dir, "https://blah.org/dots.git")?;
        assert_eq!(result, RepositoryOutcome::default());
        assert!(!result.changed());

        Ok(())
    }

    #[sealed_test]
    fn reconcile_existing_empty_directory() -> anyhow::Result<()> {
        let git_dir = std::env::current_dir()?.join("dots.git");
        std::fs::create_dir(&git_dir)?;
        let init = RepositoryInitializer::new(Git2Store::new());

        let result = init.reconcile(&git_dir, "https://blah.org/dots.git")?;
        let expect = RepositoryOutcome {
            created_dir: false,
            initialized: true,
            bound_remote: true,
        };
        assert_eq!(result, expect);

        Ok(())
    }

    #[sealed_test]
    fn reconcile_remote_conflict_leaves_binding() -> anyhow::Result<()> {
        let git_dir = std::env::current_dir()?.join("dots.git");
        let init = RepositoryInitializer::new(Git2Store::new());
        init.reconcile(&git_dir, "https://blah.org/a.git")?;

        let result = init.reconcile(&git_dir, "https://blah.org/b.git");
        match result {
            Err(RepositoryError::RemoteConflict { current, desired }) => {
                assert_eq!(current, "https://blah.org/a.git");
                assert_eq!(desired, "https://blah.org/b.git");
            }
            other => panic!("expected remote conflict, got {other:?}"),
        }

        let store = Git2Store::new();
        assert_eq!(store.remote_url(&git_dir, ORIGIN)?, "https://blah.org/a.git");

        Ok(())
    }

    #[sealed_test]
    fn reconcile_path_conflict_on_file() -> anyhow::Result<()> {
        let git_dir = std::env::current_dir()?.join("dots.git");
        write(&git_dir, "not a directory")?;
        let init = RepositoryInitializer::new(Git2Store::new());

        let result = init.reconcile(&git_dir, "https://blah.org/dots.git");
        match result {
            Err(RepositoryError::PathConflict { path, listing }) => {
                assert_eq!(path, git_dir);
                assert!(listing.starts_with("file"));
                assert!(listing.contains("dots.git"));
            }
            other => panic!("expected path conflict, got {other:?}"),
        }

        Ok(())
    }

    #[cfg(unix)]
    #[sealed_test]
    fn reconcile_path_conflict_on_dangling_symlink() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        let git_dir = root.join("dots.git");
        std::os::unix::fs::symlink(root.join("gone"), &git_dir)?;
        let init = RepositoryInitializer::new(Git2Store::new());

        let result = init.reconcile(&git_dir, "https://blah.org/dots.git");
        match result {
            Err(RepositoryError::PathConflict { listing, .. }) => {
                assert!(listing.starts_with("symlink"));
                assert!(listing.ends_with(&format!(" -> {}", root.join("gone").display())));
            }
            other => panic!("expected path conflict, got {other:?}"),
        }

        Ok(())
    }
}
