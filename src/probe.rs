// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Capability probing.
//!
//! Check that external commands barehome relies on can be resolved through a
//! search path before any reconciliation step touches the file system. The
//! probe only reports. Deciding whether a missing command is fatal is left to
//! the caller.

use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};
use tracing::{debug, error};

/// External commands that must be resolvable for a bootstrap run.
pub const REQUIRED_CAPABILITIES: &[&str] = &["git"];

/// Resolve command names against a search path.
#[derive(Debug, Default, Clone)]
pub struct CapabilityProbe {
    search_path: Option<OsString>,
}

impl CapabilityProbe {
    /// Construct new probe over given search path.
    pub fn new(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    /// Construct new probe over current process's `PATH`.
    pub fn from_env() -> Self {
        Self {
            search_path: env::var_os("PATH"),
        }
    }

    /// Resolve command name to an executable path.
    ///
    /// Names containing a path separator are checked as-is instead of being
    /// searched for.
    pub fn resolve(&self, name: impl AsRef<Path>) -> Option<PathBuf> {
        let name = name.as_ref();
        if name.components().count() > 1 {
            return is_executable(name).then(|| name.to_path_buf());
        }

        let search_path = self.search_path.as_ref()?;
        env::split_paths(search_path)
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    }

    /// List command names that cannot be resolved.
    ///
    /// Logs one error per missing command.
    pub fn missing<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut missing = Vec::new();
        for name in names {
            match self.resolve(name) {
                Some(path) => debug!("found {name} at {:?}", path.display()),
                None => {
                    error!("required command {name:?} not found");
                    missing.push(name.to_string());
                }
            }
        }

        missing
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
