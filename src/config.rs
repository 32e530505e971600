// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Barehome resolves its settings in layers. Built-in defaults come first,
//! then the optional configuration file at
//! `$XDG_CONFIG_HOME/barehome/config.toml`, then command-line flags. Each layer
//! is a [`ConfigLayer`], and the final product is a [`Settings`] value that is
//! handed to every reconciliation step. Nothing reads the environment after
//! [`Settings`] has been built.

use crate::path::{
    anchor_to_home, default_dotfiles_dir, default_git_dir, default_startup_files,
};

use serde::Deserialize;
use std::{
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Default name of the shell alias.
pub const DEFAULT_ALIAS_NAME: &str = "dotfiles";

/// One layer of optional configuration values.
///
/// The configuration file deserializes straight into this type. Command-line
/// flags are collected into one as well, so every source merges the same way.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct ConfigLayer {
    /// Git directory of the bare repository.
    pub git_dir: Option<PathBuf>,

    /// Directory holding the exclusion policy file.
    pub dotfiles_dir: Option<PathBuf>,

    /// URL to bind as the "origin" remote.
    pub remote: Option<String>,

    /// Name of shell alias to install.
    pub alias_name: Option<String>,

    /// Shell startup files to append the alias to.
    pub startup_files: Option<Vec<PathBuf>>,
}

impl ConfigLayer {
    /// Load configuration layer from file.
    ///
    /// A missing file is not an error, it simply yields no layer.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file contents are malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let data = match read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no configuration file at {:?}", path.display());
                return Ok(None);
            }
            Err(err) => {
                return Err(ConfigError::Read {
                    source: err,
                    path: path.to_path_buf(),
                })
            }
        };

        debug!("load configuration file {:?}", path.display());
        Ok(Some(data.parse()?))
    }
}

impl FromStr for ConfigLayer {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut layer: ConfigLayer = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        layer.git_dir = layer.git_dir.map(expand_path).transpose()?;
        layer.dotfiles_dir = layer.dotfiles_dir.map(expand_path).transpose()?;
        layer.startup_files = layer
            .startup_files
            .map(|files| files.into_iter().map(expand_path).collect::<Result<Vec<_>>>())
            .transpose()?;

        Ok(layer)
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Settings {
    /// Home directory, used as working tree of the bare repository.
    pub home: PathBuf,

    /// Git directory of the bare repository.
    pub git_dir: PathBuf,

    /// Directory holding the exclusion policy file.
    pub dotfiles_dir: PathBuf,

    /// Remote URL to bind as "origin", if already known.
    pub remote: Option<String>,

    /// Name of shell alias to install.
    pub alias_name: String,

    /// Shell startup files to append the alias to.
    pub startup_files: Vec<PathBuf>,
}

impl Settings {
    /// Construct settings from built-in defaults rooted at home directory.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            git_dir: default_git_dir(&home),
            dotfiles_dir: default_dotfiles_dir(&home),
            remote: None,
            alias_name: DEFAULT_ALIAS_NAME.into(),
            startup_files: default_startup_files(&home),
            home,
        }
    }

    /// Merge configuration layer on top of current settings.
    ///
    /// Fields present in the layer win. Relative paths are anchored to the
    /// home directory. Blank remote URLs and alias names count as absent.
    pub fn layer(mut self, layer: ConfigLayer) -> Self {
        if let Some(git_dir) = layer.git_dir {
            self.git_dir = anchor_to_home(&self.home, git_dir);
        }

        if let Some(dotfiles_dir) = layer.dotfiles_dir {
            self.dotfiles_dir = anchor_to_home(&self.home, dotfiles_dir);
        }

        if let Some(remote) = layer.remote.filter(|url| !url.trim().is_empty()) {
            self.remote = Some(remote);
        }

        if let Some(alias_name) = layer.alias_name.filter(|name| !name.trim().is_empty()) {
            self.alias_name = alias_name;
        }

        if let Some(files) = layer.startup_files {
            self.startup_files = files
                .into_iter()
                .map(|file| anchor_to_home(&self.home, file))
                .collect();
        }

        self
    }
}

/// Perform shell expansion on a path.
///
/// Expands `~` and environment variables.
///
/// # Errors
///
/// - Return [`ConfigError::ShellExpansion`] if a referenced variable is unset.
pub fn expand_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref().to_string_lossy();
    Ok(PathBuf::from(shellexpand::full(path.as_ref())?.into_owned()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

/// Friendly result alias :3
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
