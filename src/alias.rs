// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Shell alias installation.
//!
//! Working with a bare repository means passing `--git-dir` and `--work-tree`
//! to every Git call. Barehome appends an alias that does this to each shell
//! startup file that already exists. Startup files are never created.
//!
//! # Limitations
//!
//! An existing alias is detected by its `alias <name>=` prefix alone. An alias
//! that points at some older git directory is left as-is, because the user may
//! have customized that line on purpose.

use std::{
    fs::{read, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

/// Shell alias binding a short command to the bare repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    name: String,
    git_dir: PathBuf,
    work_tree: PathBuf,
}

impl Alias {
    /// Construct new alias.
    pub fn new(
        name: impl Into<String>,
        git_dir: impl Into<PathBuf>,
        work_tree: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            git_dir: git_dir.into(),
            work_tree: work_tree.into(),
        }
    }

    /// Fixed prefix every declaration of this alias starts with.
    pub fn prefix(&self) -> String {
        format!("alias {}=", self.name)
    }

    /// Fully rendered alias declaration.
    pub fn render(&self) -> String {
        format!(
            "{}'git --git-dir={} --work-tree={}'",
            self.prefix(),
            shell_quote(&self.git_dir),
            shell_quote(&self.work_tree)
        )
    }

    /// Check if content already declares this alias.
    ///
    /// Works on raw bytes, startup files are not required to be UTF-8.
    /// Leading whitespace is ignored.
    pub fn is_declared_in(&self, content: &[u8]) -> bool {
        let prefix = self.prefix();
        content
            .split(|byte| *byte == b'\n')
            .any(|line| line.trim_ascii_start().starts_with(prefix.as_bytes()))
    }
}

// Paths end up inside a single-quoted alias body, so use double quotes when needed.
fn shell_quote(path: &Path) -> String {
    let path = path.to_string_lossy();
    let is_safe = |c: char| {
        c.is_ascii_alphanumeric()
            || matches!(c, '/' | '.' | '_' | '+' | '-' | '=' | ':' | ',' | '@' | '%')
    };

    if path.is_empty() || !path.chars().all(is_safe) {
        let escaped = path
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$")
            .replace('`', "\\`")
            .replace('\'', "'\\''");
        format!("\"{escaped}\"")
    } else {
        path.into_owned()
    }
}

/// What happened to each startup file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AliasReport {
    /// Startup files that received the alias.
    pub installed: Vec<PathBuf>,

    /// Startup files that already declared the alias.
    pub present: Vec<PathBuf>,

    /// Startup files that do not exist.
    pub skipped: Vec<PathBuf>,
}

/// Install alias into shell startup files.
#[derive(Debug, Clone)]
pub struct AliasInstaller {
    alias: Alias,
}

impl AliasInstaller {
    /// Construct new alias installer.
    pub fn new(alias: Alias) -> Self {
        Self { alias }
    }

    /// Alias this installer writes.
    pub fn alias(&self) -> &Alias {
        &self.alias
    }

    /// Append alias to each existing startup file lacking it.
    ///
    /// # Errors
    ///
    /// - Return [`AliasError::ReadStartupFile`] if startup file exists but
    ///   cannot be read.
    /// - Return [`AliasError::WriteStartupFile`] if alias cannot be appended.
    #[instrument(skip(self, startup_files), level = "debug")]
    pub fn reconcile(
        &self,
        startup_files: impl IntoIterator<Item = impl AsRef<Path>>,
    ) -> Result<AliasReport> {
        let mut report = AliasReport::default();
        for startup_file in startup_files {
            let startup_file = startup_file.as_ref();
            let content = match read(startup_file) {
                Ok(content) => content,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    info!("skip missing startup file {:?}", startup_file.display());
                    report.skipped.push(startup_file.to_path_buf());
                    continue;
                }
                Err(err) => {
                    return Err(AliasError::ReadStartupFile {
                        source: err,
                        path: startup_file.to_path_buf(),
                    })
                }
            };

            if self.alias.is_declared_in(&content) {
                info!("alias already declared in {:?}", startup_file.display());
                report.present.push(startup_file.to_path_buf());
                continue;
            }

            // INVARIANT: Keep the alias on its own line.
            let mut addition = String::new();
            if !content.is_empty() && !content.ends_with(b"\n") {
                addition.push('\n');
            }
            addition.push_str(&self.alias.render());
            addition.push('\n');

            OpenOptions::new()
                .append(true)
                .open(startup_file)
                .and_then(|mut file| file.write_all(addition.as_bytes()))
                .map_err(|err| AliasError::WriteStartupFile {
                    source: err,
                    path: startup_file.to_path_buf(),
                })?;

            info!("append alias to {:?}", startup_file.display());
            report.installed.push(startup_file.to_path_buf());
        }

        Ok(report)
    }
}

/// Alias installation error types.
#[derive(Debug, thiserror::Error)]
pub enum AliasError {
    /// Startup file cannot be read from.
    #[error("failed to read from startup file at {:?}", path.display())]
    ReadStartupFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Startup file cannot be written to.
    #[error("failed to write to startup file at {:?}", path.display())]
    WriteStartupFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = AliasError> = std::result::Result<T, E>;
