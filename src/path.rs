// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine default locations for the bare repository, the exclusion policy
//! directory, and the optional configuration file. None of these functions
//! check that the returned path actually exists.

use std::path::{Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Default git directory of the bare repository: `$HOME/.dotfiles`.
pub fn default_git_dir(home: impl AsRef<Path>) -> PathBuf {
    home.as_ref().join(".dotfiles")
}

/// Default directory holding the exclusion policy file:
/// `$HOME/.config/dotfiles`.
pub fn default_dotfiles_dir(home: impl AsRef<Path>) -> PathBuf {
    home.as_ref().join(".config").join("dotfiles")
}

/// Default shell startup files that receive the alias.
pub fn default_startup_files(home: impl AsRef<Path>) -> Vec<PathBuf> {
    vec![home.as_ref().join(".bashrc"), home.as_ref().join(".zshrc")]
}

/// Determine default absolute path to configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/barehome/config.toml`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("barehome").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Anchor a path to the home directory unless it is already absolute.
pub fn anchor_to_home(home: impl AsRef<Path>, path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    if path.is_absolute() {
        path
    } else {
        home.as_ref().join(path)
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_live_under_home() {
        let home = Path::new("/home/blah");
        assert_eq!(default_git_dir(home), PathBuf::from("/home/blah/.dotfiles"));
        assert_eq!(
            default_dotfiles_dir(home),
            PathBuf::from("/home/blah/.config/dotfiles")
        );
        assert_eq!(
            default_startup_files(home),
            vec![
                PathBuf::from("/home/blah/.bashrc"),
                PathBuf::from("/home/blah/.zshrc"),
            ]
        );
    }

    #[test]
    fn anchor_relative_paths_only() {
        let home = Path::new("/home/blah");
        assert_eq!(
            anchor_to_home(home, "dots.git"),
            PathBuf::from("/home/blah/dots.git")
        );
        assert_eq!(anchor_to_home(home, "/srv/dots.git"), PathBuf::from("/srv/dots.git"));
    }
}
