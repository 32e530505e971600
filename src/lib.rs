// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Bootstrap a bare repository for the home directory.
//!
//! Barehome sets up the __bare-alias technique__ for dotfile management: a bare
//! Git repository whose working tree is the user's home directory. It creates
//! the repository, binds it to a remote, installs an ignore-everything policy,
//! and appends a shell alias that wires the two together. Every step is
//! idempotent, so re-running barehome is always safe.
//!
//! # See Also
//!
//! 1. [ArchWiki - dotfiles](https://wiki.archlinux.org/title/Dotfiles#Tracking_dotfiles_directly_with_Git)

pub mod alias;
pub mod bootstrap;
pub mod config;
pub mod path;
pub mod policy;
pub mod probe;
pub mod repository;
pub mod store;

pub use bootstrap::{Bootstrap, BootstrapError, BootstrapReport};
pub use config::{ConfigLayer, Settings};
