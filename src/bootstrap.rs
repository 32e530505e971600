// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Bootstrap orchestration.
//!
//! Run every reconciliation step in a fixed order against one set of resolved
//! [`Settings`]:
//!
//! 1. Probe for required external commands.
//! 2. Settle on a remote URL, prompting when none was supplied.
//! 3. Reconcile the bare repository and its origin remote.
//! 4. Reconcile the exclusion policy.
//! 5. Install the shell alias.
//!
//! The first failure aborts the run. Steps share no state besides the file
//! system and the store itself, which each step queries fresh. Re-running after
//! a failure picks up wherever the previous run stopped.

use crate::{
    alias::{Alias, AliasInstaller, AliasReport},
    config::Settings,
    policy::{ExclusionPolicy, PolicyFileOutcome},
    probe::{CapabilityProbe, REQUIRED_CAPABILITIES},
    repository::{RepositoryError, RepositoryInitializer, RepositoryOutcome},
    store::{Git2Store, StoreAccess},
};

use std::path::PathBuf;
use tracing::{info, instrument};

/// Summary of a bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Remote URL the store is bound to.
    pub remote: String,

    /// Outcome of repository reconciliation.
    pub repository: RepositoryOutcome,

    /// Outcome of policy file reconciliation.
    pub policy: PolicyFileOutcome,

    /// Outcome of alias installation.
    pub alias: AliasReport,
}

impl BootstrapReport {
    /// Check if run mutated anything that a previous run had not already done.
    ///
    /// Store configuration and index updates are not counted, because they
    /// are rewritten with identical values on every run.
    pub fn changed(&self) -> bool {
        self.repository.changed()
            || self.policy != PolicyFileOutcome::Unchanged
            || !self.alias.installed.is_empty()
    }
}

/// Bootstrap a bare repository for the home directory.
#[derive(Debug, Clone)]
pub struct Bootstrap<S = Git2Store>
where
    S: StoreAccess + Clone,
{
    settings: Settings,
    store: S,
}

impl Bootstrap<Git2Store> {
    /// Construct new bootstrap using libgit2 store access.
    pub fn new(settings: Settings) -> Self {
        Self::with_store(settings, Git2Store::new())
    }
}

impl<S> Bootstrap<S>
where
    S: StoreAccess + Clone,
{
    /// Construct new bootstrap with given store access.
    pub fn with_store(settings: Settings, store: S) -> Self {
        Self { settings, store }
    }

    /// Settings this bootstrap runs with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run full bootstrap.
    ///
    /// The prompt is only consulted when settings carry no remote URL.
    ///
    /// # Errors
    ///
    /// - Return [`BootstrapError::MissingCapability`] if required commands
    ///   cannot be found.
    /// - Return [`BootstrapError::MissingRemote`] if no remote URL could be
    ///   obtained.
    /// - Return [`BootstrapError::PathConflict`] if git directory is not a
    ///   directory.
    /// - Return [`BootstrapError::RemoteConflict`] if origin is bound to a
    ///   different URL.
    /// - Return other [`BootstrapError`] variants if a reconciliation step
    ///   fails to write.
    #[instrument(skip(self, probe, prompt), level = "debug")]
    pub fn run<P>(&self, probe: &CapabilityProbe, prompt: P) -> Result<BootstrapReport>
    where
        P: FnOnce() -> Option<String>,
    {
        self.check_capabilities(probe)?;
        let remote = self.resolve_remote(prompt)?;
        self.reconcile(remote)
    }

    /// Fail if any required command is missing.
    ///
    /// # Errors
    ///
    /// - Return [`BootstrapError::MissingCapability`] listing every missing
    ///   command.
    pub fn check_capabilities(&self, probe: &CapabilityProbe) -> Result<()> {
        let missing = probe.missing(REQUIRED_CAPABILITIES.iter().copied());
        if !missing.is_empty() {
            return Err(BootstrapError::MissingCapability { names: missing });
        }

        Ok(())
    }

    /// Settle on remote URL from settings, falling back to prompt.
    ///
    /// # Errors
    ///
    /// - Return [`BootstrapError::MissingRemote`] if prompt yields nothing
    ///   or only whitespace.
    pub fn resolve_remote<P>(&self, prompt: P) -> Result<String>
    where
        P: FnOnce() -> Option<String>,
    {
        let remote = match &self.settings.remote {
            Some(remote) => Some(remote.clone()),
            None => prompt(),
        };

        remote
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or(BootstrapError::MissingRemote)
    }

    /// Run reconciliation steps against known remote URL.
    ///
    /// # Errors
    ///
    /// - Return [`BootstrapError`] from the first step that fails.
    pub fn reconcile(&self, remote: String) -> Result<BootstrapReport> {
        let settings = &self.settings;

        let repository = RepositoryInitializer::new(self.store.clone())
            .reconcile(&settings.git_dir, &remote)?;

        let policy = ExclusionPolicy::new(
            &settings.git_dir,
            &settings.dotfiles_dir,
            &settings.home,
            self.store.clone(),
        )
        .reconcile()?;

        let alias = AliasInstaller::new(self.alias()).reconcile(&settings.startup_files)?;

        info!("bootstrap of {:?} complete", settings.git_dir.display());
        Ok(BootstrapReport {
            remote,
            repository,
            policy,
            alias,
        })
    }

    /// Alias matching current settings.
    pub fn alias(&self) -> Alias {
        Alias::new(
            &self.settings.alias_name,
            &self.settings.git_dir,
            &self.settings.home,
        )
    }
}

/// Bootstrap error types.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Required external commands cannot be found.
    #[error("missing required commands: {}", names.join(", "))]
    MissingCapability { names: Vec<String> },

    /// Git directory path is taken by something other than a directory.
    #[error("{:?} exists but is not a directory:\n{listing}", path.display())]
    PathConflict { path: PathBuf, listing: String },

    /// Origin remote is bound to a different URL.
    #[error("remote origin is already set to {current:?}, refusing to change it to {desired:?}")]
    RemoteConflict { current: String, desired: String },

    /// No remote URL was supplied.
    #[error("a remote URL is required, pass one with --git-remote")]
    MissingRemote,

    /// Repository reconciliation fails.
    #[error(transparent)]
    Repository(RepositoryError),

    /// Exclusion policy reconciliation fails.
    #[error(transparent)]
    Policy(#[from] crate::policy::PolicyError),

    /// Alias installation fails.
    #[error(transparent)]
    Alias(#[from] crate::alias::AliasError),
}

impl From<RepositoryError> for BootstrapError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::PathConflict { path, listing } => Self::PathConflict { path, listing },
            RepositoryError::RemoteConflict { current, desired } => {
                Self::RemoteConflict { current, desired }
            }
            other => Self::Repository(other),
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = BootstrapError> = std::result::Result<T, E>;
