// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{HomeFixture, RepoFixture};

use anyhow::Result;
use barehome::{
    policy::{PolicyFileOutcome, EXCLUDES_FILE_KEY, SHOW_UNTRACKED_KEY},
    probe::CapabilityProbe,
    repository::{RepositoryOutcome, ORIGIN},
    store::{Git2Store, StoreAccess},
    Bootstrap, BootstrapError,
};
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::fs::{read_to_string, write};

const REMOTE: &str = "https://example.com/dots.git";

fn no_prompt() -> Option<String> {
    panic!("remote was supplied, prompt must not be consulted")
}

#[sealed_test]
fn fresh_machine() -> Result<()> {
    let home = HomeFixture::new()?;
    let bashrc = home.write(".bashrc", "export EDITOR=vim\n")?;
    let mut settings = home.settings();
    settings.remote = Some(REMOTE.into());
    let git_dir = settings.git_dir.clone();
    let excludes_file = settings.dotfiles_dir.join(".gitignore");

    let report = Bootstrap::new(settings).run(&CapabilityProbe::from_env(), no_prompt)?;
    assert_eq!(report.remote, REMOTE);
    assert_eq!(
        report.repository,
        RepositoryOutcome {
            created_dir: true,
            initialized: true,
            bound_remote: true,
        }
    );
    assert_eq!(report.policy, PolicyFileOutcome::Created);
    assert_eq!(report.alias.installed, vec![bashrc]);
    assert_eq!(report.alias.skipped, vec![home.path().join(".zshrc")]);

    let store = Git2Store::new();
    assert!(store.is_store(&git_dir));
    assert_eq!(store.remote_url(&git_dir, ORIGIN)?, REMOTE);
    assert_eq!(read_to_string(&excludes_file)?, "*\n");
    assert_eq!(
        store.config_value(&git_dir, EXCLUDES_FILE_KEY)?,
        Some(excludes_file.to_string_lossy().into_owned())
    );
    assert_eq!(
        store.config_value(&git_dir, SHOW_UNTRACKED_KEY)?,
        Some("no".into())
    );
    assert!(store.is_tracked(&git_dir, home.path(), &excludes_file)?);

    let expect = format!(
        "export EDITOR=vim\nalias dotfiles='git --git-dir={} --work-tree={}'\n",
        git_dir.display(),
        home.path().display()
    );
    assert_eq!(home.read(".bashrc")?, expect);
    assert!(!home.path().join(".zshrc").exists());

    Ok(())
}

#[sealed_test]
fn second_run_changes_nothing() -> Result<()> {
    let home = HomeFixture::new()?;
    home.write(".bashrc", "")?;
    home.write(".zshrc", "")?;
    let settings = home.settings();
    let git_dir = settings.git_dir.clone();
    let bootstrap = Bootstrap::new(settings);

    let first = bootstrap.reconcile(REMOTE.into())?;
    assert!(first.changed());
    let bashrc = home.read(".bashrc")?;
    let zshrc = home.read(".zshrc")?;
    let policy = home.read(".config/dotfiles/.gitignore")?;
    let config = read_to_string(git_dir.join("config"))?;

    let second = bootstrap.reconcile(REMOTE.into())?;
    assert!(!second.changed());
    assert_eq!(second.repository, RepositoryOutcome::default());
    assert_eq!(second.policy, PolicyFileOutcome::Unchanged);
    assert_eq!(second.alias.present.len(), 2);
    assert_eq!(home.read(".bashrc")?, bashrc);
    assert_eq!(home.read(".zshrc")?, zshrc);
    assert_eq!(home.read(".config/dotfiles/.gitignore")?, policy);
    assert_eq!(read_to_string(git_dir.join("config"))?, config);

    Ok(())
}

#[sealed_test]
fn remote_conflict_aborts_before_policy() -> Result<()> {
    let home = HomeFixture::new()?;
    let settings = home.settings();
    let repo = RepoFixture::new(&settings.git_dir)?.with_origin("https://example.com/a.git")?;

    let result = Bootstrap::new(settings.clone()).reconcile("https://example.com/b.git".into());
    match result {
        Err(BootstrapError::RemoteConflict { current, desired }) => {
            assert_eq!(current, "https://example.com/a.git");
            assert_eq!(desired, "https://example.com/b.git");
        }
        other => panic!("expected remote conflict, got {other:?}"),
    }

    assert_eq!(repo.origin()?, Some("https://example.com/a.git".into()));
    assert!(!settings.dotfiles_dir.join(".gitignore").exists());

    Ok(())
}

#[sealed_test]
fn existing_store_with_matching_remote_is_adopted() -> Result<()> {
    let home = HomeFixture::new()?;
    let settings = home.settings();
    let repo = RepoFixture::new(&settings.git_dir)?.with_origin(REMOTE)?;

    let report = Bootstrap::new(settings).reconcile(REMOTE.into())?;
    assert_eq!(report.repository, RepositoryOutcome::default());
    assert_eq!(repo.origin()?, Some(REMOTE.into()));

    Ok(())
}

#[sealed_test]
fn path_conflict_aborts_run() -> Result<()> {
    let home = HomeFixture::new()?;
    let settings = home.settings();
    write(&settings.git_dir, "oops")?;

    let result = Bootstrap::new(settings.clone()).reconcile(REMOTE.into());
    match result {
        Err(BootstrapError::PathConflict { path, listing }) => {
            assert_eq!(path, settings.git_dir);
            assert!(listing.contains(".dotfiles"));
        }
        other => panic!("expected path conflict, got {other:?}"),
    }

    assert_eq!(read_to_string(&settings.git_dir)?, "oops");
    assert!(!settings.dotfiles_dir.exists());

    Ok(())
}

#[sealed_test]
fn existing_policy_rules_are_kept() -> Result<()> {
    let home = HomeFixture::new()?;
    home.write(".config/dotfiles/.gitignore", "foo\nbar\n")?;

    let report = Bootstrap::new(home.settings()).reconcile(REMOTE.into())?;
    assert_eq!(report.policy, PolicyFileOutcome::Appended);
    assert_eq!(home.read(".config/dotfiles/.gitignore")?, "foo\nbar\n*\n");

    Ok(())
}

#[sealed_test]
fn missing_remote_is_fatal() -> Result<()> {
    let home = HomeFixture::new()?;
    let settings = home.settings();

    let result = Bootstrap::new(settings.clone()).run(&CapabilityProbe::from_env(), || None);
    assert!(matches!(result, Err(BootstrapError::MissingRemote)));
    assert!(!settings.git_dir.exists());

    Ok(())
}
