// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use barehome::{
    config::expand_path,
    path::{default_config_file, home_dir},
    probe::CapabilityProbe,
    Bootstrap, BootstrapReport, ConfigLayer, Settings,
};

use anyhow::Result;
use clap::Parser;
use inquire::Text;
use std::{env, ffi::OsStr, path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "barehome [options]",
    version
)]
struct Cli {
    /// URL of remote to bind as origin.
    #[arg(long, value_name = "url")]
    pub git_remote: Option<String>,

    /// Path to git directory of bare repository.
    #[arg(long, value_name = "path")]
    pub git_dir: Option<PathBuf>,

    /// Path to directory holding exclusion policy file.
    #[arg(long, value_name = "path")]
    pub dotfiles_dir: Option<PathBuf>,
}

impl Cli {
    fn run(self) -> Result<()> {
        let home = home_dir()?;
        let mut settings = Settings::new(&home);
        if let Some(layer) = ConfigLayer::load(default_config_file()?)? {
            settings = settings.layer(layer);
        }
        settings = settings.layer(self.into_layer()?);

        let bootstrap = Bootstrap::new(settings);
        let report = bootstrap.run(&CapabilityProbe::from_env(), prompt_remote)?;
        report_done(&report, env::var_os("SHELL").map(PathBuf::from));

        Ok(())
    }

    fn into_layer(self) -> Result<ConfigLayer> {
        Ok(ConfigLayer {
            git_dir: self.git_dir.map(expand_path).transpose()?,
            dotfiles_dir: self.dotfiles_dir.map(expand_path).transpose()?,
            remote: self.git_remote,
            ..Default::default()
        })
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_ansi(use_color(env::var_os("NO_COLOR").as_deref()));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

// NO_COLOR only counts when set to a non-empty value.
fn use_color(no_color: Option<&OsStr>) -> bool {
    no_color.is_none_or(OsStr::is_empty)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn prompt_remote() -> Option<String> {
    Text::new("remote URL:")
        .with_help_message("where your dotfiles will be pushed to and pulled from")
        .prompt()
        .map_err(|err| warn!("cannot prompt for remote URL: {err}"))
        .ok()
}

fn report_done(report: &BootstrapReport, shell: Option<PathBuf>) {
    if !report.changed() {
        info!("nothing to do, everything is already in place");
    }

    if report.alias.installed.is_empty() {
        info!("done");
        return;
    }

    let shell = shell
        .as_deref()
        .and_then(|shell| shell.file_name())
        .map(|name| name.to_string_lossy().into_owned());
    let startup_file = match shell.as_deref() {
        Some("zsh") => Some("~/.zshrc"),
        Some("bash") => Some("~/.bashrc"),
        _ => None,
    };

    match startup_file {
        Some(startup_file) => info!("done, run `source {startup_file}` to pick up the alias"),
        None => info!("done, restart your shell to pick up the alias"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{error::ErrorKind, CommandFactory};
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_accepts_both_flag_forms() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "barehome",
            "--git-remote=https://blah.org/dots.git",
            "--git-dir",
            "/home/blah/.dots.git",
        ])?;
        assert_eq!(cli.git_remote.as_deref(), Some("https://blah.org/dots.git"));
        assert_eq!(cli.git_dir, Some(PathBuf::from("/home/blah/.dots.git")));
        assert_eq!(cli.dotfiles_dir, None);

        Ok(())
    }

    #[test]
    fn cli_rejects_unknown_flags() {
        let result = Cli::try_parse_from(["barehome", "--frobnicate"]);
        let error = result.expect_err("unknown flag must be rejected");
        assert_eq!(error.kind(), ErrorKind::UnknownArgument);
        assert_ne!(error.exit_code(), 0);
    }

    #[test]
    fn empty_no_color_keeps_color() {
        assert!(use_color(None));
        assert!(use_color(Some(OsStr::new(""))));
        assert!(!use_color(Some(OsStr::new("1"))));
        assert!(!use_color(Some(OsStr::new("false"))));
    }

    #[test]
    fn cli_help_exits_cleanly() {
        for flag in ["-h", "--help"] {
            let error = Cli::try_parse_from(["barehome", flag]).expect_err("help short-circuits");
            assert_eq!(error.kind(), ErrorKind::DisplayHelp);
            assert_eq!(error.exit_code(), 0);
        }
    }
}
