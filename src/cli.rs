//! CLI argument definitions for `blobfetch`.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

use crate::config::FetchConfig;
use crate::error::{CommandError, Result};
use crate::fetcher::RetryPolicy;

/// Environment variable consulted when `--sas-url` is absent.
pub const SAS_URL_ENV: &str = "BLOBFETCH_SAS_URL";

/// Download versioned release artefacts from a pre-signed blob container.
#[derive(Parser, Debug)]
#[command(name = "blobfetch")]
#[command(version, about)]
#[command(long_about = concat!(
    "Download versioned release artefacts from a pre-signed blob container.\n\n",
    "The container publishes an index.json at its root listing every version and ",
    "the per-platform archives it ships. blobfetch resolves a version and platform ",
    "against that index and downloads the matching archive, retrying transient ",
    "failures. Files already on disk are never downloaded again.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Download the linux-x64 archive of a release:\n",
    "    $ blobfetch download --sas-url \"$URL\" --version v1.4.0\n\n",
    "  Download every archive of a release:\n",
    "    $ blobfetch download-all --version 1.4.0\n\n",
    "  List versions not yet released:\n",
    "    $ blobfetch versions --released v1.3.0 --released v1.4.0\n\n",
    "  Unpack the downloaded archive:\n",
    "    $ blobfetch extract --platform linux-x64\n\n",
    "The access URL may also be supplied through BLOBFETCH_SAS_URL.",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file [default: ./blobfetch.toml when present].
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Log level selected by `-q` and `-v`.
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download the archive of one version for one platform.
    Download(DownloadArgs),

    /// Download every archive published under one version.
    DownloadAll(DownloadAllArgs),

    /// List versions in the index.
    Versions(VersionsArgs),

    /// Unpack the downloaded platform archive.
    Extract(ExtractArgs),
}

/// The pre-signed container URL.
#[derive(Args, Debug, Clone, Default)]
pub struct AccessArgs {
    /// Pre-signed container URL.
    #[arg(long, env = SAS_URL_ENV, hide_env_values = true, value_name = "URL")]
    pub sas_url: Option<String>,
}

impl AccessArgs {
    /// The access URL, if one was given.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MissingAccessUrl`] when neither the flag nor
    /// the environment variable is set.
    pub fn require(&self) -> Result<&str> {
        self.sas_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(CommandError::MissingAccessUrl)
    }
}

/// Overrides for the `[retry]` configuration table.
#[derive(Args, Debug, Clone, Default)]
pub struct RetryArgs {
    /// Transfer attempts per artefact.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Delay between attempts in milliseconds.
    #[arg(long, value_name = "MS")]
    pub retry_delay_ms: Option<u64>,
}

impl RetryArgs {
    /// Retry policy from `config` with these overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Config`] when the resulting attempt ceiling
    /// is zero.
    pub fn policy(&self, config: &FetchConfig) -> Result<RetryPolicy> {
        let mut config = config.clone();
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(delay) = self.retry_delay_ms {
            config.retry.retry_delay_ms = delay;
        }
        Ok(config.retry_policy()?)
    }
}

/// Arguments for the download command.
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Access URL.
    #[command(flatten)]
    pub access: AccessArgs,

    /// Version to download, with or without a leading `v`.
    #[arg(long, value_name = "VERSION")]
    pub version: String,

    /// Platform token [default: from configuration, else linux-x64].
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Output root; archives land in `<DIR>/download`.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Retry overrides.
    #[command(flatten)]
    pub retry: RetryArgs,
}

/// Arguments for the download-all command.
#[derive(Args, Debug, Clone)]
pub struct DownloadAllArgs {
    /// Access URL.
    #[command(flatten)]
    pub access: AccessArgs,

    /// Version to download, with or without a leading `v`.
    #[arg(long, value_name = "VERSION")]
    pub version: String,

    /// Output root; archives land in `<DIR>/download`.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Retry overrides.
    #[command(flatten)]
    pub retry: RetryArgs,
}

/// Arguments for the versions command.
#[derive(Args, Debug, Clone)]
pub struct VersionsArgs {
    /// Access URL.
    #[command(flatten)]
    pub access: AccessArgs,

    /// A release tag that already exists (repeatable). When given, only
    /// versions without a matching tag are listed.
    #[arg(long = "released", value_name = "TAG")]
    pub released: Vec<String>,
}

/// Arguments for the extract command.
#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Platform token [default: from configuration, else linux-x64].
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Output root; reads `<DIR>/download`, writes `<DIR>/extracted`.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
