//! `blobfetch` CLI entrypoint.
//!
//! Loads configuration, installs the logger and dispatches to the
//! download, listing and extraction commands. Results go to stdout;
//! diagnostics go through the logger to stderr.

use std::io::Write;

use blobfetch::capability::{self, AccessCapability};
use blobfetch::cli::{Cli, Command, DownloadAllArgs, DownloadArgs, ExtractArgs, VersionsArgs};
use blobfetch::config::FetchConfig;
use blobfetch::error::{CommandError, Result};
use blobfetch::extract::{ZipExtractor, extract_platform_archive};
use blobfetch::reporter::{LogReporter, Reporter};
use blobfetch::resolver::fetch_index;
use blobfetch::store::{BlobStore, HttpBlobStore};
use blobfetch::versions::{list_versions, unreleased_versions};
use blobfetch::workflow::{BatchRequest, DownloadRequest, download_all_packages, download_package};
use camino::Utf8PathBuf;
use clap::Parser;

/// Collaborators shared by every command.
struct RunContext<'a> {
    config: &'a FetchConfig,
    store: &'a dyn BlobStore,
    reporter: &'a dyn Reporter,
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_default_env()
        .filter_level(cli.log_level())
        .format_target(false)
        .init();

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<()> {
    let config = FetchConfig::load(cli.config.as_deref())?;
    let store = HttpBlobStore::new(config.http.timeout());
    let context = RunContext {
        config: &config,
        store: &store,
        reporter: &LogReporter,
    };
    dispatch(&cli.command, &context, stdout)
}

fn dispatch(command: &Command, context: &RunContext<'_>, stdout: &mut dyn Write) -> Result<()> {
    match command {
        Command::Download(args) => run_download(args, context, stdout),
        Command::DownloadAll(args) => run_download_all(args, context, stdout),
        Command::Versions(args) => run_versions(args, context, stdout),
        Command::Extract(args) => run_extract(args, context.config, stdout),
    }
}

fn run_download(args: &DownloadArgs, context: &RunContext<'_>, stdout: &mut dyn Write) -> Result<()> {
    let policy = args.retry.policy(context.config)?;
    let download_dir = output_root(args.output_dir.as_ref(), context.config).join("download");
    let request = DownloadRequest {
        sas_url: args.access.require()?,
        version: &args.version,
        platform: args.platform.as_deref().unwrap_or(&context.config.platform),
        destination_dir: &download_dir,
    };

    let outcome = download_package(context.store, context.reporter, policy, &request)?;
    match (outcome.success, outcome.package_path) {
        (true, Some(path)) => write_stdout_line(stdout, path),
        _ => Err(CommandError::DownloadFailed {
            message: outcome.error.unwrap_or_default(),
        }),
    }
}

fn run_download_all(
    args: &DownloadAllArgs,
    context: &RunContext<'_>,
    stdout: &mut dyn Write,
) -> Result<()> {
    let policy = args.retry.policy(context.config)?;
    let download_dir = output_root(args.output_dir.as_ref(), context.config).join("download");
    let request = BatchRequest {
        sas_url: args.access.require()?,
        version: &args.version,
        destination_dir: &download_dir,
    };

    let outcome = download_all_packages(context.store, context.reporter, policy, &request)?;
    for path in &outcome.package_paths {
        write_stdout_line(stdout, path)?;
    }
    if outcome.success {
        Ok(())
    } else {
        Err(CommandError::DownloadFailed {
            message: outcome.error.unwrap_or_default(),
        })
    }
}

fn run_versions(args: &VersionsArgs, context: &RunContext<'_>, stdout: &mut dyn Write) -> Result<()> {
    let sas_url = args.access.require()?;
    if !capability::validate(sas_url, context.reporter) {
        return Err(CommandError::InvalidAccessUrl);
    }
    let capability =
        AccessCapability::parse(sas_url).map_err(|_| CommandError::InvalidAccessUrl)?;
    let index = fetch_index(context.store, &capability, context.reporter)
        .ok_or(CommandError::IndexUnavailable)?;

    let versions: Vec<String> = if args.released.is_empty() {
        list_versions(&index).into_iter().map(str::to_owned).collect()
    } else {
        unreleased_versions(&index, &args.released)
    };
    for version in versions {
        write_stdout_line(stdout, version)?;
    }
    Ok(())
}

fn run_extract(args: &ExtractArgs, config: &FetchConfig, stdout: &mut dyn Write) -> Result<()> {
    let root = output_root(args.output_dir.as_ref(), config);
    let platform = args.platform.as_deref().unwrap_or(&config.platform);
    let extracted = extract_platform_archive(
        &ZipExtractor,
        &root.join("download"),
        &root.join("extracted"),
        platform,
    )?;
    log::info!(
        "extracted {} files from {} to {}",
        extracted.files.len(),
        extracted.archive,
        extracted.destination
    );
    write_stdout_line(stdout, extracted.destination)
}

fn output_root(flag: Option<&Utf8PathBuf>, config: &FetchConfig) -> Utf8PathBuf {
    flag.cloned().unwrap_or_else(|| config.output_dir.clone())
}

fn write_stdout_line(stdout: &mut dyn Write, line: impl std::fmt::Display) -> Result<()> {
    writeln!(stdout, "{line}").map_err(|source| CommandError::WriteFailed { source })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort reporting; ignore write failures.
    }
}
