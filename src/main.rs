// SPDX-FileCopyrightText: 2021-2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

mod cli;

use std::path::{Path, PathBuf};

use async_std::fs;
use clap::{crate_name, ArgMatches};
use cli_utils::{logging, BoxResult};
use fs4::async_std::AsyncFileExt;
use tracing::instrument;
use tracing_subscriber::filter::LevelFilter;

use census_places_scraper::{
    crawler::Crawler,
    model::tree,
    settings::{self, Settings},
    snapshot::{self, SnapshotWriter},
    tools::async_path,
    transform::{self, RandomKeys},
};

const LOCK_FILE_NAME: &str = ".census-places-scraper.lock";

#[allow(clippy::print_stdout)]
fn print_version_and_exit(quiet: bool) {
    if !quiet {
        print!("{} ", clap::crate_name!());
    }
    println!("{}", census_places_scraper::VERSION);
    std::process::exit(0);
}

/// Keeps a second crawl from writing into the same data directory concurrently.
async fn lock_data_dir(data_dir: &Path) -> BoxResult<fs::File> {
    let lock_file_path = data_dir.join(LOCK_FILE_NAME);
    tracing::debug!("Preparing to lock file '{}' ...", lock_file_path.display());
    let lock_file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(async_path(&lock_file_path))
        .await?;
    if !lock_file.try_lock_exclusive()? {
        return Err(format!(
            "Failed to lock file '{}'; is another crawl running on this data directory?",
            lock_file_path.display()
        )
        .into());
    }
    tracing::debug!("Obtained lock on file '{}'.", lock_file_path.display());
    Ok(lock_file)
}

#[instrument(skip_all)]
async fn crawl(run_settings: &Settings) -> BoxResult<()> {
    let client = run_settings.census_client()?;
    let data_dir = &run_settings.data_dir;
    fs::create_dir_all(async_path(data_dir)).await?;
    let lock_file = lock_data_dir(data_dir).await?;

    let (provinces, _) = snapshot::load_or_seed(data_dir).await?;
    let outstanding = tree::outstanding(&provinces);
    tracing::info!(
        "Outstanding: {} municipality, {} main-place and {} sub-place lists.",
        outstanding.municipalities,
        outstanding.main_places,
        outstanding.sub_places
    );

    let crawler = Crawler::new(client);
    let mut writer = SnapshotWriter::create(data_dir).await?;
    tracing::info!("Writing to '{}' ...", writer.path().display());
    let report = crawler.crawl_into(provinces, &mut writer).await?;
    let snapshot_path = writer.finish().await?;
    report.log();
    if report.is_success() {
        tracing::info!(
            "'{}' is complete; it may be promoted to '{}'.",
            snapshot_path.display(),
            snapshot::COMPLETE_FILE_NAME
        );
    }

    tracing::trace!("Releasing lock on data directory ...");
    lock_file.unlock()?;
    tracing::debug!("Released lock on data directory.");
    Ok(())
}

#[instrument(skip_all)]
async fn status(run_settings: &Settings) -> BoxResult<()> {
    let Some(snapshot) = snapshot::load_latest(&run_settings.data_dir).await? else {
        tracing::info!("Nothing crawled yet.");
        return Ok(());
    };
    for province in &snapshot.provinces {
        let outstanding = province.outstanding();
        if outstanding.is_none() {
            tracing::info!("{}: complete", province.name);
        } else {
            tracing::info!(
                "{}: {} municipality, {} main-place and {} sub-place lists outstanding",
                province.name,
                outstanding.municipalities,
                outstanding.main_places,
                outstanding.sub_places
            );
        }
    }
    for (_, name) in tree::missing_seed(&snapshot.provinces) {
        tracing::info!("{name}: missing from snapshot");
    }
    let total = tree::outstanding(&snapshot.provinces);
    if total.is_none() {
        tracing::info!("'{}' is complete.", snapshot.path.display());
    } else {
        tracing::warn!(
            "'{}' has {} children lists outstanding; run '{}' again.",
            snapshot.path.display(),
            total.total(),
            cli::SC_CRAWL
        );
    }
    Ok(())
}

#[instrument(skip_all)]
async fn transform(run_settings: &Settings, sub_args: &ArgMatches) -> BoxResult<()> {
    let arg_path = |arg_name: &str| sub_args.get_one::<PathBuf>(arg_name).cloned();
    let input = arg_path(cli::A_L_INPUT)
        .unwrap_or_else(|| run_settings.data_dir.join(snapshot::COMPLETE_FILE_NAME));
    let output = arg_path(cli::A_L_OUTPUT)
        .unwrap_or_else(|| run_settings.data_dir.join(snapshot::IMPORT_FILE_NAME));

    tracing::info!("Reading '{}' ...", input.display());
    let mut provinces = snapshot::read(&input).await?;
    let outstanding = tree::outstanding(&provinces);
    if !outstanding.is_none() {
        tracing::warn!(
            "'{}' is incomplete ({} children lists outstanding); they end up as empty collections.",
            input.display(),
            outstanding.total()
        );
    }

    let document = transform::transform(&mut provinces, &mut RandomKeys::default());
    snapshot::write_json_new(&document, &output).await?;
    tracing::info!(
        "Wrote {} provinces to '{}'.",
        document.provinces.len(),
        output.display()
    );
    Ok(())
}

#[tokio::main]
#[instrument]
async fn main() -> BoxResult<()> {
    let log_reload_handle = logging::setup(crate_name!())?;
    let args = cli::args_matcher().get_matches();

    let quiet = args.get_flag(cli::A_L_QUIET);
    let version = args.get_flag(cli::A_L_VERSION);
    if version {
        print_version_and_exit(quiet);
    }

    let verbose = args.get_flag(cli::A_L_VERBOSE);

    let log_level = if verbose {
        LevelFilter::TRACE
    } else if quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::INFO
    };
    logging::set_log_level_tracing(&log_reload_handle, log_level)?;

    let mut run_settings = settings::load()?;
    if let Some(data_dir) = args.get_one::<PathBuf>(cli::A_L_DATA_DIR) {
        run_settings.data_dir.clone_from(data_dir);
    }

    match args.subcommand() {
        Some((cli::SC_STATUS, _)) => status(&run_settings).await,
        Some((cli::SC_TRANSFORM, sub_args)) => transform(&run_settings, sub_args).await,
        Some((cli::SC_CRAWL, _)) | None => crawl(&run_settings).await,
        Some((other, _)) => Err(format!("Unknown sub-command '{other}'").into()),
    }
}
