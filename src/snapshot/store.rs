// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::{Path, PathBuf};

use async_std::fs;

use super::{Error, EXCLUDED_FILE_NAMES, RE_SNAPSHOT_FILE};
use crate::{
    files_finder,
    model::tree::{self, Province},
    tools::async_path,
};

/// A place tree as loaded from disc.
#[derive(Debug)]
pub struct Snapshot {
    pub path: PathBuf,
    pub provinces: Vec<Province>,
}

/// Names of all snapshot files in `dir` that may be resumed from,
/// oldest first.
pub fn candidates(dir: impl AsRef<Path>) -> Result<Vec<String>, Error> {
    Ok(files_finder::find_flat(
        dir,
        &RE_SNAPSHOT_FILE,
        &EXCLUDED_FILE_NAMES,
    )?)
}

/// Reads a place tree from a snapshot file.
pub async fn read(path: impl AsRef<Path>) -> Result<Vec<Province>, Error> {
    let path = path.as_ref();
    let content = fs::read(async_path(path))
        .await
        .map_err(|io_err| Error::Read(path.to_path_buf(), io_err))?;
    serde_json::from_slice(&content).map_err(|serde_err| Error::Parse(path.to_path_buf(), serde_err))
}

/// Loads the most recent snapshot within `dir`,
/// or `None` if there is none yet.
///
/// Failing to list the directory is an error,
/// never a reason to start over with a fresh tree,
/// as that would silently discard all progress made so far.
pub async fn load_latest(dir: impl AsRef<Path>) -> Result<Option<Snapshot>, Error> {
    let dir = dir.as_ref();
    let Some(latest) = candidates(dir)?.pop() else {
        tracing::info!("No snapshot found in '{}'", dir.display());
        return Ok(None);
    };
    let path = dir.join(latest);
    tracing::info!("Reading snapshot '{}' ...", path.display());
    let provinces = read(&path).await?;
    tracing::debug!("Read {} provinces from snapshot.", provinces.len());
    Ok(Some(Snapshot { path, provinces }))
}

/// Loads the tree to continue crawling with:
/// the latest snapshot, or the seed provinces if there is none.
///
/// A run that was killed leaves a snapshot lacking the provinces
/// it did not get to.
/// These are taken from the next older snapshot(s) that have them,
/// and only as a last resort from the seed (unfetched).
/// Also returns the path of the latest snapshot, if any.
pub async fn load_or_seed(
    dir: impl AsRef<Path>,
) -> Result<(Vec<Province>, Option<PathBuf>), Error> {
    let dir = dir.as_ref();
    let Some(Snapshot {
        path,
        mut provinces,
    }) = load_latest(dir).await?
    else {
        tracing::info!("Starting with a fresh tree.");
        return Ok((tree::seed(), None));
    };

    let mut older_names = candidates(dir)?;
    // the latest one, which we already have
    older_names.pop();
    while tree::missing_seed(&provinces).next().is_some() {
        let Some(older_name) = older_names.pop() else {
            break;
        };
        let older_path = dir.join(older_name);
        let older = match read(&older_path).await {
            Ok(older) => older,
            Err(err) => {
                tracing::warn!("Skipping unreadable snapshot '{}': {err}", older_path.display());
                continue;
            }
        };
        let recovered = tree::merge_missing(&mut provinces, older);
        if recovered > 0 {
            tracing::warn!(
                "Snapshot '{}' lacks {recovered} provinces; taking them from '{}'.",
                path.display(),
                older_path.display()
            );
        }
    }

    let added = tree::merge_seed(&mut provinces);
    if added > 0 {
        tracing::warn!(
            "Snapshot '{}' lacks {added} provinces; adding them unfetched.",
            path.display()
        );
    }
    Ok((provinces, Some(path)))
}
