// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Persisting the (possibly partial) place tree between runs.
//!
//! Every crawl run reads the latest snapshot from the data directory
//! and writes a new, timestamped one,
//! leaving all earlier snapshots in place.

use std::{path::PathBuf, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;

use crate::{files_finder::FindError, tools};

pub mod store;
pub mod writer;

pub use store::{load_latest, load_or_seed, read, Snapshot};
pub use writer::{write, write_json_new, SnapshotWriter};

pub const FILE_PREFIX: &str = "provinces";
pub const FILE_EXTENSION: &str = "json";
/// The snapshot an operator promoted to "known complete".
pub const COMPLETE_FILE_NAME: &str = "provincesComplete.json";
/// Where the import document goes by default.
pub const IMPORT_FILE_NAME: &str = "firestoreImport.json";
/// Files matching the snapshot pattern,
/// that are never considered for resuming.
pub const EXCLUDED_FILE_NAMES: [&str; 3] =
    [COMPLETE_FILE_NAME, IMPORT_FILE_NAME, "provinces3.json"];

/// The first dot-separated part of the file name contains the prefix,
/// and the last one is the extension.
pub static RE_SNAPSHOT_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^.]*provinces[^.]*\.(?:.*\.)?json$")
        .expect("Programmer error: invalid snapshot file regex")
});

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to list snapshot candidates: {0}")]
    DirectoryRead(#[from] FindError),
    #[error("Failed to read snapshot '{0:?}': {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse snapshot '{0:?}': {1}")]
    Parse(PathBuf, #[source] serde_json::Error),
    #[error("Output file '{0:?}' already exists; refusing to overwrite it")]
    FileExists(PathBuf),
    #[error("Failed to write '{0:?}': {1}")]
    Write(PathBuf, #[source] std::io::Error),
    #[error("Failed to serialize to JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The file name of a snapshot taken at the given time,
/// e.g. `provinces_2024-07-31T15_27_04.247Z.json`.
#[must_use]
pub fn file_name(time: DateTime<Utc>) -> String {
    format!(
        "{FILE_PREFIX}_{}.{FILE_EXTENSION}",
        tools::file_name_timestamp(time)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_is_a_candidate() {
        let time = Utc.with_ymd_and_hms(2024, 7, 31, 15, 27, 4).unwrap();
        let name = file_name(time);
        assert_eq!(name, "provinces_2024-07-31T15_27_04.000Z.json");
        assert!(RE_SNAPSHOT_FILE.is_match(&name));
    }

    #[test]
    fn test_snapshot_file_pattern() {
        for name in ["provinces.json", "provinces2.json", "provinces_x.1.json"] {
            assert!(RE_SNAPSHOT_FILE.is_match(name), "{name}");
        }
        for name in [
            "municipalities.json",
            "provinces.json.bak",
            "provinces.yml",
            "old.provinces.json",
        ] {
            assert!(!RE_SNAPSHOT_FILE.is_match(name), "{name}");
        }
    }
}
