// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    ffi::{OsStr, OsString},
    fs,
    path::{Path, PathBuf},
};

use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FindError {
    #[error("Failed to read directory '{0:?}': {1}")]
    ReadDir(PathBuf, #[source] std::io::Error),
    #[error("Could not get file type for '{0:?}'")]
    FileType(PathBuf, #[source] std::io::Error),
    #[error("The path misses a file-name: '{0:?}'")]
    PathMissingFileName(PathBuf),
    #[error("Path part {0} is not valid UTF-8: '{1:?}'")]
    PathPartNotUtf8(&'static str, OsString),
}

fn path_part_to_string(
    path_part_name: &'static str,
    path_part: &OsStr,
) -> Result<String, FindError> {
    path_part
        .to_str()
        .ok_or_else(|| FindError::PathPartNotUtf8(path_part_name, path_part.to_os_string()))
        .map(ToOwned::to_owned)
}

pub fn extract_file_name(path: impl AsRef<Path>) -> Result<String, FindError> {
    let path = path.as_ref();
    let raw = path
        .file_name()
        .ok_or_else(|| FindError::PathMissingFileName(path.to_path_buf()))?;
    path_part_to_string("file-name", raw)
}

/// Lists the names of the regular files directly within `dir`
/// (no recursion) that match `file_name_pattern`
/// and are not listed in `excluded`.
///
/// Files with a name that is not valid UTF-8 are skipped.
/// The result is sorted lexicographically, ascending.
pub fn find_flat(
    dir: impl AsRef<Path>,
    file_name_pattern: &Regex,
    excluded: &[&str],
) -> Result<Vec<String>, FindError> {
    let dir = dir.as_ref();
    tracing::trace!("find_flat - dir: '{dir:?}' ...");
    let mut file_names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|err| FindError::ReadDir(dir.to_path_buf(), err))? {
        let entry = entry.map_err(|err| FindError::ReadDir(dir.to_path_buf(), err))?;
        let entry_path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|err| FindError::FileType(entry_path.clone(), err))?;
        if !file_type.is_file() {
            continue;
        }
        let Ok(file_name) = extract_file_name(&entry_path) else {
            tracing::trace!("find_flat - skipping non UTF-8 file name: '{entry_path:?}'");
            continue;
        };
        if excluded.contains(&file_name.as_str()) {
            continue;
        }
        if file_name_pattern.is_match(&file_name) {
            tracing::trace!("find_flat - matching file: '{file_name}'");
            file_names.push(file_name);
        }
    }
    file_names.sort();
    Ok(file_names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_flat() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "skip.json", "c.txt"] {
            fs::write(dir.path().join(name), "[]").unwrap();
        }
        fs::create_dir(dir.path().join("d.json")).unwrap();
        let pattern = Regex::new(r"\.json$").unwrap();
        let found = find_flat(dir.path(), &pattern, &["skip.json"]).unwrap();
        assert_eq!(found, ["a.json", "b.json"]);
    }

    #[test]
    fn test_find_flat_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = Regex::new(r".*").unwrap();
        let res = find_flat(dir.path().join("nope"), &pattern, &[]);
        assert!(matches!(res, Err(FindError::ReadDir(_, _))));
    }
}
