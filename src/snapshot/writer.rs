// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::{Path, PathBuf};

use async_std::{
    fs::{File, OpenOptions},
    io::{
        self,
        prelude::{SeekExt, WriteExt},
        ErrorKind, SeekFrom,
    },
};
use chrono::Utc;
use serde::Serialize;

use super::{file_name, Error};
use crate::{model::tree::Province, tools::async_path};

/// Opens a new file for writing, failing if it already exists.
async fn create_new(path: &Path) -> Result<File, Error> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(async_path(path))
        .await
        .map_err(|io_err| {
            if io_err.kind() == ErrorKind::AlreadyExists {
                Error::FileExists(path.to_path_buf())
            } else {
                Error::Write(path.to_path_buf(), io_err)
            }
        })
}

/// Writes a snapshot one province at a time.
///
/// After each appended province, the file on disc is a complete JSON array,
/// so a crash in the middle of a run still leaves a loadable snapshot
/// of everything appended up to that point.
#[derive(Debug)]
pub struct SnapshotWriter {
    path: PathBuf,
    file: File,
    written: usize,
}

impl SnapshotWriter {
    /// Creates a new, timestamped snapshot file within `dir`.
    pub async fn create(dir: impl AsRef<Path>) -> Result<Self, Error> {
        Self::create_at(dir.as_ref().join(file_name(Utc::now()))).await
    }

    /// Creates a new snapshot file at exactly `path`,
    /// failing if it already exists.
    pub async fn create_at(path: PathBuf) -> Result<Self, Error> {
        let file = create_new(&path).await?;
        let mut writer = Self {
            path,
            file,
            written: 0,
        };
        writer.write_raw(b"[]", None).await?;
        tracing::debug!("Created snapshot '{}'", writer.path.display());
        Ok(writer)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of provinces appended so far.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.written
    }

    async fn write_to(file: &mut File, content: &[u8], rewind: Option<i64>) -> io::Result<()> {
        if let Some(offset) = rewind {
            file.seek(SeekFrom::End(-offset)).await?;
        }
        file.write_all(content).await?;
        file.flush().await?;
        file.sync_data().await
    }

    async fn write_raw(&mut self, content: &[u8], rewind: Option<i64>) -> Result<(), Error> {
        Self::write_to(&mut self.file, content, rewind)
            .await
            .map_err(|io_err| Error::Write(self.path.clone(), io_err))
    }

    /// Appends a province, replacing the closing bracket of the array.
    pub async fn append(&mut self, province: &Province) -> Result<(), Error> {
        let json = serde_json::to_vec(province)?;
        let (lead, rewind): (&[u8], i64) = if self.written == 0 {
            (b"\n", 1)
        } else {
            (b",\n", 2)
        };
        let mut content = Vec::with_capacity(lead.len() + json.len() + 2);
        content.extend_from_slice(lead);
        content.extend_from_slice(&json);
        content.extend_from_slice(b"\n]");
        self.write_raw(&content, Some(rewind)).await?;
        self.written += 1;
        Ok(())
    }

    /// Finishes writing, returning the path of the snapshot.
    pub async fn finish(self) -> Result<PathBuf, Error> {
        let path = self.path.clone();
        self.file
            .sync_all()
            .await
            .map_err(|io_err| Error::Write(path.clone(), io_err))?;
        tracing::debug!(
            "Finished snapshot '{}' with {} provinces",
            path.display(),
            self.written
        );
        Ok(path)
    }
}

/// Writes a whole place tree to a new, timestamped snapshot within `dir`.
pub async fn write(provinces: &[Province], dir: impl AsRef<Path>) -> Result<PathBuf, Error> {
    let mut writer = SnapshotWriter::create(dir).await?;
    for province in provinces {
        writer.append(province).await?;
    }
    writer.finish().await
}

/// Writes `content` as pretty JSON to a new file at `path`.
///
/// An existing file is never overwritten.
pub async fn write_json_new<T: Serialize>(content: &T, path: &Path) -> Result<(), Error> {
    let json = serde_json::to_vec_pretty(content)?;
    let mut file = create_new(path).await?;
    SnapshotWriter::write_to(&mut file, &json, None)
        .await
        .map_err(|io_err| Error::Write(path.to_path_buf(), io_err))?;
    tracing::debug!("Wrote '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::tree::{Children, Municipality},
        snapshot::{read, store},
    };

    fn gauteng() -> Province {
        let mut province = Province::new("ZA_GP", "GAUTENG");
        province.municipalities = Children::Fetched(vec![Municipality::new("EKU", "Ekurhuleni")]);
        province
    }

    #[tokio::test]
    async fn test_every_append_leaves_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SnapshotWriter::create(dir.path()).await.unwrap();
        let path = writer.path().to_path_buf();
        assert!(read(&path).await.unwrap().is_empty());

        writer.append(&gauteng()).await.unwrap();
        assert_eq!(read(&path).await.unwrap(), vec![gauteng()]);

        let limpopo = Province::new("ZA_LP", "LIMPOPO");
        writer.append(&limpopo).await.unwrap();
        assert_eq!(writer.written(), 2);
        assert_eq!(read(&path).await.unwrap(), vec![gauteng(), limpopo]);

        assert_eq!(writer.finish().await.unwrap(), path);
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provinces_taken.json");
        std::fs::write(&path, "[]").unwrap();
        let res = SnapshotWriter::create_at(path).await;
        assert!(matches!(res, Err(Error::FileExists(_))));
    }

    #[tokio::test]
    async fn test_write_json_new() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firestoreImport.json");
        write_json_new(&serde_json::json!({ "provinces": {} }), &path)
            .await
            .unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!({ "provinces": {} }));

        let res = write_json_new(&serde_json::json!({}), &path).await;
        assert!(matches!(res, Err(Error::FileExists(_))));
    }

    #[tokio::test]
    async fn test_write_is_resumable_input() {
        let dir = tempfile::tempdir().unwrap();
        let tree = vec![gauteng(), Province::new("ZA_WC", "WESTERN CAPE")];
        let path = write(&tree, dir.path()).await.unwrap();
        let snapshot = store::load_latest(dir.path()).await.unwrap().unwrap();
        assert_eq!(snapshot.path, path);
        assert_eq!(snapshot.provinces, tree);
    }
}
