//! Named JSON documents on disk, one file per well-known key.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, StudyVaultError};

pub const STATE_KEY: &str = "study_state";
pub const RESOURCES_KEY: &str = "organizer_resources";
pub const CUSTOM_CHAPTERS_KEY: &str = "custom_chapters";

#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Raw document text, `None` when the key was never written.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StudyVaultError::io(e, path)),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Atomic replace via temp file + rename.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| storage_error(e, &self.dir))?;
        let json = serde_json::to_vec(value)?;
        let path = self.path_for(key);
        write_atomic(&path, &json).map_err(|e| storage_error(e, &path))
    }
}

/// Write to `<path>.tmp`, fsync it, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}

fn storage_error(err: std::io::Error, path: &Path) -> StudyVaultError {
    let reason = format!("{}: {err}", path.display());
    if err.kind() == std::io::ErrorKind::StorageFull {
        StudyVaultError::QuotaExceeded {
            reason: reason.into(),
        }
    } else {
        StudyVaultError::StorageUnavailable {
            reason: reason.into(),
        }
    }
}
