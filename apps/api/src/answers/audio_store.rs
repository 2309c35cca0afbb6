//! Local audio storage with write-temp-then-rename.
//!
//! Bytes land in a temp file inside the upload directory, are fsynced, and are
//! only then renamed onto their final name. Readers never see a partial file;
//! a crash mid-write leaves at most a `.upload-*.tmp` file behind.

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;

/// Prefix of every stored `audio_path`; also the route the files are served under.
pub const AUDIO_URL_PREFIX: &str = "uploads";
const DEFAULT_EXTENSION: &str = "webm";
const MAX_EXTENSION_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct AudioStore {
    root: PathBuf,
}

/// Audio fully written to a temp file but not yet visible under its final name.
#[derive(Debug)]
pub struct StagedAudio {
    temp: NamedTempFile,
    final_path: PathBuf,
    relative_path: String,
}

#[derive(Debug, Clone)]
pub struct StoredAudio {
    pub path: PathBuf,
    /// `uploads/<file name>`, the value persisted in `interview_answers.audio_path`.
    pub relative_path: String,
}

impl AudioStore {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` to a fresh temp file under a freshly generated final name.
    pub fn stage(&self, bytes: &[u8], extension: &str) -> io::Result<StagedAudio> {
        let file_name = format!("{}.{extension}", Uuid::new_v4());

        let mut temp = tempfile::Builder::new()
            .prefix(".upload-")
            .suffix(".tmp")
            .tempfile_in(&self.root)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;

        Ok(StagedAudio {
            temp,
            final_path: self.root.join(&file_name),
            relative_path: format!("{AUDIO_URL_PREFIX}/{file_name}"),
        })
    }

    /// Stages and commits on the blocking pool.
    pub async fn write(&self, bytes: Bytes, extension: String) -> Result<StoredAudio, AppError> {
        let store = self.clone();
        let stored = tokio::task::spawn_blocking(move || {
            store.stage(&bytes, &extension).and_then(StagedAudio::commit)
        })
        .await
        .map_err(|e| AppError::Internal(e.into()))??;
        Ok(stored)
    }

    /// Maps a stored `audio_path` back to a file under the root. Anything that
    /// is not a single plain file name below `uploads/` is rejected.
    pub fn resolve(&self, relative_path: &str) -> Option<PathBuf> {
        let name = relative_path.strip_prefix(&format!("{AUDIO_URL_PREFIX}/"))?;
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) => Some(self.root.join(file)),
            _ => None,
        }
    }

    /// Removes a stored file. A file that is already gone is not an error.
    pub fn remove(&self, relative_path: &str) -> io::Result<()> {
        let Some(path) = self.resolve(relative_path) else {
            return Ok(());
        };
        remove_if_exists(&path)
    }
}

impl StagedAudio {
    #[cfg(test)]
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    #[cfg(test)]
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically renames the temp file onto its final name. On failure the
    /// temp file is deleted and nothing exists at the final path.
    pub fn commit(self) -> io::Result<StoredAudio> {
        self.temp
            .persist(&self.final_path)
            .map_err(|e| e.error)?;
        Ok(StoredAudio {
            path: self.final_path,
            relative_path: self.relative_path,
        })
    }
}

/// Deletes a committed audio file on drop unless disarmed. Keeps a failed
/// upload from leaving a blob no answer row references.
pub struct OrphanGuard {
    path: Option<PathBuf>,
}

impl OrphanGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn disarm(mut self) {
        self.path = None;
    }
}

impl Drop for OrphanGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = remove_if_exists(&path) {
                warn!("Failed to remove orphaned audio {}: {e}", path.display());
            }
        }
    }
}

/// Extension from the client's file name: lowercase ASCII alphanumerics only,
/// at most eight characters, `webm` when absent or unusable.
pub fn audio_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
