//! Artifact vault — byte-faithful blob store keyed by history id.
//!
//! Every artifact is base64-encoded (standard alphabet, padded) and written
//! to `<dir>/file_<id>.b64`, so the on-disk form is plain text.  Encoding
//! inflates the payload by 4/3: a blob at the 5 MB ceiling occupies about
//! 6.67 MB on disk.  The ceiling is applied to the **raw** blob size.
//!
//! Persistence here is best-effort by contract: [`ArtifactVault::put`]
//! reports failure as `false` and never returns an error.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::format_file_size;

/// Largest raw blob the vault accepts: 5 MB.
pub const MAX_ARTIFACT_BYTES: usize = 5 * 1024 * 1024;

const FILE_PREFIX: &str = "file_";
const FILE_SUFFIX: &str = ".b64";

/// Directory-backed store of encoded conversion artifacts.
///
/// Shared as `Arc<ArtifactVault>`; every method takes `&self`.
#[derive(Debug, Clone)]
pub struct ArtifactVault {
    dir: PathBuf,
}

impl ArtifactVault {
    /// Open a vault rooted at `dir`.  The directory is created lazily on the
    /// first [`put`](Self::put).
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory that holds the encoded artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Encode and store `blob` under `id`, replacing any previous artifact.
    ///
    /// Returns `false` without writing anything when the blob exceeds
    /// [`MAX_ARTIFACT_BYTES`], when `id` is not a valid key, or when the
    /// write fails.
    pub fn put(&self, id: &str, blob: &[u8]) -> bool {
        let Some(path) = self.path_for(id) else {
            log::warn!("vault: rejected invalid artifact id {id:?}");
            return false;
        };

        if blob.len() > MAX_ARTIFACT_BYTES {
            log::warn!(
                "vault: artifact {id} too large to keep ({}, max {})",
                format_file_size(blob.len() as u64),
                format_file_size(MAX_ARTIFACT_BYTES as u64)
            );
            return false;
        }

        let encoded = BASE64.encode(blob);
        let written = std::fs::create_dir_all(&self.dir).and_then(|_| {
            // Write beside the target, then rename over it.
            let tmp = path.with_extension("b64.tmp");
            std::fs::write(&tmp, encoded.as_bytes())?;
            std::fs::rename(&tmp, &path)
        });

        match written {
            Ok(()) => {
                log::debug!(
                    "vault: saved {id} ({})",
                    format_file_size(blob.len() as u64)
                );
                true
            }
            Err(e) => {
                log::error!("vault: could not save {id}: {e}");
                false
            }
        }
    }

    /// Decode and return the artifact stored under `id`.
    ///
    /// `None` when nothing is stored or the stored text no longer decodes.
    pub fn get(&self, id: &str) -> Option<Vec<u8>> {
        let path = self.path_for(id)?;
        let encoded = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("vault: no artifact for {id}");
                return None;
            }
            Err(e) => {
                log::error!("vault: could not read {id}: {e}");
                return None;
            }
        };

        match BASE64.decode(encoded.trim_end()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::error!("vault: artifact {id} is corrupt: {e}");
                None
            }
        }
    }

    /// Returns `true` when an artifact is stored under `id`.
    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).is_some_and(|p| p.is_file())
    }

    /// Remove the artifact stored under `id`.  Absent ids are a no-op.
    pub fn delete(&self, id: &str) {
        let Some(path) = self.path_for(id) else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => log::debug!("vault: deleted {id}"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("vault: could not delete {id}: {e}"),
        }
    }

    /// Remove every stored artifact.
    pub fn clear(&self) {
        for path in self.artifact_files() {
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("vault: could not delete {}: {e}", path.display());
            }
        }
        log::info!("vault: cleared");
    }

    /// Ids of every stored artifact, in no particular order.
    pub fn ids(&self) -> Vec<String> {
        self.artifact_files()
            .iter()
            .filter_map(|p| p.file_name()?.to_str())
            .filter_map(|name| name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX))
            .map(str::to_owned)
            .collect()
    }

    /// Total bytes of encoded text currently on disk.
    pub fn storage_size(&self) -> u64 {
        self.artifact_files()
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }

    fn artifact_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX))
            })
            .collect()
    }

    /// Map an id to its file, refusing ids that could escape the directory.
    fn path_for(&self, id: &str) -> Option<PathBuf> {
        let valid = !id.is_empty()
            && id != "."
            && !id.contains("..")
            && !id.contains(['/', '\\', '\0']);
        valid.then(|| self.dir.join(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
