//! Save-game snapshots.
//!
//! A [`Snapshot`] captures a [`Game`] together with the identity of the
//! client that requested it.  It is immutable once written.
//!
//! Two encodings exist: gzip-compressed JSON (the default) and plain JSON for
//! debugging.  Loading does not need to be told which one was used; it looks
//! for the gzip magic bytes.  Files always carry the [`SNAPSHOT_EXTENSION`].

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::game::{ClientId, Game};

/// File extension appended to snapshot paths that lack it.
pub const SNAPSHOT_EXTENSION: &str = "msav";

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Errors raised while reading or writing snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error accessing snapshot at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot compression failed: {0}")]
    Compression(#[source] std::io::Error),
    #[error("snapshot is not valid: {0}")]
    Format(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// Encoding used when writing a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotEncoding {
    /// gzip over JSON.
    #[default]
    #[serde(alias = "compressed")]
    Gzip,
    /// Uncompressed JSON.
    Plain,
}

/// A point-in-time capture of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub client_id: ClientId,
    /// Seconds since the Unix epoch.
    pub saved_at: u64,
    pub game: Game,
}

impl Snapshot {
    pub fn new(game: Game, client_id: ClientId) -> Self {
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            version: SNAPSHOT_VERSION,
            client_id,
            saved_at,
            game,
        }
    }

    /// Serializes the snapshot.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Format`] or [`SnapshotError::Compression`].
    pub fn to_bytes(&self, encoding: SnapshotEncoding) -> Result<Vec<u8>, SnapshotError> {
        match encoding {
            SnapshotEncoding::Plain => Ok(serde_json::to_vec_pretty(self)?),
            SnapshotEncoding::Gzip => {
                let json = serde_json::to_vec(self)?;
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder
                    .write_all(&json)
                    .map_err(SnapshotError::Compression)?;
                encoder.finish().map_err(SnapshotError::Compression)
            }
        }
    }

    /// Parses a snapshot written in either encoding.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Compression`] for a corrupt gzip stream,
    /// [`SnapshotError::Format`] for invalid JSON, and
    /// [`SnapshotError::UnsupportedVersion`] for a newer schema.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = if bytes.starts_with(&GZIP_MAGIC) {
            let mut json = Vec::new();
            GzDecoder::new(bytes)
                .read_to_end(&mut json)
                .map_err(SnapshotError::Compression)?;
            serde_json::from_slice(&json)?
        } else {
            serde_json::from_slice(bytes)?
        };
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    /// Writes the snapshot to `path`, appending the extension if absent.
    /// Returns the path actually written.
    ///
    /// # Errors
    ///
    /// Serialization errors or [`SnapshotError::Io`].
    pub fn save(&self, path: &Path, encoding: SnapshotEncoding) -> Result<PathBuf, SnapshotError> {
        let path = with_snapshot_extension(path);
        let bytes = self.to_bytes(encoding)?;
        std::fs::write(&path, bytes).map_err(|source| SnapshotError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("snapshot written to {} ({encoding:?})", path.display());
        Ok(path)
    }

    /// Reads a snapshot from `path`.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Io`] or any parse error from [`Snapshot::from_bytes`].
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = std::fs::read(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }
}

/// Returns `path` with [`SNAPSHOT_EXTENSION`] appended unless it already
/// ends with it.
pub fn with_snapshot_extension(path: &Path) -> PathBuf {
    if path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION) {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(SNAPSHOT_EXTENSION);
    PathBuf::from(name)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn running_game() -> Game {
        let mut game = Game::new(4, 20);
        game.claim_slot(1, Uuid::new_v4(), "ada").unwrap();
        game.claim_slot(3, Uuid::new_v4(), "grace").unwrap();
        game.start().unwrap();
        game.add_points(1, 9);
        game.discarded.push("ROAD-CURVE".to_string());
        game
    }

    #[test]
    fn test_with_snapshot_extension_appends_once() {
        assert_eq!(
            with_snapshot_extension(Path::new("saves/first")),
            PathBuf::from("saves/first.msav")
        );
        assert_eq!(
            with_snapshot_extension(Path::new("saves/first.msav")),
            PathBuf::from("saves/first.msav")
        );
        assert_eq!(
            with_snapshot_extension(Path::new("saves/first.txt")),
            PathBuf::from("saves/first.txt.msav")
        );
    }

    #[test]
    fn test_gzip_encoding_starts_with_magic_and_is_smaller() {
        let snapshot = Snapshot::new(running_game(), Uuid::new_v4());

        let gz = snapshot.to_bytes(SnapshotEncoding::Gzip).unwrap();
        let plain = snapshot.to_bytes(SnapshotEncoding::Plain).unwrap();

        assert!(gz.starts_with(&GZIP_MAGIC));
        assert!(!plain.starts_with(&GZIP_MAGIC));
        assert!(gz.len() < plain.len());
    }

    #[test]
    fn test_from_bytes_reads_both_encodings() {
        let snapshot = Snapshot::new(running_game(), Uuid::new_v4());
        for encoding in [SnapshotEncoding::Gzip, SnapshotEncoding::Plain] {
            let bytes = snapshot.to_bytes(encoding).unwrap();
            assert_eq!(Snapshot::from_bytes(&bytes).unwrap(), snapshot);
        }
    }

    #[test]
    fn test_from_bytes_rejects_newer_version() {
        let mut snapshot = Snapshot::new(Game::default(), Uuid::new_v4());
        snapshot.version = SNAPSHOT_VERSION + 1;
        let bytes = snapshot.to_bytes(SnapshotEncoding::Plain).unwrap();

        let result = Snapshot::from_bytes(&bytes);

        assert!(matches!(result, Err(SnapshotError::UnsupportedVersion(v)) if v == SNAPSHOT_VERSION + 1));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            Snapshot::from_bytes(b"not a save"),
            Err(SnapshotError::Format(_))
        ));
        assert!(matches!(
            Snapshot::from_bytes(&[0x1F, 0x8B, 0x00]),
            Err(SnapshotError::Compression(_))
        ));
    }

    #[test]
    fn test_save_and_load_via_temp_dir() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("meeple_snapshot_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let snapshot = Snapshot::new(running_game(), Uuid::new_v4());

        // Act
        let written = snapshot
            .save(&dir.join("autosave"), SnapshotEncoding::Gzip)
            .unwrap();
        let loaded = Snapshot::load(&written).unwrap();

        // Assert
        assert_eq!(written.extension().unwrap(), SNAPSHOT_EXTENSION);
        assert_eq!(loaded, snapshot);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = Snapshot::load(Path::new("/nonexistent/meeple/save.msav"));
        assert!(matches!(result, Err(SnapshotError::Io { .. })));
    }
}
