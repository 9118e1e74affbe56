//! Filesystem-backed artifact store.
//!
//! Layout for test id `N` under the store root, with prefix `p`:
//!
//! ```text
//! p_stage0_original_N.bin
//! p_stage1_compressed_N.bin
//! p_stage2_with_random_N.bin
//! p_stage3_encrypted_N.bin
//! p_stage4_parts_N/part_0000.bin ...
//! p_metadata_N.json
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::metadata::CaptureMetadata;
use crate::stage::{Stage, StageKind, TestId};

/// Prefix used by the reference capture.
pub const DEFAULT_PREFIX: &str = "py";

/// Artifact store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Artifact already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Stage {0} is stored as parts, not as a single blob")]
    NotABlob(Stage),
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Directory-rooted artifact store with a fixed naming convention.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    prefix: String,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_prefix(root, DEFAULT_PREFIX)
    }

    pub fn with_prefix(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Path of a single-blob stage artifact.
    pub fn blob_path(&self, stage: Stage, id: TestId) -> Result<PathBuf, StoreError> {
        if stage.kind() == StageKind::Parts {
            return Err(StoreError::NotABlob(stage));
        }
        Ok(self.root.join(format!(
            "{}_stage{}_{}_{}.bin",
            self.prefix,
            stage.capture_index(),
            stage.file_stem(),
            id
        )))
    }

    /// Directory holding the segmented parts for a test id.
    pub fn parts_dir(&self, id: TestId) -> PathBuf {
        let stage = Stage::SegmentedParts;
        self.root.join(format!(
            "{}_stage{}_{}_{}",
            self.prefix,
            stage.capture_index(),
            stage.file_stem(),
            id
        ))
    }

    pub fn part_path(&self, id: TestId, index: usize) -> PathBuf {
        self.parts_dir(id).join(part_file_name(index))
    }

    pub fn metadata_path(&self, id: TestId) -> PathBuf {
        self.root.join(format!("{}_metadata_{}.json", self.prefix, id))
    }

    /// Write a stage blob. Artifacts are write-once.
    pub fn write_blob(&self, stage: Stage, id: TestId, data: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.blob_path(stage, id)?;
        write_once(&path, data)?;
        info!(stage = %stage, path = %path.display(), bytes = data.len(), "saved artifact");
        Ok(path)
    }

    /// Write every part in segmentation order, one file per part.
    pub fn write_parts<P: AsRef<[u8]>>(&self, id: TestId, parts: &[P]) -> Result<PathBuf, StoreError> {
        let dir = self.parts_dir(id);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        for (index, part) in parts.iter().enumerate() {
            let path = dir.join(part_file_name(index));
            write_once(&path, part.as_ref())?;
            debug!(index, path = %path.display(), bytes = part.as_ref().len(), "saved part");
        }
        info!(path = %dir.display(), parts = parts.len(), "saved segmented parts");
        Ok(dir)
    }

    pub fn write_metadata(&self, metadata: &CaptureMetadata) -> Result<PathBuf, StoreError> {
        let path = self.metadata_path(metadata.test_id);
        let json = serde_json::to_vec_pretty(metadata)?;
        write_once(&path, &json)?;
        info!(path = %path.display(), "saved capture metadata");
        Ok(path)
    }

    pub fn read_metadata(&self, id: TestId) -> Result<Option<CaptureMetadata>, StoreError> {
        let path = self.metadata_path(id);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let metadata = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(metadata))
    }

    pub fn read_stage(&self, stage: Stage, id: TestId) -> Result<Option<Vec<u8>>, StoreError> {
        read_blob(&self.blob_path(stage, id)?)
    }

    pub fn read_stage_parts(&self, id: TestId) -> Result<Option<Vec<Vec<u8>>>, StoreError> {
        read_parts(&self.parts_dir(id))
    }
}

/// `part_0000.bin`, `part_0001.bin`, ...
pub fn part_file_name(index: usize) -> String {
    format!("part_{:04}.bin", index)
}

/// Read a blob. A missing file is `Ok(None)`, never an empty blob.
pub fn read_blob(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Index encoded in a `part_<index>.bin` file name.
pub fn parse_part_index(file_name: &str) -> Option<usize> {
    let digits = file_name.strip_prefix("part_")?.strip_suffix(".bin")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Read every `part_<index>.bin` file of a directory in index order.
///
/// Returns `Ok(None)` when the directory itself does not exist.
pub fn read_parts(dir: &Path) -> Result<Option<Vec<Vec<u8>>>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(index) = parse_part_index(&name) {
            names.push((index, name));
        }
    }
    // Index width grows past four digits, so name order is not part order.
    names.sort();

    let mut parts = Vec::with_capacity(names.len());
    for (_, name) in names {
        let path = dir.join(&name);
        let data = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        parts.push(data);
    }
    Ok(Some(parts))
}

fn write_once(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(StoreError::AlreadyExists(path.to_path_buf()));
        }
        Err(e) => return Err(StoreError::io(path, e)),
    };
    let mut writer = BufWriter::new(file);
    writer
        .write_all(data)
        .and_then(|_| writer.flush())
        .map_err(|e| StoreError::io(path, e))
}

/// Default dump directory shared by capture and comparison.
pub fn default_dump_dir() -> PathBuf {
    match dirs::cache_dir() {
        Some(mut path) => {
            path.push("resdiag");
            path.push("dumps");
            path
        }
        None => PathBuf::from("diagnostic_dumps"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_paths_follow_layout() {
        let store = ArtifactStore::new("/dumps");
        let id = TestId(1024);
        assert_eq!(
            store.blob_path(Stage::Original, id).unwrap(),
            PathBuf::from("/dumps/py_stage0_original_1024.bin")
        );
        assert_eq!(
            store.blob_path(Stage::WithRandomPrefix, id).unwrap(),
            PathBuf::from("/dumps/py_stage2_with_random_1024.bin")
        );
        assert_eq!(
            store.blob_path(Stage::Encrypted, id).unwrap(),
            PathBuf::from("/dumps/py_stage3_encrypted_1024.bin")
        );
        assert_eq!(
            store.part_path(id, 7),
            PathBuf::from("/dumps/py_stage4_parts_1024/part_0007.bin")
        );
        assert_eq!(
            store.metadata_path(id),
            PathBuf::from("/dumps/py_metadata_1024.json")
        );
    }

    #[test]
    fn test_parts_stage_has_no_blob_path() {
        let store = ArtifactStore::new("/dumps");
        assert!(matches!(
            store.blob_path(Stage::SegmentedParts, TestId(1)),
            Err(StoreError::NotABlob(Stage::SegmentedParts))
        ));
    }

    #[test]
    fn test_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write_blob(Stage::Compressed, TestId(5), b"abc").unwrap();
        let again = store.write_blob(Stage::Compressed, TestId(5), b"xyz");
        assert!(matches!(again, Err(StoreError::AlreadyExists(_))));
        assert_eq!(
            store.read_stage(Stage::Compressed, TestId(5)).unwrap(),
            Some(b"abc".to_vec())
        );
    }

    #[test]
    fn test_missing_reads_are_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert_eq!(store.read_stage(Stage::Original, TestId(9)).unwrap(), None);
        assert_eq!(store.read_stage_parts(TestId(9)).unwrap(), None);
        assert!(store.read_metadata(TestId(9)).unwrap().is_none());
    }

    #[test]
    fn test_empty_blob_is_present() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write_blob(Stage::Original, TestId(0), b"").unwrap();
        assert_eq!(store.read_stage(Stage::Original, TestId(0)).unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_parts_keep_boundaries_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let parts: Vec<Vec<u8>> = (0..12u8).map(|i| vec![i; i as usize + 1]).collect();
        store.write_parts(TestId(3), &parts).unwrap();

        // Unrelated files in the directory are ignored.
        fs::write(store.parts_dir(TestId(3)).join("notes.txt"), b"x").unwrap();

        let read = store.read_stage_parts(TestId(3)).unwrap().unwrap();
        assert_eq!(read, parts);
    }

    #[test]
    fn test_parts_past_four_digit_index_keep_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let parts: Vec<Vec<u8>> = (0..10_001u32).map(|i| i.to_le_bytes().to_vec()).collect();
        store.write_parts(TestId(1), &parts).unwrap();
        assert!(store.part_path(TestId(1), 10_000).exists());

        let read = store.read_stage_parts(TestId(1)).unwrap().unwrap();
        assert_eq!(read.len(), parts.len());
        assert_eq!(read[1001], 1001u32.to_le_bytes().to_vec());
        assert_eq!(read, parts);
    }

    #[test]
    fn test_parse_part_index() {
        assert_eq!(parse_part_index("part_0007.bin"), Some(7));
        assert_eq!(parse_part_index("part_10000.bin"), Some(10_000));
        assert_eq!(parse_part_index("part_+1.bin"), None);
        assert_eq!(parse_part_index("part_.bin"), None);
        assert_eq!(parse_part_index("part_0001.tmp"), None);
    }
}
