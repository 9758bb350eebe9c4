//! Folder convention shared by the stages:
//! `<data>/<folder>/*.csv` → `clean_csv/` → `hashed/`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};

pub const CLEAN_DIR: &str = "clean_csv";
pub const HASHED_DIR: &str = "hashed";

#[derive(Debug, Clone)]
pub struct FolderLayout {
    data_root: PathBuf,
    folder: String,
}

impl FolderLayout {
    pub fn new(data_root: impl Into<PathBuf>, folder: impl Into<String>) -> Self {
        Self {
            data_root: data_root.into(),
            folder: folder.into(),
        }
    }

    /// Data root from `AP308_DATA_DIR`, defaulting to `./data`.
    pub fn from_env(folder: impl Into<String>) -> Self {
        let root = std::env::var("AP308_DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        Self::new(root, folder)
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_root.join(&self.folder)
    }

    pub fn clean_dir(&self) -> PathBuf {
        self.raw_dir().join(CLEAN_DIR)
    }

    pub fn hashed_dir(&self) -> PathBuf {
        self.raw_dir().join(HASHED_DIR)
    }
}

/// `*.csv` files directly inside `dir`, sorted by name.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::MissingDirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// File name as a string, for keys and messages.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = FolderLayout::new("/srv/data", "2024-06");
        assert_eq!(layout.folder(), "2024-06");
        assert_eq!(layout.raw_dir(), PathBuf::from("/srv/data/2024-06"));
        assert_eq!(layout.clean_dir(), PathBuf::from("/srv/data/2024-06/clean_csv"));
        assert_eq!(layout.hashed_dir(), PathBuf::from("/srv/data/2024-06/hashed"));
    }

    #[test]
    fn test_list_csv_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "x").unwrap();
        fs::write(dir.path().join("a.CSV"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("clean_csv")).unwrap();

        let names: Vec<String> = list_csv_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["a.CSV", "b.csv"]);
    }

    #[test]
    fn test_list_csv_files_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_csv_files(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, IngestError::MissingDirectory { .. }));
    }
}
