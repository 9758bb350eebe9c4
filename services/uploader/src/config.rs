//! `config.json` loading.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::UploadError;

const CHECK_PATH: &str = "/import/ap308/check.php";
const LINES_PATH: &str = "/import/ap308/lines/upsert.php";

#[derive(Debug, Clone, Deserialize)]
pub struct UploaderConfig {
    pub api: String,
}

impl UploaderConfig {
    /// Read and validate `{ "api": "<base-url>" }`.
    pub fn load(path: &Path) -> Result<Self, UploadError> {
        let content = fs::read_to_string(path).map_err(|e| {
            UploadError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|e| UploadError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        let mut config: UploaderConfig =
            serde_json::from_str(content).map_err(|e| format!("malformed config: {}", e))?;
        config.api = config.api.trim().trim_end_matches('/').to_string();
        if config.api.is_empty() {
            return Err("\"api\" must be a non-empty base URL".to_string());
        }
        Ok(config)
    }

    pub fn check_url(&self) -> String {
        format!("{}{}", self.api, CHECK_PATH)
    }

    pub fn lines_url(&self) -> String {
        format!("{}{}", self.api, LINES_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_trims_trailing_slash() {
        let config = UploaderConfig::from_json(r#"{ "api": "https://reports.example.org/api/ " }"#).unwrap();
        assert_eq!(config.api, "https://reports.example.org/api");
        assert_eq!(config.check_url(), "https://reports.example.org/api/import/ap308/check.php");
        assert_eq!(
            config.lines_url(),
            "https://reports.example.org/api/import/ap308/lines/upsert.php"
        );
    }

    #[test]
    fn test_from_json_rejects_missing_or_empty_api() {
        assert!(UploaderConfig::from_json("{}").is_err());
        assert!(UploaderConfig::from_json(r#"{ "api": "  " }"#).is_err());
        assert!(UploaderConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = UploaderConfig::load(&dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, UploadError::Config(_)));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"api":"http://127.0.0.1:8080"}"#).unwrap();
        assert_eq!(UploaderConfig::load(&path).unwrap().api, "http://127.0.0.1:8080");
    }
}
