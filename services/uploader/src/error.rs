use ap308_ingest::IngestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status or `ok: false`; message is the API's `error` or `HTTP <status>`.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid response body (HTTP {status}): {message}")]
    Decode { status: u16, message: String },

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("{file}: {source}")]
    File {
        file: String,
        #[source]
        source: Box<UploadError>,
    },
}

impl UploadError {
    /// Transport failures and server-side 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            UploadError::Transport(_) => true,
            UploadError::Api { status, .. } => *status >= 500,
            UploadError::File { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    pub fn in_file(self, file: &str) -> Self {
        UploadError::File {
            file: file.to_string(),
            source: Box::new(self),
        }
    }
}
