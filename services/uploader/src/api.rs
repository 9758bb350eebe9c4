//! Wire contract of the import API and its transports.
//!
//! - `POST {api}/import/ap308/check.php`: identities only, returns diff counts
//! - `POST {api}/import/ap308/lines/upsert.php`: row payloads, returns write counts

use std::ops::AddAssign;
use std::time::Duration;

use ap308_ingest::{NormalizedRecord, UploadUnit};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::UploaderConfig;
use crate::error::UploadError;

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CheckRow<'a> {
    pub stable_row_num: usize,
    pub source_row_key: &'a str,
    pub anchor_hash: &'a str,
    pub content_hash: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CheckRequest<'a> {
    pub source_folder: &'a str,
    pub source_file: &'a str,
    pub return_rows: bool,
    pub rows: Vec<CheckRow<'a>>,
}

impl<'a> CheckRequest<'a> {
    pub fn new(source_folder: &'a str, source_file: &'a str, return_rows: bool, units: &'a [UploadUnit]) -> Self {
        Self {
            source_folder,
            source_file,
            return_rows,
            rows: units
                .iter()
                .map(|u| CheckRow {
                    stable_row_num: u.stable_row_num,
                    source_row_key: &u.source_row_key,
                    anchor_hash: &u.anchor_hash,
                    content_hash: &u.content_hash,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LineRow<'a> {
    pub anchor_hash: &'a str,
    pub content_hash: &'a str,
    pub data: &'a NormalizedRecord,
}

#[derive(Debug, Serialize)]
pub struct LinesRequest<'a> {
    pub return_rows: bool,
    pub rows: Vec<LineRow<'a>>,
}

impl<'a> LinesRequest<'a> {
    pub fn new(return_rows: bool, units: &'a [UploadUnit]) -> Self {
        Self {
            return_rows,
            rows: units
                .iter()
                .map(|u| LineRow {
                    anchor_hash: &u.anchor_hash,
                    content_hash: &u.content_hash,
                    data: &u.data,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckCounts {
    pub inserted: u64,
    pub changed: u64,
    pub unchanged: u64,
    pub observed_new: u64,
    pub observed_already_seen: u64,
}

impl AddAssign for CheckCounts {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.changed += other.changed;
        self.unchanged += other.unchanged;
        self.observed_new += other.observed_new;
        self.observed_already_seen += other.observed_already_seen;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinesCounts {
    pub upserted: u64,
    pub skipped_missing_observed: u64,
}

impl AddAssign for LinesCounts {
    fn add_assign(&mut self, other: Self) {
        self.upserted += other.upserted;
        self.skipped_missing_observed += other.skipped_missing_observed;
    }
}

/// Envelope shared by both endpoints. Extra fields (e.g. `rows` when
/// `return_rows` is set) are ignored.
#[derive(Debug, Deserialize)]
struct ApiResponse<C> {
    #[serde(default)]
    ok: bool,
    counts: Option<C>,
    error: Option<String>,
}

// =============================================================================
// Transport seam
// =============================================================================

/// The two calls of the import protocol.
#[allow(async_fn_in_trait)]
pub trait ImportApi {
    async fn check(&self, request: &CheckRequest<'_>) -> Result<CheckCounts, UploadError>;
    async fn upsert_lines(&self, request: &LinesRequest<'_>) -> Result<LinesCounts, UploadError>;
}

/// Real transport: JSON over HTTP(S) POST.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    check_url: String,
    lines_url: String,
}

impl HttpApi {
    pub fn new(config: &UploaderConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("ap308-uploader/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            check_url: config.check_url(),
            lines_url: config.lines_url(),
        })
    }

    async fn post<B: Serialize, C: DeserializeOwned>(&self, url: &str, body: &B) -> Result<C, UploadError> {
        let resp = self.client.post(url).json(body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!(url, status = status.as_u16(), bytes = text.len(), "api response");

        interpret_response(status.as_u16(), status.is_success(), &text)
    }
}

/// Map status + body to counts or an error.
fn interpret_response<C: DeserializeOwned>(status: u16, success: bool, body: &str) -> Result<C, UploadError> {
    let http_message = || format!("HTTP {}", status);

    match serde_json::from_str::<ApiResponse<C>>(body) {
        Ok(parsed) if success && parsed.ok => parsed.counts.ok_or_else(|| UploadError::Decode {
            status,
            message: "missing \"counts\"".to_string(),
        }),
        Ok(parsed) => Err(UploadError::Api {
            status,
            message: parsed.error.unwrap_or_else(http_message),
        }),
        Err(_) if !success => Err(UploadError::Api {
            status,
            message: http_message(),
        }),
        Err(e) => Err(UploadError::Decode {
            status,
            message: e.to_string(),
        }),
    }
}

impl ImportApi for HttpApi {
    async fn check(&self, request: &CheckRequest<'_>) -> Result<CheckCounts, UploadError> {
        self.post(&self.check_url, request).await
    }

    async fn upsert_lines(&self, request: &LinesRequest<'_>) -> Result<LinesCounts, UploadError> {
        self.post(&self.lines_url, request).await
    }
}

/// Rehearsal transport: no network, counts mirror the row counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunApi;

impl ImportApi for DryRunApi {
    async fn check(&self, request: &CheckRequest<'_>) -> Result<CheckCounts, UploadError> {
        let n = request.rows.len() as u64;
        Ok(CheckCounts {
            inserted: n,
            observed_new: n,
            ..CheckCounts::default()
        })
    }

    async fn upsert_lines(&self, request: &LinesRequest<'_>) -> Result<LinesCounts, UploadError> {
        Ok(LinesCounts {
            upserted: request.rows.len() as u64,
            ..LinesCounts::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap308_ingest::{assign_stable_rows, Field, RowIdentity, SortMode};

    fn units() -> Vec<UploadUnit> {
        let mut r = NormalizedRecord::default();
        r.set(Field::VendNo, Some("V1".into()));
        r.set(Field::NetAmount, Some("10.00".into()));
        let id = RowIdentity::compute(&r);
        assign_stable_rows("2024-06", "a.csv", vec![(r, id)], SortMode::Default)
    }

    // -------------------------------------------------------------------------
    // WIRE SHAPES
    // -------------------------------------------------------------------------

    #[test]
    fn test_check_request_carries_identity_only() {
        let units = units();
        let req = CheckRequest::new("2024-06", "a.csv", false, &units);
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["source_folder"], "2024-06");
        assert_eq!(json["source_file"], "a.csv");
        assert_eq!(json["return_rows"], false);
        let row = json["rows"][0].as_object().unwrap();
        let mut keys: Vec<&str> = row.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["anchor_hash", "content_hash", "source_row_key", "stable_row_num"]);
        assert_eq!(row["stable_row_num"], 1);
    }

    #[test]
    fn test_lines_request_carries_data() {
        let units = units();
        let req = LinesRequest::new(true, &units);
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["return_rows"], true);
        assert_eq!(json["rows"][0]["anchor_hash"], units[0].anchor_hash.as_str());
        assert_eq!(json["rows"][0]["data"]["vend_no"], "V1");
        assert_eq!(json["rows"][0]["data"]["net_amount"], "10.00");
        assert!(json["rows"][0]["data"]["po_no"].is_null());
    }

    // -------------------------------------------------------------------------
    // RESPONSE INTERPRETATION
    // -------------------------------------------------------------------------

    #[test]
    fn test_interpret_ok_response() {
        let body = r#"{"ok":true,"counts":{"inserted":2,"changed":1,"unchanged":0,"observed_new":3,"observed_already_seen":0}}"#;
        let counts: CheckCounts = interpret_response(200, true, body).unwrap();
        assert_eq!(counts.inserted, 2);
        assert_eq!(counts.observed_new, 3);
    }

    #[test]
    fn test_interpret_ok_false_uses_error_message() {
        let body = r#"{"ok":false,"error":"batch too large"}"#;
        let err = interpret_response::<LinesCounts>(200, true, body).unwrap_err();
        assert_eq!(err.to_string(), "batch too large");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_interpret_non_2xx_without_json() {
        let err = interpret_response::<LinesCounts>(502, false, "<html>Bad Gateway</html>").unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_interpret_non_2xx_with_error_field() {
        let err = interpret_response::<LinesCounts>(403, false, r#"{"ok":false,"error":"forbidden"}"#).unwrap_err();
        assert!(matches!(err, UploadError::Api { status: 403, .. }));
        assert_eq!(err.to_string(), "forbidden");
    }

    #[test]
    fn test_interpret_2xx_garbage_is_decode_error() {
        let err = interpret_response::<CheckCounts>(200, true, "Warning: mysqli...").unwrap_err();
        assert!(matches!(err, UploadError::Decode { status: 200, .. }));
    }

    // -------------------------------------------------------------------------
    // DRY RUN
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_dry_run_synthesizes_counts() {
        let units = units();
        let check = DryRunApi.check(&CheckRequest::new("f", "a.csv", false, &units)).await.unwrap();
        assert_eq!(check, CheckCounts { inserted: 1, observed_new: 1, ..Default::default() });

        let lines = DryRunApi.upsert_lines(&LinesRequest::new(false, &units)).await.unwrap();
        assert_eq!(lines.upserted, 1);
    }
}
