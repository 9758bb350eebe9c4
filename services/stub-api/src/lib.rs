//! Stub Import API - in-memory double of the AP308 import endpoints
//!
//! Endpoints:
//! - POST /import/ap308/check.php - record identities, report the diff
//! - POST /import/ap308/lines/upsert.php - store lines already observed
//! - GET /health - Health check
//!
//! Holds an observation ledger of every (anchor, content) pair seen, the
//! latest content per anchor, and the materialized lines. Nothing is
//! persisted; it exists to rehearse uploads and to test the uploader.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::debug;

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StoredLine {
    pub content_hash: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Default)]
pub struct Ledger {
    observations: HashSet<(String, String)>,
    anchors: HashMap<String, String>,
    lines: HashMap<String, StoredLine>,
    check_calls: usize,
    upsert_calls: usize,
}

impl Ledger {
    pub fn line(&self, anchor_hash: &str) -> Option<&StoredLine> {
        self.lines.get(anchor_hash)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    pub fn calls(&self) -> (usize, usize) {
        (self.check_calls, self.upsert_calls)
    }
}

pub type SharedLedger = Arc<Mutex<Ledger>>;

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct CheckRow {
    stable_row_num: u64,
    source_row_key: String,
    anchor_hash: String,
    content_hash: String,
}

#[derive(Debug, Deserialize)]
struct CheckBody {
    source_folder: String,
    source_file: String,
    #[serde(default)]
    return_rows: bool,
    rows: Vec<CheckRow>,
}

#[derive(Debug, Deserialize)]
struct LineRow {
    anchor_hash: String,
    content_hash: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct LinesBody {
    #[serde(default)]
    return_rows: bool,
    rows: Vec<LineRow>,
}

#[derive(Debug, Default, Serialize)]
struct CheckCounts {
    inserted: u64,
    changed: u64,
    unchanged: u64,
    observed_new: u64,
    observed_already_seen: u64,
}

#[derive(Debug, Default, Serialize)]
struct LinesCounts {
    upserted: u64,
    skipped_missing_observed: u64,
}

#[derive(Serialize)]
struct RowStatus {
    stable_row_num: u64,
    source_row_key: String,
    status: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

fn bad_request(rejection: JsonRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "error": rejection.body_text() })),
    )
        .into_response()
}

fn poisoned() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "ok": false, "error": "ledger unavailable" })),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn check_handler(
    State(ledger): State<SharedLedger>,
    body: Result<Json<CheckBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_request(rejection),
    };
    let Ok(mut ledger) = ledger.lock() else {
        return poisoned();
    };
    ledger.check_calls += 1;
    debug!(
        folder = %body.source_folder,
        file = %body.source_file,
        rows = body.rows.len(),
        "check"
    );

    let mut counts = CheckCounts::default();
    let mut statuses = Vec::new();
    for row in body.rows {
        let status = match ledger.anchors.get(&row.anchor_hash) {
            None => {
                counts.inserted += 1;
                "inserted"
            }
            Some(known) if *known != row.content_hash => {
                counts.changed += 1;
                "changed"
            }
            Some(_) => {
                counts.unchanged += 1;
                "unchanged"
            }
        };

        let pair = (row.anchor_hash.clone(), row.content_hash.clone());
        if ledger.observations.insert(pair) {
            counts.observed_new += 1;
        } else {
            counts.observed_already_seen += 1;
        }
        ledger.anchors.insert(row.anchor_hash, row.content_hash);

        if body.return_rows {
            statuses.push(RowStatus {
                stable_row_num: row.stable_row_num,
                source_row_key: row.source_row_key,
                status,
            });
        }
    }

    let mut response = json!({ "ok": true, "counts": counts });
    if body.return_rows {
        response["rows"] = json!(statuses);
    }
    Json(response).into_response()
}

async fn lines_handler(
    State(ledger): State<SharedLedger>,
    body: Result<Json<LinesBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_request(rejection),
    };
    let Ok(mut ledger) = ledger.lock() else {
        return poisoned();
    };
    ledger.upsert_calls += 1;

    let mut counts = LinesCounts::default();
    let mut statuses = Vec::new();
    for row in body.rows {
        let pair = (row.anchor_hash.clone(), row.content_hash.clone());
        let status = if ledger.observations.contains(&pair) {
            counts.upserted += 1;
            ledger.lines.insert(
                row.anchor_hash.clone(),
                StoredLine {
                    content_hash: row.content_hash,
                    data: row.data,
                },
            );
            "upserted"
        } else {
            counts.skipped_missing_observed += 1;
            "skipped_missing_observed"
        };

        if body.return_rows {
            statuses.push(json!({ "anchor_hash": row.anchor_hash, "status": status }));
        }
    }

    let mut response = json!({ "ok": true, "counts": counts });
    if body.return_rows {
        response["rows"] = json!(statuses);
    }
    Json(response).into_response()
}

// ============================================================================
// Router
// ============================================================================

pub fn router(ledger: SharedLedger) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/import/ap308/check.php", post(check_handler))
        .route("/import/ap308/lines/upsert.php", post(lines_handler))
        .layer(cors)
        .with_state(ledger)
}
