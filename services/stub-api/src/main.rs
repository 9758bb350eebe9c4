//! Runs the in-memory import API for upload rehearsals.
//!
//! Point `config.json` at it:
//!   { "api": "http://127.0.0.1:8080" }

use anyhow::Context;
use ap308_ingest::logging;
use ap308_stub_api::{router, SharedLedger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init(false);

    let bind = std::env::var("STUB_API_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    println!("=== AP308 Stub Import API ===");
    println!("State: in-memory (lost on exit)");

    let app = router(SharedLedger::default());

    println!("API listening on http://{}", bind);
    println!("\nEndpoints:");
    println!("  GET  /health");
    println!("  POST /import/ap308/check.php");
    println!("  POST /import/ap308/lines/upsert.php");

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    axum::serve(listener, app).await?;

    Ok(())
}
