//! REST API server demo
//!
//! Runs batch-dl with the REST API enabled so a browser UI (or curl) can drive
//! sessions.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:3000/swagger-ui
//! - Upload cookies via PUT http://localhost:3000/api/v1/cookies/instagram
//! - Start a session via POST http://localhost:3000/api/v1/download/start
//! - Stream events via GET http://localhost:3000/api/v1/events
//!
//! Set `RUST_LOG=batch_dl=debug` for per-process logging.

use batch_dl::config::{ApiConfig, Config, PersistenceConfig, ServerIntegrationConfig};
use batch_dl::{BatchDownloader, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("batch_dl=info")),
        )
        .init();

    let config = Config {
        persistence: PersistenceConfig {
            data_dir: "data".into(),
            database_path: "data/archive.db".into(),
            download_dir: "downloads".into(),
        },
        server: ServerIntegrationConfig {
            api: ApiConfig {
                bind_address: "127.0.0.1:3000".parse()?,
                cors_enabled: true,
                cors_origins: vec!["*".to_string()],
                swagger_ui: true,
            },
        },
        ..Default::default()
    };

    let downloader = Arc::new(BatchDownloader::new(config).await?);
    let api = downloader.spawn_api_server();

    println!("batch-dl REST API");
    println!("  Swagger UI:    http://localhost:3000/swagger-ui");
    println!("  API base:      http://localhost:3000/api/v1");
    println!("  Events stream: http://localhost:3000/api/v1/events");
    println!();
    println!("Example commands:");
    println!("  curl -X PUT http://localhost:3000/api/v1/cookies/instagram \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d \"{{\\\"content\\\": $(jq -Rs . < cookies.txt)}}\"");
    println!();
    println!("  curl -X POST http://localhost:3000/api/v1/download/start \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"usernames\": \"nasa, esa\", \"batchSize\": 2}}'");
    println!();
    println!("  curl -N http://localhost:3000/api/v1/events");

    // Stops any running session on SIGINT/SIGTERM
    run_with_shutdown((*downloader).clone()).await?;
    api.abort();

    Ok(())
}
