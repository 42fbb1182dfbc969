//! Stockroom server: serves the configured collections over HTTP.
//!
//! `stockroom-server` serves; `stockroom-server export <dir>` writes one JSON
//! snapshot per collection into `<dir>` and exits.

use stockroom::{app, load_model, write_snapshots, AppState, Settings};
use std::path::Path;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("stockroom=info,stockroom_server=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let model = load_model(&settings)?;
    tracing::info!(
        data_dir = %settings.data_dir.display(),
        collections = model.collections.len(),
        "collections resolved"
    );
    let state = AppState::new(model);

    let mut args = std::env::args().skip(1);
    if let Some(cmd) = args.next() {
        if cmd != "export" {
            return Err(format!("unknown command '{}'; expected 'export <dir>'", cmd).into());
        }
        let dir = args.next().ok_or("export needs a target directory")?;
        let collections = state.collections.clone();
        let written = tokio::task::spawn_blocking(move || write_snapshots(collections.iter(), Path::new(&dir))).await??;
        tracing::info!(files = written, "export finished");
        return Ok(());
    }

    let router = app(state, &settings);
    let listener = TcpListener::bind(settings.bind_addr()).await?;
    tracing::info!("Stockroom listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
