//! Wires the store, service and listener together.

use std::sync::Arc;

use anyhow::Context;

use filemirror_file_store::FileStore;
use filemirror_service::{Server, TransferService};

use crate::config::Config;

/// Runs the server until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = FileStore::open(&config.uploads_dir)
        .await
        .with_context(|| format!("creating {}", config.uploads_dir.display()))?;

    let server = Server::new(config.listen.clone(), TransferService::new(store));
    let listener = server
        .bind()
        .await
        .with_context(|| format!("binding {}", config.listen))?;

    let serve = Arc::clone(&server);
    let handle = tokio::spawn(async move { serve.serve(listener).await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    server.shutdown();

    handle.await??;
    Ok(())
}
