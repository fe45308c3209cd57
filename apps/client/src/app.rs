//! Runs one command, then keeps mirroring until Ctrl-C.

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use filemirror_sync::{SyncClient, SyncError, SyncService, SyncState};
use filemirror_transfer::FileClient;

use crate::Command;
use crate::config::Config;

pub async fn run(config: Config, command: Command) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.downloads_dir)
        .await
        .with_context(|| format!("creating {}", config.downloads_dir.display()))?;

    let client = SyncClient::new(FileClient::new(config.server.clone()), &config.downloads_dir);
    let cancel = CancellationToken::new();

    let watch = config.watch || command == Command::Watch;
    let mut sync = None;
    if watch {
        let mut service =
            SyncService::with_cancel(&config.downloads_dir, client.clone(), cancel.clone());
        match service.start() {
            Ok(()) => sync = Some(service),
            Err(e) => tracing::error!("could not watch {}: {e}", config.downloads_dir.display()),
        }
    }

    if let Err(e) = execute(&client, &command).await {
        tracing::error!(kind = %e.kind(), "{e}");
    }

    let Some(mut service) = sync else {
        return Ok(());
    };

    tracing::info!("mirroring {}; press Ctrl-C to stop", service.dir().display());
    let mut states = service.subscribe();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("shutdown requested");
        }
        _ = states.wait_for(|s| *s == SyncState::Stopped) => {
            tracing::warn!("mirroring stopped");
        }
    }
    service.stop().await;
    Ok(())
}

async fn execute(client: &SyncClient, command: &Command) -> Result<(), SyncError> {
    match command {
        Command::Upload { file, name } => {
            let ack = client.upload(file, name).await?;
            tracing::info!(name = %ack.name, bytes = ack.bytes, "file uploaded");
        }
        Command::Download { file, path } => {
            let local = client.download_to(file, path).await?;
            tracing::info!(path = %local.display(), "file downloaded");
        }
        Command::Delete { file } => {
            let resp = client.delete(file).await?;
            tracing::info!("{}", resp.message);
        }
        Command::Rename { old, new } => {
            let resp = client.rename(old, new).await?;
            tracing::info!("{}", resp.message);
        }
        Command::List => {
            let list = client.list().await?;
            for f in &list.files {
                println!("{}\t{}", f.modification_time, f.file_name);
            }
            tracing::info!(count = list.files.len(), "listed remote files");
        }
        Command::Watch => {}
    }
    Ok(())
}
