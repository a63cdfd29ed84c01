use crate::storage::StorageBackend;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub(crate) enum Command {
    Save { key: String, state: Value },
    Flush(oneshot::Sender<()>),
}

/// Await queued saves one at a time until every sender is gone.
pub(crate) async fn run(
    storage: Arc<dyn StorageBackend>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Save { key, state } => {
                if let Err(e) = storage.save(&key, &state).await {
                    warn!(key = %key, error = %e, "failed to save persisted slice");
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("persist writer stopped");
}
