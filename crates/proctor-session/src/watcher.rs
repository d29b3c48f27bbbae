//! Polls a document file and autosaves it into a running session.

use std::path::{Path, PathBuf};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use proctor_core::session::TICK_INTERVAL;

use crate::{DriverError, SessionHandle};

/// Autosave `path` into the session whenever its contents change.
///
/// Polls once per tick until the session stops. Returns the last contents
/// read, which is what a caller should submit.
pub async fn watch_document(path: PathBuf, handle: SessionHandle) -> Option<String> {
    let cancel = handle.cancellation_token();
    let mut ticker = interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last: Option<String> = None;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(current) = read_document(&path).await else {
                    continue;
                };
                if last.as_deref() == Some(current.as_str()) {
                    continue;
                }
                let bytes = current.len();
                let result = handle.autosave(current.clone(), None).await;
                last = Some(current);
                match result {
                    Ok(_) => debug!(bytes, "document autosaved"),
                    Err(DriverError::Closed) => break,
                    Err(e) => warn!("autosave rejected: {e}"),
                }
            }
        }
    }

    last
}

async fn read_document(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("failed to read {}: {e}", path.display());
            None
        }
    }
}
