//! Remote listener: feeds store change events into the editor.

use std::sync::Arc;

use rolematch_backend::Subscription;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::editor::RemoteOutcome;
use crate::handle::Shared;

/// Spawn the listener. It ends when the store's feed closes or the task is
/// aborted; dropping the subscription with it unsubscribes.
pub(crate) fn spawn(shared: Arc<Shared>, mut sub: Subscription) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = sub.recv().await {
            let span = tracing::info_span!(
                "remote.apply",
                key = %event.key(),
                version = event.version(),
            );
            span.in_scope(|| {
                match shared.update(|editor| editor.apply_remote(&event.document)) {
                    RemoteOutcome::Adopted => info!(
                        author = event.document.updated_by.as_ref().map(|p| p.email.as_str()),
                        "adopted foreign update"
                    ),
                    RemoteOutcome::Stale => debug!("ignored stale update"),
                    RemoteOutcome::OwnEcho => trace!("ignored own write"),
                }
            });
        }
        debug!(key = %sub.key(), "change feed closed");
    })
}
