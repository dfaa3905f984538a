//! Startup helper that blocks until the chain client has caught up.

use std::time::Duration;

use crate::{Registry, Result};

/// Poll `is_syncing` once per interval until the chain reports in-sync.
///
/// The callback fires once per poll while the chain is still syncing; if the
/// very first poll already reports in-sync the callback is never invoked.
pub async fn wait_for_chain_sync<F>(
    registry: &dyn Registry,
    poll_interval: Duration,
    mut on_waiting: F,
) -> Result<()>
where
    F: FnMut() + Send,
{
    loop {
        if registry.is_syncing().await?.is_synced() {
            return Ok(());
        }
        on_waiting();
        tokio::time::sleep(poll_interval).await;
    }
}
