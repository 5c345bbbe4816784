use crate::service::WalletService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Periodically re-sync every tracked address until `shutdown` fires.
pub async fn start_polling(service: Arc<WalletService>, poll_interval: Duration, shutdown: CancellationToken) {
    info!("Starting address polling every {:?}", poll_interval);

    let mut ticker = interval(poll_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let synced = poll_tracked_addresses(&service, &shutdown).await;
                debug!("Polling round finished: {} addresses synced", synced);
            }
            _ = shutdown.cancelled() => {
                info!("Shutting down address polling");
                break;
            }
        }
    }
}

/// One round over all tracked addresses. Addresses are synced one after
/// another since they all draw on the same provider quota; a failing address
/// is logged and skipped.
pub async fn poll_tracked_addresses(service: &WalletService, shutdown: &CancellationToken) -> usize {
    let addresses = match service.tracked_addresses().await {
        Ok(addresses) => addresses,
        Err(e) => {
            error!("Failed to get tracked addresses: {}", e);
            return 0;
        }
    };

    let mut synced = 0;
    for address in addresses {
        if shutdown.is_cancelled() {
            break;
        }

        match service.sync(&address).await {
            Ok(outcome) => {
                synced += 1;
                if !outcome.new_transactions.is_empty() {
                    info!("Polled {}: {} new transactions", address, outcome.new_transactions.len());
                }
            }
            Err(e) => error!("Error syncing {}: {}", address, e),
        }
    }

    synced
}
