//! Discovery messages and producer-side plumbing.
//!
//! Enumerators run as separate tasks and feed the coordinator through a
//! bounded channel; a full channel suspends the producer, which is the
//! engine's registration backpressure. Dropping the sender signals
//! "enumeration finished".

use crate::error::SyncError;
use crate::key::ObjectKey;
use crate::queue::Locator;
use crate::signal::SignalState;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One message from an enumerator to the coordinator.
#[derive(Debug)]
pub(crate) enum Discovery {
    /// A new item to register.
    Item { key: ObjectKey, locator: Locator },
    /// A local filename that cannot become a key (restore only).
    NonUtf8Name { parent: String, raw: Vec<u8> },
    /// One listing attempt failed; counts toward the error breaker.
    ListingError { error: SyncError },
    /// Listing retries are exhausted; the run must abort.
    ListingFailed { error: SyncError },
}

/// Sends a discovery, suspending while the channel is full.
///
/// Returns false when the producer should stop: registration was halted
/// or the coordinator went away.
pub(crate) async fn send_discovery(
    tx: &mpsc::Sender<Discovery>,
    signals: &SignalState,
    discovery: Discovery,
) -> bool {
    loop {
        if signals.register_stopped() {
            return false;
        }
        tokio::select! {
            permit = tx.reserve() => {
                return match permit {
                    Ok(permit) => {
                        permit.send(discovery);
                        true
                    }
                    Err(_) => false,
                };
            }
            _ = signals.changed() => {}
        }
    }
}

/// Feeds a caller-supplied key list, bypassing traversal.
///
/// Used for fill workflows ("retry everything a previous run ignored").
/// Keys are registered in the order given; the caller is responsible
/// for sorting when resume semantics matter.
pub(crate) async fn run_explicit(
    keys: Vec<String>,
    signals: Arc<SignalState>,
    tx: mpsc::Sender<Discovery>,
) {
    for key in keys {
        let discovery = Discovery::Item {
            key: ObjectKey::new(key),
            locator: Locator::FromKey,
        };
        if !send_discovery(&tx, &signals, discovery).await {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn explicit_feed_preserves_order() {
        let signals = Arc::new(SignalState::default());
        let (tx, mut rx) = mpsc::channel(1);

        let feed = tokio::spawn(run_explicit(
            vec!["b".into(), "a".into()],
            Arc::clone(&signals),
            tx,
        ));

        let mut keys = Vec::new();
        while let Some(discovery) = rx.recv().await {
            if let Discovery::Item { key, .. } = discovery {
                keys.push(key.as_str().to_string());
            }
        }
        feed.await.unwrap();
        assert_eq!(keys, ["b", "a"]);
    }

    #[tokio::test]
    async fn send_stops_after_quit() {
        let signals = Arc::new(SignalState::default());
        let (tx, _rx) = mpsc::channel(1);
        signals.quit();

        let sent = send_discovery(
            &tx,
            &signals,
            Discovery::Item {
                key: ObjectKey::new("a"),
                locator: Locator::FromKey,
            },
        )
        .await;
        assert!(!sent);
    }

    #[tokio::test]
    async fn blocked_send_wakes_on_abort() {
        let signals = Arc::new(SignalState::default());
        let (tx, _rx) = mpsc::channel(1);

        // Fill the only slot so the next send suspends.
        assert!(
            send_discovery(
                &tx,
                &signals,
                Discovery::NonUtf8Name {
                    parent: String::new(),
                    raw: vec![0xff],
                }
            )
            .await
        );

        let blocked = {
            let signals = Arc::clone(&signals);
            tokio::spawn(async move {
                send_discovery(
                    &tx,
                    &signals,
                    Discovery::Item {
                        key: ObjectKey::new("a"),
                        locator: Locator::FromKey,
                    },
                )
                .await
            })
        };
        tokio::task::yield_now().await;
        signals.abort();
        assert!(!blocked.await.unwrap());
    }
}
