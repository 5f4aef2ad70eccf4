//! The single-writer coordinator: registration, dispatch, archiving.
//!
//! All mutable sync state - ledger, waiting queue, retry table,
//! counters - lives here and is touched by no other task. Concurrency
//! is expressed as spawned transfer tasks whose completions come back
//! over a channel and are applied serially, so none of the state needs
//! a lock.

use crate::enumerate::Discovery;
use crate::error::SyncError;
use crate::events::{EventSender, Progress, SyncEvent, SyncStats};
use crate::key::ObjectKey;
use crate::ledger::{Resolution, StatusLedger};
use crate::queue::{Locator, QueueItem, WaitingQueue};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::signal::SignalState;
use crate::transfer::{TaskOutcome, Transfer};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

/// Limits shared by both directions.
#[derive(Debug, Clone)]
pub(crate) struct RunLimits {
    /// Stop registering once this many items are registered.
    pub max_items: u64,
    /// Upper bound on concurrently running transfer tasks.
    pub max_concurrency: usize,
    /// Stop accepting discoveries while the waiting queue is this long.
    pub queue_limit: usize,
    /// Abort the run once this many failures accumulate.
    pub max_errors: u64,
    /// Per-item retry budget.
    pub max_retries: u32,
}

#[derive(Debug, Default)]
struct Counters {
    registered: u64,
    in_flight: u64,
    created: u64,
    ignored: u64,
    skipped: u64,
    errors: u64,
}

impl Counters {
    fn stats(&self) -> SyncStats {
        SyncStats {
            created: self.created,
            ignored: self.ignored,
            skipped: self.skipped,
            errors: self.errors,
        }
    }
}

pub(crate) struct Coordinator<T: Transfer> {
    limits: RunLimits,
    transfer: Arc<T>,
    ledger: StatusLedger,
    waiting: WaitingQueue,
    retries: RetryPolicy,
    counters: Counters,
    events: EventSender,
    signals: Arc<SignalState>,
    progress: watch::Sender<Progress>,
    outcome_tx: mpsc::UnboundedSender<TaskOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<TaskOutcome>,
}

impl<T: Transfer> Coordinator<T> {
    pub fn new(
        limits: RunLimits,
        transfer: Arc<T>,
        events: EventSender,
        signals: Arc<SignalState>,
        progress: watch::Sender<Progress>,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            retries: RetryPolicy::new(limits.max_retries),
            limits,
            transfer,
            ledger: StatusLedger::new(),
            waiting: WaitingQueue::new(),
            counters: Counters::default(),
            events,
            signals,
            progress,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Runs the sync to completion and returns the final stats.
    ///
    /// `discoveries` closing marks the end of enumeration. The loop
    /// exits when enumeration has finished and every registered item is
    /// archived, or when an abort has drained the in-flight work.
    pub async fn run(mut self, mut discoveries: mpsc::Receiver<Discovery>) -> SyncStats {
        let mut enumeration_done = false;

        loop {
            while self.dispatch_next() {}
            self.publish_progress();

            if self.counters.in_flight == 0 {
                if self.signals.dispatch_stopped() {
                    break;
                }
                if enumeration_done && self.ledger.is_empty() {
                    break;
                }
            }

            tokio::select! {
                discovery = discoveries.recv(),
                    if !enumeration_done && self.waiting.len() < self.limits.queue_limit =>
                {
                    match discovery {
                        Some(discovery) => self.handle_discovery(discovery),
                        None => enumeration_done = true,
                    }
                }
                outcome = self.outcome_rx.recv(), if self.counters.in_flight > 0 => {
                    if let Some(outcome) = outcome {
                        self.handle_outcome(outcome);
                    }
                }
            }
        }

        let stats = self.counters.stats();
        self.publish_progress();
        self.events.emit(SyncEvent::End { stats });
        debug!(
            created = stats.created,
            ignored = stats.ignored,
            skipped = stats.skipped,
            errors = stats.errors,
            unarchived = self.ledger.len(),
            "sync run finished"
        );
        stats
    }

    fn handle_discovery(&mut self, discovery: Discovery) {
        match discovery {
            Discovery::Item { key, locator } => self.register(key, locator),
            Discovery::NonUtf8Name { parent, raw } => {
                self.events.emit(SyncEvent::NonUtf8Name { parent, raw });
            }
            Discovery::ListingError { error } => {
                warn!(%error, "listing attempt failed");
                self.bump_errors();
            }
            Discovery::ListingFailed { error } => {
                error!(%error, "enumeration gave up, aborting run");
                self.signals.abort();
            }
        }
    }

    fn register(&mut self, key: ObjectKey, locator: Locator) {
        if self.signals.register_stopped() {
            return;
        }
        if self.counters.registered >= self.limits.max_items {
            debug!(limit = self.limits.max_items, "item limit reached, quitting");
            self.signals.quit();
            return;
        }
        self.ledger.register(key.clone());
        self.waiting.push_back(QueueItem { key, locator });
        self.counters.registered += 1;
    }

    fn dispatch_next(&mut self) -> bool {
        if self.signals.dispatch_stopped() {
            return false;
        }
        if self.counters.in_flight as usize >= self.limits.max_concurrency {
            return false;
        }
        let Some(item) = self.waiting.pop_front() else {
            return false;
        };

        self.ledger.mark_in_progress(&item.key);
        self.counters.in_flight += 1;

        let transfer = Arc::clone(&self.transfer);
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = transfer.run(&item.key, &item.locator).await;
            let _ = outcome_tx.send(TaskOutcome {
                key: item.key,
                locator: item.locator,
                result,
            });
        });
        true
    }

    fn handle_outcome(&mut self, outcome: TaskOutcome) {
        self.counters.in_flight -= 1;
        match outcome.result {
            Ok(resolution) => self.archive(outcome.key, resolution),
            Err(e) => self.on_item_error(outcome.key, outcome.locator, e),
        }
    }

    /// Records a terminal resolution; may advance the resume cursor.
    fn archive(&mut self, key: ObjectKey, resolution: Resolution) {
        match resolution {
            Resolution::Created => {
                self.counters.created += 1;
                self.events.emit(SyncEvent::Created { key: key.clone() });
            }
            Resolution::Ignored => {
                self.counters.ignored += 1;
                self.events.emit(SyncEvent::Ignored { key: key.clone() });
            }
            Resolution::Skipped => {
                self.counters.skipped += 1;
                self.events.emit(SyncEvent::Skipped { key: key.clone() });
            }
        }

        if let Some(cursor) = self.ledger.resolve(&key, resolution) {
            self.events.emit(SyncEvent::MoveOn { key: cursor });
        }
    }

    fn on_item_error(&mut self, key: ObjectKey, locator: Locator, error: SyncError) {
        match self.retries.on_failure(&key, error.is_retryable()) {
            RetryDecision::Retry { attempt } => {
                warn!(%key, %error, attempt, "transfer failed, retrying");
                self.ledger.reset_waiting(&key);
                self.waiting.push_front(QueueItem { key, locator });
                self.events.emit(SyncEvent::Warning {
                    error: error.to_string(),
                    stats: self.counters.stats(),
                });
            }
            RetryDecision::GiveUp => {
                error!(%key, %error, "transfer failed permanently");
                self.archive(key, Resolution::Ignored);
                self.events.emit(SyncEvent::Failed {
                    error: error.to_string(),
                    stats: self.counters.stats(),
                });
            }
        }
        self.bump_errors();
    }

    fn bump_errors(&mut self) {
        self.counters.errors += 1;
        if self.counters.errors >= self.limits.max_errors {
            warn!(errors = self.counters.errors, "error limit reached, aborting");
            self.signals.abort();
        }
    }

    fn publish_progress(&self) {
        self.progress.send_replace(Progress {
            registered: self.counters.registered,
            in_flight: self.counters.in_flight,
            waiting: self.waiting.len() as u64,
            stats: self.counters.stats(),
        });
    }
}
