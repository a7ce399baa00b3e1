//! Debounced, cancellable lint runs per document.
//!
//! Each document is idle, pending (a debounce timer is armed) or running (a
//! lint task holds a cancellation token). A new request while pending
//! re-arms the timer; when the timer fires the previous run of that document
//! is cancelled before the new one is registered. All bookkeeping happens
//! under one lock, so a timer firing concurrently with a re-arm is resolved
//! by the generation counter rather than by timing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::Url;

use crate::lint::{EventSet, EventType, LintReport, Linter, Notifier};
use crate::uri;

struct Pending {
    generation: u64,
    events: EventSet,
    timer: JoinHandle<()>,
}

struct Running {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct State {
    next_generation: u64,
    pending: HashMap<Url, Pending>,
    running: HashMap<Url, Running>,
}

/// Schedules lint runs and publishes their diagnostics.
#[derive(Clone)]
pub struct LintScheduler {
    linter: Linter,
    notifier: Arc<dyn Notifier>,
    state: Arc<Mutex<State>>,
}

impl LintScheduler {
    pub fn new(linter: Linter, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            linter,
            notifier,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn linter(&self) -> &Linter {
        &self.linter
    }

    /// Request a lint of `uri` once no other request arrived for `debounce`.
    pub async fn schedule(&self, uri: &Url, event: EventType, debounce: Duration) {
        let uri = uri::normalize(uri);
        let mut state = self.state.lock().await;

        let mut events = EventSet::from(event);
        if let Some(previous) = state.pending.remove(&uri) {
            previous.timer.abort();
            log::trace!("lint of {uri} debounced: {debounce:?}");
            events = previous.events;
            events.insert(event);
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let this = self.clone();
        let timer_uri = uri.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            this.fire(timer_uri, generation).await;
        });
        state.pending.insert(uri, Pending { generation, events, timer });
    }

    async fn fire(&self, uri: Url, generation: u64) {
        let (events, cancel) = {
            let mut state = self.state.lock().await;
            // re-armed or cancelled since this timer was started
            if state.pending.get(&uri).is_none_or(|p| p.generation != generation) {
                return;
            }
            let Some(pending) = state.pending.remove(&uri) else {
                return;
            };

            if let Some(previous) = state.running.remove(&uri) {
                log::debug!("cancelling previous lint of {uri}");
                previous.cancel.cancel();
            }
            let cancel = CancellationToken::new();
            state.running.insert(
                uri.clone(),
                Running {
                    generation,
                    cancel: cancel.clone(),
                },
            );
            (pending.events, cancel)
        };

        self.run(&uri, events, generation, &cancel).await;
    }

    async fn run(&self, uri: &Url, events: EventSet, generation: u64, cancel: &CancellationToken) {
        let result = self
            .linter
            .lint_document(cancel, uri, events, self.notifier.as_ref())
            .await;

        // Publishing under the lock keeps a superseded run from publishing
        // after its successor was registered.
        let mut state = self.state.lock().await;
        match result {
            Ok(Some(report)) if !cancel.is_cancelled() => self.publish(uri, report).await,
            Ok(_) => log::debug!("lint of {uri} cancelled"),
            Err(e) => log::error!("lint of {uri} failed: {e}"),
        }
        if state.running.get(uri).is_some_and(|r| r.generation == generation) {
            state.running.remove(uri);
        }
    }

    async fn publish(&self, uri: &Url, report: LintReport) {
        let documents = &self.linter.session().documents;
        for (target, diagnostics) in report.diagnostics {
            let version = if &target == uri {
                Some(report.version)
            } else {
                documents.version(&target).await
            };
            self.notifier.publish_diagnostics(target, diagnostics, version).await;
        }
    }

    /// Drop any pending or running lint of `uri`.
    pub async fn cancel(&self, uri: &Url) {
        let uri = uri::normalize(uri);
        let mut state = self.state.lock().await;
        if let Some(pending) = state.pending.remove(&uri) {
            pending.timer.abort();
        }
        if let Some(running) = state.running.remove(&uri) {
            running.cancel.cancel();
        }
    }

    /// Stop every timer and every run.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        for (_, pending) in state.pending.drain() {
            pending.timer.abort();
        }
        for (_, running) in state.running.drain() {
            running.cancel.cancel();
        }
    }

    /// Number of documents with an armed timer or a run in flight.
    pub async fn active(&self) -> usize {
        let state = self.state.lock().await;
        state.pending.len() + state.running.len()
    }
}
