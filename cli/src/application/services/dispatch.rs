//! Concurrent dispatch of one action to many services, and the progress
//! sink that serializes their events.
//!
//! Each selected service gets its own blocking worker and its own session.
//! Workers never share state beyond the registry's resolution cache; every
//! event goes through a single consumer so lines from different services
//! never interleave mid-line.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::{JoinHandle, JoinSet};

use crate::application::ports::{Connector, EventRenderer, ProgressReporter};
use crate::application::services::lifecycle::Action;
use crate::application::services::registry::ServiceRegistry;
use crate::domain::ProgressEvent;

// ── Progress sink ─────────────────────────────────────────────────────────────

enum SinkMessage {
    Event(ProgressEvent),
    Stop,
}

/// Hands events to the sink. Cheap to clone, one per worker.
#[derive(Clone)]
pub struct ChannelReporter {
    tx: UnboundedSender<SinkMessage>,
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, event: ProgressEvent) {
        if self.tx.send(SinkMessage::Event(event)).is_err() {
            tracing::warn!("progress sink stopped, event dropped");
        }
    }
}

/// Single consumer that renders events in arrival order.
pub struct ProgressSink<R> {
    tx: UnboundedSender<SinkMessage>,
    handle: JoinHandle<R>,
}

impl<R: EventRenderer + Send + 'static> ProgressSink<R> {
    /// Spawn the consumer task. Must be called inside a tokio runtime.
    pub fn start(mut renderer: R) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    SinkMessage::Event(event) => renderer.render(&event),
                    SinkMessage::Stop => break,
                }
            }
            renderer
        });
        Self { tx, handle }
    }

    #[must_use]
    pub fn reporter(&self) -> ChannelReporter {
        ChannelReporter {
            tx: self.tx.clone(),
        }
    }

    /// Render everything reported so far, then stop and hand the renderer
    /// back.
    ///
    /// # Errors
    ///
    /// Returns an error if the consumer task panicked.
    pub async fn stop(self) -> Result<R> {
        // Events queued before the stop marker are rendered first.
        let _ = self.tx.send(SinkMessage::Stop);
        self.handle.await.context("progress sink task failed")
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// How one service's worker ended.
#[derive(Debug)]
pub struct WorkerOutcome {
    pub service: String,
    pub result: Result<()>,
}

/// Run `action` for every name in `names` concurrently and wait for all of
/// them. A failing service never affects the others.
pub async fn dispatch<C>(
    registry: Arc<ServiceRegistry<C>>,
    names: Vec<String>,
    action: Action,
    reporter: &ChannelReporter,
) -> Vec<WorkerOutcome>
where
    C: Connector + Send + Sync + 'static,
{
    let mut workers = JoinSet::new();
    for name in names {
        let registry = Arc::clone(&registry);
        let reporter = reporter.clone();
        workers.spawn_blocking(move || {
            tracing::debug!(service = %name, action = action.name(), "worker started");
            let result = catch_unwind(AssertUnwindSafe(|| {
                run_service(&registry, &name, action, &reporter)
            }))
            .unwrap_or_else(|_| {
                tracing::error!(service = %name, action = action.name(), "worker panicked");
                let message = format!("{} worker panicked", action.name());
                reporter.report(ProgressEvent::error(&name, message.clone()));
                Err(anyhow!(message))
            });
            tracing::debug!(service = %name, ok = result.is_ok(), "worker finished");
            WorkerOutcome {
                service: name,
                result,
            }
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(outcome) => {
                if let Err(e) = &outcome.result {
                    tracing::info!(service = %outcome.service, action = action.name(), error = %e, "service failed");
                }
                outcomes.push(outcome);
            }
            Err(e) => tracing::error!(error = %e, "service worker did not complete"),
        }
    }
    outcomes
}

fn run_service<C: Connector>(
    registry: &ServiceRegistry<C>,
    name: &str,
    action: Action,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let mut service = match registry.materialize(name) {
        Ok(service) => service,
        Err(e) => {
            reporter.report(ProgressEvent::error(name, format!("{e:#}")));
            return Err(e);
        }
    };
    action.perform(&mut service, reporter)
}
