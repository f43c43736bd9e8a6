//! Webhook dispatch worker.
//!
//! Listens to every topic of the event bus, looks up the hooks the game
//! registered for the event kind and posts the payload to each rendered URL.
//! Store lookups run on the blocking pool since stores are synchronous. Every
//! post runs in its own task; failures are logged and dropped, never
//! retried. On shutdown, events already buffered are still dispatched and
//! in-flight posts are awaited.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::events::HookEvent;
use crate::hooks::render_url;
use crate::repository::{EntityStore, Hook, RepositoryError};

/// Commands accepted by the dispatcher
pub enum Command {
    /// Drain buffered events, wait for pending posts, then stop
    Shutdown,
}

/// Background worker that posts webhooks for committed changes
pub struct HookDispatcher<S> {
    store: Arc<S>,
    client: reqwest::Client,
    events: broadcast::Receiver<HookEvent>,
    command_rx: mpsc::Receiver<Command>,
    in_flight: JoinSet<()>,
}

impl<S: EntityStore + 'static> HookDispatcher<S> {
    /// Builds the worker and its HTTP client.
    pub fn new(
        store: Arc<S>,
        events: broadcast::Receiver<HookEvent>,
        command_rx: mpsc::Receiver<Command>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            store,
            client,
            events,
            command_rx,
            in_flight: JoinSet::new(),
        })
    }

    /// Main worker loop
    pub async fn run(mut self) {
        info!("HookDispatcher started");

        loop {
            tokio::select! {
                biased;

                event = self.events.recv() => {
                    match event {
                        Ok(event) => self.handle_event(event).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("HookDispatcher lagged behind, {} events were not dispatched", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("Event bus closed, shutting down HookDispatcher");
                            break;
                        }
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown) => {
                            info!("Shutdown command received");
                            self.drain().await;
                            break;
                        }
                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }

                Some(_) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {}
            }
        }

        while self.in_flight.join_next().await.is_some() {}
        info!("HookDispatcher stopped");
    }

    /// Dispatches whatever the bus still buffers for this receiver.
    async fn drain(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle_event(event).await,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("HookDispatcher lagged behind, {} events were not dispatched", skipped);
                }
                Err(_) => break,
            }
        }
    }

    async fn handle_event(&mut self, event: HookEvent) {
        let hooks = match self.hooks_for(&event).await {
            Ok(Ok(hooks)) => hooks,
            Ok(Err(e)) => {
                error!("Failed to load hooks for {} in game {}: {}", event.kind, event.game, e);
                return;
            }
            Err(e) => {
                error!("Hook lookup task for {} in game {} failed: {}", event.kind, event.game, e);
                return;
            }
        };
        if hooks.is_empty() {
            debug!("No hooks registered for {} in game {}", event.kind, event.game);
            return;
        }

        for hook in hooks {
            let url = render_url(&hook.url, &event.payload);
            let client = self.client.clone();
            let payload = event.payload.clone();
            let kind = event.kind;
            self.in_flight.spawn(async move {
                match client.post(&url).json(&payload).send().await {
                    Ok(response) if response.status().is_success() => {
                        debug!("Hook {} ({}) delivered to {}", hook.public_id, kind, url);
                    }
                    Ok(response) => {
                        warn!(
                            "Hook {} ({}) to {} answered with status {}",
                            hook.public_id,
                            kind,
                            url,
                            response.status()
                        );
                    }
                    Err(e) => {
                        warn!("Hook {} ({}) to {} failed: {}", hook.public_id, kind, url, e);
                    }
                }
            });
        }
    }

    async fn hooks_for(
        &self,
        event: &HookEvent,
    ) -> Result<Result<Vec<Hook>, RepositoryError>, JoinError> {
        let store = Arc::clone(&self.store);
        let game = event.game.clone();
        let kind = event.kind;

        tokio::task::spawn_blocking(move || {
            store.transaction(|tx| {
                let Some(game) = tx.game_by_public_id(&game)? else {
                    return Ok(Vec::new());
                };
                tx.hooks(game.id, Some(kind))
            })
        })
        .await
    }
}
