//! High-level runtime orchestrator.
//!
//! The runtime owns the clan service, the event bus it publishes to and the
//! webhook dispatcher listening on that bus.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::error::{Result, ServiceError};
use crate::events::{EventBus, HookEvent, Topic};
use crate::repository::EntityStore;
use crate::service::{ClanService, Clock};
use crate::workers::{Command, HookDispatcher};

/// Main runtime that serves clan operations
///
/// [`ClanService`] is cloneable and can be shared across tasks; the runtime
/// keeps the background dispatcher alive until [`ClanRuntime::shutdown`].
pub struct ClanRuntime<S> {
    service: ClanService<S>,
    bus: EventBus,

    // Background workers
    dispatcher: Option<(mpsc::Sender<Command>, JoinHandle<()>)>,
}

impl<S: EntityStore + 'static> ClanRuntime<S> {
    /// Create a new runtime builder over `store`
    pub fn builder(store: S) -> ClanRuntimeBuilder<S> {
        ClanRuntimeBuilder::new(store)
    }

    pub fn service(&self) -> &ClanService<S> {
        &self.service
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.service.config()
    }

    /// Subscribe to committed changes of one topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<HookEvent> {
        self.bus.subscribe(topic)
    }

    /// Subscribe to every committed change
    pub fn subscribe_all(&self) -> broadcast::Receiver<HookEvent> {
        self.bus.subscribe_all()
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Stops the dispatcher and waits for it to exit.
    pub async fn shutdown(self) -> Result<()> {
        let Some((command_tx, handle)) = self.dispatcher else {
            return Ok(());
        };

        if command_tx.send(Command::Shutdown).await.is_err() {
            debug!("HookDispatcher already stopped");
        }
        handle.await.map_err(ServiceError::WorkerJoin)?;

        info!("Clan runtime shut down");
        Ok(())
    }
}

/// Builder for [`ClanRuntime`].
pub struct ClanRuntimeBuilder<S> {
    store: S,
    config: RuntimeConfig,
    clock: Option<Arc<dyn Clock>>,
}

impl<S: EntityStore + 'static> ClanRuntimeBuilder<S> {
    fn new(store: S) -> Self {
        Self {
            store,
            config: RuntimeConfig::default(),
            clock: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the wall clock used for timestamps and cooldowns
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Enable or disable the webhook dispatcher
    pub fn dispatch_hooks(mut self, enable: bool) -> Self {
        self.config.dispatch_hooks = enable;
        self
    }

    /// Build the runtime.
    ///
    /// Spawns the dispatcher when enabled, so this must run inside a tokio
    /// runtime.
    pub async fn build(self) -> Result<ClanRuntime<S>> {
        let store = Arc::new(self.store);
        let bus = EventBus::with_capacity(self.config.event_buffer_size);

        let dispatcher = if self.config.dispatch_hooks {
            let (command_tx, command_rx) = mpsc::channel::<Command>(8);
            let worker = HookDispatcher::new(
                Arc::clone(&store),
                bus.subscribe_all(),
                command_rx,
                self.config.hook_timeout,
            )
            .map_err(ServiceError::HttpClient)?;

            let handle = tokio::spawn(async move {
                worker.run().await;
            });
            Some((command_tx, handle))
        } else {
            None
        };

        let mut service =
            ClanService::new(store, Arc::new(bus.clone())).with_config(self.config);
        if let Some(clock) = self.clock {
            service = service.with_clock(clock);
        }

        Ok(ClanRuntime {
            service,
            bus,
            dispatcher,
        })
    }
}
