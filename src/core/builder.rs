use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::{
    config::EngineConfig,
    control::{Command, ControlLoop},
    engine::Engine,
};
use crate::{
    error::EngineError,
    events::{Bus, EventKind},
    subscribers::{Subscribe, SubscriberSet},
};

const COMMAND_QUEUE: usize = 64;

/// Builder for constructing an [`Engine`] with event subscribers.
pub struct EngineBuilder {
    cfg: EngineConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive engine events (installs, worker lifecycle,
    /// failures, backoff) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Validates the config, spawns the control loop and returns its handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<Engine, EngineError> {
        self.cfg.validate()?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let listener = tokio::spawn(fan_out(bus.subscribe(), subs));

        let kill = CancellationToken::new();
        let (commands_tx, commands) = mpsc::channel::<Command>(COMMAND_QUEUE);
        let (done_tx, done) = watch::channel(None);

        let control = ControlLoop::new(self.cfg, bus.clone(), commands, kill.clone());
        tokio::spawn(async move {
            let result = control.run().await;
            let _ = listener.await;
            let _ = done_tx.send(Some(result));
        });

        Ok(Engine::from_parts(commands_tx, kill, bus, done))
    }
}

/// Forwards bus events to the subscriber set until `AllStopped`, then drains it.
async fn fan_out(mut rx: broadcast::Receiver<crate::events::Event>, subs: SubscriberSet) {
    loop {
        match rx.recv().await {
            Ok(ev) => {
                subs.emit(&ev);
                if ev.kind == EventKind::AllStopped {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    subs.shutdown().await;
}
