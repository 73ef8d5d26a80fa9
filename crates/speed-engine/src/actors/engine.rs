//! `SpeedEngineActor` - owns the enforcer and drives every trigger.
//!
//! Each engine:
//! - Reads the persisted speed once, concurrently with enforcement and
//!   bounded by a timeout
//! - Runs a startup pass, then a pass on every poll tick
//! - Runs a pass on every batch of structural mutations
//! - Forces the rate of any media element that starts playing
//! - Answers `setSpeed`/`getSpeed` from the settings surface
//!
//! # Lifecycle
//!
//! 1. `spawn` creates the mailbox and starts the task
//! 2. The task runs the startup pass at the default speed and acquires the
//!    mutation and play subscriptions
//! 3. Runs until cancelled or every handle is dropped. The settings read is
//!    one more branch of the loop; when it lands the target is updated and a
//!    settings pass runs, unless a command already set the target
//! 4. On exit releases both subscriptions; the interval dies with the task

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use speed_core::enforcer::{SpeedEnforcer, Trigger};
use speed_core::errors::{ProtocolError, SpeedError, StoreError};
use speed_core::host::{DocumentHost, EventSink, HostEvent, Subscription};
use speed_core::observability::metrics;
use speed_core::protocol::{Request, Response};
use speed_core::store::SettingsStore;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::messages::{EngineMessage, EngineStatus};
use crate::config::Config;

/// The in-flight read of the persisted speed.
type SettingsLoad = Pin<Box<dyn Future<Output = Result<Option<f64>, StoreError>> + Send>>;

/// Handle to a running `SpeedEngineActor`.
#[derive(Clone, Debug)]
pub struct SpeedEngineHandle {
    sender: mpsc::Sender<EngineMessage>,
    cancel_token: CancellationToken,
}

impl SpeedEngineHandle {
    /// Send a decoded request and wait for the reply.
    ///
    /// # Errors
    ///
    /// Returns [`SpeedError::Stopped`] if the engine is no longer running.
    pub async fn request(&self, request: Request) -> Result<Response, SpeedError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineMessage::Request {
            request,
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| SpeedError::Stopped)
    }

    /// Send a raw JSON message (as received from the transport) and return
    /// the JSON reply.
    ///
    /// # Errors
    ///
    /// Returns [`SpeedError::Stopped`] if the engine is no longer running.
    /// Malformed messages are not errors; they get a `success: false` reply.
    pub async fn handle_json(&self, json: &str) -> Result<String, SpeedError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineMessage::RawMessage {
            json: json.to_string(),
            respond_to: tx,
        })
        .await?;
        let response = rx.await.map_err(|_| SpeedError::Stopped)?;
        Ok(response.to_json())
    }

    /// Set the target speed.
    ///
    /// # Errors
    ///
    /// Returns [`SpeedError::Protocol`] for a non-positive or non-finite
    /// speed, [`SpeedError::Stopped`] if the engine is gone.
    pub async fn set_speed(&self, speed: f64) -> Result<(), SpeedError> {
        match self.request(Request::SetSpeed { speed }).await? {
            Response::Ack { success: true } => Ok(()),
            _ => Err(ProtocolError::InvalidSpeed(speed).into()),
        }
    }

    /// Current target speed.
    ///
    /// # Errors
    ///
    /// Returns [`SpeedError::Stopped`] if the engine is gone.
    pub async fn get_speed(&self) -> Result<f64, SpeedError> {
        match self.request(Request::GetSpeed).await? {
            Response::Speed { speed } => Ok(speed),
            other => Err(SpeedError::Channel(format!("unexpected reply: {other:?}"))),
        }
    }

    /// Engine state snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SpeedError::Stopped`] if the engine is gone.
    pub async fn status(&self) -> Result<EngineStatus, SpeedError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineMessage::GetStatus { respond_to: tx }).await?;
        rx.await.map_err(|_| SpeedError::Stopped)
    }

    /// Stop the engine, releasing its timer, observer, and listener.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the engine has been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    async fn send(&self, message: EngineMessage) -> Result<(), SpeedError> {
        if self.is_stopped() {
            return Err(SpeedError::Stopped);
        }
        self.sender
            .send(message)
            .await
            .map_err(|_| SpeedError::Stopped)
    }
}

/// The `SpeedEngineActor` implementation.
pub struct SpeedEngineActor<H: DocumentHost, S: SettingsStore> {
    config: Config,
    host: Arc<H>,
    store: Arc<S>,
    /// Owns the target speed.
    enforcer: SpeedEnforcer,
    /// Command mailbox.
    receiver: mpsc::Receiver<EngineMessage>,
    /// Host events from the mutation and play subscriptions.
    events: mpsc::Receiver<HostEvent<H::Media>>,
    /// Cloned into every host sink.
    events_tx: mpsc::Sender<HostEvent<H::Media>>,
    events_dropped: Arc<AtomicU64>,
    mutation_watch: Option<Subscription>,
    play_intercept: Option<Subscription>,
    /// Pending settings read; `None` once it has resolved.
    settings_load: Option<SettingsLoad>,
    cancel_token: CancellationToken,
}

impl<H: DocumentHost, S: SettingsStore> SpeedEngineActor<H, S> {
    /// Spawn a new engine.
    ///
    /// Returns a handle and the task join handle. Cancelling `cancel_token`
    /// (or calling [`SpeedEngineHandle::stop`]) stops the engine.
    pub fn spawn(
        config: Config,
        host: Arc<H>,
        store: Arc<S>,
        cancel_token: CancellationToken,
    ) -> (SpeedEngineHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.command_buffer);
        let (events_tx, events) = mpsc::channel(config.event_buffer);

        let actor = Self {
            settings_load: Some(Self::load_settings(&config, Arc::clone(&store))),
            enforcer: SpeedEnforcer::new(config.enforcer_config()),
            config,
            host,
            store,
            receiver,
            events,
            events_tx,
            events_dropped: Arc::new(AtomicU64::new(0)),
            mutation_watch: None,
            play_intercept: None,
            cancel_token: cancel_token.clone(),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = SpeedEngineHandle {
            sender,
            cancel_token,
        };

        (handle, task_handle)
    }

    /// Run the actor loop.
    #[instrument(skip_all, name = "speed.engine")]
    async fn run(mut self) {
        info!(
            target: "speed.engine",
            poll_interval_ms = self.config.poll_interval.as_millis(),
            max_shadow_depth = ?self.config.max_shadow_depth,
            "Speed engine starting"
        );

        self.enforcer.run_pass(self.host.document(), Trigger::Startup);
        self.subscribe();

        let period = self.config.poll_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(target: "speed.engine", "Speed engine received cancellation signal");
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message),
                        None => {
                            debug!(
                                target: "speed.engine",
                                "All engine handles dropped, exiting"
                            );
                            break;
                        }
                    }
                }

                Some(event) = self.events.recv() => {
                    self.handle_events(event);
                }

                _ = ticker.tick() => {
                    self.enforcer.run_pass(self.host.document(), Trigger::Poll);
                }

                result = pending_load(&mut self.settings_load), if self.settings_load.is_some() => {
                    self.settings_load = None;
                    if self.enforcer.apply_stored_setting(result) {
                        self.enforcer.run_pass(self.host.document(), Trigger::Settings);
                    }
                }
            }
        }

        self.release();

        let stats = self.enforcer.stats();
        info!(
            target: "speed.engine",
            passes = stats.passes,
            writes = stats.writes,
            write_failures = stats.write_failures,
            "Speed engine stopped"
        );
    }

    fn load_settings(config: &Config, store: Arc<S>) -> SettingsLoad {
        let key = config.storage_key.clone();
        let timeout = config.store_timeout;
        Box::pin(async move {
            match tokio::time::timeout(timeout, store.load_speed(&key)).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Unavailable(format!(
                    "read timed out after {}ms",
                    timeout.as_millis()
                ))),
            }
        })
    }

    /// Acquire the mutation and play subscriptions. A subscription that
    /// cannot be acquired is logged; the poll trigger still covers the page.
    fn subscribe(&mut self) {
        match self.host.watch_mutations(self.sink("mutation")) {
            Ok(subscription) => self.mutation_watch = Some(subscription),
            Err(e) => warn!(
                target: "speed.engine",
                error = %e,
                "Mutation watch unavailable, relying on poll"
            ),
        }

        match self.host.intercept_play(self.sink("play")) {
            Ok(subscription) => self.play_intercept = Some(subscription),
            Err(e) => warn!(
                target: "speed.engine",
                error = %e,
                "Play interception unavailable, relying on poll"
            ),
        }

        debug!(
            target: "speed.engine",
            mutation_watch = self.mutation_watch.is_some(),
            play_intercept = self.play_intercept.is_some(),
            "Trigger subscriptions acquired"
        );
    }

    /// Host callback that enqueues without blocking.
    fn sink(&self, kind: &'static str) -> EventSink<H::Media> {
        let tx = self.events_tx.clone();
        let dropped = Arc::clone(&self.events_dropped);
        Arc::new(move |event| {
            if tx.try_send(event).is_err() {
                // Full: a pass is already pending. Closed: engine is stopping.
                dropped.fetch_add(1, Ordering::Relaxed);
                metrics::record_host_event_dropped(kind);
            }
        })
    }

    fn release(&mut self) {
        if let Some(subscription) = self.mutation_watch.take() {
            subscription.release();
        }
        if let Some(subscription) = self.play_intercept.take() {
            subscription.release();
        }
        debug!(target: "speed.engine", "Trigger subscriptions released");
    }

    fn handle_message(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::Request {
                request,
                respond_to,
            } => {
                let response = self.enforcer.handle_request(request, self.host.document());
                let _ = respond_to.send(response);
            }

            EngineMessage::RawMessage { json, respond_to } => {
                let response = self.enforcer.handle_message(&json, self.host.document());
                let _ = respond_to.send(response);
            }

            EngineMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(self.status());
            }
        }
    }

    /// Handle `first` plus everything already queued behind it. A burst of
    /// mutations collapses into one pass.
    fn handle_events(&mut self, first: HostEvent<H::Media>) {
        let mut mutated = false;
        let mut played = Vec::new();

        let mut next = Some(first);
        while let Some(event) = next {
            match event {
                HostEvent::Mutation => mutated = true,
                HostEvent::Play(element) => played.push(element),
            }
            next = self.events.try_recv().ok();
        }

        if mutated {
            self.enforcer.run_pass(self.host.document(), Trigger::Mutation);
        }

        for element in &played {
            self.enforcer.enforce_element(element, Trigger::Play);
        }
    }

    fn status(&self) -> EngineStatus {
        EngineStatus {
            target_rate: self.enforcer.target().rate(),
            mutation_watch_active: self.mutation_watch.is_some(),
            play_intercept_active: self.play_intercept.is_some(),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            settings_loaded: self.settings_load.is_none(),
            stats: self.enforcer.stats(),
        }
    }
}

async fn pending_load(load: &mut Option<SettingsLoad>) -> Result<Option<f64>, StoreError> {
    match load {
        Some(load) => load.await,
        None => std::future::pending().await,
    }
}
