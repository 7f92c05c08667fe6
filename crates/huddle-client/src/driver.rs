//! Async runtime around the session controller.
//!
//! The driver owns a [`SessionController`] and executes the actions it
//! returns: credential requests run as spawned tasks whose results come back
//! through the event queue, transport calls are awaited in order, and log
//! actions go to `tracing`.

use std::{collections::HashMap, sync::Arc};

use huddle_core::{
    Environment, IdentityStore, LogLevel, RoomEvent, SessionAction, SessionConfig, SessionController,
    SessionEvent, View,
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    error::DriverError,
    token::TokenIssuer,
    transport::{MediaTransport, RoomHandle, SessionHandle},
};

/// Runs one session to completion.
pub struct SessionDriver<E, S, I, T> {
    controller: SessionController<E, S>,
    env: E,
    issuer: Arc<I>,
    transport: T,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    view_tx: watch::Sender<View>,
    /// Credential requests and retry timers, keyed by generation.
    in_flight: HashMap<u64, JoinHandle<()>>,
}

impl<E, S, I, T> SessionDriver<E, S, I, T>
where
    E: Environment,
    S: IdentityStore,
    I: TokenIssuer,
    T: MediaTransport,
{
    /// Create a driver. Nothing happens until [`SessionDriver::run`].
    pub fn new(env: E, store: S, config: SessionConfig, issuer: I, transport: T) -> Self {
        let controller = SessionController::new(env.clone(), store, config);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (view_tx, _) = watch::channel(controller.view());

        Self {
            controller,
            env,
            issuer: Arc::new(issuer),
            transport,
            events_tx,
            events_rx,
            view_tx,
            in_flight: HashMap::new(),
        }
    }

    /// Handle for feeding UI input into the session.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.events_tx.clone())
    }

    /// Receiver that always holds the latest [`View`].
    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view_tx.subscribe()
    }

    /// The wrapped controller.
    pub fn controller(&self) -> &SessionController<E, S> {
        &self.controller
    }

    /// Mount the session and process events until it ends.
    ///
    /// Returns the controller so callers can inspect the final state.
    ///
    /// # Errors
    ///
    /// `DriverError::Session` if the controller reports a fatal error.
    pub async fn run(mut self) -> Result<SessionController<E, S>, DriverError> {
        self.dispatch(SessionEvent::Mounted).await?;

        while !self.controller.is_ended() {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            self.dispatch(event).await?;
        }

        for (_, task) in self.in_flight.drain() {
            task.abort();
        }
        Ok(self.controller)
    }

    /// Feed one event through the controller and execute the result.
    async fn dispatch(&mut self, event: SessionEvent) -> Result<(), DriverError> {
        if let SessionEvent::CredentialIssued { generation, .. }
        | SessionEvent::CredentialFailed { generation, .. } = &event
        {
            self.in_flight.remove(generation);
        }

        match self.controller.handle(event) {
            Ok(actions) => self.execute_actions(actions).await,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => tracing::debug!("ignored event: {}", e),
        }

        self.view_tx.send_replace(self.controller.view());
        Ok(())
    }

    async fn execute_actions(&mut self, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::RequestCredential(request) => {
                    let issuer = Arc::clone(&self.issuer);
                    let events = self.events_tx.clone();
                    let generation = request.generation;

                    let task = tokio::spawn(async move {
                        let event = match issuer.issue(&request.room, &request.identity).await {
                            Ok(credential) => SessionEvent::CredentialIssued {
                                generation,
                                token: credential.token().to_string(),
                            },
                            Err(e) => SessionEvent::CredentialFailed { generation, reason: e.to_string() },
                        };
                        let _ = events.send(event);
                    });
                    self.in_flight.insert(generation, task);
                },

                SessionAction::CancelCredentialRequest { generation } => {
                    if let Some(task) = self.in_flight.remove(&generation) {
                        task.abort();
                        tracing::debug!("cancelled credential request {}", generation);
                    }
                },

                SessionAction::ScheduleCredentialRetry { generation, delay } => {
                    let env = self.env.clone();
                    let events = self.events_tx.clone();

                    let task = tokio::spawn(async move {
                        env.sleep(delay).await;
                        let _ = events.send(SessionEvent::RetryCredential { generation });
                    });
                    self.in_flight.insert(generation, task);
                },

                SessionAction::Connect(params) => {
                    let handle = RoomHandle::new(params.connection, SessionHandle::new(self.events_tx.clone()));
                    if let Err(e) = self.transport.connect(params, handle.clone()).await {
                        tracing::error!("Failed to connect: {}", e);
                        handle.send(RoomEvent::ConnectFailed { reason: e.to_string() });
                    }
                },

                SessionAction::PublishLocalTracks(defaults) => {
                    if let Err(e) = self.transport.publish(defaults).await {
                        tracing::error!("Failed to publish local tracks: {}", e);
                    }
                },

                SessionAction::UpdateLocalTracks(defaults) => {
                    if let Err(e) = self.transport.update(defaults).await {
                        tracing::error!("Failed to update local tracks: {}", e);
                    }
                },

                SessionAction::Disconnect { reason } => {
                    if let Err(e) = self.transport.disconnect(&reason).await {
                        tracing::warn!("Failed to disconnect cleanly: {}", e);
                    }
                },

                SessionAction::Log { level, message } => match level {
                    LogLevel::Debug => tracing::debug!("{}", message),
                    LogLevel::Info => tracing::info!("{}", message),
                    LogLevel::Warn => tracing::warn!("{}", message),
                    LogLevel::Error => tracing::error!("{}", message),
                },
            }
        }
    }
}
