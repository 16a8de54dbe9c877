//! Channel sessions.
//!
//! A [`ChannelSession`] joins one topic over a transport and hands every
//! event of that topic to the raw callback registered for its name.
//! Decoding is left to the layer above.

use beacon_protocol::validate_topic;
use beacon_transport::{Payload, Subscription, Transport, TransportError};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Callback invoked with the payload of a raw event.
pub type RawHandler = Arc<dyn Fn(&Payload) + Send + Sync>;

/// Errors returned by [`ChannelSession::connect`].
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The session is joining or has joined a topic already.
    #[error("Session already connected to topic: {0}")]
    AlreadyConnected(String),

    /// The session was closed and cannot join again.
    #[error("Session closed")]
    Closed,

    /// Invalid topic name.
    #[error("Invalid topic: {0}")]
    InvalidTopic(&'static str),

    /// The transport could not join the topic.
    #[error("Failed to join topic: {0}")]
    Transport(#[from] TransportError),
}

/// Event name to callback table, shared with the dispatch task.
#[derive(Default)]
struct HandlerTable {
    handlers: DashMap<String, RawHandler>,
}

impl HandlerTable {
    fn dispatch(&self, topic: &str, event: &str, payload: &Payload) -> bool {
        // Clone the handler out so the shard lock is not held during the call
        let handler = self.handlers.get(event).map(|h| Arc::clone(h.value()));

        match handler {
            Some(handler) => {
                handler(payload);
                true
            }
            None => {
                trace!(topic = %topic, event = %event, "No handler for event");
                false
            }
        }
    }
}

enum SessionState {
    Idle,
    Joining(String),
    Joined {
        topic: String,
        shutdown: oneshot::Sender<()>,
        dispatcher: JoinHandle<()>,
    },
    Closed,
}

impl SessionState {
    fn topic(&self) -> Option<&str> {
        match self {
            SessionState::Joining(topic) | SessionState::Joined { topic, .. } => {
                Some(topic.as_str())
            }
            SessionState::Idle | SessionState::Closed => None,
        }
    }
}

/// One topic joined over a transport, with raw per-event callbacks.
///
/// Handlers may be registered before or after [`connect`](Self::connect).
/// A registration is visible to every event dispatched after `on` returns;
/// an event already being dispatched keeps the handler it looked up.
pub struct ChannelSession {
    transport: Arc<dyn Transport>,
    handlers: Arc<HandlerTable>,
    state: Mutex<SessionState>,
}

impl ChannelSession {
    /// Create a session that will join over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            handlers: Arc::new(HandlerTable::default()),
            state: Mutex::new(SessionState::Idle),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Join `topic` and start dispatching its events.
    ///
    /// Events are dispatched one at a time on a dedicated task, in the
    /// order the transport delivered them.
    ///
    /// # Errors
    ///
    /// Fails if the topic name is invalid, the session is already joining
    /// or joined, or the transport cannot join. After a transport failure
    /// the session is idle again and `connect` may be retried.
    pub async fn connect(&self, topic: &str) -> Result<(), ConnectError> {
        validate_topic(topic).map_err(ConnectError::InvalidTopic)?;
        self.begin_join(topic)?;

        let subscription = match self.transport.join(topic).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.abort_join();
                warn!(topic = %topic, transport = self.transport.name(), error = %e, "Join failed");
                return Err(e.into());
            }
        };

        self.finish_join(topic, subscription)?;
        info!(topic = %topic, transport = self.transport.name(), "Channel joined");
        Ok(())
    }

    fn begin_join(&self, topic: &str) -> Result<(), ConnectError> {
        let mut state = self.lock_state();
        if let Some(current) = state.topic() {
            return Err(ConnectError::AlreadyConnected(current.to_string()));
        }
        if matches!(*state, SessionState::Closed) {
            return Err(ConnectError::Closed);
        }
        *state = SessionState::Joining(topic.to_string());
        Ok(())
    }

    fn abort_join(&self) {
        let mut state = self.lock_state();
        if !matches!(*state, SessionState::Closed) {
            *state = SessionState::Idle;
        }
    }

    fn finish_join(
        &self,
        topic: &str,
        subscription: Box<dyn Subscription>,
    ) -> Result<(), ConnectError> {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let dispatcher = tokio::spawn(run_dispatch(
            subscription,
            Arc::clone(&self.handlers),
            shutdown_rx,
        ));

        let mut state = self.lock_state();
        if matches!(*state, SessionState::Closed) {
            // Closed while the join was in flight: leave right away
            let _ = shutdown.send(());
            return Err(ConnectError::Closed);
        }
        *state = SessionState::Joined {
            topic: topic.to_string(),
            shutdown,
            dispatcher,
        };
        Ok(())
    }

    /// Register the callback for `event`, replacing any previous one.
    pub fn on<F>(&self, event: impl Into<String>, callback: F)
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        let event = event.into();
        if self
            .handlers
            .handlers
            .insert(event.clone(), Arc::new(callback))
            .is_some()
        {
            debug!(event = %event, "Replaced event handler");
        }
    }

    /// Remove the callback for `event`.
    ///
    /// Returns `true` if one was registered.
    pub fn remove(&self, event: &str) -> bool {
        self.handlers.handlers.remove(event).is_some()
    }

    /// Hand `payload` to the callback registered for `event`.
    ///
    /// Returns `false` and does nothing if no callback is registered.
    pub fn dispatch(&self, event: &str, payload: &Payload) -> bool {
        let topic = self.topic().unwrap_or_default();
        self.handlers.dispatch(&topic, event, payload)
    }

    /// The topic being joined or joined.
    #[must_use]
    pub fn topic(&self) -> Option<String> {
        self.lock_state().topic().map(str::to_string)
    }

    /// Check if the topic join completed and the session is not closed.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.lock_state(), SessionState::Joined { .. })
    }

    /// Number of registered event callbacks.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.handlers.len()
    }

    /// Leave the topic and wait for the dispatch task to finish.
    ///
    /// Events still buffered by the transport are discarded. Closing an
    /// unconnected session only marks it closed.
    pub async fn close(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), SessionState::Closed);

        if let SessionState::Joined {
            topic,
            shutdown,
            dispatcher,
        } = previous
        {
            let _ = shutdown.send(());
            if let Err(e) = dispatcher.await {
                warn!(topic = %topic, error = %e, "Dispatch task failed");
            }
            info!(topic = %topic, "Channel closed");
        }
    }
}

async fn run_dispatch(
    mut subscription: Box<dyn Subscription>,
    handlers: Arc<HandlerTable>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let topic = subscription.topic().to_string();

    loop {
        tokio::select! {
            biased;

            // Also fires when the session is dropped
            _ = &mut shutdown => {
                if let Err(e) = subscription.leave().await {
                    warn!(topic = %topic, error = %e, "Leave failed");
                }
                break;
            }

            next = subscription.recv() => match next {
                Ok(Some(event)) => {
                    handlers.dispatch(&topic, &event.event, &event.payload);
                }
                Ok(None) => {
                    debug!(topic = %topic, "Subscription ended");
                    break;
                }
                Err(e) => {
                    warn!(topic = %topic, error = %e, "Subscription failed");
                    break;
                }
            }
        }
    }
}
