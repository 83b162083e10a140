//! Local Event Bus - named, ordered, in-process fan-out
//!
//! State changes raise events here; reactors (presence broadcast, audit
//! logging) subscribe by name. `emit` awaits every handler in registration
//! order before returning. A failing handler is logged and the rest still run.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::RwLock;

use snowball_domain::{ConnectionId, RoomKey, Session, UserId};

use crate::dispatch::dispatcher::panic_message;
use crate::infrastructure::ports::{RelayError, RepoError, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    UserConnect,
    UserAuth,
    UserDisconnect,
    RoomJoin,
    RoomLeave,
}

impl EventName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserConnect => "user:connect",
            Self::UserAuth => "user:auth",
            Self::UserDisconnect => "user:disconnect",
            Self::RoomJoin => "room:join",
            Self::RoomLeave => "room:leave",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocalEvent {
    UserConnect {
        connection_id: ConnectionId,
    },
    UserAuth {
        connection_id: ConnectionId,
        user_id: UserId,
    },
    /// Raised before the session is discarded, carrying what it last held
    /// and every room the connection still belonged to.
    UserDisconnect {
        connection_id: ConnectionId,
        namespace: String,
        session: Option<Session>,
        rooms: Vec<RoomKey>,
    },
    RoomJoin {
        connection_id: ConnectionId,
        room: RoomKey,
        namespace: String,
    },
    RoomLeave {
        connection_id: ConnectionId,
        room: RoomKey,
        namespace: String,
    },
}

impl LocalEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::UserConnect { .. } => EventName::UserConnect,
            Self::UserAuth { .. } => EventName::UserAuth,
            Self::UserDisconnect { .. } => EventName::UserDisconnect,
            Self::RoomJoin { .. } => EventName::RoomJoin,
            Self::RoomLeave { .. } => EventName::RoomLeave,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        match self {
            Self::UserConnect { connection_id }
            | Self::UserAuth { connection_id, .. }
            | Self::UserDisconnect { connection_id, .. }
            | Self::RoomJoin { connection_id, .. }
            | Self::RoomLeave { connection_id, .. } => *connection_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Failed to encode packet: {0}")]
    Encode(#[from] snowball_shared::PacketError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &LocalEvent) -> Result<(), ReactorError>;
}

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventName, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, event: EventName, handler: Arc<dyn EventHandler>) {
        tracing::debug!(event = %event, handler = handler.name(), "Event handler subscribed");
        self.handlers
            .write()
            .await
            .entry(event)
            .or_default()
            .push(handler);
    }

    pub async fn handler_count(&self, event: EventName) -> usize {
        self.handlers
            .read()
            .await
            .get(&event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Run every handler subscribed to the event, in order.
    pub async fn emit(&self, event: LocalEvent) {
        let name = event.name();
        // Snapshot so handlers may subscribe without deadlocking
        let handlers = self
            .handlers
            .read()
            .await
            .get(&name)
            .cloned()
            .unwrap_or_default();

        for handler in handlers {
            match AssertUnwindSafe(handler.handle(&event)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(
                        event = %name,
                        handler = handler.name(),
                        connection_id = %event.connection_id(),
                        error = %e,
                        "Event handler failed"
                    );
                }
                Err(panic) => {
                    tracing::error!(
                        event = %name,
                        handler = handler.name(),
                        connection_id = %event.connection_id(),
                        panic = %panic_message(panic.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn handle(&self, _event: &LocalEvent) -> Result<(), ReactorError> {
            self.log.lock().unwrap().push(self.label);
            if self.fail {
                return Err(RelayError::Unavailable("relay down".into()).into());
            }
            Ok(())
        }
    }

    struct Panicker;

    #[async_trait]
    impl EventHandler for Panicker {
        fn name(&self) -> &'static str {
            "panicker"
        }

        async fn handle(&self, _event: &LocalEvent) -> Result<(), ReactorError> {
            panic!("reactor exploded");
        }
    }

    fn recorder(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>, fail: bool) -> Arc<dyn EventHandler> {
        Arc::new(Recorder {
            label,
            log: log.clone(),
            fail,
        })
    }

    fn join_event() -> LocalEvent {
        LocalEvent::RoomJoin {
            connection_id: ConnectionId::new(),
            room: RoomKey::room(100),
            namespace: "/".into(),
        }
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(EventName::RoomJoin, recorder("first", &log, false)).await;
        bus.subscribe(EventName::RoomJoin, recorder("second", &log, false)).await;
        bus.subscribe(EventName::RoomLeave, recorder("other", &log, false)).await;

        bus.emit(join_event()).await;
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_the_rest() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(EventName::RoomJoin, recorder("failing", &log, true)).await;
        bus.subscribe(EventName::RoomJoin, Arc::new(Panicker)).await;
        bus.subscribe(EventName::RoomJoin, recorder("after", &log, false)).await;

        bus.emit(join_event()).await;
        assert_eq!(*log.lock().unwrap(), vec!["failing", "after"]);
    }

    #[tokio::test]
    async fn emitting_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        bus.emit(LocalEvent::UserConnect {
            connection_id: ConnectionId::new(),
        })
        .await;
        assert_eq!(bus.handler_count(EventName::UserConnect).await, 0);
    }

    #[test]
    fn event_names_match_wire_style() {
        assert_eq!(join_event().name().as_str(), "room:join");
        assert_eq!(EventName::UserDisconnect.to_string(), "user:disconnect");
    }
}
