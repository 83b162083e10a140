//! Per-dispatch context.

use std::sync::Arc;

use snowball_domain::ConnectionId;
use snowball_shared::Packet;

use crate::infrastructure::ports::{AccountRepo, SessionStore};

/// Collaborators the resolver consults for well-known inputs.
#[derive(Clone)]
pub struct Services {
    pub sessions: Arc<dyn SessionStore>,
    pub accounts: Arc<dyn AccountRepo>,
}

/// Everything known about one dispatch before any input is resolved.
///
/// Built once per inbound packet and never mutated afterwards; resolution
/// only reads from it.
pub struct DispatchContext {
    pub connection_id: ConnectionId,
    pub packet: Packet,
    pub namespace: String,
    pub services: Services,
}

impl DispatchContext {
    pub fn new(
        connection_id: ConnectionId,
        packet: Packet,
        namespace: impl Into<String>,
        services: Services,
    ) -> Self {
        Self {
            connection_id,
            packet,
            namespace: namespace.into(),
            services,
        }
    }

    pub fn op(&self) -> &str {
        &self.packet.op
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("connection_id", &self.connection_id)
            .field("op", &self.packet.op)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Shared handle to a dispatch context.
pub type SharedContext = Arc<DispatchContext>;
