//! Drives one dispatch end to end: lookup, resolution, invocation, cleanup
//! and translation of failures into what the connection sees.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use snowball_domain::ConnectionId;
use snowball_shared::{ops, CloseCode, ErrorPayload, Packet};

use super::context::{DispatchContext, Services};
use super::error::DispatchError;
use super::registry::{Handler, PacketRegistry, Registration};
use super::resolver::Resolver;
use super::scope::ResourceScope;
use crate::infrastructure::error_sanitizer::messages;
use crate::infrastructure::ports::{BroadcastRelay, Target};

/// What happened to one inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No handler for the op; ignored.
    Unhandled,
    Completed,
    /// Error packet sent with this code; connection kept open.
    Rejected(u16),
    /// Error packet sent and connection force-closed.
    Disconnected(CloseCode),
    /// Logged and swallowed.
    Failed,
}

pub struct Dispatcher {
    registry: Arc<PacketRegistry>,
    services: Services,
    relay: Arc<dyn BroadcastRelay>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<PacketRegistry>,
        services: Services,
        relay: Arc<dyn BroadcastRelay>,
    ) -> Self {
        Self {
            registry,
            services,
            relay,
        }
    }

    pub fn registry(&self) -> &Arc<PacketRegistry> {
        &self.registry
    }

    /// Handle one inbound packet. Never fails: every error is turned into
    /// an outcome here.
    pub async fn dispatch(
        &self,
        connection_id: ConnectionId,
        packet: Packet,
        namespace: &str,
    ) -> DispatchOutcome {
        let op = packet.op.clone();
        let context = Arc::new(DispatchContext::new(
            connection_id,
            packet,
            namespace,
            self.services.clone(),
        ));

        let Some(registration) = self.registry.lookup(namespace, &op).await else {
            tracing::debug!(
                connection_id = %connection_id,
                op = %op,
                namespace,
                "No handler registered, ignoring packet"
            );
            return DispatchOutcome::Unhandled;
        };

        let scope = Arc::new(ResourceScope::new());

        let run = Self::run(registration, context, scope.clone());
        let result = match AssertUnwindSafe(run).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(DispatchError::internal(format!(
                "handler panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };

        scope.close().await;

        match result {
            Ok(()) => {
                tracing::trace!(connection_id = %connection_id, op = %op, "Packet handled");
                DispatchOutcome::Completed
            }
            Err(error) => self.report(connection_id, namespace, &op, error).await,
        }
    }

    async fn run(
        registration: Arc<Registration>,
        context: Arc<DispatchContext>,
        scope: Arc<ResourceScope>,
    ) -> Result<(), DispatchError> {
        let mut resolver = Resolver::new(context, scope);
        let inputs = resolver.resolve(&registration.plan).await?;

        match &registration.handler {
            Handler::Async(handler) => handler.handle(inputs).await,
            Handler::Blocking(handler) => {
                let handler = handler.clone();
                tokio::task::spawn_blocking(move || handler.handle(inputs))
                    .await
                    .map_err(|e| DispatchError::internal(format!("blocking handler failed: {e}")))?
            }
        }
    }

    /// Translate a failure into what the connection sees.
    pub async fn report(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
        op: &str,
        error: DispatchError,
    ) -> DispatchOutcome {
        let error = match error {
            DispatchError::Domain(domain) if domain.code().is_none() => {
                DispatchError::Protocol(domain.to_string())
            }
            other => other,
        };

        match error {
            DispatchError::Protocol(reason) => {
                tracing::info!(
                    connection_id = %connection_id,
                    op,
                    reason = %reason,
                    "Invalid data, disconnecting"
                );
                let code = CloseCode::InvalidData;
                self.send_error(connection_id, namespace, code.as_u16(), messages::INVALID_DATA)
                    .await;
                self.force_close(connection_id, namespace, code).await
            }
            DispatchError::Critical { code, message } => {
                tracing::warn!(
                    connection_id = %connection_id,
                    op,
                    code = code.as_u16(),
                    message = %message,
                    "Critical dispatch error, disconnecting"
                );
                self.send_error(connection_id, namespace, code.as_u16(), &message)
                    .await;
                self.force_close(connection_id, namespace, code).await
            }
            DispatchError::Auth(auth) => {
                let code = auth.close_code();
                tracing::info!(
                    connection_id = %connection_id,
                    op,
                    error = %auth,
                    "Authentication error, disconnecting"
                );
                self.send_error(connection_id, namespace, code.as_u16(), &auth.to_string())
                    .await;
                self.force_close(connection_id, namespace, code).await
            }
            DispatchError::Domain(domain) => {
                // Uncoded domain errors were rewritten above
                let code = domain.code().unwrap_or(CloseCode::InvalidData.as_u16());
                tracing::debug!(
                    connection_id = %connection_id,
                    op,
                    code,
                    error = %domain,
                    "Domain error"
                );
                self.send_error(connection_id, namespace, code, &domain.to_string())
                    .await;
                DispatchOutcome::Rejected(code)
            }
            DispatchError::NotFound { entity, id } => {
                tracing::warn!(
                    connection_id = %connection_id,
                    op,
                    entity,
                    id = %id,
                    "Dispatch target vanished"
                );
                DispatchOutcome::Failed
            }
            DispatchError::Internal(message) => {
                tracing::error!(
                    connection_id = %connection_id,
                    op,
                    namespace,
                    error = %message,
                    "Packet handler failed"
                );
                DispatchOutcome::Failed
            }
        }
    }

    async fn send_error(&self, connection_id: ConnectionId, namespace: &str, code: u16, message: &str) {
        let packet = match Packet::new(ops::ERROR, ErrorPayload::new(code, message)) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode error packet");
                return;
            }
        };
        if let Err(e) = self
            .relay
            .publish(Target::Connection(connection_id), packet, namespace, None)
            .await
        {
            tracing::warn!(connection_id = %connection_id, error = %e, "Failed to send error packet");
        }
    }

    async fn force_close(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
        code: CloseCode,
    ) -> DispatchOutcome {
        if let Err(e) = self.relay.disconnect(connection_id, namespace, code).await {
            tracing::warn!(connection_id = %connection_id, error = %e, "Failed to disconnect");
        }
        DispatchOutcome::Disconnected(code)
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
