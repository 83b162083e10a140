//! Packet handler registry.
//!
//! Maps `(namespace, op)` to a handler plus the requirement plan resolved
//! before it runs. Registration happens at startup; lookups happen on every
//! inbound packet.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use snowball_shared::ops;

use super::error::DispatchError;
use super::resolver::{Requirement, Resolved};

/// Handler executed on the async runtime.
#[async_trait]
pub trait PacketHandler: Send + Sync {
    /// Inputs this handler needs, in resolution order.
    fn requirements(&self) -> Vec<Requirement>;

    async fn handle(&self, inputs: Resolved) -> Result<(), DispatchError>;
}

/// Handler that does synchronous work. Runs on the blocking pool so it
/// never stalls the event loop.
pub trait BlockingPacketHandler: Send + Sync {
    fn requirements(&self) -> Vec<Requirement>;

    fn handle(&self, inputs: Resolved) -> Result<(), DispatchError>;
}

/// A registered handler of either flavour.
#[derive(Clone)]
pub enum Handler {
    Async(Arc<dyn PacketHandler>),
    Blocking(Arc<dyn BlockingPacketHandler>),
}

impl Handler {
    pub fn asynchronous(handler: impl PacketHandler + 'static) -> Self {
        Self::Async(Arc::new(handler))
    }

    pub fn blocking(handler: impl BlockingPacketHandler + 'static) -> Self {
        Self::Blocking(Arc::new(handler))
    }

    pub fn requirements(&self) -> Vec<Requirement> {
        match self {
            Self::Async(handler) => handler.requirements(),
            Self::Blocking(handler) => handler.requirements(),
        }
    }

    /// Identity comparison: true only for clones of the same registration.
    pub fn same_as(&self, other: &Handler) -> bool {
        match (self, other) {
            (Self::Async(a), Self::Async(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (Self::Blocking(a), Self::Blocking(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Async(_) => f.write_str("Handler::Async"),
            Self::Blocking(_) => f.write_str("Handler::Blocking"),
        }
    }
}

type HandlerFn = dyn Fn(Resolved) -> futures_util::future::BoxFuture<'static, Result<(), DispatchError>>
    + Send
    + Sync;

/// Handler built from a closure, for small handlers that don't warrant a type.
pub struct FnHandler {
    requirements: Vec<Requirement>,
    handle: Box<HandlerFn>,
}

#[async_trait]
impl PacketHandler for FnHandler {
    fn requirements(&self) -> Vec<Requirement> {
        self.requirements.clone()
    }

    async fn handle(&self, inputs: Resolved) -> Result<(), DispatchError> {
        (self.handle)(inputs).await
    }
}

pub fn handler_fn<F, Fut>(requirements: Vec<Requirement>, handle: F) -> Handler
where
    F: Fn(Resolved) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<(), DispatchError>> + Send + 'static,
{
    Handler::asynchronous(FnHandler {
        requirements,
        handle: Box::new(move |inputs| Box::pin(handle(inputs))),
    })
}

/// A handler with its full requirement plan: registration extras first,
/// then the handler's own inputs.
pub struct Registration {
    pub handler: Handler,
    pub plan: Vec<Requirement>,
}

type Table = HashMap<String, HashMap<String, Arc<Registration>>>;

/// Registry of packet handlers, keyed by namespace then op.
#[derive(Default)]
pub struct PacketRegistry {
    namespaces: RwLock<Table>,
}

impl PacketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `op`. `extra` requirements resolve before the
    /// handler's own, for side effects such as an authentication guard.
    /// Replaces any existing registration.
    pub async fn register(
        &self,
        namespace: &str,
        op: &str,
        handler: Handler,
        extra: Vec<Requirement>,
    ) {
        let mut plan = extra;
        plan.extend(handler.requirements());
        let registration = Arc::new(Registration { handler, plan });

        let mut namespaces = self.namespaces.write().await;
        let previous = namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(op.to_string(), registration);
        if previous.is_some() && op != ops::WILDCARD {
            tracing::warn!(namespace, op, "Replacing existing packet handler");
        } else {
            tracing::debug!(namespace, op, "Packet handler registered");
        }
    }

    /// Remove the registration for `op` if it is `handler`. Returns whether
    /// anything was removed.
    pub async fn unregister(&self, namespace: &str, op: &str, handler: &Handler) -> bool {
        let mut namespaces = self.namespaces.write().await;
        let Some(table) = namespaces.get_mut(namespace) else {
            return false;
        };
        let matches = table
            .get(op)
            .is_some_and(|registration| registration.handler.same_as(handler));
        if !matches {
            return false;
        }

        table.remove(op);
        if table.is_empty() {
            namespaces.remove(namespace);
        }
        tracing::debug!(namespace, op, "Packet handler unregistered");
        true
    }

    /// Exact op first, then the namespace's wildcard handler.
    pub async fn lookup(&self, namespace: &str, op: &str) -> Option<Arc<Registration>> {
        let namespaces = self.namespaces.read().await;
        let table = namespaces.get(namespace)?;
        table.get(op).or_else(|| table.get(ops::WILDCARD)).cloned()
    }

    pub async fn contains(&self, namespace: &str, op: &str) -> bool {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .is_some_and(|table| table.contains_key(op))
    }

    /// Registered ops in a namespace, sorted.
    pub async fn ops(&self, namespace: &str) -> Vec<String> {
        let namespaces = self.namespaces.read().await;
        let mut ops: Vec<String> = namespaces
            .get(namespace)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default();
        ops.sort();
        ops
    }

    pub async fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
