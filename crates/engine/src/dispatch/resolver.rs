//! Dependency resolution.
//!
//! Handlers declare their inputs as an ordered list of [`Requirement`]s.
//! Each requirement is a well-known context value, a typed payload, or a
//! nested [`Dependency`] with requirements of its own. The resolver walks
//! that plan depth-first for one dispatch, caching every value by identity
//! so a dependency used twice runs once.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use validator::Validate;

use snowball_domain::{ConnectionId, Session, UserId, UserRecord};
use snowball_shared::Packet;

use super::context::DispatchContext;
use super::error::{AuthError, DispatchError};
use super::scope::{Cleanup, ResourceScope};

/// Type-erased resolved value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Inputs that can be injected without explicit wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextToken {
    /// `ConnectionId` of the caller
    ConnectionId,
    /// The inbound `Packet`
    Packet,
    /// Namespace as a `String`
    Namespace,
    /// The caller's `Session`; fails authentication if there is none
    Session,
    /// `UserId` from the session
    UserId,
    /// The caller's `UserRecord`; fails authentication if the account is
    /// missing or does not match the session
    Identity,
}

/// One named input of a handler or dependency.
#[derive(Clone)]
pub struct Requirement {
    name: &'static str,
    source: Source,
}

#[derive(Clone)]
enum Source {
    Context(ContextToken),
    Dependency(Dependency),
    Payload(PayloadSchema),
}

#[derive(Clone, Copy)]
struct PayloadSchema {
    type_id: TypeId,
    type_name: &'static str,
    decode: fn(&Packet) -> Result<Value, DispatchError>,
}

fn decode_payload<T>(packet: &Packet) -> Result<Value, DispatchError>
where
    T: DeserializeOwned + Validate + Send + Sync + 'static,
{
    let payload: T = packet.decode()?;
    payload.validate()?;
    Ok(Arc::new(payload))
}

impl Requirement {
    pub fn context(name: &'static str, token: ContextToken) -> Self {
        Self {
            name,
            source: Source::Context(token),
        }
    }

    pub fn dependency(name: &'static str, dependency: &Dependency) -> Self {
        Self {
            name,
            source: Source::Dependency(dependency.clone()),
        }
    }

    /// The packet payload decoded as `T` and validated.
    pub fn payload<T>(name: &'static str) -> Self
    where
        T: DeserializeOwned + Validate + Send + Sync + 'static,
    {
        Self {
            name,
            source: Source::Payload(PayloadSchema {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                decode: decode_payload::<T>,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            Source::Context(token) => format!("{token:?}"),
            Source::Dependency(dependency) => format!("dependency {}", dependency.name()),
            Source::Payload(schema) => format!("payload {}", schema.type_name),
        };
        write!(f, "{} <- {}", self.name, source)
    }
}

type SyncProvider = dyn Fn(&Resolved) -> Result<Value, DispatchError> + Send + Sync;
type AsyncProvider = dyn Fn(Resolved) -> BoxFuture<'static, Result<Value, DispatchError>> + Send + Sync;
type ScopedProvider =
    dyn Fn(Resolved) -> BoxFuture<'static, Result<(Value, Cleanup), DispatchError>> + Send + Sync;

enum Provider {
    Sync(Box<SyncProvider>),
    Async(Box<AsyncProvider>),
    Scoped(Box<ScopedProvider>),
}

struct DependencyInner {
    name: &'static str,
    requirements: Vec<Requirement>,
    provider: Provider,
}

/// A reusable provider of one value. Clones share identity, which is what
/// the per-dispatch cache keys on.
#[derive(Clone)]
pub struct Dependency(Arc<DependencyInner>);

impl Dependency {
    fn from_provider(name: &'static str, requirements: Vec<Requirement>, provider: Provider) -> Self {
        Self(Arc::new(DependencyInner {
            name,
            requirements,
            provider,
        }))
    }

    /// Plain function of already-resolved inputs.
    pub fn sync<T, F>(name: &'static str, requirements: Vec<Requirement>, provide: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolved) -> Result<T, DispatchError> + Send + Sync + 'static,
    {
        Self::from_provider(
            name,
            requirements,
            Provider::Sync(Box::new(move |inputs| {
                provide(inputs).map(|value| Arc::new(value) as Value)
            })),
        )
    }

    /// Asynchronous provider.
    pub fn future<T, F, Fut>(name: &'static str, requirements: Vec<Requirement>, provide: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Resolved) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, DispatchError>> + Send + 'static,
    {
        Self::from_provider(
            name,
            requirements,
            Provider::Async(Box::new(move |inputs| {
                let pending = provide(inputs);
                async move { pending.await.map(|value| Arc::new(value) as Value) }.boxed()
            })),
        )
    }

    /// Provider that acquires a resource. Its cleanup runs when the
    /// dispatch ends, whether the handler succeeded or not.
    pub fn scoped<T, F, Fut>(name: &'static str, requirements: Vec<Requirement>, provide: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Resolved) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(T, Cleanup), DispatchError>> + Send + 'static,
    {
        Self::from_provider(
            name,
            requirements,
            Provider::Scoped(Box::new(move |inputs| {
                let pending = provide(inputs);
                async move {
                    pending
                        .await
                        .map(|(value, cleanup)| (Arc::new(value) as Value, cleanup))
                }
                .boxed()
            })),
        )
    }

    pub fn name(&self) -> &'static str {
        self.0.name
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

/// Resolved inputs for one handler or dependency call.
#[derive(Clone)]
pub struct Resolved {
    context: Arc<DispatchContext>,
    values: HashMap<&'static str, Value>,
}

impl Resolved {
    pub fn context(&self) -> &Arc<DispatchContext> {
        &self.context
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.context.connection_id
    }

    pub fn namespace(&self) -> &str {
        &self.context.namespace
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Fetch a declared input by name.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, DispatchError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| DispatchError::internal(format!("input '{name}' was not declared")))?;
        value.clone().downcast::<T>().map_err(|_| {
            DispatchError::internal(format!("input '{name}' is not a {}", type_name::<T>()))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CacheKey {
    Token(ContextToken),
    Dependency(usize),
    Payload(TypeId),
}

/// Resolves requirement plans for a single dispatch.
///
/// The cache lives exactly as long as the resolver, which lives exactly as
/// long as one dispatch.
pub struct Resolver {
    context: Arc<DispatchContext>,
    scope: Arc<ResourceScope>,
    cache: HashMap<CacheKey, Value>,
}

impl Resolver {
    pub fn new(context: Arc<DispatchContext>, scope: Arc<ResourceScope>) -> Self {
        Self {
            context,
            scope,
            cache: HashMap::new(),
        }
    }

    /// Resolve every requirement in order, stopping at the first failure.
    pub fn resolve<'a>(
        &'a mut self,
        requirements: &'a [Requirement],
    ) -> BoxFuture<'a, Result<Resolved, DispatchError>> {
        async move {
            let mut values = HashMap::with_capacity(requirements.len());
            for requirement in requirements {
                let value = match &requirement.source {
                    Source::Context(token) => self.token(*token).await?,
                    Source::Payload(schema) => self.payload(schema)?,
                    Source::Dependency(dependency) => self.dependency(dependency).await?,
                };
                values.insert(requirement.name, value);
            }
            Ok(Resolved {
                context: self.context.clone(),
                values,
            })
        }
        .boxed()
    }

    async fn dependency(&mut self, dependency: &Dependency) -> Result<Value, DispatchError> {
        let key = CacheKey::Dependency(dependency.identity());
        if let Some(value) = self.cache.get(&key) {
            return Ok(value.clone());
        }

        let inputs = self.resolve(&dependency.0.requirements).await?;
        let value = match &dependency.0.provider {
            Provider::Sync(provide) => provide(&inputs)?,
            Provider::Async(provide) => provide(inputs).await?,
            Provider::Scoped(provide) => {
                let (value, cleanup) = provide(inputs).await?;
                self.scope.push(dependency.name(), cleanup).await;
                value
            }
        };

        self.cache.insert(key, value.clone());
        Ok(value)
    }

    fn payload(&mut self, schema: &PayloadSchema) -> Result<Value, DispatchError> {
        let key = CacheKey::Payload(schema.type_id);
        if let Some(value) = self.cache.get(&key) {
            return Ok(value.clone());
        }

        let value = (schema.decode)(&self.context.packet).inspect_err(|e| {
            tracing::debug!(
                connection_id = %self.context.connection_id,
                op = %self.context.packet.op,
                schema = schema.type_name,
                error = %e,
                "Payload rejected"
            );
        })?;
        self.cache.insert(key, value.clone());
        Ok(value)
    }

    fn token(&mut self, token: ContextToken) -> BoxFuture<'_, Result<Value, DispatchError>> {
        async move {
            let key = CacheKey::Token(token);
            if let Some(value) = self.cache.get(&key) {
                return Ok(value.clone());
            }

            let context = self.context.clone();
            let value: Value = match token {
                ContextToken::ConnectionId => Arc::new(context.connection_id),
                ContextToken::Packet => Arc::new(context.packet.clone()),
                ContextToken::Namespace => Arc::new(context.namespace.clone()),
                ContextToken::Session => {
                    let session = context
                        .services
                        .sessions
                        .get(context.connection_id, &context.namespace)
                        .await?
                        .ok_or(AuthError::Missing)?;
                    Arc::new(session)
                }
                ContextToken::UserId => {
                    let session = downcast::<Session>(self.token(ContextToken::Session).await?)?;
                    Arc::new(session.user_id.ok_or(AuthError::Missing)?)
                }
                ContextToken::Identity => {
                    let user_id = downcast::<UserId>(self.token(ContextToken::UserId).await?)?;
                    match context.services.accounts.fetch_user_by_id(*user_id).await? {
                        Some(user) if user.id == *user_id => Arc::new(user) as Arc<UserRecord>,
                        _ => {
                            tracing::warn!(
                                connection_id = %context.connection_id,
                                user_id = %user_id,
                                "Session user has no matching account"
                            );
                            return Err(DispatchError::authentication_failed());
                        }
                    }
                }
            };

            self.cache.insert(key, value.clone());
            Ok(value)
        }
        .boxed()
    }
}

fn downcast<T: Any + Send + Sync>(value: Value) -> Result<Arc<T>, DispatchError> {
    value
        .downcast::<T>()
        .map_err(|_| DispatchError::internal(format!("context value is not a {}", type_name::<T>())))
}
