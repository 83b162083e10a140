//! Packet dispatch: handler registry, dependency resolution and the
//! dispatcher that ties them together.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod scope;

pub use context::{DispatchContext, Services, SharedContext};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{AuthError, DispatchError};
pub use registry::{handler_fn, BlockingPacketHandler, Handler, PacketHandler, PacketRegistry};
pub use resolver::{ContextToken, Dependency, Requirement, Resolved, Resolver};
pub use scope::{cleanup, Cleanup, ResourceScope};
