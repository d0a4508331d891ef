//! Registry-backed address resolution for beacon-rpc clients.
//!
//! A client talks to a logical *role* rather than a fixed address. The
//! [`AddressResolver`] asks a shared [`Registry`] which instances currently
//! serve that role and picks one with a deterministic [`SelectionStrategy`].
//!
//! # Examples
//!
//! ```rust
//! use beacon_rpc_discovery::{AddressResolver, MemoryRegistry, ServiceInstance};
//!
//! # async fn example() -> Result<(), beacon_rpc_core::TransportError> {
//! let registry = MemoryRegistry::new();
//! registry.register(ServiceInstance::new("indexcoord", "1", "10.0.0.1:31000"));
//!
//! let resolver = AddressResolver::new("indexcoord", registry);
//! assert_eq!(resolver.resolve().await?, "10.0.0.1:31000");
//! # Ok(())
//! # }
//! ```

mod instance;
mod registry;
mod resolver;
mod selection;

pub use instance::{Role, ServiceInstance};
pub use registry::{Instances, MemoryRegistry, Registry, RegistryUnavailable};
pub use resolver::AddressResolver;
pub use selection::{CustomSelectorFn, SelectionStrategy};
