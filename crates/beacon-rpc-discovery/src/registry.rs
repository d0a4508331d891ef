//! The discovery registry collaborator and an in-process implementation.

use crate::instance::{Role, ServiceInstance};
use beacon_rpc_core::BoxError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

/// Instances registered under one role, keyed by instance id.
pub type Instances = HashMap<String, ServiceInstance>;

/// Read access to a shared service registry.
///
/// The registry is shared process-wide and must be safe to query from many
/// tasks at once. Clients never write to it.
///
/// # Examples
///
/// Using a closure (via blanket impl):
///
/// ```rust
/// use beacon_rpc_discovery::{Instances, Registry, Role, ServiceInstance};
///
/// let registry = |role: &Role| {
///     let role = role.clone();
///     async move {
///         let mut instances = Instances::new();
///         instances.insert("1".to_string(), ServiceInstance::new(role, "1", "127.0.0.1:19530"));
///         Ok::<_, beacon_rpc_core::BoxError>(instances)
///     }
/// };
/// # fn assert_registry<R: Registry>(_: &R) {}
/// # assert_registry(&registry);
/// ```
pub trait Registry: Send + Sync + 'static {
    /// Returns every instance currently registered under `role`.
    ///
    /// An empty map means nothing is registered; an error means the registry
    /// itself could not be queried.
    fn get_instances(&self, role: &Role) -> impl Future<Output = Result<Instances, BoxError>> + Send;
}

impl<F, Fut> Registry for F
where
    F: Fn(&Role) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Instances, BoxError>> + Send,
{
    fn get_instances(&self, role: &Role) -> impl Future<Output = Result<Instances, BoxError>> + Send {
        self(role)
    }
}

/// Error returned by [`MemoryRegistry`] while it is marked unavailable.
#[derive(Debug, Clone, thiserror::Error)]
#[error("registry is unavailable")]
pub struct RegistryUnavailable;

#[derive(Debug, Default)]
struct Inner {
    roles: HashMap<Role, Instances>,
    unavailable: bool,
}

/// Thread-safe in-process registry.
///
/// Useful for static deployments where addresses come from configuration, and
/// for exercising failover in tests: instances can be registered, replaced and
/// removed at any time, and the whole registry can be made unreachable.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) an instance under its role.
    pub fn register(&self, instance: ServiceInstance) {
        let mut inner = self.write();
        inner
            .roles
            .entry(instance.role().clone())
            .or_default()
            .insert(instance.instance_id().to_string(), instance);
    }

    /// Removes an instance. Returns the removed record, if any.
    pub fn deregister(&self, role: &Role, instance_id: &str) -> Option<ServiceInstance> {
        let mut inner = self.write();
        let instances = inner.roles.get_mut(role)?;
        let removed = instances.remove(instance_id);
        if instances.is_empty() {
            inner.roles.remove(role);
        }
        removed
    }

    /// Makes every subsequent query fail (`false`) or succeed again (`true`).
    pub fn set_available(&self, available: bool) {
        self.write().unavailable = !available;
    }

    /// Snapshot of the instances registered under `role`.
    pub fn instances(&self, role: &Role) -> Instances {
        self.read().roles.get(role).cloned().unwrap_or_default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Registry for MemoryRegistry {
    fn get_instances(&self, role: &Role) -> impl Future<Output = Result<Instances, BoxError>> + Send {
        let result = {
            let inner = self.read();
            if inner.unavailable {
                Err(Box::new(RegistryUnavailable) as BoxError)
            } else {
                Ok(inner.roles.get(role).cloned().unwrap_or_default())
            }
        };
        std::future::ready(result)
    }
}
