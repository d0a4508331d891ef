//! Resolving a role to the address of one live instance.

use crate::instance::{Role, ServiceInstance};
use crate::registry::Registry;
use crate::selection::SelectionStrategy;
use beacon_rpc_core::TransportError;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use metrics::counter;

/// Looks up the current address for a role.
///
/// Nothing is cached between calls: every [`resolve`](Self::resolve) queries
/// the registry again, so failovers and rebalancing are observed on the very
/// next call.
pub struct AddressResolver<R> {
    role: Role,
    registry: Arc<R>,
    strategy: SelectionStrategy,
}

impl<R> Clone for AddressResolver<R> {
    fn clone(&self) -> Self {
        Self {
            role: self.role.clone(),
            registry: Arc::clone(&self.registry),
            strategy: self.strategy.clone(),
        }
    }
}

impl<R> std::fmt::Debug for AddressResolver<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressResolver")
            .field("role", &self.role)
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl<R: Registry> AddressResolver<R> {
    /// Creates a resolver for `role` backed by `registry`.
    pub fn new(role: impl Into<Role>, registry: R) -> Self {
        Self::from_shared(role, Arc::new(registry))
    }

    /// Creates a resolver over a registry handle shared with other clients.
    pub fn from_shared(role: impl Into<Role>, registry: Arc<R>) -> Self {
        Self {
            role: role.into(),
            registry,
            strategy: SelectionStrategy::default(),
        }
    }

    /// Sets the strategy used when several instances are registered.
    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The role this resolver looks up.
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Resolves the role to a network address.
    pub async fn resolve(&self) -> Result<String, TransportError> {
        self.resolve_instance()
            .await
            .map(|instance| instance.address().to_string())
    }

    /// Resolves the role to the full instance record.
    ///
    /// Instances with an empty address are treated as not yet serving.
    pub async fn resolve_instance(&self) -> Result<ServiceInstance, TransportError> {
        let instances = match self.registry.get_instances(&self.role).await {
            Ok(instances) => instances,
            Err(source) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(role = %self.role, error = %source, "registry query failed");

                #[cfg(feature = "metrics")]
                counter!("beacon_rpc_resolve_total", "role" => self.role.to_string(), "outcome" => "unavailable")
                    .increment(1);

                return Err(TransportError::DiscoveryUnavailable {
                    role: self.role.to_string(),
                    source,
                });
            }
        };

        let mut candidates: Vec<ServiceInstance> = instances
            .into_values()
            .filter(|instance| !instance.address().is_empty())
            .collect();
        candidates.sort_by(|a, b| a.instance_id().cmp(b.instance_id()));

        match self.strategy.select(&candidates) {
            Some(instance) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    role = %self.role,
                    instance = instance.instance_id(),
                    address = instance.address(),
                    candidates = candidates.len(),
                    "resolved role"
                );

                #[cfg(feature = "metrics")]
                counter!("beacon_rpc_resolve_total", "role" => self.role.to_string(), "outcome" => "resolved")
                    .increment(1);

                Ok(instance.clone())
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!(role = %self.role, candidates = candidates.len(), "no available instance");

                #[cfg(feature = "metrics")]
                counter!("beacon_rpc_resolve_total", "role" => self.role.to_string(), "outcome" => "empty")
                    .increment(1);

                Err(TransportError::NoAvailableInstance {
                    role: self.role.to_string(),
                })
            }
        }
    }
}
