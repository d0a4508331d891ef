//! Roles and the instance records a registry reports for them.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// Logical service identifier used as the registry lookup key.
///
/// Cheap to clone; immutable for the lifetime of a client.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Role(Arc<str>);

impl Role {
    /// Creates a role from its name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the role name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Role").field(&&*self.0).finish()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A registered instance of a role, as observed in the registry.
///
/// The registry owns these records; clients only read them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    role: Role,
    address: String,
    instance_id: String,
    last_seen: SystemTime,
}

impl ServiceInstance {
    /// Creates a record seen just now.
    pub fn new(role: impl Into<Role>, instance_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            address: address.into(),
            instance_id: instance_id.into(),
            last_seen: SystemTime::now(),
        }
    }

    /// Overrides the last heartbeat time.
    pub fn with_last_seen(mut self, last_seen: SystemTime) -> Self {
        self.last_seen = last_seen;
        self
    }

    /// The role this instance serves.
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Network address to dial.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Registry-assigned instance identifier.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Time of the last heartbeat the registry observed.
    pub fn last_seen(&self) -> SystemTime {
        self.last_seen
    }
}
