//! Domain primitive types used across the cairn workspace.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a resource node, unique within a stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node id from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the id is non-empty and made only of ASCII
    /// alphanumerics, `-`, `_` and `.`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Category of an infrastructure unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Private network with public and private subnets.
    Network,
    /// Secret store entry.
    Secret,
    /// Managed relational database.
    Database,
    /// Object storage bucket.
    ObjectStore,
    /// Identity and access role.
    Role,
    /// Serverless compute unit.
    Compute,
    /// HTTP API gateway.
    Gateway,
    /// User pool and federated identity provider.
    IdentityProvider,
    /// Content-delivery edge cache.
    EdgeCache,
    /// Dashboards and alarms.
    Metrics,
    /// Customer-managed encryption key.
    Key,
}

impl ResourceKind {
    /// Every supported kind, in registry order.
    pub const ALL: [Self; 11] = [
        Self::Network,
        Self::Secret,
        Self::Database,
        Self::ObjectStore,
        Self::Role,
        Self::Compute,
        Self::Gateway,
        Self::IdentityProvider,
        Self::EdgeCache,
        Self::Metrics,
        Self::Key,
    ];

    /// Returns the kebab-case tag used in manifests and error messages.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Secret => "secret",
            Self::Database => "database",
            Self::ObjectStore => "object-store",
            Self::Role => "role",
            Self::Compute => "compute",
            Self::Gateway => "gateway",
            Self::IdentityProvider => "identity-provider",
            Self::EdgeCache => "edge-cache",
            Self::Metrics => "metrics",
            Self::Key => "key",
        }
    }

    /// Looks a kind up by its tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
