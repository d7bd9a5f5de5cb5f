//! The composed stack handed to the provisioning engine.

use std::collections::BTreeMap;

use cairn_common::config::Environment;
use cairn_common::error::Result;
use cairn_common::types::{NodeId, ResourceKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::node::{Reference, Value};

/// A node after ordering, naming and reference substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedResource {
    /// Node id.
    pub id: NodeId,
    /// Resource category.
    pub kind: ResourceKind,
    /// Derived resource name.
    pub name: String,
    /// Validated config with every input slot substituted.
    pub config: BTreeMap<String, Value>,
    /// Resolved output values.
    pub outputs: BTreeMap<String, String>,
    /// Producers this node references, in provisioning order.
    pub depends_on: Vec<NodeId>,
}

/// A named, externally visible output of the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    /// Export name, unique within the stack.
    pub name: String,
    /// Resolved value.
    pub value: String,
    /// Where the value came from.
    pub source: Reference,
    /// Operator-facing description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A fully composed stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    /// Stack name.
    pub name: String,
    /// Environment the stack was built for.
    pub environment: Environment,
    /// Resources in provisioning order.
    pub resources: Vec<ResolvedResource>,
    /// Exports keyed by name.
    pub exports: BTreeMap<String, Export>,
}

impl Stack {
    /// Returns the node ids in provisioning order.
    #[must_use]
    pub fn order(&self) -> Vec<&NodeId> {
        self.resources.iter().map(|r| &r.id).collect()
    }

    /// Looks up a resolved resource by id.
    #[must_use]
    pub fn resource(&self, id: &str) -> Option<&ResolvedResource> {
        self.resources.iter().find(|r| r.id.as_str() == id)
    }

    /// Returns the position of `id` in provisioning order.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.id.as_str() == id)
    }

    /// Returns the flat `{name: value}` export table.
    #[must_use]
    pub fn export_table(&self) -> BTreeMap<String, String> {
        self.exports
            .values()
            .map(|e| (e.name.clone(), e.value.clone()))
            .collect()
    }

    /// Serializes the stack as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns the hex SHA-256 of the JSON serialization.
    ///
    /// Two builds from identical declarations have identical digests.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn digest(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(format!("{:x}", Sha256::digest(&json)))
    }
}
