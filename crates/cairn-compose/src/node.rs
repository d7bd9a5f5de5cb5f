//! Resource node declarations.
//!
//! A node is plain data: a kind, concrete config, input slots that hold
//! either literals or references, and optionally pinned output values.

use std::collections::BTreeMap;
use std::fmt;

use cairn_common::types::{NodeId, ResourceKind};
use serde::{Deserialize, Serialize};

/// A config attribute or literal input value.
pub type Value = serde_json::Value;

/// Pointer from a consumer input slot to a producer output slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Producing node.
    pub producer: NodeId,
    /// Output slot on the producer.
    pub output: String,
}

impl Reference {
    /// Creates a reference to `producer.output`.
    #[must_use]
    pub fn new(producer: impl Into<NodeId>, output: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            output: output.into(),
        }
    }

    /// Parses the dotted `producer.output` form.
    ///
    /// The split happens at the last dot, so producer ids may contain dots.
    /// Returns `None` when either side is empty.
    #[must_use]
    pub fn parse(dotted: &str) -> Option<Self> {
        let (producer, output) = dotted.rsplit_once('.')?;
        if producer.is_empty() || output.is_empty() {
            return None;
        }
        Some(Self::new(producer, output))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.producer, self.output)
    }
}

/// Content of an input slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
    /// A concrete value.
    Literal(Value),
    /// Another node's output, substituted during composition.
    Ref(Reference),
}

impl Input {
    /// Returns the reference if this slot is wired.
    #[must_use]
    pub const fn reference(&self) -> Option<&Reference> {
        match self {
            Self::Ref(r) => Some(r),
            Self::Literal(_) => None,
        }
    }
}

/// One declared infrastructure unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Identifier unique within the stack.
    pub id: NodeId,
    /// Resource category.
    pub kind: ResourceKind,
    /// Kind-specific attributes.
    pub config: BTreeMap<String, Value>,
    /// Input slots.
    pub inputs: BTreeMap<String, Input>,
    /// Output values fixed at declaration time instead of rendered.
    pub pinned_outputs: BTreeMap<String, String>,
}

impl ResourceNode {
    /// Creates a node with empty config and no inputs.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            config: BTreeMap::new(),
            inputs: BTreeMap::new(),
            pinned_outputs: BTreeMap::new(),
        }
    }

    /// Sets a config attribute.
    #[must_use]
    pub fn with_config(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.config.insert(field.into(), value.into());
        self
    }

    /// Binds an input slot to a literal value.
    #[must_use]
    pub fn with_literal(mut self, slot: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self
            .inputs
            .insert(slot.into(), Input::Literal(value.into()));
        self
    }

    /// Binds an input slot to `producer.output`.
    #[must_use]
    pub fn with_ref(
        mut self,
        slot: impl Into<String>,
        producer: impl Into<NodeId>,
        output: impl Into<String>,
    ) -> Self {
        let _ = self
            .inputs
            .insert(slot.into(), Input::Ref(Reference::new(producer, output)));
        self
    }

    /// Pins an output slot to a fixed value.
    #[must_use]
    pub fn with_output(mut self, slot: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.pinned_outputs.insert(slot.into(), value.into());
        self
    }

    /// Iterates over the wired input slots.
    pub fn references(&self) -> impl Iterator<Item = (&str, &Reference)> {
        self.inputs
            .iter()
            .filter_map(|(slot, input)| input.reference().map(|r| (slot.as_str(), r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dotted_reference() {
        let r = Reference::parse("network.subnetId").expect("parse");
        assert_eq!(r.producer.as_str(), "network");
        assert_eq!(r.output, "subnetId");
        assert_eq!(r.to_string(), "network.subnetId");
    }

    #[test]
    fn parse_splits_at_last_dot() {
        let r = Reference::parse("api.v2.url").expect("parse");
        assert_eq!(r.producer.as_str(), "api.v2");
        assert_eq!(r.output, "url");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(Reference::parse("network").is_none());
        assert!(Reference::parse(".subnetId").is_none());
        assert!(Reference::parse("network.").is_none());
    }

    #[test]
    fn builder_collects_references_only() {
        let node = ResourceNode::new("database", ResourceKind::Database)
            .with_config("engine", "postgres")
            .with_ref("subnetId", "network", "subnetId")
            .with_literal("credentialsSecret", "arn:imported");

        let refs: Vec<_> = node.references().collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0, "subnetId");
        assert_eq!(refs[0].1, &Reference::new("network", "subnetId"));
    }
}
