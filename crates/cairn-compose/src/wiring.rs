//! Stack declaration and reference wiring.
//!
//! [`StackBuilder`] accumulates nodes, wiring edges and exports in a single
//! pass. A reference may only point at a producer declared *before* its
//! consumer, which keeps every fully wired graph acyclic by construction.

use std::collections::HashMap;

use cairn_common::config::Environment;
use cairn_common::constants::{ENVIRONMENT_NODE, ENVIRONMENT_OUTPUTS};
use cairn_common::error::{CairnError, Result};
use cairn_common::types::NodeId;

use crate::exporter::{self, ExportDecl};
use crate::node::{Input, Reference, ResourceNode};
use crate::registry::{self, InputSpec};
use crate::stack::Stack;

/// Accumulates declarations for one stack build.
#[derive(Debug, Clone)]
pub struct StackBuilder {
    name: String,
    environment: Environment,
    nodes: Vec<ResourceNode>,
    positions: HashMap<NodeId, usize>,
    exports: Vec<ExportDecl>,
}

impl StackBuilder {
    /// Starts an empty stack for `environment`.
    #[must_use]
    pub fn new(name: impl Into<String>, environment: Environment) -> Self {
        Self {
            name: name.into(),
            environment,
            nodes: Vec::new(),
            positions: HashMap::new(),
            exports: Vec::new(),
        }
    }

    /// Returns the stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the build environment.
    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Returns the declared nodes in declaration order, with validated config.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Looks up a declared node.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.positions.get(id).map(|&pos| &self.nodes[pos])
    }

    /// Returns the declared exports in declaration order.
    #[must_use]
    pub fn exports(&self) -> &[ExportDecl] {
        &self.exports
    }

    /// Declares a node.
    ///
    /// The node's config is validated and completed with defaults, every
    /// input slot must exist in the kind's schema, and every reference must
    /// point at an output of a node declared earlier. On error nothing is
    /// recorded.
    ///
    /// # Errors
    ///
    /// Returns a schema violation for a malformed or duplicate id, bad config,
    /// unknown input slots or unknown pinned outputs, and a wiring violation
    /// for any reference that cannot be satisfied.
    pub fn declare(&mut self, mut node: ResourceNode) -> Result<&mut Self> {
        self.check_id(&node.id)?;
        let schema = registry::schema(node.kind);
        node.config = registry::validate_config(&node.id, node.kind, &node.config)?;

        let position = self.nodes.len();
        for (slot, input) in &node.inputs {
            let spec = schema
                .input(slot)
                .ok_or_else(|| CairnError::UnknownInputSlot {
                    node: node.id.to_string(),
                    slot: slot.clone(),
                    kind: node.kind.to_string(),
                })?;
            if let Input::Ref(reference) = input {
                self.check_reference(&node.id, position, spec, reference)?;
            }
        }

        if let Some(pinned) = node.pinned_outputs.keys().find(|o| !schema.has_output(o)) {
            return Err(CairnError::InvalidValue {
                node: node.id.to_string(),
                field: pinned.clone(),
                reason: format!("{} does not produce this output", node.kind),
            });
        }

        tracing::debug!(node = %node.id, kind = %node.kind, "declared resource");
        let _ = self.positions.insert(node.id.clone(), position);
        self.nodes.push(node);
        Ok(self)
    }

    /// Binds `consumer.slot` to `producer.output`.
    ///
    /// The producer must have been declared before the consumer itself, not
    /// merely before this call.
    ///
    /// # Errors
    ///
    /// Returns `UnknownConsumer` if the consumer is not declared,
    /// `UnknownInputSlot` if its kind has no such slot, `SlotAlreadyBound`
    /// if the slot is taken, `SelfReference` if producer and consumer are the
    /// same node, `UnknownProducer` if the producer was not declared before
    /// the consumer, `UnknownOutputSlot` if the producer's kind does not
    /// declare `output`, and `IncompatibleProducer` if the slot does not
    /// accept the producer's kind.
    pub fn wire(
        &mut self,
        consumer: &str,
        slot: &str,
        producer: &str,
        output: &str,
    ) -> Result<&mut Self> {
        let position =
            *self
                .positions
                .get(consumer)
                .ok_or_else(|| CairnError::UnknownConsumer {
                    node: consumer.to_string(),
                    slot: slot.to_string(),
                })?;
        let node = &self.nodes[position];
        let spec = registry::schema(node.kind)
            .input(slot)
            .ok_or_else(|| CairnError::UnknownInputSlot {
                node: consumer.to_string(),
                slot: slot.to_string(),
                kind: node.kind.to_string(),
            })?;
        if node.inputs.contains_key(slot) {
            return Err(CairnError::SlotAlreadyBound {
                node: consumer.to_string(),
                slot: slot.to_string(),
            });
        }

        let reference = Reference::new(producer, output);
        self.check_reference(&node.id, position, spec, &reference)?;

        tracing::debug!(consumer, slot, reference = %reference, "wired input");
        let _ = self.nodes[position]
            .inputs
            .insert(slot.to_string(), Input::Ref(reference));
        Ok(self)
    }

    /// Declares an export.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateExport` if the name is already exported from a
    /// different source.
    pub fn export(&mut self, decl: ExportDecl) -> Result<&mut Self> {
        exporter::declare_export(&mut self.exports, decl)?;
        Ok(self)
    }

    /// Composes the declarations into a [`Stack`].
    ///
    /// # Errors
    ///
    /// Returns the first error found; no partial stack is produced.
    pub fn build(&self) -> Result<Stack> {
        crate::composer::compose(self)
    }

    fn check_id(&self, id: &NodeId) -> Result<()> {
        if !id.is_well_formed() {
            return Err(CairnError::InvalidValue {
                node: id.to_string(),
                field: "id".into(),
                reason: "ids use ASCII letters, digits, '-', '_' and '.'".into(),
            });
        }
        if id.as_str() == ENVIRONMENT_NODE {
            return Err(CairnError::InvalidValue {
                node: id.to_string(),
                field: "id".into(),
                reason: format!("\"{ENVIRONMENT_NODE}\" is reserved"),
            });
        }
        if self.positions.contains_key(id) {
            return Err(CairnError::DuplicateNode {
                node: id.to_string(),
            });
        }
        Ok(())
    }

    fn check_reference(
        &self,
        consumer: &NodeId,
        consumer_position: usize,
        spec: &InputSpec,
        reference: &Reference,
    ) -> Result<()> {
        let slot = spec.name;
        if &reference.producer == consumer {
            return Err(CairnError::SelfReference {
                node: consumer.to_string(),
                slot: slot.to_string(),
            });
        }

        if reference.producer.as_str() == ENVIRONMENT_NODE {
            if ENVIRONMENT_OUTPUTS.contains(&reference.output.as_str()) {
                return Ok(());
            }
            return Err(CairnError::UnknownOutputSlot {
                node: consumer.to_string(),
                slot: slot.to_string(),
                producer: ENVIRONMENT_NODE.to_string(),
                output: reference.output.clone(),
            });
        }

        let producer = self
            .positions
            .get(&reference.producer)
            .filter(|&&pos| pos < consumer_position)
            .map(|&pos| &self.nodes[pos])
            .ok_or_else(|| CairnError::UnknownProducer {
                node: consumer.to_string(),
                slot: slot.to_string(),
                producer: reference.producer.to_string(),
            })?;

        if !registry::schema(producer.kind).has_output(&reference.output) {
            return Err(CairnError::UnknownOutputSlot {
                node: consumer.to_string(),
                slot: slot.to_string(),
                producer: producer.id.to_string(),
                output: reference.output.clone(),
            });
        }
        if !spec.accepts(producer.kind) {
            return Err(CairnError::IncompatibleProducer {
                node: consumer.to_string(),
                slot: slot.to_string(),
                producer: producer.id.to_string(),
                kind: producer.kind.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cairn_common::error::ErrorKind;
    use cairn_common::types::ResourceKind;

    use super::*;

    fn builder() -> StackBuilder {
        StackBuilder::new("site", Environment::default())
    }

    fn network(id: &str) -> ResourceNode {
        ResourceNode::new(id, ResourceKind::Network).with_config("cidr", "10.0.0.0/16")
    }

    fn database(id: &str) -> ResourceNode {
        ResourceNode::new(id, ResourceKind::Database).with_config("engine", "postgres")
    }

    #[test]
    fn declare_then_wire() {
        let mut b = builder();
        let _ = b
            .declare(network("network"))
            .expect("network")
            .declare(database("database"))
            .expect("database")
            .wire("database", "subnetId", "network", "subnetId")
            .expect("wire");
        let db = b.node("database").expect("declared");
        assert_eq!(
            db.inputs.get("subnetId"),
            Some(&Input::Ref(Reference::new("network", "subnetId")))
        );
    }

    #[test]
    fn declare_stores_validated_config() {
        let mut b = builder();
        let _ = b.declare(database("database")).expect("database");
        let db = b.node("database").expect("declared");
        assert_eq!(db.config.get("port"), Some(&serde_json::json!(5432)));
    }

    #[test]
    fn wire_to_undeclared_producer_is_unknown_producer() {
        let mut b = builder();
        let gateway = ResourceNode::new("gateway", ResourceKind::Gateway);
        let _ = b.declare(gateway).expect("gateway");
        let err = b.wire("gateway", "backend", "compute-1", "invokeArn").unwrap_err();
        assert!(
            matches!(err, CairnError::UnknownProducer { ref producer, .. } if producer == "compute-1"),
            "got: {err}"
        );
        assert_eq!(err.kind(), ErrorKind::Wiring);
    }

    #[test]
    fn wire_to_later_producer_is_unknown_producer() {
        let mut b = builder();
        let _ = b
            .declare(database("database"))
            .expect("database")
            .declare(network("network"))
            .expect("network");
        let err = b.wire("database", "subnetId", "network", "subnetId").unwrap_err();
        assert!(matches!(err, CairnError::UnknownProducer { .. }), "got: {err}");
    }

    #[test]
    fn declare_with_forward_reference_fails_atomically() {
        let mut b = builder();
        let err = b
            .declare(database("database").with_ref("subnetId", "network", "subnetId"))
            .unwrap_err();
        assert!(matches!(err, CairnError::UnknownProducer { .. }), "got: {err}");
        assert!(b.nodes().is_empty());
        assert!(b.node("database").is_none());
    }

    #[test]
    fn unknown_output_slot() {
        let mut b = builder();
        let _ = b.declare(network("network")).expect("network");
        let err = b
            .declare(database("database").with_ref("subnetId", "network", "endpoint"))
            .unwrap_err();
        assert!(
            matches!(err, CairnError::UnknownOutputSlot { ref output, .. } if output == "endpoint"),
            "got: {err}"
        );
    }

    #[test]
    fn incompatible_producer_kind() {
        let mut b = builder();
        let _ = b
            .declare(ResourceNode::new("secret", ResourceKind::Secret))
            .expect("secret");
        let err = b
            .declare(database("database").with_ref("subnetId", "secret", "secretArn"))
            .unwrap_err();
        assert!(matches!(err, CairnError::IncompatibleProducer { .. }), "got: {err}");
    }

    #[test]
    fn self_reference_is_rejected() {
        let mut b = builder();
        let _ = b
            .declare(ResourceNode::new("bucket", ResourceKind::ObjectStore))
            .expect("bucket");
        let err = b
            .wire("bucket", "accessLogBucket", "bucket", "bucketName")
            .unwrap_err();
        assert!(matches!(err, CairnError::SelfReference { .. }), "got: {err}");
    }

    #[test]
    fn slot_cannot_be_bound_twice() {
        let mut b = builder();
        let _ = b
            .declare(network("a"))
            .expect("a")
            .declare(network("b"))
            .expect("b")
            .declare(database("database").with_ref("subnetId", "a", "subnetId"))
            .expect("database");
        let err = b.wire("database", "subnetId", "b", "subnetId").unwrap_err();
        assert!(matches!(err, CairnError::SlotAlreadyBound { .. }), "got: {err}");
    }

    #[test]
    fn unknown_consumer_and_slot() {
        let mut b = builder();
        let _ = b.declare(network("network")).expect("network");
        assert!(matches!(
            b.wire("ghost", "subnetId", "network", "subnetId").unwrap_err(),
            CairnError::UnknownConsumer { .. }
        ));
        let _ = b.declare(database("database")).expect("database");
        assert!(matches!(
            b.wire("database", "vpc", "network", "vpcId").unwrap_err(),
            CairnError::UnknownInputSlot { .. }
        ));
    }

    #[test]
    fn duplicate_and_reserved_ids() {
        let mut b = builder();
        let _ = b.declare(network("network")).expect("network");
        assert!(matches!(
            b.declare(network("network")).unwrap_err(),
            CairnError::DuplicateNode { .. }
        ));
        assert!(b.declare(network(ENVIRONMENT_NODE)).is_err());
        assert!(b.declare(network("bad id")).is_err());
    }

    #[test]
    fn environment_outputs_are_referenceable() {
        let mut b = builder();
        let _ = b.declare(network("network")).expect("network");
        let node = database("database")
            .with_ref("subnetId", "network", "subnetId")
            .with_ref("credentialsSecret", ENVIRONMENT_NODE, "account");
        let _ = b.declare(node).expect("environment ref");
        let err = b
            .declare(
                database("other")
                    .with_ref("subnetId", "network", "subnetId")
                    .with_ref("credentialsSecret", ENVIRONMENT_NODE, "zone"),
            )
            .unwrap_err();
        assert!(matches!(err, CairnError::UnknownOutputSlot { .. }), "got: {err}");
    }

    #[test]
    fn pinned_output_must_be_declared() {
        let mut b = builder();
        let err = b
            .declare(network("network").with_output("endpoint", "x"))
            .unwrap_err();
        assert!(matches!(err, CairnError::InvalidValue { ref field, .. } if field == "endpoint"));
    }
}
