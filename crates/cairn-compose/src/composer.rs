//! Stack composer.
//!
//! Turns the declarations of a [`StackBuilder`] into a [`Stack`]: required
//! inputs are checked, names derived, nodes ordered, references substituted
//! and exports collected. The first failure aborts the whole build.

use std::collections::HashMap;

use cairn_common::config::Environment;
use cairn_common::constants::ENVIRONMENT_NODE;
use cairn_common::error::{CairnError, Result};
use cairn_common::types::NodeId;

use crate::exporter;
use crate::graph::DependencyGraph;
use crate::naming;
use crate::node::{Input, Reference, ResourceNode, Value};
use crate::registry::{self, RenderContext};
use crate::stack::{ResolvedResource, Stack};
use crate::wiring::StackBuilder;

/// Composes the declarations of `builder` into a stack.
///
/// # Errors
///
/// Returns `MissingInput`, `DuplicateName`, any wiring or ordering
/// violation found defensively, or an export violation. No partial stack is
/// ever returned.
pub fn compose(builder: &StackBuilder) -> Result<Stack> {
    let environment = builder.environment();
    let nodes = builder.nodes();
    tracing::info!(stack = builder.name(), nodes = nodes.len(), "composing stack");

    check_required_inputs(nodes)?;
    let names = naming::assign_names(environment, nodes.iter().map(|n| &n.id))?;
    let order = provisioning_order(nodes)?;

    let by_id: HashMap<&NodeId, &ResourceNode> = nodes.iter().map(|n| (&n.id, n)).collect();
    let mut resources: Vec<ResolvedResource> = Vec::with_capacity(nodes.len());
    let mut positions: HashMap<NodeId, usize> = HashMap::with_capacity(nodes.len());

    for node in order.iter().filter_map(|id| by_id.get(id).copied()) {
        let name = names.get(&node.id).cloned().unwrap_or_default();
        let resource = resolve_node(node, name, environment, &resources, &positions)?;
        tracing::debug!(node = %resource.id, name = %resource.name, "resolved resource");
        let _ = positions.insert(resource.id.clone(), resources.len());
        resources.push(resource);
    }

    let exports = exporter::collect_exports(builder.exports(), &resources, environment)?;
    tracing::info!(
        stack = builder.name(),
        resources = resources.len(),
        exports = exports.len(),
        "stack composed"
    );

    Ok(Stack {
        name: builder.name().to_string(),
        environment: environment.clone(),
        resources,
        exports,
    })
}

fn check_required_inputs(nodes: &[ResourceNode]) -> Result<()> {
    for node in nodes {
        let missing = registry::declared_inputs(node.kind)
            .iter()
            .find(|spec| spec.required && !node.inputs.contains_key(spec.name));
        if let Some(spec) = missing {
            return Err(CairnError::MissingInput {
                node: node.id.to_string(),
                slot: spec.name.to_string(),
            });
        }
    }
    Ok(())
}

/// Builds the dependency graph in declaration order and sorts it.
fn provisioning_order(nodes: &[ResourceNode]) -> Result<Vec<NodeId>> {
    let mut graph = DependencyGraph::new();
    let indices: HashMap<&NodeId, _> = nodes
        .iter()
        .map(|n| (&n.id, graph.add_resource(n.id.clone())))
        .collect();

    for node in nodes {
        for (slot, reference) in node.references() {
            if reference.producer.as_str() == ENVIRONMENT_NODE {
                continue;
            }
            let (Some(&consumer), Some(&producer)) =
                (indices.get(&node.id), indices.get(&reference.producer))
            else {
                return Err(CairnError::UnknownProducer {
                    node: node.id.to_string(),
                    slot: slot.to_string(),
                    producer: reference.producer.to_string(),
                });
            };
            graph.add_dependency(consumer, producer, slot);
        }
    }

    graph.resolve_order()
}

fn resolve_node(
    node: &ResourceNode,
    name: String,
    environment: &Environment,
    resources: &[ResolvedResource],
    positions: &HashMap<NodeId, usize>,
) -> Result<ResolvedResource> {
    let mut config = node.config.clone();
    let mut depends_on: Vec<NodeId> = Vec::new();

    for (slot, input) in &node.inputs {
        let value = match input {
            Input::Literal(value) => value.clone(),
            Input::Ref(reference) => {
                let value = resolve_reference(reference, environment, resources, positions)
                    .ok_or_else(|| CairnError::UnresolvedReference {
                        node: node.id.to_string(),
                        slot: slot.clone(),
                        producer: reference.producer.to_string(),
                    })?;
                if reference.producer.as_str() != ENVIRONMENT_NODE
                    && !depends_on.contains(&reference.producer)
                {
                    depends_on.push(reference.producer.clone());
                }
                Value::String(value)
            }
        };
        let _ = config.insert(slot.clone(), value);
    }
    depends_on.sort_by_key(|id| positions.get(id).copied());

    let ctx = RenderContext {
        id: &node.id,
        kind: node.kind,
        name: &name,
        environment,
        config: &config,
    };
    let mut outputs = registry::render_outputs(&ctx);
    for (slot, value) in &node.pinned_outputs {
        let _ = outputs.insert(slot.clone(), value.clone());
    }

    Ok(ResolvedResource {
        id: node.id.clone(),
        kind: node.kind,
        name,
        config,
        outputs,
        depends_on,
    })
}

/// Reads a producer output; `None` if the producer is not resolved yet.
fn resolve_reference(
    reference: &Reference,
    environment: &Environment,
    resources: &[ResolvedResource],
    positions: &HashMap<NodeId, usize>,
) -> Option<String> {
    if reference.producer.as_str() == ENVIRONMENT_NODE {
        return environment.output(&reference.output).map(ToString::to_string);
    }
    positions
        .get(&reference.producer)
        .and_then(|&pos| resources.get(pos))
        .and_then(|producer| producer.outputs.get(&reference.output))
        .cloned()
}
