//! YAML stack manifests.
//!
//! A manifest is a file-shaped equivalent of the [`StackBuilder`] API.
//! Resources are declared in file order, so a reference must point at a
//! resource listed above it.
//!
//! ```yaml
//! stack: site
//! resources:
//!   - id: network
//!     kind: network
//!     config: { cidr: 10.0.0.0/16 }
//!   - id: database
//!     kind: database
//!     config: { engine: postgres }
//!     inputs:
//!       subnetId: { ref: network.subnetId }
//! exports:
//!   - name: DbEndpoint
//!     from: database.endpoint
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use cairn_common::config::Environment;
use cairn_common::error::{CairnError, Result};
use cairn_common::types::NodeId;
use serde::{Deserialize, Serialize};

use crate::exporter::ExportDecl;
use crate::node::{Input, Reference, ResourceNode, Value};
use crate::registry;
use crate::wiring::StackBuilder;

/// Key marking an input map as a reference.
const REF_KEY: &str = "ref";

/// Top-level manifest document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Stack name.
    pub stack: String,
    /// Resources in declaration order.
    #[serde(default)]
    pub resources: Vec<ResourceDecl>,
    /// Exported outputs.
    #[serde(default)]
    pub exports: Vec<ExportEntry>,
}

/// One resource entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDecl {
    /// Node id.
    pub id: String,
    /// Kind tag, e.g. `object-store`.
    pub kind: String,
    /// Config attributes.
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
    /// Input slots. `{ ref: producer.output }` is a reference, anything
    /// else a literal.
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
    /// Pinned output values.
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

/// One export entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportEntry {
    /// Export name.
    pub name: String,
    /// Source in `node.output` form.
    pub from: String,
    /// Operator-facing description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Parses a manifest from YAML text.
///
/// # Errors
///
/// Returns `CairnError::Manifest` if the text is not a valid manifest.
pub fn parse_manifest(text: &str) -> Result<Manifest> {
    serde_yaml::from_str(text).map_err(|e| CairnError::Manifest {
        message: e.to_string(),
    })
}

/// Reads and parses a manifest file.
///
/// # Errors
///
/// Returns `CairnError::Io` if the file cannot be read and
/// `CairnError::Manifest` if it cannot be parsed.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    tracing::info!(path = %path.display(), "loading manifest");
    let text = std::fs::read_to_string(path).map_err(|source| CairnError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&text)
}

impl Manifest {
    /// Replays the manifest into a [`StackBuilder`] for `environment`.
    ///
    /// # Errors
    ///
    /// Returns the first declaration error, `InvalidValue` for a malformed
    /// `ref`, or `InvalidExport` for a malformed `from`.
    pub fn into_builder(self, environment: Environment) -> Result<StackBuilder> {
        let mut builder = StackBuilder::new(self.stack, environment);

        for decl in self.resources {
            let id = NodeId::new(decl.id);
            let kind = registry::resolve_kind(&id, &decl.kind)?;
            let mut node = ResourceNode::new(id, kind);
            node.config = decl.config;
            node.pinned_outputs = decl.outputs;
            for (slot, value) in decl.inputs {
                let input = to_input(&node.id, &slot, value)?;
                let _ = node.inputs.insert(slot, input);
            }
            let _ = builder.declare(node)?;
        }

        for entry in self.exports {
            let source = Reference::parse(&entry.from).ok_or_else(|| CairnError::InvalidExport {
                export: entry.name.clone(),
                node: entry.from.clone(),
                slot: "from".into(),
                reason: "expected the form node.output".into(),
            })?;
            let _ = builder.export(ExportDecl {
                name: entry.name,
                source,
                description: entry.description,
            })?;
        }

        Ok(builder)
    }
}

fn to_input(node: &NodeId, slot: &str, value: Value) -> Result<Input> {
    let Value::Object(map) = &value else {
        return Ok(Input::Literal(value));
    };
    if map.len() != 1 || !map.contains_key(REF_KEY) {
        return Ok(Input::Literal(value));
    }
    map.get(REF_KEY)
        .and_then(Value::as_str)
        .and_then(Reference::parse)
        .map(Input::Ref)
        .ok_or_else(|| CairnError::InvalidValue {
            node: node.to_string(),
            field: slot.to_string(),
            reason: format!("ref must be a string of the form producer.output, got {value}"),
        })
}
