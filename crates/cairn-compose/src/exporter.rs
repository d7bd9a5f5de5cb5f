//! Output exporter.
//!
//! Projects explicitly exported outputs of a composed stack into a flat
//! table. No computation happens here; values are read off resources that
//! the composer has already resolved.

use std::collections::BTreeMap;

use cairn_common::config::Environment;
use cairn_common::constants::ENVIRONMENT_NODE;
use cairn_common::error::{CairnError, Result};
use cairn_common::types::NodeId;

use crate::node::Reference;
use crate::stack::{Export, ResolvedResource};

/// A declared export, before values are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDecl {
    /// Export name.
    pub name: String,
    /// Node output to export.
    pub source: Reference,
    /// Operator-facing description.
    pub description: Option<String>,
}

impl ExportDecl {
    /// Declares `name` as the value of `node.output`.
    #[must_use]
    pub fn new(name: impl Into<String>, node: impl Into<NodeId>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: Reference::new(node, output),
            description: None,
        }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Records `decl` in `exports`.
///
/// Re-declaring a name with the same source is a no-op.
///
/// # Errors
///
/// Returns `CairnError::DuplicateExport` if the name is already bound to a
/// different source.
pub fn declare_export(exports: &mut Vec<ExportDecl>, decl: ExportDecl) -> Result<()> {
    if let Some(existing) = exports.iter().find(|e| e.name == decl.name) {
        if existing.source == decl.source {
            return Ok(());
        }
        return Err(CairnError::DuplicateExport {
            export: decl.name,
            node: decl.source.producer.to_string(),
            slot: decl.source.output,
        });
    }
    exports.push(decl);
    Ok(())
}

/// Builds the export map from resolved resources.
///
/// The virtual environment node can be exported like any resource.
///
/// # Errors
///
/// Returns `CairnError::InvalidExport` if a declaration references a node
/// that is not in `resources` or an output the node did not produce, and
/// `CairnError::DuplicateExport` if two declarations share a name.
pub fn collect_exports(
    decls: &[ExportDecl],
    resources: &[ResolvedResource],
    environment: &Environment,
) -> Result<BTreeMap<String, Export>> {
    let mut table = BTreeMap::new();
    for decl in decls {
        let value = lookup(decl, resources, environment)?;
        if table.contains_key(&decl.name) {
            return Err(CairnError::DuplicateExport {
                export: decl.name.clone(),
                node: decl.source.producer.to_string(),
                slot: decl.source.output.clone(),
            });
        }
        tracing::debug!(export = %decl.name, source = %decl.source, "exported output");
        let _ = table.insert(
            decl.name.clone(),
            Export {
                name: decl.name.clone(),
                value,
                source: decl.source.clone(),
                description: decl.description.clone(),
            },
        );
    }
    Ok(table)
}

fn lookup(
    decl: &ExportDecl,
    resources: &[ResolvedResource],
    environment: &Environment,
) -> Result<String> {
    let invalid = |reason: &str| CairnError::InvalidExport {
        export: decl.name.clone(),
        node: decl.source.producer.to_string(),
        slot: decl.source.output.clone(),
        reason: reason.to_string(),
    };

    if decl.source.producer.as_str() == ENVIRONMENT_NODE {
        return environment
            .output(&decl.source.output)
            .map(ToString::to_string)
            .ok_or_else(|| invalid("the environment has no such output"));
    }

    let resource = resources
        .iter()
        .find(|r| r.id == decl.source.producer)
        .ok_or_else(|| invalid("node is not in the stack"))?;
    resource
        .outputs
        .get(&decl.source.output)
        .cloned()
        .ok_or_else(|| invalid("node did not produce this output"))
}
