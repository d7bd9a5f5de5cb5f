//! Formatted output helpers for CLI commands.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use cairn_common::types::NodeId;
use cairn_compose::Stack;
use clap::ValueEnum;

const RULE_WIDTH: usize = 48;

/// Serialization of the export table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// A JSON object.
    Json,
    /// A YAML mapping.
    Yaml,
}

/// Renders the provisioning plan of `stack` as text.
#[must_use]
pub fn render_plan(stack: &Stack) -> String {
    let env = &stack.environment;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Provisioning plan for: {} ({} / {} / {})",
        stack.name, env.name, env.account, env.region
    );
    let _ = writeln!(out, "{}", "\u{2550}".repeat(RULE_WIDTH));
    let _ = writeln!(out);

    for (position, resource) in stack.resources.iter().enumerate() {
        let _ = writeln!(out, "  {:>3}. {} ({})", position + 1, resource.id, resource.kind);
        let _ = writeln!(out, "        name: {}", resource.name);
        if !resource.depends_on.is_empty() {
            let deps: Vec<&str> = resource.depends_on.iter().map(NodeId::as_str).collect();
            let _ = writeln!(out, "        after: {}", deps.join(", "));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {} resource(s) will be provisioned.", stack.resources.len());

    if !stack.exports.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Exports:");
        for export in stack.exports.values() {
            let _ = writeln!(out, "    {} = {}", export.name, export.value);
        }
    }
    out
}

/// Serializes an export table.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_exports(table: &BTreeMap<String, String>, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(table)?),
        OutputFormat::Yaml => serde_yaml::to_string(table)?,
    })
}

#[cfg(test)]
mod tests {
    use cairn_common::config::Environment;
    use cairn_common::types::ResourceKind;
    use cairn_compose::{ExportDecl, ResourceNode, StackBuilder};

    use super::*;

    fn stack() -> Stack {
        let mut b = StackBuilder::new("site", Environment::default());
        let _ = b
            .declare(ResourceNode::new("network", ResourceKind::Network).with_config("cidr", "10.0.0.0/16"))
            .expect("network")
            .declare(
                ResourceNode::new("database", ResourceKind::Database)
                    .with_config("engine", "postgres")
                    .with_ref("subnetId", "network", "subnetId"),
            )
            .expect("database")
            .export(ExportDecl::new("DbPort", "database", "port"))
            .expect("export");
        b.build().expect("build")
    }

    #[test]
    fn plan_lists_resources_in_order() {
        let plan = render_plan(&stack());
        let network = plan.find("1. network (network)").expect("network line");
        let database = plan.find("2. database (database)").expect("database line");
        assert!(network < database);
        assert!(plan.contains("name: dev-database-000000000000-us-east-1"));
        assert!(plan.contains("after: network"));
        assert!(plan.contains("2 resource(s)"));
        assert!(plan.contains("DbPort = 5432"));
    }

    #[test]
    fn exports_render_as_json() {
        let text = render_exports(&stack().export_table(), OutputFormat::Json).expect("json");
        let parsed: BTreeMap<String, String> = serde_json::from_str(&text).expect("parse");
        assert_eq!(parsed["DbPort"], "5432");
    }

    #[test]
    fn exports_render_as_yaml() {
        let text = render_exports(&stack().export_table(), OutputFormat::Yaml).expect("yaml");
        assert_eq!(text.trim(), "DbPort: '5432'");
    }
}
