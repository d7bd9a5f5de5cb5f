//! Portfolio blueprint.
//!
//! A ready-made stack for a personal web property: a static UI served
//! through an edge cache, an API function behind an HTTP gateway, a
//! relational database in a private network, an identity pool and
//! alarms. `demos/portfolio.yaml` describes the same topology.

use cairn_common::config::Environment;
use cairn_common::constants::ENVIRONMENT_NODE;
use cairn_common::error::Result;
use cairn_common::types::ResourceKind;

use crate::exporter::ExportDecl;
use crate::node::ResourceNode;
use crate::wiring::StackBuilder;

/// Stack name used by [`portfolio`].
pub const PORTFOLIO_STACK: &str = "portfolio";

/// Knobs of the portfolio blueprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioParams {
    /// Public origin of the UI, an `https://` URL.
    pub ui_origin: String,
    /// Network CIDR block.
    pub cidr: String,
    /// Name of the application database.
    pub database_name: String,
}

impl Default for PortfolioParams {
    fn default() -> Self {
        Self {
            ui_origin: "https://example.dev".into(),
            cidr: "10.0.0.0/16".into(),
            database_name: "portfolio".into(),
        }
    }
}

/// Declares the portfolio stack for `environment`.
///
/// # Errors
///
/// Returns a schema violation if `params` hold an invalid CIDR or origin.
pub fn portfolio(environment: Environment, params: &PortfolioParams) -> Result<StackBuilder> {
    let production = environment.name == "prod";
    let mut b = StackBuilder::new(PORTFOLIO_STACK, environment);

    let _ = b
        .declare(
            ResourceNode::new("encryption-key", ResourceKind::Key)
                .with_config("description", "Encryption at rest for data stores and secrets"),
        )?
        .declare(
            ResourceNode::new("network", ResourceKind::Network)
                .with_config("cidr", params.cidr.as_str())
                .with_config("maxAzs", 2),
        )?;

    for (id, generated) in [("db-secret", true), ("auth-secret", false), ("api-keys-secret", false)] {
        let _ = b.declare(
            ResourceNode::new(id, ResourceKind::Secret)
                .with_config("generated", generated)
                .with_ref("encryptionKey", "encryption-key", "keyArn"),
        )?;
    }

    let _ = b
        .declare(
            ResourceNode::new("database", ResourceKind::Database)
                .with_config("engine", "postgres")
                .with_config("databaseName", params.database_name.as_str())
                .with_config("multiAz", production)
                .with_config("deletionProtection", production)
                .with_ref("subnetId", "network", "subnetId")
                .with_ref("credentialsSecret", "db-secret", "secretArn")
                .with_ref("encryptionKey", "encryption-key", "keyArn"),
        )?
        .declare(
            ResourceNode::new("access-logs", ResourceKind::ObjectStore)
                .with_config("noncurrentExpirationDays", 90)
                .with_ref("encryptionKey", "encryption-key", "keyArn"),
        )?
        .declare(
            ResourceNode::new("ui-bucket", ResourceKind::ObjectStore)
                .with_config("versioned", true)
                .with_config("noncurrentExpirationDays", 30)
                .with_config("logPrefix", "ui-bucket/")
                .with_ref("accessLogBucket", "access-logs", "bucketName"),
        )?
        .declare(
            ResourceNode::new("api-role", ResourceKind::Role)
                .with_config("assumedBy", "compute")
                .with_ref("databaseSecret", "db-secret", "secretArn")
                .with_ref("apiKeysSecret", "api-keys-secret", "secretArn")
                .with_ref("authSecret", "auth-secret", "secretArn")
                .with_ref("encryptionKey", "encryption-key", "keyArn")
                .with_ref("securityGroupId", "database", "securityGroupId"),
        )?
        .declare(
            ResourceNode::new("gateway-role", ResourceKind::Role)
                .with_config("assumedBy", "gateway"),
        )?
        .declare(
            ResourceNode::new("api-function", ResourceKind::Compute)
                .with_config("image", "portfolio-api:latest")
                .with_config("logLevel", if production { "info" } else { "debug" })
                .with_ref("role", "api-role", "roleArn")
                .with_ref("subnetId", "network", "subnetId")
                .with_ref("databaseEndpoint", "database", "endpoint")
                .with_ref("databasePort", "database", "port")
                .with_ref("databaseName", "database", "databaseName")
                .with_ref("databaseSecret", "db-secret", "secretArn")
                .with_ref("apiKeysSecret", "api-keys-secret", "secretArn")
                .with_ref("encryptionKey", "encryption-key", "keyArn"),
        )?
        .declare(
            ResourceNode::new("api-gateway", ResourceKind::Gateway)
                .with_config("corsOrigin", params.ui_origin.as_str())
                .with_ref("backend", "api-function", "invokeArn")
                .with_ref("role", "gateway-role", "roleArn"),
        )?
        .declare(
            ResourceNode::new("user-pool", ResourceKind::IdentityProvider)
                .with_config("callbackUrl", format!("{}/auth/callback", params.ui_origin))
                .with_config("logoutUrl", params.ui_origin.as_str())
                .with_ref("clientSecrets", "auth-secret", "secretArn"),
        )?
        .declare(
            ResourceNode::new("cdn", ResourceKind::EdgeCache)
                .with_config("aliasUrl", params.ui_origin.as_str())
                .with_ref("origin", "ui-bucket", "bucketName")
                .with_ref("apiOrigin", "api-gateway", "url")
                .with_ref("logBucket", "access-logs", "bucketName"),
        )?
        .declare(
            ResourceNode::new("monitoring", ResourceKind::Metrics)
                .with_ref("functionName", "api-function", "functionName")
                .with_ref("gatewayId", "api-gateway", "apiId"),
        )?;

    let exports = [
        ("Environment", ENVIRONMENT_NODE, "name", "Deployment environment"),
        ("UiUrl", "cdn", "url", "Edge cache UI URL"),
        ("DistributionId", "cdn", "distributionId", "Edge cache distribution id"),
        ("ApiUrl", "api-gateway", "url", "HTTP gateway URL"),
        ("ApiId", "api-gateway", "apiId", "HTTP gateway id"),
        ("DbEndpoint", "database", "endpoint", "Database endpoint"),
        ("DbPort", "database", "port", "Database port"),
        ("DbName", "database", "databaseName", "Database name"),
        ("DbSecurityGroupId", "database", "securityGroupId", "Database security group"),
        ("DbSecretArn", "db-secret", "secretArn", "Database credentials secret"),
        ("AuthSecretArn", "auth-secret", "secretArn", "Identity client secret"),
        ("ApiKeysSecretArn", "api-keys-secret", "secretArn", "Third-party API keys secret"),
        ("UiBucketName", "ui-bucket", "bucketName", "UI bucket name"),
        ("LogsBucketName", "access-logs", "bucketName", "Access log bucket name"),
        ("UserPoolId", "user-pool", "userPoolId", "Identity pool id"),
        ("UserPoolClientId", "user-pool", "clientId", "Identity pool client id"),
        ("AuthDomain", "user-pool", "domain", "Hosted sign-in domain"),
        ("VpcId", "network", "vpcId", "Network id"),
        ("LambdaRoleArn", "api-role", "roleArn", "API function role"),
        ("ApiGatewayRoleArn", "gateway-role", "roleArn", "HTTP gateway role"),
        ("LambdaFunctionName", "api-function", "functionName", "API function name"),
        ("KmsKeyArn", "encryption-key", "keyArn", "Encryption key"),
        ("DashboardName", "monitoring", "dashboardName", "Metrics dashboard"),
    ];
    for (name, node, output, description) in exports {
        let _ = b.export(ExportDecl::new(name, node, output).with_description(description))?;
    }

    Ok(b)
}

#[cfg(test)]
mod tests {
    use cairn_common::error::CairnError;
    use serde_json::json;

    use super::*;

    #[test]
    fn portfolio_composes_in_declaration_order() {
        let builder = portfolio(Environment::default(), &PortfolioParams::default()).expect("declare");
        let declared: Vec<_> = builder.nodes().iter().map(|n| n.id.clone()).collect();
        let stack = builder.build().expect("build");
        let order: Vec<_> = stack.order().into_iter().cloned().collect();
        assert_eq!(order, declared);
        assert_eq!(stack.resources.len(), 15);
    }

    #[test]
    fn portfolio_wires_database_into_function() {
        let stack = portfolio(Environment::default(), &PortfolioParams::default())
            .expect("declare")
            .build()
            .expect("build");
        let db = stack.resource("database").expect("database");
        let function = stack.resource("api-function").expect("function");
        assert_eq!(function.config["databaseEndpoint"], json!(db.outputs["endpoint"]));
        assert_eq!(function.config["databasePort"], json!("5432"));
        assert_eq!(function.config["databaseName"], json!("portfolio"));
        assert_eq!(stack.exports["DbName"].value, "portfolio");
    }

    #[test]
    fn production_hardens_the_database() {
        let env = Environment::new("prod", "123456789012", "eu-west-1").expect("env");
        let stack = portfolio(env, &PortfolioParams::default())
            .expect("declare")
            .build()
            .expect("build");
        let db = stack.resource("database").expect("database");
        assert_eq!(db.config["multiAz"], json!(true));
        assert_eq!(stack.exports["Environment"].value, "prod");
    }

    #[test]
    fn invalid_origin_is_rejected() {
        let params = PortfolioParams {
            ui_origin: "http://insecure.dev".into(),
            ..PortfolioParams::default()
        };
        let err = portfolio(Environment::default(), &params).unwrap_err();
        assert!(matches!(err, CairnError::InvalidValue { .. }), "got: {err}");
    }
}
