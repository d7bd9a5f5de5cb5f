//! Resource declaration registry.
//!
//! A fixed schema table describing, for every [`ResourceKind`], which
//! config fields it takes, which input slots it consumes and which outputs
//! it produces. Everything here is a pure lookup.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use cairn_common::config::Environment;
use cairn_common::error::{CairnError, Result};
use cairn_common::types::{NodeId, ResourceKind};

use crate::node::Value;

/// Accepted shape of a config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Any string.
    Text,
    /// Integer within an inclusive range.
    Integer {
        /// Smallest accepted value.
        min: i64,
        /// Largest accepted value.
        max: i64,
    },
    /// Boolean.
    Flag,
    /// IPv4 network in CIDR notation with a /16 to /28 prefix.
    Cidr,
    /// One of a fixed set of strings.
    Choice(&'static [&'static str]),
    /// Absolute `https://` URL.
    HttpsUrl,
}

/// Default applied to an absent optional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// String default.
    Text(&'static str),
    /// Integer default.
    Integer(i64),
    /// Boolean default.
    Flag(bool),
}

impl FieldDefault {
    fn to_value(self) -> Value {
        match self {
            Self::Text(s) => Value::from(s),
            Self::Integer(n) => Value::from(n),
            Self::Flag(b) => Value::from(b),
        }
    }
}

/// Schema of one config field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name.
    pub name: &'static str,
    /// Accepted shape.
    pub ty: FieldType,
    /// Whether the field must be supplied.
    pub required: bool,
    /// Value filled in when an optional field is absent.
    pub default: Option<FieldDefault>,
}

/// Schema of one input slot.
#[derive(Debug, Clone, Copy)]
pub struct InputSpec {
    /// Slot name.
    pub name: &'static str,
    /// Whether the slot must be bound.
    pub required: bool,
    /// Producer kinds whose outputs may be wired here. Empty accepts any.
    pub accepts: &'static [ResourceKind],
}

impl InputSpec {
    /// Returns `true` if references to a `kind` producer may bind this slot.
    #[must_use]
    pub fn accepts(&self, kind: ResourceKind) -> bool {
        self.accepts.is_empty() || self.accepts.contains(&kind)
    }
}

/// Schema of one output slot.
#[derive(Debug, Clone, Copy)]
pub struct OutputSpec {
    /// Slot name.
    pub name: &'static str,
    /// Value template, see [`render_outputs`].
    pub template: &'static str,
}

/// Complete schema of a resource kind.
#[derive(Debug)]
pub struct KindSchema {
    /// Kind described by this schema.
    pub kind: ResourceKind,
    /// Config fields.
    pub fields: &'static [FieldSpec],
    /// Input slots.
    pub inputs: &'static [InputSpec],
    /// Output slots.
    pub outputs: &'static [OutputSpec],
}

impl KindSchema {
    /// Looks up a config field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up an input slot.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Returns `true` if the kind produces `name`.
    #[must_use]
    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|o| o.name == name)
    }
}

const fn required(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        required: true,
        default: None,
    }
}

const fn optional(name: &'static str, ty: FieldType, default: Option<FieldDefault>) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        required: false,
        default,
    }
}

const fn input(
    name: &'static str,
    required: bool,
    accepts: &'static [ResourceKind],
) -> InputSpec {
    InputSpec {
        name,
        required,
        accepts,
    }
}

const fn output(name: &'static str, template: &'static str) -> OutputSpec {
    OutputSpec { name, template }
}

const fn int(min: i64, max: i64) -> FieldType {
    FieldType::Integer { min, max }
}

use self::FieldDefault::{Flag as DefFlag, Integer as DefInt, Text as DefText};
use self::FieldType::{Choice, Cidr, Flag, HttpsUrl, Text};
use cairn_common::types::ResourceKind as K;

static NETWORK: KindSchema = KindSchema {
    kind: K::Network,
    fields: &[
        required("cidr", Cidr),
        optional("maxAzs", int(1, 6), Some(DefInt(2))),
        optional("natGateways", int(0, 6), Some(DefInt(1))),
    ],
    inputs: &[],
    outputs: &[
        output("vpcId", "{name}"),
        output("subnetId", "{name}-private"),
        output("publicSubnetId", "{name}-public"),
        output("cidrBlock", "{config:cidr}"),
    ],
};

static SECRET: KindSchema = KindSchema {
    kind: K::Secret,
    fields: &[
        optional("description", Text, None),
        optional("generated", Flag, Some(DefFlag(false))),
        optional("passwordLength", int(16, 128), Some(DefInt(32))),
        optional("template", Text, None),
        optional("retain", Flag, Some(DefFlag(true))),
    ],
    inputs: &[input("encryptionKey", false, &[K::Key])],
    outputs: &[output("secretArn", "{urn}"), output("secretName", "{name}")],
};

static DATABASE: KindSchema = KindSchema {
    kind: K::Database,
    fields: &[
        required("engine", Choice(&["postgres", "mysql"])),
        optional("engineVersion", Text, Some(DefText("16.4"))),
        optional("databaseName", Text, Some(DefText("app"))),
        optional("instanceClass", Text, Some(DefText("t4g.micro"))),
        optional("allocatedStorage", int(20, 65_536), Some(DefInt(20))),
        optional("backupRetentionDays", int(0, 35), Some(DefInt(30))),
        optional("port", int(1024, 65_535), Some(DefInt(5432))),
        optional("multiAz", Flag, Some(DefFlag(false))),
        optional("deletionProtection", Flag, Some(DefFlag(true))),
    ],
    inputs: &[
        input("subnetId", true, &[K::Network]),
        input("credentialsSecret", false, &[K::Secret]),
        input("encryptionKey", false, &[K::Key]),
    ],
    outputs: &[
        output("endpoint", "{name}.db.{region}.internal"),
        output("port", "{config:port}"),
        output("databaseName", "{config:databaseName}"),
        output("securityGroupId", "{name}-sg"),
    ],
};

static OBJECT_STORE: KindSchema = KindSchema {
    kind: K::ObjectStore,
    fields: &[
        optional("versioned", Flag, Some(DefFlag(false))),
        optional("noncurrentExpirationDays", int(1, 3650), None),
        optional("logPrefix", Text, None),
        optional("retain", Flag, Some(DefFlag(true))),
    ],
    inputs: &[
        input("encryptionKey", false, &[K::Key]),
        input("accessLogBucket", false, &[K::ObjectStore]),
    ],
    outputs: &[
        output("bucketName", "{name}"),
        output("bucketArn", "{urn}"),
        output("domainName", "{name}.storage.{region}.internal"),
        output("url", "https://{name}.storage.{region}.internal"),
    ],
};

static ROLE: KindSchema = KindSchema {
    kind: K::Role,
    fields: &[
        required("assumedBy", Text),
        optional("description", Text, None),
        optional("maxSessionHours", int(1, 12), Some(DefInt(1))),
    ],
    inputs: &[
        input("databaseSecret", false, &[K::Secret]),
        input("apiKeysSecret", false, &[K::Secret]),
        input("authSecret", false, &[K::Secret]),
        input("encryptionKey", false, &[K::Key]),
        input("securityGroupId", false, &[K::Database, K::Compute]),
    ],
    outputs: &[output("roleArn", "{urn}"), output("roleName", "{name}")],
};

static COMPUTE: KindSchema = KindSchema {
    kind: K::Compute,
    fields: &[
        required("image", Text),
        optional("memoryMb", int(128, 10_240), Some(DefInt(512))),
        optional("timeoutSeconds", int(1, 900), Some(DefInt(30))),
        optional("architecture", Choice(&["arm64", "x86_64"]), Some(DefText("arm64"))),
        optional(
            "logLevel",
            Choice(&["debug", "info", "warn", "error"]),
            Some(DefText("info")),
        ),
        optional("logRetentionDays", int(1, 3653), Some(DefInt(14))),
    ],
    inputs: &[
        input("role", true, &[K::Role]),
        input("subnetId", true, &[K::Network]),
        input("databaseEndpoint", false, &[K::Database]),
        input("databasePort", false, &[K::Database]),
        input("databaseName", false, &[K::Database]),
        input("databaseSecret", false, &[K::Secret]),
        input("apiKeysSecret", false, &[K::Secret]),
        input("encryptionKey", false, &[K::Key]),
    ],
    outputs: &[
        output("functionArn", "{urn}"),
        output("functionName", "{name}"),
        output("invokeArn", "{urn}/invocations"),
        output("securityGroupId", "{name}-sg"),
    ],
};

static GATEWAY: KindSchema = KindSchema {
    kind: K::Gateway,
    fields: &[
        optional("stageName", Text, Some(DefText("v1"))),
        optional("corsOrigin", HttpsUrl, None),
        optional("throttleRateLimit", int(1, 10_000), Some(DefInt(100))),
        optional("throttleBurstLimit", int(1, 5_000), Some(DefInt(200))),
        optional("logRetentionDays", int(1, 3653), Some(DefInt(30))),
    ],
    inputs: &[
        input("backend", true, &[K::Compute]),
        input("role", false, &[K::Role]),
    ],
    outputs: &[
        output("apiId", "{name}"),
        output(
            "url",
            "https://{name}.gateway.{region}.internal/{config:stageName}/",
        ),
        output("arn", "{urn}"),
    ],
};

static IDENTITY_PROVIDER: KindSchema = KindSchema {
    kind: K::IdentityProvider,
    fields: &[
        required("callbackUrl", HttpsUrl),
        optional("logoutUrl", HttpsUrl, None),
        optional("selfSignUp", Flag, Some(DefFlag(true))),
        optional(
            "mfa",
            Choice(&["off", "optional", "required"]),
            Some(DefText("optional")),
        ),
        optional("accessTokenHours", int(1, 24), Some(DefInt(1))),
        optional("refreshTokenDays", int(1, 3650), Some(DefInt(30))),
    ],
    inputs: &[input("clientSecrets", false, &[K::Secret])],
    outputs: &[
        output("userPoolId", "{region}_{name}"),
        output("clientId", "{name}-client"),
        output("domain", "{name}.auth.{region}.internal"),
        output("issuerUrl", "https://auth.{region}.internal/{region}_{name}"),
    ],
};

static EDGE_CACHE: KindSchema = KindSchema {
    kind: K::EdgeCache,
    fields: &[
        optional("defaultRootObject", Text, Some(DefText("index.html"))),
        optional("priceClass", Choice(&["100", "200", "all"]), Some(DefText("100"))),
        optional("aliasUrl", HttpsUrl, None),
        optional("logExpirationDays", int(1, 3650), Some(DefInt(90))),
    ],
    inputs: &[
        input("origin", true, &[K::ObjectStore]),
        input("apiOrigin", false, &[K::Gateway]),
        input("logBucket", false, &[K::ObjectStore]),
    ],
    outputs: &[
        output("distributionId", "{name}"),
        output("domainName", "{name}.edge.internal"),
        output("url", "https://{name}.edge.internal"),
    ],
};

static METRICS: KindSchema = KindSchema {
    kind: K::Metrics,
    fields: &[
        optional("errorThreshold", int(1, 10_000), Some(DefInt(5))),
        optional("serverErrorThreshold", int(1, 10_000), Some(DefInt(10))),
        optional("latencyThresholdMs", int(1, 60_000), Some(DefInt(2000))),
        optional("evaluationPeriods", int(1, 100), Some(DefInt(2))),
        optional("alarmEmail", Text, None),
    ],
    inputs: &[
        input("functionName", false, &[K::Compute]),
        input("gatewayId", false, &[K::Gateway]),
    ],
    outputs: &[
        output("dashboardName", "{name}"),
        output("alarmTopicArn", "{urn}:alarms"),
    ],
};

static KEY: KindSchema = KindSchema {
    kind: K::Key,
    fields: &[
        optional("description", Text, None),
        optional("rotation", Flag, Some(DefFlag(true))),
        optional("pendingWindowDays", int(7, 30), Some(DefInt(7))),
    ],
    inputs: &[],
    outputs: &[output("keyArn", "{urn}"), output("keyId", "{name}")],
};

/// Returns the schema of `kind`.
#[must_use]
pub fn schema(kind: ResourceKind) -> &'static KindSchema {
    match kind {
        K::Network => &NETWORK,
        K::Secret => &SECRET,
        K::Database => &DATABASE,
        K::ObjectStore => &OBJECT_STORE,
        K::Role => &ROLE,
        K::Compute => &COMPUTE,
        K::Gateway => &GATEWAY,
        K::IdentityProvider => &IDENTITY_PROVIDER,
        K::EdgeCache => &EDGE_CACHE,
        K::Metrics => &METRICS,
        K::Key => &KEY,
    }
}

/// Resolves a kind tag for `node`.
///
/// # Errors
///
/// Returns `CairnError::UnsupportedKind` if the tag is not registered.
pub fn resolve_kind(node: &NodeId, tag: &str) -> Result<ResourceKind> {
    ResourceKind::from_tag(tag).ok_or_else(|| CairnError::UnsupportedKind {
        node: node.to_string(),
        kind: tag.to_string(),
    })
}

/// Returns the names of the outputs `kind` produces.
#[must_use]
pub fn declared_outputs(kind: ResourceKind) -> BTreeSet<&'static str> {
    schema(kind).outputs.iter().map(|o| o.name).collect()
}

/// Returns the input slots `kind` consumes.
#[must_use]
pub fn declared_inputs(kind: ResourceKind) -> &'static [InputSpec] {
    schema(kind).inputs
}

/// Validates `config` against the schema of `kind`.
///
/// Returns the config with defaults of absent optional fields filled in.
///
/// # Errors
///
/// Returns `CairnError::MissingField` for an absent required field and
/// `CairnError::InvalidValue` for an unknown field or a value of the wrong
/// shape.
pub fn validate_config(
    node: &NodeId,
    kind: ResourceKind,
    config: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Value>> {
    let schema = schema(kind);

    if let Some(unknown) = config.keys().find(|k| schema.field(k).is_none()) {
        return Err(CairnError::InvalidValue {
            node: node.to_string(),
            field: unknown.clone(),
            reason: format!("unknown config field for {kind}"),
        });
    }

    let mut validated = BTreeMap::new();
    for spec in schema.fields {
        match config.get(spec.name) {
            Some(value) => {
                check_value(spec.ty, value).map_err(|reason| CairnError::InvalidValue {
                    node: node.to_string(),
                    field: spec.name.to_string(),
                    reason,
                })?;
                let _ = validated.insert(spec.name.to_string(), value.clone());
            }
            None if spec.required => {
                return Err(CairnError::MissingField {
                    node: node.to_string(),
                    field: spec.name.to_string(),
                });
            }
            None => {
                if let Some(default) = spec.default {
                    let _ = validated.insert(spec.name.to_string(), default.to_value());
                }
            }
        }
    }
    Ok(validated)
}

fn check_value(ty: FieldType, value: &Value) -> std::result::Result<(), String> {
    match ty {
        FieldType::Text => value
            .as_str()
            .map(|_| ())
            .ok_or_else(|| format!("expected a string, got {value}")),
        FieldType::Integer { min, max } => match value.as_i64() {
            Some(n) if (min..=max).contains(&n) => Ok(()),
            _ => Err(format!("expected an integer between {min} and {max}, got {value}")),
        },
        FieldType::Flag => value
            .as_bool()
            .map(|_| ())
            .ok_or_else(|| format!("expected a boolean, got {value}")),
        FieldType::Cidr => value
            .as_str()
            .ok_or_else(|| format!("expected a CIDR string, got {value}"))
            .and_then(check_cidr),
        FieldType::Choice(options) => {
            let scalar = (value.is_string() || value.is_number()).then(|| value_to_string(value));
            match scalar {
                Some(s) if options.contains(&s.as_str()) => Ok(()),
                _ => Err(format!("expected one of {}, got {value}", options.join(", "))),
            }
        }
        FieldType::HttpsUrl => match value.as_str() {
            Some(s)
                if s.len() > "https://".len()
                    && s.starts_with("https://")
                    && !s.chars().any(char::is_whitespace) =>
            {
                Ok(())
            }
            _ => Err(format!("expected an https:// URL, got {value}")),
        },
    }
}

fn check_cidr(cidr: &str) -> std::result::Result<(), String> {
    let (addr, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| format!("\"{cidr}\" is missing a /prefix"))?;
    let addr: Ipv4Addr = addr
        .parse()
        .map_err(|_| format!("\"{addr}\" is not an IPv4 address"))?;
    let prefix: u32 = prefix
        .parse()
        .map_err(|_| format!("\"{prefix}\" is not a prefix length"))?;
    if !(16..=28).contains(&prefix) {
        return Err(format!("prefix /{prefix} must be between /16 and /28"));
    }
    let host_mask = u32::MAX >> prefix;
    if u32::from(addr) & host_mask != 0 {
        return Err(format!("\"{cidr}\" has host bits set"));
    }
    Ok(())
}

/// Inputs to output template rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Node being rendered.
    pub id: &'a NodeId,
    /// Node kind.
    pub kind: ResourceKind,
    /// Derived resource name.
    pub name: &'a str,
    /// Build environment.
    pub environment: &'a Environment,
    /// Effective config after reference substitution.
    pub config: &'a BTreeMap<String, Value>,
}

impl RenderContext<'_> {
    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "name" => Some(self.name.to_string()),
            "id" => Some(self.id.to_string()),
            "kind" => Some(self.kind.tag().to_string()),
            "env" => Some(self.environment.name.clone()),
            "account" => Some(self.environment.account.clone()),
            "region" => Some(self.environment.region.clone()),
            "urn" => Some(format!(
                "urn:{}:{}:{}:{}:{}",
                cairn_common::constants::APP_NAME,
                self.kind.tag(),
                self.environment.region,
                self.environment.account,
                self.name
            )),
            _ => key
                .strip_prefix("config:")
                .and_then(|field| self.config.get(field))
                .map(value_to_string),
        }
    }
}

/// Renders a config value as plain text, without JSON quoting for strings.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Expands `{placeholder}`s in `template`.
///
/// Known placeholders are `name`, `id`, `kind`, `env`, `account`, `region`,
/// `urn` and `config:<field>`. Unknown or unresolvable placeholders are
/// kept verbatim.
#[must_use]
pub fn render(template: &str, ctx: &RenderContext<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match ctx.lookup(key) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + end + 2]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Renders every declared output of the context's kind.
#[must_use]
pub fn render_outputs(ctx: &RenderContext<'_>) -> BTreeMap<String, String> {
    schema(ctx.kind)
        .outputs
        .iter()
        .map(|o| (o.name.to_string(), render(o.template, ctx)))
        .collect()
}
