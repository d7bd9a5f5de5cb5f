//! Unified error type for the cairn workspace.
//!
//! Every graph error carries the offending node id and slot name so that an
//! operator can locate the declaration that broke the build. Errors are
//! grouped into the categories reported by [`CairnError::kind`].

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Category of a build failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad kind, config, input set, or duplicate declaration.
    Schema,
    /// A reference points at something that cannot satisfy it.
    Wiring,
    /// The graph could not be ordered or substituted.
    Ordering,
    /// An export references a missing node or output.
    Export,
    /// Failures outside the graph: environment, manifest files, I/O.
    Operational,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema => write!(f, "SchemaViolation"),
            Self::Wiring => write!(f, "WiringViolation"),
            Self::Ordering => write!(f, "OrderingViolation"),
            Self::Export => write!(f, "ExportViolation"),
            Self::Operational => write!(f, "OperationalError"),
        }
    }
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CairnError {
    /// The declared kind tag is not in the registry.
    #[error("schema violation: node \"{node}\" has unsupported kind \"{kind}\"")]
    UnsupportedKind {
        /// Offending node.
        node: String,
        /// Unrecognized kind tag.
        kind: String,
    },

    /// A required config field was not supplied.
    #[error("schema violation: node \"{node}\" is missing required config field \"{field}\"")]
    MissingField {
        /// Offending node.
        node: String,
        /// Missing field name.
        field: String,
    },

    /// A config field or literal has the wrong type or is out of range.
    #[error("schema violation: invalid value for {node}.{field}: {reason}")]
    InvalidValue {
        /// Offending node.
        node: String,
        /// Field or slot holding the bad value.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A required input slot was never bound.
    #[error("schema violation: node \"{node}\" is missing required input \"{slot}\"")]
    MissingInput {
        /// Offending node.
        node: String,
        /// Unbound input slot.
        slot: String,
    },

    /// The consumer's kind does not declare the input slot.
    #[error("schema violation: {kind} node \"{node}\" has no input slot \"{slot}\"")]
    UnknownInputSlot {
        /// Offending node.
        node: String,
        /// Undeclared input slot.
        slot: String,
        /// Kind tag of the node.
        kind: String,
    },

    /// A node id was declared twice.
    #[error("schema violation: node \"{node}\" is already declared")]
    DuplicateNode {
        /// Duplicated node id.
        node: String,
    },

    /// Two nodes derive the same resource name.
    #[error("schema violation: nodes \"{other}\" and \"{node}\" both derive resource name \"{name}\"")]
    DuplicateName {
        /// Node whose name collided.
        node: String,
        /// Earlier node that already owns the name.
        other: String,
        /// The colliding name.
        name: String,
    },

    /// A wiring call names a consumer that does not exist.
    #[error("wiring violation: unknown consumer \"{node}\" for input \"{slot}\"")]
    UnknownConsumer {
        /// Missing consumer id.
        node: String,
        /// Input slot being wired.
        slot: String,
    },

    /// The producer was not declared before the consumer.
    #[error("wiring violation: unknown producer \"{producer}\" referenced by {node}.{slot}")]
    UnknownProducer {
        /// Consumer node.
        node: String,
        /// Consumer input slot.
        slot: String,
        /// Producer id that is not (yet) declared.
        producer: String,
    },

    /// The producer's kind does not declare the referenced output.
    #[error("wiring violation: producer \"{producer}\" has no output \"{output}\" (referenced by {node}.{slot})")]
    UnknownOutputSlot {
        /// Consumer node.
        node: String,
        /// Consumer input slot.
        slot: String,
        /// Producer id.
        producer: String,
        /// Undeclared output slot.
        output: String,
    },

    /// The input slot does not accept outputs of the producer's kind.
    #[error("wiring violation: {node}.{slot} does not accept outputs of {kind} node \"{producer}\"")]
    IncompatibleProducer {
        /// Consumer node.
        node: String,
        /// Consumer input slot.
        slot: String,
        /// Producer id.
        producer: String,
        /// Kind tag of the producer.
        kind: String,
    },

    /// A node referenced one of its own outputs.
    #[error("wiring violation: node \"{node}\" references its own output in \"{slot}\"")]
    SelfReference {
        /// Offending node.
        node: String,
        /// Input slot holding the self reference.
        slot: String,
    },

    /// The input slot is already bound.
    #[error("wiring violation: input {node}.{slot} is already bound")]
    SlotAlreadyBound {
        /// Consumer node.
        node: String,
        /// Already bound slot.
        slot: String,
    },

    /// The dependency graph contains a cycle.
    #[error("ordering violation: cyclic dependency through {node}.{slot}")]
    CyclicDependency {
        /// A node on the cycle.
        node: String,
        /// An input slot on the cycle.
        slot: String,
    },

    /// A reference was substituted before its producer was resolved.
    #[error("ordering violation: {node}.{slot} needs \"{producer}\" which is not resolved yet")]
    UnresolvedReference {
        /// Consumer node.
        node: String,
        /// Consumer input slot.
        slot: String,
        /// Unresolved producer.
        producer: String,
    },

    /// An export name was declared twice with different sources.
    #[error("export violation: duplicate export name \"{export}\"")]
    DuplicateExport {
        /// Duplicated export name.
        export: String,
        /// Source node of the rejected declaration.
        node: String,
        /// Source output of the rejected declaration.
        slot: String,
    },

    /// An export references a node or output that was not produced.
    #[error("export violation: export \"{export}\" from {node}.{slot}: {reason}")]
    InvalidExport {
        /// Export name.
        export: String,
        /// Source node.
        node: String,
        /// Source output.
        slot: String,
        /// Why the export is invalid.
        reason: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A stack manifest could not be parsed.
    #[error("invalid manifest: {message}")]
    Manifest {
        /// Parser diagnostic.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl CairnError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedKind { .. }
            | Self::MissingField { .. }
            | Self::InvalidValue { .. }
            | Self::MissingInput { .. }
            | Self::UnknownInputSlot { .. }
            | Self::DuplicateNode { .. }
            | Self::DuplicateName { .. } => ErrorKind::Schema,
            Self::UnknownConsumer { .. }
            | Self::UnknownProducer { .. }
            | Self::UnknownOutputSlot { .. }
            | Self::IncompatibleProducer { .. }
            | Self::SelfReference { .. }
            | Self::SlotAlreadyBound { .. } => ErrorKind::Wiring,
            Self::CyclicDependency { .. } | Self::UnresolvedReference { .. } => {
                ErrorKind::Ordering
            }
            Self::DuplicateExport { .. } | Self::InvalidExport { .. } => ErrorKind::Export,
            Self::Config { .. }
            | Self::Manifest { .. }
            | Self::Io { .. }
            | Self::Serialization { .. } => ErrorKind::Operational,
        }
    }

    /// Returns the `(node, slot)` pair the error points at.
    ///
    /// Kind and name errors use the pseudo-slots `kind` and `name`; duplicate
    /// node errors use `id`. Operational errors have no location.
    #[must_use]
    pub fn location(&self) -> Option<(&str, &str)> {
        match self {
            Self::UnsupportedKind { node, .. } => Some((node.as_str(), "kind")),
            Self::DuplicateNode { node } => Some((node.as_str(), "id")),
            Self::DuplicateName { node, .. } => Some((node.as_str(), "name")),
            Self::MissingField { node, field } | Self::InvalidValue { node, field, .. } => {
                Some((node.as_str(), field.as_str()))
            }
            Self::MissingInput { node, slot }
            | Self::UnknownInputSlot { node, slot, .. }
            | Self::UnknownConsumer { node, slot }
            | Self::UnknownProducer { node, slot, .. }
            | Self::UnknownOutputSlot { node, slot, .. }
            | Self::IncompatibleProducer { node, slot, .. }
            | Self::SelfReference { node, slot }
            | Self::SlotAlreadyBound { node, slot }
            | Self::CyclicDependency { node, slot }
            | Self::UnresolvedReference { node, slot, .. }
            | Self::DuplicateExport { node, slot, .. }
            | Self::InvalidExport { node, slot, .. } => Some((node.as_str(), slot.as_str())),
            Self::Config { .. }
            | Self::Manifest { .. }
            | Self::Io { .. }
            | Self::Serialization { .. } => None,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CairnError>;
