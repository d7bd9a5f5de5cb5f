//! # cairn-compose
//!
//! Composition engine for cairn infrastructure stacks.
//!
//! Handles:
//! - **Registry**: Per-kind config fields, input slots and output templates.
//! - **Wiring**: Node declaration and reference binding via [`StackBuilder`].
//! - **Graph**: Dependency graph construction and stable topological ordering.
//! - **Naming**: Deterministic, environment-scoped resource names.
//! - **Composer**: Reference substitution into a [`Stack`].
//! - **Exporter**: Projection of named outputs.
//! - **Manifest**: YAML stack descriptions.
//! - **Blueprint**: The ready-made portfolio stack.

pub mod blueprint;
pub mod composer;
pub mod exporter;
pub mod graph;
pub mod manifest;
pub mod naming;
pub mod node;
pub mod registry;
pub mod stack;
pub mod wiring;

pub use exporter::ExportDecl;
pub use node::{Input, Reference, ResourceNode};
pub use stack::{Export, ResolvedResource, Stack};
pub use wiring::StackBuilder;
