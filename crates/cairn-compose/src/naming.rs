//! Deterministic resource name derivation.
//!
//! Names are a pure function of the environment triple and the node id,
//! so rebuilding identical declarations always yields identical names.

use std::collections::BTreeMap;

use cairn_common::config::Environment;
use cairn_common::constants::{MAX_RESOURCE_NAME_LEN, NAME_HASH_LEN};
use cairn_common::error::{CairnError, Result};
use cairn_common::types::NodeId;
use sha2::{Digest, Sha256};

/// Derives the externally visible resource name of `id`.
///
/// The name is `"{env}-{id}-{account}-{region}"`, lowercased, with every
/// run of characters outside `[a-z0-9]` collapsed into a single `-`.
/// Names over [`MAX_RESOURCE_NAME_LEN`] are cut short and suffixed with the
/// first [`NAME_HASH_LEN`] hex digits of the SHA-256 of the full name.
#[must_use]
pub fn derive_name(environment: &Environment, id: &NodeId) -> String {
    let full = sanitize(&format!(
        "{}-{}-{}-{}",
        environment.name, id, environment.account, environment.region
    ));
    if full.len() <= MAX_RESOURCE_NAME_LEN {
        return full;
    }

    let digest = format!("{:x}", Sha256::digest(full.as_bytes()));
    let keep = MAX_RESOURCE_NAME_LEN - NAME_HASH_LEN - 1;
    let head = full[..keep].trim_end_matches('-');
    format!("{head}-{}", &digest[..NAME_HASH_LEN])
}

/// Derives names for `ids` in the given order.
///
/// # Errors
///
/// Returns `CairnError::DuplicateName` naming the later node when two ids
/// derive the same name.
pub fn assign_names<'a>(
    environment: &Environment,
    ids: impl IntoIterator<Item = &'a NodeId>,
) -> Result<BTreeMap<NodeId, String>> {
    let mut owners: BTreeMap<String, &NodeId> = BTreeMap::new();
    let mut names = BTreeMap::new();
    for id in ids {
        let name = derive_name(environment, id);
        if let Some(other) = owners.get(&name) {
            return Err(CairnError::DuplicateName {
                node: id.to_string(),
                other: other.to_string(),
                name,
            });
        }
        tracing::debug!(node = %id, name = %name, "derived resource name");
        let _ = owners.insert(name.clone(), id);
        let _ = names.insert(id.clone(), name);
    }
    Ok(names)
}

fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        let _ = out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str, account: &str, region: &str) -> Environment {
        Environment::new(name, account, region).expect("valid environment")
    }

    #[test]
    fn derive_name_shape() {
        let name = derive_name(&env("dev", "123456789012", "us-east-1"), &NodeId::new("ui-bucket"));
        assert_eq!(name, "dev-ui-bucket-123456789012-us-east-1");
    }

    #[test]
    fn derive_name_is_idempotent() {
        let e = env("prod", "42", "eu-west-1");
        let id = NodeId::new("ApiFunction");
        assert_eq!(derive_name(&e, &id), derive_name(&e, &id));
    }

    #[test]
    fn derive_name_depends_on_region_and_account() {
        let id = NodeId::new("database");
        let base = derive_name(&env("dev", "111", "us-east-1"), &id);
        assert_ne!(base, derive_name(&env("dev", "111", "us-west-2"), &id));
        assert_ne!(base, derive_name(&env("dev", "222", "us-east-1"), &id));
        assert_ne!(base, derive_name(&env("prod", "111", "us-east-1"), &id));
    }

    #[test]
    fn account_region_boundary_is_preserved() {
        let id = NodeId::new("x");
        let split = derive_name(&env("dev", "1", "us-east-1"), &id);
        assert_eq!(split, "dev-x-1-us-east-1");
        assert!(Environment::new("dev", "1-us", "east-1").is_err());
        assert_ne!(split, derive_name(&env("dev", "1", "us-east"), &id));
        assert_ne!(split, derive_name(&env("dev", "1us", "east-1"), &id));
    }

    #[test]
    fn sanitize_lowercases_and_collapses() {
        assert_eq!(sanitize("Dev__Api..Fn--X"), "dev-api-fn-x");
        assert_eq!(sanitize("-_leading and trailing_-"), "leading-and-trailing");
    }

    #[test]
    fn long_names_are_truncated_with_hash_suffix() {
        let e = env("staging", "123456789012", "ap-southeast-2");
        let id = NodeId::new("very-long-resource-identifier-for-the-access-log-bucket");
        let name = derive_name(&e, &id);
        assert!(name.len() <= MAX_RESOURCE_NAME_LEN, "{name} is {} long", name.len());
        assert!(name.starts_with("staging-very-long-resource"));
        let suffix = name.rsplit('-').next().expect("suffix");
        assert_eq!(suffix.len(), NAME_HASH_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn truncated_names_stay_distinct_across_regions() {
        let id = NodeId::new("very-long-resource-identifier-for-the-access-log-bucket");
        let a = derive_name(&env("staging", "123456789012", "ap-southeast-1"), &id);
        let b = derive_name(&env("staging", "123456789012", "ap-southeast-2"), &id);
        assert_ne!(a, b);
    }

    #[test]
    fn assign_names_detects_collisions() {
        let e = env("dev", "1", "us-east-1");
        let ids = [NodeId::new("ui-bucket"), NodeId::new("UI_Bucket")];
        let err = assign_names(&e, &ids).unwrap_err();
        match err {
            CairnError::DuplicateName { node, other, name } => {
                assert_eq!(node, "UI_Bucket");
                assert_eq!(other, "ui-bucket");
                assert_eq!(name, "dev-ui-bucket-1-us-east-1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn assign_names_maps_every_id() {
        let e = env("dev", "1", "us-east-1");
        let ids = [NodeId::new("network"), NodeId::new("database")];
        let names = assign_names(&e, &ids).expect("no collision");
        assert_eq!(names.len(), 2);
        assert_eq!(names["network"], "dev-network-1-us-east-1");
    }
}
