//! Deployment environment model.
//!
//! The environment is resolved once at the start of a build and is
//! read-only afterwards. It drives resource naming and doubles as a virtual
//! producer with the outputs `name`, `account` and `region`.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ACCOUNT, DEFAULT_ENVIRONMENT, DEFAULT_REGION};
use crate::error::{CairnError, Result};

/// Target environment of a stack build.
///
/// Deserialization goes through [`Environment::new`], so a stack read back
/// from JSON carries a validated environment. Struct literals and field
/// assignment are not checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "EnvironmentParts")]
pub struct Environment {
    /// Environment name (`dev`, `prod`, ...).
    pub name: String,
    /// Account identifier.
    pub account: String,
    /// Region identifier.
    pub region: String,
}

impl Environment {
    /// Creates a validated environment.
    ///
    /// The name and region are lowercase ASCII alphanumeric segments joined
    /// by single hyphens. The account is a single segment with no hyphen, so
    /// the account/region boundary survives in `{account}-{region}` and two
    /// environments that differ only in account or region never derive the
    /// same resource name.
    ///
    /// # Errors
    ///
    /// Returns `CairnError::Config` if any part is malformed.
    pub fn new(
        name: impl Into<String>,
        account: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self> {
        let env = Self {
            name: name.into(),
            account: account.into(),
            region: region.into(),
        };
        check_part("environment name", &env.name)?;
        check_account(&env.account)?;
        check_part("region", &env.region)?;
        Ok(env)
    }

    /// Returns the value of one of the virtual producer's outputs.
    #[must_use]
    pub fn output(&self, slot: &str) -> Option<&str> {
        match slot {
            "name" => Some(&self.name),
            "account" => Some(&self.account),
            "region" => Some(&self.region),
            _ => None,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            name: DEFAULT_ENVIRONMENT.into(),
            account: DEFAULT_ACCOUNT.into(),
            region: DEFAULT_REGION.into(),
        }
    }
}

/// Wire shape of [`Environment`], validated on conversion.
#[derive(Deserialize)]
struct EnvironmentParts {
    name: String,
    account: String,
    region: String,
}

impl TryFrom<EnvironmentParts> for Environment {
    type Error = CairnError;

    fn try_from(parts: EnvironmentParts) -> Result<Self> {
        Self::new(parts.name, parts.account, parts.region)
    }
}

fn is_segment(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

fn check_account(value: &str) -> Result<()> {
    if is_segment(value) {
        Ok(())
    } else {
        Err(CairnError::Config {
            message: format!("account \"{value}\" must be lowercase alphanumeric with no '-'"),
        })
    }
}

fn check_part(what: &str, value: &str) -> Result<()> {
    if value.split('-').all(is_segment) {
        Ok(())
    } else {
        Err(CairnError::Config {
            message: format!(
                "{what} \"{value}\" must be lowercase alphanumeric segments joined by '-'"
            ),
        })
    }
}
