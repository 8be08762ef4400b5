//! EC Policy Registry
//!
//! Loads named scheme definitions from YAML and dispatches them to the
//! matching scheme constructor.
//!
//! ```yaml
//! policies:
//!   - id: lrc-9-3-3-m
//!     classname: AzureLRCTradeoff
//!     n: 15
//!     k: 9
//!     w: 1
//!     opt: -1
//!     param: ["3", "3", "1", "1"]
//! ```

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::lrc::scheme::{LrcScheme, SchemeKind};

// =============================================================================
// Policy
// =============================================================================

/// One named scheme definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcPolicy {
    /// Unique policy id
    pub id: String,

    /// Scheme class name, e.g. `AzureLRCTradeoff`
    pub classname: String,

    /// Total blocks per stripe
    pub n: usize,

    /// Data blocks per stripe
    pub k: usize,

    /// Sub-packetization
    #[serde(default = "default_w")]
    pub w: usize,

    /// Optimization level, passed through to the scheme
    #[serde(default = "default_opt")]
    pub opt: i32,

    /// Positional scheme parameters; integers are accepted and kept as text
    #[serde(default, deserialize_with = "params_as_strings")]
    pub param: Vec<String>,
}

fn default_w() -> usize {
    1
}

fn default_opt() -> i32 {
    -1
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParamValue {
    Int(i64),
    Text(String),
}

fn params_as_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<ParamValue>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|v| match v {
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Text(s) => s,
        })
        .collect())
}

impl EcPolicy {
    /// Scheme variant named by `classname`
    pub fn kind(&self) -> Result<SchemeKind> {
        self.classname.parse()
    }

    /// Construct the scheme this policy describes
    pub fn create_scheme(&self) -> Result<LrcScheme> {
        let kind = self.kind()?;
        debug!(policy = %self.id, %kind, "creating scheme");
        LrcScheme::construct(kind, self.n, self.k, self.w, self.opt, &self.param)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// All policies of one policy file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyRegistry {
    #[serde(default)]
    policies: Vec<EcPolicy>,
}

impl PolicyRegistry {
    /// Parse a registry from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let registry: Self = serde_yaml::from_str(yaml)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Load a registry from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let registry = Self::from_yaml_str(&text)?;
        info!(path = %path.display(), policies = registry.policies.len(), "loaded policy file");
        Ok(registry)
    }

    fn validate(&self) -> Result<()> {
        for (i, policy) in self.policies.iter().enumerate() {
            if self.policies[..i].iter().any(|p| p.id == policy.id) {
                return Err(Error::Config(format!("duplicate policy id: {}", policy.id)));
            }
            policy.kind()?;
        }
        Ok(())
    }

    /// Look up a policy by id
    pub fn get(&self, id: &str) -> Result<&EcPolicy> {
        self.policies
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::Config(format!("unknown policy id: {}", id)))
    }

    /// Construct the scheme of policy `id`
    pub fn create_scheme(&self, id: &str) -> Result<LrcScheme> {
        self.get(id)?.create_scheme()
    }

    /// All policies in file order
    pub fn policies(&self) -> &[EcPolicy] {
        &self.policies
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrc::scheme::Approach;
    use assert_matches::assert_matches;

    const POLICIES: &str = r#"
policies:
  - id: flat
    classname: AzureLRCFlat
    n: 15
    k: 9
    param: ["3", "3"]
  - id: tradeoff-m
    classname: AzureLRCTradeoff
    n: 15
    k: 9
    w: 4
    opt: 0
    param: [3, 3, 1, 1]
  - id: opt-r
    classname: opt-repair
    n: 14
    k: 10
    param: ["2", "2", "0"]
"#;

    #[test]
    fn test_load_and_create() {
        let registry = PolicyRegistry::from_yaml_str(POLICIES).unwrap();
        assert_eq!(registry.policies().len(), 3);

        let flat = registry.get("flat").unwrap();
        assert_eq!(flat.w, 1);
        assert_eq!(flat.opt, -1);

        let s = registry.create_scheme("tradeoff-m").unwrap();
        assert_eq!(s.kind(), SchemeKind::Tradeoff);
        assert_eq!(s.w(), 4);
        assert_eq!(s.approach(), Approach::Maintenance);

        let s = registry.create_scheme("opt-r").unwrap();
        assert_eq!(s.kind(), SchemeKind::OptimizedRepair);
    }

    #[test]
    fn test_unknown_policy_and_class() {
        let registry = PolicyRegistry::from_yaml_str(POLICIES).unwrap();
        assert_matches!(registry.get("missing"), Err(Error::Config(_)));

        let yaml = "policies:\n  - {id: x, classname: RSCONV, n: 6, k: 4}\n";
        assert_matches!(PolicyRegistry::from_yaml_str(yaml), Err(Error::Config(_)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = r#"
policies:
  - {id: a, classname: flat, n: 6, k: 4, param: ["2", "0"]}
  - {id: a, classname: flat, n: 6, k: 4, param: ["2", "0"]}
"#;
        assert_matches!(PolicyRegistry::from_yaml_str(yaml), Err(Error::Config(_)));
    }

    #[test]
    fn test_wrong_param_count_surfaces_config_error() {
        let yaml = "policies:\n  - {id: a, classname: flat, n: 6, k: 4, param: [\"2\"]}\n";
        let registry = PolicyRegistry::from_yaml_str(yaml).unwrap();
        assert_matches!(registry.create_scheme("a"), Err(Error::Config(_)));
    }

    #[test]
    fn test_malformed_yaml() {
        assert_matches!(PolicyRegistry::from_yaml_str("policies: [1, 2"), Err(Error::Yaml(_)));
    }
}
