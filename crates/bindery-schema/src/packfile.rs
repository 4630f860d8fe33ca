//! The `Packfile` package manifest.
//!
//! Every package carries a `Packfile` at its root: a YAML document declaring
//! the package's identity, its function pipeline, its upstream (for cloned
//! packages), and projected status conditions. The engine reads and rewrites
//! this file; the renderer executes its pipeline.

use crate::task::{Upstream, UpstreamLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackfileError {
    #[error("failed to parse Packfile: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("document is not a Packfile: apiVersion={api_version:?}, kind={kind:?}")]
    WrongType { api_version: String, kind: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Packfile {
    pub api_version: String,
    pub kind: String,
    pub metadata: PackfileMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<PackageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Pipeline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<Upstream>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_lock: Option<UpstreamLock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PackfileStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackfileMetadata {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub readiness_gates: Vec<ReadinessGate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mutators: Vec<FunctionSpec>,
}

/// One function invocation in the declared pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    pub image: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config_map: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackfileStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessGate {
    pub condition_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Closed set; unknown values fail deserialization rather than reaching
/// the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl Packfile {
    /// Minimal well-formed Packfile for a new package.
    pub fn new(name: impl Into<String>) -> Self {
        Packfile {
            api_version: crate::PACKFILE_API_VERSION.to_owned(),
            kind: crate::PACKFILE_NAME.to_owned(),
            metadata: PackfileMetadata { name: name.into() },
            info: None,
            pipeline: None,
            upstream: None,
            upstream_lock: None,
            status: None,
        }
    }

    pub fn to_yaml(&self) -> Result<String, PackfileError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

pub fn parse_packfile_str(input: &str) -> Result<Packfile, PackfileError> {
    let pf: Packfile = serde_yaml::from_str(input)?;
    if pf.api_version != crate::PACKFILE_API_VERSION || pf.kind != crate::PACKFILE_NAME {
        return Err(PackfileError::WrongType {
            api_version: pf.api_version,
            kind: pf.kind,
        });
    }
    Ok(pf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_packfile() {
        let input = r#"
apiVersion: bindery.dev/v1
kind: Packfile
metadata:
  name: net
info:
  description: network blueprint
  readinessGates:
    - conditionType: gatekeeper
pipeline:
  mutators:
    - image: gcr.io/fn/set-namespace:v0.4
      configMap:
        namespace: prod
upstream:
  type: revision
  name: blueprints.base.v1
upstreamLock:
  resolved: blueprints.base.v1
  digest: abc123
status:
  conditions:
    - type: gatekeeper
      status: "True"
      reason: Approved
"#;
        let pf = parse_packfile_str(input).expect("should parse");
        assert_eq!(pf.metadata.name, "net");
        assert_eq!(pf.info.as_ref().unwrap().readiness_gates.len(), 1);
        assert_eq!(pf.pipeline.as_ref().unwrap().mutators.len(), 1);
        assert_eq!(
            pf.status.as_ref().unwrap().conditions[0].status,
            ConditionStatus::True
        );
    }

    #[test]
    fn parses_minimal_packfile() {
        let input = r"
apiVersion: bindery.dev/v1
kind: Packfile
metadata:
  name: empty
";
        let pf = parse_packfile_str(input).expect("should parse");
        assert!(pf.pipeline.is_none());
        assert!(pf.upstream.is_none());
    }

    #[test]
    fn rejects_wrong_kind() {
        let input = r"
apiVersion: v1
kind: ConfigMap
metadata:
  name: not-a-packfile
";
        assert!(matches!(
            parse_packfile_str(input),
            Err(PackfileError::WrongType { .. })
        ));
    }

    #[test]
    fn rejects_unknown_condition_status() {
        let input = r#"
type: ready
status: Maybe
"#;
        assert!(serde_yaml::from_str::<Condition>(input).is_err());
    }

    #[test]
    fn yaml_roundtrip_preserves_lock() {
        let mut pf = Packfile::new("net");
        pf.upstream_lock = Some(UpstreamLock {
            resolved: "blueprints.base.v2".to_owned(),
            digest: "deadbeef".into(),
        });
        let yaml = pf.to_yaml().unwrap();
        let back = parse_packfile_str(&yaml).unwrap();
        assert_eq!(back, pf);
    }

    #[test]
    fn new_packfile_is_parseable() {
        let yaml = Packfile::new("fresh").to_yaml().unwrap();
        let back = parse_packfile_str(&yaml).unwrap();
        assert_eq!(back.metadata.name, "fresh");
    }
}
