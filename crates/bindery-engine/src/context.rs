//! Hierarchical package context.
//!
//! Packages form a hierarchy: a child package inherits its path prefix from
//! a reserved ConfigMap inside its parent's resources. The extractor
//! locates that ConfigMap; `build_package_config` walks one parent link and
//! composes the child's package path.

use crate::engine::PackageRevision;
use crate::EngineError;
use bindery_repository::PackageResources;
use bindery_schema as api;
use bindery_schema::{CONFIG_KEY_PACKAGE_PATH, PACKAGE_CONTEXT_NAME};
use std::collections::BTreeMap;
use tracing::warn;

/// Per-request package configuration handed to clone mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageConfig {
    /// Full hierarchical path of the package, ancestors included.
    pub package_path: String,
    /// Path prefix contributed by the ancestor chain; empty for roots.
    pub ancestor_path: String,
}

/// The reserved context ConfigMap found inside a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfigMap {
    pub name: String,
    pub data: BTreeMap<String, String>,
}

/// Compose the package config for `desired` from its optional parent.
///
/// The ancestor path is the parent context's `package-path` value (when
/// present) joined with the parent's own package name.
pub fn build_package_config(
    desired: &api::PackageRevision,
    parent: Option<&PackageRevision>,
) -> Result<PackageConfig, EngineError> {
    let mut ancestor_path = String::new();

    if let Some(parent) = parent {
        let parent_obj = parent.package_revision()?;
        ancestor_path = parent_obj.spec.package_name.to_string();

        let resources = parent.resources()?;
        let config_map = extract_context_config_map(&resources).map_err(|e| match e {
            EngineError::Conflict(msg) => EngineError::Conflict(format!(
                "error getting configuration from parent package {:?}: {msg}",
                parent_obj.name
            )),
            other => other,
        })?;
        if let Some(config_map) = config_map {
            if let Some(path) = config_map.data.get(CONFIG_KEY_PACKAGE_PATH) {
                if !path.is_empty() {
                    ancestor_path = format!("{path}/{ancestor_path}");
                }
            }
        }
    }

    let package_path = if ancestor_path.is_empty() {
        desired.spec.package_name.to_string()
    } else {
        format!("{ancestor_path}/{}", desired.spec.package_name)
    };

    Ok(PackageConfig {
        package_path,
        ancestor_path,
    })
}

/// Locate the reserved context ConfigMap in a file set.
///
/// Scans every YAML file (any depth), splitting multi-document files on the
/// document separator. Zero matches is not an error; two or more is a
/// conflict.
pub fn extract_context_config_map(
    resources: &PackageResources,
) -> Result<Option<ContextConfigMap>, EngineError> {
    let mut matches = Vec::new();

    for (path, contents) in resources.iter() {
        let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        if ext != "yaml" && ext != "yml" {
            warn!("ignoring non-yaml file {path}");
            continue;
        }

        for document in contents.split("\n---\n") {
            if document.trim().is_empty() {
                continue;
            }

            let value: serde_yaml::Value = serde_yaml::from_str(document).map_err(|e| {
                EngineError::Validation(format!("error parsing yaml from {path}: {e}"))
            })?;

            if let Some(config_map) = as_context_config_map(&value) {
                matches.push(config_map);
            }
        }
    }

    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches.remove(0))),
        n => Err(EngineError::Conflict(format!(
            "found {n} configmaps matching name {PACKAGE_CONTEXT_NAME:?}"
        ))),
    }
}

/// Interpret a parsed document as the reserved ConfigMap, if it is one.
/// Only the core group qualifies: an `apiVersion` carrying a group prefix
/// is some other ConfigMap-shaped kind.
fn as_context_config_map(value: &serde_yaml::Value) -> Option<ContextConfigMap> {
    let api_version = value.get("apiVersion")?.as_str()?;
    if api_version.contains('/') {
        return None;
    }
    if value.get("kind")?.as_str()? != "ConfigMap" {
        return None;
    }
    let name = value.get("metadata")?.get("name")?.as_str()?;
    if name != PACKAGE_CONTEXT_NAME {
        return None;
    }

    let mut data = BTreeMap::new();
    if let Some(mapping) = value.get("data").and_then(|d| d.as_mapping()) {
        for (k, v) in mapping {
            if let (Some(k), Some(v)) = (k.as_str(), v.as_str()) {
                data.insert(k.to_owned(), v.to_owned());
            }
        }
    }

    Some(ContextConfigMap {
        name: name.to_owned(),
        data,
    })
}

/// Render the context ConfigMap file for a package.
pub(crate) fn context_config_map_yaml(
    package_name: &str,
    ancestor_path: &str,
) -> String {
    let mut yaml = format!(
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {PACKAGE_CONTEXT_NAME}\ndata:\n  name: {package_name}\n"
    );
    if !ancestor_path.is_empty() {
        yaml.push_str(&format!("  {CONFIG_KEY_PACKAGE_PATH}: {ancestor_path}\n"));
    }
    yaml
}
