//! Three-way package update.
//!
//! When a cloned package moves to a new upstream revision, the engine merges
//! {local, original-upstream, new-upstream} file sets. The merge algorithm
//! is pluggable; the default is per-file textual three-way merge followed by
//! a post-pass stamping deterministic identity comments onto merged YAML
//! documents.

use crate::EngineError;
use bindery_repository::{CancelToken, PackageResources};
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub trait PackageUpdater: Send + Sync {
    /// Merge `local` (current content), `original` (upstream the package was
    /// cloned from), and `upstream` (target upstream content).
    fn update(
        &self,
        cancel: &CancelToken,
        local: &PackageResources,
        original: &PackageResources,
        upstream: &PackageResources,
    ) -> Result<PackageResources, EngineError>;
}

/// Per-file textual three-way merge.
///
/// Disposition per file: untouched upstream keeps the local version
/// (including local deletions); untouched local follows the upstream
/// (including upstream deletions); diverging edits run through a textual
/// three-way merge, and a textual conflict fails the update.
#[derive(Debug, Default)]
pub struct DefaultPackageUpdater;

impl DefaultPackageUpdater {
    pub fn new() -> Self {
        Self
    }
}

impl PackageUpdater for DefaultPackageUpdater {
    fn update(
        &self,
        cancel: &CancelToken,
        local: &PackageResources,
        original: &PackageResources,
        upstream: &PackageResources,
    ) -> Result<PackageResources, EngineError> {
        cancel.check()?;

        let mut paths: BTreeSet<&str> = BTreeSet::new();
        paths.extend(local.contents.keys().map(String::as_str));
        paths.extend(original.contents.keys().map(String::as_str));
        paths.extend(upstream.contents.keys().map(String::as_str));

        let mut merged = PackageResources::new();
        for path in paths {
            let l = local.get(path);
            let o = original.get(path);
            let u = upstream.get(path);

            let result = match (l, o, u) {
                // Upstream unchanged: the local state stands, deletions included.
                _ if o == u => l.map(str::to_owned),
                // Local unchanged: follow the upstream, deletions included.
                _ if l == o => u.map(str::to_owned),
                // Both sides arrived at the same content.
                _ if l == u => l.map(str::to_owned),
                // Locally deleted while upstream changed: the deletion stands.
                (None, _, _) => None,
                // Deleted upstream but modified locally: keep the local edit.
                (Some(l), _, None) => Some(l.to_owned()),
                (Some(l), o, Some(u)) => {
                    let ancestor = o.unwrap_or("");
                    match diffy::merge(ancestor, l, u) {
                        Ok(body) => Some(body),
                        Err(_) => {
                            return Err(EngineError::Upstream(format!(
                                "merge conflict in {path}"
                            )))
                        }
                    }
                }
            };

            if let Some(contents) = result {
                merged.insert(path, contents);
            }
        }

        debug!(
            "three-way merge: local[{}] original[{}] upstream[{}] -> merged[{}]",
            local.len(),
            original.len(),
            upstream.len(),
            merged.len()
        );
        Ok(merged)
    }
}

/// Stamp a deterministic identity comment onto every YAML document that
/// carries a `metadata.name`, so that list items gain stable merge
/// identities across future updates. Files that fail to parse are left
/// untouched.
pub fn ensure_merge_keys(resources: PackageResources) -> PackageResources {
    let mut out = PackageResources::new();
    for (path, contents) in resources.iter() {
        let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        if ext != "yaml" && ext != "yml" {
            out.insert(path, contents);
            continue;
        }
        out.insert(path, stamp_file(path, contents));
    }
    out
}

fn stamp_file(path: &str, contents: &str) -> String {
    let documents: Vec<String> = contents
        .split("\n---\n")
        .map(|doc| stamp_document(path, doc))
        .collect();
    documents.join("\n---\n")
}

fn stamp_document(path: &str, document: &str) -> String {
    if document.trim().is_empty() || document.contains("# merge-key:") {
        return document.to_owned();
    }

    let value: serde_yaml::Value = match serde_yaml::from_str(document) {
        Ok(value) => value,
        Err(e) => {
            warn!("skipping merge-key stamp for document in {path}: {e}");
            return document.to_owned();
        }
    };
    let metadata = value.get("metadata");
    let name = metadata
        .and_then(|m| m.get("name"))
        .and_then(|n| n.as_str());
    let Some(name) = name else {
        return document.to_owned();
    };
    let namespace = metadata
        .and_then(|m| m.get("namespace"))
        .and_then(|n| n.as_str())
        .unwrap_or("");

    let mut lines: Vec<String> = Vec::with_capacity(document.lines().count());
    let mut stamped = false;
    for line in document.lines() {
        if !stamped && line.trim_end() == "metadata:" {
            lines.push(format!("{line} # merge-key: {namespace}/{name}"));
            stamped = true;
        } else {
            lines.push(line.to_owned());
        }
    }
    let mut result = lines.join("\n");
    if document.ends_with('\n') {
        result.push('\n');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(entries: &[(&str, &str)]) -> PackageResources {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn update(
        local: &[(&str, &str)],
        original: &[(&str, &str)],
        upstream: &[(&str, &str)],
    ) -> Result<PackageResources, EngineError> {
        DefaultPackageUpdater::new().update(
            &CancelToken::new(),
            &files(local),
            &files(original),
            &files(upstream),
        )
    }

    #[test]
    fn upstream_unchanged_keeps_local() {
        let merged = update(
            &[("a.yaml", "local edit\n")],
            &[("a.yaml", "base\n")],
            &[("a.yaml", "base\n")],
        )
        .unwrap();
        assert_eq!(merged.get("a.yaml"), Some("local edit\n"));
    }

    #[test]
    fn local_unchanged_follows_upstream() {
        let merged = update(
            &[("a.yaml", "base\n")],
            &[("a.yaml", "base\n")],
            &[("a.yaml", "upstream edit\n")],
        )
        .unwrap();
        assert_eq!(merged.get("a.yaml"), Some("upstream edit\n"));
    }

    #[test]
    fn upstream_addition_is_adopted() {
        let merged = update(&[], &[], &[("new.yaml", "fresh\n")]).unwrap();
        assert_eq!(merged.get("new.yaml"), Some("fresh\n"));
    }

    #[test]
    fn upstream_deletion_of_untouched_file_applies() {
        let merged = update(&[("a.yaml", "base\n")], &[("a.yaml", "base\n")], &[]).unwrap();
        assert!(merged.get("a.yaml").is_none());
    }

    #[test]
    fn local_deletion_survives_unchanged_upstream() {
        let merged = update(&[], &[("a.yaml", "base\n")], &[("a.yaml", "base\n")]).unwrap();
        assert!(merged.get("a.yaml").is_none());
    }

    #[test]
    fn locally_modified_file_deleted_upstream_is_kept() {
        let merged = update(&[("a.yaml", "local edit\n")], &[("a.yaml", "base\n")], &[]).unwrap();
        assert_eq!(merged.get("a.yaml"), Some("local edit\n"));
    }

    #[test]
    fn disjoint_edits_merge() {
        let base = "one\ntwo\nthree\nfour\nfive\n";
        let local = "ONE\ntwo\nthree\nfour\nfive\n";
        let upstream = "one\ntwo\nthree\nfour\nFIVE\n";
        let merged = update(
            &[("a.yaml", local)],
            &[("a.yaml", base)],
            &[("a.yaml", upstream)],
        )
        .unwrap();
        assert_eq!(merged.get("a.yaml"), Some("ONE\ntwo\nthree\nfour\nFIVE\n"));
    }

    #[test]
    fn overlapping_edits_conflict() {
        let err = update(
            &[("a.yaml", "local\n")],
            &[("a.yaml", "base\n")],
            &[("a.yaml", "upstream\n")],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Upstream(_)));
        assert!(err.to_string().contains("a.yaml"));
    }

    #[test]
    fn merge_keys_stamp_named_documents() {
        let resources = files(&[(
            "deploy.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n  namespace: prod\nspec: {}\n",
        )]);
        let stamped = ensure_merge_keys(resources);
        assert!(stamped
            .get("deploy.yaml")
            .unwrap()
            .contains("metadata: # merge-key: prod/web"));
    }

    #[test]
    fn merge_keys_are_idempotent() {
        let resources = files(&[(
            "deploy.yaml",
            "kind: Deployment\nmetadata: # merge-key: /web\n  name: web\n",
        )]);
        let stamped = ensure_merge_keys(resources.clone());
        assert_eq!(stamped, resources);
    }

    #[test]
    fn merge_keys_skip_non_yaml_and_nameless() {
        let resources = files(&[
            ("README.md", "# docs\nmetadata:\n"),
            ("anon.yaml", "kind: List\nitems: []\n"),
        ]);
        let stamped = ensure_merge_keys(resources.clone());
        assert_eq!(stamped, resources);
    }

    #[test]
    fn merge_keys_stamp_each_document() {
        let resources = files(&[(
            "all.yaml",
            "kind: A\nmetadata:\n  name: a\n---\nkind: B\nmetadata:\n  name: b\n",
        )]);
        let stamped = ensure_merge_keys(resources);
        let body = stamped.get("all.yaml").unwrap();
        assert!(body.contains("# merge-key: /a"));
        assert!(body.contains("# merge-key: /b"));
    }
}
