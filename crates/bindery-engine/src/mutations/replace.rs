//! Whole-package replacement with an audit diff.
//!
//! Replacing the file set wholesale would leave the task history blind, so
//! this mutation synthesises a Patch task summarising the delta per file.
//! Before diffing, the heal step copies comment provenance from matching
//! documents in the old file set onto the new one; heal failures are logged
//! and the un-healed content continues, because the diff is still correct
//! without comment provenance.

use crate::mutation::Mutation;
use crate::mutations::patch::generate_patch;
use crate::EngineError;
use bindery_repository::{CancelToken, PackageResources};
use bindery_schema::{PatchSpec, PatchTaskSpec, PatchType, Task};
use std::collections::BTreeMap;
use tracing::warn;

pub(crate) struct ReplaceResourcesMutation {
    new_resources: PackageResources,
}

impl ReplaceResourcesMutation {
    pub fn new(new_resources: PackageResources) -> Self {
        Self { new_resources }
    }
}

impl Mutation for ReplaceResourcesMutation {
    fn apply(
        &self,
        cancel: &CancelToken,
        resources: PackageResources,
    ) -> Result<(PackageResources, Task), EngineError> {
        cancel.check()?;

        let old = resources;
        let new = heal_config(&old, self.new_resources.clone());

        let mut patches = Vec::new();
        for (path, new_contents) in new.iter() {
            match old.get(path) {
                None => patches.push(PatchSpec {
                    file: path.to_owned(),
                    patch_type: PatchType::CreateFile,
                    contents: new_contents.to_owned(),
                }),
                Some(old_contents) if old_contents != new_contents => {
                    patches.push(generate_patch(path, old_contents, new_contents));
                }
                Some(_) => {}
            }
        }
        for (path, _) in old.iter() {
            if new.get(path).is_none() {
                patches.push(PatchSpec {
                    file: path.to_owned(),
                    patch_type: PatchType::DeleteFile,
                    contents: String::new(),
                });
            }
        }

        let task = Task::Patch(PatchTaskSpec { patches });
        Ok((new, task))
    }
}

/// Document identity for comment healing.
type DocumentKey = (String, String, String, String);

/// Copy comment provenance from old documents onto matching new documents.
///
/// Two documents match when (apiVersion, kind, namespace, name) agree.
/// Healing is best-effort at file granularity: content that fails to parse
/// is passed through unchanged with a warning.
fn heal_config(old: &PackageResources, new: PackageResources) -> PackageResources {
    let mut old_documents: BTreeMap<DocumentKey, &str> = BTreeMap::new();
    for (path, contents) in old.iter() {
        if !is_yaml_path(path) {
            continue;
        }
        for document in contents.split("\n---\n") {
            if let Some(key) = document_key(document) {
                old_documents.entry(key).or_insert(document);
            }
        }
    }

    let mut healed = PackageResources::new();
    for (path, contents) in new.iter() {
        if !is_yaml_path(path) {
            healed.insert(path, contents);
            continue;
        }
        let documents: Vec<String> = contents
            .split("\n---\n")
            .map(|document| match document_key(document) {
                Some(key) => match old_documents.get(&key) {
                    Some(old_document) => heal_document(old_document, document),
                    None => document.to_owned(),
                },
                None => {
                    if !document.trim().is_empty() {
                        warn!("skipping comment healing for unparseable document in {path}");
                    }
                    document.to_owned()
                }
            })
            .collect();
        healed.insert(path, documents.join("\n---\n"));
    }
    healed
}

fn is_yaml_path(path: &str) -> bool {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    ext == "yaml" || ext == "yml"
}

fn document_key(document: &str) -> Option<DocumentKey> {
    if document.trim().is_empty() {
        return None;
    }
    let value: serde_yaml::Value = serde_yaml::from_str(document).ok()?;
    let api_version = value.get("apiVersion")?.as_str()?.to_owned();
    let kind = value.get("kind")?.as_str()?.to_owned();
    let metadata = value.get("metadata")?;
    let name = metadata.get("name")?.as_str()?.to_owned();
    let namespace = metadata
        .get("namespace")
        .and_then(|n| n.as_str())
        .unwrap_or("")
        .to_owned();
    Some((api_version, kind, namespace, name))
}

/// Re-attach the old document's leading comment block and the trailing
/// comment on its `metadata:` line when the new document lacks them.
fn heal_document(old_document: &str, new_document: &str) -> String {
    let mut result = new_document.to_owned();

    if let Some(comment) = metadata_comment(old_document) {
        if metadata_comment(new_document).is_none() {
            let lines: Vec<String> = result
                .lines()
                .map(|line| {
                    if line.trim_end() == "metadata:" {
                        format!("metadata: {comment}")
                    } else {
                        line.to_owned()
                    }
                })
                .collect();
            let trailing_newline = result.ends_with('\n');
            result = lines.join("\n");
            if trailing_newline {
                result.push('\n');
            }
        }
    }

    let old_leading = leading_comments(old_document);
    if !old_leading.is_empty() && leading_comments(new_document).is_empty() {
        result = format!("{old_leading}{result}");
    }

    result
}

fn metadata_comment(document: &str) -> Option<String> {
    document.lines().find_map(|line| {
        let rest = line.strip_prefix("metadata:")?.trim_start();
        if rest.starts_with('#') {
            Some(rest.to_owned())
        } else {
            None
        }
    })
}

fn leading_comments(document: &str) -> String {
    let mut comments = String::new();
    for line in document.lines() {
        if line.starts_with('#') {
            comments.push_str(line);
            comments.push('\n');
        } else if line.trim().is_empty() && !comments.is_empty() {
            comments.push('\n');
        } else {
            break;
        }
    }
    comments
}
