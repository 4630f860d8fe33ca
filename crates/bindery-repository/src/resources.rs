//! The in-memory file set of a package revision.

use bindery_schema::Digest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered mapping from relative path (forward-slash separated) to UTF-8
/// file contents. The `BTreeMap` gives deterministic iteration, which the
/// renderer and digest computation rely on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageResources {
    pub contents: BTreeMap<String, String>,
}

impl PackageResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_contents(contents: BTreeMap<String, String>) -> Self {
        Self { contents }
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.contents.get(path).map(String::as_str)
    }

    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.contents.insert(path.into(), contents.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.contents.remove(path)
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.contents
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Blake3 digest over the full file set. Paths and contents are
    /// length-prefixed so that (path, contents) boundaries cannot alias.
    pub fn digest(&self) -> Digest {
        let mut hasher = blake3::Hasher::new();
        for (path, contents) in &self.contents {
            hasher.update(&(path.len() as u64).to_le_bytes());
            hasher.update(path.as_bytes());
            hasher.update(&(contents.len() as u64).to_le_bytes());
            hasher.update(contents.as_bytes());
        }
        Digest::new(hasher.finalize().to_hex().to_string())
    }
}

impl FromIterator<(String, String)> for PackageResources {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            contents: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let mut a = PackageResources::new();
        a.insert("Packfile", "x");
        a.insert("deploy.yaml", "y");
        let mut b = PackageResources::new();
        b.insert("deploy.yaml", "y");
        b.insert("Packfile", "x");
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn digest_distinguishes_path_boundaries() {
        let mut a = PackageResources::new();
        a.insert("ab", "c");
        let mut b = PackageResources::new();
        b.insert("a", "bc");
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn digest_changes_with_content() {
        let mut a = PackageResources::new();
        a.insert("f", "1");
        let d1 = a.digest();
        a.insert("f", "2");
        assert_ne!(d1, a.digest());
    }

    #[test]
    fn iteration_is_sorted() {
        let mut r = PackageResources::new();
        r.insert("z.yaml", "");
        r.insert("a.yaml", "");
        let paths: Vec<&str> = r.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["a.yaml", "z.yaml"]);
    }
}
