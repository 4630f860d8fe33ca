//! Fetching package content from git and OCI upstreams.

use crate::RemoteError;
use bindery_repository::{CancelToken, PackageResources};
use bindery_schema::Upstream;
use std::collections::BTreeMap;
use tracing::debug;

/// Result of fetching an external upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFetchResult {
    pub resources: PackageResources,
    /// Concrete resolved reference (commit, tag digest, manifest digest)
    /// recorded in the cloned package's upstream lock.
    pub resolved: String,
}

/// Fetches the file set behind a git or OCI upstream descriptor.
///
/// Implementations own transport and authentication (via a
/// [`CredentialResolver`](crate::CredentialResolver)); the engine only
/// routes clone tasks here when the upstream is not a peer revision.
pub trait RemoteFetcher: Send + Sync {
    fn fetch(
        &self,
        cancel: &CancelToken,
        upstream: &Upstream,
    ) -> Result<RemoteFetchResult, RemoteError>;
}

/// Canonical lookup key for an external upstream descriptor.
///
/// Returns `None` for peer-revision upstreams, which are never fetched
/// remotely.
pub fn upstream_key(upstream: &Upstream) -> Option<String> {
    match upstream {
        Upstream::Revision(_) => None,
        Upstream::Git(git) => {
            let mut key = format!("git:{}@{}", git.repo, git.reference);
            if !git.directory.is_empty() {
                key.push('/');
                key.push_str(&git.directory);
            }
            Some(key)
        }
        Upstream::Oci(oci) => Some(format!("oci:{}", oci.image)),
    }
}

/// In-memory fetcher serving pre-registered upstream content. Used in tests
/// and as the reference implementation of the trait contract.
#[derive(Default)]
pub struct StaticRemoteFetcher {
    packages: BTreeMap<String, RemoteFetchResult>,
}

impl StaticRemoteFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `resources` for the given upstream descriptor.
    #[must_use]
    pub fn serve(
        mut self,
        upstream: &Upstream,
        resources: PackageResources,
        resolved: impl Into<String>,
    ) -> Self {
        if let Some(key) = upstream_key(upstream) {
            self.packages.insert(
                key,
                RemoteFetchResult {
                    resources,
                    resolved: resolved.into(),
                },
            );
        }
        self
    }
}

impl RemoteFetcher for StaticRemoteFetcher {
    fn fetch(
        &self,
        cancel: &CancelToken,
        upstream: &Upstream,
    ) -> Result<RemoteFetchResult, RemoteError> {
        cancel.check()?;
        let key = upstream_key(upstream)
            .ok_or_else(|| RemoteError::UnsupportedUpstream(upstream.kind().to_owned()))?;
        debug!("fetching static upstream {key}");
        self.packages
            .get(&key)
            .cloned()
            .ok_or(RemoteError::NotFound(key))
    }
}
