//! External upstream access for the Bindery engine.
//!
//! Clone tasks may point at packages living outside the platform: a git
//! repository or an OCI artifact. This crate defines the `RemoteFetcher`
//! trait the engine delegates those fetches to, credential resolution for
//! authenticated hosts, and a static in-memory fetcher for tests. Real
//! network transports implement `RemoteFetcher` outside the engine.

pub mod credentials;
pub mod fetcher;

pub use credentials::{Credential, CredentialResolver, CredentialsFile};
pub use fetcher::{upstream_key, RemoteFetchResult, RemoteFetcher, StaticRemoteFetcher};

use bindery_repository::Canceled;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("upstream not found: {0}")]
    NotFound(String),
    #[error("upstream kind {0} cannot be fetched remotely")]
    UnsupportedUpstream(String),
    #[error("credential config error: {0}")]
    Config(String),
    #[error(transparent)]
    Canceled(#[from] Canceled),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_upstream() {
        let e = RemoteError::NotFound("git:https://example.com/pkgs.git@v1".to_owned());
        assert!(e.to_string().contains("example.com"));
    }
}
