//! Policy error types.

use thiserror::Error;

/// Errors raised while parsing or enforcing a [`Policy`](crate::Policy).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A request was refused. The reason is passed on verbatim to whoever
    /// asked for the capability, so it names the kind and scope.
    #[error("capability denied: {0}")]
    Denied(String),

    /// A rule that can never match, such as an empty allowlist entry.
    #[error("invalid policy: {0}")]
    Invalid(String),

    /// The `[allow]` / `[deny]` tables are not valid TOML for a policy.
    #[error("failed to parse policy: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
