//! Error taxonomy for the council engine.
//!
//! `ParseFailure` is deliberately not a variant here: an unparseable judge
//! reply is counted in `ReviewStats` and excluded from aggregation, never
//! surfaced as a top-level error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CouncilError {
    /// Malformed input. Surfaced wholesale, never degraded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Timeout, 5xx, or network reset at the gateway. The engine does not
    /// retry; the generation, review, and synthesis stages catch this and
    /// degrade instead of propagating it.
    #[error("provider transient error: {0}")]
    ProviderTransient(String),

    /// 4xx other than rate limiting. Degrades identically to transient,
    /// but the code/message are preserved for the per-role `error` field.
    #[error("provider error ({code:?}): {message}")]
    ProviderPermanent { code: Option<u16>, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no API key configured for provider {0}")]
    MissingApiKey(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Caller-initiated or deadline-triggered, returned wholesale only
    /// when fewer than two answers succeeded.
    #[error("deliberation cancelled")]
    Cancelled,

    /// Bugs in parsing or aggregation on well-formed input; should never
    /// happen in practice.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CouncilError>;

