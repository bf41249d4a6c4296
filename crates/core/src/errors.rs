use thiserror::Error;

/// Unified error type for the entire quotefolio-core library.
///
/// Price fetching never surfaces these to callers: the quote service turns
/// every provider error into an absent quote. They are returned from
/// validation and holdings bookkeeping, and from the provider trait itself.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Symbol not found by {provider}: {symbol}")]
    SymbolNotFound {
        provider: String,
        symbol: String,
    },

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Pair not found: {0}")]
    PairNotFound(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        let mut msg = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            msg.push_str(": ");
            msg.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        CoreError::Network(redact_query(&msg))
    }
}

/// Strip the query string from any URL embedded in an error message.
/// Provider tokens travel as query parameters and must not reach logs.
/// Only a fallback for causes that print their own URL; reqwest errors
/// drop theirs before formatting.
pub fn redact_query(msg: &str) -> String {
    match msg.find('?') {
        Some(idx) => format!("{}?<query redacted>", &msg[..idx]),
        None => msg.to_string(),
    }
}
