// ═══════════════════════════════════════════════════════════════════
// Error Tests — CoreError display and conversions
// ═══════════════════════════════════════════════════════════════════

use quotefolio_core::errors::{redact_query, CoreError};

#[test]
fn api_error_display() {
    let err = CoreError::Api {
        provider: "Finnhub".into(),
        message: "HTTP 429".into(),
    };
    assert_eq!(err.to_string(), "API error (Finnhub): HTTP 429");
}

#[test]
fn symbol_not_found_display() {
    let err = CoreError::SymbolNotFound {
        provider: "Finnhub".into(),
        symbol: "ZZZZ".into(),
    };
    assert_eq!(err.to_string(), "Symbol not found by Finnhub: ZZZZ");
}

#[test]
fn business_error_display() {
    assert_eq!(
        CoreError::ValidationError("Quantity must be positive, got 0".into()).to_string(),
        "Validation failed: Quantity must be positive, got 0"
    );
    assert_eq!(
        CoreError::PositionNotFound("abc".into()).to_string(),
        "Position not found: abc"
    );
    assert_eq!(CoreError::PairNotFound("xyz".into()).to_string(), "Pair not found: xyz");
    assert_eq!(CoreError::Network("reset".into()).to_string(), "Network error: reset");
}

#[test]
fn serde_json_error_converts_to_deserialization() {
    let err: CoreError = serde_json::from_str::<serde_json::Value>("{oops")
        .unwrap_err()
        .into();
    assert!(matches!(err, CoreError::Deserialization(_)));
    assert!(err.to_string().starts_with("Deserialization error: "));
}

#[test]
fn redact_query_strips_token() {
    let msg = "error sending request for url (https://finnhub.io/api/v1/quote?symbol=AAPL&token=secret)";
    let redacted = redact_query(msg);
    assert!(!redacted.contains("secret"));
    assert_eq!(
        redacted,
        "error sending request for url (https://finnhub.io/api/v1/quote?<query redacted>"
    );
}

#[test]
fn redact_query_leaves_plain_messages() {
    assert_eq!(redact_query("connection refused"), "connection refused");
}
