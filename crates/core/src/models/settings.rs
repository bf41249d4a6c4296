use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider name under which the Finnhub API key is stored.
pub const FINNHUB: &str = "finnhub";

/// Environment variable read by [`Settings::from_env`].
pub const FINNHUB_API_KEY_ENV: &str = "FINNHUB_API_KEY";

/// How a provider tells "unknown symbol" apart from a real quote.
///
/// Finnhub answers unknown tickers with HTTP 200 and an all-zero body, so
/// a zero price on its own is ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NotFoundRule {
    /// Price is 0 and the day high is 0 or missing
    #[default]
    ZeroPriceAndHigh,
    /// Price is 0, regardless of other fields
    ZeroPrice,
    /// Never treat a present price as not-found (zero-priced instruments)
    Never,
}

impl NotFoundRule {
    /// Returns `true` if a response with this price/high means "no such symbol".
    pub fn is_not_found(&self, price: f64, high: Option<f64>) -> bool {
        match self {
            NotFoundRule::ZeroPriceAndHigh => price == 0.0 && high.unwrap_or(0.0) == 0.0,
            NotFoundRule::ZeroPrice => price == 0.0,
            NotFoundRule::Never => false,
        }
    }
}

/// Session configuration for quote fetching and polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// API keys for providers that require them.
    /// Keys: provider name (e.g., "finnhub"). Values: the API key string.
    /// With no key configured, quotes are simulated.
    pub api_keys: HashMap<String, String>,

    /// Interval between price polls for held assets.
    pub asset_poll_secs: u64,

    /// Interval between price polls for pairs and the watchlist.
    pub watch_poll_secs: u64,

    /// Per-request HTTP timeout for quote providers.
    pub http_timeout_secs: u64,

    /// Not-found convention applied to Finnhub responses.
    #[serde(default)]
    pub finnhub_not_found: NotFoundRule,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            asset_poll_secs: 60,
            watch_poll_secs: 30,
            http_timeout_secs: 10,
            finnhub_not_found: NotFoundRule::default(),
        }
    }
}

impl Settings {
    /// Defaults plus the Finnhub key from `FINNHUB_API_KEY`, if set and non-empty.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(key) = std::env::var(FINNHUB_API_KEY_ENV) {
            let key = key.trim();
            if !key.is_empty() {
                settings.api_keys.insert(FINNHUB.to_string(), key.to_string());
            }
        }
        settings
    }

    pub fn api_key(&self, provider: &str) -> Option<&str> {
        self.api_keys
            .get(provider)
            .map(String::as_str)
            .filter(|k| !k.is_empty())
    }

    /// `true` when no live provider credential is configured.
    pub fn is_simulated(&self) -> bool {
        self.api_key(FINNHUB).is_none()
    }
}
