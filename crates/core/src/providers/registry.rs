use std::time::Duration;

use crate::models::settings::{Settings, FINNHUB};
use crate::models::symbol::AssetClass;

use super::finnhub::FinnhubProvider;
use super::simulated::SimulatedProvider;
use super::traits::QuoteProvider;

/// Registry of all available quote providers.
///
/// Routes requests to providers by `AssetClass`, in registration order.
/// New providers can be added without touching the quote service.
pub struct QuoteProviderRegistry {
    providers: Vec<Box<dyn QuoteProvider>>,
}

impl QuoteProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry from settings.
    ///
    /// With a Finnhub key: Finnhub only. Without one: the simulator, so the
    /// whole system runs on generated prices instead of failing.
    pub fn new_with_defaults(settings: &Settings) -> Self {
        let mut registry = Self::new();

        match settings.api_key(FINNHUB) {
            Some(key) => {
                registry.register(Box::new(FinnhubProvider::new(
                    key.to_string(),
                    Duration::from_secs(settings.http_timeout_secs),
                    settings.finnhub_not_found,
                )));
            }
            None => {
                registry.register(Box::new(SimulatedProvider::new()));
            }
        }

        registry
    }

    /// Register a new quote provider.
    pub fn register(&mut self, provider: Box<dyn QuoteProvider>) {
        self.providers.push(provider);
    }

    /// Find the first provider that supports the given asset class.
    pub fn get_provider_for(&self, class: AssetClass) -> Option<&dyn QuoteProvider> {
        self.providers
            .iter()
            .find(|p| p.supported_classes().contains(&class))
            .map(|p| p.as_ref())
    }

    /// Return ALL providers that support the given asset class, ordered by registration priority.
    pub fn get_providers_for(&self, class: AssetClass) -> Vec<&dyn QuoteProvider> {
        self.providers
            .iter()
            .filter(|p| p.supported_classes().contains(&class))
            .map(|p| p.as_ref())
            .collect()
    }

    /// Names of every registered provider, in priority order.
    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for QuoteProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
