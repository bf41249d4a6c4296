pub mod holdings_service;
pub mod poller;
pub mod price_service;
pub mod quote_service;
pub mod ratio_service;
pub mod valuation_service;
