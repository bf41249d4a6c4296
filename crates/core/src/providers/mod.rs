pub mod registry;
pub mod traits;

// Quote source implementations
pub mod finnhub;
pub mod simulated;
