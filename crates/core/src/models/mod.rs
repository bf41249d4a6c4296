pub mod pair;
pub mod portfolio;
pub mod position;
pub mod quote;
pub mod settings;
pub mod symbol;
pub mod valuation;
