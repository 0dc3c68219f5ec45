// Adapters layer: concrete implementations of the domain ports for external services.

pub mod alpaca;
pub mod google_auth;
pub mod sheets;

pub use alpaca::AlpacaClient;
pub use google_auth::{ServiceAccountKey, ServiceAccountTokenSource};
pub use sheets::GoogleSheetsClient;
