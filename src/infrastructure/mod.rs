pub mod auth_client;
pub mod pricing_client;

pub use auth_client::AuthClient;
pub use pricing_client::{build_http_client, PricingClient};
