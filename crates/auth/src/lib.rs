//! API credentials and HMAC-SHA256 request signing for Binance futures.
//!
//! The secret is wrapped in `SecretString`, so it never shows up in `Debug`
//! output or log records and is zeroed on drop.
//!
//! ```rust,ignore
//! let credentials = ApiCredentials::from_env()?;
//! let signer = RequestSigner::new(&credentials);
//! let query = signer.signed_query(&[("symbol", "BTCUSDT".into())], now_ms, 5000);
//! ```

mod credentials;
mod error;
mod signer;

pub use credentials::ApiCredentials;
pub use error::AuthError;
pub use signer::RequestSigner;
