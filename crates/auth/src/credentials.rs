use crate::error::AuthError;
use secrecy::{ExposeSecret, SecretString};

const API_KEY_VAR: &str = "BINANCE_API_KEY";
const API_SECRET_VAR: &str = "BINANCE_API_SECRET";

/// Futures API key pair. The secret is only reachable through [`ApiCredentials::expose_secret`].
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    secret_key: SecretString,
}

impl ApiCredentials {
    /// Load `BINANCE_API_KEY` and `BINANCE_API_SECRET`, reading a `.env` file first if present.
    pub fn from_env() -> Result<Self, AuthError> {
        dotenvy::dotenv().ok();

        let api_key = read_var(API_KEY_VAR)?;
        let secret_key = read_var(API_SECRET_VAR)?;
        Ok(Self::new(api_key, secret_key))
    }

    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key: SecretString::from(secret_key),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// For signing only. Never log the return value.
    pub fn expose_secret(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

fn read_var(name: &str) -> Result<String, AuthError> {
    let value = std::env::var(name).map_err(|_| AuthError::MissingEnvVar(name.into()))?;
    if value.trim().is_empty() {
        return Err(AuthError::EmptyCredential(name.into()));
    }
    Ok(value.trim().to_string())
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key_hint = if self.api_key.chars().count() > 4 {
            format!("{}…", self.api_key.chars().take(4).collect::<String>())
        } else {
            "[REDACTED]".to_string()
        };
        f.debug_struct("ApiCredentials")
            .field("api_key", &key_hint)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}
