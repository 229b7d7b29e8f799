use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// Variable was present but blank.
    #[error("Environment variable {0} is empty")]
    EmptyCredential(String),
}
