//! Error types for Artbot

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArtbotError>;

#[derive(Error, Debug)]
pub enum ArtbotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invocation timed out after {0}s")]
    Timeout(u64),
}

impl ArtbotError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ArtbotError::InvalidInput(_) => 3,
            ArtbotError::Platform(PlatformError::Authentication(_)) => 2,
            ArtbotError::Credential(CredentialError::NotFound(_))
            | ArtbotError::Credential(CredentialError::AccessDenied(_)) => 2,
            _ => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to retrieve catalog from {location}: {reason}")]
    Retrieval { location: String, reason: String },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog at {0} contains no records")]
    Empty(String),
}

/// Dedup ledger failures
///
/// Kept separate from [`ArtbotError`] because a failed write is reported
/// alongside a successful selection rather than returned as an error.
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone)]
pub enum CredentialError {
    #[error("Credential not found: {0}")]
    NotFound(String),

    #[error("Access denied to credential: {0}")]
    AccessDenied(String),

    #[error("Malformed credential: {0}")]
    Malformed(String),

    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone)]
pub enum ImageError {
    #[error("Failed to fetch image {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Image request {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}
