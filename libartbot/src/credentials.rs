//! Bluesky credential retrieval
//!
//! Credentials are a handle and an app password. In production they live in
//! an AWS Secrets Manager secret whose string value is JSON:
//!
//! ```json
//! { "BSKY_USER": "artbot.bsky.social", "BSKY_PASSWORD": "xxxx-xxxx-xxxx-xxxx" }
//! ```
//!
//! Local runs can read the same two names from the environment instead.

use async_trait::async_trait;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{CredentialError, Result};

pub const USER_ENV: &str = "BSKY_USER";
pub const PASSWORD_ENV: &str = "BSKY_PASSWORD";

/// Handle and app password for a Bluesky account
///
/// The password is wiped from memory on drop and redacted from `Debug`.
#[derive(Debug)]
pub struct BlueskyCredentials {
    pub identifier: String,
    password: SecretString,
}

impl BlueskyCredentials {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

#[derive(Deserialize)]
struct SecretPayload {
    #[serde(rename = "BSKY_USER")]
    username: String,

    #[serde(rename = "BSKY_PASSWORD")]
    password: String,
}

/// Parse the JSON string value of the credentials secret
pub fn parse_secret_string(secret: &str) -> std::result::Result<BlueskyCredentials, CredentialError> {
    let payload: SecretPayload = serde_json::from_str(secret).map_err(|e| {
        // serde_json's message names the missing field but never echoes values
        CredentialError::Malformed(format!("secret is not valid credential JSON: {}", e))
    })?;

    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(CredentialError::Malformed(
            "BSKY_USER and BSKY_PASSWORD must be non-empty".to_string(),
        ));
    }

    Ok(BlueskyCredentials::new(payload.username, payload.password))
}

#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Retrieve the credentials
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::NotFound`, `AccessDenied`, `Malformed` or
    /// `Unavailable`; all are fatal to an invocation.
    async fn fetch(&self) -> Result<BlueskyCredentials>;

    /// Short identifier for logs
    fn source_name(&self) -> &str;
}

pub struct SecretsManagerSource {
    client: SecretsManagerClient,
    secret_id: String,
}

impl SecretsManagerSource {
    pub fn new(client: SecretsManagerClient, secret_id: impl Into<String>) -> Self {
        Self {
            client,
            secret_id: secret_id.into(),
        }
    }
}

/// Map an error code returned by Secrets Manager to a credential error
fn classify_secret_error(secret_id: &str, code: Option<&str>, detail: String) -> CredentialError {
    match code {
        Some("ResourceNotFoundException") => {
            CredentialError::NotFound(format!("secret '{}' does not exist", secret_id))
        }
        Some("AccessDeniedException") => CredentialError::AccessDenied(format!(
            "not permitted to read secret '{}': {}",
            secret_id, detail
        )),
        _ => CredentialError::Unavailable(format!(
            "failed to read secret '{}': {}",
            secret_id, detail
        )),
    }
}

fn map_secrets_error(secret_id: &str, error: SdkError<GetSecretValueError>) -> CredentialError {
    let code = error.as_service_error().and_then(|e| e.code());
    classify_secret_error(secret_id, code, DisplayErrorContext(&error).to_string())
}

#[async_trait]
impl CredentialSource for SecretsManagerSource {
    async fn fetch(&self) -> Result<BlueskyCredentials> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_id)
            .send()
            .await
            .map_err(|e| map_secrets_error(&self.secret_id, e))?;

        let secret = response.secret_string().ok_or_else(|| {
            CredentialError::NotFound(format!("secret '{}' has no string value", self.secret_id))
        })?;

        let credentials = parse_secret_string(secret)?;
        tracing::debug!(secret_id = %self.secret_id, "loaded Bluesky credentials");
        Ok(credentials)
    }

    fn source_name(&self) -> &str {
        "secrets_manager"
    }
}

/// Reads `BSKY_USER` and `BSKY_PASSWORD` from the process environment
#[derive(Debug, Default)]
pub struct EnvCredentialSource;

#[async_trait]
impl CredentialSource for EnvCredentialSource {
    async fn fetch(&self) -> Result<BlueskyCredentials> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    CredentialError::NotFound(format!("environment variable {} is not set", name))
                })
        };

        Ok(BlueskyCredentials::new(read(USER_ENV)?, read(PASSWORD_ENV)?))
    }

    fn source_name(&self) -> &str {
        "env"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArtbotError;
    use serial_test::serial;

    #[test]
    fn test_parse_secret_string() {
        let credentials = parse_secret_string(
            r#"{"BSKY_USER": "artbot.bsky.social", "BSKY_PASSWORD": "abcd-efgh-ijkl-mnop"}"#,
        )
        .unwrap();

        assert_eq!(credentials.identifier, "artbot.bsky.social");
        assert_eq!(credentials.password(), "abcd-efgh-ijkl-mnop");
    }

    #[test]
    fn test_parse_secret_string_missing_field() {
        let result = parse_secret_string(r#"{"BSKY_USER": "artbot.bsky.social"}"#);

        match result {
            Err(CredentialError::Malformed(msg)) => assert!(msg.contains("BSKY_PASSWORD")),
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_secret_string_not_json() {
        let result = parse_secret_string("artbot.bsky.social:hunter2");

        match result {
            Err(CredentialError::Malformed(msg)) => assert!(!msg.contains("hunter2")),
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_secret_string_empty_values() {
        let result = parse_secret_string(r#"{"BSKY_USER": " ", "BSKY_PASSWORD": "x"}"#);
        assert!(matches!(result, Err(CredentialError::Malformed(_))));
    }

    #[test]
    fn test_debug_output_redacts_password() {
        let credentials = BlueskyCredentials::new("artbot.bsky.social", "super-secret-password");
        let debug = format!("{:?}", credentials);

        assert!(debug.contains("artbot.bsky.social"));
        assert!(!debug.contains("super-secret-password"));
    }

    #[test]
    fn test_classify_not_found() {
        let error = classify_secret_error(
            "bsky-artbot-credentials",
            Some("ResourceNotFoundException"),
            "detail".to_string(),
        );
        match error {
            CredentialError::NotFound(msg) => assert!(msg.contains("bsky-artbot-credentials")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_access_denied() {
        let error = classify_secret_error(
            "bsky-artbot-credentials",
            Some("AccessDeniedException"),
            "User is not authorized".to_string(),
        );
        assert!(matches!(error, CredentialError::AccessDenied(_)));
    }

    #[test]
    fn test_classify_other_errors_as_unavailable() {
        let error = classify_secret_error("s", Some("InternalServiceError"), "boom".to_string());
        assert!(matches!(error, CredentialError::Unavailable(_)));

        let error = classify_secret_error("s", None, "dispatch failure".to_string());
        match error {
            CredentialError::Unavailable(msg) => assert!(msg.contains("dispatch failure")),
            other => panic!("Expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_env_source_reads_variables() {
        std::env::set_var(USER_ENV, "artbot.bsky.social");
        std::env::set_var(PASSWORD_ENV, "app-password");

        let result = EnvCredentialSource.fetch().await;

        std::env::remove_var(USER_ENV);
        std::env::remove_var(PASSWORD_ENV);

        let credentials = result.unwrap();
        assert_eq!(credentials.identifier, "artbot.bsky.social");
        assert_eq!(credentials.password(), "app-password");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_source_missing_password() {
        std::env::set_var(USER_ENV, "artbot.bsky.social");
        std::env::remove_var(PASSWORD_ENV);

        let result = EnvCredentialSource.fetch().await;

        std::env::remove_var(USER_ENV);

        match result {
            Err(ArtbotError::Credential(CredentialError::NotFound(msg))) => {
                assert!(msg.contains(PASSWORD_ENV))
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }
}
