//! Bluesky platform implementation

use async_trait::async_trait;
use bsky_sdk::agent::config::Config as AgentConfig;
use bsky_sdk::api::app::bsky::embed::images::{ImageData, MainData};
use bsky_sdk::api::app::bsky::feed::post::{RecordData, RecordEmbedRefs};
use bsky_sdk::api::types::string::Datetime;
use bsky_sdk::api::types::Union;
use bsky_sdk::rich_text::RichText;
use bsky_sdk::BskyAgent;

use crate::credentials::BlueskyCredentials;
use crate::error::{PlatformError, Result};
use crate::platforms::Platform;
use crate::types::{Image, PostContent};

pub const BLUESKY_CHARACTER_LIMIT: usize = 300;
pub const BLUESKY_MAX_IMAGE_BYTES: u64 = 1_000_000;

/// Map bsky-sdk / XRPC errors to `PlatformError`
///
/// bsky-sdk wraps XRPC failures in several generic error types, so the
/// mapping matches on the HTTP status and AT Protocol error names that appear
/// in their rendered form.
fn map_bluesky_error<E: std::fmt::Display + std::fmt::Debug>(
    error: E,
    context: &str,
) -> PlatformError {
    let message = error.to_string();
    let rendered = format!("{} {:?}", message, error);
    let lowered = rendered.to_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|needle| rendered.contains(needle));

    if mentions(&[
        "AuthenticationRequired",
        "InvalidToken",
        "ExpiredToken",
        "401",
        "403",
        "Unauthorized",
        "Forbidden",
    ]) {
        return PlatformError::Authentication(format!(
            "Bluesky rejected the session during {}: {}",
            context, message
        ));
    }

    if mentions(&["InvalidCredentials", "AccountNotFound", "AccountTakedown"])
        || (context == "login" && lowered.contains("invalid"))
    {
        return PlatformError::Authentication(format!(
            "Invalid Bluesky credentials: {}. Check the handle and app password.",
            message
        ));
    }

    if mentions(&["429", "RateLimitExceeded", "TooManyRequests"]) {
        return PlatformError::RateLimit(format!(
            "Bluesky rate limit exceeded during {}: {}",
            context, message
        ));
    }

    if mentions(&["400", "InvalidRequest", "InvalidRecord", "BlobTooLarge", "BadRequest"]) {
        return PlatformError::Validation(format!(
            "Bluesky rejected the request during {}: {}",
            context, message
        ));
    }

    if ["connection", "timeout", "timed out", "dns", "unreachable", "error sending request"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        return PlatformError::Network(format!(
            "Could not reach the Bluesky PDS during {}: {}",
            context, message
        ));
    }

    PlatformError::Posting(format!(
        "Bluesky operation failed during {}: {}",
        context, message
    ))
}

pub struct BlueskyClient {
    agent: BskyAgent,
    service: String,
    authenticated: bool,
}

impl BlueskyClient {
    /// Create an unauthenticated client for the PDS at `service`
    pub async fn new(service: &str) -> Result<Self> {
        let agent = BskyAgent::builder()
            .config(AgentConfig {
                endpoint: service.to_string(),
                ..Default::default()
            })
            .build()
            .await
            .map_err(|e| PlatformError::Network(format!("Failed to create agent: {}", e)))?;

        Ok(Self {
            agent,
            service: service.to_string(),
            authenticated: false,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    async fn upload_image(&self, image: &Image, alt_text: &str) -> Result<ImageData> {
        let output = self
            .agent
            .api
            .com
            .atproto
            .repo
            .upload_blob(image.bytes.clone())
            .await
            .map_err(|e| map_bluesky_error(e, "image upload"))?;

        tracing::debug!(bytes = image.size(), mime_type = %image.mime_type, "uploaded image blob");

        Ok(ImageData {
            image: output.data.blob,
            alt: alt_text.to_string(),
            aspect_ratio: None,
        })
    }
}

#[async_trait]
impl Platform for BlueskyClient {
    async fn authenticate(&mut self, credentials: &BlueskyCredentials) -> Result<()> {
        tracing::debug!(
            identifier = %credentials.identifier,
            service = %self.service,
            "creating Bluesky session"
        );

        self.agent
            .login(&credentials.identifier, credentials.password())
            .await
            .map_err(|e| map_bluesky_error(e, "login"))?;

        self.authenticated = true;
        tracing::info!(identifier = %credentials.identifier, "logged into Bluesky");

        Ok(())
    }

    async fn post_with_image(&self, content: &PostContent, image: &Image) -> Result<String> {
        if !self.authenticated {
            return Err(PlatformError::Authentication("Not authenticated".to_string()).into());
        }

        let rich_text = RichText::new_with_detect_facets(&content.text)
            .await
            .map_err(|e| map_bluesky_error(e, "facet detection"))?;

        let image_data = self.upload_image(image, &content.alt_text).await?;
        let embed = Union::Refs(RecordEmbedRefs::AppBskyEmbedImagesMain(Box::new(
            MainData {
                images: vec![image_data.into()],
            }
            .into(),
        )));

        let record = RecordData {
            created_at: Datetime::now(),
            embed: Some(embed),
            entities: None,
            facets: rich_text.facets,
            labels: None,
            langs: None,
            reply: None,
            tags: None,
            text: rich_text.text,
        };

        let response = self
            .agent
            .create_record(record)
            .await
            .map_err(|e| map_bluesky_error(e, "posting"))?;

        let at_uri = response.uri.to_string();
        tracing::info!(uri = %at_uri, "posted to Bluesky");

        Ok(at_uri)
    }

    fn name(&self) -> &str {
        "bluesky"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(BLUESKY_CHARACTER_LIMIT)
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn max_attachment_size(&self) -> u64 {
        BLUESKY_MAX_IMAGE_BYTES
    }
}
