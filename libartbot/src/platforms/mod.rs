//! Platform abstraction and implementations
//!
//! A [`Platform`] authenticates with a social network and publishes a caption
//! with a single image attached. [`bluesky::BlueskyClient`] is the production
//! implementation; [`mock::MockPlatform`] records what it is asked to post.
//!
//! # Examples
//!
//! ```no_run
//! use libartbot::credentials::BlueskyCredentials;
//! use libartbot::platforms::{bluesky::BlueskyClient, Platform};
//! use libartbot::types::{Image, ImageMimeType, PostContent};
//!
//! # async fn example(image: Image) -> libartbot::error::Result<()> {
//! let mut platform = BlueskyClient::new("https://bsky.social").await?;
//! let credentials = BlueskyCredentials::new("artbot.bsky.social", "app-password");
//! platform.authenticate(&credentials).await?;
//!
//! let content = PostContent {
//!     text: "Shock (Magic 2010)".to_string(),
//!     alt_text: "Art for Shock".to_string(),
//! };
//! platform.validate_content(&content)?;
//! platform.validate_image(&image)?;
//!
//! let uri = platform.post_with_image(&content, &image).await?;
//! println!("Posted: {}", uri);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::credentials::BlueskyCredentials;
use crate::error::{PlatformError, Result};
use crate::types::{Image, ImageMimeType, PostContent};

pub mod bluesky;

// Available outside tests so integration tests can use it
pub mod mock;

#[async_trait]
pub trait Platform: Send + Sync {
    /// Authenticate with the platform
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` if the credentials are rejected,
    /// or `PlatformError::Network` if the service cannot be reached.
    async fn authenticate(&mut self, credentials: &BlueskyCredentials) -> Result<()>;

    /// Upload `image` and publish `content` with it attached
    ///
    /// Returns the platform-specific post ID (an AT URI for Bluesky).
    ///
    /// # Errors
    ///
    /// - `PlatformError::Authentication` if not authenticated
    /// - `PlatformError::Validation` if the platform rejects the post
    /// - `PlatformError::RateLimit`, `Network` or `Posting` otherwise
    async fn post_with_image(&self, content: &PostContent, image: &Image) -> Result<String>;

    /// Lowercase platform identifier
    fn name(&self) -> &str;

    /// Maximum caption length in characters, or `None` if unlimited
    fn character_limit(&self) -> Option<usize>;

    fn is_authenticated(&self) -> bool;

    /// Maximum image size in bytes
    fn max_attachment_size(&self) -> u64 {
        40 * 1024 * 1024
    }

    fn supported_mime_types(&self) -> Vec<ImageMimeType> {
        vec![
            ImageMimeType::Jpeg,
            ImageMimeType::Png,
            ImageMimeType::Gif,
            ImageMimeType::WebP,
        ]
    }

    /// Check the caption against the platform's limits
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Validation` for an empty or over-long caption.
    fn validate_content(&self, content: &PostContent) -> Result<()> {
        if content.text.trim().is_empty() {
            return Err(PlatformError::Validation("Content cannot be empty".to_string()).into());
        }

        if let Some(limit) = self.character_limit() {
            let len = content.text_len();
            if len > limit {
                return Err(PlatformError::Validation(format!(
                    "Content exceeds {}'s {} character limit (current: {} characters)",
                    self.name(),
                    limit,
                    len
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Check the image against the platform's size and format limits
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Validation` for an oversized or unsupported image.
    fn validate_image(&self, image: &Image) -> Result<()> {
        let max = self.max_attachment_size();
        if image.size() > max {
            return Err(PlatformError::Validation(format!(
                "Image is {} bytes, over {}'s {} byte limit",
                image.size(),
                self.name(),
                max
            ))
            .into());
        }

        if !self.supported_mime_types().contains(&image.mime_type) {
            return Err(PlatformError::Validation(format!(
                "{} does not accept {} images",
                self.name(),
                image.mime_type
            ))
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockConfig, MockPlatform};
    use super::*;
    use crate::error::ArtbotError;

    fn content(text: &str) -> PostContent {
        PostContent {
            text: text.to_string(),
            alt_text: "alt".to_string(),
        }
    }

    #[test]
    fn test_validate_content_counts_characters() {
        let platform = MockPlatform::with_limit("mock", 10);

        // 10 characters, 12 bytes
        assert!(platform.validate_content(&content("Æther Æthe")).is_ok());

        match platform.validate_content(&content("Æther Vials")) {
            Err(ArtbotError::Platform(PlatformError::Validation(msg))) => {
                assert!(msg.contains("10 character limit"));
                assert!(msg.contains("11 characters"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_content_rejects_blank() {
        let platform = MockPlatform::success("mock");
        assert!(matches!(
            platform.validate_content(&content("  \n")),
            Err(ArtbotError::Platform(PlatformError::Validation(_)))
        ));
    }

    #[test]
    fn test_validate_image_size_limit() {
        let platform = MockPlatform::new(MockConfig {
            max_attachment_size: 4,
            ..Default::default()
        });

        let small = Image {
            bytes: vec![0; 4],
            mime_type: ImageMimeType::Png,
        };
        let large = Image {
            bytes: vec![0; 5],
            mime_type: ImageMimeType::Png,
        };

        assert!(platform.validate_image(&small).is_ok());
        match platform.validate_image(&large) {
            Err(ArtbotError::Platform(PlatformError::Validation(msg))) => {
                assert!(msg.contains("5 bytes"))
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_image_mime_type() {
        let platform = MockPlatform::new(MockConfig {
            supported_mime_types: vec![ImageMimeType::Jpeg],
            ..Default::default()
        });

        let gif = Image {
            bytes: vec![0; 4],
            mime_type: ImageMimeType::Gif,
        };

        match platform.validate_image(&gif) {
            Err(ArtbotError::Platform(PlatformError::Validation(msg))) => {
                assert!(msg.contains("image/gif"))
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }
}
