//! Publishes a formatted record to a platform

use crate::credentials::CredentialSource;
use crate::error::{ArtbotError, Result};
use crate::image::ImageSource;
use crate::platforms::Platform;
use crate::types::{CatalogRecord, PostContent};

pub struct Publisher<'a> {
    credentials: &'a dyn CredentialSource,
    images: &'a dyn ImageSource,
}

impl<'a> Publisher<'a> {
    pub fn new(credentials: &'a dyn CredentialSource, images: &'a dyn ImageSource) -> Self {
        Self {
            credentials,
            images,
        }
    }

    /// Log in, fetch the record's art and post it with `content`
    ///
    /// Steps run in order and the first failure is returned; nothing is retried.
    ///
    /// # Errors
    ///
    /// - `ArtbotError::Credential` if credentials cannot be retrieved
    /// - `ArtbotError::Platform` on login, validation or posting failure
    /// - `ArtbotError::Image` if the art cannot be downloaded
    /// - `ArtbotError::InvalidInput` if the record has no art URL
    pub async fn publish(
        &self,
        platform: &mut dyn Platform,
        record: &CatalogRecord,
        content: &PostContent,
    ) -> Result<String> {
        let credentials = self.credentials.fetch().await?;
        tracing::debug!(source = self.credentials.source_name(), "fetched credentials");

        platform.authenticate(&credentials).await?;

        let url = record.art_url().ok_or_else(|| {
            ArtbotError::InvalidInput(format!("Catalog record {} has no art URL", record))
        })?;
        let image = self.images.fetch(url).await?;

        platform.validate_content(content)?;
        platform.validate_image(&image)?;

        let post_id = platform.post_with_image(content, &image).await?;
        tracing::info!(
            platform = platform.name(),
            record = %record,
            post_id = %post_id,
            "published record"
        );

        Ok(post_id)
    }
}
