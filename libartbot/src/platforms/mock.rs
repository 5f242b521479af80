//! Mock platform for testing
//!
//! Records every authentication and post so tests can check what an
//! invocation would have published, and can be configured to fail either step.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::credentials::BlueskyCredentials;
use crate::error::{PlatformError, Result};
use crate::platforms::Platform;
use crate::types::{Image, ImageMimeType, PostContent};

/// What the mock was asked to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPost {
    pub text: String,
    pub alt_text: String,
    pub image_size: u64,
    pub mime_type: ImageMimeType,
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,
    pub auth_succeeds: bool,
    pub post_succeeds: bool,
    pub auth_error: Option<String>,
    pub post_error: Option<String>,

    /// Simulated latency for authenticate and post
    pub delay: Duration,

    pub character_limit: Option<usize>,
    pub max_attachment_size: u64,
    pub supported_mime_types: Vec<ImageMimeType>,

    // Shared between clones so a test can keep a handle after moving the mock
    pub auth_call_count: Arc<Mutex<usize>>,
    pub post_call_count: Arc<Mutex<usize>>,
    pub authenticated_as: Arc<Mutex<Option<String>>>,
    pub posts: Arc<Mutex<Vec<MockPost>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            auth_succeeds: true,
            post_succeeds: true,
            auth_error: None,
            post_error: None,
            delay: Duration::from_millis(0),
            character_limit: None,
            max_attachment_size: 1_000_000,
            supported_mime_types: vec![
                ImageMimeType::Jpeg,
                ImageMimeType::Png,
                ImageMimeType::Gif,
                ImageMimeType::WebP,
            ],
            auth_call_count: Arc::new(Mutex::new(0)),
            post_call_count: Arc::new(Mutex::new(0)),
            authenticated_as: Arc::new(Mutex::new(None)),
            posts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct MockPlatform {
    config: MockConfig,
    authenticated: bool,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            authenticated: false,
        }
    }

    /// A mock that accepts every login and post
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    pub fn auth_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            auth_succeeds: false,
            auth_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    pub fn post_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            post_succeeds: false,
            post_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            delay,
            ..Default::default()
        })
    }

    pub fn with_limit(name: &str, limit: usize) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            character_limit: Some(limit),
            ..Default::default()
        })
    }

    pub fn auth_call_count(&self) -> usize {
        *lock(&self.config.auth_call_count)
    }

    pub fn post_call_count(&self) -> usize {
        *lock(&self.config.post_call_count)
    }

    /// Identifier from the last successful authentication
    pub fn authenticated_as(&self) -> Option<String> {
        lock(&self.config.authenticated_as).clone()
    }

    pub fn posts(&self) -> Vec<MockPost> {
        lock(&self.config.posts).clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn authenticate(&mut self, credentials: &BlueskyCredentials) -> Result<()> {
        *lock(&self.config.auth_call_count) += 1;

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if self.config.auth_succeeds {
            self.authenticated = true;
            *lock(&self.config.authenticated_as) = Some(credentials.identifier.clone());
            Ok(())
        } else {
            let error_msg = self
                .config
                .auth_error
                .clone()
                .unwrap_or_else(|| "Mock authentication failed".to_string());
            Err(PlatformError::Authentication(error_msg).into())
        }
    }

    async fn post_with_image(&self, content: &PostContent, image: &Image) -> Result<String> {
        let count = {
            let mut count = lock(&self.config.post_call_count);
            *count += 1;
            *count
        };

        if !self.authenticated {
            return Err(PlatformError::Authentication("Not authenticated".to_string()).into());
        }

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if !self.config.post_succeeds {
            let error_msg = self
                .config
                .post_error
                .clone()
                .unwrap_or_else(|| "Mock posting failed".to_string());
            return Err(PlatformError::Posting(error_msg).into());
        }

        lock(&self.config.posts).push(MockPost {
            text: content.text.clone(),
            alt_text: content.alt_text.clone(),
            image_size: image.size(),
            mime_type: image.mime_type,
        });

        Ok(format!(
            "at://did:plc:{}/app.bsky.feed.post/{}",
            self.config.name, count
        ))
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn character_limit(&self) -> Option<usize> {
        self.config.character_limit
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn max_attachment_size(&self) -> u64 {
        self.config.max_attachment_size
    }

    fn supported_mime_types(&self) -> Vec<ImageMimeType> {
        self.config.supported_mime_types.clone()
    }
}
