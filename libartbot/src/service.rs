//! Invocation pipeline shared by the Lambda handler and the CLI
//!
//! One invocation loads the catalog, keeps the postable records, selects one
//! with the dedup [`Selector`], formats it and publishes it:
//!
//! ```no_run
//! use libartbot::config::Config;
//! use libartbot::service::ArtbotService;
//!
//! # async fn example() -> libartbot::Result<()> {
//! let config = Config::load()?;
//! let service = ArtbotService::from_config(&config).await?;
//!
//! let report = service.run_once().await?;
//! println!("Posted {} ({}): {:?}", report.name, report.set, report.post_uri);
//! # Ok(())
//! # }
//! ```

use aws_config::{BehaviorVersion, SdkConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::catalog::{CatalogStore, FileCatalogStore, S3CatalogStore};
use crate::config::{
    expand_path, BlueskyConfig, CatalogConfig, Config, CredentialsConfig, LedgerConfig,
    SelectionConfig,
};
use crate::credentials::{CredentialSource, EnvCredentialSource, SecretsManagerSource};
use crate::error::{ArtbotError, Result};
use crate::formatter::{format_post, postable_records};
use crate::image::{HttpImageSource, ImageSource};
use crate::ledger::{DynamoLedger, Ledger, MemoryLedger, ReadOnlyLedger, SqliteLedger};
use crate::platforms::bluesky::BlueskyClient;
use crate::platforms::Platform;
use crate::publisher::Publisher;
use crate::selector::{Selection, Selector};
use crate::types::{CatalogRecord, InvocationReport, PostContent};

/// Process-scoped handles to every external store
///
/// Built once at startup and shared by all invocations in the process.
#[derive(Clone)]
pub struct Clients {
    pub catalog: Arc<dyn CatalogStore>,
    pub ledger: Arc<dyn Ledger>,
    pub credentials: Arc<dyn CredentialSource>,
    pub images: Arc<dyn ImageSource>,
}

async fn aws_sdk_config(cell: &OnceCell<SdkConfig>) -> &SdkConfig {
    cell.get_or_init(|| aws_config::load_defaults(BehaviorVersion::latest()))
        .await
}

impl Clients {
    /// Build clients for the backends named in `config`
    ///
    /// AWS configuration is resolved from the environment the first time an
    /// AWS-backed component needs it, so purely local configurations never
    /// touch it.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let aws = OnceCell::new();

        let catalog: Arc<dyn CatalogStore> = match &config.catalog {
            CatalogConfig::S3 { bucket, key } => {
                let client = aws_sdk_s3::Client::new(aws_sdk_config(&aws).await);
                Arc::new(S3CatalogStore::new(client, bucket, key))
            }
            CatalogConfig::File { path } => Arc::new(FileCatalogStore::new(expand_path(path))),
        };

        let ledger: Arc<dyn Ledger> = match &config.ledger {
            LedgerConfig::Dynamodb { table } => {
                let client = aws_sdk_dynamodb::Client::new(aws_sdk_config(&aws).await);
                Arc::new(DynamoLedger::new(client, table))
            }
            LedgerConfig::Sqlite { path } => Arc::new(SqliteLedger::new(path).await?),
            LedgerConfig::Memory => Arc::new(MemoryLedger::new()),
        };

        let credentials: Arc<dyn CredentialSource> = match &config.credentials {
            CredentialsConfig::SecretsManager { secret_id } => {
                let client = aws_sdk_secretsmanager::Client::new(aws_sdk_config(&aws).await);
                Arc::new(SecretsManagerSource::new(client, secret_id))
            }
            CredentialsConfig::Env => Arc::new(EnvCredentialSource),
        };

        tracing::debug!(
            catalog = %catalog.location(),
            ledger = ledger.backend_name(),
            credentials = credentials.source_name(),
            "clients ready"
        );

        Ok(Self {
            catalog,
            ledger,
            credentials,
            images: Arc::new(HttpImageSource::new()),
        })
    }
}

pub struct ArtbotService {
    clients: Clients,
    selection: SelectionConfig,
    bluesky: BlueskyConfig,
    timeout: Option<Duration>,
}

impl ArtbotService {
    /// Create a service with default selection and Bluesky settings
    pub fn new(clients: Clients) -> Self {
        Self {
            clients,
            selection: SelectionConfig::default(),
            bluesky: BlueskyConfig::default(),
            timeout: None,
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let clients = Clients::from_config(config).await?;

        Ok(Self::new(clients)
            .with_selection(config.selection)
            .with_bluesky(config.bluesky.clone())
            .with_timeout(config.invocation.timeout_secs.map(Duration::from_secs)))
    }

    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_bluesky(mut self, bluesky: BlueskyConfig) -> Self {
        self.bluesky = bluesky;
        self
    }

    /// Fail any invocation that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Select a record and post it to Bluesky
    ///
    /// # Errors
    ///
    /// Any catalog, ledger read, formatting, credential, image or platform
    /// failure ends the invocation. A failed ledger write does not; it is
    /// logged and flagged in the report.
    pub async fn run_once(&self) -> Result<InvocationReport> {
        self.bounded(async {
            let mut platform = BlueskyClient::new(&self.bluesky.service).await?;
            self.invoke(&mut platform).await
        })
        .await
    }

    /// Like [`run_once`](Self::run_once), posting through `platform`
    pub async fn run_once_with(&self, platform: &mut dyn Platform) -> Result<InvocationReport> {
        self.bounded(self.invoke(platform)).await
    }

    /// Select and format a record without marking or posting it
    pub async fn dry_run(&self) -> Result<InvocationReport> {
        self.bounded(self.preview()).await
    }

    async fn bounded<T, F>(&self, invocation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, invocation)
                .await
                .map_err(|_| ArtbotError::Timeout(limit.as_secs()))?,
            None => invocation.await,
        }
    }

    async fn invoke(&self, platform: &mut dyn Platform) -> Result<InvocationReport> {
        let catalog = self.load_postable().await?;

        let selection = Selector::new(self.clients.ledger.as_ref())
            .with_tolerance(self.selection.tolerance)
            .select(&catalog)
            .await?;
        let content = format_post(selection.record)?;

        if let Some(error) = &selection.ledger_error {
            tracing::error!(
                record = %selection.record,
                error = %error,
                "ledger write failed; this record may be selected again"
            );
        }

        let publisher = Publisher::new(
            self.clients.credentials.as_ref(),
            self.clients.images.as_ref(),
        );
        let post_uri = publisher
            .publish(platform, selection.record, &content)
            .await?;

        Ok(report(&selection, content, Some(post_uri)))
    }

    async fn preview(&self) -> Result<InvocationReport> {
        let catalog = self.load_postable().await?;
        let ledger = ReadOnlyLedger::new(Arc::clone(&self.clients.ledger));

        let selection = Selector::new(&ledger)
            .with_tolerance(self.selection.tolerance)
            .select(&catalog)
            .await?;
        let content = format_post(selection.record)?;

        Ok(report(&selection, content, None))
    }

    async fn load_postable(&self) -> Result<Vec<CatalogRecord>> {
        let catalog = self.clients.catalog.load().await?;
        let total = catalog.len();
        let postable = postable_records(catalog, self.selection.max_post_length);

        tracing::info!(
            location = %self.clients.catalog.location(),
            records = total,
            postable = postable.len(),
            "loaded catalog"
        );

        if postable.is_empty() {
            return Err(ArtbotError::InvalidInput(format!(
                "None of the {} catalog records can be posted",
                total
            )));
        }

        Ok(postable)
    }
}

fn report(selection: &Selection<'_>, content: PostContent, post_uri: Option<String>) -> InvocationReport {
    InvocationReport {
        name: selection.record.name.clone(),
        set: selection.record.set_name.clone(),
        post_uri,
        resamples: selection.resamples,
        duplicate: selection.duplicate,
        ledger_degraded: selection.ledger_degraded(),
        text: content.text,
        completed_at: chrono::Utc::now().timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::BlueskyCredentials;
    use crate::platforms::mock::MockPlatform;
    use crate::types::{Image, ImageMimeType};
    use async_trait::async_trait;
    use tempfile::TempDir;

    const CATALOG: &str = r#"[
        {
            "name": "Shock",
            "image_uris": { "art_crop": "https://cards.example/art/shock.jpg" },
            "set_name": "Magic 2010",
            "flavor_text": "Lightning tethered.",
            "artist": "Jon Foster"
        },
        {
            "name": "Memory Lapse",
            "image_uris": null,
            "set_name": "Mirage",
            "flavor_text": "Forgotten.",
            "artist": "Mark Tedin"
        }
    ]"#;

    struct TestCredentials;

    #[async_trait]
    impl CredentialSource for TestCredentials {
        async fn fetch(&self) -> Result<BlueskyCredentials> {
            Ok(BlueskyCredentials::new("artbot.bsky.social", "app-password"))
        }

        fn source_name(&self) -> &str {
            "test"
        }
    }

    struct TestImages;

    #[async_trait]
    impl ImageSource for TestImages {
        async fn fetch(&self, _url: &str) -> Result<Image> {
            Ok(Image {
                bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
                mime_type: ImageMimeType::Jpeg,
            })
        }
    }

    fn write_catalog(dir: &TempDir, json: &str) -> String {
        let path = dir.path().join("cards.json");
        std::fs::write(&path, json).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn clients(catalog_path: &str, ledger: MemoryLedger) -> Clients {
        Clients {
            catalog: Arc::new(FileCatalogStore::new(catalog_path)),
            ledger: Arc::new(ledger),
            credentials: Arc::new(TestCredentials),
            images: Arc::new(TestImages),
        }
    }

    #[tokio::test]
    async fn test_clients_from_local_config() {
        let temp_dir = TempDir::new().unwrap();
        let catalog_path = write_catalog(&temp_dir, CATALOG);
        let ledger_path = temp_dir.path().join("ledger.db");

        let config = Config::from_toml_str(&format!(
            r#"
            [catalog]
            source = "file"
            path = "{}"

            [ledger]
            backend = "sqlite"
            path = "{}"

            [credentials]
            source = "env"
            "#,
            catalog_path,
            ledger_path.display()
        ))
        .unwrap();

        let clients = Clients::from_config(&config).await.unwrap();

        assert_eq!(clients.catalog.location(), catalog_path);
        assert_eq!(clients.ledger.backend_name(), "sqlite");
        assert_eq!(clients.credentials.source_name(), "env");
        assert!(ledger_path.exists());
    }

    #[tokio::test]
    async fn test_run_once_skips_unpostable_records() {
        let temp_dir = TempDir::new().unwrap();
        let catalog_path = write_catalog(&temp_dir, CATALOG);
        let ledger = MemoryLedger::new();
        let service = ArtbotService::new(clients(&catalog_path, ledger.clone()));
        let mut platform = MockPlatform::success("mock");

        // Memory Lapse has no art, so Shock is the only candidate
        for _ in 0..5 {
            let report = service.run_once_with(&mut platform).await.unwrap();
            assert_eq!(report.name, "Shock");
        }

        assert!(!ledger.has_entry("Memory Lapse", "Mirage"));
        assert_eq!(platform.posts().len(), 5);
    }

    #[tokio::test]
    async fn test_nothing_postable_is_invalid_input() {
        let temp_dir = TempDir::new().unwrap();
        let catalog_path = write_catalog(
            &temp_dir,
            r#"[{"name": "Shock", "set_name": "Magic 2010", "artist": "Jon Foster"}]"#,
        );
        let ledger = MemoryLedger::new();
        let service = ArtbotService::new(clients(&catalog_path, ledger.clone()));
        let mut platform = MockPlatform::success("mock");

        let result = service.run_once_with(&mut platform).await;

        assert_eq!(result.unwrap_err().exit_code(), 3);
        assert_eq!(ledger.read_count(), 0);
        assert_eq!(platform.auth_call_count(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_reads_but_never_writes() {
        let temp_dir = TempDir::new().unwrap();
        let catalog_path = write_catalog(&temp_dir, CATALOG);
        let ledger = MemoryLedger::with_entries([("Shock", "Magic 2010")]);
        let service = ArtbotService::new(clients(&catalog_path, ledger.clone()))
            .with_selection(SelectionConfig {
                tolerance: 2,
                max_post_length: 300,
            });

        let report = service.dry_run().await.unwrap();

        assert_eq!(report.name, "Shock");
        assert!(report.duplicate);
        assert_eq!(report.resamples, 2);
        assert_eq!(report.post_uri, None);
        assert_eq!(ledger.read_count(), 3);
        assert_eq!(ledger.write_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_fails_invocation() {
        let temp_dir = TempDir::new().unwrap();
        let catalog_path = write_catalog(&temp_dir, CATALOG);
        let service = ArtbotService::new(clients(&catalog_path, MemoryLedger::new()))
            .with_timeout(Some(Duration::from_millis(20)));
        let mut platform = MockPlatform::with_delay("mock", Duration::from_secs(5));

        let result = service.run_once_with(&mut platform).await;

        assert!(matches!(result, Err(ArtbotError::Timeout(_))));
        assert!(platform.posts().is_empty());
    }
}
