//! DynamoDB-backed ledger
//!
//! The table has partition key `name` and sort key `set`, both strings. An
//! item's presence is the ledger entry; `posted_at` is informational.

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;

use super::{Ledger, LedgerResult};
use crate::error::LedgerError;
use crate::types::RecordKey;

pub struct DynamoLedger {
    client: DynamoClient,
    table: String,
}

impl DynamoLedger {
    pub fn new(client: DynamoClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

/// Primary key attributes for a record
fn key_attributes(key: RecordKey<'_>) -> HashMap<String, AttributeValue> {
    HashMap::from([
        ("name".to_string(), AttributeValue::S(key.name.to_string())),
        ("set".to_string(), AttributeValue::S(key.set.to_string())),
    ])
}

/// Full item written for a selected record
fn entry_item(key: RecordKey<'_>, posted_at: i64) -> HashMap<String, AttributeValue> {
    let mut item = key_attributes(key);
    item.insert(
        "posted_at".to_string(),
        AttributeValue::N(posted_at.to_string()),
    );
    item
}

#[async_trait]
impl Ledger for DynamoLedger {
    async fn contains(&self, key: RecordKey<'_>) -> LedgerResult<bool> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table)
            .set_key(Some(key_attributes(key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| {
                LedgerError::Unavailable(format!(
                    "GetItem on {} failed: {}",
                    self.table,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(response.item().is_some())
    }

    async fn mark(&self, key: RecordKey<'_>) -> LedgerResult<()> {
        let posted_at = chrono::Utc::now().timestamp();

        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(entry_item(key, posted_at)))
            .send()
            .await
            .map_err(|e| {
                LedgerError::Unavailable(format!(
                    "PutItem on {} failed: {}",
                    self.table,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(())
    }

    fn backend_name(&self) -> &str {
        "dynamodb"
    }
}
