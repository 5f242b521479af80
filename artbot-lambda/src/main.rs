//! artbot-lambda - hourly Lambda entry point
//!
//! Configuration comes from the function environment (`BUCKET`, `BUCKET_KEY`,
//! `DB_NAME`, optional `ARTBOT_*` overrides). The trigger event is ignored.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use libartbot::config::Config;
use libartbot::logging;
use libartbot::service::ArtbotService;
use libartbot::InvocationReport;

async fn handle_event(
    service: &ArtbotService,
    event: LambdaEvent<serde_json::Value>,
) -> Result<InvocationReport, Error> {
    let request_id = event.context.request_id;
    tracing::info!(request_id = %request_id, "invocation started");

    match service.run_once().await {
        Ok(report) => {
            if report.ledger_degraded {
                tracing::error!(
                    request_id = %request_id,
                    name = %report.name,
                    set = %report.set,
                    "posted, but the dedup ledger was not updated"
                );
            }

            tracing::info!(
                request_id = %request_id,
                name = %report.name,
                set = %report.set,
                post_uri = report.post_uri.as_deref().unwrap_or_default(),
                resamples = report.resamples,
                duplicate = report.duplicate,
                "invocation complete"
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                exit_code = e.exit_code(),
                "invocation failed"
            );
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init_lambda();

    let config = Config::from_env()?;
    let service = ArtbotService::from_config(&config).await?;
    let service = &service;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<serde_json::Value>| async move {
        handle_event(service, event).await
    }))
    .await
}
