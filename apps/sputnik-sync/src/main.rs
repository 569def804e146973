use anyhow::{Context, Result};
use dotenv::dotenv;
use sputnik_sync::{api::SputnikApi, config, driver::run_sync};
use tracing::info;
use utils::tracing::run_with_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    run_with_tracing(|| async {
        let config = config::load().context("Failed to load sync config")?;
        let api = SputnikApi::new(&config.base_url(), config.request_timeout())?;

        info!(
            base_url = api.base_url(),
            contract = %config.contract,
            max_calls = config.max_calls,
            "Starting sputnik sync"
        );

        tokio::select! {
            report = run_sync(&api, &config) => {
                info!(
                    succeeded = report.succeeded(),
                    failed = report.failed(),
                    reset_ok = ?report.reset.as_ref().map(|reset| reset.is_ok()),
                    "Sync finished"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping sync");
            }
        }

        Ok(())
    })
    .await
}
