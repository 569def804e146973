use crate::{
    api::{ProposalsSummary, ResetRequest, SputnikApi},
    config::SyncConfig,
    error::SyncError,
};
use tracing::{error, info, instrument, warn};

/// Everything one run did, in call order.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub reset: Option<Result<(), SyncError>>,
    pub calls: Vec<Result<ProposalsSummary, SyncError>>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.calls.iter().filter(|call| call.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.calls.len() - self.succeeded()
    }

    /// `total_records` of each successful call, `None` where the field was absent.
    pub fn total_records(&self) -> Vec<Option<i64>> {
        self.calls
            .iter()
            .filter_map(|call| call.as_ref().ok())
            .map(|summary| summary.total_records)
            .collect()
    }
}

/// Optional reset, then `max_calls` sequential polls with `delay` between them.
/// No call failure stops the loop.
#[instrument(name = "run_sync", skip_all, fields(contract = %config.contract))]
pub async fn run_sync(api: &SputnikApi, config: &SyncConfig) -> SyncReport {
    let mut report = SyncReport::default();

    if let Some(request) = config.reset_request() {
        report.reset = Some(reset_cache(api, &config.contract, request).await);
    }

    let delay = config.delay();
    for call in 0..config.max_calls {
        if call > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        report.calls.push(call_api(api, call, &config.contract).await);
    }

    report
}

async fn reset_cache(
    api: &SputnikApi,
    contract: &str,
    request: ResetRequest,
) -> Result<(), SyncError> {
    let result = api.reset(contract, request).await;

    match &result {
        Ok(()) => info!(?request, "Cache reset successful"),
        Err(SyncError::Http { status }) => {
            warn!(?request, status = status.as_u16(), "Cache reset failed with status code")
        }
        Err(e) => error!(?request, kind = e.kind(), error = %e, "Cache reset errored"),
    }

    result
}

async fn call_api(
    api: &SputnikApi,
    call: u32,
    contract: &str,
) -> Result<ProposalsSummary, SyncError> {
    let result = api.fetch_proposals(contract).await;

    match &result {
        Ok(summary) => info!(call, total_records = ?summary.total_records, "API call successful"),
        Err(SyncError::Http { status }) => {
            warn!(call, status = status.as_u16(), "API call failed with status code")
        }
        Err(e @ SyncError::Transport(_)) => {
            error!(call, kind = e.kind(), error = %e, "API call errored")
        }
        Err(e @ SyncError::Parse { .. }) => {
            error!(call, kind = e.kind(), error = %e, "API call returned an unexpected body")
        }
    }

    result
}
