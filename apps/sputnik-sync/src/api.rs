use crate::error::SyncError;
use anyhow::{Context, Result};
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use utils::errors::HTTP_CLIENT_BUILD_FAILED;

const SYNC_USER_AGENT: &str = concat!("sputnik-sync/", env!("CARGO_PKG_VERSION"), " reqwest/0.12");

/// Pagination envelope returned by `GET /dao/proposals/{contract}`.
/// Only `total_records` is read; every other field is ignored unchecked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProposalsSummary {
    pub total_records: Option<i64>,
}

impl ProposalsSummary {
    fn from_body(body: &str) -> Result<Self, SyncError> {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| SyncError::parse(e, body))?;

        if !value.is_object() {
            let err = <serde_json::Error as serde::de::Error>::custom("expected a JSON object");
            return Err(SyncError::parse(err, body));
        }

        serde_json::from_value(value).map_err(|e| SyncError::parse(e, body))
    }
}

/// Startup call that makes the indexer rebuild a contract's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRequest {
    /// `GET /dao/admin/{contract}/reset`
    Admin,
    /// `GET /dao/proposals/{contract}/block/{block}`
    RewindToBlock(u64),
}

/// Client for the Sputnik DAO proposal indexer.
#[derive(Debug, Clone)]
pub struct SputnikApi {
    client: Client,
    base_url: String,
}

impl SputnikApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .default_headers(Self::default_headers())
            .timeout(timeout)
            .build()
            .context(HTTP_CLIENT_BUILD_FAILED)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(SYNC_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn proposals_url(&self, contract: &str) -> String {
        format!("{}/dao/proposals/{}", self.base_url, contract)
    }

    pub fn reset_url(&self, contract: &str, request: ResetRequest) -> String {
        match request {
            ResetRequest::Admin => format!("{}/dao/admin/{}/reset", self.base_url, contract),
            ResetRequest::RewindToBlock(block) => {
                format!("{}/dao/proposals/{}/block/{}", self.base_url, contract, block)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch_proposals(&self, contract: &str) -> Result<ProposalsSummary, SyncError> {
        let body = self.get_ok(&self.proposals_url(contract)).await?;
        ProposalsSummary::from_body(&body)
    }

    /// Any 200 counts as success; the body is ignored.
    #[instrument(skip(self))]
    pub async fn reset(&self, contract: &str, request: ResetRequest) -> Result<(), SyncError> {
        self.get_ok(&self.reset_url(contract, request)).await?;
        Ok(())
    }

    async fn get_ok(&self, url: &str) -> Result<String, SyncError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!(url, status = %status, "Response received");

        if status != StatusCode::OK {
            return Err(SyncError::Http { status });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn api(base_url: &str) -> SputnikApi {
        SputnikApi::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn urls_ignore_trailing_slash() {
        let with_slash = api("http://localhost:8080/");
        let without_slash = api("http://localhost:8080");

        assert_eq!(
            with_slash.proposals_url("testing-treasury.sputnik-dao.near"),
            "http://localhost:8080/dao/proposals/testing-treasury.sputnik-dao.near"
        );
        assert_eq!(
            with_slash.proposals_url("a.near"),
            without_slash.proposals_url("a.near")
        );
    }

    #[test]
    fn reset_urls() {
        let api = api("https://sputnik-indexer-2.fly.dev");

        assert_eq!(
            api.reset_url("a.near", ResetRequest::Admin),
            "https://sputnik-indexer-2.fly.dev/dao/admin/a.near/reset"
        );
        assert_eq!(
            api.reset_url("a.near", ResetRequest::RewindToBlock(0)),
            "https://sputnik-indexer-2.fly.dev/dao/proposals/a.near/block/0"
        );
        assert_eq!(
            api.reset_url("a.near", ResetRequest::RewindToBlock(123_456)),
            "https://sputnik-indexer-2.fly.dev/dao/proposals/a.near/block/123456"
        );
    }

    #[test]
    fn summary_reads_pagination_envelope() {
        let summary = ProposalsSummary::from_body(
            r#"{"records": [{"id": 1}], "page": 1, "page_size": 10, "total_records": 42}"#,
        )
        .unwrap();

        assert_eq!(
            summary,
            ProposalsSummary {
                total_records: Some(42),
            }
        );
    }

    #[test]
    fn summary_ignores_other_fields() {
        let summary = ProposalsSummary::from_body(
            r#"{"total_records": 5, "page": "x", "page_size": null, "records": {"odd": true}}"#,
        )
        .unwrap();
        assert_eq!(summary.total_records, Some(5));
    }

    #[test]
    fn summary_accepts_negative_total() {
        let summary = ProposalsSummary::from_body(r#"{"total_records": -1}"#).unwrap();
        assert_eq!(summary.total_records, Some(-1));
    }

    #[test]
    fn summary_missing_or_null_total_is_none() {
        let missing = ProposalsSummary::from_body(r#"{"records": []}"#).unwrap();
        assert_eq!(missing.total_records, None);

        let null = ProposalsSummary::from_body(r#"{"total_records": null}"#).unwrap();
        assert_eq!(null.total_records, None);
    }

    #[test]
    fn summary_rejects_non_objects() {
        for body in ["[1, 2, 3]", "42", "not json", ""] {
            let err = ProposalsSummary::from_body(body).unwrap_err();
            assert_eq!(err.kind(), "parse", "body {body:?} should be a parse error");
        }
    }

    #[test]
    fn summary_rejects_non_integer_total() {
        let err = ProposalsSummary::from_body(r#"{"total_records": "many"}"#).unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[tokio::test]
    async fn test_fetch_proposals() {
        let mut server = Server::new_async().await;
        let api = api(&server.url());

        let mock = server
            .mock("GET", "/dao/proposals/a.near")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"records": [], "page": 1, "page_size": 10, "total_records": 7}"#)
            .create_async()
            .await;

        let summary = api.fetch_proposals("a.near").await.unwrap();
        assert_eq!(summary.total_records, Some(7));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_proposals_http_error() {
        let mut server = Server::new_async().await;
        let api = api(&server.url());

        let mock = server
            .mock("GET", "/dao/proposals/a.near")
            .with_status(404)
            .create_async()
            .await;

        let err = api.fetch_proposals("a.near").await.unwrap_err();
        assert_eq!(err.kind(), "http");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_reset_ignores_body() {
        let mut server = Server::new_async().await;
        let api = api(&server.url());

        let admin = server
            .mock("GET", "/dao/admin/a.near/reset")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;
        let rewind = server
            .mock("GET", "/dao/proposals/a.near/block/0")
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        api.reset("a.near", ResetRequest::Admin).await.unwrap();
        api.reset("a.near", ResetRequest::RewindToBlock(0))
            .await
            .unwrap();

        admin.assert_async().await;
        rewind.assert_async().await;
    }
}
