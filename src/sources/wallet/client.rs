use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Url, header::ACCEPT};
use serde_json::Value;
use tracing::{debug, error};

use super::page::{describe_error_body, parse_page};
use crate::{
    config::WalletApiConfig,
    core::source::{FetchError, TransactionPage, TransactionSource},
};

/// HTTP client for the wallet transaction history endpoint.
pub struct WalletApiClient {
    client: Client,
    cfg: WalletApiConfig,
}

impl WalletApiClient {
    pub fn new(cfg: WalletApiConfig) -> Result<Self> {
        let client = Client::builder().timeout(cfg.request_timeout()).build()?;
        Ok(Self { client, cfg })
    }

    fn api_key(&self) -> Result<&str, FetchError> {
        self.cfg
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(FetchError::MissingCredentials)
    }
}

#[async_trait]
impl TransactionSource for WalletApiClient {
    fn first_page_url(&self, address: &str, page_size: u32) -> Result<String, FetchError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(FetchError::InvalidRequest("address is empty".to_string()));
        }
        // Dot segments would be collapsed by the URL parser on the server side
        if address == "." || address == ".." {
            return Err(FetchError::InvalidRequest(format!(
                "invalid address: {address}"
            )));
        }

        let mut url = Url::parse(&self.cfg.base_url).map_err(|e| {
            FetchError::InvalidRequest(format!("{}: {e}", self.cfg.base_url))
        })?;
        // Each piece is pushed as one percent-encoded segment, so `/`, `?`
        // and `#` in the address cannot change the endpoint or the query
        url.path_segments_mut()
            .map_err(|_| {
                FetchError::InvalidRequest(format!("{} cannot be a base URL", self.cfg.base_url))
            })?
            .pop_if_empty()
            .push("wallets")
            .push(address)
            .push("transactions");
        url.query_pairs_mut()
            .append_pair("filter[chain_ids]", &self.cfg.chain_id)
            .append_pair("page[size]", &page_size.to_string());

        Ok(url.into())
    }

    async fn fetch_page(&self, url: &str) -> Result<TransactionPage, FetchError> {
        let api_key = self.api_key()?;

        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .basic_auth(api_key, None::<&str>);
        if let Some(env) = &self.cfg.env_header {
            request = request.header("X-Env", env);
        }

        debug!("📥 Fetching transaction page: {}", url);
        let response = request.send().await.map_err(|e| {
            error!("❌ Transaction page request failed: {}", e);
            FetchError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = describe_error_body(&body);
            error!(status = status.as_u16(), body = %body, "❌ Transaction API returned an error");
            return Err(FetchError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            error!("❌ Transaction page body is not JSON: {}", e);
            FetchError::MalformedBody(e.to_string())
        })?;

        parse_page(body)
    }
}
