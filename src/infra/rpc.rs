//! Chain RPC client for token balances.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::core::{BalanceSource, SchedulerError};

/// Path of the balance endpoint.
pub const CURRENCY_BALANCE_PATH: &str = "/v1/chain/get_currency_balance";

#[derive(Debug, Serialize)]
struct BalanceRequest<'a> {
    code: &'a str,
    account: &'a str,
    symbol: &'a str,
}

/// Queries balances through a chain API node.
#[derive(Debug, Clone)]
pub struct ChainRpcClient {
    base_url: String,
    client: Client,
}

impl ChainRpcClient {
    /// Create a client for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a client reusing an existing HTTP client.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl BalanceSource for ChainRpcClient {
    async fn currency_balance(
        &self,
        contract: &str,
        owner: &str,
        symbol: &str,
    ) -> Result<Vec<String>, SchedulerError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, CURRENCY_BALANCE_PATH))
            .json(&BalanceRequest {
                code: contract,
                account: owner,
                symbol,
            })
            .send()
            .await
            .map_err(|e| SchedulerError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SchedulerError::Fetch(format!(
                "rpc returned {} for {symbol}",
                response.status()
            )));
        }

        response
            .json::<Vec<String>>()
            .await
            .map_err(|e| SchedulerError::Malformed(e.to_string()))
    }
}
