//! HTTP/JSON adapter for the local brokerage gateway daemon.
//!
//! The gateway session is the one connection resource for the whole
//! process: opened once by [`GatewayClient::connect`], released exactly once
//! by `close` no matter how the session ends.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::errors::GatewayError;

use super::provider::AccountProvider;
use super::types::{Account, AccountSnapshot, Position, TrdEnv};

pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    session_id: String,
    closed: AtomicBool,
}

#[derive(Deserialize)]
struct SessionResponse {
    session_id: String,
}

#[derive(Deserialize)]
struct AccountsResponse {
    accounts: Vec<Account>,
}

#[derive(Deserialize)]
struct AccInfoResponse {
    #[serde(default)]
    acc_info: Option<AccountSnapshot>,
}

#[derive(Deserialize)]
struct PositionsResponse {
    positions: Vec<Position>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GatewayClient {
    /// Opens a gateway session against `http://{host}:{port}`.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let base_url = format!("http://{}:{}", config.host, config.port);
        let http = reqwest::Client::new();

        let response = http.post(format!("{base_url}/session")).send().await?;
        let session: SessionResponse = decode(response).await?;
        info!(session_id = %session.session_id, %base_url, "Gateway session opened");

        Ok(Self {
            http,
            base_url,
            session_id: session.session_id,
            closed: AtomicBool::new(false),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(GatewayError::Closed);
        }
        debug!(path, "Gateway query");
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("x-session-id", &self.session_id)
            .query(query)
            .send()
            .await?;
        decode(response).await
    }
}

/// Maps non-2xx responses to [`GatewayError::Api`], preferring the body's
/// `message` field over the raw body text.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl AccountProvider for GatewayClient {
    async fn list_accounts(&self) -> Result<Vec<Account>, GatewayError> {
        let response: AccountsResponse = self.get("/accounts", &[]).await?;
        Ok(response.accounts)
    }

    async fn account_info(
        &self,
        trd_env: TrdEnv,
        acc_id: u64,
    ) -> Result<Option<AccountSnapshot>, GatewayError> {
        let query = [
            ("acc_id", acc_id.to_string()),
            ("trd_env", trd_env.to_string()),
        ];
        let response: AccInfoResponse = self.get("/accinfo", &query).await?;
        Ok(response.acc_info)
    }

    async fn position_list(
        &self,
        trd_env: TrdEnv,
        acc_id: u64,
    ) -> Result<Vec<Position>, GatewayError> {
        let query = [
            ("acc_id", acc_id.to_string()),
            ("trd_env", trd_env.to_string()),
        ];
        let response: PositionsResponse = self.get("/positions", &query).await?;
        Ok(response.positions)
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Gateway session already closed");
            return;
        }
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        match self.http.delete(&url).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Gateway session closed");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Gateway refused session close");
            }
            Err(e) => {
                warn!("Failed to close gateway session: {}", e);
            }
        }
    }
}
