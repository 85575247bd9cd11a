use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::domain::ports::Directory;
use crate::interface_adapters::protocol::{GetWsAddrParams, RpcRequest, RpcResponse};

const METHOD_GET_WS_ADDR: &str = "getwsaddr";

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory transport error: {0}")]
    Transport(reqwest::Error),
    #[error("directory upstream error {0}")]
    Upstream(StatusCode),
    #[error("directory response decode error: {0}")]
    Decode(reqwest::Error),
    #[error("directory rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
}

// Thin reqwest client for the JSON-RPC directory (`getwsaddr`).
pub struct DirectoryClient {
    http: reqwest::Client,
    rpc_url: String,
    next_id: AtomicU64,
}

impl DirectoryClient {
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Resolves a directory name to the relay address currently serving it.
    pub async fn get_ws_addr(&self, name: &str) -> Result<Option<String>, DirectoryError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, METHOD_GET_WS_ADDR, GetWsAddrParams { address: name });

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(DirectoryError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Upstream(status));
        }

        let body = response
            .json::<RpcResponse>()
            .await
            .map_err(DirectoryError::Decode)?;

        if let Some(error) = body.error {
            // Some directories report "not found" as an rpc error rather than a null result.
            if body.result.is_none() && error.code != 0 {
                return Err(DirectoryError::Rpc {
                    code: error.code,
                    message: error.message,
                });
            }
        }

        Ok(body.result.filter(|addr| !addr.trim().is_empty()))
    }
}

#[async_trait]
impl Directory for DirectoryClient {
    async fn lookup(&self, name: &str) -> Result<Option<String>, String> {
        self.get_ws_addr(name).await.map_err(|e| e.to_string())
    }
}
