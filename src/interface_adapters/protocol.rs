// JSON DTOs for the relay control channel and the directory JSON-RPC service.
// Binary application payloads live in `codec`; envelopes in `envelope`.

use serde::{Deserialize, Serialize};

pub const ACTION_SET_CLIENT: &str = "setClient";
pub const ACTION_UPDATE_SIG_CHAIN: &str = "updateSigChainBlockHash";

/// Relay error code meaning success.
pub const ERR_SUCCESS: i64 = 0;

/// Control request sent as a text frame right after the socket opens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ControlRequest {
    pub action: String,
    pub addr: String,
}

impl ControlRequest {
    pub fn set_client(addr: impl Into<String>) -> Self {
        Self {
            action: ACTION_SET_CLIENT.to_string(),
            addr: addr.into(),
        }
    }
}

/// Control acknowledgement received as a text frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ControlResponse {
    #[serde(alias = "action")]
    pub action: String,
    #[serde(default, alias = "error")]
    pub error: i64,
}

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

impl<'a, P> RpcRequest<'a, P> {
    pub fn new(id: u64, method: &'a str, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetWsAddrParams<'a> {
    pub address: &'a str,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}
