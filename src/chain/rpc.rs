//! Chain RPC collaborator.
//!
//! The engine and configuration reader talk to the chain exclusively
//! through [`ChainRpc`], so tests run against an in-memory double and the
//! production path is a thin blocking JSON-RPC client. Every method can
//! fail with [`RpcError`], which callers receive unchanged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256, U64};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::chain::receipt::TxReceipt;
use crate::errors::RpcError;

/// An `eth_call` / `eth_estimateGas` request object.
#[derive(Debug, Clone, Serialize)]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

/// Synchronous chain access used by the core.
pub trait ChainRpc {
    fn chain_id(&self) -> Result<u64, RpcError>;
    /// Pending-state nonce for the account. Fetched immediately before
    /// signing; the engine serializes per-account use.
    fn transaction_count(&self, address: Address) -> Result<u64, RpcError>;
    fn gas_price(&self) -> Result<u128, RpcError>;
    fn estimate_gas(&self, call: &CallRequest) -> Result<u64, RpcError>;
    fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, RpcError>;
    /// One receipt poll; `None` while the transaction is unmined.
    fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, RpcError>;
    fn call(&self, call: &CallRequest) -> Result<Bytes, RpcError>;
}

/// Blocking JSON-RPC over HTTP.
#[derive(Debug)]
pub struct HttpRpc {
    url: String,
    client: reqwest::blocking::Client,
    next_id: AtomicU64,
}

impl HttpRpc {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| RpcError::Transport(err.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(method, id, "rpc request");

        let response: serde_json::Value = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|err| RpcError::Transport(err.to_string()))?
            .json()
            .map_err(|err| RpcError::Transport(err.to_string()))?;

        if let Some(error) = response.get("error") {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            return Err(RpcError::Rpc { code, message });
        }

        let result = response
            .get("result")
            .cloned()
            .ok_or_else(|| RpcError::InvalidResponse("missing result field".into()))?;
        serde_json::from_value(result)
            .map_err(|err| RpcError::InvalidResponse(format!("{method}: {err}")))
    }
}

impl ChainRpc for HttpRpc {
    fn chain_id(&self) -> Result<u64, RpcError> {
        let id: U64 = self.request("eth_chainId", serde_json::json!([]))?;
        Ok(id.to::<u64>())
    }

    fn transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        let nonce: U64 = self.request(
            "eth_getTransactionCount",
            serde_json::json!([address, "pending"]),
        )?;
        Ok(nonce.to::<u64>())
    }

    fn gas_price(&self) -> Result<u128, RpcError> {
        let price: U256 = self.request("eth_gasPrice", serde_json::json!([]))?;
        Ok(price.to::<u128>())
    }

    fn estimate_gas(&self, call: &CallRequest) -> Result<u64, RpcError> {
        let estimate: U256 = self.request("eth_estimateGas", serde_json::json!([call]))?;
        Ok(estimate.to::<u64>())
    }

    fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, RpcError> {
        let raw = Bytes::copy_from_slice(raw);
        self.request("eth_sendRawTransaction", serde_json::json!([raw]))
    }

    fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        self.request("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
    }

    fn call(&self, call: &CallRequest) -> Result<Bytes, RpcError> {
        self.request("eth_call", serde_json::json!([call, "latest"]))
    }
}
