//! Shared fixtures for integration tests: an in-memory chain double and a
//! canned whitelist.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{keccak256, Address, Bytes, B256, U64};
use alloy::signers::local::PrivateKeySigner;

use orion_sdk::chain::receipt::{LogEntry, TxReceipt};
use orion_sdk::chain::rpc::CallRequest;
use orion_sdk::{ChainRpc, RpcError, WhitelistSnapshot};

pub const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

pub fn whitelist() -> WhitelistSnapshot {
    WhitelistSnapshot {
        assets: [WETH.parse().unwrap(), USDC.parse().unwrap()]
            .into_iter()
            .collect(),
        intent_decimals: 6,
    }
}

pub fn curator() -> PrivateKeySigner {
    "0x4c0883a69102937d6231471b5dbb6204fe51296170827936ea5cce4b76994b0f"
        .parse()
        .unwrap()
}

pub fn success_receipt(logs: Vec<LogEntry>) -> TxReceipt {
    TxReceipt {
        transaction_hash: B256::ZERO,
        status: Some(U64::from(1)),
        block_number: Some(U64::from(42)),
        logs,
    }
}

/// Minimal programmable chain double over the public [`ChainRpc`] seam.
pub struct StubChain {
    pub state: Mutex<StubState>,
}

pub struct StubState {
    pub chain_id: u64,
    pub nonces: HashMap<Address, u64>,
    pub gas_price: u128,
    pub gas_estimate: Result<u64, RpcError>,
    pub broadcasts: Vec<Vec<u8>>,
    pub receipt: Option<TxReceipt>,
}

impl Default for StubChain {
    fn default() -> Self {
        Self {
            state: Mutex::new(StubState {
                chain_id: 31337,
                nonces: HashMap::new(),
                gas_price: 1_000_000_000,
                gas_estimate: Ok(90_000),
                broadcasts: Vec::new(),
                receipt: None,
            }),
        }
    }
}

impl ChainRpc for StubChain {
    fn chain_id(&self) -> Result<u64, RpcError> {
        Ok(self.state.lock().unwrap().chain_id)
    }

    fn transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        Ok(*self
            .state
            .lock()
            .unwrap()
            .nonces
            .entry(address)
            .or_insert(0))
    }

    fn gas_price(&self) -> Result<u128, RpcError> {
        Ok(self.state.lock().unwrap().gas_price)
    }

    fn estimate_gas(&self, _call: &CallRequest) -> Result<u64, RpcError> {
        self.state.lock().unwrap().gas_estimate.clone()
    }

    fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.broadcasts.push(raw.to_vec());
        Ok(keccak256(raw))
    }

    fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        let state = self.state.lock().unwrap();
        Ok(state.receipt.clone().map(|mut receipt| {
            receipt.transaction_hash = tx_hash;
            receipt
        }))
    }

    fn call(&self, _call: &CallRequest) -> Result<Bytes, RpcError> {
        Err(RpcError::Rpc {
            code: 3,
            message: "execution reverted".into(),
        })
    }
}
