//! Receipts and best-effort event decoding.
//!
//! A receipt's status field is the authoritative success signal; decoded
//! logs are a derived projection for callers and UIs. Decoding tries each
//! candidate event shape in the contract's declared order and stops at the
//! first that fits (first-match-wins); logs from other addresses are
//! ignored and logs matching no shape are silently dropped; absence of a
//! decoded event is a valid outcome, never an error.

use alloy::primitives::{Address, Bytes, LogData, B256, U256, U64};
use serde::{Deserialize, Serialize};

/// One raw log entry from a transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub log_index: Option<U64>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
}

/// A mined transaction's receipt as served by the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: B256,
    /// 1 for success, 0 for revert. Absent on pre-Byzantium chains, which
    /// the protocol does not target; treat absence as failure.
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl TxReceipt {
    /// Whether the chain recorded the transaction as successful.
    pub fn is_success(&self) -> bool {
        self.status == Some(U64::from(1))
    }

    pub fn status_code(&self) -> u64 {
        self.status.map(|s| s.to::<u64>()).unwrap_or(0)
    }
}

/// A decoded event argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
    String(String),
    Bytes(Bytes),
}

impl std::fmt::Display for LogValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogValue::Address(a) => write!(f, "{}", a.to_checksum(None)),
            LogValue::Uint(v) => write!(f, "{v}"),
            LogValue::Bool(b) => write!(f, "{b}"),
            LogValue::String(s) => write!(f, "{s}"),
            LogValue::Bytes(b) => write!(f, "{b}"),
        }
    }
}

/// A receipt log matched against a known event shape and projected into
/// named arguments (in declaration order).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLog {
    pub event: String,
    pub args: Vec<(String, LogValue)>,
    pub address: Address,
    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
    pub transaction_hash: Option<B256>,
}

impl DecodedLog {
    pub fn arg(&self, name: &str) -> Option<&LogValue> {
        self.args
            .iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }
}

/// A typed event-shape descriptor. Shapes are declared per contract in the
/// contract's event order; "no match" is a valid variant, not an error.
#[derive(Clone, Copy)]
pub struct EventShape {
    pub name: &'static str,
    pub decode: fn(&LogData) -> Option<Vec<(String, LogValue)>>,
}

impl std::fmt::Debug for EventShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventShape").field("name", &self.name).finish()
    }
}

/// Decode every log a contract emitted in this receipt.
///
/// Only logs whose emitting address equals `contract_address`
/// (case-insensitive, since addresses compare as bytes) are considered. For each,
/// candidate shapes are tried in declared order; the first that decodes
/// wins and remaining shapes are skipped for that log.
pub fn decode_receipt_logs(
    receipt: &TxReceipt,
    contract_address: Address,
    shapes: &[EventShape],
) -> Vec<DecodedLog> {
    let mut decoded = Vec::new();
    for log in &receipt.logs {
        if log.address != contract_address {
            continue;
        }
        let Some(data) = LogData::new(log.topics.clone(), log.data.clone()) else {
            continue;
        };
        for shape in shapes {
            if let Some(args) = (shape.decode)(&data) {
                decoded.push(DecodedLog {
                    event: shape.name.to_string(),
                    args,
                    address: log.address,
                    block_number: log.block_number.map(|n| n.to::<u64>()),
                    log_index: log.log_index.map(|n| n.to::<u64>()),
                    transaction_hash: log.transaction_hash,
                });
                break;
            }
        }
    }
    decoded
}

/// Derived query over decoded logs: the `vault` argument of the first
/// `OrionVaultCreated` event, in receipt log order. Absence is "not found",
/// not an error.
pub fn vault_address_from_logs(logs: &[DecodedLog]) -> Option<Address> {
    logs.iter()
        .find(|log| log.event == "OrionVaultCreated")
        .and_then(|log| match log.arg("vault") {
            Some(LogValue::Address(addr)) => Some(*addr),
            _ => None,
        })
}
