//! Chain-facing side of the SDK: the RPC collaborator, the transaction
//! engine, receipt decoding and the Orion contract surface.

pub mod contracts;
pub mod engine;
pub mod receipt;
pub mod rpc;

pub use contracts::{
    deploy_vault, submit_encrypted_order_intent, submit_order_intent, FeeType, OrionConfigReader,
    VaultDeployment, VaultKind,
};
pub use engine::{ConfirmedTransaction, EngineConfig, TransactionEngine, TransactionResult};
pub use receipt::{
    decode_receipt_logs, vault_address_from_logs, DecodedLog, EventShape, LogEntry, LogValue,
    TxReceipt,
};
pub use rpc::{CallRequest, ChainRpc, HttpRpc};
