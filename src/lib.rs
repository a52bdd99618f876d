//! Orion curator SDK.
//!
//! Wires the order-intent lifecycle against the Orion vault contracts:
//! - Validation of raw intents against the on-chain whitelist and decimal
//!   precision
//! - A CKKS context lifecycle split into public and secret halves, so the
//!   curator (encrypt), compute server (evaluate) and decryptor each hold
//!   only the capability their role needs
//! - A transaction engine owning nonce, gas and confirmation sequencing
//! - Best-effort receipt decoding against declared event shapes
//!
//! The command-line surface lives in the `orion` binary; everything here is
//! callable as a library.

pub mod chain;
pub mod errors;
pub mod fhe;
pub mod intent;
pub mod keystore;

pub use chain::{
    deploy_vault, submit_encrypted_order_intent, submit_order_intent, ChainRpc, DecodedLog,
    EngineConfig, HttpRpc, LogValue, OrionConfigReader, TransactionEngine, TransactionResult,
    TxReceipt, VaultDeployment, VaultKind,
};
pub use errors::{
    ContextError, DecryptionError, EvaluationError, RpcError, TransactionError, ValidationError,
};
pub use fhe::{
    Ciphertext, EncryptionContext, EvalOp, HomomorphicEvaluator, IntentDecryptor, IntentEncryptor,
    PublicContext, SecretContext,
};
pub use intent::{
    order_intent_from_json, order_intent_from_table, EncryptedOrderIntent, FuzzConfig,
    InputProver, IntentValidator, LocalProver, OrderIntent, WhitelistSnapshot,
};
pub use keystore::{ContextStore, FsContextStore};
