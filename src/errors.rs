//! Error taxonomy for the Orion curator SDK.
//!
//! Each fault domain gets its own enum so callers can tell recoverable
//! validation problems apart from key-material faults and from chain
//! submission outcomes. Transport errors (`RpcError`) pass through the
//! transaction engine unchanged; the engine only ever adds meaning where the
//! chain itself has spoken (a mined receipt with a failure status).

use alloy::primitives::B256;

/// Order-intent validation failure. Always raised before any network
/// interaction and never partially applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The asset identifier could not be parsed as a 20-byte address.
    MalformedAddress(String),
    /// The asset is not in the current whitelist. Carries the canonical
    /// lowercase form of the offending address.
    NotWhitelisted(String),
    /// A negative amount was supplied for an asset.
    NegativeAmount { asset: String, amount: i128 },
    /// A caller-side intent file could not be shaped into an asset mapping.
    MalformedInput(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MalformedAddress(raw) => {
                write!(f, "malformed asset address: {raw}")
            }
            ValidationError::NotWhitelisted(addr) => {
                write!(f, "asset is not whitelisted: {addr}")
            }
            ValidationError::NegativeAmount { asset, amount } => {
                write!(f, "negative amount {amount} for asset {asset}")
            }
            ValidationError::MalformedInput(msg) => write!(f, "malformed intent input: {msg}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Key-material lifecycle failure. Not retryable without regenerating or
/// reloading correct material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// Serialized context or ciphertext material is truncated or mangled.
    Corrupt(String),
    /// Loaded material was produced under a different parameter set than the
    /// fixed scheme contract.
    IncompatibleParameters(String),
    /// The storage collaborator failed to read or write a slot.
    Storage(String),
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextError::Corrupt(msg) => write!(f, "corrupt key material: {msg}"),
            ContextError::IncompatibleParameters(msg) => {
                write!(f, "incompatible scheme parameters: {msg}")
            }
            ContextError::Storage(msg) => write!(f, "context storage error: {msg}"),
        }
    }
}

impl std::error::Error for ContextError {}

/// Compute-server evaluation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// The requested operation needs key material the public context does
    /// not carry (e.g. a rotation without the matching Galois key).
    UnsupportedOperation(String),
    /// The ciphertext was produced under a different key-generation epoch
    /// than the supplied public context.
    ContextMismatch,
    /// Two ciphertext operands carry different scales.
    ScaleMismatch,
}

impl std::fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationError::UnsupportedOperation(msg) => {
                write!(f, "unsupported homomorphic operation: {msg}")
            }
            EvaluationError::ContextMismatch => {
                write!(f, "ciphertext does not match the public context epoch")
            }
            EvaluationError::ScaleMismatch => write!(f, "ciphertext scales do not match"),
        }
    }
}

impl std::error::Error for EvaluationError {}

/// Decryptor-side failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    /// The ciphertext was produced under a different key-generation epoch
    /// than the secret context supplied.
    ContextMismatch,
    /// The ciphertext shape disagrees with the secret context's parameters.
    IncompatibleParameters(String),
}

impl std::fmt::Display for DecryptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecryptionError::ContextMismatch => {
                write!(f, "ciphertext does not match the secret context epoch")
            }
            DecryptionError::IncompatibleParameters(msg) => {
                write!(f, "incompatible ciphertext parameters: {msg}")
            }
        }
    }
}

impl std::error::Error for DecryptionError {}

/// Chain RPC transport or protocol fault. Propagated unchanged by the
/// engine; retry policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The HTTP transport failed before a JSON-RPC response was obtained.
    Transport(String),
    /// The node returned a JSON-RPC error object.
    Rpc { code: i64, message: String },
    /// The node's response could not be decoded into the expected shape.
    InvalidResponse(String),
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcError::Transport(msg) => write!(f, "rpc transport error: {msg}"),
            RpcError::Rpc { code, message } => write!(f, "rpc error {code}: {message}"),
            RpcError::InvalidResponse(msg) => write!(f, "invalid rpc response: {msg}"),
        }
    }
}

impl std::error::Error for RpcError {}

/// Terminal outcome of a failed transaction submission.
///
/// `EstimationFailed` means nothing was broadcast and the action is safe to
/// fix and retry. `Reverted` means the transaction was mined with no effect;
/// the broadcast is final. `ConfirmationTimeout` leaves the outcome unknown:
/// the caller must query the receipt out-of-band before deciding to
/// resubmit, since the original transaction may still confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// Gas estimation rejected the call before anything was signed.
    EstimationFailed(String),
    /// Local signing failed; nothing was broadcast.
    Signing(String),
    /// The transaction was mined with a non-success status.
    Reverted { tx_hash: B256, status: u64 },
    /// No receipt appeared within the confirmation window.
    ConfirmationTimeout { tx_hash: B256 },
    /// A transport fault, passed through unchanged.
    Rpc(RpcError),
}

impl TransactionError {
    /// Transaction hash, when one was obtained before the failure.
    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            TransactionError::Reverted { tx_hash, .. }
            | TransactionError::ConfirmationTimeout { tx_hash } => Some(*tx_hash),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionError::EstimationFailed(msg) => {
                write!(f, "gas estimation failed: {msg}")
            }
            TransactionError::Signing(msg) => write!(f, "transaction signing failed: {msg}"),
            TransactionError::Reverted { tx_hash, status } => {
                write!(f, "transaction {tx_hash} reverted with status {status}")
            }
            TransactionError::ConfirmationTimeout { tx_hash } => {
                write!(f, "transaction {tx_hash} not confirmed within the timeout")
            }
            TransactionError::Rpc(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for TransactionError {}

impl From<RpcError> for TransactionError {
    fn from(err: RpcError) -> Self {
        TransactionError::Rpc(err)
    }
}
