//! Transaction build/sign/submit/confirm engine.
//!
//! Per submission the state machine is
//! `Built → Signed → Submitted → Pending → {Confirmed | Failed | TimedOut}`.
//! Nonce fetch through broadcast runs under a per-account lock: the
//! read-then-use of the nonce is not atomic against the chain, so two
//! in-flight submissions from one account must never interleave there.
//! Confirmation polls the receipt up to a bounded timeout. The engine never
//! resubmits on its own: blind retry risks double-submission under a stale
//! nonce, so retry policy stays with the caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use tracing::{debug, info, instrument, warn};

use crate::chain::receipt::{DecodedLog, TxReceipt};
use crate::chain::rpc::{CallRequest, ChainRpc};
use crate::errors::TransactionError;

/// Default receipt-confirmation window, matching the chain collaborator's
/// conventional 120-second wait.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long to poll for a receipt before declaring the outcome unknown.
    pub confirmation_timeout: Duration,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// A broadcast transaction that reached a success receipt.
#[derive(Debug, Clone)]
pub struct ConfirmedTransaction {
    pub tx_hash: B256,
    pub receipt: TxReceipt,
}

/// Result of a confirmed submission, including the best-effort decoded-log
/// projection. The receipt status stays authoritative for success.
#[derive(Debug, Clone)]
pub struct TransactionResult {
    pub tx_hash: B256,
    pub receipt: TxReceipt,
    pub decoded_logs: Vec<DecodedLog>,
}

/// Builds, signs, submits and confirms contract calls.
pub struct TransactionEngine<R: ChainRpc> {
    rpc: R,
    config: EngineConfig,
    account_locks: Mutex<HashMap<Address, Arc<Mutex<()>>>>,
}

impl<R: ChainRpc> TransactionEngine<R> {
    pub fn new(rpc: R) -> Self {
        Self::with_config(rpc, EngineConfig::default())
    }

    pub fn with_config(rpc: R, config: EngineConfig) -> Self {
        Self {
            rpc,
            config,
            account_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Submit a contract call and wait for its receipt.
    ///
    /// Gas estimation runs before signing; a call the node expects to
    /// revert is surfaced as `EstimationFailed` without anything being
    /// broadcast. The signed gas limit is the estimate with a 20% margin,
    /// rounded up. Once broadcast, the transaction hash is captured
    /// immediately so every later failure carries it.
    #[instrument(level = "info", skip_all, fields(to = %to))]
    pub fn submit(
        &self,
        signer: &PrivateKeySigner,
        to: Address,
        calldata: Vec<u8>,
    ) -> Result<ConfirmedTransaction, TransactionError> {
        let from = signer.address();
        let tx_hash = {
            let lock = self.account_lock(from);
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            // Built: nonce and gas under the account lock.
            let nonce = self.rpc.transaction_count(from)?;
            let estimate = self
                .rpc
                .estimate_gas(&CallRequest {
                    from: Some(from),
                    to,
                    data: Bytes::copy_from_slice(&calldata),
                })
                .map_err(|err| TransactionError::EstimationFailed(err.to_string()))?;
            let gas_limit = gas_limit_with_margin(estimate);
            let gas_price = self.rpc.gas_price()?;
            let chain_id = self.rpc.chain_id()?;

            let mut tx = TxLegacy {
                chain_id: Some(chain_id),
                nonce,
                gas_price,
                gas_limit,
                to: TxKind::Call(to),
                value: U256::ZERO,
                input: calldata.into(),
            };
            debug!(nonce, estimate, gas_limit, "built transaction");

            // Signed: locally, the key never leaves the process.
            let signature = signer
                .sign_transaction_sync(&mut tx)
                .map_err(|err| TransactionError::Signing(err.to_string()))?;
            let envelope = TxEnvelope::Legacy(tx.into_signed(signature));
            let raw = envelope.encoded_2718();

            // Submitted: capture the hash before any confirmation wait so
            // it survives a timeout.
            let tx_hash = self.rpc.send_raw_transaction(&raw)?;
            info!(%tx_hash, "transaction broadcast");
            tx_hash
        };

        self.await_receipt(tx_hash)
    }

    /// Pending → Confirmed/Failed/TimedOut.
    fn await_receipt(&self, tx_hash: B256) -> Result<ConfirmedTransaction, TransactionError> {
        let deadline = Instant::now() + self.config.confirmation_timeout;
        loop {
            if let Some(receipt) = self.rpc.transaction_receipt(tx_hash)? {
                if receipt.is_success() {
                    info!(%tx_hash, block = ?receipt.block_number, "transaction confirmed");
                    return Ok(ConfirmedTransaction { tx_hash, receipt });
                }
                // Mined but without effect: terminal failure, distinct from
                // an unknown outcome.
                warn!(%tx_hash, status = receipt.status_code(), "transaction reverted");
                return Err(TransactionError::Reverted {
                    tx_hash,
                    status: receipt.status_code(),
                });
            }
            if Instant::now() >= deadline {
                warn!(%tx_hash, "confirmation window elapsed");
                return Err(TransactionError::ConfirmationTimeout { tx_hash });
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }

    fn account_lock(&self, account: Address) -> Arc<Mutex<()>> {
        let mut locks = self
            .account_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(account).or_default().clone()
    }
}

/// Gas limit used for signing: ceil(estimate * 1.2), never below the raw
/// estimate.
pub(crate) fn gas_limit_with_margin(estimate: u64) -> u64 {
    estimate + estimate.div_ceil(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::rpc::mock::MockRpc;
    use crate::errors::RpcError;
    use alloy::consensus::transaction::SignerRecoverable;
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::U64;

    fn signer() -> PrivateKeySigner {
        "0x4c0883a69102937d6231471b5dbb6204fe51296170827936ea5cce4b76994b0f"
            .parse()
            .unwrap()
    }

    fn success_receipt() -> TxReceipt {
        TxReceipt {
            transaction_hash: B256::ZERO,
            status: Some(U64::from(1)),
            block_number: Some(U64::from(7)),
            logs: vec![],
        }
    }

    fn fast_engine(rpc: MockRpc) -> TransactionEngine<MockRpc> {
        TransactionEngine::with_config(
            rpc,
            EngineConfig {
                confirmation_timeout: Duration::from_millis(50),
                poll_interval: Duration::from_millis(1),
            },
        )
    }

    #[test]
    fn gas_margin_is_twenty_percent_rounded_up() {
        assert_eq!(gas_limit_with_margin(100_000), 120_000);
        assert_eq!(gas_limit_with_margin(1), 2);
        assert_eq!(gas_limit_with_margin(99_999), 119_999);
        assert_eq!(gas_limit_with_margin(0), 0);
        for estimate in [1u64, 7, 100, 12_345, 1_000_000] {
            let limit = gas_limit_with_margin(estimate);
            assert!(limit >= estimate);
            assert_eq!(limit, ((estimate as u128 * 6).div_ceil(5)) as u64);
        }
    }

    #[test]
    fn happy_path_signs_with_margined_gas() {
        let rpc = MockRpc::default();
        {
            let mut state = rpc.state.lock().unwrap();
            state.gas_estimate = Ok(100_000);
            state.receipt = Some(success_receipt());
        }
        let engine = fast_engine(rpc);
        let confirmed = engine
            .submit(&signer(), Address::repeat_byte(0x42), vec![0xde, 0xad])
            .unwrap();
        assert!(confirmed.receipt.is_success());

        let state = engine.rpc().state.lock().unwrap();
        assert_eq!(state.broadcasts.len(), 1);
        let envelope = TxEnvelope::decode_2718(&mut state.broadcasts[0].as_slice()).unwrap();
        let TxEnvelope::Legacy(signed) = envelope else {
            panic!("expected a legacy transaction");
        };
        assert_eq!(signed.tx().gas_limit, 120_000);
        assert_eq!(signed.tx().chain_id, Some(31337));
        assert_eq!(signed.tx().to, TxKind::Call(Address::repeat_byte(0x42)));
        assert_eq!(signed.recover_signer().unwrap(), signer().address());
    }

    #[test]
    fn estimation_failure_precedes_signing() {
        let rpc = MockRpc::default();
        {
            let mut state = rpc.state.lock().unwrap();
            state.gas_estimate = Err(RpcError::Rpc {
                code: 3,
                message: "execution reverted".into(),
            });
        }
        let engine = fast_engine(rpc);
        let err = engine
            .submit(&signer(), Address::repeat_byte(0x42), vec![])
            .unwrap_err();
        assert!(matches!(err, TransactionError::EstimationFailed(_)));
        assert!(
            engine.rpc().state.lock().unwrap().broadcasts.is_empty(),
            "nothing may be broadcast after a failed estimate"
        );
    }

    #[test]
    fn reverted_receipt_is_a_failed_terminal_state() {
        let rpc = MockRpc::default();
        {
            let mut state = rpc.state.lock().unwrap();
            let mut receipt = success_receipt();
            receipt.status = Some(U64::from(0));
            state.receipt = Some(receipt);
        }
        let engine = fast_engine(rpc);
        let err = engine
            .submit(&signer(), Address::repeat_byte(0x42), vec![])
            .unwrap_err();
        match err {
            TransactionError::Reverted { tx_hash, status } => {
                assert_eq!(status, 0);
                assert_ne!(tx_hash, B256::ZERO, "hash must be captured at broadcast");
            }
            other => panic!("expected Reverted, got {other:?}"),
        }
    }

    #[test]
    fn missing_receipt_times_out_with_hash() {
        let rpc = MockRpc::default();
        let engine = fast_engine(rpc);
        let err = engine
            .submit(&signer(), Address::repeat_byte(0x42), vec![])
            .unwrap_err();
        match err {
            TransactionError::ConfirmationTimeout { tx_hash } => {
                assert_ne!(tx_hash, B256::ZERO);
            }
            other => panic!("expected ConfirmationTimeout, got {other:?}"),
        }
    }

    #[test]
    fn delayed_receipt_still_confirms() {
        let rpc = MockRpc::default();
        {
            let mut state = rpc.state.lock().unwrap();
            state.receipt = Some(success_receipt());
            state.receipt_delay_polls = 3;
        }
        let engine = fast_engine(rpc);
        let confirmed = engine
            .submit(&signer(), Address::repeat_byte(0x42), vec![])
            .unwrap();
        assert!(confirmed.receipt.is_success());
    }

    #[test]
    fn account_locks_are_per_address() {
        let engine = fast_engine(MockRpc::default());
        let a = engine.account_lock(Address::repeat_byte(0x01));
        let b = engine.account_lock(Address::repeat_byte(0x01));
        let c = engine.account_lock(Address::repeat_byte(0x02));
        assert!(Arc::ptr_eq(&a, &b), "same account must share one lock");
        assert!(!Arc::ptr_eq(&a, &c), "accounts must not share locks");
    }
}
