//! Orion contract surface: ABI bindings, calldata builders, the on-chain
//! configuration reader and the submission flows.
//!
//! The encrypted vault's `submitEncryptedOrderIntent` shape is this crate's
//! definition of the (not yet deployed) encrypted-intent call: one opaque
//! ciphertext blob per asset so the contract can address ciphertexts
//! per-asset, plus the input proof.

use std::collections::BTreeSet;

use alloy::primitives::{Address, Bytes, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};
use tracing::{debug, instrument};

use crate::chain::engine::{TransactionEngine, TransactionResult};
use crate::chain::receipt::{decode_receipt_logs, EventShape, LogValue};
use crate::chain::rpc::{CallRequest, ChainRpc};
use crate::errors::{RpcError, TransactionError};
use crate::intent::{EncryptedOrderIntent, OrderIntent, WhitelistSnapshot};

sol! {
    struct OrderItem {
        address token;
        uint256 amount;
    }

    struct EncryptedOrderItem {
        address token;
        bytes ciphertext;
    }

    interface IOrionConfig {
        function whitelistedAssetsLength() external view returns (uint256);
        function getWhitelistedAssetAt(uint256 index) external view returns (address);
        function isWhitelisted(address token) external view returns (bool);
        function curatorIntentDecimals() external view returns (uint8);
        function fhePublicCID() external view returns (string memory);
    }

    interface IOrionTransparentVault {
        function submitOrderIntent(OrderItem[] calldata items) external;
    }

    interface IOrionEncryptedVault {
        function submitEncryptedOrderIntent(
            EncryptedOrderItem[] calldata items,
            bytes calldata inputProof
        ) external;
    }

    interface IOrionVaultFactory {
        function createOrionTransparentVault(
            address curator,
            string calldata name,
            string calldata symbol,
            uint8 feeType,
            uint16 performanceFee,
            uint16 managementFee
        ) external returns (address);

        function createOrionEncryptedVault(
            address curator,
            string calldata name,
            string calldata symbol,
            uint8 feeType,
            uint16 performanceFee,
            uint16 managementFee
        ) external returns (address);
    }

    event OrionVaultCreated(address indexed vault, address indexed curator, uint8 vaultType);

    event OrderIntentSubmitted(address indexed vault, address indexed curator);
}

/// Which vault flavor a factory call should deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultKind {
    Transparent,
    Encrypted,
}

/// Fee schedule flavor, mirrored from the factory contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeType {
    Flat,
    HighWaterMark,
}

impl FeeType {
    fn as_u8(self) -> u8 {
        match self {
            FeeType::Flat => 0,
            FeeType::HighWaterMark => 1,
        }
    }
}

/// Arguments for a vault deployment.
#[derive(Debug, Clone)]
pub struct VaultDeployment {
    pub curator: Address,
    pub name: String,
    pub symbol: String,
    pub fee_type: FeeType,
    pub performance_fee_bps: u16,
    pub management_fee_bps: u16,
}

/// Event shapes the factory declares, in declaration order.
pub fn factory_event_shapes() -> Vec<EventShape> {
    vec![EventShape {
        name: "OrionVaultCreated",
        decode: |data| {
            let event = OrionVaultCreated::decode_log_data(data).ok()?;
            Some(vec![
                ("vault".into(), LogValue::Address(event.vault)),
                ("curator".into(), LogValue::Address(event.curator)),
                ("vaultType".into(), LogValue::Uint(U256::from(event.vaultType))),
            ])
        },
    }]
}

/// Event shapes the vaults declare, in declaration order.
pub fn vault_event_shapes() -> Vec<EventShape> {
    vec![EventShape {
        name: "OrderIntentSubmitted",
        decode: |data| {
            let event = OrderIntentSubmitted::decode_log_data(data).ok()?;
            Some(vec![
                ("vault".into(), LogValue::Address(event.vault)),
                ("curator".into(), LogValue::Address(event.curator)),
            ])
        },
    }]
}

/// Calldata for the transparent vault's plain submission.
pub fn submit_order_intent_calldata(intent: &OrderIntent) -> Vec<u8> {
    let items: Vec<OrderItem> = intent
        .items
        .iter()
        .map(|(&token, &amount)| OrderItem {
            token,
            amount: U256::from(amount),
        })
        .collect();
    IOrionTransparentVault::submitOrderIntentCall { items }.abi_encode()
}

/// Calldata for the encrypted vault's submission.
pub fn submit_encrypted_order_intent_calldata(intent: &EncryptedOrderIntent) -> Vec<u8> {
    let items: Vec<EncryptedOrderItem> = intent
        .items
        .iter()
        .map(|(&token, blob)| EncryptedOrderItem {
            token,
            ciphertext: Bytes::from(blob.clone()),
        })
        .collect();
    IOrionEncryptedVault::submitEncryptedOrderIntentCall {
        items,
        inputProof: Bytes::from(intent.input_proof.clone()),
    }
    .abi_encode()
}

/// Calldata for a factory deployment.
pub fn create_vault_calldata(kind: VaultKind, deployment: &VaultDeployment) -> Vec<u8> {
    match kind {
        VaultKind::Transparent => IOrionVaultFactory::createOrionTransparentVaultCall {
            curator: deployment.curator,
            name: deployment.name.clone(),
            symbol: deployment.symbol.clone(),
            feeType: deployment.fee_type.as_u8(),
            performanceFee: deployment.performance_fee_bps,
            managementFee: deployment.management_fee_bps,
        }
        .abi_encode(),
        VaultKind::Encrypted => IOrionVaultFactory::createOrionEncryptedVaultCall {
            curator: deployment.curator,
            name: deployment.name.clone(),
            symbol: deployment.symbol.clone(),
            feeType: deployment.fee_type.as_u8(),
            performanceFee: deployment.performance_fee_bps,
            managementFee: deployment.management_fee_bps,
        }
        .abi_encode(),
    }
}

/// Read-only view of the OrionConfig contract. Values are authoritative at
/// call time only; nothing is cached across calls.
pub struct OrionConfigReader<'a, R: ChainRpc> {
    rpc: &'a R,
    pub address: Address,
}

impl<'a, R: ChainRpc> OrionConfigReader<'a, R> {
    pub fn new(rpc: &'a R, address: Address) -> Self {
        Self { rpc, address }
    }

    fn call<C: SolCall>(&self, call: C) -> Result<C::Return, RpcError> {
        let data = self.rpc.call(&CallRequest {
            from: None,
            to: self.address,
            data: Bytes::from(call.abi_encode()),
        })?;
        C::abi_decode_returns(&data)
            .map_err(|err| RpcError::InvalidResponse(format!("{}: {err}", C::SIGNATURE)))
    }

    /// Enumerate the whitelisted asset set.
    pub fn whitelisted_assets(&self) -> Result<BTreeSet<Address>, RpcError> {
        let length = self.call(IOrionConfig::whitelistedAssetsLengthCall {})?;
        let mut assets = BTreeSet::new();
        let count = length.to::<u64>();
        for index in 0..count {
            let asset = self.call(IOrionConfig::getWhitelistedAssetAtCall {
                index: U256::from(index),
            })?;
            assets.insert(asset);
        }
        Ok(assets)
    }

    pub fn is_whitelisted(&self, token: Address) -> Result<bool, RpcError> {
        self.call(IOrionConfig::isWhitelistedCall { token })
    }

    pub fn curator_intent_decimals(&self) -> Result<u8, RpcError> {
        self.call(IOrionConfig::curatorIntentDecimalsCall {})
    }

    /// Content identifier of the published public encryption context.
    pub fn fhe_public_cid(&self) -> Result<String, RpcError> {
        self.call(IOrionConfig::fhePublicCIDCall {})
    }

    /// One coherent snapshot for a validation run.
    pub fn whitelist_snapshot(&self) -> Result<WhitelistSnapshot, RpcError> {
        let assets = self.whitelisted_assets()?;
        let intent_decimals = self.curator_intent_decimals()?;
        debug!(assets = assets.len(), intent_decimals, "fetched whitelist snapshot");
        Ok(WhitelistSnapshot {
            assets,
            intent_decimals,
        })
    }
}

/// Deploy a vault through the factory and decode its creation events.
#[instrument(level = "info", skip_all, fields(?kind, factory = %factory))]
pub fn deploy_vault<R: ChainRpc>(
    engine: &TransactionEngine<R>,
    signer: &PrivateKeySigner,
    factory: Address,
    kind: VaultKind,
    deployment: &VaultDeployment,
) -> Result<TransactionResult, TransactionError> {
    let calldata = create_vault_calldata(kind, deployment);
    let confirmed = engine.submit(signer, factory, calldata)?;
    let decoded_logs = decode_receipt_logs(&confirmed.receipt, factory, &factory_event_shapes());
    Ok(TransactionResult {
        tx_hash: confirmed.tx_hash,
        receipt: confirmed.receipt,
        decoded_logs,
    })
}

/// Submit a plain order intent to a transparent vault.
#[instrument(level = "info", skip_all, fields(vault = %vault, assets = intent.len()))]
pub fn submit_order_intent<R: ChainRpc>(
    engine: &TransactionEngine<R>,
    signer: &PrivateKeySigner,
    vault: Address,
    intent: &OrderIntent,
) -> Result<TransactionResult, TransactionError> {
    let calldata = submit_order_intent_calldata(intent);
    let confirmed = engine.submit(signer, vault, calldata)?;
    let decoded_logs = decode_receipt_logs(&confirmed.receipt, vault, &vault_event_shapes());
    Ok(TransactionResult {
        tx_hash: confirmed.tx_hash,
        receipt: confirmed.receipt,
        decoded_logs,
    })
}

/// Submit an encrypted order intent (ciphertexts + input proof) to an
/// encrypted vault.
#[instrument(level = "info", skip_all, fields(vault = %vault, assets = intent.items.len()))]
pub fn submit_encrypted_order_intent<R: ChainRpc>(
    engine: &TransactionEngine<R>,
    signer: &PrivateKeySigner,
    vault: Address,
    intent: &EncryptedOrderIntent,
) -> Result<TransactionResult, TransactionError> {
    let calldata = submit_encrypted_order_intent_calldata(intent);
    let confirmed = engine.submit(signer, vault, calldata)?;
    let decoded_logs = decode_receipt_logs(&confirmed.receipt, vault, &vault_event_shapes());
    Ok(TransactionResult {
        tx_hash: confirmed.tx_hash,
        receipt: confirmed.receipt,
        decoded_logs,
    })
}
