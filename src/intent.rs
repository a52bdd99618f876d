//! Order intents: validation, input shaping and encrypted assembly.
//!
//! A curator's raw asset → amount mapping is checked against the current
//! whitelist and canonicalized to checksummed addresses before anything
//! touches the network. Amounts are integers at the protocol's fixed
//! decimal precision, never floating point, so they survive the
//! encryption boundary without drift.

use std::collections::{BTreeMap, BTreeSet};

use alloy::primitives::Address;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::errors::{RpcError, ValidationError};
use crate::fhe::ciphertext::Ciphertext;
use crate::fhe::params::CkksParams;

/// A validated intent: canonical checksummed asset addresses mapped to
/// non-negative integer amounts. Owned by the submitting call and discarded
/// once the transaction is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderIntent {
    pub items: BTreeMap<Address, u128>,
}

impl OrderIntent {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Point-in-time read of the configuration collaborator. Fetched fresh per
/// validation; the whitelist may change between two submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistSnapshot {
    pub assets: BTreeSet<Address>,
    /// Protocol-fixed number of decimal places for intent amounts.
    pub intent_decimals: u8,
}

/// Deterministic value perturbation for test runs. Only amounts change,
/// never which assets are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzConfig {
    pub seed: u64,
}

/// Checks raw mappings against protocol constraints and produces canonical
/// [`OrderIntent`]s.
#[derive(Debug, Clone)]
pub struct IntentValidator {
    snapshot: WhitelistSnapshot,
    fuzz: Option<FuzzConfig>,
}

impl IntentValidator {
    pub fn new(snapshot: WhitelistSnapshot) -> Self {
        Self {
            snapshot,
            fuzz: None,
        }
    }

    /// Enable seeded fuzzing of amounts.
    pub fn with_fuzz(mut self, fuzz: FuzzConfig) -> Self {
        self.fuzz = Some(fuzz);
        self
    }

    /// Validate a raw asset → amount mapping.
    ///
    /// Every key must parse as an address and be whitelisted; every amount
    /// must be non-negative. The first violation aborts the whole
    /// validation; an intent is never partially accepted.
    pub fn validate(
        &self,
        raw: &BTreeMap<String, i128>,
    ) -> Result<OrderIntent, ValidationError> {
        let mut items = BTreeMap::new();
        for (key, &amount) in raw {
            let asset: Address = key
                .parse()
                .map_err(|_| ValidationError::MalformedAddress(key.clone()))?;
            if !self.snapshot.assets.contains(&asset) {
                return Err(ValidationError::NotWhitelisted(format!("{asset:#x}")));
            }
            if amount < 0 {
                return Err(ValidationError::NegativeAmount {
                    asset: format!("{asset:#x}"),
                    amount,
                });
            }
            items.insert(asset, amount as u128);
        }

        let mut intent = OrderIntent { items };
        if let Some(fuzz) = self.fuzz {
            perturb_amounts(&mut intent, fuzz.seed);
        }
        debug!(
            assets = intent.len(),
            decimals = self.snapshot.intent_decimals,
            "validated order intent"
        );
        Ok(intent)
    }
}

/// Perturb each amount by a small bounded delta (at most 1% of the amount,
/// minimum 1), clamped at zero. Seeded, so a given seed reproduces the same
/// perturbation; membership is untouched.
fn perturb_amounts(intent: &mut OrderIntent, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for amount in intent.items.values_mut() {
        let bound = (*amount / 100).max(1);
        let delta = rng.gen_range(0..=bound);
        if rng.gen_bool(0.5) {
            *amount = amount.saturating_add(delta);
        } else {
            *amount = amount.saturating_sub(delta);
        }
    }
}

/// Parse an explicit JSON object intent file: asset string → integer
/// amount. Fractional amounts are rejected outright.
pub fn order_intent_from_json(text: &str) -> Result<BTreeMap<String, i128>, ValidationError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|err| ValidationError::MalformedInput(format!("intent JSON: {err}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::MalformedInput("intent must be a JSON object".into()))?;
    let mut raw = BTreeMap::new();
    for (key, amount) in object {
        let amount = amount.as_i64().ok_or_else(|| {
            ValidationError::MalformedInput(format!("amount for {key} is not an integer"))
        })?;
        raw.insert(key.clone(), amount as i128);
    }
    Ok(raw)
}

/// Shape a columnar portfolio table into a raw intent mapping: the last row
/// with any non-zero amount, with column names lower-cased and a fixed
/// `_amount` suffix stripped.
pub fn order_intent_from_table(text: &str) -> Result<BTreeMap<String, i128>, ValidationError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| ValidationError::MalformedInput("empty portfolio table".into()))?;
    let columns: Vec<String> = header
        .split(',')
        .map(|c| {
            c.trim()
                .to_lowercase()
                .trim_end_matches("_amount")
                .to_string()
        })
        .collect();

    let mut selected: Option<Vec<i128>> = None;
    for line in lines {
        let row = line
            .split(',')
            .map(|cell| {
                cell.trim().parse::<i128>().map_err(|_| {
                    ValidationError::MalformedInput(format!("non-integer amount {:?}", cell.trim()))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if row.len() != columns.len() {
            return Err(ValidationError::MalformedInput(format!(
                "row has {} cells, header has {}",
                row.len(),
                columns.len()
            )));
        }
        if row.iter().any(|&v| v != 0) {
            selected = Some(row);
        }
    }

    let row = selected
        .ok_or_else(|| ValidationError::MalformedInput("no non-zero portfolio row".into()))?;
    Ok(columns.into_iter().zip(row).collect())
}

/// External proving collaborator: attests that a set of ciphertexts binds
/// the submitting curator to the target vault.
pub trait InputProver {
    fn prove(
        &self,
        curator: Address,
        vault: Address,
        ciphertexts: &BTreeMap<Address, Vec<u8>>,
    ) -> Result<Vec<u8>, RpcError>;
}

/// Deterministic digest-based attestation standing in for the external
/// proving service: blake3 over curator ‖ vault ‖ per-asset ciphertext
/// digests.
#[derive(Debug, Clone, Default)]
pub struct LocalProver;

impl InputProver for LocalProver {
    fn prove(
        &self,
        curator: Address,
        vault: Address,
        ciphertexts: &BTreeMap<Address, Vec<u8>>,
    ) -> Result<Vec<u8>, RpcError> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(curator.as_slice());
        hasher.update(vault.as_slice());
        for (asset, blob) in ciphertexts {
            hasher.update(asset.as_slice());
            hasher.update(blake3::hash(blob).as_bytes());
        }
        Ok(hasher.finalize().as_bytes().to_vec())
    }
}

/// An intent ready for encrypted submission: one opaque ciphertext blob per
/// asset plus the input proof binding them to the curator and vault.
/// Created once per submission and never reused; resubmission re-encrypts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedOrderIntent {
    pub items: BTreeMap<Address, Vec<u8>>,
    pub input_proof: Vec<u8>,
}

impl EncryptedOrderIntent {
    /// Serialize per-asset ciphertexts and obtain the input proof from the
    /// proving collaborator.
    pub fn seal(
        encrypted: &BTreeMap<Address, Ciphertext>,
        params: &CkksParams,
        prover: &dyn InputProver,
        curator: Address,
        vault: Address,
    ) -> Result<Self, RpcError> {
        let items: BTreeMap<Address, Vec<u8>> = encrypted
            .iter()
            .map(|(&asset, ct)| (asset, ct.to_bytes(params)))
            .collect();
        let input_proof = prover.prove(curator, vault, &items)?;
        Ok(Self { items, input_proof })
    }
}
