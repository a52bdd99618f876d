//! Encryption context lifecycle.
//!
//! A key-generation epoch produces one [`EncryptionContext`] that splits
//! into a [`PublicContext`] (RLWE public key plus relinearization and
//! rotation key-switching keys, safe to distribute) and a
//! [`SecretContext`] (the secret polynomial, which never leaves the decryptor's
//! trust boundary). Both halves carry a blake3 key-epoch digest computed
//! over the parameter header and public-key polynomials; ciphertexts embed
//! the same digest, which is how cross-epoch material is rejected.
//!
//! Persistence is flat binary framing per half. NTT tables are derived
//! state and are rebuilt on load rather than serialized.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, instrument};

use crate::errors::ContextError;
use crate::fhe::ciphertext::KEY_DIGEST_LEN;
use crate::fhe::ntt::{forward_poly, inverse_poly, ntt_forward, NttTables};
use crate::fhe::params::{CkksParams, DECOMP_LOG_BASE};
use crate::fhe::poly::{mod_add, mod_mul, RnsPoly};
use crate::fhe::sampling::{sample_error, sample_ternary, sample_uniform_poly};
use crate::fhe::serialize::{Reader, Writer};
use crate::keystore::{ContextStore, PUBLIC_CONTEXT_SLOT, SECRET_CONTEXT_SLOT};

const PUBLIC_MAGIC: &[u8; 8] = b"ORFHEPB1";
const SECRET_MAGIC: &[u8; 8] = b"ORFHESC1";

/// A key-switching key: one (b, a) row per decomposition digit of each RNS
/// limb, all rows held in the NTT domain.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySwitchKey {
    rows: Vec<(RnsPoly, RnsPoly)>,
}

/// A Galois rotation key for a fixed slot step.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationKey {
    pub steps: i32,
    pub(crate) galois_element: usize,
    pub(crate) key: KeySwitchKey,
}

/// Shareable half of a key-generation epoch.
#[derive(Debug, Clone)]
pub struct PublicContext {
    pub(crate) params: CkksParams,
    pub(crate) tables: Vec<NttTables>,
    pub(crate) pk_b: RnsPoly,
    pub(crate) pk_a: RnsPoly,
    pub(crate) relin_key: Option<KeySwitchKey>,
    pub(crate) rotation_keys: BTreeMap<i32, RotationKey>,
    pub(crate) key_digest: [u8; KEY_DIGEST_LEN],
}

/// Decryptor-only half of a key-generation epoch.
#[derive(Debug, Clone)]
pub struct SecretContext {
    pub(crate) params: CkksParams,
    pub(crate) tables: Vec<NttTables>,
    pub(crate) secret: RnsPoly,
    pub(crate) secret_ntt: RnsPoly,
    pub(crate) key_digest: [u8; KEY_DIGEST_LEN],
}

/// A freshly generated key-generation epoch, before the halves are handed
/// to their respective roles.
#[derive(Debug, Clone)]
pub struct EncryptionContext {
    pub public: PublicContext,
    pub secret: SecretContext,
}

impl EncryptionContext {
    /// Generate a fresh context under the fixed scheme parameters.
    ///
    /// Relinearization and rotation (slot step 1) key-switching keys are
    /// generated eagerly so the public half is self-sufficient for the
    /// evaluator's operations.
    #[instrument(level = "info", skip_all)]
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let params = CkksParams::standard();
        let tables = build_tables(&params);
        let n = params.poly_degree;

        let secret = RnsPoly::from_signed(&sample_ternary(rng, n), &params.moduli);
        let mut secret_ntt = secret.clone();
        forward_poly(&mut secret_ntt, &tables);

        // pk = (b, a) with b = -a·s + e
        let pk_a = sample_uniform_poly(rng, n, &params.moduli);
        let mut e = RnsPoly::from_signed(&sample_error(rng, n), &params.moduli);
        forward_poly(&mut e, &tables);
        let pk_b = pk_a
            .hadamard(&secret_ntt, &params.moduli)
            .negate(&params.moduli)
            .add(&e, &params.moduli);

        let key_digest = key_epoch_digest(&params, &pk_b, &pk_a);

        // Relinearization key switches s² back to s.
        let s_sq_ntt = secret_ntt.hadamard(&secret_ntt, &params.moduli);
        let mut s_sq = s_sq_ntt;
        inverse_poly(&mut s_sq, &tables);
        let relin_key = generate_keyswitch_key(rng, &s_sq, &secret_ntt, &params, &tables);

        // Rotation key for slot step 1: switches s(X^g) back to s.
        let steps = 1i32;
        let galois_element = galois_element_for_step(steps, n);
        let s_rot = secret.automorphism(galois_element, &params.moduli);
        let rot_key = RotationKey {
            steps,
            galois_element,
            key: generate_keyswitch_key(rng, &s_rot, &secret_ntt, &params, &tables),
        };
        let mut rotation_keys = BTreeMap::new();
        rotation_keys.insert(steps, rot_key);

        debug!(
            rows = params.total_digits(),
            "generated encryption context"
        );

        Self {
            public: PublicContext {
                params: params.clone(),
                tables: tables.clone(),
                pk_b,
                pk_a,
                relin_key: Some(relin_key),
                rotation_keys,
                key_digest,
            },
            secret: SecretContext {
                params,
                tables,
                secret,
                secret_ntt,
                key_digest,
            },
        }
    }

    /// Split into the two role-bound halves.
    pub fn into_halves(self) -> (PublicContext, SecretContext) {
        (self.public, self.secret)
    }
}

impl PublicContext {
    pub fn params(&self) -> &CkksParams {
        &self.params
    }

    pub fn key_digest(&self) -> [u8; KEY_DIGEST_LEN] {
        self.key_digest
    }

    pub fn has_relinearization_key(&self) -> bool {
        self.relin_key.is_some()
    }

    pub fn rotation_steps(&self) -> Vec<i32> {
        self.rotation_keys.keys().copied().collect()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new(PUBLIC_MAGIC);
        w.put_params(&self.params);
        w.put_bytes(&self.key_digest);
        w.put_poly(&self.pk_b);
        w.put_poly(&self.pk_a);
        match &self.relin_key {
            Some(key) => {
                w.put_u8(1);
                write_keyswitch_key(&mut w, key);
            }
            None => w.put_u8(0),
        }
        w.put_u16(self.rotation_keys.len() as u16);
        for rot in self.rotation_keys.values() {
            w.put_i32(rot.steps);
            w.put_u32(rot.galois_element as u32);
            write_keyswitch_key(&mut w, &rot.key);
        }
        w.finish()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContextError> {
        let expected = CkksParams::standard();
        let mut r = Reader::open(bytes, PUBLIC_MAGIC)?;
        let params = r.take_params(&expected)?;
        let key_digest = r.take_array::<KEY_DIGEST_LEN>()?;
        let pk_b = r.take_poly(&params)?;
        let pk_a = r.take_poly(&params)?;
        let relin_key = match r.take_u8()? {
            0 => None,
            1 => Some(read_keyswitch_key(&mut r, &params)?),
            other => {
                return Err(ContextError::Corrupt(format!(
                    "invalid relinearization marker {other}"
                )))
            }
        };
        let rot_count = r.take_u16()?;
        let mut rotation_keys = BTreeMap::new();
        for _ in 0..rot_count {
            let steps = r.take_i32()?;
            let galois_element = r.take_u32()? as usize;
            if galois_element % 2 == 0 || galois_element >= 2 * params.poly_degree {
                return Err(ContextError::Corrupt(format!(
                    "invalid galois element {galois_element}"
                )));
            }
            let key = read_keyswitch_key(&mut r, &params)?;
            rotation_keys.insert(steps, RotationKey {
                steps,
                galois_element,
                key,
            });
        }
        r.expect_end()?;
        let digest_check = key_epoch_digest(&params, &pk_b, &pk_a);
        if digest_check != key_digest {
            return Err(ContextError::Corrupt(
                "key-epoch digest does not match public key material".into(),
            ));
        }
        let tables = build_tables(&params);
        Ok(Self {
            params,
            tables,
            pk_b,
            pk_a,
            relin_key,
            rotation_keys,
            key_digest,
        })
    }

    /// Persist into the "public context" slot of a storage collaborator.
    pub fn save(&self, store: &dyn ContextStore) -> Result<(), ContextError> {
        store.put(PUBLIC_CONTEXT_SLOT, &self.to_bytes())
    }

    /// Load from the "public context" slot of a storage collaborator.
    pub fn load(store: &dyn ContextStore) -> Result<Self, ContextError> {
        Self::from_bytes(&store.get(PUBLIC_CONTEXT_SLOT)?)
    }
}

impl SecretContext {
    pub fn params(&self) -> &CkksParams {
        &self.params
    }

    pub fn key_digest(&self) -> [u8; KEY_DIGEST_LEN] {
        self.key_digest
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new(SECRET_MAGIC);
        w.put_params(&self.params);
        w.put_bytes(&self.key_digest);
        w.put_poly(&self.secret);
        w.finish()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContextError> {
        let expected = CkksParams::standard();
        let mut r = Reader::open(bytes, SECRET_MAGIC)?;
        let params = r.take_params(&expected)?;
        let key_digest = r.take_array::<KEY_DIGEST_LEN>()?;
        let secret = r.take_poly(&params)?;
        r.expect_end()?;
        let tables = build_tables(&params);
        let mut secret_ntt = secret.clone();
        forward_poly(&mut secret_ntt, &tables);
        Ok(Self {
            params,
            tables,
            secret,
            secret_ntt,
            key_digest,
        })
    }

    /// Persist into the "secret context" slot of a storage collaborator.
    ///
    /// The slot must live where only the decryptor role can read it; the
    /// encryptor and evaluator never need this half.
    pub fn save(&self, store: &dyn ContextStore) -> Result<(), ContextError> {
        store.put(SECRET_CONTEXT_SLOT, &self.to_bytes())
    }

    /// Load from the "secret context" slot of a storage collaborator.
    pub fn load(store: &dyn ContextStore) -> Result<Self, ContextError> {
        Self::from_bytes(&store.get(SECRET_CONTEXT_SLOT)?)
    }
}

pub(crate) fn build_tables(params: &CkksParams) -> Vec<NttTables> {
    params
        .moduli
        .iter()
        .map(|m| NttTables::new(params.poly_degree, m.value))
        .collect()
}

/// Galois element for rotating by `steps` slots: 5^steps mod 2N.
pub(crate) fn galois_element_for_step(steps: i32, n: usize) -> usize {
    let two_n = 2 * n;
    let mut g = 1usize;
    let base = if steps >= 0 {
        5usize
    } else {
        // 5^{-1} mod 2N exists since 5 is odd.
        mod_inverse_usize(5, two_n)
    };
    for _ in 0..steps.unsigned_abs() {
        g = (g * base) % two_n;
    }
    g
}

fn mod_inverse_usize(a: usize, m: usize) -> usize {
    // Euler: a^{φ(2N)-1}; 2N is a power of two so φ(2N) = N.
    let mut result = 1usize;
    let mut base = a % m;
    let mut exp = m / 2 - 1;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.wrapping_mul(base) % m;
        }
        exp >>= 1;
        base = base.wrapping_mul(base) % m;
    }
    result
}

fn key_epoch_digest(
    params: &CkksParams,
    pk_b: &RnsPoly,
    pk_a: &RnsPoly,
) -> [u8; KEY_DIGEST_LEN] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(params.poly_degree as u64).to_le_bytes());
    for m in &params.moduli {
        hasher.update(&m.value.to_le_bytes());
    }
    hasher.update(&params.scale_bits.to_le_bytes());
    for poly in [pk_b, pk_a] {
        for limb in &poly.limbs {
            for c in limb {
                hasher.update(&c.to_le_bytes());
            }
        }
    }
    *hasher.finalize().as_bytes()
}

/// Generate a key-switching key from `source` (the secret the material is
/// currently under, coefficient domain) to the context secret `s_ntt`.
///
/// Row (l, t) encrypts B^t · source restricted to limb l, where B is the
/// decomposition base. The CRT basis element for limb l is 1 mod q_l and
/// 0 mod every other prime, so the injected term lives in a single limb.
fn generate_keyswitch_key<R: Rng>(
    rng: &mut R,
    source: &RnsPoly,
    s_ntt: &RnsPoly,
    params: &CkksParams,
    tables: &[NttTables],
) -> KeySwitchKey {
    let n = params.poly_degree;
    let mut rows = Vec::with_capacity(params.total_digits());
    for (l, m) in params.moduli.iter().enumerate() {
        for t in 0..params.digit_count(l) {
            let a = sample_uniform_poly(rng, n, &params.moduli);
            let mut e = RnsPoly::from_signed(&sample_error(rng, n), &params.moduli);
            forward_poly(&mut e, tables);
            let mut b = a
                .hadamard(s_ntt, &params.moduli)
                .negate(&params.moduli)
                .add(&e, &params.moduli);

            let factor = ((1u128 << (DECOMP_LOG_BASE * t as u32)) % m.value as u128) as u64;
            let mut injected: Vec<u64> = source.limbs[l]
                .iter()
                .map(|&c| mod_mul(c, factor, m.value))
                .collect();
            ntt_forward(&mut injected, &tables[l]);
            for i in 0..n {
                b.limbs[l][i] = mod_add(b.limbs[l][i], injected[i], m.value);
            }

            rows.push((b, a));
        }
    }
    KeySwitchKey { rows }
}

/// Switch `input` (coefficient domain, encrypted under the key-switching
/// key's source secret) to the context secret. Returns the (c0, c1)
/// contribution in coefficient domain.
pub(crate) fn keyswitch(
    input: &RnsPoly,
    key: &KeySwitchKey,
    params: &CkksParams,
    tables: &[NttTables],
) -> (RnsPoly, RnsPoly) {
    let n = params.poly_degree;
    let num_limbs = params.num_limbs();
    let mask = (1u64 << DECOMP_LOG_BASE) - 1;

    let mut acc0 = RnsPoly::zero(n, num_limbs);
    let mut acc1 = RnsPoly::zero(n, num_limbs);
    let mut row = 0usize;
    for l in 0..num_limbs {
        for t in 0..params.digit_count(l) {
            let shift = DECOMP_LOG_BASE * t as u32;
            let digits: Vec<u64> = input.limbs[l]
                .iter()
                .map(|&c| (c >> shift) & mask)
                .collect();
            // Digits are below the base, so they lift verbatim into every limb.
            let mut digit_poly = RnsPoly::zero(n, num_limbs);
            for limb in 0..num_limbs {
                digit_poly.limbs[limb].copy_from_slice(&digits);
                ntt_forward(&mut digit_poly.limbs[limb], &tables[limb]);
            }
            let (b, a) = &key.rows[row];
            acc0.add_assign(&digit_poly.hadamard(b, &params.moduli), &params.moduli);
            acc1.add_assign(&digit_poly.hadamard(a, &params.moduli), &params.moduli);
            row += 1;
        }
    }
    inverse_poly(&mut acc0, tables);
    inverse_poly(&mut acc1, tables);
    (acc0, acc1)
}

fn write_keyswitch_key(w: &mut Writer, key: &KeySwitchKey) {
    w.put_u32(key.rows.len() as u32);
    for (b, a) in &key.rows {
        w.put_poly(b);
        w.put_poly(a);
    }
}

fn read_keyswitch_key(r: &mut Reader<'_>, params: &CkksParams) -> Result<KeySwitchKey, ContextError> {
    let count = r.take_u32()? as usize;
    if count != params.total_digits() {
        return Err(ContextError::Corrupt(format!(
            "key-switching key has {count} rows, expected {}",
            params.total_digits()
        )));
    }
    let mut rows = Vec::with_capacity(count);
    for _ in 0..count {
        let b = r.take_poly(params)?;
        let a = r.take_poly(params)?;
        rows.push((b, a));
    }
    Ok(KeySwitchKey { rows })
}
