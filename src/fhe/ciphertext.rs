//! CKKS ciphertext container.
//!
//! A ciphertext is an RLWE pair (c0, c1) held in coefficient representation,
//! plus its current scale and the key-epoch digest of the context that
//! produced it. The digest is written by the encrypting party and is what
//! lets the evaluator and decryptor refuse material from a foreign
//! key-generation epoch instead of producing plausible garbage.

use crate::errors::ContextError;
use crate::fhe::params::CkksParams;
use crate::fhe::poly::RnsPoly;
use crate::fhe::serialize::{Reader, Writer};

const CIPHERTEXT_MAGIC: &[u8; 8] = b"ORFHECT1";

/// Length of the key-epoch digest embedded in contexts and ciphertexts.
pub const KEY_DIGEST_LEN: usize = 32;

/// An encrypted single-slot value.
#[derive(Debug, Clone, PartialEq)]
pub struct Ciphertext {
    pub(crate) c0: RnsPoly,
    pub(crate) c1: RnsPoly,
    /// Current scale. Δ after encryption, Δ² after a ciphertext product.
    pub scale: f64,
    /// Digest of the key-generation epoch this ciphertext belongs to.
    pub key_digest: [u8; KEY_DIGEST_LEN],
}

impl Ciphertext {
    /// Serialize to the flat binary framing.
    pub fn to_bytes(&self, params: &CkksParams) -> Vec<u8> {
        let mut w = Writer::new(CIPHERTEXT_MAGIC);
        w.put_params(params);
        w.put_f64(self.scale);
        w.put_bytes(&self.key_digest);
        w.put_poly(&self.c0);
        w.put_poly(&self.c1);
        w.finish()
    }

    /// Deserialize, checking framing, parameter header and coefficient
    /// ranges.
    pub fn from_bytes(bytes: &[u8], params: &CkksParams) -> Result<Self, ContextError> {
        let mut r = Reader::open(bytes, CIPHERTEXT_MAGIC)?;
        r.take_params(params)?;
        let scale = r.take_f64()?;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ContextError::Corrupt("non-positive ciphertext scale".into()));
        }
        let key_digest = r.take_array::<KEY_DIGEST_LEN>()?;
        let c0 = r.take_poly(params)?;
        let c1 = r.take_poly(params)?;
        r.expect_end()?;
        Ok(Self {
            c0,
            c1,
            scale,
            key_digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhe::params::SCALE;

    fn dummy_ciphertext(params: &CkksParams) -> Ciphertext {
        let mut c0 = RnsPoly::zero(params.poly_degree, params.num_limbs());
        let mut c1 = RnsPoly::zero(params.poly_degree, params.num_limbs());
        for (l, m) in params.moduli.iter().enumerate() {
            for i in 0..params.poly_degree {
                c0.limbs[l][i] = (i as u64 * 37 + 11) % m.value;
                c1.limbs[l][i] = (i as u64 * 53 + 29) % m.value;
            }
        }
        Ciphertext {
            c0,
            c1,
            scale: SCALE,
            key_digest: [7u8; KEY_DIGEST_LEN],
        }
    }

    #[test]
    fn serialization_roundtrip() {
        let params = CkksParams::standard();
        let ct = dummy_ciphertext(&params);
        let bytes = ct.to_bytes(&params);
        let back = Ciphertext::from_bytes(&bytes, &params).unwrap();
        assert_eq!(ct, back);
    }

    #[test]
    fn truncated_blob_is_corrupt() {
        let params = CkksParams::standard();
        let ct = dummy_ciphertext(&params);
        let mut bytes = ct.to_bytes(&params);
        bytes.truncate(bytes.len() / 2);
        assert!(matches!(
            Ciphertext::from_bytes(&bytes, &params),
            Err(ContextError::Corrupt(_))
        ));
    }

    #[test]
    fn trailing_bytes_are_corrupt() {
        let params = CkksParams::standard();
        let ct = dummy_ciphertext(&params);
        let mut bytes = ct.to_bytes(&params);
        bytes.push(0);
        assert!(matches!(
            Ciphertext::from_bytes(&bytes, &params),
            Err(ContextError::Corrupt(_))
        ));
    }
}
