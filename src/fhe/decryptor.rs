//! Decryptor role.
//!
//! The only component permitted to hold secret key material. Epoch
//! mismatches are detected from the digest the encrypting party embedded in
//! the ciphertext, never from caller-supplied call-site metadata, so a
//! ciphertext from a foreign key generation fails loudly instead of
//! decrypting to plausible garbage.

use tracing::debug;

use crate::errors::DecryptionError;
use crate::fhe::ciphertext::Ciphertext;
use crate::fhe::context::SecretContext;
use crate::fhe::encoding::decode_scalar;
use crate::fhe::ntt::mul_coeff_by_ntt;

/// Decryptor role: reconstructs plaintext amounts under the secret context.
pub struct IntentDecryptor<'a> {
    secret: &'a SecretContext,
}

impl<'a> IntentDecryptor<'a> {
    pub fn new(secret: &'a SecretContext) -> Self {
        Self { secret }
    }

    /// Decrypt to the scheme's approximate real value.
    pub fn decrypt(&self, ct: &Ciphertext) -> Result<f64, DecryptionError> {
        let params = &self.secret.params;
        if ct.c0.n != params.poly_degree || ct.c0.limbs.len() != params.num_limbs() {
            return Err(DecryptionError::IncompatibleParameters(format!(
                "ciphertext shape {}x{} does not fit the context",
                ct.c0.limbs.len(),
                ct.c0.n
            )));
        }
        if ct.key_digest != self.secret.key_digest {
            return Err(DecryptionError::ContextMismatch);
        }

        let c1_s = mul_coeff_by_ntt(
            &ct.c1,
            &self.secret.secret_ntt,
            &params.moduli,
            &self.secret.tables,
        );
        let plain = ct.c0.add(&c1_s, &params.moduli);
        let value = decode_scalar(&plain, params, ct.scale);
        debug!(value, "decrypted ciphertext");
        Ok(value)
    }

    /// Decrypt and round to the nearest non-negative integer amount.
    pub fn decrypt_amount(&self, ct: &Ciphertext) -> Result<u128, DecryptionError> {
        let value = self.decrypt(ct)?;
        Ok(value.round().max(0.0) as u128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhe::encryptor::IntentEncryptor;
    use crate::fhe::test_support::{foreign_context, shared_context};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn encrypt_decrypt_round_trips_amounts() {
        let ctx = shared_context();
        let encryptor = IntentEncryptor::new(&ctx.public);
        let decryptor = IntentDecryptor::new(&ctx.secret);
        let mut rng = StdRng::seed_from_u64(11);
        for amount in [0u128, 1, 5, 100, 123_456, 1_000_000_000] {
            let ct = encryptor.encrypt_amount(amount, &mut rng);
            let value = decryptor.decrypt(&ct).unwrap();
            assert!(
                (value - amount as f64).abs() < 1e-3,
                "amount {amount} decrypted to {value}"
            );
            assert_eq!(decryptor.decrypt_amount(&ct).unwrap(), amount);
        }
    }

    #[test]
    fn foreign_epoch_is_a_context_mismatch() {
        let ours = shared_context();
        let theirs = foreign_context();
        let encryptor = IntentEncryptor::new(&theirs.public);
        let decryptor = IntentDecryptor::new(&ours.secret);
        let mut rng = StdRng::seed_from_u64(12);
        let ct = encryptor.encrypt_amount(5, &mut rng);
        assert_eq!(
            decryptor.decrypt(&ct),
            Err(DecryptionError::ContextMismatch)
        );
    }

    #[test]
    fn reloaded_secret_context_still_decrypts() {
        let ctx = shared_context();
        let encryptor = IntentEncryptor::new(&ctx.public);
        let mut rng = StdRng::seed_from_u64(13);
        let ct = encryptor.encrypt_amount(777, &mut rng);

        let reloaded =
            crate::fhe::context::SecretContext::from_bytes(&ctx.secret.to_bytes()).unwrap();
        let decryptor = IntentDecryptor::new(&reloaded);
        let value = decryptor.decrypt(&ct).unwrap();
        assert!((value - 777.0).abs() < 1e-3);
    }
}
