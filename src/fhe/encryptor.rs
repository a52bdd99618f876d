//! Curator-side encryption.
//!
//! The encryptor holds only the public half of the context, enforced by
//! the type it accepts, not by convention. Each asset amount becomes one
//! independently addressable ciphertext, so the compute server and the
//! decryptor can operate per-asset.

use std::collections::BTreeMap;

use alloy::primitives::Address;
use rand::Rng;
use tracing::debug;

use crate::fhe::ciphertext::Ciphertext;
use crate::fhe::context::PublicContext;
use crate::fhe::encoding::encode_amount;
use crate::fhe::ntt::{forward_poly, inverse_poly};
use crate::fhe::params::SCALE;
use crate::fhe::poly::RnsPoly;
use crate::fhe::sampling::{sample_error, sample_ternary};
use crate::intent::OrderIntent;

/// Curator role: encrypts validated intents under a public context.
pub struct IntentEncryptor<'a> {
    public: &'a PublicContext,
}

impl<'a> IntentEncryptor<'a> {
    pub fn new(public: &'a PublicContext) -> Self {
        Self { public }
    }

    /// Encrypt one integer amount as a fresh RLWE ciphertext at scale Δ.
    ///
    /// Decoding is reliable for amount * Δ below ~2^119, far beyond any
    /// amount the protocol's decimal precision can produce.
    pub fn encrypt_amount<R: Rng>(&self, amount: u128, rng: &mut R) -> Ciphertext {
        let params = &self.public.params;
        let moduli = &params.moduli;
        let tables = &self.public.tables;
        let n = params.poly_degree;

        let mut u = RnsPoly::from_signed(&sample_ternary(rng, n), moduli);
        forward_poly(&mut u, tables);

        let message = encode_amount(amount, params);
        let e0 = RnsPoly::from_signed(&sample_error(rng, n), moduli);
        let e1 = RnsPoly::from_signed(&sample_error(rng, n), moduli);

        let mut c0 = self.public.pk_b.hadamard(&u, moduli);
        inverse_poly(&mut c0, tables);
        let c0 = c0.add(&e0, moduli).add(&message, moduli);

        let mut c1 = self.public.pk_a.hadamard(&u, moduli);
        inverse_poly(&mut c1, tables);
        let c1 = c1.add(&e1, moduli);

        Ciphertext {
            c0,
            c1,
            scale: SCALE,
            key_digest: self.public.key_digest,
        }
    }

    /// Encrypt every amount of a validated intent, one ciphertext per
    /// asset. Ciphertexts are single-use: a resubmission must re-encrypt.
    pub fn encrypt_order_intent<R: Rng>(
        &self,
        intent: &OrderIntent,
        rng: &mut R,
    ) -> BTreeMap<Address, Ciphertext> {
        let encrypted: BTreeMap<Address, Ciphertext> = intent
            .items
            .iter()
            .map(|(&asset, &amount)| (asset, self.encrypt_amount(amount, rng)))
            .collect();
        debug!(assets = encrypted.len(), "encrypted order intent");
        encrypted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhe::test_support::shared_context;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ciphertexts_carry_the_epoch_digest() {
        let ctx = shared_context();
        let encryptor = IntentEncryptor::new(&ctx.public);
        let mut rng = StdRng::seed_from_u64(1);
        let ct = encryptor.encrypt_amount(5, &mut rng);
        assert_eq!(ct.key_digest, ctx.public.key_digest());
        assert_eq!(ct.scale, SCALE);
    }

    #[test]
    fn encryption_is_randomized() {
        let ctx = shared_context();
        let encryptor = IntentEncryptor::new(&ctx.public);
        let mut rng = StdRng::seed_from_u64(2);
        let a = encryptor.encrypt_amount(5, &mut rng);
        let b = encryptor.encrypt_amount(5, &mut rng);
        assert_ne!(a.c0, b.c0, "fresh encryptions must not repeat");
    }

    #[test]
    fn one_ciphertext_per_asset() {
        let ctx = shared_context();
        let encryptor = IntentEncryptor::new(&ctx.public);
        let mut rng = StdRng::seed_from_u64(3);
        let mut intent = OrderIntent::default();
        intent
            .items
            .insert(Address::repeat_byte(0x11), 100u128);
        intent.items.insert(Address::repeat_byte(0x22), 250u128);
        let encrypted = encryptor.encrypt_order_intent(&intent, &mut rng);
        assert_eq!(encrypted.len(), 2);
        assert!(encrypted.contains_key(&Address::repeat_byte(0x11)));
    }
}
