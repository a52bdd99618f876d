//! CKKS homomorphic encryption for order intents.
//!
//! Implements the minimal operation set the order-intent lifecycle needs
//! under one fixed parameter contract (N=8192, modulus chain
//! [60, 40, 40, 60] bits, scale 2^40):
//! - exact single-slot integer encoding
//! - RLWE public-key encryption, one ciphertext per asset
//! - key-free linear evaluation (scalar weighting, addition, negation)
//! - key-switching-backed rotation and relinearized multiplication
//! - secret-key decryption with cross-epoch rejection
//!
//! Trust separation is carried by the types: encryptor and evaluator
//! functions accept only [`PublicContext`], the decryptor only
//! [`SecretContext`]. No role ever holds both halves.

pub mod ciphertext;
pub mod context;
pub mod decryptor;
pub mod encoding;
pub mod encryptor;
pub mod evaluator;
pub mod ntt;
pub mod params;
pub mod poly;
pub mod sampling;
pub mod serialize;

pub use ciphertext::Ciphertext;
pub use context::{EncryptionContext, PublicContext, SecretContext};
pub use decryptor::IntentDecryptor;
pub use encryptor::IntentEncryptor;
pub use evaluator::{EvalOp, HomomorphicEvaluator};
pub use params::CkksParams;

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared key-generation fixtures. Context generation is the expensive
    //! part of the test suite, so tests reuse one epoch (plus one foreign
    //! epoch for mismatch cases) instead of regenerating per test.

    use std::sync::OnceLock;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::context::EncryptionContext;

    pub fn shared_context() -> &'static EncryptionContext {
        static CTX: OnceLock<EncryptionContext> = OnceLock::new();
        CTX.get_or_init(|| {
            let mut rng = StdRng::seed_from_u64(0xA11CE);
            EncryptionContext::generate(&mut rng)
        })
    }

    pub fn foreign_context() -> &'static EncryptionContext {
        static CTX: OnceLock<EncryptionContext> = OnceLock::new();
        CTX.get_or_init(|| {
            let mut rng = StdRng::seed_from_u64(0xB0B);
            EncryptionContext::generate(&mut rng)
        })
    }
}
