//! Compute-server evaluation.
//!
//! The evaluator applies scheme-legal operations to ciphertexts using only
//! the public context and never observes plaintext. Scalar weighting,
//! addition and negation need no key material; rotation needs the matching
//! Galois key and ciphertext-ciphertext multiplication needs the
//! relinearization key; operations whose key is absent fail with
//! `UnsupportedOperation` rather than producing undecryptable output.

use tracing::debug;

use crate::errors::EvaluationError;
use crate::fhe::ciphertext::Ciphertext;
use crate::fhe::context::{keyswitch, PublicContext};
use crate::fhe::ntt::{forward_poly, inverse_poly};

/// One homomorphic operation request.
#[derive(Debug, Clone, Copy)]
pub enum EvalOp<'a> {
    /// Multiply the encrypted amount by an integer scalar. Integer scalars
    /// keep the ciphertext scale unchanged, so decode precision is
    /// unaffected.
    ScaleBy(u64),
    /// Add another ciphertext of the same epoch and scale.
    Add(&'a Ciphertext),
    /// Negate the encrypted amount.
    Negate,
    /// Rotate by the given slot step. Requires the matching Galois key.
    Rotate(i32),
    /// Multiply by another ciphertext. Requires the relinearization key;
    /// the result carries the product of the operand scales.
    Multiply(&'a Ciphertext),
}

/// Compute-server role: evaluates operations under the public context only.
pub struct HomomorphicEvaluator<'a> {
    public: &'a PublicContext,
}

impl<'a> HomomorphicEvaluator<'a> {
    pub fn new(public: &'a PublicContext) -> Self {
        Self { public }
    }

    /// Apply one operation, producing a fresh ciphertext decryptable only
    /// by the matching secret context.
    pub fn evaluate(
        &self,
        ct: &Ciphertext,
        op: EvalOp<'_>,
    ) -> Result<Ciphertext, EvaluationError> {
        self.check_epoch(ct)?;
        let params = &self.public.params;
        let moduli = &params.moduli;

        match op {
            EvalOp::ScaleBy(k) => Ok(Ciphertext {
                c0: ct.c0.scale(k, moduli),
                c1: ct.c1.scale(k, moduli),
                scale: ct.scale,
                key_digest: ct.key_digest,
            }),

            EvalOp::Add(other) => {
                self.check_epoch(other)?;
                if ct.scale.to_bits() != other.scale.to_bits() {
                    return Err(EvaluationError::ScaleMismatch);
                }
                Ok(Ciphertext {
                    c0: ct.c0.add(&other.c0, moduli),
                    c1: ct.c1.add(&other.c1, moduli),
                    scale: ct.scale,
                    key_digest: ct.key_digest,
                })
            }

            EvalOp::Negate => Ok(Ciphertext {
                c0: ct.c0.negate(moduli),
                c1: ct.c1.negate(moduli),
                scale: ct.scale,
                key_digest: ct.key_digest,
            }),

            EvalOp::Rotate(steps) => {
                let rot = self.public.rotation_keys.get(&steps).ok_or_else(|| {
                    EvaluationError::UnsupportedOperation(format!(
                        "no Galois key for rotation step {steps}"
                    ))
                })?;
                let c0_rot = ct.c0.automorphism(rot.galois_element, moduli);
                let c1_rot = ct.c1.automorphism(rot.galois_element, moduli);
                let (ks0, ks1) = keyswitch(&c1_rot, &rot.key, params, &self.public.tables);
                debug!(steps, "rotated ciphertext");
                Ok(Ciphertext {
                    c0: c0_rot.add(&ks0, moduli),
                    c1: ks1,
                    scale: ct.scale,
                    key_digest: ct.key_digest,
                })
            }

            EvalOp::Multiply(other) => {
                self.check_epoch(other)?;
                let relin = self.public.relin_key.as_ref().ok_or_else(|| {
                    EvaluationError::UnsupportedOperation(
                        "ciphertext multiplication needs the relinearization key".into(),
                    )
                })?;
                let tables = &self.public.tables;

                let mut a0 = ct.c0.clone();
                let mut a1 = ct.c1.clone();
                let mut b0 = other.c0.clone();
                let mut b1 = other.c1.clone();
                forward_poly(&mut a0, tables);
                forward_poly(&mut a1, tables);
                forward_poly(&mut b0, tables);
                forward_poly(&mut b1, tables);

                let mut d0 = a0.hadamard(&b0, moduli);
                let mut d1 = a0
                    .hadamard(&b1, moduli)
                    .add(&a1.hadamard(&b0, moduli), moduli);
                let mut d2 = a1.hadamard(&b1, moduli);
                inverse_poly(&mut d0, tables);
                inverse_poly(&mut d1, tables);
                inverse_poly(&mut d2, tables);

                let (ks0, ks1) = keyswitch(&d2, relin, params, tables);
                Ok(Ciphertext {
                    c0: d0.add(&ks0, moduli),
                    c1: d1.add(&ks1, moduli),
                    scale: ct.scale * other.scale,
                    key_digest: ct.key_digest,
                })
            }
        }
    }

    fn check_epoch(&self, ct: &Ciphertext) -> Result<(), EvaluationError> {
        if ct.key_digest != self.public.key_digest {
            return Err(EvaluationError::ContextMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhe::decryptor::IntentDecryptor;
    use crate::fhe::encryptor::IntentEncryptor;
    use crate::fhe::params::SCALE;
    use crate::fhe::test_support::{foreign_context, shared_context};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn scalar_weighting_round_trips() {
        let ctx = shared_context();
        let encryptor = IntentEncryptor::new(&ctx.public);
        let evaluator = HomomorphicEvaluator::new(&ctx.public);
        let decryptor = IntentDecryptor::new(&ctx.secret);
        let mut rng = StdRng::seed_from_u64(21);

        let ct = encryptor.encrypt_amount(5, &mut rng);
        let scaled = evaluator.evaluate(&ct, EvalOp::ScaleBy(10)).unwrap();
        let value = decryptor.decrypt(&scaled).unwrap();
        assert!((value - 50.0).abs() < 1e-3, "5 * 10 decrypted to {value}");
        assert_eq!(scaled.scale, SCALE);
    }

    #[test]
    fn addition_round_trips() {
        let ctx = shared_context();
        let encryptor = IntentEncryptor::new(&ctx.public);
        let evaluator = HomomorphicEvaluator::new(&ctx.public);
        let decryptor = IntentDecryptor::new(&ctx.secret);
        let mut rng = StdRng::seed_from_u64(22);

        let a = encryptor.encrypt_amount(200, &mut rng);
        let b = encryptor.encrypt_amount(300, &mut rng);
        let sum = evaluator.evaluate(&a, EvalOp::Add(&b)).unwrap();
        let value = decryptor.decrypt(&sum).unwrap();
        assert!((value - 500.0).abs() < 1e-3);
    }

    #[test]
    fn negation_round_trips() {
        let ctx = shared_context();
        let encryptor = IntentEncryptor::new(&ctx.public);
        let evaluator = HomomorphicEvaluator::new(&ctx.public);
        let decryptor = IntentDecryptor::new(&ctx.secret);
        let mut rng = StdRng::seed_from_u64(23);

        let ct = encryptor.encrypt_amount(7, &mut rng);
        let neg = evaluator.evaluate(&ct, EvalOp::Negate).unwrap();
        let value = decryptor.decrypt(&neg).unwrap();
        assert!((value + 7.0).abs() < 1e-3);
    }

    #[test]
    fn rotation_preserves_single_slot_value() {
        let ctx = shared_context();
        let encryptor = IntentEncryptor::new(&ctx.public);
        let evaluator = HomomorphicEvaluator::new(&ctx.public);
        let decryptor = IntentDecryptor::new(&ctx.secret);
        let mut rng = StdRng::seed_from_u64(24);

        let ct = encryptor.encrypt_amount(7, &mut rng);
        let rotated = evaluator.evaluate(&ct, EvalOp::Rotate(1)).unwrap();
        let value = decryptor.decrypt(&rotated).unwrap();
        assert!(
            (value - 7.0).abs() < 0.05,
            "rotation changed the value: {value}"
        );
    }

    #[test]
    fn rotation_without_key_is_unsupported() {
        let ctx = shared_context();
        let encryptor = IntentEncryptor::new(&ctx.public);
        let evaluator = HomomorphicEvaluator::new(&ctx.public);
        let mut rng = StdRng::seed_from_u64(25);

        let ct = encryptor.encrypt_amount(7, &mut rng);
        assert!(matches!(
            evaluator.evaluate(&ct, EvalOp::Rotate(3)),
            Err(EvaluationError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn multiplication_round_trips_and_squares_scale() {
        let ctx = shared_context();
        let encryptor = IntentEncryptor::new(&ctx.public);
        let evaluator = HomomorphicEvaluator::new(&ctx.public);
        let decryptor = IntentDecryptor::new(&ctx.secret);
        let mut rng = StdRng::seed_from_u64(26);

        let a = encryptor.encrypt_amount(3, &mut rng);
        let b = encryptor.encrypt_amount(4, &mut rng);
        let prod = evaluator.evaluate(&a, EvalOp::Multiply(&b)).unwrap();
        assert_eq!(prod.scale, SCALE * SCALE);
        let value = decryptor.decrypt(&prod).unwrap();
        assert!((value - 12.0).abs() < 0.05, "3 * 4 decrypted to {value}");
    }

    #[test]
    fn multiplication_without_relin_key_is_unsupported() {
        let ctx = shared_context();
        let mut stripped = ctx.public.clone();
        stripped.relin_key = None;
        let encryptor = IntentEncryptor::new(&stripped);
        let evaluator = HomomorphicEvaluator::new(&stripped);
        let mut rng = StdRng::seed_from_u64(27);

        let a = encryptor.encrypt_amount(3, &mut rng);
        let b = encryptor.encrypt_amount(4, &mut rng);
        assert!(matches!(
            evaluator.evaluate(&a, EvalOp::Multiply(&b)),
            Err(EvaluationError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn foreign_epoch_ciphertext_is_rejected() {
        let ours = shared_context();
        let theirs = foreign_context();
        let encryptor = IntentEncryptor::new(&theirs.public);
        let evaluator = HomomorphicEvaluator::new(&ours.public);
        let mut rng = StdRng::seed_from_u64(28);

        let ct = encryptor.encrypt_amount(5, &mut rng);
        assert_eq!(
            evaluator.evaluate(&ct, EvalOp::ScaleBy(2)),
            Err(EvaluationError::ContextMismatch)
        );
    }

    #[test]
    fn mixed_scale_addition_is_rejected() {
        let ctx = shared_context();
        let encryptor = IntentEncryptor::new(&ctx.public);
        let evaluator = HomomorphicEvaluator::new(&ctx.public);
        let mut rng = StdRng::seed_from_u64(29);

        let a = encryptor.encrypt_amount(3, &mut rng);
        let b = encryptor.encrypt_amount(4, &mut rng);
        let prod = evaluator.evaluate(&a, EvalOp::Multiply(&b)).unwrap();
        assert_eq!(
            evaluator.evaluate(&prod, EvalOp::Add(&a)),
            Err(EvaluationError::ScaleMismatch)
        );
    }
}
