//! Single-slot plaintext encoding.
//!
//! Order-intent amounts are integers by protocol invariant, so each amount
//! is encoded exactly as the constant polynomial round-free value * Δ with
//! Δ = 2^40, a one-element vector in CKKS terms. Decoding reconstructs the
//! centered constant coefficient through a CRT pair of the two 60-bit limbs,
//! which covers magnitudes up to ~2^119 (amount * Δ, including the Δ² scale
//! reached after a ciphertext-ciphertext product).

use crate::fhe::params::CkksParams;
use crate::fhe::poly::{mod_inv, mod_mul, signed_to_mod, RnsPoly};

/// Encode an integer amount as a constant plaintext polynomial at scale Δ.
///
/// The encoding is exact: no floating-point rounding is involved, which is
/// what keeps integer amounts stable across the encryption boundary.
pub fn encode_amount(amount: u128, params: &CkksParams) -> RnsPoly {
    let value = amount << params.scale_bits;
    let mut poly = RnsPoly::zero(params.poly_degree, params.num_limbs());
    for (l, m) in params.moduli.iter().enumerate() {
        poly.limbs[l][0] = (value % m.value as u128) as u64;
    }
    poly
}

/// Encode an already-scaled signed integer (plaintext-space value * Δ is
/// the caller's responsibility). Used by tests and key generation.
pub fn encode_raw_signed(value: i64, params: &CkksParams) -> RnsPoly {
    let mut poly = RnsPoly::zero(params.poly_degree, params.num_limbs());
    for (l, m) in params.moduli.iter().enumerate() {
        poly.limbs[l][0] = signed_to_mod(value, m.value);
    }
    poly
}

/// Decode the constant coefficient of a plaintext polynomial to a real
/// value at the given scale.
///
/// Reconstruction runs over the first and last limbs (the two 60-bit
/// primes), whose product bounds the representable centered magnitude at
/// just under 2^120.
pub fn decode_scalar(poly: &RnsPoly, params: &CkksParams, scale: f64) -> f64 {
    let last = params.num_limbs() - 1;
    let q0 = params.moduli[0].value;
    let q1 = params.moduli[last].value;
    let r0 = poly.limbs[0][0];
    let r1 = poly.limbs[last][0];

    // x ≡ r0 (mod q0), x ≡ r1 (mod q1), 0 <= x < q0*q1
    let q0_inv = mod_inv(q0 % q1, q1);
    let diff = {
        let r0_mod = r0 % q1;
        if r1 >= r0_mod {
            r1 - r0_mod
        } else {
            q1 - r0_mod + r1
        }
    };
    let t = mod_mul(diff, q0_inv, q1);
    let x = r0 as u128 + q0 as u128 * t as u128;

    let qq = q0 as u128 * q1 as u128;
    let centered = if x > qq / 2 {
        -((qq - x) as i128)
    } else {
        x as i128
    };
    centered as f64 / scale
}
