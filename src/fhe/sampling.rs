//! Distribution sampling for RLWE key and error material.
//!
//! Secret polynomials and encryption randomness are ternary {-1, 0, 1};
//! errors are discrete gaussian with σ = 3.19; public randomness is uniform
//! per RNS limb (independent uniform residues are exactly uniform over Z_Q
//! by CRT).

use std::f64::consts::PI;

use rand::Rng;

use crate::fhe::params::{Modulus, ERROR_STD_DEV};
use crate::fhe::poly::RnsPoly;

/// Sample a ternary coefficient vector, each entry in {-1, 0, 1} with equal
/// probability.
pub fn sample_ternary<R: Rng>(rng: &mut R, n: usize) -> Vec<i64> {
    (0..n).map(|_| rng.gen_range(0..3) as i64 - 1).collect()
}

/// Sample a rounded gaussian coefficient vector with σ = [`ERROR_STD_DEV`].
pub fn sample_error<R: Rng>(rng: &mut R, n: usize) -> Vec<i64> {
    (0..n).map(|_| gaussian(rng, ERROR_STD_DEV).round() as i64).collect()
}

/// Sample a uniform NTT-domain ring element.
pub fn sample_uniform_poly<R: Rng>(rng: &mut R, n: usize, moduli: &[Modulus]) -> RnsPoly {
    let mut poly = RnsPoly::zero(n, moduli.len());
    for (l, m) in moduli.iter().enumerate() {
        for i in 0..n {
            poly.limbs[l][i] = uniform_below(rng, m.value);
        }
    }
    poly
}

/// Uniform value in [0, bound) without modulo bias.
fn uniform_below<R: Rng>(rng: &mut R, bound: u64) -> u64 {
    let zone = u64::MAX - (u64::MAX % bound);
    loop {
        let v = rng.gen::<u64>();
        if v < zone {
            return v % bound;
        }
    }
}

/// Box-Muller gaussian with standard deviation `sigma`.
fn gaussian<R: Rng>(rng: &mut R, sigma: f64) -> f64 {
    loop {
        let u1: f64 = rng.gen();
        if u1 <= f64::MIN_POSITIVE {
            continue;
        }
        let u2: f64 = rng.gen();
        return sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    }
}
