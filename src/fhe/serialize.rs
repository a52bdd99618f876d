//! Binary framing for key material and ciphertexts.
//!
//! Flat little-endian layout: fixed magic, version, a parameter header, then
//! L × N × 8-byte coefficient vectors. Deserialization is length- and
//! range-checked; anything short or out of range is `ContextError::Corrupt`,
//! a parameter header that disagrees with the fixed scheme contract is
//! `ContextError::IncompatibleParameters`.

use crate::errors::ContextError;
use crate::fhe::params::{CkksParams, Modulus};
use crate::fhe::poly::RnsPoly;

pub(crate) const FORMAT_VERSION: u16 = 1;

/// Append helpers over a plain byte buffer.
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new(magic: &[u8; 8]) -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(magic);
        let mut w = Self { buf };
        w.put_u16(FORMAT_VERSION);
        w
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    pub fn put_params(&mut self, params: &CkksParams) {
        self.put_u32(params.poly_degree as u32);
        self.put_u16(params.num_limbs() as u16);
        for m in &params.moduli {
            self.put_u32(m.bits);
            self.put_u64(m.value);
        }
        self.put_u32(params.scale_bits);
    }

    pub fn put_poly(&mut self, poly: &RnsPoly) {
        for limb in &poly.limbs {
            for &c in limb {
                self.put_u64(c);
            }
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Checked sequential reader over a serialized blob.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Open a blob, checking magic and version.
    pub fn open(buf: &'a [u8], magic: &[u8; 8]) -> Result<Self, ContextError> {
        let mut r = Self { buf, pos: 0 };
        let found = r.take(8)?;
        if found != magic {
            return Err(ContextError::Corrupt("unrecognized header magic".into()));
        }
        let version = r.take_u16()?;
        if version != FORMAT_VERSION {
            return Err(ContextError::Corrupt(format!(
                "unsupported format version {version}"
            )));
        }
        Ok(r)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ContextError> {
        if self.pos + len > self.buf.len() {
            return Err(ContextError::Corrupt("truncated material".into()));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn take_u8(&mut self) -> Result<u8, ContextError> {
        Ok(self.take(1)?[0])
    }

    pub fn take_u16(&mut self) -> Result<u16, ContextError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().expect("len checked")))
    }

    pub fn take_u32(&mut self) -> Result<u32, ContextError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().expect("len checked")))
    }

    pub fn take_u64(&mut self) -> Result<u64, ContextError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().expect("len checked")))
    }

    pub fn take_i32(&mut self) -> Result<i32, ContextError> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().expect("len checked")))
    }

    pub fn take_f64(&mut self) -> Result<f64, ContextError> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().expect("len checked")))
    }

    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ContextError> {
        Ok(self.take(N)?.try_into().expect("len checked"))
    }

    /// Read a parameter header and require it to match `expected`.
    pub fn take_params(&mut self, expected: &CkksParams) -> Result<CkksParams, ContextError> {
        let poly_degree = self.take_u32()? as usize;
        let num_limbs = self.take_u16()? as usize;
        if num_limbs == 0 || num_limbs > 64 {
            return Err(ContextError::Corrupt(format!(
                "implausible limb count {num_limbs}"
            )));
        }
        let mut moduli = Vec::with_capacity(num_limbs);
        for _ in 0..num_limbs {
            let bits = self.take_u32()?;
            let value = self.take_u64()?;
            moduli.push(Modulus { value, bits });
        }
        let scale_bits = self.take_u32()?;
        if !poly_degree.is_power_of_two() {
            return Err(ContextError::Corrupt(format!(
                "polynomial degree {poly_degree} is not a power of two"
            )));
        }
        let params = CkksParams {
            poly_degree,
            log_degree: poly_degree.trailing_zeros(),
            moduli,
            scale_bits,
        };
        if &params != expected {
            return Err(ContextError::IncompatibleParameters(format!(
                "material was generated for N={}, chain {:?}, scale 2^{}",
                params.poly_degree,
                params.moduli.iter().map(|m| m.bits).collect::<Vec<_>>(),
                params.scale_bits
            )));
        }
        Ok(params)
    }

    /// Read a polynomial, range-checking every coefficient against its limb
    /// modulus. Out-of-range words mean the blob was mangled.
    pub fn take_poly(&mut self, params: &CkksParams) -> Result<RnsPoly, ContextError> {
        let n = params.poly_degree;
        let mut poly = RnsPoly::zero(n, params.num_limbs());
        for (l, m) in params.moduli.iter().enumerate() {
            for i in 0..n {
                let c = self.take_u64()?;
                if c >= m.value {
                    return Err(ContextError::Corrupt(format!(
                        "coefficient out of range at limb {l}, index {i}"
                    )));
                }
                poly.limbs[l][i] = c;
            }
        }
        Ok(poly)
    }

    /// Require the blob to be fully consumed.
    pub fn expect_end(&self) -> Result<(), ContextError> {
        if self.pos != self.buf.len() {
            return Err(ContextError::Corrupt("trailing bytes after material".into()));
        }
        Ok(())
    }
}
