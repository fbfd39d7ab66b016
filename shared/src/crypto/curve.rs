// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Generic short-Weierstrass curves over a prime field, y² = x³ - 3x + b.
//!
//! Contracts assemble curves from raw parameters at runtime, so the
//! arithmetic is generic over the field rather than specialized per curve.
//! The affine pair (0, 0) represents the point at infinity.

use lazy_static::lazy_static;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand::RngCore;

use crate::VMError;

/// Parameters of one curve. Instances are immutable once constructed; the
/// managed-type context shares them by reference across snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurveParams {
    /// Field order (a prime).
    pub p: BigInt,
    /// Order of the base point.
    pub n: BigInt,
    /// The curve equation constant.
    pub b: BigInt,
    /// Base point coordinates.
    pub gx: BigInt,
    pub gy: BigInt,
    /// Field size in bits.
    pub bit_size: u32,
    pub name: String,
}

/// Whether the affine pair is the point-at-infinity representation.
pub fn is_infinity(x: &BigInt, y: &BigInt) -> bool {
    x.is_zero() && y.is_zero()
}

impl CurveParams {
    /// Field size in bytes.
    pub fn byte_len(&self) -> usize {
        (self.bit_size as usize + 7) / 8
    }

    fn reduce(&self, value: BigInt) -> BigInt {
        value.mod_floor(&self.p)
    }

    /// x³ - 3x + b mod p.
    fn polynomial(&self, x: &BigInt) -> BigInt {
        let x3 = x * x * x;
        let three_x = x * 3;
        self.reduce(x3 - three_x + &self.b)
    }

    pub fn is_on_curve(&self, x: &BigInt, y: &BigInt) -> bool {
        if x.is_negative() || x >= &self.p || y.is_negative() || y >= &self.p {
            return false;
        }
        self.reduce(y * y) == self.polynomial(x)
    }

    pub fn add(&self, x1: &BigInt, y1: &BigInt, x2: &BigInt, y2: &BigInt) -> (BigInt, BigInt) {
        if is_infinity(x1, y1) {
            return (x2.clone(), y2.clone());
        }
        if is_infinity(x2, y2) {
            return (x1.clone(), y1.clone());
        }
        if self.reduce(x1 - x2).is_zero() {
            if self.reduce(y1 + y2).is_zero() {
                return (BigInt::zero(), BigInt::zero());
            }
            return self.double(x1, y1);
        }

        let inv = match mod_inv(&self.reduce(x2 - x1), &self.p) {
            Some(inv) => inv,
            None => return (BigInt::zero(), BigInt::zero()),
        };
        let lambda = self.reduce((y2 - y1) * inv);
        let x3 = self.reduce(&lambda * &lambda - x1 - x2);
        let y3 = self.reduce(lambda * (x1 - &x3) - y1);
        (x3, y3)
    }

    pub fn double(&self, x: &BigInt, y: &BigInt) -> (BigInt, BigInt) {
        if is_infinity(x, y) || self.reduce(y.clone()).is_zero() {
            return (BigInt::zero(), BigInt::zero());
        }

        let inv = match mod_inv(&self.reduce(y * 2), &self.p) {
            Some(inv) => inv,
            None => return (BigInt::zero(), BigInt::zero()),
        };
        // The tangent slope, with a = -3 folded in.
        let lambda = self.reduce((x * x * 3 - 3) * inv);
        let x3 = self.reduce(&lambda * &lambda - x - x);
        let y3 = self.reduce(lambda * (x - &x3) - y);
        (x3, y3)
    }

    /// Multiplies the point by the big-endian scalar `k`.
    pub fn scalar_mult(&self, x: &BigInt, y: &BigInt, k: &[u8]) -> (BigInt, BigInt) {
        let mut rx = BigInt::zero();
        let mut ry = BigInt::zero();
        for byte in k {
            for bit in (0..8).rev() {
                let (dx, dy) = self.double(&rx, &ry);
                rx = dx;
                ry = dy;
                if byte >> bit & 1 == 1 {
                    let (sx, sy) = self.add(&rx, &ry, x, y);
                    rx = sx;
                    ry = sy;
                }
            }
        }
        (rx, ry)
    }

    pub fn scalar_base_mult(&self, k: &[u8]) -> (BigInt, BigInt) {
        self.scalar_mult(&self.gx, &self.gy, k)
    }

    /// Uncompressed encoding: 0x04 ‖ x ‖ y, coordinates padded to the field
    /// byte length.
    pub fn marshal(&self, x: &BigInt, y: &BigInt) -> Vec<u8> {
        let byte_len = self.byte_len();
        let mut out = Vec::with_capacity(1 + 2 * byte_len);
        out.push(0x04);
        append_padded(&mut out, x, byte_len);
        append_padded(&mut out, y, byte_len);
        out
    }

    /// Compressed encoding: (0x02 | y&1) ‖ x.
    pub fn marshal_compressed(&self, x: &BigInt, y: &BigInt) -> Vec<u8> {
        let byte_len = self.byte_len();
        let mut out = Vec::with_capacity(1 + byte_len);
        out.push(0x02 | (y.mod_floor(&self.p).bit(0) as u8));
        append_padded(&mut out, x, byte_len);
        out
    }

    /// Parses an uncompressed encoding, rejecting malformed input and points
    /// not on the curve.
    pub fn unmarshal(&self, data: &[u8]) -> Option<(BigInt, BigInt)> {
        let byte_len = self.byte_len();
        if data.len() != 1 + 2 * byte_len || data[0] != 0x04 {
            return None;
        }
        let x = BigInt::from_bytes_be(num_bigint::Sign::Plus, &data[1..1 + byte_len]);
        let y = BigInt::from_bytes_be(num_bigint::Sign::Plus, &data[1 + byte_len..]);
        if !self.is_on_curve(&x, &y) {
            return None;
        }
        Some((x, y))
    }

    /// Parses a compressed encoding, recovering y from the curve equation.
    pub fn unmarshal_compressed(&self, data: &[u8]) -> Option<(BigInt, BigInt)> {
        let byte_len = self.byte_len();
        if data.len() != 1 + byte_len || (data[0] != 0x02 && data[0] != 0x03) {
            return None;
        }
        let x = BigInt::from_bytes_be(num_bigint::Sign::Plus, &data[1..]);
        if x >= self.p {
            return None;
        }
        let mut y = mod_sqrt(&self.polynomial(&x), &self.p)?;
        if y.bit(0) != (data[0] & 1 == 1) {
            y = self.reduce(-y);
        }
        if !self.is_on_curve(&x, &y) {
            return None;
        }
        Some((x, y))
    }

    /// Draws a private scalar from `rng` and derives the public point.
    /// Returns the scalar bytes and the public coordinates.
    pub fn generate_key(
        &self,
        rng: &mut dyn RngCore,
    ) -> Result<(Vec<u8>, BigInt, BigInt), VMError> {
        const MASK: [u8; 8] = [0xff, 0x01, 0x03, 0x07, 0x0f, 0x1f, 0x3f, 0x7f];
        const MAX_ATTEMPTS: usize = 128;

        let byte_len = self.byte_len();
        if byte_len == 0 {
            return Err(VMError::InvalidArgument);
        }
        let mut private = vec![0u8; byte_len];
        for _ in 0..MAX_ATTEMPTS {
            rng.try_fill_bytes(&mut private)
                .map_err(|_| VMError::ExecutionFailed)?;
            private[0] &= MASK[(self.bit_size % 8) as usize];
            if private.len() > 1 {
                // Nudge the scalar away from tiny values without biasing the
                // high bits, as the reference key generator does.
                private[1] ^= 0x42;
            }
            let scalar = BigInt::from_bytes_be(num_bigint::Sign::Plus, &private);
            if scalar >= self.n {
                continue;
            }
            let (x, y) = self.scalar_base_mult(&private);
            if !is_infinity(&x, &y) {
                return Ok((private, x, y));
            }
        }
        Err(VMError::ExecutionFailed)
    }
}

fn append_padded(out: &mut Vec<u8>, value: &BigInt, len: usize) {
    let bytes = value.magnitude().to_bytes_be();
    if bytes.len() >= len {
        out.extend_from_slice(&bytes[bytes.len() - len..]);
    } else {
        out.resize(out.len() + len - bytes.len(), 0);
        out.extend_from_slice(&bytes);
    }
}

fn mod_inv(value: &BigInt, modulus: &BigInt) -> Option<BigInt> {
    let e = value.extended_gcd(modulus);
    if e.gcd.is_one() {
        Some(e.x.mod_floor(modulus))
    } else {
        None
    }
}

/// Square root modulo a prime: the p ≡ 3 (mod 4) shortcut, falling back to
/// Tonelli–Shanks for the general case.
fn mod_sqrt(value: &BigInt, p: &BigInt) -> Option<BigInt> {
    let value = value.mod_floor(p);
    if value.is_zero() {
        return Some(BigInt::zero());
    }
    let one = BigInt::one();
    let p_minus_one = p - &one;
    let half = &p_minus_one >> 1;
    if value.modpow(&half, p) != one {
        return None;
    }
    if p.mod_floor(&BigInt::from(4)) == BigInt::from(3) {
        return Some(value.modpow(&((p + &one) >> 2), p));
    }

    // Tonelli–Shanks: write p - 1 = q·2^s with q odd.
    let mut q = p_minus_one.clone();
    let mut s = 0u32;
    while q.is_even() {
        q >>= 1;
        s += 1;
    }
    let mut z = BigInt::from(2);
    while z.modpow(&half, p) != p_minus_one {
        z += &one;
    }

    let mut m = s;
    let mut c = z.modpow(&q, p);
    let mut t = value.modpow(&q, p);
    let mut r = value.modpow(&((&q + &one) >> 1), p);
    while t != one {
        let mut i = 0u32;
        let mut probe = t.clone();
        while probe != one {
            probe = (&probe * &probe).mod_floor(p);
            i += 1;
            if i == m {
                return None;
            }
        }
        let b = c.modpow(&(BigInt::one() << (m - i - 1) as usize), p);
        m = i;
        c = (&b * &b).mod_floor(p);
        t = (&t * &c).mod_floor(p);
        r = (&r * &b).mod_floor(p);
    }
    Some(r)
}

lazy_static! {
    static ref P256: CurveParams = CurveParams {
        p: hex_int("ffffffff00000001000000000000000000000000ffffffffffffffffffffffff"),
        n: hex_int("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551"),
        b: hex_int("5ac635d8aa3a93e7b3ebbd55769886bc651d06b0cc53b0f63bce3c3e27d2604b"),
        gx: hex_int("6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296"),
        gy: hex_int("4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5"),
        bit_size: 256,
        name: "P-256".to_string(),
    };
    static ref P224: CurveParams = CurveParams {
        p: hex_int("ffffffffffffffffffffffffffffffff000000000000000000000001"),
        n: hex_int("ffffffffffffffffffffffffffff16a2e0b8f03e13dd29455c5c2a3d"),
        b: hex_int("b4050a850c04b3abf54132565044b0b7d7bfd8ba270b39432355ffb4"),
        gx: hex_int("b70e0cbd6bb4bf7f321390b94a03c1d356c21122343280d6115c1d21"),
        gy: hex_int("bd376388b5f723fb4c22dfe6cd4375a05a07476444d5819985007e34"),
        bit_size: 224,
        name: "P-224".to_string(),
    };
}

fn hex_int(hex: &str) -> BigInt {
    BigInt::parse_bytes(hex.as_bytes(), 16).unwrap()
}

/// The NIST P-256 parameters.
pub fn p256() -> CurveParams {
    P256.clone()
}

/// The NIST P-224 parameters (a field with p ≡ 1 mod 4).
pub fn p224() -> CurveParams {
    P224.clone()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn generator_is_on_curve() {
        let curve = p256();
        assert!(curve.is_on_curve(&curve.gx, &curve.gy));
        assert!(!curve.is_on_curve(&BigInt::from(1), &BigInt::from(1)));
    }

    #[test]
    fn scalar_base_mult_one_is_the_generator() {
        let curve = p256();
        let (x, y) = curve.scalar_base_mult(&[1]);
        assert_eq!(x, curve.gx);
        assert_eq!(y, curve.gy);
    }

    #[test]
    fn scalar_base_mult_two_matches_known_vector() {
        let curve = p256();
        let (x, y) = curve.scalar_base_mult(&[2]);
        assert_eq!(
            x,
            hex_int("7cf27b188d034f7e8a52380304b51ac3c08969e277f21b35a60b48fc47669978")
        );
        assert_eq!(
            y,
            hex_int("07775510db8ed040293d9ac69f7430dbba7dade63ce982299e04b79d227873d1")
        );
    }

    #[test]
    fn double_agrees_with_add_and_scalar_mult() {
        let curve = p256();
        let doubled = curve.double(&curve.gx, &curve.gy);
        let added = curve.add(&curve.gx, &curve.gy, &curve.gx, &curve.gy);
        let multiplied = curve.scalar_base_mult(&[2]);
        assert_eq!(doubled, added);
        assert_eq!(doubled, multiplied);
    }

    #[test]
    fn adding_the_inverse_yields_infinity() {
        let curve = p256();
        let neg_gy = curve.reduce(-curve.gy.clone());
        let (x, y) = curve.add(&curve.gx, &curve.gy, &curve.gx, &neg_gy);
        assert!(is_infinity(&x, &y));
    }

    #[test]
    fn infinity_is_the_additive_identity() {
        let curve = p256();
        let zero = BigInt::zero();
        let (x, y) = curve.add(&zero, &zero, &curve.gx, &curve.gy);
        assert_eq!((x, y), (curve.gx.clone(), curve.gy.clone()));
        let (x, y) = curve.add(&curve.gx, &curve.gy, &zero, &zero);
        assert_eq!((x, y), (curve.gx.clone(), curve.gy.clone()));
    }

    #[test]
    fn marshal_round_trip() {
        let curve = p256();
        let (x, y) = curve.scalar_base_mult(&[7]);
        let encoded = curve.marshal(&x, &y);
        assert_eq!(encoded.len(), 1 + 2 * curve.byte_len());
        assert_eq!(encoded[0], 0x04);
        assert_eq!(curve.unmarshal(&encoded), Some((x, y)));
    }

    #[test]
    fn marshal_compressed_round_trip() {
        let curve = p256();
        let (x, y) = curve.scalar_base_mult(&[13]);
        let encoded = curve.marshal_compressed(&x, &y);
        assert_eq!(encoded.len(), 1 + curve.byte_len());
        assert_eq!(curve.unmarshal_compressed(&encoded), Some((x, y)));
    }

    #[test]
    fn compressed_round_trip_exercises_tonelli_shanks() {
        let curve = p224();
        let (x, y) = curve.scalar_base_mult(&[5]);
        let encoded = curve.marshal_compressed(&x, &y);
        assert_eq!(curve.unmarshal_compressed(&encoded), Some((x, y)));
    }

    #[test]
    fn unmarshal_rejects_malformed_encodings() {
        let curve = p256();
        let (x, y) = curve.scalar_base_mult(&[3]);
        let mut encoded = curve.marshal(&x, &y);
        encoded[0] = 0x05;
        assert_eq!(curve.unmarshal(&encoded), None);
        encoded[0] = 0x04;
        // Corrupt a coordinate so the point leaves the curve.
        encoded[1] ^= 0xff;
        assert_eq!(curve.unmarshal(&encoded), None);
        assert_eq!(curve.unmarshal(&encoded[..10]), None);
    }

    #[test]
    fn generated_keys_are_valid() {
        let curve = p256();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let (private, x, y) = curve.generate_key(&mut rng).unwrap();
        assert_eq!(private.len(), curve.byte_len());
        assert!(curve.is_on_curve(&x, &y));
        let scalar = BigInt::from_bytes_be(num_bigint::Sign::Plus, &private);
        assert!(scalar < curve.n);
        let (ex, ey) = curve.scalar_base_mult(&private);
        assert_eq!((ex, ey), (x, y));
    }
}
