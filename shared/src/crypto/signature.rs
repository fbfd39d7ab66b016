// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Signature verification for the crypto hostcalls.
//!
//! BLS uses the min-sig variant of BLS12-381: public keys are 96-byte
//! compressed G2 points, signatures 48-byte compressed G1 points. Secp256k1
//! signatures arrive DER-encoded; the message is hashed with SHA-256 before
//! verification.

use blstrs::{pairing, G1Affine, G1Projective, G2Affine};
use ed25519_dalek::Verifier;
use group::prime::PrimeCurveAffine;
use group::Curve;

use crate::crypto::hash;
use crate::VMError;

pub const BLS_PUBLIC_KEY_LENGTH: usize = 96;
pub const BLS_SIGNATURE_LENGTH: usize = 48;
pub const ED25519_PUBLIC_KEY_LENGTH: usize = 32;
pub const ED25519_SIGNATURE_LENGTH: usize = 64;
pub const SECP256K1_COMPRESSED_PUBLIC_KEY_LENGTH: usize = 33;
pub const SECP256K1_UNCOMPRESSED_PUBLIC_KEY_LENGTH: usize = 65;

const BLS_DST_G1: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_";

/// Verifies a BLS signature over `message`. The error discriminates a
/// malformed key from an invalid signature.
pub fn verify_bls(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), VMError> {
    let key_bytes: &[u8; BLS_PUBLIC_KEY_LENGTH] = public_key
        .try_into()
        .map_err(|_| VMError::InvalidPublicKeySize)?;
    let sig_bytes: &[u8; BLS_SIGNATURE_LENGTH] = signature
        .try_into()
        .map_err(|_| VMError::InvalidSignature)?;

    let public_key = Option::<G2Affine>::from(G2Affine::from_compressed(key_bytes))
        .ok_or(VMError::InvalidSignature)?;
    if bool::from(public_key.is_identity()) {
        return Err(VMError::InvalidSignature);
    }
    let signature = Option::<G1Affine>::from(G1Affine::from_compressed(sig_bytes))
        .ok_or(VMError::InvalidSignature)?;

    let hashed = G1Projective::hash_to_curve(message, BLS_DST_G1, &[]).to_affine();
    if pairing(&signature, &G2Affine::generator()) == pairing(&hashed, &public_key) {
        Ok(())
    } else {
        Err(VMError::InvalidSignature)
    }
}

/// Verifies an Ed25519 signature (32-byte key, 64-byte signature).
pub fn verify_ed25519(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), VMError> {
    let key_bytes: &[u8; ED25519_PUBLIC_KEY_LENGTH] = public_key
        .try_into()
        .map_err(|_| VMError::InvalidPublicKeySize)?;
    let sig_bytes: &[u8; ED25519_SIGNATURE_LENGTH] = signature
        .try_into()
        .map_err(|_| VMError::InvalidSignature)?;

    let verifying_key =
        ed25519_dalek::VerifyingKey::from_bytes(key_bytes).map_err(|_| VMError::InvalidSignature)?;
    let signature = ed25519_dalek::Signature::from_bytes(sig_bytes);
    verifying_key
        .verify(message, &signature)
        .map_err(|_| VMError::InvalidSignature)
}

/// Verifies a secp256k1 ECDSA signature. The key must be a 33-byte compressed
/// or 65-byte uncompressed point; the signature is DER.
pub fn verify_secp256k1(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), VMError> {
    if public_key.len() != SECP256K1_COMPRESSED_PUBLIC_KEY_LENGTH
        && public_key.len() != SECP256K1_UNCOMPRESSED_PUBLIC_KEY_LENGTH
    {
        return Err(VMError::InvalidPublicKeySize);
    }
    let public_key = libsecp256k1::PublicKey::parse_slice(public_key, None)
        .map_err(|_| VMError::InvalidSignature)?;

    let raw = parse_der_signature(signature)?;
    let mut signature =
        libsecp256k1::Signature::parse_standard(&raw).map_err(|_| VMError::InvalidSignature)?;
    signature.normalize_s();

    let digest = hash::sha256(message);
    let message = libsecp256k1::Message::parse(&digest);
    if libsecp256k1::verify(&message, &signature, &public_key) {
        Ok(())
    } else {
        Err(VMError::InvalidSignature)
    }
}

/// Parses a DER ECDSA signature (SEQUENCE of two INTEGERs) into r ‖ s.
fn parse_der_signature(sig: &[u8]) -> Result<[u8; 64], VMError> {
    if sig.len() < 8 || sig[0] != 0x30 || sig[1] as usize != sig.len() - 2 {
        return Err(VMError::InvalidSignature);
    }
    let (r, rest) = parse_der_integer(&sig[2..])?;
    let (s, rest) = parse_der_integer(rest)?;
    if !rest.is_empty() {
        return Err(VMError::InvalidSignature);
    }

    let mut out = [0u8; 64];
    out[32 - r.len()..32].copy_from_slice(r);
    out[64 - s.len()..64].copy_from_slice(s);
    Ok(out)
}

fn parse_der_integer(data: &[u8]) -> Result<(&[u8], &[u8]), VMError> {
    if data.len() < 2 || data[0] != 0x02 {
        return Err(VMError::InvalidSignature);
    }
    let len = data[1] as usize;
    if len == 0 || data.len() < 2 + len {
        return Err(VMError::InvalidSignature);
    }
    let mut value = &data[2..2 + len];
    // Strip the sign padding byte, then require the value to fit a scalar.
    while value.first() == Some(&0) {
        value = &value[1..];
    }
    if value.len() > 32 {
        return Err(VMError::InvalidSignature);
    }
    Ok((value, &data[2 + len..]))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn der_from_raw(r: &[u8], s: &[u8]) -> Vec<u8> {
        fn integer(value: &[u8]) -> Vec<u8> {
            let mut trimmed: &[u8] = value;
            while trimmed.first() == Some(&0) {
                trimmed = &trimmed[1..];
            }
            let mut out = vec![0x02];
            if trimmed.first().map_or(true, |b| b & 0x80 != 0) {
                out.push(trimmed.len() as u8 + 1);
                out.push(0x00);
            } else {
                out.push(trimmed.len() as u8);
            }
            out.extend_from_slice(trimmed);
            out
        }
        let mut body = integer(r);
        body.extend(integer(s));
        let mut out = vec![0x30, body.len() as u8];
        out.extend(body);
        out
    }

    #[test]
    fn ed25519_accepts_a_valid_signature() {
        use ed25519_dalek::Signer;
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let signing_key = ed25519_dalek::SigningKey::generate(&mut rng);
        let message = b"contract payload";
        let signature = signing_key.sign(message);

        let key = signing_key.verifying_key().to_bytes();
        assert_eq!(
            verify_ed25519(&key, message, &signature.to_bytes()),
            Ok(())
        );
    }

    #[test]
    fn ed25519_rejects_a_tampered_message() {
        use ed25519_dalek::Signer;
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let signing_key = ed25519_dalek::SigningKey::generate(&mut rng);
        let signature = signing_key.sign(b"contract payload");

        let key = signing_key.verifying_key().to_bytes();
        assert_eq!(
            verify_ed25519(&key, b"other payload", &signature.to_bytes()),
            Err(VMError::InvalidSignature)
        );
    }

    #[test]
    fn ed25519_rejects_a_short_key() {
        assert_eq!(
            verify_ed25519(&[0u8; 31], b"x", &[0u8; 64]),
            Err(VMError::InvalidPublicKeySize)
        );
    }

    #[test]
    fn secp256k1_round_trip_through_der() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let secret = libsecp256k1::SecretKey::random(&mut rng);
        let public = libsecp256k1::PublicKey::from_secret_key(&secret);

        let message = b"transfer 100 tokens";
        let digest = hash::sha256(message);
        let (signature, _) = libsecp256k1::sign(&libsecp256k1::Message::parse(&digest), &secret);
        let raw = signature.serialize();
        let der = der_from_raw(&raw[..32], &raw[32..]);

        assert_eq!(
            verify_secp256k1(&public.serialize_compressed(), message, &der),
            Ok(())
        );
        assert_eq!(
            verify_secp256k1(&public.serialize(), message, &der),
            Ok(())
        );
        assert_eq!(
            verify_secp256k1(&public.serialize_compressed(), b"transfer 999 tokens", &der),
            Err(VMError::InvalidSignature)
        );
    }

    #[test]
    fn secp256k1_rejects_bad_key_sizes() {
        assert_eq!(
            verify_secp256k1(&[0u8; 64], b"x", &[0x30, 0x00]),
            Err(VMError::InvalidPublicKeySize)
        );
    }

    #[test]
    fn der_parser_rejects_malformed_envelopes() {
        assert!(parse_der_signature(&[]).is_err());
        assert!(parse_der_signature(&[0x30, 0x05, 0x02, 0x01, 0x01]).is_err());
        // Header length that disagrees with the actual buffer.
        assert!(parse_der_signature(&[0x30, 0x40, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01]).is_err());
    }

    #[test]
    fn bls_rejects_bad_key_and_signature_sizes() {
        assert_eq!(
            verify_bls(&[0u8; 95], b"m", &[0u8; 48]),
            Err(VMError::InvalidPublicKeySize)
        );
        assert_eq!(
            verify_bls(&[0u8; 96], b"m", &[0u8; 47]),
            Err(VMError::InvalidSignature)
        );
    }

    #[test]
    fn bls_round_trip_with_a_generated_key() {
        use blstrs::{G2Projective, Scalar};
        use group::Group;

        // sk = 42, pk = g2 * sk, sig = H(m) * sk.
        let sk = Scalar::from(42u64);
        let pk = G2Affine::from(G2Projective::generator() * sk);
        let message = b"block header";
        let hashed = G1Projective::hash_to_curve(message, BLS_DST_G1, &[]);
        let sig = G1Affine::from(hashed * sk);

        let pk_bytes = pk.to_compressed();
        let sig_bytes = sig.to_compressed();
        assert_eq!(verify_bls(&pk_bytes, message, &sig_bytes), Ok(()));
        assert_eq!(
            verify_bls(&pk_bytes, b"other header", &sig_bytes),
            Err(VMError::InvalidSignature)
        );
    }
}
