// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use multihash::derive::Multihash;
use multihash::{Keccak256, MultihashDigest, Ripemd160, Sha2_256};

/// Codes and hashers exposed to contracts through the crypto hostcalls.
#[derive(Clone, Copy, Debug, Eq, Multihash, PartialEq, Hash)]
#[mh(alloc_size = 64)]
pub enum SupportedHashes {
    #[mh(code = 0x12, hasher = Sha2_256)]
    Sha2_256,
    #[mh(code = 0x1b, hasher = Keccak256)]
    Keccak256,
    #[mh(code = 0x1053, hasher = Ripemd160)]
    Ripemd160,
}

pub const SHA256_LENGTH: usize = 32;
pub const KECCAK256_LENGTH: usize = 32;
pub const RIPEMD160_LENGTH: usize = 20;

pub fn sha256(data: &[u8]) -> [u8; SHA256_LENGTH] {
    let mh = SupportedHashes::Sha2_256.digest(data);
    let mut out = [0u8; SHA256_LENGTH];
    out.copy_from_slice(&mh.digest()[..SHA256_LENGTH]);
    out
}

pub fn keccak256(data: &[u8]) -> [u8; KECCAK256_LENGTH] {
    let mh = SupportedHashes::Keccak256.digest(data);
    let mut out = [0u8; KECCAK256_LENGTH];
    out.copy_from_slice(&mh.digest()[..KECCAK256_LENGTH]);
    out
}

pub fn ripemd160(data: &[u8]) -> [u8; RIPEMD160_LENGTH] {
    let mh = SupportedHashes::Ripemd160.digest(data);
    let mut out = [0u8; RIPEMD160_LENGTH];
    out.copy_from_slice(&mh.digest()[..RIPEMD160_LENGTH]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_abc_vector() {
        let digest = sha256(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn keccak256_empty_vector() {
        let digest = keccak256(b"");
        assert_eq!(
            hex::encode(digest),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn ripemd160_abc_vector() {
        let digest = ripemd160(b"abc");
        assert_eq!(hex::encode(digest), "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc");
    }
}
