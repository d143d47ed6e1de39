#![forbid(unsafe_code)]

//! The GM/T key derivation function used for envelope passwords.
//!
//! A single SM3 invocation over `secret || counter`, with the 4-byte
//! big-endian counter fixed at 1. This is not an iterated password hash:
//! the format assumes key-container passwords carry enough entropy and
//! defines no salt or work factor.

use sm3::{Digest, Sm3};

/// Digest length of SM3 and therefore of the derived material.
pub const DERIVED_LEN: usize = 32;

/// Stretch `secret` into 32 bytes of cipher material.
///
/// Deterministic and infallible. The envelope decryptor splits the result
/// into an IV (first 16 bytes) and an SM4 key (last 16 bytes).
pub fn derive(secret: &[u8]) -> [u8; DERIVED_LEN] {
    let mut hasher = Sm3::new();
    hasher.update(secret);
    hasher.update(1u32.to_be_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let a = derive(b"test123");
        let b = derive(b"test123");
        assert_eq!(a, b);
        assert_eq!(a.len(), DERIVED_LEN);
    }

    #[test]
    fn derive_separates_passwords() {
        assert_ne!(derive(b"test123"), derive(b"test124"));
        assert_ne!(derive(b""), derive(b"\0"));
    }

    #[test]
    fn counter_is_part_of_the_input() {
        // The digest must cover secret || 00 00 00 01, not the secret alone.
        let mut plain = Sm3::new();
        plain.update(b"pw");
        let plain: [u8; 32] = plain.finalize().into();
        assert_ne!(derive(b"pw"), plain);

        let mut concat = Sm3::new();
        concat.update(b"pw\x00\x00\x00\x01");
        let concat: [u8; 32] = concat.finalize().into();
        assert_eq!(derive(b"pw"), concat);
    }
}
