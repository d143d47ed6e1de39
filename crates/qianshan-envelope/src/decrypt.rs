#![forbid(unsafe_code)]

//! Recovery of the private scalar from the encrypted key blob.
//!
//! SM4-CBC without padding, keyed from the password KDF. The format has no
//! MAC, so a successful decryption only means the cipher ran to completion;
//! whether the password was right must be inferred downstream.

use base64::Engine;
use cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};

use crate::kdf;
use crate::DecodeOptions;

type Sm4CbcDec = cbc::Decryptor<sm4::Sm4>;

/// Valid size range for an encrypted SM2 scalar, padded or re-encoded.
const BLOB_LEN: std::ops::RangeInclusive<usize> = 32..=64;

/// Sizes at which the blob is always raw ciphertext, never base64 text.
const CANONICAL_LENS: [usize; 2] = [32, 48];

/// Decrypt an envelope key blob with the given password.
///
/// Returns `None` — never an error — when the blob cannot be a private-key
/// payload: its length falls outside `[32, 64]`, the optional base64 step
/// fails, or the ciphertext is not a whole number of SM4 blocks. Callers
/// treat an empty result as "wrong password or corrupt data".
///
/// The returned bytes are the raw decrypted plaintext, read downstream as a
/// big-endian unsigned integer.
pub fn decrypt_key_blob(
    password: &str,
    encrypted: &[u8],
    options: &DecodeOptions,
) -> Option<Vec<u8>> {
    if !BLOB_LEN.contains(&encrypted.len()) {
        return None;
    }

    let ciphertext = if options.decode_base64_ciphertext
        && !CANONICAL_LENS.contains(&encrypted.len())
    {
        base64::engine::general_purpose::STANDARD
            .decode(encrypted)
            .ok()?
    } else {
        encrypted.to_vec()
    };

    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return None;
    }

    let material = kdf::derive(password.as_bytes());
    let (iv, key) = material.split_at(16);

    let decryptor = Sm4CbcDec::new_from_slices(key, iv).ok()?;
    let mut buf = ciphertext;
    let plaintext = decryptor.decrypt_padded_mut::<NoPadding>(&mut buf).ok()?;
    Some(plaintext.to_vec())
}
