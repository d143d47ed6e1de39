#![forbid(unsafe_code)]

//! Password-based key derivation and decryption for PKCS#12.
//!
//! Implements the RFC 7292 Appendix B KDF (for MAC keys and legacy PBE)
//! and the two encryption schemes the fallback path accepts: legacy
//! pbeWithSHAAnd3-KeyTripleDES-CBC and PBES2 with PBKDF2 + AES-256-CBC.

use cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use qianshan_core::{Error, Result};
use sha1::Sha1;
use sha2::{Digest, Sha256};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Des3CbcDec = cbc::Decryptor<des::TdesEde3>;

/// What the RFC 7292 KDF output is for; becomes the diversifier byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfPurpose {
    Key,
    Iv,
    Mac,
}

impl KdfPurpose {
    fn diversifier(self) -> u8 {
        match self {
            KdfPurpose::Key => 1,
            KdfPurpose::Iv => 2,
            KdfPurpose::Mac => 3,
        }
    }
}

/// PRF choices for PBKDF2 inside PBES2.
#[derive(Debug, Clone, Copy)]
pub enum Prf {
    HmacSha1,
    HmacSha256,
}

/// Hash choices for the container MAC.
#[derive(Debug, Clone, Copy)]
pub enum MacHash {
    Sha1,
    Sha256,
}

/// An encryption scheme parsed from an AlgorithmIdentifier.
#[derive(Debug)]
pub enum PbeScheme {
    LegacySha1TripleDes {
        salt: Vec<u8>,
        iterations: u32,
    },
    Pbkdf2Aes256Cbc {
        salt: Vec<u8>,
        iterations: u32,
        prf: Prf,
        iv: Vec<u8>,
    },
}

/// Encode a password as the PKCS#12 BMP string: UTF-16BE code units with
/// two trailing zero bytes; the empty password stays empty.
pub fn bmp_string(password: &str) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(password.len() * 2 + 2);
    for unit in password.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out
}

/// RFC 7292 Appendix B KDF over SHA-1 (u = 20, v = 64).
pub fn kdf_sha1(
    purpose: KdfPurpose,
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
    out_len: usize,
) -> Vec<u8> {
    kdf::<Sha1>(purpose, bmp_password, salt, iterations, out_len, 20, 64)
}

/// RFC 7292 Appendix B KDF over SHA-256 (u = 32, v = 64).
pub fn kdf_sha256(
    purpose: KdfPurpose,
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
    out_len: usize,
) -> Vec<u8> {
    kdf::<Sha256>(purpose, bmp_password, salt, iterations, out_len, 32, 64)
}

fn kdf<D>(
    purpose: KdfPurpose,
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
    out_len: usize,
    u: usize,
    v: usize,
) -> Vec<u8>
where
    D: Digest + sha2::digest::FixedOutputReset,
{
    // D || I where I = S || P, each expanded to a multiple of v.
    let diversifier = vec![purpose.diversifier(); v];
    let mut i_block = repeat_to_multiple(salt, v);
    i_block.extend(repeat_to_multiple(bmp_password, v));

    let mut out = Vec::with_capacity(out_len + u);
    while out.len() < out_len {
        let mut hasher = D::new();
        Digest::update(&mut hasher, &diversifier);
        Digest::update(&mut hasher, &i_block);
        let mut a = hasher.finalize_reset();
        for _ in 1..iterations {
            Digest::update(&mut hasher, &a);
            a = hasher.finalize_reset();
        }
        out.extend_from_slice(&a);

        if out.len() < out_len {
            // I_j = (I_j + B + 1) mod 2^(v*8), B = A expanded to v bytes.
            let b = repeat_to_multiple(&a, v);
            for chunk in i_block.chunks_exact_mut(v) {
                add_one_and(chunk, &b);
            }
        }
    }

    out.truncate(out_len);
    out
}

/// Repeat `data` until the result length is the next multiple of `v`.
/// Empty input stays empty.
fn repeat_to_multiple(data: &[u8], v: usize) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let target = data.len().div_ceil(v) * v;
    data.iter().copied().cycle().take(target).collect()
}

/// In-place big-endian `block += b + 1`, discarding the final carry.
fn add_one_and(block: &mut [u8], b: &[u8]) {
    let mut carry = 1u16;
    for (x, y) in block.iter_mut().zip(b).rev() {
        let sum = *x as u16 + *y as u16 + carry;
        *x = sum as u8;
        carry = sum >> 8;
    }
}

/// Decrypt a shrouded payload under the parsed scheme.
///
/// An unpadding failure is reported as [`Error::WrongPassword`]: without a
/// verified MAC it is the only password signal these schemes give.
pub fn decrypt(
    scheme: &PbeScheme,
    ciphertext: &[u8],
    password: &str,
    bmp_password: &[u8],
) -> Result<Vec<u8>> {
    match scheme {
        PbeScheme::LegacySha1TripleDes { salt, iterations } => {
            let key = kdf_sha1(KdfPurpose::Key, bmp_password, salt, *iterations, 24);
            let iv = kdf_sha1(KdfPurpose::Iv, bmp_password, salt, *iterations, 8);
            let dec = Des3CbcDec::new_from_slices(&key, &iv)
                .map_err(|e| Error::Format(format!("3DES-CBC init failed: {e}")))?;
            unpad(dec, ciphertext)
        }
        PbeScheme::Pbkdf2Aes256Cbc {
            salt,
            iterations,
            prf,
            iv,
        } => {
            let mut key = [0u8; 32];
            match prf {
                Prf::HmacSha1 => {
                    pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, *iterations, &mut key)
                }
                Prf::HmacSha256 => {
                    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, *iterations, &mut key)
                }
            }
            let dec = Aes256CbcDec::new_from_slices(&key, iv)
                .map_err(|e| Error::Format(format!("AES-256-CBC init failed: {e}")))?;
            unpad(dec, ciphertext)
        }
    }
}

fn unpad<D: BlockDecryptMut>(decryptor: D, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let mut buf = ciphertext.to_vec();
    let plaintext = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| Error::WrongPassword)?;
    Ok(plaintext.to_vec())
}

/// HMAC over the authSafe contents for MAC verification.
pub fn authsafe_hmac(hash: MacHash, key: &[u8], data: &[u8]) -> Vec<u8> {
    match hash {
        MacHash::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts any key size");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        MacHash::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key size");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
    }
}
