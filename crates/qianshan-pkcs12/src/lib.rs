#![forbid(unsafe_code)]

//! Classic PKCS#12 (.pfx/.p12) decoding, the legacy fallback path of the
//! Qianshan format dispatcher.
//!
//! Covers what the fallback needs and no more: MAC verification (SHA-1 and
//! SHA-256), legacy PBE (SHA-1 + 3DES-CBC) and PBES2 (PBKDF2 +
//! AES-256-CBC) decryption of shrouded key bags, and certificate bag
//! extraction. A MAC or padding mismatch surfaces as
//! [`qianshan_core::Error::WrongPassword`], the same category the native
//! SM2 path uses.

pub mod pbe;
mod pfx;

/// Contents extracted from a PFX container.
#[derive(Debug, Default)]
pub struct PfxContents {
    /// PKCS#8 DER-encoded private keys, in container order.
    pub keys: Vec<Vec<u8>>,
    /// DER-encoded X.509 certificates, in container order.
    pub certificates: Vec<Vec<u8>>,
}

/// Parse a PFX container, decrypting its shrouded bags with `password`.
pub fn parse_pfx(data: &[u8], password: &str) -> qianshan_core::Result<PfxContents> {
    pfx::parse(data, password)
}
