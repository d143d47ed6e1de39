#![forbid(unsafe_code)]

/// Errors produced by the Qianshan key-container library.
///
/// Decoding untrusted input must never abort the process: every failure in
/// the container pipeline surfaces as one of these variants.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The container structure does not match the expected grammar, or
    /// bytes remain after the declared structure was fully consumed.
    #[error("container format error: {0}")]
    Format(String),

    /// The format hint (file extension or explicit tag) is not recognized.
    #[error("unsupported container format: {0}")]
    UnsupportedFormat(String),

    /// Decryption produced no usable key material, or the legacy container
    /// reported a password mismatch. The native format carries no
    /// authentication tag, so a wrong password and corrupt key data are
    /// indistinguishable here.
    #[error("wrong password or corrupt key data")]
    WrongPassword,

    /// The embedded certificate does not parse, or its public key is not of
    /// the expected kind.
    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("key error: {0}")]
    Key(String),

    /// The decrypted private scalar does not correspond to the public key
    /// in the embedded certificate (strict validation).
    #[error("private key does not match certificate public key")]
    KeyMismatch,

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
