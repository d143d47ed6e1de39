#![forbid(unsafe_code)]

//! Private-key material produced by the format dispatcher.

use qianshan_envelope::Sm2KeyPair;

/// The concrete key kinds a container can yield, as a tagged sum type:
/// the native envelope produces an SM2 key pair bound to its certificate,
/// the legacy PFX path produces an RSA key.
pub enum PrivateKeyMaterial {
    Sm2 {
        key: Sm2KeyPair,
        certificate: x509_cert::Certificate,
        /// The certificate bytes as found in the container.
        certificate_der: Vec<u8>,
    },
    Rsa(rsa::RsaPrivateKey),
}

impl PrivateKeyMaterial {
    pub fn as_sm2(&self) -> Option<&Sm2KeyPair> {
        match self {
            Self::Sm2 { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn as_rsa(&self) -> Option<&rsa::RsaPrivateKey> {
        match self {
            Self::Rsa(key) => Some(key),
            _ => None,
        }
    }
}

impl std::fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sm2 { .. } => write!(f, "SM2 private key with certificate"),
            Self::Rsa(_) => write!(f, "RSA private key"),
        }
    }
}
