#![forbid(unsafe_code)]

//! Binding the decrypted scalar to the certificate's public key.
//!
//! The scalar alone does not self-certify: the public key attached to the
//! result is always the one parsed out of the embedded certificate, never
//! one derived from the scalar. With strict validation enabled the two are
//! cross-checked, which is the only reliable wrong-password signal the
//! unauthenticated envelope format admits.

use der::Decode;
use qianshan_core::{Error, Result};
use sm2::elliptic_curve::sec1::ToEncodedPoint;
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::Certificate;

use crate::DecodeOptions;

const ID_EC_PUBLIC_KEY: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const SM2_CURVE: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.156.10197.1.301");

/// An SM2 private key paired with the certificate's public key.
pub struct Sm2KeyPair {
    pub secret: sm2::SecretKey,
    /// The public point from the certificate, not derived from `secret`.
    pub public: sm2::PublicKey,
}

impl Sm2KeyPair {
    /// Uncompressed SEC1 encoding of the public point.
    pub fn public_point_bytes(&self) -> Vec<u8> {
        self.public.to_encoded_point(false).as_bytes().to_vec()
    }
}

impl std::fmt::Debug for Sm2KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SM2 private+public key")
    }
}

/// Reconstruct a complete key pair from the decrypted scalar bytes and the
/// certificate extracted from the envelope.
pub fn reconstruct(
    scalar: &[u8],
    cert_der: &[u8],
    options: &DecodeOptions,
) -> Result<(Sm2KeyPair, Certificate)> {
    let certificate = Certificate::from_der(cert_der)
        .map_err(|e| Error::Certificate(format!("failed to parse certificate: {e}")))?;

    let public = sm2_public_key_from_spki(&certificate.tbs_certificate.subject_public_key_info)?;
    let key = bind_scalar(scalar, public, options)?;

    Ok((key, certificate))
}

/// Combine scalar bytes (big-endian unsigned integer, possibly left-padded)
/// with the certificate's public point.
pub fn bind_scalar(
    scalar: &[u8],
    public: sm2::PublicKey,
    options: &DecodeOptions,
) -> Result<Sm2KeyPair> {
    // Strip any re-encoding padding; what remains must fit the field.
    let significant: &[u8] = {
        let start = scalar.iter().position(|&b| b != 0).unwrap_or(scalar.len());
        &scalar[start..]
    };
    if significant.is_empty() {
        return Err(Error::Key("private scalar is zero".into()));
    }
    if significant.len() > 32 {
        return Err(Error::Key(format!(
            "private scalar too large: {} significant bytes",
            significant.len()
        )));
    }

    let mut padded = [0u8; 32];
    padded[32 - significant.len()..].copy_from_slice(significant);

    let secret = sm2::SecretKey::from_slice(&padded)
        .map_err(|e| Error::Key(format!("invalid SM2 private scalar: {e}")))?;

    if options.validate_key_pair && secret.public_key() != public {
        return Err(Error::KeyMismatch);
    }

    Ok(Sm2KeyPair { secret, public })
}

/// Extract the SM2 public point from a certificate's SubjectPublicKeyInfo.
///
/// Fails with [`Error::Certificate`] when the SPKI is not an id-ecPublicKey
/// on the SM2 curve or the point does not decode.
pub fn sm2_public_key_from_spki(spki: &SubjectPublicKeyInfoOwned) -> Result<sm2::PublicKey> {
    if spki.algorithm.oid != ID_EC_PUBLIC_KEY {
        return Err(Error::Certificate(format!(
            "unexpected public key algorithm: {}",
            spki.algorithm.oid
        )));
    }

    let curve = spki
        .algorithm
        .parameters
        .as_ref()
        .ok_or_else(|| Error::Certificate("EC public key without curve parameters".into()))?
        .decode_as::<der::asn1::ObjectIdentifier>()
        .map_err(|e| Error::Certificate(format!("invalid EC curve parameters: {e}")))?;

    if curve != SM2_CURVE {
        return Err(Error::Certificate(format!(
            "unexpected curve: {curve} (expected SM2)"
        )));
    }

    let point = spki.subject_public_key.raw_bytes();
    sm2::PublicKey::from_sec1_bytes(point)
        .map_err(|e| Error::Certificate(format!("invalid SM2 public point: {e}")))
}
