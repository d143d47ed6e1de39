#![forbid(unsafe_code)]

//! Decoder for the GM/T SM2 encrypted private-key envelope.
//!
//! The `.sm2` container is a national-standard analogue of PKCS#12 built on
//! the SM2/SM3/SM4 primitives: a DER SEQUENCE holding an SM4-CBC encrypted
//! private scalar next to a DER-encoded X.509 certificate. The symmetric
//! key is derived from the user password with a single-iteration SM3 KDF.
//!
//! Decoding is synchronous, allocation-bounded and side-effect free; every
//! call derives its key material fresh and holds it only for the duration
//! of one decryption.

pub mod decrypt;
pub mod kdf;
pub mod keypair;
pub mod pdu;

use qianshan_core::{Error, Result};

pub use keypair::Sm2KeyPair;
pub use pdu::EnvelopePdu;

/// Behavior toggles for envelope decoding.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Base64-decode the encrypted key blob before decryption when its
    /// length is not one of the canonical sizes (32 or 48 bytes).
    ///
    /// Some producers re-encode the ciphertext as base64 text, but
    /// deployed decoders feed the raw bytes to the cipher regardless.
    /// `false` (the default) keeps that raw-bytes behavior; `true` decodes
    /// the wrapping first.
    pub decode_base64_ciphertext: bool,

    /// Check that the decrypted scalar times the curve generator equals the
    /// certificate's public point, failing with [`Error::KeyMismatch`]
    /// otherwise. The format has no authentication tag, so this is the only
    /// reliable wrong-password signal. Disable to take the pairing on
    /// trust, as older decoders do.
    pub validate_key_pair: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            decode_base64_ciphertext: false,
            validate_key_pair: true,
        }
    }
}

/// A fully decoded envelope: the private key bound to the certificate it
/// shipped with.
pub struct DecodedEnvelope {
    pub key: Sm2KeyPair,
    pub certificate: x509_cert::Certificate,
    /// The certificate exactly as it appeared in the container.
    pub certificate_der: Vec<u8>,
}

/// Decode an SM2 envelope from raw DER bytes.
///
/// `data` is the binary container (the on-disk form is usually base64
/// text; callers decode that wrapping first). Returns
/// [`Error::WrongPassword`] when the key blob yields no plausible scalar,
/// [`Error::Format`] for structural violations, and
/// [`Error::Certificate`]/[`Error::Key`] from key reconstruction.
pub fn decode_envelope(
    data: &[u8],
    password: &str,
    options: &DecodeOptions,
) -> Result<DecodedEnvelope> {
    let envelope = pdu::parse_envelope(data)?;

    let scalar = decrypt::decrypt_key_blob(password, &envelope.private_key.content, options)
        .ok_or(Error::WrongPassword)?;

    let (key, certificate) =
        keypair::reconstruct(&scalar, &envelope.certificate.content, options)?;

    Ok(DecodedEnvelope {
        key,
        certificate,
        certificate_der: envelope.certificate.content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipher::{block_padding::NoPadding, BlockEncryptMut, KeyIvInit};
    use qianshan_core::oid;
    use sm2::elliptic_curve::sec1::ToEncodedPoint;
    use yasna::models::ObjectIdentifier;

    type Sm4CbcEnc = cbc::Encryptor<sm4::Sm4>;

    fn encrypt_scalar(password: &str, scalar: &[u8]) -> Vec<u8> {
        let material = kdf::derive(password.as_bytes());
        let (iv, key) = material.split_at(16);
        let mut buf = scalar.to_vec();
        let len = buf.len();
        Sm4CbcEnc::new_from_slices(key, iv)
            .unwrap()
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .unwrap();
        buf
    }

    fn write_signature_algorithm(w: yasna::DERWriter) {
        w.write_sequence(|w| {
            // SM2-with-SM3: 1.2.156.10197.1.501
            w.next()
                .write_oid(&ObjectIdentifier::from_slice(&[1, 2, 156, 10197, 1, 501]));
        });
    }

    /// A syntactically complete certificate carrying `point` in its SPKI.
    /// The signature bits are filler; decoding never verifies them.
    fn certificate_der(point: &[u8]) -> Vec<u8> {
        // UTCTime, hand-encoded (tag 0x17, 13 content bytes)
        let mut not_before = vec![0x17, 13];
        not_before.extend_from_slice(b"250101000000Z");
        let mut not_after = vec![0x17, 13];
        not_after.extend_from_slice(b"350101000000Z");

        yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_sequence(|w| {
                    // version v3, serial 1
                    w.next()
                        .write_tagged(yasna::Tag::context(0), |w| w.write_i64(2));
                    w.next().write_i64(1);
                    write_signature_algorithm(w.next());
                    // empty issuer name
                    w.next().write_sequence(|_w| {});
                    w.next().write_sequence(|w| {
                        w.next().write_der(&not_before);
                        w.next().write_der(&not_after);
                    });
                    // empty subject name
                    w.next().write_sequence(|_w| {});
                    w.next().write_sequence(|w| {
                        w.next().write_sequence(|w| {
                            w.next().write_oid(&ObjectIdentifier::from_slice(
                                oid::ID_EC_PUBLIC_KEY,
                            ));
                            w.next()
                                .write_oid(&ObjectIdentifier::from_slice(oid::SM2_CURVE));
                        });
                        w.next().write_bitvec_bytes(point, point.len() * 8);
                    });
                });
                write_signature_algorithm(w.next());
                w.next().write_bitvec_bytes(&[0u8; 8], 64);
            });
        })
    }

    fn envelope_der(encrypted: &[u8], cert: &[u8]) -> Vec<u8> {
        yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_i64(1);
                w.next().write_sequence(|w| {
                    w.next()
                        .write_oid(&ObjectIdentifier::from_slice(oid::SM2_DATA));
                    w.next()
                        .write_oid(&ObjectIdentifier::from_slice(oid::SM4_CBC));
                    w.next().write_bytes(encrypted);
                });
                w.next().write_sequence(|w| {
                    w.next()
                        .write_oid(&ObjectIdentifier::from_slice(oid::SM2_DATA));
                    w.next().write_bytes(cert);
                });
            });
        })
    }

    #[test]
    fn decodes_a_complete_envelope() {
        let scalar = [0x01u8; 32];
        let secret = sm2::SecretKey::from_slice(&scalar).unwrap();
        let point = secret.public_key().to_encoded_point(false);

        let cert = certificate_der(point.as_bytes());
        let blob = encrypt_scalar("test123", &scalar);
        let der = envelope_der(&blob, &cert);

        let decoded = decode_envelope(&der, "test123", &DecodeOptions::default())
            .expect("well-formed envelope must decode");
        assert_eq!(decoded.key.public, secret.public_key());
        assert_eq!(decoded.key.public_point_bytes(), point.as_bytes());
        assert_eq!(decoded.certificate_der, cert);
    }

    #[test]
    fn wrong_password_fails_strict_validation() {
        // The blob decrypts under any password; the scalar it yields under
        // the wrong one no longer matches the certificate's point.
        let scalar = [0x01u8; 32];
        let secret = sm2::SecretKey::from_slice(&scalar).unwrap();
        let point = secret.public_key().to_encoded_point(false);

        let cert = certificate_der(point.as_bytes());
        let blob = encrypt_scalar("test123", &scalar);
        let der = envelope_der(&blob, &cert);

        match decode_envelope(&der, "test124", &DecodeOptions::default()) {
            Err(Error::KeyMismatch) => {}
            Err(other) => panic!("expected KeyMismatch, got {other:?}"),
            Ok(_) => panic!("expected KeyMismatch, got a decoded envelope"),
        }
    }
}
