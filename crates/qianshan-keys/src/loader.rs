#![forbid(unsafe_code)]

//! The format dispatcher: container loading keyed on a format hint.
//!
//! The hint (a file extension or explicit tag) selects between the native
//! SM2 envelope and the legacy PFX container. Unknown hints fail with
//! [`Error::UnsupportedFormat`] before any parsing is attempted — there is
//! no best-effort sniffing.

use base64::Engine;
use qianshan_core::{Error, Result};
use qianshan_envelope::{decode_envelope, DecodeOptions};

use crate::key::PrivateKeyMaterial;

/// Recognized container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// The native GM/T SM2 envelope (`.sm2`), base64 text on disk.
    Sm2Envelope,
    /// Classic PKCS#12 (`.pfx`/`.p12`).
    Pfx,
}

impl ContainerFormat {
    /// Map a file extension (without the dot) to a format.
    pub fn from_extension(ext: &str) -> Result<Self> {
        if ext.eq_ignore_ascii_case("sm2") {
            Ok(Self::Sm2Envelope)
        } else if ext.eq_ignore_ascii_case("pfx") || ext.eq_ignore_ascii_case("p12") {
            Ok(Self::Pfx)
        } else {
            Err(Error::UnsupportedFormat(ext.to_owned()))
        }
    }
}

/// Load a private key from container bytes.
///
/// Both paths report a password mismatch as [`Error::WrongPassword`]: the
/// native envelope when decryption yields no plausible scalar, the PFX path
/// when its MAC or padding check fails. When strict validation catches a
/// key/certificate mismatch downstream, that surfaces separately as
/// [`Error::KeyMismatch`].
pub fn load_private_key(
    data: &[u8],
    format: ContainerFormat,
    password: &str,
    options: &DecodeOptions,
) -> Result<PrivateKeyMaterial> {
    match format {
        ContainerFormat::Sm2Envelope => {
            let der = decode_base64_text(data)?;
            let decoded = decode_envelope(&der, password, options)?;
            Ok(PrivateKeyMaterial::Sm2 {
                key: decoded.key,
                certificate: decoded.certificate,
                certificate_der: decoded.certificate_der,
            })
        }
        ContainerFormat::Pfx => load_pfx_key(data, password),
    }
}

/// Load a private key from a file, deriving the format from its extension.
pub fn load_private_key_file(
    path: &std::path::Path,
    password: &str,
    options: &DecodeOptions,
) -> Result<PrivateKeyMaterial> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
    let format = ContainerFormat::from_extension(ext)?;
    let data = std::fs::read(path)?;
    load_private_key(&data, format, password, options)
}

/// Extract the SM2 public key from a PEM-encoded certificate.
pub fn certificate_public_key_pem(pem_data: &[u8]) -> Result<sm2::PublicKey> {
    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Certificate(format!("invalid PEM encoding: {e}")))?;

    let (label, der_bytes) = pem_rfc7468::decode_vec(pem_str.trim().as_bytes())
        .map_err(|e| Error::Certificate(format!("failed to decode certificate PEM: {e}")))?;
    if label != "CERTIFICATE" {
        return Err(Error::Certificate(format!(
            "expected CERTIFICATE PEM label, got: {label}"
        )));
    }

    use der::Decode;
    let cert = x509_cert::Certificate::from_der(&der_bytes)
        .map_err(|e| Error::Certificate(format!("failed to parse certificate: {e}")))?;
    qianshan_envelope::keypair::sm2_public_key_from_spki(
        &cert.tbs_certificate.subject_public_key_info,
    )
}

/// Decode the base64 text wrapping of an on-disk `.sm2` container,
/// tolerating embedded line breaks.
fn decode_base64_text(data: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(data)
        .map_err(|e| Error::Base64(format!("container is not base64 text: {e}")))?;
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .map_err(|e| Error::Base64(format!("decode error: {e}")))
}

/// The PFX fallback yields PKCS#8 blobs; containers in this profile carry
/// an RSA key there, so try PKCS#8 first and PKCS#1 second.
fn load_pfx_key(data: &[u8], password: &str) -> Result<PrivateKeyMaterial> {
    let contents = qianshan_pkcs12::parse_pfx(data, password)?;

    let key_der = contents
        .keys
        .first()
        .ok_or_else(|| Error::Key("PFX contains no private keys".into()))?;

    use pkcs8::DecodePrivateKey;
    if let Ok(key) = rsa::RsaPrivateKey::from_pkcs8_der(key_der) {
        return Ok(PrivateKeyMaterial::Rsa(key));
    }

    use pkcs1::DecodeRsaPrivateKey;
    let key = rsa::RsaPrivateKey::from_pkcs1_der(key_der)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key from PFX: {e}")))?;
    Ok(PrivateKeyMaterial::Rsa(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping() {
        assert_eq!(
            ContainerFormat::from_extension("sm2").unwrap(),
            ContainerFormat::Sm2Envelope
        );
        assert_eq!(
            ContainerFormat::from_extension("SM2").unwrap(),
            ContainerFormat::Sm2Envelope
        );
        assert_eq!(
            ContainerFormat::from_extension("pfx").unwrap(),
            ContainerFormat::Pfx
        );
        assert_eq!(
            ContainerFormat::from_extension("p12").unwrap(),
            ContainerFormat::Pfx
        );
    }

    #[test]
    fn unknown_extension_is_unsupported_without_parsing() {
        match ContainerFormat::from_extension("xyz") {
            Err(Error::UnsupportedFormat(ext)) => assert_eq!(ext, "xyz"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn sm2_container_must_be_base64_text() {
        let err = load_private_key(
            b"!!! not base64 !!!",
            ContainerFormat::Sm2Envelope,
            "pw",
            &DecodeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Base64(_)));
    }

    #[test]
    fn sm2_envelope_with_implausible_blob_is_wrong_password() {
        // A structurally valid envelope whose key blob is too short to be a
        // scalar payload: the decryptor yields nothing and the dispatcher
        // reports the wrong-password category.
        let der = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_i64(1);
                w.next().write_sequence(|w| {
                    w.next().write_oid(&yasna::models::ObjectIdentifier::from_slice(
                        qianshan_core::oid::SM2_DATA,
                    ));
                    w.next().write_oid(&yasna::models::ObjectIdentifier::from_slice(
                        qianshan_core::oid::SM4_CBC,
                    ));
                    w.next().write_bytes(&[0u8; 16]);
                });
                w.next().write_sequence(|w| {
                    w.next().write_oid(&yasna::models::ObjectIdentifier::from_slice(
                        qianshan_core::oid::SM2_DATA,
                    ));
                    w.next().write_bytes(&[0x30, 0x00]);
                });
            });
        });
        let text = base64::engine::general_purpose::STANDARD.encode(&der);

        match load_private_key(
            text.as_bytes(),
            ContainerFormat::Sm2Envelope,
            "pw",
            &DecodeOptions::default(),
        ) {
            Err(Error::WrongPassword) => {}
            other => panic!("expected WrongPassword, got {other:?}"),
        }
    }

    #[test]
    fn pfx_wrong_password_is_not_a_parse_error() {
        use qianshan_pkcs12::pbe::{self, KdfPurpose, MacHash};

        // Minimal PFX: empty SafeContents in a plain-data authSafe, MAC'd
        // with the real password.
        let data_oid = yasna::models::ObjectIdentifier::from_slice(&[1, 2, 840, 113549, 1, 7, 1]);
        let sha1_oid = yasna::models::ObjectIdentifier::from_slice(&[1, 3, 14, 3, 2, 26]);

        let safe_contents = yasna::construct_der(|w| w.write_sequence(|_w| {}));
        let auth_safe = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_oid(&data_oid);
                    w.next().write_tagged(yasna::Tag::context(0), |w| {
                        w.write_bytes(&safe_contents)
                    });
                });
            });
        });

        let bmp = pbe::bmp_string("secret123");
        let mac_key = pbe::kdf_sha1(KdfPurpose::Mac, &bmp, b"macsalt!", 1024, 20);
        let digest = pbe::authsafe_hmac(MacHash::Sha1, &mac_key, &auth_safe);

        let pfx = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_u32(3);
                w.next().write_sequence(|w| {
                    w.next().write_oid(&data_oid);
                    w.next()
                        .write_tagged(yasna::Tag::context(0), |w| w.write_bytes(&auth_safe));
                });
                w.next().write_sequence(|w| {
                    w.next().write_sequence(|w| {
                        w.next().write_sequence(|w| {
                            w.next().write_oid(&sha1_oid);
                            w.next().write_null();
                        });
                        w.next().write_bytes(&digest);
                    });
                    w.next().write_bytes(b"macsalt!");
                    w.next().write_u32(1024);
                });
            });
        });

        match load_private_key(&pfx, ContainerFormat::Pfx, "oops", &DecodeOptions::default()) {
            Err(Error::WrongPassword) => {}
            other => panic!("expected WrongPassword, got {other:?}"),
        }
    }

    #[test]
    fn pfx_garbage_is_a_format_error() {
        let err = load_private_key(
            &[0xDE, 0xAD, 0xBE, 0xEF],
            ContainerFormat::Pfx,
            "pw",
            &DecodeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn decodes_sm2_fixture_file_when_present() {
        let path = std::path::Path::new("../../test-data/sm2/seal.sm2");
        if !path.exists() {
            eprintln!("skipping test: {path:?} not found");
            return;
        }
        let material =
            load_private_key_file(path, "test123", &DecodeOptions::default()).unwrap();
        assert!(material.as_sm2().is_some());
    }
}
