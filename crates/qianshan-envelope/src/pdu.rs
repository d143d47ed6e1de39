#![forbid(unsafe_code)]

//! DER parsing of the SM2 envelope PDU.
//!
//! ```text
//! EnvelopePdu ::= SEQUENCE {
//!     version      INTEGER,
//!     privateKey   SEQUENCE { contentType OID, encryptionScheme OID, content ANY },
//!     certificate  SEQUENCE { contentType OID, content ANY }
//! }
//! ```
//!
//! The two `content` fields are extracted as the raw content octets of
//! whichever element is present and handed to later stages untouched; the
//! decoder performs no semantic interpretation of the opaque payloads and
//! does not enforce the algorithm identifiers. The format defines no
//! extensions, so any bytes left over after the outer SEQUENCE are treated
//! as corruption.

use qianshan_core::{Error, Result};
use yasna::models::ObjectIdentifier;
use yasna::BERReader;

/// The encrypted-key half of the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKeyContent {
    /// Names the plaintext content type (SM2 data in well-formed files).
    pub content_type: ObjectIdentifier,
    /// Names the scheme protecting the blob (SM4-CBC in well-formed files).
    pub encryption_scheme: ObjectIdentifier,
    /// The encrypted private scalar, possibly re-encoded by the producer.
    pub content: Vec<u8>,
}

/// The certificate half of the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateContent {
    pub content_type: ObjectIdentifier,
    /// A DER-encoded X.509 certificate, opaque at this stage.
    pub content: Vec<u8>,
}

/// The parsed top-level container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopePdu {
    pub version: i64,
    pub private_key: PrivateKeyContent,
    pub certificate: CertificateContent,
}

/// Parse an envelope from raw DER bytes.
///
/// Fails with [`Error::Format`] when the grammar does not match or when
/// trailing bytes remain after the structure is fully consumed.
pub fn parse_envelope(data: &[u8]) -> Result<EnvelopePdu> {
    yasna::parse_der(data, |r| {
        r.read_sequence(|r| {
            let version = r.next().read_i64()?;

            let private_key = r.next().read_sequence(|r| {
                let content_type = r.next().read_oid()?;
                let encryption_scheme = r.next().read_oid()?;
                let content = read_opaque(r.next())?;
                Ok(PrivateKeyContent {
                    content_type,
                    encryption_scheme,
                    content,
                })
            })?;

            let certificate = r.next().read_sequence(|r| {
                let content_type = r.next().read_oid()?;
                let content = read_opaque(r.next())?;
                Ok(CertificateContent {
                    content_type,
                    content,
                })
            })?;

            Ok(EnvelopePdu {
                version,
                private_key,
                certificate,
            })
        })
    })
    .map_err(|e| Error::Format(format!("failed to parse SM2 envelope: {e}")))
}

/// Read the next element whatever its tag and return its content octets.
fn read_opaque(r: BERReader) -> yasna::ASN1Result<Vec<u8>> {
    let raw = r.read_tagged_der()?;
    Ok(raw.value().to_vec())
}
