#![forbid(unsafe_code)]

//! BER parsing of the PFX container (RFC 7292).
//!
//! PKCS#12 files are BER, not strict DER, so everything goes through
//! `yasna::parse_ber`. Structural failures map to
//! [`qianshan_core::Error::Format`]; a MAC mismatch maps to
//! [`qianshan_core::Error::WrongPassword`].

use qianshan_core::{Error, Result};
use yasna::models::ObjectIdentifier;
use yasna::{ASN1Error, ASN1ErrorKind, BERReader, BERReaderSeq, Tag};

use crate::pbe::{self, KdfPurpose, MacHash, PbeScheme, Prf};
use crate::PfxContents;

// PKCS#7 content types
const OID_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
const OID_ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];

// PKCS#12 bag types
const OID_SHROUDED_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 2];
const OID_CERT_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 3];
const OID_X509_CERT: &[u64] = &[1, 2, 840, 113549, 1, 9, 22, 1];

// Encryption schemes
const OID_PBE_SHA1_3DES: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 3];
const OID_PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
const OID_PBKDF2: &[u64] = &[1, 2, 840, 113549, 1, 5, 12];
const OID_AES_256_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 42];

// Digests and PRFs
const OID_SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
const OID_SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
const OID_HMAC_SHA1: &[u64] = &[1, 2, 840, 113549, 2, 7];
const OID_HMAC_SHA256: &[u64] = &[1, 2, 840, 113549, 2, 9];

fn oid(components: &[u64]) -> ObjectIdentifier {
    ObjectIdentifier::from_slice(components)
}

fn invalid() -> ASN1Error {
    ASN1Error::new(ASN1ErrorKind::Invalid)
}

struct MacData {
    hash: MacHash,
    digest: Vec<u8>,
    salt: Vec<u8>,
    iterations: u32,
}

enum ContentInfo {
    Data(Vec<u8>),
    Encrypted {
        scheme: PbeScheme,
        ciphertext: Vec<u8>,
    },
}

enum SafeBag {
    ShroudedKey {
        scheme: PbeScheme,
        ciphertext: Vec<u8>,
    },
    Cert(Vec<u8>),
    Skipped,
}

pub fn parse(data: &[u8], password: &str) -> Result<PfxContents> {
    let (auth_safe, mac_data) = yasna::parse_ber(data, |r| {
        r.read_sequence(|r| {
            let version = r.next().read_u32()?;
            if version != 3 {
                return Err(invalid());
            }
            let auth_safe = match read_content_info(r.next())? {
                ContentInfo::Data(data) => data,
                // An encrypted authSafe would need a public-key envelope;
                // the password-protected profile always uses plain data.
                ContentInfo::Encrypted { .. } => return Err(invalid()),
            };
            let mac_data = r.read_optional(read_mac_data)?;
            Ok((auth_safe, mac_data))
        })
    })
    .map_err(|e| Error::Format(format!("failed to parse PFX: {e}")))?;

    let bmp_password = pbe::bmp_string(password);

    if let Some(mac) = mac_data {
        check_mac(&mac, &auth_safe, &bmp_password)?;
    }

    let content_infos = yasna::parse_ber(&auth_safe, |r| {
        r.collect_sequence_of(read_content_info)
    })
    .map_err(|e| Error::Format(format!("failed to parse authSafe: {e}")))?;

    let mut contents = PfxContents::default();
    for info in content_infos {
        let safe_contents = match info {
            ContentInfo::Data(data) => data,
            ContentInfo::Encrypted { scheme, ciphertext } => {
                pbe::decrypt(&scheme, &ciphertext, password, &bmp_password)?
            }
        };

        let bags = yasna::parse_ber(&safe_contents, |r| r.collect_sequence_of(read_safe_bag))
            .map_err(|e| Error::Format(format!("failed to parse SafeContents: {e}")))?;

        for bag in bags {
            match bag {
                SafeBag::ShroudedKey { scheme, ciphertext } => {
                    let pkcs8 = pbe::decrypt(&scheme, &ciphertext, password, &bmp_password)?;
                    contents.keys.push(pkcs8);
                }
                SafeBag::Cert(der) => contents.certificates.push(der),
                SafeBag::Skipped => {}
            }
        }
    }

    Ok(contents)
}

/// ContentInfo: an OID naming either plain data (`[0] OCTET STRING`) or
/// PKCS#7 EncryptedData.
fn read_content_info(r: BERReader) -> yasna::ASN1Result<ContentInfo> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;
        if content_type == oid(OID_DATA) {
            let data = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
            Ok(ContentInfo::Data(data))
        } else if content_type == oid(OID_ENCRYPTED_DATA) {
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let _version = r.next().read_u32()?;
                    r.next().read_sequence(|r| {
                        let _inner_type = r.next().read_oid()?;
                        let scheme = read_encryption_scheme(r.next())?;
                        let ciphertext = r
                            .next()
                            .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                        Ok(ContentInfo::Encrypted { scheme, ciphertext })
                    })
                })
            })
        } else {
            Err(invalid())
        }
    })
}

fn read_safe_bag(r: BERReader) -> yasna::ASN1Result<SafeBag> {
    r.read_sequence(|r| {
        let bag_type = r.next().read_oid()?;
        let bag = if bag_type == oid(OID_SHROUDED_KEY_BAG) {
            // [0] EXPLICIT EncryptedPrivateKeyInfo
            let (scheme, ciphertext) = r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let scheme = read_encryption_scheme(r.next())?;
                    let ciphertext = r.next().read_bytes()?;
                    Ok((scheme, ciphertext))
                })
            })?;
            SafeBag::ShroudedKey { scheme, ciphertext }
        } else if bag_type == oid(OID_CERT_BAG) {
            let der = r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let cert_type = r.next().read_oid()?;
                    if cert_type != oid(OID_X509_CERT) {
                        return Err(invalid());
                    }
                    r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
                })
            })?;
            SafeBag::Cert(der)
        } else {
            let _value = r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            SafeBag::Skipped
        };
        skip_bag_attributes(r)?;
        Ok(bag)
    })
}

/// Bag attributes (friendlyName, localKeyId, ...) carry nothing the
/// fallback path needs; read and discard.
fn skip_bag_attributes(r: &mut BERReaderSeq) -> yasna::ASN1Result<()> {
    let _ = r.read_optional(|r| {
        r.read_set_of(|r| {
            r.read_sequence(|r| {
                let _attr_type = r.next().read_oid()?;
                r.next().read_set_of(|r| {
                    let _ = r.read_der()?;
                    Ok(())
                })
            })
        })
    })?;
    Ok(())
}

fn read_encryption_scheme(r: BERReader) -> yasna::ASN1Result<PbeScheme> {
    r.read_sequence(|r| {
        let alg = r.next().read_oid()?;
        if alg == oid(OID_PBE_SHA1_3DES) {
            r.next().read_sequence(|r| {
                let salt = r.next().read_bytes()?;
                let iterations = r.next().read_u32()?;
                Ok(PbeScheme::LegacySha1TripleDes { salt, iterations })
            })
        } else if alg == oid(OID_PBES2) {
            r.next().read_sequence(|r| {
                let (salt, iterations, prf) = r.next().read_sequence(|r| {
                    let kdf = r.next().read_oid()?;
                    if kdf != oid(OID_PBKDF2) {
                        return Err(invalid());
                    }
                    r.next().read_sequence(read_pbkdf2_params)
                })?;
                let iv = r.next().read_sequence(|r| {
                    let cipher = r.next().read_oid()?;
                    if cipher != oid(OID_AES_256_CBC) {
                        return Err(invalid());
                    }
                    r.next().read_bytes()
                })?;
                Ok(PbeScheme::Pbkdf2Aes256Cbc {
                    salt,
                    iterations,
                    prf,
                    iv,
                })
            })
        } else {
            Err(invalid())
        }
    })
}

/// PBKDF2-params: salt, iterationCount, then optional keyLength (INTEGER)
/// and optional prf (SEQUENCE), both of which may be absent.
fn read_pbkdf2_params(r: &mut BERReaderSeq) -> yasna::ASN1Result<(Vec<u8>, u32, Prf)> {
    let salt = r.next().read_bytes()?;
    let iterations = r.next().read_u32()?;

    let mut prf = Prf::HmacSha1; // RFC 8018 default

    // Tell the two optionals apart by the leading tag byte.
    if let Some(der) = r.read_optional(|r| r.read_der())? {
        if der.first() == Some(&0x30) {
            prf = read_prf(&der)?;
        } else if let Some(prf_der) = r.read_optional(|r| r.read_der())? {
            prf = read_prf(&prf_der)?;
        }
    }

    Ok((salt, iterations, prf))
}

fn read_prf(der: &[u8]) -> yasna::ASN1Result<Prf> {
    yasna::parse_der(der, |r| {
        r.read_sequence(|r| {
            let alg = r.next().read_oid()?;
            let _params = r.read_optional(|r| r.read_null())?;
            if alg == oid(OID_HMAC_SHA1) {
                Ok(Prf::HmacSha1)
            } else if alg == oid(OID_HMAC_SHA256) {
                Ok(Prf::HmacSha256)
            } else {
                Err(invalid())
            }
        })
    })
}

/// macData: DigestInfo, macSalt, optional iteration count (default 1).
fn read_mac_data(r: BERReader) -> yasna::ASN1Result<MacData> {
    r.read_sequence(|r| {
        let (hash, digest) = r.next().read_sequence(|r| {
            let hash = r.next().read_sequence(|r| {
                let alg = r.next().read_oid()?;
                let _params = r.read_optional(|r| r.read_null())?;
                if alg == oid(OID_SHA1) {
                    Ok(MacHash::Sha1)
                } else if alg == oid(OID_SHA256) {
                    Ok(MacHash::Sha256)
                } else {
                    Err(invalid())
                }
            })?;
            let digest = r.next().read_bytes()?;
            Ok((hash, digest))
        })?;
        let salt = r.next().read_bytes()?;
        let iterations = r.read_optional(|r| r.read_u32())?.unwrap_or(1);
        Ok(MacData {
            hash,
            digest,
            salt,
            iterations,
        })
    })
}

fn check_mac(mac: &MacData, auth_safe: &[u8], bmp_password: &[u8]) -> Result<()> {
    let computed = match mac.hash {
        MacHash::Sha1 => {
            let key = pbe::kdf_sha1(KdfPurpose::Mac, bmp_password, &mac.salt, mac.iterations, 20);
            pbe::authsafe_hmac(MacHash::Sha1, &key, auth_safe)
        }
        MacHash::Sha256 => {
            let key =
                pbe::kdf_sha256(KdfPurpose::Mac, bmp_password, &mac.salt, mac.iterations, 32);
            pbe::authsafe_hmac(MacHash::Sha256, &key, auth_safe)
        }
    };

    if computed != mac.digest {
        return Err(Error::WrongPassword);
    }
    Ok(())
}
