#![forbid(unsafe_code)]

//! Object identifiers used by GM/T key containers.
//!
//! Given as component slices for use with `yasna`. The envelope decoder
//! records these alongside the opaque payloads but does not enforce them;
//! dotted-string forms for the `der`/`x509-cert` side live next to the code
//! that needs them.

/// SM2 data content type: 1.2.156.10197.6.1.4.2.1
pub const SM2_DATA: &[u64] = &[1, 2, 156, 10197, 6, 1, 4, 2, 1];

/// SM4 in CBC mode: 1.2.156.10197.1.104
pub const SM4_CBC: &[u64] = &[1, 2, 156, 10197, 1, 104];

/// id-ecPublicKey: 1.2.840.10045.2.1
pub const ID_EC_PUBLIC_KEY: &[u64] = &[1, 2, 840, 10045, 2, 1];

/// The SM2 curve: 1.2.156.10197.1.301
pub const SM2_CURVE: &[u64] = &[1, 2, 156, 10197, 1, 301];
