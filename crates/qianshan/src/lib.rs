#![forbid(unsafe_code)]

pub use qianshan_core as core;
pub use qianshan_envelope as envelope;
pub use qianshan_keys as keys;
pub use qianshan_pkcs12 as pkcs12;
