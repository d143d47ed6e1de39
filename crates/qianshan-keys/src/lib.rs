#![forbid(unsafe_code)]

//! Key material types and container loading for Qianshan.

pub mod key;
pub mod loader;

pub use key::PrivateKeyMaterial;
pub use loader::ContainerFormat;
