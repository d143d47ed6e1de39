#![forbid(unsafe_code)]

//! Shared types for the Qianshan key-container library.

mod error;
pub mod oid;

pub use error::{Error, Result};
