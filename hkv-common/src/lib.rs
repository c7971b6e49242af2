// hkv-common - Shared types for the HybridKV client façade
//
// This crate defines the geo domain types, the nullable result wrapper and
// the error types seen by façade callers.

pub mod convert;
pub mod error;
pub mod nullable;
pub mod types;

// Re-export for convenience
pub use convert::*;
pub use error::*;
pub use nullable::*;
pub use types::*;
