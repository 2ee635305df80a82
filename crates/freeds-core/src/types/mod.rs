//! Type definitions for FreeDS plugin manifests

pub mod manifest_types;

pub use manifest_types::*;
