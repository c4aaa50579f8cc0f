//! Core domain types
//!
//! This module contains the typed pipeline model. A pipeline is declared in
//! fragment files, merged and selected as an untyped document, then converted
//! into these types before normalization. Normalization mutates them in place
//! and the result is handed to the deployer.

pub mod pipeline;
pub mod task;
pub mod trigger;

/// Open-ended passthrough value (volume specs, env entries, sidecars)
///
/// These are forwarded verbatim to the cluster and never interpreted by the compiler.
pub type Opaque = serde_json::Value;

pub(crate) fn is_zero(value: &u32) -> bool {
    *value == 0
}
