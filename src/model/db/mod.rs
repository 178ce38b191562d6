//! DB-compatible (e.g. de/serialisable) types.
//!
//! Every document is keyed by a `u32` taken from an auto-increment
//! [`crate::model::mongodb::Counter`], except the singleton settings.

pub mod candidate;
pub mod party_list;
pub mod position;
pub mod settings;
pub mod voter;
