//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as `id` rather than `_id`.
//! - Vote counts are only present in views built for administrators.

pub mod admin;
pub mod auth;
pub mod ballot;
pub mod candidate;
pub mod election;
pub mod pagination;
pub mod party_list;
pub mod position;
pub mod settings;
pub mod student;
