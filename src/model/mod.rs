//! Data types, in their database and API representations.

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
