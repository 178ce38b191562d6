//! Types shared between the API and the database representations.

pub mod ballot;
pub mod category;
pub mod level;

/// Unique voter (student or administrator) ID.
pub type VoterId = u32;

/// Unique candidate ID.
pub type CandidateId = u32;

/// Unique position ID.
pub type PositionId = u32;

/// Unique party list ID.
pub type PartyListId = u32;
