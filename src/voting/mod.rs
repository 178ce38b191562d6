//! The voting rules, independent of any storage.

mod admission;
mod completion;
mod election;
pub mod tally;

pub use admission::{can_submit, can_vote, Admission, Denial};
pub use completion::{is_complete, remaining};
pub use election::Election;
