mod bson;
mod collection;
mod counter;
mod errors;
mod transaction;

pub use bson::{u32_id_filter, u32_ids_filter};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{
    ensure_counters_exist, Counter, CANDIDATE_ID_COUNTER_ID, PARTY_LIST_ID_COUNTER_ID,
    POSITION_ID_COUNTER_ID, VOTER_ID_COUNTER_ID,
};
pub use errors::is_duplicate_key_error;
pub use transaction::with_transaction;
