use log::debug;
use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
    ClientSession,
};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Coll;

pub const VOTER_ID_COUNTER_ID: &str = "voter_id";
pub const CANDIDATE_ID_COUNTER_ID: &str = "candidate_id";
pub const POSITION_ID_COUNTER_ID: &str = "position_id";
pub const PARTY_LIST_ID_COUNTER_ID: &str = "party_list_id";

const ALL_COUNTERS: [&str; 4] = [
    VOTER_ID_COUNTER_ID,
    CANDIDATE_ID_COUNTER_ID,
    POSITION_ID_COUNTER_ID,
    PARTY_LIST_ID_COUNTER_ID,
];

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Create a new `Counter` starting at the given value.
    pub fn new(id: impl Into<String>, start: u32) -> Self {
        Self {
            id: id.into(),
            next: start,
        }
    }

    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32> {
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, Self::increment(), Self::options())
            .await?;
        Self::value_of(counter, id)
    }

    /// As [`Counter::next`], but within a session.
    pub async fn next_with_session(
        counters: &Coll<Counter>,
        id: &str,
        session: &mut ClientSession,
    ) -> Result<u32> {
        let counter = counters
            .find_one_and_update_with_session(
                doc! { "_id": id },
                Self::increment(),
                Self::options(),
                session,
            )
            .await?;
        Self::value_of(counter, id)
    }

    fn increment() -> mongodb::bson::Document {
        doc! {
            "$inc": { "next": 1 }
        }
    }

    fn options() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build()
    }

    fn value_of(counter: Option<Counter>, id: &str) -> Result<u32> {
        counter.map(|c| c.next).ok_or_else(|| {
            Error::Status(
                Status::InternalServerError,
                format!("Failed to find counter with ID {id}"),
            )
        })
    }
}

/// Ensure every ID counter exists, starting at 1.
///
/// This operation is idempotent and never resets an existing counter.
pub async fn ensure_counters_exist(counters: &Coll<Counter>) -> std::result::Result<(), DbError> {
    debug!("Ensuring ID counters exist");
    let upsert = UpdateOptions::builder().upsert(true).build();
    for id in ALL_COUNTERS {
        let update = doc! {
            "$setOnInsert": { "next": 1 }
        };
        counters
            .update_one(doc! { "_id": id }, update, upsert.clone())
            .await?;
    }
    Ok(())
}
