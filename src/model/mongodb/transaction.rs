use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use mongodb::{
    error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::{Acknowledgment, ReadConcern, TransactionOptions, WriteConcern},
    Client, ClientSession,
};
use rand::Rng;
use rocket::tokio;

use crate::error::{Error, Result};

/// Run `op` inside a multi-document transaction, committing if it succeeds
/// and aborting if it fails.
///
/// Transactions that lose a write conflict (or hit any other transient
/// failure) are retried from scratch, up to `max_attempts` in total. The
/// session is moved into `op` and handed back with its result so that the
/// operation can own clones of whatever collections it needs.
pub async fn with_transaction<T, F, Fut>(client: &Client, max_attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut(ClientSession) -> Fut,
    Fut: Future<Output = (ClientSession, Result<T>)>,
{
    let mut session = client.start_session(None).await?;
    let mut attempt = 1;
    loop {
        session.start_transaction(transaction_options()).await?;
        let (returned, result) = op(session).await;
        session = returned;

        let outcome = match result {
            Ok(value) => commit(&mut session, max_attempts)
                .await
                .map(|()| value)
                .map_err(Error::from),
            Err(err) => {
                // The server may already have aborted it; nothing to do then.
                let _ = session.abort_transaction().await;
                Err(err)
            }
        };

        match outcome {
            Err(Error::Db(ref err)) if is_transient(err) && attempt < max_attempts => {
                warn!("Transaction attempt {attempt}/{max_attempts} hit a transient error: {err}");
                backoff(attempt).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn transaction_options() -> TransactionOptions {
    TransactionOptions::builder()
        .read_concern(ReadConcern::snapshot())
        .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
        .build()
}

/// Commit, retrying while the outcome of the commit itself is unknown.
async fn commit(session: &mut ClientSession, max_attempts: u32) -> std::result::Result<(), DbError> {
    let mut attempt = 1;
    loop {
        match session.commit_transaction().await {
            Err(err)
                if err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                    && attempt < max_attempts =>
            {
                debug!("Retrying commit with unknown result: {err}");
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn is_transient(err: &DbError) -> bool {
    err.contains_label(TRANSIENT_TRANSACTION_ERROR)
}

/// Sleep for a short, growing, jittered interval so that conflicting
/// transactions do not retry in lockstep.
async fn backoff(attempt: u32) {
    // The scoped block is needed to force `rng` to be dropped before the `await`.
    let delay = {
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(5..25) * u64::from(attempt))
    };
    tokio::time::sleep(delay).await;
}
