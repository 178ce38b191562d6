use std::future::Future;

use log::{debug, info, warn};
use mongodb::{bson::doc, Client, ClientSession, Database};
use rocket::{
    futures::TryStreamExt,
    http::Status,
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    Request, State,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    common::{CandidateId, VoterId},
    db::{candidate::Candidate, position::Position, voter::Voter},
    mongodb::{u32_id_filter, u32_ids_filter, with_transaction, Coll},
};
use crate::voting::{
    can_submit, can_vote, is_complete,
    tally::{self, Discrepancy},
    Election,
};

use super::{Admitted, Ledger, ResetReceipt, VoteReceipt};

/// The ledger as stored in MongoDB.
///
/// Every mutation runs in a snapshot transaction that reads and writes the
/// voter document, so two concurrent operations on one voter conflict and the
/// loser is retried against fresh state.
#[derive(Clone)]
pub struct MongoLedger {
    client: Client,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
    positions: Coll<Position>,
    max_attempts: u32,
}

impl MongoLedger {
    pub fn new(client: Client, db: &Database, max_attempts: u32) -> Self {
        Self {
            client,
            voters: Coll::from_db(db),
            candidates: Coll::from_db(db),
            positions: Coll::from_db(db),
            max_attempts,
        }
    }

    /// Run `op` in a transaction. Database failures surface as
    /// [`Error::LedgerUnavailable`], since nothing was applied.
    async fn atomically<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn(MongoLedger, ClientSession) -> Fut,
        Fut: Future<Output = (ClientSession, Result<T>)>,
    {
        with_transaction(&self.client, self.max_attempts, |session| {
            op(self.clone(), session)
        })
        .await
        .map_err(|err| match err {
            Error::Db(err) => Error::LedgerUnavailable(err),
            other => other,
        })
    }

    /// The current positions and candidates, outside of any transaction.
    pub async fn election(&self) -> Result<Election> {
        let positions: Vec<Position> = self.positions.find(None, None).await?.try_collect().await?;
        let candidates: Vec<Candidate> =
            self.candidates.find(None, None).await?.try_collect().await?;
        Ok(Election::new(positions, candidates))
    }

    async fn election_in(&self, session: &mut ClientSession) -> Result<Election> {
        let mut cursor = self.positions.find_with_session(None, None, session).await?;
        let positions: Vec<Position> = cursor.stream(session).try_collect().await?;
        let mut cursor = self.candidates.find_with_session(None, None, session).await?;
        let candidates: Vec<Candidate> = cursor.stream(session).try_collect().await?;
        Ok(Election::new(positions, candidates))
    }

    async fn voter_in(&self, session: &mut ClientSession, voter_id: VoterId) -> Result<Voter> {
        self.voters
            .find_one_with_session(u32_id_filter(voter_id), None, session)
            .await?
            .ok_or_else(|| Error::not_found(format!("Voter {voter_id}")))
    }

    async fn cast_in(
        &self,
        session: &mut ClientSession,
        voter_id: VoterId,
        candidate_id: CandidateId,
    ) -> Result<Admitted<VoteReceipt>> {
        let mut voter = self.voter_in(session, voter_id).await?;
        let election = self.election_in(session).await?;
        let admission = match can_vote(&voter, candidate_id, &election) {
            Ok(admission) => admission,
            Err(denial) => return Ok(Err(denial)),
        };

        let filter = doc! {
            "_id": voter_id,
            "has_voted": false,
        };
        let update = doc! {
            "$addToSet": { "ballot": candidate_id },
        };
        let result = self
            .voters
            .update_one_with_session(filter, update, None, session)
            .await?;
        if result.modified_count != 1 {
            // The voter changed after the snapshot was taken.
            return Err(Error::BallotContended);
        }
        self.candidates
            .update_one_with_session(
                u32_id_filter(candidate_id),
                doc! { "$inc": { "vote_count": 1 } },
                None,
                session,
            )
            .await?;

        voter.ballot.insert(candidate_id);
        Ok(Ok(VoteReceipt {
            candidate_id,
            position_id: admission.position_id,
            votes_for_position: admission.votes_for_position,
            cap: admission.cap,
            complete: is_complete(&voter.ballot, &election),
        }))
    }

    /// Undo every count contributed by `voter`'s ballot.
    async fn release_in(&self, session: &mut ClientSession, voter: &Voter) -> Result<Vec<CandidateId>> {
        let released: Vec<CandidateId> = voter.ballot.iter().copied().collect();
        if !released.is_empty() {
            let mut filter = u32_ids_filter(&released);
            filter.insert("vote_count", doc! { "$gt": 0 });
            self.candidates
                .update_many_with_session(filter, doc! { "$inc": { "vote_count": -1 } }, None, session)
                .await?;
        }
        Ok(released)
    }

    async fn reset_in(&self, session: &mut ClientSession, voter_id: VoterId) -> Result<ResetReceipt> {
        let voter = self.voter_in(session, voter_id).await?;
        let released = self.release_in(session, &voter).await?;
        let update = doc! {
            "$set": {
                "ballot": [],
                "has_voted": false,
            },
        };
        self.voters
            .update_one_with_session(u32_id_filter(voter_id), update, None, session)
            .await?;
        Ok(ResetReceipt { voter_id, released })
    }

    async fn submit_in(&self, session: &mut ClientSession, voter_id: VoterId) -> Result<Admitted<()>> {
        let voter = self.voter_in(session, voter_id).await?;
        if let Err(denial) = can_submit(&voter) {
            return Ok(Err(denial));
        }
        if !voter.has_voted {
            self.voters
                .update_one_with_session(
                    u32_id_filter(voter_id),
                    doc! { "$set": { "has_voted": true } },
                    None,
                    session,
                )
                .await?;
        }
        Ok(Ok(()))
    }

    async fn delete_voter_in(
        &self,
        session: &mut ClientSession,
        voter_id: VoterId,
    ) -> Result<ResetReceipt> {
        let voter = self.voter_in(session, voter_id).await?;
        if voter.is_admin {
            return Err(Error::Status(
                Status::Forbidden,
                "Administrators cannot be deleted".to_string(),
            ));
        }
        let released = self.release_in(session, &voter).await?;
        self.voters
            .delete_one_with_session(u32_id_filter(voter_id), None, session)
            .await?;
        Ok(ResetReceipt { voter_id, released })
    }

    async fn delete_candidate_in(
        &self,
        session: &mut ClientSession,
        candidate_id: CandidateId,
    ) -> Result<u64> {
        let result = self
            .candidates
            .delete_one_with_session(u32_id_filter(candidate_id), None, session)
            .await?;
        if result.deleted_count == 0 {
            return Err(Error::not_found(format!("Candidate {candidate_id}")));
        }
        let pulled = self
            .voters
            .update_many_with_session(
                doc! { "ballot": candidate_id },
                doc! { "$pull": { "ballot": candidate_id } },
                None,
                session,
            )
            .await?;
        Ok(pulled.modified_count)
    }

    async fn audit_in(&self, session: &mut ClientSession) -> Result<Vec<Discrepancy>> {
        let election = self.election_in(session).await?;
        let mut cursor = self.voters.find_with_session(None, None, session).await?;
        let voters: Vec<Voter> = cursor.stream(session).try_collect().await?;
        Ok(tally::audit(&election, voters.iter().map(|voter| &voter.ballot)))
    }

    async fn repair_in(&self, session: &mut ClientSession) -> Result<Vec<Discrepancy>> {
        let discrepancies = self.audit_in(session).await?;
        for discrepancy in &discrepancies {
            self.candidates
                .update_one_with_session(
                    u32_id_filter(discrepancy.candidate_id),
                    doc! { "$set": { "vote_count": discrepancy.actual } },
                    None,
                    session,
                )
                .await?;
        }
        Ok(discrepancies)
    }

    /// Delete a student, undoing every vote they cast.
    pub async fn delete_voter(&self, voter_id: VoterId) -> Result<ResetReceipt> {
        let receipt = self
            .atomically(move |ledger, mut session| async move {
                let result = ledger.delete_voter_in(&mut session, voter_id).await;
                (session, result)
            })
            .await?;
        info!(
            "Deleted voter {voter_id}, releasing {} vote(s)",
            receipt.released.len()
        );
        Ok(receipt)
    }

    /// Delete a candidate and remove them from every ballot.
    pub async fn delete_candidate(&self, candidate_id: CandidateId) -> Result<()> {
        let pulled = self
            .atomically(move |ledger, mut session| async move {
                let result = ledger.delete_candidate_in(&mut session, candidate_id).await;
                (session, result)
            })
            .await?;
        info!("Deleted candidate {candidate_id}, removing them from {pulled} ballot(s)");
        Ok(())
    }

    /// Compare every stored count with ballot membership.
    pub async fn audit(&self) -> Result<Vec<Discrepancy>> {
        self.atomically(|ledger, mut session| async move {
            let result = ledger.audit_in(&mut session).await;
            (session, result)
        })
        .await
    }

    /// Rewrite every drifted count from ballot membership, returning what
    /// was corrected.
    pub async fn repair(&self) -> Result<Vec<Discrepancy>> {
        let repaired = self
            .atomically(|ledger, mut session| async move {
                let result = ledger.repair_in(&mut session).await;
                (session, result)
            })
            .await?;
        for discrepancy in &repaired {
            warn!(
                "Repaired count of candidate {} from {} to {}",
                discrepancy.candidate_id, discrepancy.stored, discrepancy.actual
            );
        }
        Ok(repaired)
    }
}

#[rocket::async_trait]
impl Ledger for MongoLedger {
    async fn cast_vote(
        &self,
        voter_id: VoterId,
        candidate_id: CandidateId,
    ) -> Result<Admitted<VoteReceipt>> {
        let outcome = self
            .atomically(move |ledger, mut session| async move {
                let result = ledger.cast_in(&mut session, voter_id, candidate_id).await;
                (session, result)
            })
            .await?;
        match &outcome {
            Ok(_) => info!("Voter {voter_id} voted for candidate {candidate_id}"),
            Err(denial) => debug!("Vote by {voter_id} for candidate {candidate_id} denied: {denial}"),
        }
        Ok(outcome)
    }

    async fn reset_vote(&self, voter_id: VoterId) -> Result<ResetReceipt> {
        let receipt = self
            .atomically(move |ledger, mut session| async move {
                let result = ledger.reset_in(&mut session, voter_id).await;
                (session, result)
            })
            .await?;
        info!(
            "Reset ballot of voter {voter_id}, releasing {} vote(s)",
            receipt.released.len()
        );
        Ok(receipt)
    }

    async fn submit_ballot(&self, voter_id: VoterId) -> Result<Admitted<()>> {
        let outcome = self
            .atomically(move |ledger, mut session| async move {
                let result = ledger.submit_in(&mut session, voter_id).await;
                (session, result)
            })
            .await?;
        match &outcome {
            Ok(()) => info!("Voter {voter_id} submitted their ballot"),
            Err(denial) => debug!("Submission by {voter_id} denied: {denial}"),
        }
        Ok(outcome)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for MongoLedger {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let client = try_outcome!(req.guard::<&State<Client>>().await);
        let db = try_outcome!(req.guard::<&State<Database>>().await);
        let config = try_outcome!(req.guard::<&State<Config>>().await);
        Outcome::Success(MongoLedger::new(
            Client::clone(client),
            db,
            config.max_transaction_attempts(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::futures::future::join_all;

    use crate::model::db::{candidate::CandidateCore, position::PositionCore, voter::VoterCore};
    use crate::voting::Denial;

    use super::*;

    /// President (cap 1) with candidates 1 and 2, Senator (cap 2) with 3, 4
    /// and 5, and one student with ID [`STUDENT`].
    const STUDENT: VoterId = 100;

    async fn seed(db: &Database) {
        Coll::<Position>::from_db(db)
            .insert_many(
                [
                    Position::new(1, PositionCore::example("President", 1, 1)),
                    Position::new(2, PositionCore::example("Senator", 2, 2)),
                ],
                None,
            )
            .await
            .unwrap();
        let candidates = (1..=5).map(|id| {
            let position = if id <= 2 { 1 } else { 2 };
            Candidate::new(id, CandidateCore::example(&format!("C{id}"), position, 1))
        });
        Coll::<Candidate>::from_db(db)
            .insert_many(candidates, None)
            .await
            .unwrap();
        Coll::<Voter>::from_db(db)
            .insert_one(Voter::new(STUDENT, VoterCore::example()), None)
            .await
            .unwrap();
    }

    async fn ledger(db: &Database) -> MongoLedger {
        MongoLedger::new(crate::db_client().await, db, 10)
    }

    async fn count(db: &Database, id: CandidateId) -> u32 {
        Coll::<Candidate>::from_db(db)
            .find_one(u32_id_filter(id), None)
            .await
            .unwrap()
            .unwrap()
            .vote_count
    }

    #[backend_test]
    async fn cast_then_reset(db: Database) {
        seed(&db).await;
        let ledger = ledger(&db).await;

        let receipt = ledger.cast_vote(STUDENT, 1).await.unwrap().unwrap();
        assert_eq!(receipt.position_id, 1);
        assert!(!receipt.complete);
        assert_eq!(
            ledger.cast_vote(STUDENT, 2).await.unwrap(),
            Err(Denial::PositionCapExceeded { cap: 1 })
        );
        assert_eq!(ledger.cast_vote(STUDENT, 1).await.unwrap(), Err(Denial::DuplicateVote));
        ledger.cast_vote(STUDENT, 3).await.unwrap().unwrap();
        let receipt = ledger.cast_vote(STUDENT, 4).await.unwrap().unwrap();
        assert!(receipt.complete);
        assert_eq!(count(&db, 1).await, 1);
        assert_eq!(count(&db, 2).await, 0);

        let receipt = ledger.reset_vote(STUDENT).await.unwrap();
        assert_eq!(receipt.released, vec![1, 3, 4]);
        for id in 1..=5 {
            assert_eq!(count(&db, id).await, 0);
        }
        // A second reset changes nothing.
        assert!(ledger.reset_vote(STUDENT).await.unwrap().released.is_empty());
        assert!(ledger.audit().await.unwrap().is_empty());
    }

    #[backend_test]
    async fn submission_freezes_ballot(db: Database) {
        seed(&db).await;
        let ledger = ledger(&db).await;
        ledger.cast_vote(STUDENT, 3).await.unwrap().unwrap();
        assert_eq!(ledger.submit_ballot(STUDENT).await.unwrap(), Ok(()));
        assert_eq!(ledger.submit_ballot(STUDENT).await.unwrap(), Ok(()));
        assert_eq!(ledger.cast_vote(STUDENT, 4).await.unwrap(), Err(Denial::BallotSubmitted));

        ledger.reset_vote(STUDENT).await.unwrap();
        assert!(ledger.cast_vote(STUDENT, 4).await.unwrap().is_ok());
    }

    #[backend_test]
    async fn concurrent_casts_respect_cap(db: Database) {
        seed(&db).await;
        let ledger = ledger(&db).await;

        let outcomes = join_all((3..=5).map(|id| ledger.cast_vote(STUDENT, id))).await;
        let admitted = outcomes
            .into_iter()
            .filter(|outcome| matches!(outcome, Ok(Ok(_))))
            .count();
        assert!(admitted <= 2);

        let voter = ledger
            .voters
            .find_one(u32_id_filter(STUDENT), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voter.ballot.len(), admitted);
        assert!(ledger.audit().await.unwrap().is_empty());
    }

    #[backend_test]
    async fn deleting_candidate_cleans_ballots(db: Database) {
        seed(&db).await;
        let ledger = ledger(&db).await;
        ledger.cast_vote(STUDENT, 3).await.unwrap().unwrap();
        ledger.delete_candidate(3).await.unwrap();

        let voter = ledger.voters.find_one(u32_id_filter(STUDENT), None).await.unwrap().unwrap();
        assert!(voter.ballot.is_empty());
        assert!(matches!(
            ledger.delete_candidate(3).await,
            Err(Error::Status(status, _)) if status == Status::NotFound
        ));
    }

    #[backend_test]
    async fn deleting_voter_releases_votes(db: Database) {
        seed(&db).await;
        let ledger = ledger(&db).await;
        ledger.cast_vote(STUDENT, 1).await.unwrap().unwrap();
        ledger.delete_voter(STUDENT).await.unwrap();
        assert_eq!(count(&db, 1).await, 0);
        assert!(matches!(
            ledger.cast_vote(STUDENT, 2).await,
            Err(Error::Status(status, _)) if status == Status::NotFound
        ));
    }

    #[backend_test]
    async fn repair_fixes_drift(db: Database) {
        seed(&db).await;
        let ledger = ledger(&db).await;
        ledger.cast_vote(STUDENT, 1).await.unwrap().unwrap();
        ledger
            .candidates
            .update_one(u32_id_filter(1), doc! { "$set": { "vote_count": 7 } }, None)
            .await
            .unwrap();

        let repaired = ledger.repair().await.unwrap();
        assert_eq!(
            repaired,
            vec![Discrepancy {
                candidate_id: 1,
                stored: 7,
                actual: 1,
            }]
        );
        assert_eq!(count(&db, 1).await, 1);
        assert!(ledger.audit().await.unwrap().is_empty());
    }

    #[backend_test]
    async fn admins_are_refused(db: Database) {
        seed(&db).await;
        // Setup created an administrator from the config.
        let admin = Coll::<Voter>::from_db(&db)
            .find_one(doc! { "is_admin": true }, None)
            .await
            .unwrap()
            .unwrap();
        let ledger = ledger(&db).await;
        assert_eq!(ledger.cast_vote(admin.id, 1).await.unwrap(), Err(Denial::AdminCannotVote));
        assert_eq!(ledger.submit_ballot(admin.id).await.unwrap(), Err(Denial::AdminCannotVote));
        assert!(matches!(
            ledger.delete_voter(admin.id).await,
            Err(Error::Status(status, _)) if status == Status::Forbidden
        ));
    }
}
