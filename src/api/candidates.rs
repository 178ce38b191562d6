use log::info;
use mongodb::{
    bson::{doc, Document},
    Client, ClientSession,
};
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::{Error, Result},
    ledger::MongoLedger,
    model::{
        api::{
            auth::{Admin, AuthToken},
            candidate::{CandidatePatch, CandidateSpec, CandidateView},
        },
        common::{CandidateId, PartyListId, PositionId},
        db::{candidate::Candidate, party_list::PartyList, position::Position},
        mongodb::{u32_id_filter, with_transaction, Coll, Counter, CANDIDATE_ID_COUNTER_ID},
    },
};

pub fn routes() -> Vec<Route> {
    routes![create_candidate, update_candidate, delete_candidate]
}

async fn ensure_references_exist(
    positions: &Coll<Position>,
    party_lists: &Coll<PartyList>,
    position_id: Option<PositionId>,
    party_list_id: Option<PartyListId>,
    session: &mut ClientSession,
) -> Result<()> {
    if let Some(id) = position_id {
        positions
            .find_one_with_session(u32_id_filter(id), None, session)
            .await?
            .ok_or_else(|| Error::not_found(format!("Position {id}")))?;
    }
    if let Some(id) = party_list_id {
        party_lists
            .find_one_with_session(u32_id_filter(id), None, session)
            .await?
            .ok_or_else(|| Error::not_found(format!("Party list {id}")))?;
    }
    Ok(())
}

/// Collections touched when creating or editing a candidate.
#[derive(Clone)]
struct Rosters {
    candidates: Coll<Candidate>,
    positions: Coll<Position>,
    party_lists: Coll<PartyList>,
    counters: Coll<Counter>,
}

impl Rosters {
    async fn create_in(&self, spec: CandidateSpec, session: &mut ClientSession) -> Result<Candidate> {
        let candidate = spec.into_candidate().map_err(Error::bad_request)?;
        ensure_references_exist(
            &self.positions,
            &self.party_lists,
            Some(candidate.position_id),
            Some(candidate.party_list_id),
            session,
        )
        .await?;
        let id = Counter::next_with_session(&self.counters, CANDIDATE_ID_COUNTER_ID, session).await?;
        let candidate = Candidate::new(id, candidate);
        self.candidates
            .insert_one_with_session(&candidate, None, session)
            .await?;
        Ok(candidate)
    }

    async fn update_in(
        &self,
        candidate_id: CandidateId,
        patch: CandidatePatch,
        session: &mut ClientSession,
    ) -> Result<Candidate> {
        let filter = u32_id_filter(candidate_id);
        let current = self
            .candidates
            .find_one_with_session(filter.clone(), None, session)
            .await?
            .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))?;

        let moving = patch
            .position_id
            .filter(|&position_id| position_id != current.position_id);
        if moving.is_some() && current.vote_count > 0 {
            return Err(Error::Status(
                Status::Conflict,
                format!(
                    "Candidate {candidate_id} already has {} vote(s) and cannot change position",
                    current.vote_count
                ),
            ));
        }
        ensure_references_exist(
            &self.positions,
            &self.party_lists,
            moving,
            patch.party_list_id,
            session,
        )
        .await?;

        let set = patch_to_set(patch)?;
        self.candidates
            .update_one_with_session(filter.clone(), doc! { "$set": set }, None, session)
            .await?;
        self.candidates
            .find_one_with_session(filter, None, session)
            .await?
            .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))
    }
}

fn patch_to_set(patch: CandidatePatch) -> Result<Document> {
    let mut set = Document::new();
    if let Some(name) = patch.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::bad_request("Valid candidate name is required"));
        }
        set.insert("name", name);
    }
    if let Some(image_url) = patch.image_url {
        set.insert("image_url", image_url);
    }
    if let Some(position_id) = patch.position_id {
        set.insert("position_id", position_id);
    }
    if let Some(party_list_id) = patch.party_list_id {
        set.insert("party_list_id", party_list_id);
    }
    if let Some(school_levels) = patch.school_levels {
        set.insert("school_levels", school_levels);
    }
    if let Some(grade_levels) = patch.grade_levels {
        set.insert("grade_levels", grade_levels);
    }
    if set.is_empty() {
        return Err(Error::bad_request("Nothing to update"));
    }
    Ok(set)
}

#[post("/admin/candidates", data = "<spec>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn create_candidate(
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    candidates: Coll<Candidate>,
    positions: Coll<Position>,
    party_lists: Coll<PartyList>,
    counters: Coll<Counter>,
    client: &State<Client>,
    config: &State<Config>,
) -> Result<(Status, Json<CandidateView>)> {
    let rosters = Rosters {
        candidates,
        positions,
        party_lists,
        counters,
    };
    let spec = spec.into_inner();
    let candidate = with_transaction(client, config.max_transaction_attempts(), |mut session| {
        let rosters = rosters.clone();
        let spec = spec.clone();
        async move {
            let result = rosters.create_in(spec, &mut session).await;
            (session, result)
        }
    })
    .await?;

    info!("Created candidate {} ({})", candidate.id, candidate.name);
    Ok((Status::Created, Json(CandidateView::new(candidate, true))))
}

#[patch("/admin/candidates/<candidate_id>", data = "<patch>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn update_candidate(
    _token: AuthToken<Admin>,
    candidate_id: CandidateId,
    patch: Json<CandidatePatch>,
    candidates: Coll<Candidate>,
    positions: Coll<Position>,
    party_lists: Coll<PartyList>,
    counters: Coll<Counter>,
    client: &State<Client>,
    config: &State<Config>,
) -> Result<Json<CandidateView>> {
    let rosters = Rosters {
        candidates,
        positions,
        party_lists,
        counters,
    };
    let patch = patch.into_inner();
    let candidate = with_transaction(client, config.max_transaction_attempts(), |mut session| {
        let rosters = rosters.clone();
        let patch = patch.clone();
        async move {
            let result = rosters.update_in(candidate_id, patch, &mut session).await;
            (session, result)
        }
    })
    .await?;
    Ok(Json(CandidateView::new(candidate, true)))
}

/// Delete a candidate, removing them from every ballot.
#[delete("/admin/candidates/<candidate_id>")]
async fn delete_candidate(
    _token: AuthToken<Admin>,
    candidate_id: CandidateId,
    ledger: MongoLedger,
) -> Result<()> {
    ledger.delete_candidate(candidate_id).await
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use crate::model::{
        common::level::SchoolLevel,
        db::{
            candidate::CandidateCore,
            party_list::PartyListCore,
            position::PositionCore,
            voter::{Voter, VoterCore},
        },
    };

    use super::*;

    async fn insert_ballot_parts(positions: &Coll<Position>, party_lists: &Coll<PartyList>) {
        positions
            .insert_many(
                [
                    Position::new(1, PositionCore::example("President", 1, 1)),
                    Position::new(2, PositionCore::example("Senator", 2, 2)),
                ],
                None,
            )
            .await
            .unwrap();
        party_lists
            .insert_one(PartyList::new(1, PartyListCore::new("Makabayan")), None)
            .await
            .unwrap();
    }

    async fn create(client: &Client, spec: &CandidateSpec) -> Status {
        client
            .post(uri!(create_candidate))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await
            .status()
    }

    async fn patch(client: &Client, id: CandidateId, body: &str) -> Status {
        client
            .patch(uri!(update_candidate(id)))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await
            .status()
    }

    #[backend_test(admin)]
    async fn create_checks_references(
        client: Client,
        candidates: Coll<Candidate>,
        positions: Coll<Position>,
        party_lists: Coll<PartyList>,
    ) {
        insert_ballot_parts(&positions, &party_lists).await;

        let mut spec = CandidateSpec::example(" Ana ", 1, 1);
        spec.school_levels = vec![SchoolLevel::SeniorHigh];
        let response = client
            .post(uri!(create_candidate))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let created: CandidateView = response.into_json().await.unwrap();
        assert_eq!(created.name, "Ana");
        assert_eq!(created.vote_count, Some(0));
        assert_eq!(created.school_levels, vec![SchoolLevel::SeniorHigh]);

        let no_position = CandidateSpec::example("Ben", 9, 1);
        assert_eq!(create(&client, &no_position).await, Status::NotFound);
        let no_party = CandidateSpec::example("Ben", 1, 9);
        assert_eq!(create(&client, &no_party).await, Status::NotFound);
        let no_name = CandidateSpec::example(" ", 1, 1);
        assert_eq!(create(&client, &no_name).await, Status::BadRequest);

        assert_eq!(candidates.count_documents(None, None).await.unwrap(), 1);
    }

    #[backend_test(admin)]
    async fn candidates_with_votes_keep_their_position(
        client: Client,
        candidates: Coll<Candidate>,
        positions: Coll<Position>,
        party_lists: Coll<PartyList>,
    ) {
        insert_ballot_parts(&positions, &party_lists).await;
        let mut voted = CandidateCore::example("Ana", 1, 1);
        voted.vote_count = 1;
        candidates
            .insert_many(
                [
                    Candidate::new(1, voted),
                    Candidate::new(2, CandidateCore::example("Ben", 1, 1)),
                ],
                None,
            )
            .await
            .unwrap();

        assert_eq!(patch(&client, 1, r#"{"position_id": 2}"#).await, Status::Conflict);
        // Unchanged position is fine.
        assert_eq!(
            patch(&client, 1, r#"{"position_id": 1, "name": "Ana Reyes"}"#).await,
            Status::Ok
        );
        assert_eq!(patch(&client, 2, r#"{"position_id": 2}"#).await, Status::Ok);
        assert_eq!(patch(&client, 2, r#"{"position_id": 9}"#).await, Status::NotFound);
        assert_eq!(patch(&client, 9, r#"{"name": "Ghost"}"#).await, Status::NotFound);
        assert!(patch(&client, 1, r#"{"vote_count": 0}"#)
            .await
            .class()
            .is_client_error());

        let ana = candidates.find_one(u32_id_filter(1), None).await.unwrap().unwrap();
        assert_eq!(ana.name, "Ana Reyes");
        assert_eq!(ana.vote_count, 1);
        let ben = candidates.find_one(u32_id_filter(2), None).await.unwrap().unwrap();
        assert_eq!(ben.position_id, 2);
    }

    #[backend_test(admin)]
    async fn delete_removes_from_ballots(
        client: Client,
        candidates: Coll<Candidate>,
        voters: Coll<Voter>,
    ) {
        let mut voted = CandidateCore::example("Ana", 1, 1);
        voted.vote_count = 1;
        candidates
            .insert_one(Candidate::new(1, voted), None)
            .await
            .unwrap();
        let mut student = VoterCore::example();
        student.ballot.insert(1);
        voters
            .insert_one(Voter::new(100, student), None)
            .await
            .unwrap();

        let response = client.delete(uri!(delete_candidate(1))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let student = voters.find_one(u32_id_filter(100), None).await.unwrap().unwrap();
        assert!(student.ballot.is_empty());

        let response = client.delete(uri!(delete_candidate(1))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }
}
