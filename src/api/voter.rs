use mongodb::bson::doc;
use rocket::{serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    ledger::{Ledger, MongoLedger, VoteReceipt},
    model::{
        api::{
            auth::AuthToken,
            ballot::BallotStatus,
            student::{LevelUpdate, StudentView},
        },
        common::{CandidateId, VoterId},
        db::voter::Voter,
        mongodb::{u32_id_filter, Coll},
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_ballot, cast_vote, submit_ballot, update_own_level]
}

pub(super) async fn load_voter(voters: &Coll<Voter>, id: VoterId) -> Result<Voter> {
    voters
        .find_one(u32_id_filter(id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter {id}")))
}

/// Overwrite a voter's levels, returning the updated voter.
pub(super) async fn set_level(voters: &Coll<Voter>, id: VoterId, update: LevelUpdate) -> Result<Voter> {
    let set = doc! {
        "$set": {
            "school_level": update.school_level,
            "grade_level": update.grade_level,
        }
    };
    let result = voters.update_one(u32_id_filter(id), set, None).await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Voter {id}")));
    }
    load_voter(voters, id).await
}

#[get("/voter/ballot")]
async fn get_ballot(
    token: AuthToken<Voter>,
    voters: Coll<Voter>,
    ledger: MongoLedger,
) -> Result<Json<BallotStatus>> {
    let voter = load_voter(&voters, token.id).await?;
    let election = ledger.election().await?;
    Ok(Json(BallotStatus::new(&voter, &election)))
}

#[post("/voter/votes/<candidate_id>")]
async fn cast_vote(
    token: AuthToken<Voter>,
    candidate_id: CandidateId,
    ledger: MongoLedger,
) -> Result<Json<VoteReceipt>> {
    let receipt = ledger.cast_vote(token.id, candidate_id).await??;
    Ok(Json(receipt))
}

#[post("/voter/submit")]
async fn submit_ballot(token: AuthToken<Voter>, ledger: MongoLedger) -> Result<()> {
    ledger.submit_ballot(token.id).await??;
    Ok(())
}

#[put("/voter/level", data = "<update>", format = "json")]
async fn update_own_level(
    token: AuthToken<Voter>,
    update: Json<LevelUpdate>,
    voters: Coll<Voter>,
) -> Result<Json<StudentView>> {
    let voter = set_level(&voters, token.id, update.into_inner()).await?;
    Ok(Json(voter.into()))
}
