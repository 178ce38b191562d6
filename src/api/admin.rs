use log::info;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use rocket::{serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    ledger::MongoLedger,
    model::{
        api::{
            auth::{Admin, AuthToken},
            settings::SettingsPatch,
        },
        db::{party_list::PartyList, settings::SystemSettings, voter::Voter},
        mongodb::Coll,
    },
    voting::tally::{Discrepancy, Tally, Turnout},
};

use super::public::load_party_lists;

pub fn routes() -> Vec<Route> {
    routes![update_settings, get_tally, audit_tally, repair_tally]
}

#[patch("/admin/settings", data = "<patch>", format = "json")]
async fn update_settings(
    _token: AuthToken<Admin>,
    patch: Json<SettingsPatch>,
    settings: Coll<SystemSettings>,
) -> Result<Json<SystemSettings>> {
    let set = patch
        .to_set()
        .ok_or_else(|| Error::bad_request("Nothing to update"))?;
    let upsert_after = FindOneAndUpdateOptions::builder()
        .upsert(true)
        .return_document(ReturnDocument::After)
        .build();
    let updated = settings
        .find_one_and_update(SystemSettings::filter(), doc! { "$set": set }, upsert_after)
        .await?
        .unwrap_or_default();
    info!("Updated system settings");
    Ok(Json(updated))
}

async fn turnout(voters: &Coll<Voter>) -> Result<Turnout> {
    let total = voters
        .count_documents(doc! { "is_admin": false }, None)
        .await?;
    let voted = voters
        .count_documents(doc! { "is_admin": false, "has_voted": true }, None)
        .await?;
    Ok(Turnout::new(total, voted))
}

#[get("/admin/tally")]
async fn get_tally(
    _token: AuthToken<Admin>,
    voters: Coll<Voter>,
    party_lists: Coll<PartyList>,
    ledger: MongoLedger,
) -> Result<Json<Tally>> {
    let election = ledger.election().await?;
    let party_lists = load_party_lists(&party_lists).await?;
    let turnout = turnout(&voters).await?;
    Ok(Json(Tally::new(&election, &party_lists, turnout)))
}

#[get("/admin/tally/audit")]
async fn audit_tally(
    _token: AuthToken<Admin>,
    ledger: MongoLedger,
) -> Result<Json<Vec<Discrepancy>>> {
    Ok(Json(ledger.audit().await?))
}

#[post("/admin/tally/repair")]
async fn repair_tally(
    _token: AuthToken<Admin>,
    ledger: MongoLedger,
) -> Result<Json<Vec<Discrepancy>>> {
    Ok(Json(ledger.repair().await?))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{serde_json::json, Value},
    };

    use crate::model::{
        db::{
            candidate::{Candidate, CandidateCore},
            party_list::PartyListCore,
            position::{Position, PositionCore},
            voter::VoterCore,
        },
        mongodb::u32_id_filter,
    };

    use super::*;

    /// President (cap 1) with Ana and Ben of party 1, and two students who
    /// both voted for Ana; the first one submitted.
    async fn insert_results(
        voters: &Coll<Voter>,
        candidates: &Coll<Candidate>,
        positions: &Coll<Position>,
        party_lists: &Coll<PartyList>,
    ) {
        positions
            .insert_one(Position::new(1, PositionCore::example("President", 1, 1)), None)
            .await
            .unwrap();
        party_lists
            .insert_one(PartyList::new(1, PartyListCore::new("Makabayan")), None)
            .await
            .unwrap();
        let mut ana = CandidateCore::example("Ana", 1, 1);
        ana.vote_count = 2;
        candidates
            .insert_many(
                [
                    Candidate::new(1, ana),
                    Candidate::new(2, CandidateCore::example("Ben", 1, 1)),
                ],
                None,
            )
            .await
            .unwrap();
        let mut first = VoterCore::example();
        first.ballot.insert(1);
        first.has_voted = true;
        let mut second = VoterCore::example2();
        second.ballot.insert(1);
        voters
            .insert_many([Voter::new(100, first), Voter::new(101, second)], None)
            .await
            .unwrap();
    }

    #[backend_test(admin)]
    async fn settings_are_patched(client: Client) {
        let response = client
            .patch(uri!(update_settings))
            .header(ContentType::JSON)
            .body(r#"{"left_logo_url": "/left.png"}"#)
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let settings: SystemSettings = response.into_json().await.unwrap();
        assert_eq!(settings.left_logo_url, "/left.png");
        assert_eq!(settings.splash_logo_url, SystemSettings::default().splash_logo_url);

        let response = client.get("/settings").dispatch().await;
        let public: SystemSettings = response.into_json().await.unwrap();
        assert_eq!(public, settings);

        let response = client
            .patch(uri!(update_settings))
            .header(ContentType::JSON)
            .body("{}")
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(voter)]
    async fn students_cannot_patch_settings(client: Client) {
        let response = client
            .patch(uri!(update_settings))
            .header(ContentType::JSON)
            .body(r#"{"left_logo_url": "/left.png"}"#)
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn tally_and_turnout(
        client: Client,
        voters: Coll<Voter>,
        candidates: Coll<Candidate>,
        positions: Coll<Position>,
        party_lists: Coll<PartyList>,
    ) {
        insert_results(&voters, &candidates, &positions, &party_lists).await;

        let response = client.get(uri!(get_tally)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let tally: Value = response.into_json().await.unwrap();
        let standings = &tally["positions"][0]["candidates"];
        assert_eq!(standings[0]["name"], json!("Ana"));
        assert_eq!(standings[0]["vote_count"], json!(2));
        assert_eq!(standings[1]["vote_count"], json!(0));
        assert_eq!(tally["party_lists"][0]["vote_count"], json!(2));
        assert_eq!(tally["turnout"]["total_voters"], json!(2));
        assert_eq!(tally["turnout"]["voted_count"], json!(1));
        assert_eq!(tally["turnout"]["percentage"], json!(50.0));
    }

    #[backend_test(admin)]
    async fn audit_then_repair(
        client: Client,
        voters: Coll<Voter>,
        candidates: Coll<Candidate>,
        positions: Coll<Position>,
        party_lists: Coll<PartyList>,
    ) {
        insert_results(&voters, &candidates, &positions, &party_lists).await;
        let response = client.get(uri!(audit_tally)).dispatch().await;
        let discrepancies: Value = response.into_json().await.unwrap();
        assert_eq!(discrepancies, json!([]));

        candidates
            .update_one(u32_id_filter(2), doc! { "$set": { "vote_count": 4 } }, None)
            .await
            .unwrap();
        let response = client.get(uri!(audit_tally)).dispatch().await;
        let discrepancies: Value = response.into_json().await.unwrap();
        assert_eq!(
            discrepancies,
            json!([{ "candidate_id": 2, "stored": 4, "actual": 0 }])
        );

        let response = client.post(uri!(repair_tally)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let ben = candidates.find_one(u32_id_filter(2), None).await.unwrap().unwrap();
        assert_eq!(ben.vote_count, 0);

        let response = client.get(uri!(audit_tally)).dispatch().await;
        let discrepancies: Value = response.into_json().await.unwrap();
        assert_eq!(discrepancies, json!([]));
    }
}
