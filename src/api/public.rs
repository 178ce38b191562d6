use mongodb::options::FindOptions;
use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    ledger::MongoLedger,
    model::{
        api::{auth::AuthToken, election::ElectionOverview, party_list::PartyListView},
        db::{party_list::PartyList, settings::SystemSettings, voter::Voter},
        mongodb::{u32_id_filter, Coll},
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_settings, get_party_lists, get_election]
}

pub(super) async fn load_settings(settings: &Coll<SystemSettings>) -> Result<SystemSettings> {
    let stored = settings.find_one(SystemSettings::filter(), None).await?;
    Ok(stored.unwrap_or_default())
}

pub(super) async fn load_party_lists(party_lists: &Coll<PartyList>) -> Result<Vec<PartyList>> {
    let by_id = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let party_lists = party_lists.find(None, by_id).await?.try_collect().await?;
    Ok(party_lists)
}

#[get("/settings")]
async fn get_settings(settings: Coll<SystemSettings>) -> Result<Json<SystemSettings>> {
    Ok(Json(load_settings(&settings).await?))
}

#[get("/party-lists")]
async fn get_party_lists(party_lists: Coll<PartyList>) -> Result<Json<Vec<PartyListView>>> {
    let party_lists = load_party_lists(&party_lists).await?;
    Ok(Json(party_lists.into_iter().map(PartyListView::from).collect()))
}

#[get("/election")]
async fn get_election(
    token: AuthToken<Voter>,
    voters: Coll<Voter>,
    party_lists: Coll<PartyList>,
    settings: Coll<SystemSettings>,
    ledger: MongoLedger,
) -> Result<Json<ElectionOverview>> {
    let viewer = voters
        .find_one(u32_id_filter(token.id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter {}", token.id)))?;
    let election = ledger.election().await?;
    let party_lists = load_party_lists(&party_lists).await?;
    let settings = load_settings(&settings).await?;

    Ok(Json(ElectionOverview::for_viewer(
        &viewer,
        election,
        party_lists,
        settings,
    )))
}
