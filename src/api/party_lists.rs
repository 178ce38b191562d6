use log::info;
use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, ReturnDocument},
    Client, ClientSession,
};
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            auth::{Admin, AuthToken},
            party_list::{is_hex_color, ImageUrls, PartyListPatch, PartyListSpec, PartyListView},
        },
        common::PartyListId,
        db::{candidate::Candidate, party_list::PartyList},
        mongodb::{u32_id_filter, with_transaction, Coll, Counter, PARTY_LIST_ID_COUNTER_ID},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        create_party_list,
        update_party_list,
        add_party_list_images,
        delete_party_list,
    ]
}

async fn update_and_return(
    party_lists: &Coll<PartyList>,
    party_list_id: PartyListId,
    update: Document,
) -> Result<PartyList> {
    let after = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    party_lists
        .find_one_and_update(u32_id_filter(party_list_id), update, after)
        .await?
        .ok_or_else(|| Error::not_found(format!("Party list {party_list_id}")))
}

#[post("/admin/party-lists", data = "<spec>", format = "json")]
async fn create_party_list(
    _token: AuthToken<Admin>,
    spec: Json<PartyListSpec>,
    party_lists: Coll<PartyList>,
    counters: Coll<Counter>,
) -> Result<(Status, Json<PartyListView>)> {
    let party_list = spec
        .into_inner()
        .into_party_list()
        .map_err(Error::bad_request)?;
    let id = Counter::next(&counters, PARTY_LIST_ID_COUNTER_ID).await?;
    let party_list = PartyList::new(id, party_list);
    party_lists.insert_one(&party_list, None).await?;

    info!("Created party list {id} ({})", party_list.name);
    Ok((Status::Created, Json(party_list.into())))
}

fn patch_to_set(patch: PartyListPatch) -> Result<Document> {
    let mut set = Document::new();
    if let Some(name) = patch.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::bad_request("Party list name cannot be empty"));
        }
        set.insert("name", name);
    }
    if let Some(color) = patch.color {
        if !is_hex_color(&color) {
            return Err(Error::bad_request(format!("Invalid color {color:?}")));
        }
        set.insert("color", color);
    }
    if let Some(logo_url) = patch.logo_url {
        set.insert("logo_url", logo_url);
    }
    if let Some(platform_image_url) = patch.platform_image_url {
        set.insert("platform_image_url", platform_image_url);
    }
    if set.is_empty() {
        return Err(Error::bad_request("Nothing to update"));
    }
    Ok(set)
}

#[patch("/admin/party-lists/<party_list_id>", data = "<patch>", format = "json")]
async fn update_party_list(
    _token: AuthToken<Admin>,
    party_list_id: PartyListId,
    patch: Json<PartyListPatch>,
    party_lists: Coll<PartyList>,
) -> Result<Json<PartyListView>> {
    let set = patch_to_set(patch.into_inner())?;
    let party_list = update_and_return(&party_lists, party_list_id, doc! { "$set": set }).await?;
    Ok(Json(party_list.into()))
}

#[post("/admin/party-lists/<party_list_id>/images", data = "<images>", format = "json")]
async fn add_party_list_images(
    _token: AuthToken<Admin>,
    party_list_id: PartyListId,
    images: Json<ImageUrls>,
    party_lists: Coll<PartyList>,
) -> Result<Json<PartyListView>> {
    let urls: Vec<String> = images
        .into_inner()
        .urls
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();
    if urls.is_empty() {
        return Err(Error::bad_request("No image URLs given"));
    }
    let push = doc! {
        "$push": {
            "images": { "$each": urls }
        }
    };
    let party_list = update_and_return(&party_lists, party_list_id, push).await?;
    Ok(Json(party_list.into()))
}

async fn delete_party_list_in(
    party_lists: &Coll<PartyList>,
    candidates: &Coll<Candidate>,
    party_list_id: PartyListId,
    session: &mut ClientSession,
) -> Result<()> {
    let members = candidates
        .count_documents_with_session(doc! { "party_list_id": party_list_id }, None, session)
        .await?;
    if members > 0 {
        return Err(Error::Status(
            Status::Conflict,
            format!("Party list {party_list_id} still has {members} candidate(s)"),
        ));
    }
    let result = party_lists
        .delete_one_with_session(u32_id_filter(party_list_id), None, session)
        .await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Party list {party_list_id}")));
    }
    Ok(())
}

#[delete("/admin/party-lists/<party_list_id>")]
async fn delete_party_list(
    _token: AuthToken<Admin>,
    party_list_id: PartyListId,
    party_lists: Coll<PartyList>,
    candidates: Coll<Candidate>,
    client: &State<Client>,
    config: &State<Config>,
) -> Result<()> {
    with_transaction(client, config.max_transaction_attempts(), |mut session| {
        let party_lists = party_lists.clone();
        let candidates = candidates.clone();
        async move {
            let result =
                delete_party_list_in(&party_lists, &candidates, party_list_id, &mut session).await;
            (session, result)
        }
    })
    .await?;
    info!("Deleted party list {party_list_id}");
    Ok(())
}
