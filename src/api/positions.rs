use log::info;
use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, FindOneOptions, ReturnDocument},
    Client, ClientSession,
};
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            auth::{Admin, AuthToken},
            position::{PositionPatch, PositionSpec, PositionView},
        },
        common::PositionId,
        db::{candidate::Candidate, position::Position},
        mongodb::{u32_id_filter, with_transaction, Coll, Counter, POSITION_ID_COUNTER_ID},
    },
};

pub fn routes() -> Vec<Route> {
    routes![create_position, update_position, delete_position]
}

/// The display order after every existing position.
async fn next_display_order(positions: &Coll<Position>) -> Result<u32> {
    let last = FindOneOptions::builder()
        .sort(doc! { "display_order": -1 })
        .build();
    let last = positions.find_one(None, last).await?;
    Ok(last.map_or(1, |position| position.display_order.saturating_add(1)))
}

#[post("/admin/positions", data = "<spec>", format = "json")]
async fn create_position(
    _token: AuthToken<Admin>,
    spec: Json<PositionSpec>,
    positions: Coll<Position>,
    counters: Coll<Counter>,
) -> Result<(Status, Json<PositionView>)> {
    let display_order = next_display_order(&positions).await?;
    let position = spec
        .into_inner()
        .into_position(display_order)
        .map_err(Error::bad_request)?;

    let id = Counter::next(&counters, POSITION_ID_COUNTER_ID).await?;
    let position = Position::new(id, position);
    positions.insert_one(&position, None).await?;

    info!("Created position {id} ({})", position.name);
    Ok((Status::Created, Json(position.into())))
}

fn patch_to_set(patch: PositionPatch) -> Result<Document> {
    let mut set = Document::new();
    if let Some(name) = patch.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::bad_request("Position name cannot be empty"));
        }
        set.insert("name", name);
    }
    if let Some(category) = patch.category {
        set.insert("category", category);
    }
    if let Some(display_order) = patch.display_order {
        set.insert("display_order", display_order);
    }
    if set.is_empty() {
        return Err(Error::bad_request("Nothing to update"));
    }
    Ok(set)
}

#[patch("/admin/positions/<position_id>", data = "<patch>", format = "json")]
async fn update_position(
    _token: AuthToken<Admin>,
    position_id: PositionId,
    patch: Json<PositionPatch>,
    positions: Coll<Position>,
) -> Result<Json<PositionView>> {
    let set = patch_to_set(patch.into_inner())?;
    let after = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let position = positions
        .find_one_and_update(u32_id_filter(position_id), doc! { "$set": set }, after)
        .await?
        .ok_or_else(|| Error::not_found(format!("Position {position_id}")))?;
    Ok(Json(position.into()))
}

async fn delete_position_in(
    positions: &Coll<Position>,
    candidates: &Coll<Candidate>,
    position_id: PositionId,
    session: &mut ClientSession,
) -> Result<()> {
    let running = candidates
        .count_documents_with_session(doc! { "position_id": position_id }, None, session)
        .await?;
    if running > 0 {
        return Err(Error::Status(
            Status::Conflict,
            format!("Position {position_id} still has {running} candidate(s)"),
        ));
    }
    let result = positions
        .delete_one_with_session(u32_id_filter(position_id), None, session)
        .await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Position {position_id}")));
    }
    Ok(())
}

/// Delete a position that no candidate runs for.
#[delete("/admin/positions/<position_id>")]
async fn delete_position(
    _token: AuthToken<Admin>,
    position_id: PositionId,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    client: &State<Client>,
    config: &State<Config>,
) -> Result<()> {
    with_transaction(client, config.max_transaction_attempts(), |mut session| {
        let positions = positions.clone();
        let candidates = candidates.clone();
        async move {
            let result =
                delete_position_in(&positions, &candidates, position_id, &mut session).await;
            (session, result)
        }
    })
    .await?;
    info!("Deleted position {position_id}");
    Ok(())
}
