use rocket::Route;

mod admin;
mod auth;
mod candidates;
mod party_lists;
mod positions;
mod public;
mod roster;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(public::routes());
    routes.extend(voter::routes());
    routes.extend(roster::routes());
    routes.extend(positions::routes());
    routes.extend(candidates::routes());
    routes.extend(party_lists::routes());
    routes.extend(admin::routes());
    routes
}
