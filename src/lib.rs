#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod voting;

/// Assemble the server: routes, logging, config and the database.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
}

#[cfg(test)]
async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .expect("Could not connect to the test database")
}

/// A fresh database name for one test.
#[cfg(test)]
fn database() -> String {
    use rand::Rng;
    format!("test{}", rand::thread_rng().gen::<u32>())
}

/// A server backed by the given (prepared) database, without the launch
/// fairings that would connect on their own.
#[cfg(test)]
async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let rocket = rocket::build();
    let config = rocket
        .figment()
        .extract::<config::Config>()
        .expect("Invalid test config");
    let db = client.database(db_name);
    config::prepare_database(&db, &config)
        .await
        .expect("Could not prepare the test database");

    rocket
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .manage(config)
        .manage(client)
        .manage(db)
}
