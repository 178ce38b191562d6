use chrono::Duration;
use log::{error, info, warn};
use mongodb::{bson::doc, options::UpdateOptions, Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::error::Result;
use crate::model::{
    db::{
        settings::SystemSettings,
        voter::{NewVoter, Voter},
    },
    mongodb::{ensure_counters_exist, ensure_indexes_exist, Coll, Counter, VOTER_ID_COUNTER_ID},
};

fn default_max_transaction_attempts() -> u32 {
    5
}

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    admin_reference: String,
    #[serde(default = "default_max_transaction_attempts")]
    max_transaction_attempts: u32,
    // secrets
    jwt_secret: String,
    admin_password: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Reference number of the administrator created on first launch.
    pub fn admin_reference(&self) -> &str {
        &self.admin_reference
    }

    /// Password of the administrator created on first launch.
    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }

    /// How many times any multi-document transaction (votes and admin
    /// changes alike) is attempted before giving up. Never less than one.
    pub fn max_transaction_attempts(&self) -> u32 {
        self.max_transaction_attempts.max(1)
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // non-secrets
    db_name: String,
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
///
/// Must be attached after [`ConfigFairing`].
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);

        let Some(app_config) = rocket.state::<Config>() else {
            error!("Application config must be loaded before the database");
            return Err(rocket);
        };
        if let Err(e) = prepare_database(&db, app_config).await {
            error!("Failed to prepare database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Ensure indexes, ID counters, the settings document and at least one
/// administrator exist. This operation is idempotent.
pub async fn prepare_database(db: &Database, config: &Config) -> Result<()> {
    ensure_indexes_exist(db).await?;
    let counters = Coll::<Counter>::from_db(db);
    ensure_counters_exist(&counters).await?;
    ensure_settings_exist(&Coll::from_db(db)).await?;
    ensure_admin_exists(&Coll::from_db(db), &counters, config).await
}

async fn ensure_settings_exist(settings: &Coll<SystemSettings>) -> Result<()> {
    let defaults = mongodb::bson::to_document(&SystemSettings::default())
        .expect("Serialisation is infallible");
    let upsert = UpdateOptions::builder().upsert(true).build();
    settings
        .update_one(
            SystemSettings::filter(),
            doc! { "$setOnInsert": defaults },
            upsert,
        )
        .await?;
    Ok(())
}

/// Create the configured administrator if there are no administrators.
async fn ensure_admin_exists(
    voters: &Coll<Voter>,
    counters: &Coll<Counter>,
    config: &Config,
) -> Result<()> {
    if voters.find_one(doc! { "is_admin": true }, None).await?.is_some() {
        return Ok(());
    }
    let id = Counter::next(counters, VOTER_ID_COUNTER_ID).await?;
    let admin = NewVoter::admin(config.admin_reference(), config.admin_password())?;
    voters.insert_one(Voter::new(id, admin), None).await?;
    warn!(
        "Created administrator {} from config; change the password",
        config.admin_reference()
    );
    Ok(())
}
