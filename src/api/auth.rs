use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            admin::AdminCredentials,
            auth::{Admin, AuthToken, AUTH_TOKEN_COOKIE},
            student::{StudentCredentials, StudentView},
        },
        db::voter::Voter,
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![student_login, admin_login, logout]
}

#[post("/auth/student", data = "<credentials>", format = "json")]
pub async fn student_login(
    cookies: &CookieJar<'_>,
    credentials: Json<StudentCredentials>,
    voters: Coll<Voter>,
    config: &State<Config>,
) -> Result<Json<StudentView>> {
    let with_reference = doc! {
        "reference_number": credentials.reference_number.trim(),
    };

    let voter = voters
        .find_one(with_reference, None)
        .await?
        .filter(|voter| credentials.matches(voter))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "No student found with the provided reference number and name.".to_string(),
            )
        })?;

    let token = AuthToken::<Voter>::new(&voter);
    cookies.add(token.into_cookie(config));

    Ok(Json(voter.into()))
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn admin_login(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    voters: Coll<Voter>,
    config: &State<Config>,
) -> Result<()> {
    let with_reference = doc! {
        "reference_number": credentials.reference_number.trim(),
        "is_admin": true,
    };

    let admin = voters
        .find_one(with_reference, None)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "No admin found with the provided reference number and password combination."
                    .to_string(),
            )
        })?;

    let token = AuthToken::<Admin>::new(&admin);
    cookies.add(token.into_cookie(config));

    Ok(())
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
