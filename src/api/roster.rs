use std::collections::HashSet;

use log::info;
use mongodb::{bson::doc, options::FindOptions, Client, ClientSession};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::{Error, Result},
    ledger::{Ledger, MongoLedger, ResetReceipt},
    model::{
        api::{
            auth::{Admin, AuthToken},
            pagination::{Paginated, Pagination},
            student::{LevelUpdate, StudentRegistration, StudentView},
        },
        common::VoterId,
        db::voter::{NewVoter, Voter},
        mongodb::{is_duplicate_key_error, with_transaction, Coll, Counter, VOTER_ID_COUNTER_ID},
    },
};

use super::voter::set_level;

pub fn routes() -> Vec<Route> {
    routes![
        list_students,
        register_students,
        delete_student,
        update_student_level,
        reset_student_vote,
    ]
}

#[get("/admin/students")]
async fn list_students(
    _token: AuthToken<Admin>,
    voters: Coll<Voter>,
    pagination: Pagination,
) -> Result<Json<Paginated<StudentView>>> {
    let students = doc! { "is_admin": false };
    let total = voters.count_documents(students.clone(), None).await?;
    let page = FindOptions::builder()
        .sort(doc! { "_id": 1 })
        .skip(pagination.skip())
        .limit(i64::try_from(pagination.page_size()).unwrap_or(i64::MAX))
        .build();
    let items: Vec<Voter> = voters.find(students, page).await?.try_collect().await?;

    Ok(Json(Paginated {
        items: items.into_iter().map(StudentView::from).collect(),
        pagination: pagination.result(total),
    }))
}

/// Validate every registration, rejecting the batch on the first problem.
fn validate_batch(batch: Vec<StudentRegistration>) -> Result<Vec<NewVoter>> {
    if batch.is_empty() {
        return Err(Error::bad_request("No students given"));
    }
    let mut seen = HashSet::new();
    batch
        .into_iter()
        .enumerate()
        .map(|(index, registration)| {
            let voter = registration
                .into_voter()
                .map_err(|message| Error::bad_request(format!("Student {}: {message}", index + 1)))?;
            if !seen.insert(voter.reference_number.clone()) {
                return Err(Error::bad_request(format!(
                    "Student {}: reference number {} appears more than once",
                    index + 1,
                    voter.reference_number
                )));
            }
            Ok(voter)
        })
        .collect()
}

fn already_registered(references: &[String]) -> Error {
    Error::Status(
        Status::Conflict,
        format!(
            "Reference number(s) already registered: {}",
            references.join(", ")
        ),
    )
}

async fn register_in(
    voters: &Coll<Voter>,
    counters: &Coll<Counter>,
    new_voters: Vec<NewVoter>,
    references: &[String],
    session: &mut ClientSession,
) -> Result<Vec<Voter>> {
    let existing = doc! { "reference_number": { "$in": references.to_vec() } };
    let mut cursor = voters.find_with_session(existing, None, session).await?;
    let taken: Vec<String> = cursor
        .stream(session)
        .map_ok(|voter| voter.voter.reference_number)
        .try_collect()
        .await?;
    if !taken.is_empty() {
        return Err(already_registered(&taken));
    }

    let mut registered = Vec::with_capacity(new_voters.len());
    for voter in new_voters {
        let id = Counter::next_with_session(counters, VOTER_ID_COUNTER_ID, session).await?;
        registered.push(Voter::new(id, voter));
    }
    voters
        .insert_many_with_session(&registered, None, session)
        .await
        .map_err(|err| {
            if is_duplicate_key_error(&err) {
                already_registered(references)
            } else {
                err.into()
            }
        })?;
    Ok(registered)
}

/// Register a batch of students. Either all are added or none are.
#[post("/admin/students", data = "<batch>", format = "json")]
async fn register_students(
    _token: AuthToken<Admin>,
    batch: Json<Vec<StudentRegistration>>,
    voters: Coll<Voter>,
    counters: Coll<Counter>,
    client: &State<Client>,
    config: &State<Config>,
) -> Result<(Status, Json<Vec<StudentView>>)> {
    let new_voters = validate_batch(batch.into_inner())?;
    let references: Vec<String> = new_voters
        .iter()
        .map(|voter| voter.reference_number.clone())
        .collect();

    let registered = with_transaction(client, config.max_transaction_attempts(), |mut session| {
        let voters = voters.clone();
        let counters = counters.clone();
        let new_voters = new_voters.clone();
        let references = references.clone();
        async move {
            let result =
                register_in(&voters, &counters, new_voters, &references, &mut session).await;
            (session, result)
        }
    })
    .await?;

    info!("Registered {} student(s)", registered.len());
    Ok((
        Status::Created,
        Json(registered.into_iter().map(StudentView::from).collect()),
    ))
}

#[delete("/admin/students/<voter_id>")]
async fn delete_student(
    _token: AuthToken<Admin>,
    voter_id: VoterId,
    ledger: MongoLedger,
) -> Result<Json<ResetReceipt>> {
    Ok(Json(ledger.delete_voter(voter_id).await?))
}

#[put("/admin/students/<voter_id>/level", data = "<update>", format = "json")]
async fn update_student_level(
    _token: AuthToken<Admin>,
    voter_id: VoterId,
    update: Json<LevelUpdate>,
    voters: Coll<Voter>,
) -> Result<Json<StudentView>> {
    let voter = set_level(&voters, voter_id, update.into_inner()).await?;
    Ok(Json(voter.into()))
}

#[post("/admin/students/<voter_id>/reset-vote")]
async fn reset_student_vote(
    _token: AuthToken<Admin>,
    voter_id: VoterId,
    ledger: MongoLedger,
) -> Result<Json<ResetReceipt>> {
    Ok(Json(ledger.reset_vote(voter_id).await?))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::{serde_json::json, Value},
    };

    use crate::model::{
        common::level::{GradeLevel, SchoolLevel},
        db::{
            candidate::{Candidate, CandidateCore},
            position::{Position, PositionCore},
            voter::VoterCore,
        },
        mongodb::u32_id_filter,
    };

    use super::*;

    fn batch(references: &[&str]) -> Vec<StudentRegistration> {
        references
            .iter()
            .map(|reference| StudentRegistration::example(reference, "Pedro Penduko"))
            .collect()
    }

    async fn register(client: &Client, batch: Vec<StudentRegistration>) -> Status {
        client
            .post(uri!(register_students))
            .header(ContentType::JSON)
            .body(json!(batch).to_string())
            .dispatch()
            .await
            .status()
    }

    async fn student_count(voters: &Coll<Voter>) -> u64 {
        voters
            .count_documents(doc! { "is_admin": false }, None)
            .await
            .unwrap()
    }

    #[backend_test(admin)]
    async fn register_and_list(client: Client, voters: Coll<Voter>) {
        let response = client
            .post(uri!(register_students))
            .header(ContentType::JSON)
            .body(json!(batch(&["2024-00100", "2024-00101", "2024-00102"])).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let created: Vec<StudentView> = response.into_json().await.unwrap();
        assert_eq!(created.len(), 3);
        assert!(created.iter().all(|student| !student.is_admin));
        assert_eq!(student_count(&voters).await, 3);

        let response = client
            .get("/admin/students?page_num=2&page_size=2")
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let page: Value = response.into_json().await.unwrap();
        assert_eq!(page["pagination"]["total"], json!(3));
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
        assert_eq!(page["items"][0]["reference_number"], json!("2024-00102"));
    }

    #[backend_test(admin)]
    async fn batches_are_all_or_nothing(client: Client, voters: Coll<Voter>) {
        assert_eq!(register(&client, batch(&["2024-00100"])).await, Status::Created);

        // One entry clashes with the roster.
        let status = register(&client, batch(&["2024-00200", "2024-00100"])).await;
        assert_eq!(status, Status::Conflict);
        // One entry is invalid.
        let mut invalid = batch(&["2024-00201", "2024-00202"]);
        invalid[1].student_name = " ".to_string();
        assert_eq!(register(&client, invalid).await, Status::BadRequest);
        // Duplicates within the batch.
        let status = register(&client, batch(&["2024-00203", "2024-00203"])).await;
        assert_eq!(status, Status::BadRequest);
        // Nothing at all.
        assert_eq!(register(&client, Vec::new()).await, Status::BadRequest);

        assert_eq!(student_count(&voters).await, 1);
    }

    #[backend_test(voter)]
    async fn students_cannot_manage_roster(client: Client, voters: Coll<Voter>) {
        let status = register(&client, batch(&["2024-00100"])).await;
        assert_eq!(status, Status::NotFound);
        let response = client.get(uri!(list_students)).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(student_count(&voters).await, 1);
    }

    #[backend_test(admin)]
    async fn delete_and_reset(
        client: Client,
        voters: Coll<Voter>,
        candidates: Coll<Candidate>,
        positions: Coll<Position>,
    ) {
        positions
            .insert_one(Position::new(1, PositionCore::example("President", 1, 1)), None)
            .await
            .unwrap();
        let mut voted = CandidateCore::example("Ana", 1, 1);
        voted.vote_count = 1;
        candidates
            .insert_one(Candidate::new(1, voted), None)
            .await
            .unwrap();
        let mut student = VoterCore::example();
        student.ballot.insert(1);
        student.has_voted = true;
        voters
            .insert_one(Voter::new(100, student), None)
            .await
            .unwrap();

        let response = client.post(uri!(reset_student_vote(100))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let receipt: Value = response.into_json().await.unwrap();
        assert_eq!(receipt["released"], json!([1]));
        let student = voters.find_one(u32_id_filter(100), None).await.unwrap().unwrap();
        assert!(student.ballot.is_empty());
        assert!(!student.has_voted);

        let response = client.delete(uri!(delete_student(100))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(student_count(&voters).await, 0);

        let response = client.delete(uri!(delete_student(100))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let candidate = candidates.find_one(u32_id_filter(1), None).await.unwrap().unwrap();
        assert_eq!(candidate.vote_count, 0);
    }

    #[backend_test(admin)]
    async fn admin_sets_student_level(client: Client, voters: Coll<Voter>) {
        voters
            .insert_one(Voter::new(100, VoterCore::example()), None)
            .await
            .unwrap();
        let update = LevelUpdate {
            school_level: Some(SchoolLevel::JuniorHigh),
            grade_level: GradeLevel::new(8),
        };

        let response = client
            .put(uri!(update_student_level(100)))
            .header(ContentType::JSON)
            .body(json!(update).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let view: StudentView = response.into_json().await.unwrap();
        assert_eq!(view.school_level, Some(SchoolLevel::JuniorHigh));
        assert_eq!(view.grade_level, GradeLevel::new(8));

        let response = client
            .put(uri!(update_student_level(404)))
            .header(ContentType::JSON)
            .body(json!(update).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
