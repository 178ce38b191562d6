use std::fmt::Display;

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{debug, error};
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::logging::RequestId;
use crate::voting::Denial;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("{1}")]
    Status(Status, String),
    /// A vote, submission or similar was refused by the voting rules.
    #[error(transparent)]
    Denied(#[from] Denial),
    /// A ballot mutation could not be persisted. Nothing was applied and the
    /// request may be retried.
    #[error("The vote ledger is temporarily unavailable, please retry")]
    LedgerUnavailable(#[source] DbError),
    /// The ballot was written by another request between reading and
    /// updating it. Nothing was applied and the request may be retried.
    #[error("The ballot changed while voting, please retry")]
    BallotContended,
}

impl Error {
    pub fn not_found(what: impl Display) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, message.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Argon2(_) => Status::BadRequest,
            Self::Status(status, _) => *status,
            Self::Denied(denial) => denial_status(denial),
            Self::LedgerUnavailable(_) | Self::BallotContended => Status::ServiceUnavailable,
        }
    }
}

fn denial_status(denial: &Denial) -> Status {
    match denial {
        Denial::CandidateNotFound(_) | Denial::PositionNotFound(_) => Status::NotFound,
        Denial::AdminCannotVote => Status::Forbidden,
        Denial::DuplicateVote | Denial::BallotSubmitted => Status::Conflict,
        Denial::PositionCapExceeded { .. } => Status::UnprocessableEntity,
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let id = RequestId::of(req);
        let status = self.status();
        if status.class() == StatusClass::ServerError {
            match &self {
                Self::LedgerUnavailable(source) => error!("req{id} {self}: {source}"),
                _ => error!("req{id} {self}"),
            }
        } else {
            debug!("req{id} {status}: {self}");
        }
        let body = Json(ErrorMessage {
            message: self.to_string(),
        });
        (status, body).respond_to(req)
    }
}
