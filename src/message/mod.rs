use std::{fmt::Display, str::FromStr, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use repository::MessageRepository;
use serde::{Deserialize, Serialize};
use service::MessageService;

use crate::{proposal, state::AppState, thread};

mod handler;
pub mod model;
pub mod repository;
pub mod service;

pub(crate) type Result<T> = std::result::Result<T, Error>;
pub type Repository = Arc<dyn MessageRepository + Send + Sync>;
pub type Service = Arc<dyn MessageService + Send + Sync>;

pub fn api<S>(s: AppState) -> Router<S> {
    Router::new()
        .route("/threads/{id}/messages", post(handler::api::create))
        .route("/threads/{id}/messages", get(handler::api::find_all))
        .with_state(s)
}

/// Store-wide monotonic message identifier. Proposals reuse the id of the
/// message that carries them.
#[derive(
    Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id(pub i64);

impl From<i64> for Id {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Plain,
    Proposal,
    System,
}

impl Kind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Proposal => "proposal",
            Self::System => "system",
        }
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Self::Plain),
            "proposal" => Ok(Self::Proposal),
            "system" => Ok(Self::System),
            other => Err(Error::Unexpected(format!("unknown message kind: {other}"))),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("message not found: {0}")]
    NotFound(Id),
    #[error("message body is empty")]
    EmptyBody,
    #[error("unexpected message error: {0}")]
    Unexpected(String),

    #[error(transparent)]
    _Thread(#[from] thread::Error),
    #[error(transparent)]
    _Proposal(#[from] Box<proposal::Error>),
    #[error(transparent)]
    _R2d2(#[from] r2d2::Error),
    #[error(transparent)]
    _Diesel(#[from] diesel::result::Error),
}

impl From<proposal::Error> for Error {
    fn from(e: proposal::Error) -> Self {
        Self::_Proposal(Box::new(e))
    }
}
