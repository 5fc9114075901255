use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use repository::ProposalRepository;
use serde::{Deserialize, Serialize};
use service::ProposalService;

use crate::{exchange, library, message, state::AppState, thread};

mod handler;
pub mod model;
pub mod repository;
pub mod service;

pub(crate) type Result<T> = std::result::Result<T, Error>;
pub type Repository = Arc<dyn ProposalRepository + Send + Sync>;
pub type Service = Arc<dyn ProposalService + Send + Sync>;

/// A proposal is identified by the message that carries it.
pub type Id = message::Id;

pub fn api<S>(s: AppState) -> Router<S> {
    Router::new()
        .route("/threads/propose", post(handler::api::propose))
        .route("/threads/{id}/proposals", post(handler::api::create))
        .route("/proposals/{id}", get(handler::api::find_one))
        .route("/proposals/{id}/respond", post(handler::api::respond))
        .with_state(s)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Accepted,
    Rejected,
}

impl Status {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Accept,
    Reject,
}

impl Action {
    pub const fn outcome(&self) -> Status {
        match self {
            Self::Accept => Status::Accepted,
            Self::Reject => Status::Rejected,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("proposal not found: {0}")]
    NotFound(Id),
    #[error("user is not a participant of the thread")]
    NotParticipant,
    #[error("only the counterpart of the proposer may respond")]
    Forbidden,
    #[error("thread {0} already has an open proposal")]
    DuplicateOpenProposal(thread::Id),
    #[error("proposal {0} is already resolved")]
    AlreadyResolved(Id),
    #[error("accepting requires selecting one of your books")]
    MissingSelection,
    #[error("book {0} is not in the expected library")]
    BookNotOwned(library::BookId),
    #[error("unexpected proposal error: {0}")]
    Unexpected(String),

    #[error(transparent)]
    _Thread(#[from] thread::Error),
    #[error(transparent)]
    _Library(#[from] library::Error),
    #[error(transparent)]
    _Exchange(#[from] exchange::Error),
    #[error(transparent)]
    _R2d2(#[from] r2d2::Error),
    #[error(transparent)]
    _Diesel(#[from] diesel::result::Error),
}
