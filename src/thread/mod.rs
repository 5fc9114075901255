use std::{fmt::Display, sync::Arc};

use axum::{Router, routing::get};
use repository::ThreadRepository;
use serde::{Deserialize, Serialize};
use service::ThreadService;
use uuid::Uuid;

use crate::{state::AppState, user};

mod handler;
pub mod model;
pub mod repository;
pub mod service;

pub(crate) type Result<T> = std::result::Result<T, Error>;
pub type Repository = Arc<dyn ThreadRepository + Send + Sync>;
pub type Service = Arc<dyn ThreadService + Send + Sync>;

pub fn api<S>(s: AppState) -> Router<S> {
    Router::new()
        .route("/threads/{id}", get(handler::api::find_one))
        .with_state(s)
}

#[derive(
    Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id(pub Uuid);

impl Id {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for Id {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("thread not found: {0}")]
    NotFound(Id),
    #[error("user is not a participant of the thread")]
    NotParticipant,
    #[error("cannot open a thread with oneself: {0}")]
    SelfReference(user::Id),

    #[error(transparent)]
    _R2d2(#[from] r2d2::Error),
    #[error(transparent)]
    _Diesel(#[from] diesel::result::Error),
}
