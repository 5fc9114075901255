use std::sync::Arc;

use axum::{Router, routing::get};
use service::ConversationService;

use crate::{message, proposal, state::AppState, thread, unread, user};

mod handler;
pub mod model;
pub mod service;

pub(crate) type Result<T> = std::result::Result<T, Error>;
pub type Service = Arc<dyn ConversationService + Send + Sync>;

pub fn api<S>(s: AppState) -> Router<S> {
    Router::new()
        .route("/users/{user_id}/conversations", get(handler::api::find_all))
        .with_state(s)
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("conversations are only visible to their owner")]
    Forbidden,
    #[error("unexpected conversation error: {0}")]
    Unexpected(String),

    #[error(transparent)]
    _Thread(#[from] thread::Error),
    #[error(transparent)]
    _Message(#[from] message::Error),
    #[error(transparent)]
    _Proposal(#[from] proposal::Error),
    #[error(transparent)]
    _Unread(#[from] unread::Error),
    #[error(transparent)]
    _User(#[from] user::Error),
}
