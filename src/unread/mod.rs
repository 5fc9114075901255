use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use repository::CursorRepository;
use service::UnreadService;

use crate::{message, state::AppState, thread};

mod handler;
pub mod repository;
pub mod service;

pub(crate) type Result<T> = std::result::Result<T, Error>;
pub type Repository = Arc<dyn CursorRepository + Send + Sync>;
pub type Service = Arc<dyn UnreadService + Send + Sync>;

pub fn api<S>(s: AppState) -> Router<S> {
    Router::new()
        .route("/threads/{id}/read", post(handler::api::mark_read))
        .route("/threads/{id}/unread", get(handler::api::unread_count))
        .with_state(s)
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("message {0} not found in thread")]
    MessageNotFound(message::Id),

    #[error(transparent)]
    _Thread(#[from] thread::Error),
    #[error(transparent)]
    _Message(#[from] message::Error),
    #[error(transparent)]
    _R2d2(#[from] r2d2::Error),
    #[error(transparent)]
    _Diesel(#[from] diesel::result::Error),
}
