use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde::Serialize;

use crate::{
    auth, conversation, exchange, integration, library, message, proposal, thread, unread, user,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    _Auth(#[from] auth::Error),
    #[error(transparent)]
    _User(#[from] user::Error),
    #[error(transparent)]
    _Thread(#[from] thread::Error),
    #[error(transparent)]
    _Message(#[from] message::Error),
    #[error(transparent)]
    _Proposal(#[from] proposal::Error),
    #[error(transparent)]
    _Exchange(#[from] exchange::Error),
    #[error(transparent)]
    _Unread(#[from] unread::Error),
    #[error(transparent)]
    _Conversation(#[from] conversation::Error),
    #[error(transparent)]
    _Library(#[from] library::Error),
    #[error(transparent)]
    _Integration(#[from] integration::Error),
}

impl From<&Error> for StatusCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::_Auth(e) => e.into(),
            Error::_Thread(e) => e.into(),
            Error::_Message(e) => e.into(),
            Error::_Proposal(e) => e.into(),
            Error::_Exchange(e) => e.into(),
            Error::_Unread(e) => e.into(),
            Error::_Conversation(e) => e.into(),
            Error::_Library(e) => e.into(),
            Error::_User(_) | Error::_Integration(_) => Self::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let status = StatusCode::from(&self);

        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!("{self}");
                "Internal server error".to_owned()
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                warn!("{self}");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}
