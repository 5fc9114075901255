use axum::http::StatusCode;

impl From<&super::Error> for StatusCode {
    fn from(e: &super::Error) -> Self {
        match e {
            super::Error::NotFound(_) => Self::NOT_FOUND,
            super::Error::NotParticipant => Self::FORBIDDEN,
            super::Error::SelfReference(_) => Self::BAD_REQUEST,
            super::Error::_R2d2(_) | super::Error::_Diesel(_) => Self::INTERNAL_SERVER_ERROR,
        }
    }
}

pub(super) mod api {
    use axum::{
        Extension, Json,
        extract::{Path, State},
    };

    use crate::{
        auth,
        thread::{self, model::Thread},
    };

    pub async fn find_one(
        Extension(auth_user): Extension<auth::User>,
        thread_service: State<thread::Service>,
        Path(id): Path<thread::Id>,
    ) -> crate::Result<Json<Thread>> {
        let thread = thread_service
            .find_for_participant(&id, auth_user.id())
            .await?;

        Ok(Json(thread))
    }
}
