use axum::http::StatusCode;

impl From<&super::Error> for StatusCode {
    fn from(e: &super::Error) -> Self {
        match e {
            super::Error::NotFound(_) => Self::NOT_FOUND,
            super::Error::EmptyBody => Self::BAD_REQUEST,
            super::Error::_Thread(e) => e.into(),
            super::Error::_Proposal(e) => e.as_ref().into(),
            super::Error::Unexpected(_) | super::Error::_R2d2(_) | super::Error::_Diesel(_) => {
                Self::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub(super) mod api {
    use axum::{
        Extension, Json,
        extract::{Path, State},
        http::StatusCode,
    };
    use axum_extra::extract::Query;
    use serde::Deserialize;

    use crate::{
        auth,
        message::{self, model::MessageDto},
        thread,
    };

    #[derive(Deserialize)]
    pub struct CreateParams {
        body: String,
    }

    pub async fn create(
        Extension(auth_user): Extension<auth::User>,
        message_service: State<message::Service>,
        Path(thread_id): Path<thread::Id>,
        Json(params): Json<CreateParams>,
    ) -> crate::Result<(StatusCode, Json<MessageDto>)> {
        let msg = message_service
            .send(auth_user.id(), &thread_id, &params.body)
            .await?;

        Ok((StatusCode::CREATED, Json(msg)))
    }

    #[derive(Deserialize)]
    pub struct FindAllParams {
        since: Option<message::Id>,
    }

    pub async fn find_all(
        Extension(auth_user): Extension<auth::User>,
        message_service: State<message::Service>,
        Path(thread_id): Path<thread::Id>,
        Query(params): Query<FindAllParams>,
    ) -> crate::Result<Json<Vec<MessageDto>>> {
        let messages = message_service
            .list(auth_user.id(), &thread_id, params.since.as_ref())
            .await?;

        Ok(Json(messages))
    }
}
