use axum::http::StatusCode;

impl From<&super::Error> for StatusCode {
    fn from(e: &super::Error) -> Self {
        match e {
            super::Error::MessageNotFound(_) => Self::NOT_FOUND,
            super::Error::_Thread(e) => e.into(),
            super::Error::_Message(e) => e.into(),
            super::Error::_R2d2(_) | super::Error::_Diesel(_) => Self::INTERNAL_SERVER_ERROR,
        }
    }
}

pub(super) mod api {
    use axum::{
        Extension, Json,
        extract::{Path, State},
        http::StatusCode,
    };
    use serde::{Deserialize, Serialize};

    use crate::{auth, message, thread, unread};

    #[derive(Deserialize)]
    pub struct MarkReadParams {
        up_to_message_id: message::Id,
    }

    pub async fn mark_read(
        Extension(auth_user): Extension<auth::User>,
        unread_service: State<unread::Service>,
        Path(thread_id): Path<thread::Id>,
        Json(params): Json<MarkReadParams>,
    ) -> crate::Result<StatusCode> {
        unread_service
            .mark_read(auth_user.id(), &thread_id, &params.up_to_message_id)
            .await?;

        Ok(StatusCode::NO_CONTENT)
    }

    #[derive(Serialize)]
    pub struct UnreadCount {
        unread_count: u64,
    }

    pub async fn unread_count(
        Extension(auth_user): Extension<auth::User>,
        unread_service: State<unread::Service>,
        Path(thread_id): Path<thread::Id>,
    ) -> crate::Result<Json<UnreadCount>> {
        let unread_count = unread_service
            .unread_count(auth_user.id(), &thread_id)
            .await?;

        Ok(Json(UnreadCount { unread_count }))
    }
}
