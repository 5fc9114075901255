use axum::http::StatusCode;

impl From<&super::Error> for StatusCode {
    fn from(e: &super::Error) -> Self {
        match e {
            super::Error::Forbidden => Self::FORBIDDEN,
            super::Error::Unexpected(_) => Self::INTERNAL_SERVER_ERROR,
            super::Error::_Thread(e) => e.into(),
            super::Error::_Message(e) => e.into(),
            super::Error::_Proposal(e) => e.into(),
            super::Error::_Unread(e) => e.into(),
            super::Error::_User(_) => Self::INTERNAL_SERVER_ERROR,
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
        conversation::{self, model::ConversationSummary},
        user,
    };

    pub async fn find_all(
        Extension(auth_user): Extension<auth::User>,
        conversation_service: State<conversation::Service>,
        Path(user_id): Path<user::Id>,
    ) -> crate::Result<Json<Vec<ConversationSummary>>> {
        let conversations = conversation_service
            .list(auth_user.id(), &user_id)
            .await?;

        Ok(Json(conversations))
    }
}
