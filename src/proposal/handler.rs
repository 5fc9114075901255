use axum::http::StatusCode;

impl From<&super::Error> for StatusCode {
    fn from(e: &super::Error) -> Self {
        match e {
            super::Error::NotFound(_) => Self::NOT_FOUND,
            super::Error::NotParticipant | super::Error::Forbidden => Self::FORBIDDEN,
            super::Error::DuplicateOpenProposal(_) | super::Error::AlreadyResolved(_) => {
                Self::CONFLICT
            }
            super::Error::MissingSelection | super::Error::BookNotOwned(_) => Self::BAD_REQUEST,
            super::Error::_Thread(e) => e.into(),
            super::Error::_Library(e) => e.into(),
            super::Error::_Exchange(e) => e.into(),
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
    use serde::Deserialize;

    use crate::{
        auth,
        library::BookId,
        proposal::{
            self, Action,
            model::{Outcome, ProposalDto, Proposed},
        },
        thread, user,
    };

    #[derive(Deserialize)]
    pub struct ProposeParams {
        responder_id: user::Id,
        target_book_id: BookId,
        target_book_title: String,
    }

    pub async fn propose(
        Extension(auth_user): Extension<auth::User>,
        proposal_service: State<proposal::Service>,
        Json(params): Json<ProposeParams>,
    ) -> crate::Result<(StatusCode, Json<Proposed>)> {
        let proposed = proposal_service
            .propose(
                auth_user.id(),
                &params.responder_id,
                &params.target_book_id,
                &params.target_book_title,
            )
            .await?;

        Ok((StatusCode::CREATED, Json(proposed)))
    }

    #[derive(Deserialize)]
    pub struct CreateParams {
        target_book_id: BookId,
        target_book_title: String,
    }

    pub async fn create(
        Extension(auth_user): Extension<auth::User>,
        proposal_service: State<proposal::Service>,
        Path(thread_id): Path<thread::Id>,
        Json(params): Json<CreateParams>,
    ) -> crate::Result<(StatusCode, Json<ProposalDto>)> {
        let proposal = proposal_service
            .create(
                &thread_id,
                auth_user.id(),
                &params.target_book_id,
                &params.target_book_title,
            )
            .await?;

        Ok((StatusCode::CREATED, Json(proposal)))
    }

    #[derive(Deserialize)]
    pub struct RespondParams {
        action: Action,
        selected_book_id: Option<BookId>,
        thread_id: Option<thread::Id>,
    }

    pub async fn respond(
        Extension(auth_user): Extension<auth::User>,
        proposal_service: State<proposal::Service>,
        Path(id): Path<proposal::Id>,
        Json(params): Json<RespondParams>,
    ) -> crate::Result<Json<Outcome>> {
        let outcome = proposal_service
            .respond(
                params.thread_id.as_ref(),
                &id,
                auth_user.id(),
                params.action,
                params.selected_book_id.as_ref(),
            )
            .await?;

        Ok(Json(outcome))
    }

    pub async fn find_one(
        Extension(auth_user): Extension<auth::User>,
        proposal_service: State<proposal::Service>,
        Path(id): Path<proposal::Id>,
    ) -> crate::Result<Json<Outcome>> {
        let outcome = proposal_service.find(&id, auth_user.id()).await?;

        Ok(Json(outcome))
    }
}
