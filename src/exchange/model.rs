use chrono::{DateTime, Utc};
use diesel::prelude::{Insertable, Queryable, Selectable};
use serde::Serialize;
use uuid::Uuid;

use crate::{library::BookId, message, user};

use super::{Id, LoanId};

/// Terms of a loan as sent to the ledger. The exchange id is the
/// idempotency key, so each accept attempt gets its own loan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoanRequest {
    pub exchange_id: Id,
    pub proposal_id: message::Id,
    pub proposer_id: user::Id,
    pub responder_id: user::Id,
    pub requested_book_id: BookId,
    pub offered_book_id: BookId,
}

/// Durable record of a confirmed exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Exchange {
    id: Id,
    proposal_id: message::Id,
    proposer_id: user::Id,
    responder_id: user::Id,
    requested_book_id: BookId,
    offered_book_id: BookId,
    loan_id: LoanId,
    created_at: DateTime<Utc>,
}

impl Exchange {
    pub fn new(request: LoanRequest, loan_id: LoanId) -> Self {
        Self {
            id: request.exchange_id,
            proposal_id: request.proposal_id,
            proposer_id: request.proposer_id,
            responder_id: request.responder_id,
            requested_book_id: request.requested_book_id,
            offered_book_id: request.offered_book_id,
            loan_id,
            created_at: Utc::now(),
        }
    }

    pub const fn id(&self) -> &Id {
        &self.id
    }

    pub const fn proposal_id(&self) -> &message::Id {
        &self.proposal_id
    }

    pub const fn proposer_id(&self) -> &user::Id {
        &self.proposer_id
    }

    pub const fn responder_id(&self) -> &user::Id {
        &self.responder_id
    }

    pub const fn requested_book_id(&self) -> &BookId {
        &self.requested_book_id
    }

    pub const fn offered_book_id(&self) -> &BookId {
        &self.offered_book_id
    }

    pub const fn loan_id(&self) -> &LoanId {
        &self.loan_id
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::exchanges)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ExchangeRow {
    pub id: Uuid,
    pub proposal_id: i64,
    pub proposer_id: Uuid,
    pub responder_id: Uuid,
    pub requested_book_id: String,
    pub offered_book_id: String,
    pub loan_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<ExchangeRow> for Exchange {
    fn from(row: ExchangeRow) -> Self {
        Self {
            id: row.id.into(),
            proposal_id: row.proposal_id.into(),
            proposer_id: row.proposer_id.into(),
            responder_id: row.responder_id.into(),
            requested_book_id: BookId(row.requested_book_id),
            offered_book_id: BookId(row.offered_book_id),
            loan_id: LoanId(row.loan_id),
            created_at: row.created_at,
        }
    }
}

impl From<&Exchange> for ExchangeRow {
    fn from(e: &Exchange) -> Self {
        Self {
            id: e.id.0,
            proposal_id: e.proposal_id.0,
            proposer_id: e.proposer_id.0,
            responder_id: e.responder_id.0,
            requested_book_id: e.requested_book_id.0.clone(),
            offered_book_id: e.offered_book_id.0.clone(),
            loan_id: e.loan_id.0.clone(),
            created_at: e.created_at,
        }
    }
}
