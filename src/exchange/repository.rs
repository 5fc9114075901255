use diesel::ExpressionMethods;
use diesel::OptionalExtension;
use diesel::PgConnection;
use diesel::QueryDsl;
use diesel::QueryResult;
use diesel::RunQueryDsl;
use diesel::SelectableHelper;

use crate::integration::db::Pool;
use crate::message;
use crate::schema::exchanges;

use super::model::{Exchange, ExchangeRow};

pub trait ExchangeRepository {
    fn find_by_proposal(&self, proposal_id: &message::Id) -> super::Result<Option<Exchange>>;
}

pub struct PgExchangeRepository {
    pool: Pool,
}

impl PgExchangeRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// Inserts within an open transaction. The unique proposal id rejects a
/// second exchange for the same proposal.
pub(crate) fn insert_in(conn: &mut PgConnection, exchange: &Exchange) -> QueryResult<usize> {
    diesel::insert_into(exchanges::table)
        .values(ExchangeRow::from(exchange))
        .execute(conn)
}

impl ExchangeRepository for PgExchangeRepository {
    fn find_by_proposal(&self, proposal_id: &message::Id) -> super::Result<Option<Exchange>> {
        let mut conn = self.pool.get()?;

        let row = exchanges::table
            .filter(exchanges::proposal_id.eq(proposal_id.0))
            .select(ExchangeRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(Exchange::from))
    }
}
