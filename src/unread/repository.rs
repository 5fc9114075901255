use diesel::ExpressionMethods;
use diesel::OptionalExtension;
use diesel::QueryDsl;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_types::{BigInt, Uuid as SqlUuid};

use crate::integration::db::Pool;
use crate::schema::read_cursors;
use crate::{message, thread, user};

pub trait CursorRepository {
    /// Moves the cursor of `user` in the thread up to `up_to`. Never moves
    /// it backwards; returns the resulting position.
    fn advance(
        &self,
        user: &user::Id,
        thread_id: &thread::Id,
        up_to: &message::Id,
    ) -> super::Result<message::Id>;

    fn find(&self, user: &user::Id, thread_id: &thread::Id) -> super::Result<Option<message::Id>>;
}

pub struct PgCursorRepository {
    pool: Pool,
}

impl PgCursorRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[derive(QueryableByName)]
struct Position {
    #[diesel(sql_type = BigInt)]
    last_read_id: i64,
}

const ADVANCE: &str = "\
INSERT INTO read_cursors (user_id, thread_id, last_read_id, updated_at) \
VALUES ($1, $2, $3, now()) \
ON CONFLICT (user_id, thread_id) DO UPDATE \
SET last_read_id = GREATEST(read_cursors.last_read_id, EXCLUDED.last_read_id), \
    updated_at = now() \
RETURNING last_read_id";

impl CursorRepository for PgCursorRepository {
    fn advance(
        &self,
        user: &user::Id,
        thread_id: &thread::Id,
        up_to: &message::Id,
    ) -> super::Result<message::Id> {
        let mut conn = self.pool.get()?;

        let pos = diesel::sql_query(ADVANCE)
            .bind::<SqlUuid, _>(user.0)
            .bind::<SqlUuid, _>(thread_id.0)
            .bind::<BigInt, _>(up_to.0)
            .get_result::<Position>(&mut conn)?;

        Ok(pos.last_read_id.into())
    }

    fn find(&self, user: &user::Id, thread_id: &thread::Id) -> super::Result<Option<message::Id>> {
        let mut conn = self.pool.get()?;

        let last = read_cursors::table
            .filter(read_cursors::user_id.eq(user.0))
            .filter(read_cursors::thread_id.eq(thread_id.0))
            .select(read_cursors::last_read_id)
            .first::<i64>(&mut conn)
            .optional()?;

        Ok(last.map(message::Id::from))
    }
}
