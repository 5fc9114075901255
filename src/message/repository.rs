use chrono::{DateTime, Utc};
use diesel::Connection;
use diesel::ExpressionMethods;
use diesel::OptionalExtension;
use diesel::PgConnection;
use diesel::QueryDsl;
use diesel::QueryResult;
use diesel::RunQueryDsl;
use diesel::SelectableHelper;
use diesel::dsl::max;
use uuid::Uuid;

use crate::integration::db::Pool;
use crate::schema::{messages, threads};
use crate::{thread, user};

use super::Id;
use super::model::{Message, MessageRow, NewMessage, NewMessageRow};

pub trait MessageRepository {
    fn append(&self, message: &NewMessage) -> super::Result<Message>;

    fn find_by_id(&self, id: &Id) -> super::Result<Option<Message>>;

    /// Messages of the thread in `(sent_at, id)` order, optionally only
    /// those after `since`.
    fn find_by_thread(
        &self,
        thread_id: &thread::Id,
        since: Option<&Id>,
    ) -> super::Result<Vec<Message>>;

    fn find_last(&self, thread_id: &thread::Id) -> super::Result<Option<Message>>;

    /// Counts messages after `after` not sent by `viewer`.
    fn count_unread(
        &self,
        thread_id: &thread::Id,
        viewer: &user::Id,
        after: Option<&Id>,
    ) -> super::Result<u64>;
}

pub struct PgMessageRepository {
    pool: Pool,
}

impl PgMessageRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// Takes the row lock that serialises every append to the thread until
/// the surrounding transaction ends.
pub(crate) fn lock_thread(conn: &mut PgConnection, thread_id: &thread::Id) -> QueryResult<Uuid> {
    threads::table
        .find(thread_id.0)
        .select(threads::id)
        .for_update()
        .first(conn)
}

/// Appends within an open transaction. `sent_at` never goes below the
/// latest message of the thread, so `(sent_at, id)` keeps insertion order.
pub(crate) fn append_in(conn: &mut PgConnection, m: &NewMessage) -> QueryResult<MessageRow> {
    lock_thread(conn, m.thread_id())?;

    let last: Option<DateTime<Utc>> = messages::table
        .filter(messages::thread_id.eq(m.thread_id().0))
        .select(max(messages::sent_at))
        .first(conn)?;

    let now = Utc::now();
    let sent_at = last.map_or(now, |l| l.max(now));

    diesel::insert_into(messages::table)
        .values(NewMessageRow {
            thread_id: m.thread_id().0,
            sender_id: m.sender_id().0,
            body: m.body(),
            kind: m.kind().as_str(),
            sent_at,
        })
        .returning(MessageRow::as_returning())
        .get_result(conn)
}

impl MessageRepository for PgMessageRepository {
    fn append(&self, m: &NewMessage) -> super::Result<Message> {
        let mut conn = self.pool.get()?;

        let row = conn.transaction(|conn| append_in(conn, m))?;

        Message::try_from(row)
    }

    fn find_by_id(&self, id: &Id) -> super::Result<Option<Message>> {
        let mut conn = self.pool.get()?;

        let row = messages::table
            .find(id.0)
            .select(MessageRow::as_select())
            .first(&mut conn)
            .optional()?;

        row.map(Message::try_from).transpose()
    }

    fn find_by_thread(
        &self,
        thread_id: &thread::Id,
        since: Option<&Id>,
    ) -> super::Result<Vec<Message>> {
        let mut conn = self.pool.get()?;

        let mut query = messages::table
            .filter(messages::thread_id.eq(thread_id.0))
            .order((messages::sent_at.asc(), messages::id.asc()))
            .select(MessageRow::as_select())
            .into_boxed();

        if let Some(since) = since {
            query = query.filter(messages::id.gt(since.0));
        }

        query
            .load(&mut conn)?
            .into_iter()
            .map(Message::try_from)
            .collect()
    }

    fn find_last(&self, thread_id: &thread::Id) -> super::Result<Option<Message>> {
        let mut conn = self.pool.get()?;

        let row = messages::table
            .filter(messages::thread_id.eq(thread_id.0))
            .order((messages::sent_at.desc(), messages::id.desc()))
            .select(MessageRow::as_select())
            .first(&mut conn)
            .optional()?;

        row.map(Message::try_from).transpose()
    }

    fn count_unread(
        &self,
        thread_id: &thread::Id,
        viewer: &user::Id,
        after: Option<&Id>,
    ) -> super::Result<u64> {
        let mut conn = self.pool.get()?;

        let count: i64 = messages::table
            .filter(messages::thread_id.eq(thread_id.0))
            .filter(messages::sender_id.ne(viewer.0))
            .filter(messages::id.gt(after.map_or(0, |a| a.0)))
            .count()
            .get_result(&mut conn)?;

        Ok(count.unsigned_abs())
    }
}
