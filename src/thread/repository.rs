use diesel::BoolExpressionMethods;
use diesel::ExpressionMethods;
use diesel::OptionalExtension;
use diesel::QueryDsl;
use diesel::RunQueryDsl;
use diesel::SelectableHelper;

use crate::integration::db::Pool;
use crate::library::BookId;
use crate::schema::threads;
use crate::user;

use super::Id;
use super::model::{Thread, ThreadRow};

pub trait ThreadRepository {
    /// Inserts the thread unless one already exists for the same
    /// participants and book, returning whichever is stored.
    fn insert_or_get(&self, thread: &Thread) -> super::Result<Thread>;

    fn find_by_id(&self, id: &Id) -> super::Result<Option<Thread>>;

    fn find_by_participants_and_book(
        &self,
        participants: &[user::Id; 2],
        book: &BookId,
    ) -> super::Result<Option<Thread>>;

    fn find_by_participant(&self, user: &user::Id) -> super::Result<Vec<Thread>>;
}

pub struct PgThreadRepository {
    pool: Pool,
}

impl PgThreadRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl ThreadRepository for PgThreadRepository {
    fn insert_or_get(&self, t: &Thread) -> super::Result<Thread> {
        let mut conn = self.pool.get()?;

        let inserted = diesel::insert_into(threads::table)
            .values(ThreadRow::from(t))
            .on_conflict((
                threads::participant_a,
                threads::participant_b,
                threads::book_id,
            ))
            .do_nothing()
            .execute(&mut conn)?;

        if inserted > 0 {
            return Ok(t.clone());
        }

        match t.book_id() {
            Some(book) => self
                .find_by_participants_and_book(t.participants(), book)?
                .ok_or(super::Error::NotFound(*t.id())),
            None => Err(super::Error::NotFound(*t.id())),
        }
    }

    fn find_by_id(&self, id: &Id) -> super::Result<Option<Thread>> {
        let mut conn = self.pool.get()?;

        let t = threads::table
            .find(id.0)
            .select(ThreadRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(t.map(Thread::from))
    }

    fn find_by_participants_and_book(
        &self,
        participants: &[user::Id; 2],
        book: &BookId,
    ) -> super::Result<Option<Thread>> {
        let mut conn = self.pool.get()?;

        let t = threads::table
            .filter(threads::participant_a.eq(participants[0].0))
            .filter(threads::participant_b.eq(participants[1].0))
            .filter(threads::book_id.eq(book.as_str()))
            .select(ThreadRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(t.map(Thread::from))
    }

    fn find_by_participant(&self, user: &user::Id) -> super::Result<Vec<Thread>> {
        let mut conn = self.pool.get()?;

        let ts = threads::table
            .filter(
                threads::participant_a
                    .eq(user.0)
                    .or(threads::participant_b.eq(user.0)),
            )
            .order(threads::id.asc())
            .select(ThreadRow::as_select())
            .load(&mut conn)?;

        Ok(ts.into_iter().map(Thread::from).collect())
    }
}

#[cfg(test)]
mod test {
    use crate::integration::db;

    use super::*;

    #[tokio::test]
    async fn should_reuse_thread_for_same_pair_and_book() {
        let (_node, pool) = db::test::pool().await;
        let repo = PgThreadRepository::new(pool);

        let (a, b) = (user::Id::random(), user::Id::random());
        let book = Some((BookId::from("T1"), "Dune".to_string()));

        let first = repo.insert_or_get(&Thread::new(a, b, book.clone())).unwrap();
        let second = repo.insert_or_get(&Thread::new(b, a, book)).unwrap();

        assert_eq!(first.id(), second.id());
    }

    #[tokio::test]
    async fn should_find_by_participant() {
        let (_node, pool) = db::test::pool().await;
        let repo = PgThreadRepository::new(pool);

        let (a, b, c) = (user::Id::random(), user::Id::random(), user::Id::random());
        repo.insert_or_get(&Thread::new(a, b, Some((BookId::from("T1"), "Dune".into()))))
            .unwrap();
        repo.insert_or_get(&Thread::new(c, a, Some((BookId::from("T2"), "Emma".into()))))
            .unwrap();

        assert_eq!(repo.find_by_participant(&a).unwrap().len(), 2);
        assert_eq!(repo.find_by_participant(&b).unwrap().len(), 1);
        assert!(repo.find_by_participant(&user::Id::random()).unwrap().is_empty());
    }
}
