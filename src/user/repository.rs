use diesel::ExpressionMethods;
use diesel::OptionalExtension;
use diesel::QueryDsl;
use diesel::RunQueryDsl;
use diesel::SelectableHelper;
use diesel::upsert::excluded;

use crate::integration::db::Pool;
use crate::schema::users;

use super::Id;
use super::model::{User, UserRow};

pub trait UserRepository {
    fn upsert(&self, user: &User) -> super::Result<()>;

    fn find_by_id(&self, id: &Id) -> super::Result<Option<User>>;
}

pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl UserRepository for PgUserRepository {
    fn upsert(&self, u: &User) -> super::Result<()> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(users::table)
            .values(UserRow::from(u))
            .on_conflict(users::id)
            .do_update()
            .set(users::name.eq(excluded(users::name)))
            .execute(&mut conn)?;

        Ok(())
    }

    fn find_by_id(&self, id: &Id) -> super::Result<Option<User>> {
        let mut conn = self.pool.get()?;

        let u = users::table
            .find(id.0)
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(u.map(User::from))
    }
}

#[cfg(test)]
mod test {
    use crate::integration::db;

    use super::*;

    #[tokio::test]
    async fn should_upsert_and_find() {
        let (_node, pool) = db::test::pool().await;
        let repo = PgUserRepository::new(pool);

        let id = Id::random();
        repo.upsert(&User::new(id, "Jora")).unwrap();
        repo.upsert(&User::new(id, "Jora Cardan")).unwrap();

        let actual = repo.find_by_id(&id).unwrap().unwrap();
        assert_eq!(actual.name(), "Jora Cardan");
    }

    #[tokio::test]
    async fn should_not_find_unknown() {
        let (_node, pool) = db::test::pool().await;
        let repo = PgUserRepository::new(pool);

        assert!(repo.find_by_id(&Id::random()).unwrap().is_none());
    }
}
