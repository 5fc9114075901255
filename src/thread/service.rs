use log::debug;

use crate::{library::BookId, user};

use super::model::Thread;
use super::{Id, Repository};

#[async_trait::async_trait]
pub trait ThreadService {
    /// Returns the thread for the pair anchored to the given book,
    /// creating it when absent.
    async fn find_or_create(
        &self,
        initiator: &user::Id,
        counterpart: &user::Id,
        book_id: &BookId,
        book_title: &str,
    ) -> super::Result<Thread>;

    async fn find_by_id(&self, id: &Id) -> super::Result<Thread>;

    /// Fails with `NotParticipant` unless `user` takes part in the thread.
    async fn find_for_participant(&self, id: &Id, user: &user::Id) -> super::Result<Thread>;

    async fn find_by_participant(&self, user: &user::Id) -> super::Result<Vec<Thread>>;
}

#[derive(Clone)]
pub struct ThreadServiceImpl {
    repo: Repository,
}

impl ThreadServiceImpl {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }
}

#[async_trait::async_trait]
impl ThreadService for ThreadServiceImpl {
    async fn find_or_create(
        &self,
        initiator: &user::Id,
        counterpart: &user::Id,
        book_id: &BookId,
        book_title: &str,
    ) -> super::Result<Thread> {
        if initiator == counterpart {
            return Err(super::Error::SelfReference(*initiator));
        }

        let candidate = Thread::new(
            *initiator,
            *counterpart,
            Some((book_id.clone(), book_title.to_string())),
        );

        if let Some(existing) = self
            .repo
            .find_by_participants_and_book(candidate.participants(), book_id)?
        {
            return Ok(existing);
        }

        let thread = self.repo.insert_or_get(&candidate)?;
        debug!("thread {} ready for book {book_id}", thread.id());
        Ok(thread)
    }

    async fn find_by_id(&self, id: &Id) -> super::Result<Thread> {
        self.repo
            .find_by_id(id)?
            .ok_or(super::Error::NotFound(*id))
    }

    async fn find_for_participant(&self, id: &Id, user: &user::Id) -> super::Result<Thread> {
        let thread = self.find_by_id(id).await?;

        if !thread.is_participant(user) {
            return Err(super::Error::NotParticipant);
        }

        Ok(thread)
    }

    async fn find_by_participant(&self, user: &user::Id) -> super::Result<Vec<Thread>> {
        self.repo.find_by_participant(user)
    }
}
