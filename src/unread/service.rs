use log::debug;

use crate::thread::model::Thread;
use crate::{message, thread, user};

use super::Repository;

#[async_trait::async_trait]
pub trait UnreadService {
    async fn mark_read(
        &self,
        user: &user::Id,
        thread_id: &thread::Id,
        up_to: &message::Id,
    ) -> super::Result<()>;

    async fn unread_count(&self, user: &user::Id, thread_id: &thread::Id) -> super::Result<u64>;

    /// Unread count for a thread the caller already resolved.
    async fn unread_count_in(&self, thread: &Thread, user: &user::Id) -> super::Result<u64>;
}

#[derive(Clone)]
pub struct UnreadServiceImpl {
    repo: Repository,
    message_repo: message::Repository,
    thread_service: thread::Service,
}

impl UnreadServiceImpl {
    pub fn new(
        repo: Repository,
        message_repo: message::Repository,
        thread_service: thread::Service,
    ) -> Self {
        Self {
            repo,
            message_repo,
            thread_service,
        }
    }
}

#[async_trait::async_trait]
impl UnreadService for UnreadServiceImpl {
    async fn mark_read(
        &self,
        user: &user::Id,
        thread_id: &thread::Id,
        up_to: &message::Id,
    ) -> super::Result<()> {
        self.thread_service
            .find_for_participant(thread_id, user)
            .await?;

        match self.message_repo.find_by_id(up_to)? {
            Some(m) if m.thread_id() == thread_id => {}
            _ => return Err(super::Error::MessageNotFound(*up_to)),
        }

        let pos = self.repo.advance(user, thread_id, up_to)?;
        debug!("{user} read thread {thread_id} up to {pos}");
        Ok(())
    }

    async fn unread_count(&self, user: &user::Id, thread_id: &thread::Id) -> super::Result<u64> {
        let thread = self
            .thread_service
            .find_for_participant(thread_id, user)
            .await?;

        self.unread_count_in(&thread, user).await
    }

    async fn unread_count_in(&self, thread: &Thread, user: &user::Id) -> super::Result<u64> {
        let cursor = self.repo.find(user, thread.id())?;
        let count = self
            .message_repo
            .count_unread(thread.id(), user, cursor.as_ref())?;

        Ok(count)
    }
}
