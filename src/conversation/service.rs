use futures::future::try_join_all;

use crate::message::Kind;
use crate::thread::model::Thread;
use crate::{message, proposal, thread, unread, user};

use super::model::{self, ConversationSummary};

#[async_trait::async_trait]
pub trait ConversationService {
    /// Conversation list of `user_id`, visible to that user only.
    async fn list(
        &self,
        viewer: &user::Id,
        user_id: &user::Id,
    ) -> super::Result<Vec<ConversationSummary>>;
}

#[derive(Clone)]
pub struct ConversationServiceImpl {
    thread_service: thread::Service,
    message_repo: message::Repository,
    proposal_repo: proposal::Repository,
    unread_service: unread::Service,
    user_service: user::Service,
}

impl ConversationServiceImpl {
    pub fn new(
        thread_service: thread::Service,
        message_repo: message::Repository,
        proposal_repo: proposal::Repository,
        unread_service: unread::Service,
        user_service: user::Service,
    ) -> Self {
        Self {
            thread_service,
            message_repo,
            proposal_repo,
            unread_service,
            user_service,
        }
    }

    async fn summarize(
        &self,
        thread: Thread,
        user: &user::Id,
    ) -> super::Result<ConversationSummary> {
        let counterpart_id = thread.counterpart(user).copied().ok_or_else(|| {
            super::Error::Unexpected(format!("{user} is not in thread {}", thread.id()))
        })?;

        let last = self.message_repo.find_last(thread.id())?;
        let (last_message_preview, last_message_at) = match last {
            None => (String::new(), *thread.created_at()),
            Some(m) if m.kind() == Kind::Proposal => {
                let preview = self
                    .proposal_repo
                    .find_by_id(m.id())?
                    .map_or_else(|| m.body().to_string(), |p| p.summary());
                (preview, *m.sent_at())
            }
            Some(m) => (m.body().to_string(), *m.sent_at()),
        };

        let unread_count = self.unread_service.unread_count_in(&thread, user).await?;

        let counterpart_name = match self.user_service.find_name(&counterpart_id).await {
            Ok(name) => name,
            Err(user::Error::NotFound(_)) => counterpart_id.to_string(),
            Err(e) => return Err(e.into()),
        };

        Ok(ConversationSummary {
            thread_id: *thread.id(),
            counterpart_id,
            counterpart_name,
            last_message_preview,
            last_message_at,
            unread_count,
            book_title: thread.book_title().map(String::from),
        })
    }
}

#[async_trait::async_trait]
impl ConversationService for ConversationServiceImpl {
    async fn list(
        &self,
        viewer: &user::Id,
        user_id: &user::Id,
    ) -> super::Result<Vec<ConversationSummary>> {
        if viewer != user_id {
            return Err(super::Error::Forbidden);
        }

        let threads = self.thread_service.find_by_participant(user_id).await?;

        let mut summaries =
            try_join_all(threads.into_iter().map(|t| self.summarize(t, user_id))).await?;

        model::sort(&mut summaries);
        Ok(summaries)
    }
}
