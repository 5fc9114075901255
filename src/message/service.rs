use std::collections::HashMap;

use log::debug;

use crate::proposal::model::ProposalDto;
use crate::{proposal, thread, user};

use super::model::{MessageDto, NewMessage};
use super::{Id, Kind, Repository};

#[async_trait::async_trait]
pub trait MessageService {
    /// Appends a plain message on behalf of a participant.
    async fn send(
        &self,
        sender: &user::Id,
        thread_id: &thread::Id,
        body: &str,
    ) -> super::Result<MessageDto>;

    /// Thread messages as seen by `viewer`, proposal messages carrying
    /// their current state.
    async fn list(
        &self,
        viewer: &user::Id,
        thread_id: &thread::Id,
        since: Option<&Id>,
    ) -> super::Result<Vec<MessageDto>>;
}

#[derive(Clone)]
pub struct MessageServiceImpl {
    repo: Repository,
    thread_service: thread::Service,
    proposal_repo: proposal::Repository,
}

impl MessageServiceImpl {
    pub fn new(
        repo: Repository,
        thread_service: thread::Service,
        proposal_repo: proposal::Repository,
    ) -> Self {
        Self {
            repo,
            thread_service,
            proposal_repo,
        }
    }
}

#[async_trait::async_trait]
impl MessageService for MessageServiceImpl {
    async fn send(
        &self,
        sender: &user::Id,
        thread_id: &thread::Id,
        body: &str,
    ) -> super::Result<MessageDto> {
        let body = body.trim();
        if body.is_empty() {
            return Err(super::Error::EmptyBody);
        }

        self.thread_service
            .find_for_participant(thread_id, sender)
            .await?;

        let msg = self
            .repo
            .append(&NewMessage::plain(*thread_id, *sender, body))?;
        debug!("message {} appended to thread {thread_id}", msg.id());

        Ok(msg.into())
    }

    async fn list(
        &self,
        viewer: &user::Id,
        thread_id: &thread::Id,
        since: Option<&Id>,
    ) -> super::Result<Vec<MessageDto>> {
        let thread = self
            .thread_service
            .find_for_participant(thread_id, viewer)
            .await?;

        let messages = self.repo.find_by_thread(thread_id, since)?;

        let mut proposals = if messages.iter().any(|m| m.kind() == Kind::Proposal) {
            self.proposal_repo
                .find_by_thread(&thread)?
                .into_iter()
                .map(|p| (*p.id(), p))
                .collect::<HashMap<_, _>>()
        } else {
            HashMap::new()
        };

        let dtos = messages
            .into_iter()
            .map(|m| {
                let proposal = proposals
                    .remove(m.id())
                    .map(|p| ProposalDto::for_viewer(&p, viewer));
                MessageDto::new(m, proposal)
            })
            .collect();

        Ok(dtos)
    }
}
