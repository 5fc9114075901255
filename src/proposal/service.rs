use log::{debug, error, info, warn};
use tokio::sync::{Mutex, MutexGuard};

use crate::exchange::{self, model::LoanRequest};
use crate::library::{self, Book, BookId};
use crate::{thread, user};

use super::model::{Decision, Outcome, Proposal, ProposalDto, Proposed, Resolution};
use super::{Action, Id, Repository};

#[async_trait::async_trait]
pub trait ProposalService {
    /// Finds or creates the thread between both users for the book and
    /// opens a proposal in it.
    async fn propose(
        &self,
        proposer: &user::Id,
        responder: &user::Id,
        book_id: &BookId,
        book_title: &str,
    ) -> super::Result<Proposed>;

    /// Opens a proposal in an existing thread.
    async fn create(
        &self,
        thread_id: &thread::Id,
        proposer: &user::Id,
        book_id: &BookId,
        book_title: &str,
    ) -> super::Result<ProposalDto>;

    async fn respond(
        &self,
        thread_id: Option<&thread::Id>,
        id: &Id,
        responder: &user::Id,
        action: Action,
        selected: Option<&BookId>,
    ) -> super::Result<Outcome>;

    async fn find(&self, id: &Id, viewer: &user::Id) -> super::Result<Outcome>;
}

const STRIPES: usize = 32;

/// Serialises work on the same proposal within the process.
struct Stripes {
    locks: Vec<Mutex<()>>,
}

impl Stripes {
    fn new() -> Self {
        Self {
            locks: (0..STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    async fn lock(&self, id: &Id) -> MutexGuard<'_, ()> {
        let idx = id.0.rem_euclid(STRIPES as i64) as usize;
        self.locks[idx].lock().await
    }
}

pub struct ProposalServiceImpl {
    repo: Repository,
    thread_service: thread::Service,
    exchange_service: exchange::Service,
    library: library::Client,
    stripes: Stripes,
}

impl ProposalServiceImpl {
    pub fn new(
        repo: Repository,
        thread_service: thread::Service,
        exchange_service: exchange::Service,
        library: library::Client,
    ) -> Self {
        Self {
            repo,
            thread_service,
            exchange_service,
            library,
            stripes: Stripes::new(),
        }
    }
}

impl ProposalServiceImpl {
    /// Looks the target book up and requires one of `parties` to own it.
    async fn target_book(
        &self,
        book_id: &BookId,
        parties: [&user::Id; 2],
    ) -> super::Result<Book> {
        let book = self.library.get_book(book_id).await?;

        if !parties.contains(&&book.owner_id) {
            return Err(super::Error::BookNotOwned(book_id.clone()));
        }

        Ok(book)
    }

    /// Requires `responder` to own `book_id` right now.
    async fn offered_book(&self, book_id: &BookId, responder: &user::Id) -> super::Result<()> {
        let book = match self.library.get_book(book_id).await {
            Ok(book) => book,
            Err(library::Error::BookNotFound(_)) => {
                return Err(super::Error::BookNotOwned(book_id.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        if book.owner_id.ne(responder) {
            return Err(super::Error::BookNotOwned(book_id.clone()));
        }

        Ok(())
    }

    async fn outcome(&self, proposal: &Proposal, viewer: &user::Id) -> super::Result<Outcome> {
        let exchange = self.exchange_service.find_by_proposal(proposal.id()).await?;

        Ok(Outcome {
            proposal: ProposalDto::for_viewer(proposal, viewer),
            exchange,
        })
    }

    async fn find_proposal(&self, id: &Id) -> super::Result<Proposal> {
        self.repo.find_by_id(id)?.ok_or(super::Error::NotFound(*id))
    }
}

#[async_trait::async_trait]
impl ProposalService for ProposalServiceImpl {
    async fn propose(
        &self,
        proposer: &user::Id,
        responder: &user::Id,
        book_id: &BookId,
        book_title: &str,
    ) -> super::Result<Proposed> {
        if proposer == responder {
            return Err(thread::Error::SelfReference(*proposer).into());
        }

        let book = self.target_book(book_id, [proposer, responder]).await?;
        if book.title != book_title {
            debug!("using library title {:?} for book {book_id}", book.title);
        }

        let thread = self
            .thread_service
            .find_or_create(proposer, responder, book_id, &book.title)
            .await?;

        let proposal = self.repo.create(&thread, proposer, book_id, &book.title)?;
        info!(
            "proposal {} opened in thread {} for book {book_id}",
            proposal.id(),
            thread.id()
        );

        Ok(Proposed {
            proposal: ProposalDto::for_viewer(&proposal, proposer),
            thread,
        })
    }

    async fn create(
        &self,
        thread_id: &thread::Id,
        proposer: &user::Id,
        book_id: &BookId,
        book_title: &str,
    ) -> super::Result<ProposalDto> {
        let thread = self
            .thread_service
            .find_for_participant(thread_id, proposer)
            .await
            .map_err(|e| match e {
                thread::Error::NotParticipant => super::Error::NotParticipant,
                e => e.into(),
            })?;

        let [a, b] = thread.participants();
        let book = self.target_book(book_id, [a, b]).await?;
        if book.title != book_title {
            debug!("using library title {:?} for book {book_id}", book.title);
        }

        let proposal = self.repo.create(&thread, proposer, book_id, &book.title)?;
        info!("proposal {} opened in thread {thread_id}", proposal.id());

        Ok(ProposalDto::for_viewer(&proposal, proposer))
    }

    async fn respond(
        &self,
        thread_id: Option<&thread::Id>,
        id: &Id,
        responder: &user::Id,
        action: Action,
        selected: Option<&BookId>,
    ) -> super::Result<Outcome> {
        let _guard = self.stripes.lock(id).await;

        let proposal = self.find_proposal(id).await?;
        if thread_id.is_some_and(|t| proposal.thread_id().ne(t)) {
            return Err(super::Error::NotFound(*id));
        }

        if proposal.check(responder, action, selected)? == Decision::Unchanged {
            debug!("proposal {id} already {}", proposal.status().as_str());
            return self.outcome(&proposal, responder).await;
        }

        let exchange = match (action, selected) {
            (Action::Accept, Some(offered)) => {
                self.offered_book(offered, responder).await?;

                let request = LoanRequest {
                    exchange_id: exchange::Id::random(),
                    proposal_id: *proposal.id(),
                    proposer_id: *proposal.proposer_id(),
                    responder_id: *proposal.responder_id(),
                    requested_book_id: proposal.target_book_id().clone(),
                    offered_book_id: offered.clone(),
                };
                Some(self.exchange_service.issue(request).await?)
            }
            (Action::Accept, None) => return Err(super::Error::MissingSelection),
            (Action::Reject, _) => None,
        };

        let resolution = Resolution::new(proposal.resolve(action, selected), exchange);

        let Err(e) = self.repo.resolve(&resolution) else {
            info!("proposal {id} {}", resolution.proposal().status().as_str());
            return Ok(Outcome {
                proposal: ProposalDto::for_viewer(resolution.proposal(), responder),
                exchange: resolution.exchange().cloned(),
            });
        };

        let lost_race = matches!(
            e,
            super::Error::AlreadyResolved(_)
                | super::Error::_Exchange(exchange::Error::AlreadyConfirmed(_))
        );

        if let Some(issued) = resolution.exchange() {
            let recorded = if lost_race {
                self.exchange_service.find_by_proposal(id).await?
            } else {
                None
            };

            if recorded.is_none_or(|r| r.loan_id().ne(issued.loan_id())) {
                if let Err(e) = self.exchange_service.revoke(issued).await {
                    error!("failed to cancel loan {}: {e}", issued.loan_id());
                }
            }
        }

        if !lost_race {
            return Err(e);
        }

        warn!("proposal {id} was resolved concurrently");
        let current = self.find_proposal(id).await?;
        match current.check(responder, action, selected)? {
            Decision::Unchanged => self.outcome(&current, responder).await,
            Decision::Commit => Err(e),
        }
    }

    async fn find(&self, id: &Id, viewer: &user::Id) -> super::Result<Outcome> {
        let proposal = self.find_proposal(id).await?;

        if !proposal.is_party(viewer) {
            return Err(super::Error::NotParticipant);
        }

        self.outcome(&proposal, viewer).await
    }
}
