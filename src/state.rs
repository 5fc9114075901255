use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::service::HttpAuthService;
use crate::conversation::service::ConversationServiceImpl;
use crate::exchange::ledger::HttpLedger;
use crate::exchange::repository::PgExchangeRepository;
use crate::exchange::service::ExchangeServiceImpl;
use crate::integration::{self, Config};
use crate::library::client::HttpLibrary;
use crate::message::repository::PgMessageRepository;
use crate::message::service::MessageServiceImpl;
use crate::proposal::repository::PgProposalRepository;
use crate::proposal::service::ProposalServiceImpl;
use crate::thread::repository::PgThreadRepository;
use crate::thread::service::ThreadServiceImpl;
use crate::unread::repository::PgCursorRepository;
use crate::unread::service::UnreadServiceImpl;
use crate::user::repository::PgUserRepository;
use crate::user::service::UserServiceImpl;
use crate::{
    auth, conversation, exchange, library, message, proposal, thread, unread, user,
};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub auth_service: auth::Service,
    pub user_service: user::Service,
    pub thread_service: thread::Service,
    pub message_service: message::Service,
    pub proposal_service: proposal::Service,
    pub exchange_service: exchange::Service,
    pub unread_service: unread::Service,
    pub conversation_service: conversation::Service,
}

pub struct Repositories {
    pub user: user::Repository,
    pub thread: thread::Repository,
    pub message: message::Repository,
    pub proposal: proposal::Repository,
    pub exchange: exchange::Repository,
    pub cursor: unread::Repository,
}

impl Repositories {
    pub fn postgres(pool: integration::db::Pool) -> Self {
        Self {
            user: Arc::new(PgUserRepository::new(pool.clone())),
            thread: Arc::new(PgThreadRepository::new(pool.clone())),
            message: Arc::new(PgMessageRepository::new(pool.clone())),
            proposal: Arc::new(PgProposalRepository::new(pool.clone())),
            exchange: Arc::new(PgExchangeRepository::new(pool.clone())),
            cursor: Arc::new(PgCursorRepository::new(pool)),
        }
    }
}

pub struct Collaborators {
    pub auth: auth::Service,
    pub library: library::Client,
    pub ledger: exchange::Ledger,
}

impl Collaborators {
    pub fn http(config: &Config) -> crate::Result<Self> {
        let http = integration::init_http_client()?;

        Ok(Self {
            auth: Arc::new(HttpAuthService::new(http.clone(), &config.auth)?),
            library: Arc::new(HttpLibrary::new(http.clone(), &config.library)),
            ledger: Arc::new(HttpLedger::new(http, &config.ledger)),
        })
    }
}

impl AppState {
    pub fn new(repos: Repositories, collaborators: Collaborators) -> Self {
        let user_service: user::Service = Arc::new(UserServiceImpl::new(repos.user));
        let thread_service: thread::Service = Arc::new(ThreadServiceImpl::new(repos.thread));
        let exchange_service: exchange::Service = Arc::new(ExchangeServiceImpl::new(
            repos.exchange,
            collaborators.ledger,
        ));
        let unread_service: unread::Service = Arc::new(UnreadServiceImpl::new(
            repos.cursor,
            repos.message.clone(),
            thread_service.clone(),
        ));

        Self {
            auth_service: collaborators.auth,
            message_service: Arc::new(MessageServiceImpl::new(
                repos.message.clone(),
                thread_service.clone(),
                repos.proposal.clone(),
            )),
            proposal_service: Arc::new(ProposalServiceImpl::new(
                repos.proposal.clone(),
                thread_service.clone(),
                exchange_service.clone(),
                collaborators.library,
            )),
            conversation_service: Arc::new(ConversationServiceImpl::new(
                thread_service.clone(),
                repos.message,
                repos.proposal,
                unread_service.clone(),
                user_service.clone(),
            )),
            user_service,
            thread_service,
            exchange_service,
            unread_service,
        }
    }

    pub async fn init(config: &Config) -> crate::Result<Self> {
        let pool = config.postgres.connect()?;

        Ok(Self::new(
            Repositories::postgres(pool),
            Collaborators::http(config)?,
        ))
    }
}
