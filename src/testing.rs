//! In-memory store and fake collaborators for service and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::auth::{self, service::AuthService};
use crate::exchange::ledger::LoanLedger;
use crate::exchange::model::{Exchange, LoanRequest};
use crate::exchange::repository::ExchangeRepository;
use crate::exchange::{self, LoanId};
use crate::library::{self, Book, BookId, PersonalLibrary};
use crate::message::model::{Message, NewMessage};
use crate::message::repository::MessageRepository;
use crate::message::{self, Kind};
use crate::proposal::model::{Event, Proposal, Resolution};
use crate::proposal::repository::ProposalRepository;
use crate::proposal::{self, Status};
use crate::state::{AppState, Collaborators, Repositories};
use crate::thread::model::Thread;
use crate::thread::repository::ThreadRepository;
use crate::unread::repository::CursorRepository;
use crate::user::model::User;
use crate::user::repository::UserRepository;
use crate::{thread, unread, user};

#[derive(Default)]
struct Inner {
    users: HashMap<user::Id, User>,
    threads: Vec<Thread>,
    messages: Vec<Message>,
    events: Vec<(proposal::Id, Event)>,
    exchanges: Vec<Exchange>,
    cursors: HashMap<(user::Id, thread::Id), message::Id>,
    next_id: i64,
}

impl Inner {
    fn thread(&self, id: &thread::Id) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id() == id)
    }

    fn append(&mut self, m: &NewMessage) -> Option<Message> {
        self.thread(m.thread_id())?;

        let now = Utc::now();
        let sent_at = self
            .messages
            .iter()
            .filter(|x| x.thread_id() == m.thread_id())
            .map(|x| *x.sent_at())
            .max()
            .map_or(now, |last| last.max(now));

        self.next_id += 1;
        let stored = m.clone().stored(message::Id(self.next_id), sent_at);
        self.messages.push(stored.clone());
        Some(stored)
    }

    fn proposal(&self, id: &proposal::Id) -> proposal::Result<Option<Proposal>> {
        let events: Vec<Event> = self
            .events
            .iter()
            .filter(|(p, _)| p == id)
            .map(|(_, e)| e.clone())
            .collect();
        if events.is_empty() {
            return Ok(None);
        }

        let thread = self
            .messages
            .iter()
            .find(|m| m.id() == id)
            .and_then(|m| self.thread(m.thread_id()))
            .ok_or_else(|| proposal::Error::Unexpected(format!("orphan proposal {id}")))?;

        Proposal::replay(*id, thread, &events).map(Some)
    }

    fn is_resolved(&self, id: &proposal::Id) -> bool {
        self.events
            .iter()
            .any(|(p, e)| p == id && matches!(e, Event::Resolved { .. }))
    }
}

/// Implements every repository over one lock, so each call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_commits: AtomicBool,
}

impl MemoryStore {
    /// Makes every later `resolve` fail as if the transaction rolled back.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn exchange_count(&self) -> usize {
        self.inner.lock().unwrap().exchanges.len()
    }

    pub fn resolution_count(&self, id: &proposal::Id) -> usize {
        self.inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|(p, e)| p == id && matches!(e, Event::Resolved { .. }))
            .count()
    }
}

impl UserRepository for MemoryStore {
    fn upsert(&self, user: &User) -> user::Result<()> {
        self.inner
            .lock()
            .unwrap()
            .users
            .insert(*user.id(), user.clone());
        Ok(())
    }

    fn find_by_id(&self, id: &user::Id) -> user::Result<Option<User>> {
        Ok(self.inner.lock().unwrap().users.get(id).cloned())
    }
}

impl ThreadRepository for MemoryStore {
    fn insert_or_get(&self, thread: &Thread) -> thread::Result<Thread> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(existing) = inner.threads.iter().find(|t| {
            t.participants() == thread.participants()
                && t.book_id().is_some()
                && t.book_id() == thread.book_id()
        }) {
            return Ok(existing.clone());
        }

        inner.threads.push(thread.clone());
        Ok(thread.clone())
    }

    fn find_by_id(&self, id: &thread::Id) -> thread::Result<Option<Thread>> {
        Ok(self.inner.lock().unwrap().thread(id).cloned())
    }

    fn find_by_participants_and_book(
        &self,
        participants: &[user::Id; 2],
        book: &BookId,
    ) -> thread::Result<Option<Thread>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .threads
            .iter()
            .find(|t| t.participants() == participants && t.book_id() == Some(book))
            .cloned())
    }

    fn find_by_participant(&self, user: &user::Id) -> thread::Result<Vec<Thread>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .threads
            .iter()
            .filter(|t| t.is_participant(user))
            .cloned()
            .collect())
    }
}

impl MessageRepository for MemoryStore {
    fn append(&self, m: &NewMessage) -> message::Result<Message> {
        self.inner
            .lock()
            .unwrap()
            .append(m)
            .ok_or(message::Error::_Diesel(diesel::result::Error::NotFound))
    }

    fn find_by_id(&self, id: &message::Id) -> message::Result<Option<Message>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .find(|m| m.id() == id)
            .cloned())
    }

    fn find_by_thread(
        &self,
        thread_id: &thread::Id,
        since: Option<&message::Id>,
    ) -> message::Result<Vec<Message>> {
        let inner = self.inner.lock().unwrap();

        let mut msgs: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.thread_id() == thread_id)
            .filter(|m| since.is_none_or(|s| m.id() > s))
            .cloned()
            .collect();
        msgs.sort_by_key(|m| (*m.sent_at(), *m.id()));
        Ok(msgs)
    }

    fn find_last(&self, thread_id: &thread::Id) -> message::Result<Option<Message>> {
        Ok(MessageRepository::find_by_thread(self, thread_id, None)?
            .into_iter()
            .next_back())
    }

    fn count_unread(
        &self,
        thread_id: &thread::Id,
        viewer: &user::Id,
        after: Option<&message::Id>,
    ) -> message::Result<u64> {
        let inner = self.inner.lock().unwrap();

        let count = inner
            .messages
            .iter()
            .filter(|m| m.thread_id() == thread_id)
            .filter(|m| m.sender_id() != viewer)
            .filter(|m| after.is_none_or(|a| m.id() > a))
            .count();
        Ok(count as u64)
    }
}

impl ProposalRepository for MemoryStore {
    fn create(
        &self,
        thread: &Thread,
        proposer: &user::Id,
        book_id: &BookId,
        book_title: &str,
    ) -> proposal::Result<Proposal> {
        let mut inner = self.inner.lock().unwrap();

        let open = inner
            .messages
            .iter()
            .filter(|m| m.thread_id() == thread.id() && m.kind() == Kind::Proposal)
            .any(|m| !inner.is_resolved(m.id()));
        if open {
            return Err(proposal::Error::DuplicateOpenProposal(*thread.id()));
        }

        let msg = inner
            .append(&NewMessage::new(
                *thread.id(),
                *proposer,
                Proposal::body(book_title),
                Kind::Proposal,
            ))
            .ok_or(proposal::Error::_Diesel(diesel::result::Error::NotFound))?;

        let event = Event::Created {
            proposer: *proposer,
            target_book_id: book_id.clone(),
            target_book_title: book_title.to_string(),
            at: *msg.sent_at(),
        };
        inner.events.push((*msg.id(), event.clone()));

        Proposal::replay(*msg.id(), thread, &[event])
    }

    fn find_by_id(&self, id: &proposal::Id) -> proposal::Result<Option<Proposal>> {
        self.inner.lock().unwrap().proposal(id)
    }

    fn find_by_thread(&self, thread: &Thread) -> proposal::Result<Vec<Proposal>> {
        let inner = self.inner.lock().unwrap();

        inner
            .messages
            .iter()
            .filter(|m| m.thread_id() == thread.id() && m.kind() == Kind::Proposal)
            .filter_map(|m| inner.proposal(m.id()).transpose())
            .collect()
    }

    fn resolve(&self, resolution: &Resolution) -> proposal::Result<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(proposal::Error::_Diesel(
                diesel::result::Error::RollbackTransaction,
            ));
        }

        let mut inner = self.inner.lock().unwrap();
        let p = resolution.proposal();

        if inner.is_resolved(p.id()) {
            return Err(proposal::Error::AlreadyResolved(*p.id()));
        }
        let confirmed = inner.exchanges.iter().any(|e| e.proposal_id() == p.id());
        if resolution.exchange().is_some() && confirmed {
            return Err(exchange::Error::AlreadyConfirmed(*p.id()).into());
        }

        let event = p
            .resolved_event()
            .ok_or_else(|| proposal::Error::Unexpected("not resolved".into()))?;
        inner.events.push((*p.id(), event));
        if let Some(e) = resolution.exchange() {
            inner.exchanges.push(e.clone());
        }
        inner.append(resolution.note());

        Ok(())
    }
}

impl ExchangeRepository for MemoryStore {
    fn find_by_proposal(&self, proposal_id: &message::Id) -> exchange::Result<Option<Exchange>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .exchanges
            .iter()
            .find(|e| e.proposal_id() == proposal_id)
            .cloned())
    }
}

impl CursorRepository for MemoryStore {
    fn advance(
        &self,
        user: &user::Id,
        thread_id: &thread::Id,
        up_to: &message::Id,
    ) -> unread::Result<message::Id> {
        let mut inner = self.inner.lock().unwrap();

        let pos = inner.cursors.entry((*user, *thread_id)).or_insert(*up_to);
        *pos = (*pos).max(*up_to);
        Ok(*pos)
    }

    fn find(&self, user: &user::Id, thread_id: &thread::Id) -> unread::Result<Option<message::Id>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .cursors
            .get(&(*user, *thread_id))
            .copied())
    }
}

#[derive(Default)]
pub struct FakeLibrary {
    books: Mutex<HashMap<BookId, Book>>,
    down: AtomicBool,
}

impl FakeLibrary {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn put(&self, id: &str, owner: user::Id, title: &str) {
        self.books.lock().unwrap().insert(
            BookId::from(id),
            Book {
                owner_id: owner,
                title: title.to_string(),
            },
        );
    }
}

#[async_trait::async_trait]
impl PersonalLibrary for FakeLibrary {
    async fn get_book(&self, id: &BookId) -> library::Result<Book> {
        if self.down.load(Ordering::SeqCst) {
            return Err(library::Error::Unavailable("library down".into()));
        }
        self.books
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| library::Error::BookNotFound(id.clone()))
    }
}

/// Idempotent on the exchange id, like the real ledger.
#[derive(Default)]
pub struct FakeLedger {
    loans: Mutex<HashMap<exchange::Id, LoanId>>,
    cancelled: Mutex<Vec<LoanId>>,
    calls: AtomicUsize,
    down: AtomicBool,
}

impl FakeLedger {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> Vec<LoanId> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LoanLedger for FakeLedger {
    async fn create_loan(&self, request: &LoanRequest) -> exchange::Result<LoanId> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(exchange::Error::LedgerUnavailable("ledger down".into()));
        }

        let mut loans = self.loans.lock().unwrap();
        let next = LoanId(format!("loan-{}", loans.len() + 1));
        Ok(loans.entry(request.exchange_id).or_insert(next).clone())
    }

    async fn cancel_loan(&self, loan_id: &LoanId) -> exchange::Result<()> {
        self.cancelled.lock().unwrap().push(loan_id.clone());
        Ok(())
    }
}

/// Accepts tokens of the form `token-<name>` for registered users.
#[derive(Default)]
pub struct FakeAuth {
    users: Mutex<HashMap<String, auth::User>>,
}

impl FakeAuth {
    pub fn register(&self, name: &str) -> (String, user::Id) {
        let id = user::Id::random();
        let token = format!("token-{name}");
        self.users
            .lock()
            .unwrap()
            .insert(token.clone(), auth::User::new(id, name));
        (token, id)
    }
}

#[async_trait::async_trait]
impl AuthService for FakeAuth {
    async fn verify(&self, token: &str) -> auth::Result<auth::User> {
        self.users
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(auth::Error::Unauthorized)
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub library: Arc<FakeLibrary>,
    pub ledger: Arc<FakeLedger>,
    pub auth: Arc<FakeAuth>,
    pub state: AppState,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let library = Arc::new(FakeLibrary::default());
        let ledger = Arc::new(FakeLedger::default());
        let auth = Arc::new(FakeAuth::default());

        let repos = Repositories {
            user: store.clone(),
            thread: store.clone(),
            message: store.clone(),
            proposal: store.clone(),
            exchange: store.clone(),
            cursor: store.clone(),
        };
        let collaborators = Collaborators {
            auth: auth.clone(),
            library: library.clone(),
            ledger: ledger.clone(),
        };

        Self {
            state: AppState::new(repos, collaborators),
            store,
            library,
            ledger,
            auth,
        }
    }

    /// Registers a user with the auth fake and the local projection.
    pub fn user(&self, name: &str) -> user::Id {
        let (_, id) = self.auth.register(name);
        self.store.upsert(&User::new(id, name)).unwrap();
        id
    }

    pub fn status(&self, id: &proposal::Id) -> Status {
        ProposalRepository::find_by_id(self.store.as_ref(), id)
            .unwrap()
            .unwrap()
            .status()
    }
}
