use std::collections::BTreeMap;

use diesel::Connection;
use diesel::ExpressionMethods;
use diesel::PgConnection;
use diesel::QueryDsl;
use diesel::QueryResult;
use diesel::RunQueryDsl;
use diesel::SelectableHelper;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::exchange;
use crate::integration::db::Pool;
use crate::library::BookId;
use crate::message::Kind;
use crate::message::model::NewMessage;
use crate::message::repository::{append_in, lock_thread};
use crate::schema::{messages, proposal_events, threads};
use crate::thread::{
    self,
    model::{Thread, ThreadRow},
};
use crate::user;

use super::Id;
use super::model::{Event, EventRow, NewEventRow, Proposal, Resolution};

pub trait ProposalRepository {
    /// Appends the proposal message together with its creation event.
    /// Fails with `DuplicateOpenProposal` while another proposal of the
    /// thread is pending.
    fn create(
        &self,
        thread: &Thread,
        proposer: &user::Id,
        book_id: &BookId,
        book_title: &str,
    ) -> super::Result<Proposal>;

    fn find_by_id(&self, id: &Id) -> super::Result<Option<Proposal>>;

    fn find_by_thread(&self, thread: &Thread) -> super::Result<Vec<Proposal>>;

    /// Commits the terminal event, the exchange record and the outcome
    /// message in one transaction. Only the first resolution of a proposal
    /// succeeds, later ones fail with `AlreadyResolved`.
    fn resolve(&self, resolution: &Resolution) -> super::Result<()>;
}

pub struct PgProposalRepository {
    pool: Pool,
}

impl PgProposalRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn count_events(conn: &mut PgConnection, thread_id: &thread::Id, kind: &str) -> QueryResult<i64> {
    proposal_events::table
        .inner_join(messages::table)
        .filter(messages::thread_id.eq(thread_id.0))
        .filter(proposal_events::kind.eq(kind))
        .count()
        .get_result(conn)
}

fn is_unique_violation(e: &DieselError) -> bool {
    matches!(
        e,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

impl ProposalRepository for PgProposalRepository {
    fn create(
        &self,
        thread: &Thread,
        proposer: &user::Id,
        book_id: &BookId,
        book_title: &str,
    ) -> super::Result<Proposal> {
        let mut conn = self.pool.get()?;

        let (id, event) = conn.transaction::<_, super::Error, _>(|conn| {
            lock_thread(conn, thread.id())?;

            let created = count_events(conn, thread.id(), Event::CREATED)?;
            let resolved = count_events(conn, thread.id(), Event::RESOLVED)?;
            if created > resolved {
                return Err(super::Error::DuplicateOpenProposal(*thread.id()));
            }

            let message = append_in(
                conn,
                &NewMessage::new(
                    *thread.id(),
                    *proposer,
                    Proposal::body(book_title),
                    Kind::Proposal,
                ),
            )?;

            let id = Id::from(message.id);
            let event = Event::Created {
                proposer: *proposer,
                target_book_id: book_id.clone(),
                target_book_title: book_title.to_string(),
                at: message.sent_at,
            };

            diesel::insert_into(proposal_events::table)
                .values(NewEventRow::from_event(&id, &event))
                .execute(conn)?;

            Ok((id, event))
        })?;

        Proposal::replay(id, thread, &[event])
    }

    fn find_by_id(&self, id: &Id) -> super::Result<Option<Proposal>> {
        let mut conn = self.pool.get()?;

        let rows: Vec<(EventRow, Uuid)> = proposal_events::table
            .inner_join(messages::table)
            .filter(proposal_events::proposal_id.eq(id.0))
            .order(proposal_events::id.asc())
            .select((EventRow::as_select(), messages::thread_id))
            .load(&mut conn)?;

        let Some(thread_id) = rows.first().map(|(_, thread_id)| *thread_id) else {
            return Ok(None);
        };

        let thread: Thread = threads::table
            .find(thread_id)
            .select(ThreadRow::as_select())
            .first(&mut conn)?
            .into();

        let events = rows
            .into_iter()
            .map(|(row, _)| Event::try_from(row))
            .collect::<super::Result<Vec<_>>>()?;

        Proposal::replay(*id, &thread, &events).map(Some)
    }

    fn find_by_thread(&self, thread: &Thread) -> super::Result<Vec<Proposal>> {
        let mut conn = self.pool.get()?;

        let rows = proposal_events::table
            .inner_join(messages::table)
            .filter(messages::thread_id.eq(thread.id().0))
            .order((proposal_events::proposal_id.asc(), proposal_events::id.asc()))
            .select(EventRow::as_select())
            .load(&mut conn)?;

        let mut grouped: BTreeMap<i64, Vec<Event>> = BTreeMap::new();
        for row in rows {
            let id = row.proposal_id;
            grouped.entry(id).or_default().push(Event::try_from(row)?);
        }

        grouped
            .into_iter()
            .map(|(id, events)| Proposal::replay(id.into(), thread, &events))
            .collect()
    }

    fn resolve(&self, resolution: &Resolution) -> super::Result<()> {
        let proposal = resolution.proposal();
        let event = proposal.resolved_event().ok_or_else(|| {
            super::Error::Unexpected(format!("proposal {} is not resolved", proposal.id()))
        })?;

        let mut conn = self.pool.get()?;

        conn.transaction::<_, super::Error, _>(|conn| {
            lock_thread(conn, proposal.thread_id())?;

            diesel::insert_into(proposal_events::table)
                .values(NewEventRow::from_event(proposal.id(), &event))
                .execute(conn)
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        super::Error::AlreadyResolved(*proposal.id())
                    } else {
                        e.into()
                    }
                })?;

            if let Some(exchange) = resolution.exchange() {
                exchange::repository::insert_in(conn, exchange).map_err(|e| {
                    if is_unique_violation(&e) {
                        exchange::Error::AlreadyConfirmed(*proposal.id()).into()
                    } else {
                        super::Error::from(e)
                    }
                })?;
            }

            append_in(conn, resolution.note())?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use crate::exchange::LoanId;
    use crate::exchange::model::{Exchange, LoanRequest};
    use crate::exchange::repository::{ExchangeRepository, PgExchangeRepository};
    use crate::integration::db;
    use crate::message::repository::{MessageRepository, PgMessageRepository};
    use crate::proposal::{Action, Status};
    use crate::thread::repository::{PgThreadRepository, ThreadRepository};

    use super::*;

    fn thread(pool: &Pool) -> Thread {
        PgThreadRepository::new(pool.clone())
            .insert_or_get(&Thread::new(
                user::Id::random(),
                user::Id::random(),
                Some((BookId::from("T1"), "Dune".into())),
            ))
            .unwrap()
    }

    fn exchange(p: &Proposal, offered: &str) -> Exchange {
        Exchange::new(
            LoanRequest {
                exchange_id: exchange::Id::random(),
                proposal_id: *p.id(),
                proposer_id: *p.proposer_id(),
                responder_id: *p.responder_id(),
                requested_book_id: p.target_book_id().clone(),
                offered_book_id: BookId::from(offered),
            },
            LoanId("L-1".into()),
        )
    }

    #[tokio::test]
    async fn should_create_pending_proposal() {
        let (_node, pool) = db::test::pool().await;
        let t = thread(&pool);
        let [a, b] = *t.participants();
        let repo = PgProposalRepository::new(pool.clone());

        let p = repo.create(&t, &a, &BookId::from("T1"), "Dune").unwrap();

        assert_eq!(p.status(), Status::Pending);
        assert_eq!(p.responder_id(), &b);
        assert_eq!(repo.find_by_id(p.id()).unwrap(), Some(p.clone()));

        let msgs = PgMessageRepository::new(pool).find_by_thread(t.id(), None).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].id(), p.id());
        assert_eq!(msgs[0].kind(), Kind::Proposal);
    }

    #[tokio::test]
    async fn should_reject_second_open_proposal() {
        let (_node, pool) = db::test::pool().await;
        let t = thread(&pool);
        let [a, b] = *t.participants();
        let repo = PgProposalRepository::new(pool);

        repo.create(&t, &a, &BookId::from("T1"), "Dune").unwrap();
        let res = repo.create(&t, &b, &BookId::from("T1"), "Dune");

        assert!(matches!(res, Err(super::super::Error::DuplicateOpenProposal(_))));
    }

    #[tokio::test]
    async fn should_resolve_once() {
        let (_node, pool) = db::test::pool().await;
        let t = thread(&pool);
        let [a, _] = *t.participants();
        let repo = PgProposalRepository::new(pool.clone());
        let p = repo.create(&t, &a, &BookId::from("T1"), "Dune").unwrap();

        let accepted = p.resolve(Action::Accept, Some(&BookId::from("42")));
        repo.resolve(&Resolution::new(accepted.clone(), Some(exchange(&p, "42"))))
            .unwrap();

        let stored = repo.find_by_id(p.id()).unwrap().unwrap();
        assert_eq!(stored.status(), Status::Accepted);
        assert_eq!(stored.selected_book_id(), Some(&BookId::from("42")));

        let ex = PgExchangeRepository::new(pool.clone())
            .find_by_proposal(p.id())
            .unwrap()
            .unwrap();
        assert_eq!(ex.offered_book_id(), &BookId::from("42"));

        let rejected = p.resolve(Action::Reject, None);
        let res = repo.resolve(&Resolution::new(rejected, None));
        assert!(matches!(res, Err(super::super::Error::AlreadyResolved(_))));

        let msgs = PgMessageRepository::new(pool).find_by_thread(t.id(), None).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].kind(), Kind::System);
        assert_eq!(msgs[1].sender_id(), accepted.responder_id());
    }

    #[tokio::test]
    async fn should_allow_new_proposal_after_resolution() {
        let (_node, pool) = db::test::pool().await;
        let t = thread(&pool);
        let [a, _] = *t.participants();
        let repo = PgProposalRepository::new(pool);

        let first = repo.create(&t, &a, &BookId::from("T1"), "Dune").unwrap();
        repo.resolve(&Resolution::new(first.resolve(Action::Reject, None), None))
            .unwrap();
        let second = repo.create(&t, &a, &BookId::from("T1"), "Dune").unwrap();

        let all = repo.find_by_thread(&t).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].status(), Status::Rejected);
        assert_eq!(all[1].id(), second.id());
        assert_eq!(all[1].status(), Status::Pending);
    }
}
