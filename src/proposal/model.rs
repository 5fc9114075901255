use chrono::{DateTime, Utc};
use diesel::prelude::{Insertable, Queryable, Selectable};
use serde::Serialize;
use uuid::Uuid;

use crate::exchange::model::Exchange;
use crate::library::BookId;
use crate::message::model::NewMessage;
use crate::message::{self, Kind};
use crate::thread::{self, model::Thread};
use crate::user;

use super::{Action, Id, Status};

/// Append-only facts a proposal is folded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Created {
        proposer: user::Id,
        target_book_id: BookId,
        target_book_title: String,
        at: DateTime<Utc>,
    },
    Resolved {
        actor: user::Id,
        status: Status,
        selected_book_id: Option<BookId>,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub(crate) const CREATED: &'static str = "created";
    pub(crate) const RESOLVED: &'static str = "resolved";

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => Self::CREATED,
            Self::Resolved { .. } => Self::RESOLVED,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Proposal {
    id: Id,
    thread_id: thread::Id,
    proposer_id: user::Id,
    responder_id: user::Id,
    target_book_id: BookId,
    target_book_title: String,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_book_id: Option<BookId>,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_at: Option<DateTime<Utc>>,
}

/// Outcome of validating a response against the current state.
#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    /// The transition should be committed.
    Commit,
    /// The same response was already recorded.
    Unchanged,
}

impl Proposal {
    /// Folds the events of one proposal. The first event must be `Created`
    /// and at most one `Resolved` is taken into account.
    pub fn replay(id: Id, thread: &Thread, events: &[Event]) -> super::Result<Self> {
        let mut iter = events.iter();

        let Some(Event::Created {
            proposer,
            target_book_id,
            target_book_title,
            at,
        }) = iter.next()
        else {
            return Err(super::Error::Unexpected(format!(
                "proposal {id} has no creation event"
            )));
        };

        let responder = thread.counterpart(proposer).ok_or_else(|| {
            super::Error::Unexpected(format!(
                "proposer of {id} is not a participant of thread {}",
                thread.id()
            ))
        })?;

        let mut proposal = Self {
            id,
            thread_id: *thread.id(),
            proposer_id: *proposer,
            responder_id: *responder,
            target_book_id: target_book_id.clone(),
            target_book_title: target_book_title.clone(),
            status: Status::Pending,
            selected_book_id: None,
            created_at: *at,
            resolved_at: None,
        };

        if let Some(Event::Resolved {
            status,
            selected_book_id,
            at,
            ..
        }) = iter.find(|e| matches!(e, Event::Resolved { .. }))
        {
            proposal.status = *status;
            proposal.selected_book_id = selected_book_id.clone();
            proposal.resolved_at = Some(*at);
        }

        Ok(proposal)
    }

    pub const fn id(&self) -> &Id {
        &self.id
    }

    pub const fn thread_id(&self) -> &thread::Id {
        &self.thread_id
    }

    pub const fn proposer_id(&self) -> &user::Id {
        &self.proposer_id
    }

    pub const fn responder_id(&self) -> &user::Id {
        &self.responder_id
    }

    pub const fn target_book_id(&self) -> &BookId {
        &self.target_book_id
    }

    pub fn target_book_title(&self) -> &str {
        &self.target_book_title
    }

    pub const fn status(&self) -> Status {
        self.status
    }

    pub const fn selected_book_id(&self) -> Option<&BookId> {
        self.selected_book_id.as_ref()
    }

    pub const fn resolved_at(&self) -> Option<&DateTime<Utc>> {
        self.resolved_at.as_ref()
    }

    pub fn is_party(&self, user: &user::Id) -> bool {
        self.proposer_id.eq(user) || self.responder_id.eq(user)
    }

    /// Validates a response without touching the library: the responder
    /// must be the counterpart, a terminal proposal only tolerates the
    /// recorded response, and accepting needs a selection.
    pub fn check(
        &self,
        responder: &user::Id,
        action: Action,
        selected: Option<&BookId>,
    ) -> super::Result<Decision> {
        if self.responder_id.ne(responder) {
            return Err(super::Error::Forbidden);
        }

        if self.status.is_terminal() {
            let same = match action {
                Action::Reject => self.status == Status::Rejected,
                Action::Accept => {
                    self.status == Status::Accepted && self.selected_book_id.as_ref() == selected
                }
            };

            return if same {
                Ok(Decision::Unchanged)
            } else {
                Err(super::Error::AlreadyResolved(self.id))
            };
        }

        if action == Action::Accept && selected.is_none() {
            return Err(super::Error::MissingSelection);
        }

        Ok(Decision::Commit)
    }

    /// The terminal state this proposal moves to. The selection is only
    /// kept when accepting.
    pub fn resolve(&self, action: Action, selected: Option<&BookId>) -> Self {
        let selected_book_id = match action {
            Action::Accept => selected.cloned(),
            Action::Reject => None,
        };

        Self {
            status: action.outcome(),
            selected_book_id,
            resolved_at: Some(Utc::now()),
            ..self.clone()
        }
    }

    /// Conversation preview of the proposal message in its current state.
    pub fn summary(&self) -> String {
        format!(
            "Exchange proposed: {} ({})",
            self.target_book_title,
            self.status.as_str()
        )
    }

    /// Body of the system message appended on resolution.
    pub fn outcome_note(&self) -> String {
        match (&self.status, &self.selected_book_id) {
            (Status::Accepted, Some(offered)) => format!(
                "Exchange accepted: {} for book {offered}",
                self.target_book_title
            ),
            (Status::Accepted, None) => format!("Exchange accepted: {}", self.target_book_title),
            (Status::Rejected, _) => format!("Exchange rejected: {}", self.target_book_title),
            (Status::Pending, _) => self.summary(),
        }
    }

    pub(crate) fn body(title: &str) -> String {
        format!("Exchange proposed: {title}")
    }
}

/// Everything written atomically when a proposal reaches a terminal state.
#[derive(Clone, Debug)]
pub struct Resolution {
    proposal: Proposal,
    exchange: Option<Exchange>,
    note: NewMessage,
}

impl Resolution {
    pub fn new(proposal: Proposal, exchange: Option<Exchange>) -> Self {
        let note = NewMessage::new(
            proposal.thread_id,
            proposal.responder_id,
            proposal.outcome_note(),
            Kind::System,
        );

        Self {
            proposal,
            exchange,
            note,
        }
    }

    pub const fn proposal(&self) -> &Proposal {
        &self.proposal
    }

    pub const fn exchange(&self) -> Option<&Exchange> {
        self.exchange.as_ref()
    }

    pub const fn note(&self) -> &NewMessage {
        &self.note
    }
}

/// Proposal as presented to one of the participants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProposalDto {
    #[serde(flatten)]
    proposal: Proposal,
    allowed_actions: Vec<Action>,
}

impl ProposalDto {
    pub fn for_viewer(proposal: &Proposal, viewer: &user::Id) -> Self {
        let allowed_actions =
            if proposal.status == Status::Pending && proposal.responder_id.eq(viewer) {
                vec![Action::Accept, Action::Reject]
            } else {
                vec![]
            };

        Self {
            proposal: proposal.clone(),
            allowed_actions,
        }
    }

    pub const fn proposal(&self) -> &Proposal {
        &self.proposal
    }

    pub fn allowed_actions(&self) -> &[Action] {
        &self.allowed_actions
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Proposed {
    pub thread: Thread,
    pub proposal: ProposalDto,
}

#[derive(Clone, Debug, Serialize)]
pub struct Outcome {
    pub proposal: ProposalDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<Exchange>,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = crate::schema::proposal_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EventRow {
    pub proposal_id: i64,
    pub kind: String,
    pub actor_id: Uuid,
    pub target_book_id: Option<String>,
    pub target_book_title: Option<String>,
    pub status: Option<String>,
    pub selected_book_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = super::Error;

    fn try_from(row: EventRow) -> super::Result<Self> {
        let corrupt = |what: &str| {
            super::Error::Unexpected(format!("event of proposal {} lacks {what}", row.proposal_id))
        };

        match row.kind.as_str() {
            Event::CREATED => Ok(Self::Created {
                proposer: row.actor_id.into(),
                target_book_id: row
                    .target_book_id
                    .map(BookId)
                    .ok_or_else(|| corrupt("target book"))?,
                target_book_title: row
                    .target_book_title
                    .ok_or_else(|| corrupt("target title"))?,
                at: row.created_at,
            }),
            Event::RESOLVED => {
                let status = match row.status.as_deref() {
                    Some("accepted") => Status::Accepted,
                    Some("rejected") => Status::Rejected,
                    _ => return Err(corrupt("terminal status")),
                };

                Ok(Self::Resolved {
                    actor: row.actor_id.into(),
                    status,
                    selected_book_id: row.selected_book_id.map(BookId),
                    at: row.created_at,
                })
            }
            other => Err(super::Error::Unexpected(format!(
                "unknown proposal event kind: {other}"
            ))),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::proposal_events)]
pub(crate) struct NewEventRow<'a> {
    pub proposal_id: i64,
    pub kind: &'a str,
    pub actor_id: Uuid,
    pub target_book_id: Option<&'a str>,
    pub target_book_title: Option<&'a str>,
    pub status: Option<&'a str>,
    pub selected_book_id: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewEventRow<'a> {
    pub fn from_event(proposal_id: &message::Id, event: &'a Event) -> Self {
        match event {
            Event::Created {
                proposer,
                target_book_id,
                target_book_title,
                at,
            } => Self {
                proposal_id: proposal_id.0,
                kind: event.kind(),
                actor_id: proposer.0,
                target_book_id: Some(target_book_id.as_str()),
                target_book_title: Some(target_book_title),
                status: None,
                selected_book_id: None,
                created_at: *at,
            },
            Event::Resolved {
                actor,
                status,
                selected_book_id,
                at,
            } => Self {
                proposal_id: proposal_id.0,
                kind: event.kind(),
                actor_id: actor.0,
                target_book_id: None,
                target_book_title: None,
                status: Some(status.as_str()),
                selected_book_id: selected_book_id.as_ref().map(BookId::as_str),
                created_at: *at,
            },
        }
    }
}

impl Proposal {
    /// The event recording this proposal's terminal state.
    pub fn resolved_event(&self) -> Option<Event> {
        self.resolved_at.map(|at| Event::Resolved {
            actor: self.responder_id,
            status: self.status,
            selected_book_id: self.selected_book_id.clone(),
            at,
        })
    }
}
