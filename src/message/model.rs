use chrono::{DateTime, Utc};
use diesel::prelude::{Insertable, Queryable, Selectable};
use serde::Serialize;
use uuid::Uuid;

use crate::{proposal::model::ProposalDto, thread, user};

use super::{Id, Kind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    id: Id,
    thread_id: thread::Id,
    sender_id: user::Id,
    body: String,
    kind: Kind,
    sent_at: DateTime<Utc>,
}

impl Message {
    pub const fn id(&self) -> &Id {
        &self.id
    }

    pub const fn thread_id(&self) -> &thread::Id {
        &self.thread_id
    }

    pub const fn sender_id(&self) -> &user::Id {
        &self.sender_id
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub const fn kind(&self) -> Kind {
        self.kind
    }

    pub const fn sent_at(&self) -> &DateTime<Utc> {
        &self.sent_at
    }
}

/// A message before the store has assigned its id and position.
#[derive(Clone, Debug)]
pub struct NewMessage {
    thread_id: thread::Id,
    sender_id: user::Id,
    body: String,
    kind: Kind,
}

impl NewMessage {
    pub fn new(
        thread_id: thread::Id,
        sender_id: user::Id,
        body: impl Into<String>,
        kind: Kind,
    ) -> Self {
        Self {
            thread_id,
            sender_id,
            body: body.into(),
            kind,
        }
    }

    pub fn plain(thread_id: thread::Id, sender_id: user::Id, body: impl Into<String>) -> Self {
        Self::new(thread_id, sender_id, body, Kind::Plain)
    }

    pub const fn thread_id(&self) -> &thread::Id {
        &self.thread_id
    }

    pub const fn sender_id(&self) -> &user::Id {
        &self.sender_id
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Materialises the message at the given position.
    pub fn stored(self, id: Id, sent_at: DateTime<Utc>) -> Message {
        Message {
            id,
            thread_id: self.thread_id,
            sender_id: self.sender_id,
            body: self.body,
            kind: self.kind,
            sent_at,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = crate::schema::messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MessageRow {
    pub id: i64,
    pub thread_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub kind: String,
    pub sent_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = super::Error;

    fn try_from(row: MessageRow) -> super::Result<Self> {
        Ok(Self {
            id: row.id.into(),
            thread_id: row.thread_id.into(),
            sender_id: row.sender_id.into(),
            body: row.body,
            kind: row.kind.parse()?,
            sent_at: row.sent_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::messages)]
pub(crate) struct NewMessageRow<'a> {
    pub thread_id: Uuid,
    pub sender_id: Uuid,
    pub body: &'a str,
    pub kind: &'a str,
    pub sent_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageDto {
    #[serde(flatten)]
    message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    proposal: Option<ProposalDto>,
}

impl MessageDto {
    pub fn new(message: Message, proposal: Option<ProposalDto>) -> Self {
        Self { message, proposal }
    }

    pub const fn message(&self) -> &Message {
        &self.message
    }

    pub const fn proposal(&self) -> Option<&ProposalDto> {
        self.proposal.as_ref()
    }
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self::new(message, None)
    }
}
