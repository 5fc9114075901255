use chrono::{DateTime, Utc};
use diesel::prelude::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{library::BookId, user};

use super::Id;

/// Negotiation context between exactly two users, optionally anchored to
/// the book the negotiation started from.
///
/// Participants are kept sorted so that the unordered pair has a single
/// representation in storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    id: Id,
    participants: [user::Id; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    book_id: Option<BookId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    book_title: Option<String>,
    created_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(a: user::Id, b: user::Id, book: Option<(BookId, String)>) -> Self {
        let participants = if a <= b { [a, b] } else { [b, a] };
        let (book_id, book_title) = book.unzip();

        Self {
            id: Id::random(),
            participants,
            book_id,
            book_title,
            created_at: Utc::now(),
        }
    }

    pub const fn id(&self) -> &Id {
        &self.id
    }

    pub const fn participants(&self) -> &[user::Id; 2] {
        &self.participants
    }

    pub const fn book_id(&self) -> Option<&BookId> {
        self.book_id.as_ref()
    }

    pub fn book_title(&self) -> Option<&str> {
        self.book_title.as_deref()
    }

    pub const fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn is_participant(&self, user: &user::Id) -> bool {
        self.participants.contains(user)
    }

    /// The other participant, if `user` takes part in the thread.
    pub fn counterpart(&self, user: &user::Id) -> Option<&user::Id> {
        match &self.participants {
            [a, b] if a == user => Some(b),
            [a, b] if b == user => Some(a),
            _ => None,
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::threads)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ThreadRow {
    pub id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub book_id: Option<String>,
    pub book_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Self {
            id: row.id.into(),
            participants: [row.participant_a.into(), row.participant_b.into()],
            book_id: row.book_id.map(BookId),
            book_title: row.book_title,
            created_at: row.created_at,
        }
    }
}

impl From<&Thread> for ThreadRow {
    fn from(t: &Thread) -> Self {
        Self {
            id: t.id.0,
            participant_a: t.participants[0].0,
            participant_b: t.participants[1].0,
            book_id: t.book_id.as_ref().map(|b| b.0.clone()),
            book_title: t.book_title.clone(),
            created_at: t.created_at,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_normalize_participants() {
        let (a, b) = (user::Id::random(), user::Id::random());

        let t1 = Thread::new(a, b, None);
        let t2 = Thread::new(b, a, None);

        assert_eq!(t1.participants(), t2.participants());
        assert!(t1.participants()[0] < t1.participants()[1]);
    }

    #[test]
    fn should_find_counterpart() {
        let (a, b, c) = (user::Id::random(), user::Id::random(), user::Id::random());
        let t = Thread::new(a, b, Some((BookId::from("T1"), "Dune".into())));

        assert_eq!(t.counterpart(&a), Some(&b));
        assert_eq!(t.counterpart(&b), Some(&a));
        assert_eq!(t.counterpart(&c), None);
        assert!(!t.is_participant(&c));
        assert_eq!(t.book_title(), Some("Dune"));
    }
}
