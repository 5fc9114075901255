use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{thread, user};

/// One row of a user's conversation list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    pub thread_id: thread::Id,
    pub counterpart_id: user::Id,
    pub counterpart_name: String,
    pub last_message_preview: String,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
}

/// Most recent first, ties broken by thread id.
pub(super) fn sort(summaries: &mut [ConversationSummary]) {
    summaries.sort_by(|a, b| {
        b.last_message_at
            .cmp(&a.last_message_at)
            .then_with(|| a.thread_id.cmp(&b.thread_id))
    });
}
