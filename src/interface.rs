//! Public boundary of the chat-history core.
//!
//! This file defines the types that cross between the search core and its
//! host shell: the search criteria and result values, the store capability
//! the core consumes, and the error taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Attachment, ChatItem, Contact, Message, MessageId};

// ─────────────────────────────────────────────────────────────────────────────
// SEARCH CRITERIA / RESULT
// ─────────────────────────────────────────────────────────────────────────────

/// What to search for. An immutable value passed to every `search()` call.
///
/// The four fields jointly select the retrieval strategy (see
/// `ChatItemsFetcher::search`). A default value means "nothing specified"
/// and yields an empty result — listing everything is the caller's job via
/// `ChatStore::fetch_contacts`, not a search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Restrict results to a single contact.
    pub contact: Option<Contact>,
    /// Keep items strictly after this instant (in-memory filtering) or at/after
    /// it (store queries) — see `MessageQuery` for the bound asymmetry.
    pub after_date: Option<DateTime<Utc>>,
    /// Upper date bound, mirroring `after_date`.
    pub before_date: Option<DateTime<Utc>>,
    /// Free-text term, matched as a case-sensitive substring of message content.
    pub search_term: Option<String>,
}

impl SearchCriteria {
    /// A term search across all contacts.
    pub fn for_term(term: impl Into<String>) -> Self {
        Self {
            search_term: Some(term.into()),
            ..Self::default()
        }
    }

    /// Everything a single contact said (optionally date-bounded later).
    pub fn for_contact(contact: Contact) -> Self {
        Self {
            contact: Some(contact),
            ..Self::default()
        }
    }

    /// Reset contact and term. Date bounds deliberately survive, so a user
    /// can clear a search while keeping the date range they dialed in.
    pub fn clear_search(&mut self) {
        self.contact = None;
        self.search_term = None;
    }
}

/// One search's complete output, recomputed wholesale per invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matched items (messages and attachments mixed), ordered.
    pub matching_items: Vec<ChatItem>,
    /// Matched attachments only, ordered by date.
    pub matching_attachments: Vec<Attachment>,
    /// Distinct contacts represented in the matches, deduplicated by name
    /// in first-seen order. `None` when the search wasn't term-based.
    pub matching_contacts: Option<Vec<Contact>>,
}

/// One-shot consumer callback: invoked exactly once per `search()` call,
/// on a worker thread, carrying only success data (store failures degrade
/// to an empty result — see `StoreError` handling in the fetcher).
pub type SearchCompletion = Box<dyn FnOnce(SearchResult) + Send + 'static>;

// ─────────────────────────────────────────────────────────────────────────────
// STORE CAPABILITY
// ─────────────────────────────────────────────────────────────────────────────

/// Which browsing bucket of contacts to list.
///
/// `Known` and `Unknown` carry the store invariant that contacts with zero
/// messages are excluded from either bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactFilter {
    All,
    Known,
    Unknown,
}

/// A store-side message query: case-sensitive substring over content,
/// optionally AND'd with date bounds.
///
/// Store-level date bounds are **inclusive** (`date >= after`,
/// `date <= before`), unlike the in-memory interval filter whose bounds
/// are exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageQuery {
    pub term: String,
    pub after_date: Option<DateTime<Utc>>,
    pub before_date: Option<DateTime<Utc>>,
}

impl MessageQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            after_date: None,
            before_date: None,
        }
    }
}

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("unknown contact id {0}")]
    UnknownContact(i64),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The fetch capability the search orchestrator consumes.
///
/// Implementations must be `Send + Sync`: queries execute on background
/// worker threads while results are consumed elsewhere. `fetch_messages`
/// runs in the worker context; the `MessageId`s of its results are the only
/// thing that crosses back, and `resolve_messages` rematerializes them on
/// the consumer side.
pub trait ChatStore: Send + Sync {
    /// List contacts, ordered by name ascending. `Known`/`Unknown` exclude
    /// contacts with no messages.
    fn fetch_contacts(&self, filter: ContactFilter) -> StoreResult<Vec<Contact>>;

    /// Messages whose content contains the query term (case-sensitive),
    /// within the query's inclusive date bounds. Unordered.
    fn fetch_messages(&self, query: &MessageQuery) -> StoreResult<Vec<Message>>;

    /// Rematerialize messages from identity handles, preserving the input
    /// order. Unknown ids are silently skipped.
    fn resolve_messages(&self, ids: &[MessageId]) -> StoreResult<Vec<Message>>;

    /// A contact's full message sequence, sorted by `index` ascending.
    fn messages_for_contact(&self, contact_id: i64) -> StoreResult<Vec<Message>>;

    /// A contact's attachments, sorted by `index` ascending.
    fn attachments_for_contact(&self, contact_id: i64) -> StoreResult<Vec<Attachment>>;
}
