//! Core data models for the chat-history browser.
//!
//! A chat history is a set of contacts, each owning an ordered sequence of
//! messages and attachments. Every item carries two orderings: its
//! timestamp (used for cross-contact result sorting and date filtering) and
//! its stable per-contact sequence `index` (used for context-window math,
//! since it survives colliding or identical timestamps).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person (or group) the user has exchanged messages with.
///
/// `name` is unique within the store and serves as the lookup key;
/// `identifier` is the stable external key (phone number, handle, ...).
/// `known` partitions contacts into the two browsing buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub identifier: String,
    pub name: String,
    pub known: bool,
}

/// Opaque identity of a message, portable across execution contexts.
///
/// Store queries run on a background worker context; only these handles
/// cross back to the consumer side, where `ChatStore::resolve_messages`
/// (see `interface`) rematerializes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

/// A single text message belonging to a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub contact: Contact,
    pub date: DateTime<Utc>,
    /// Stable position in the owning contact's full chronological sequence.
    /// Assigned at ingestion, unique per contact, never reassigned.
    pub index: i64,
    /// Absent or empty means "no message" (e.g. an attachment-only row
    /// in the source archive).
    pub content: Option<String>,
    pub is_from_me: bool,
}

/// An attachment (image, file, ...) belonging to a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub contact: Contact,
    pub date: DateTime<Utc>,
    pub index: i64,
    pub file_name: Option<String>,
    pub is_from_me: bool,
}

/// Anything with the two chat orderings. Lets the date-interval filter stay
/// generic over messages, attachments, and mixed [`ChatItem`] lists.
pub trait HistoryItem {
    fn date(&self) -> DateTime<Utc>;
    fn index(&self) -> i64;
}

impl HistoryItem for Message {
    fn date(&self) -> DateTime<Utc> {
        self.date
    }
    fn index(&self) -> i64 {
        self.index
    }
}

impl HistoryItem for Attachment {
    fn date(&self) -> DateTime<Utc> {
        self.date
    }
    fn index(&self) -> i64 {
        self.index
    }
}

/// A conversational item: message or attachment.
///
/// Search results mix both kinds in one ordered list, so filter and sort
/// sites handle the variants exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatItem {
    Message(Message),
    Attachment(Attachment),
}

impl ChatItem {
    pub fn contact(&self) -> &Contact {
        match self {
            ChatItem::Message(m) => &m.contact,
            ChatItem::Attachment(a) => &a.contact,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        match self {
            ChatItem::Message(m) => m.date,
            ChatItem::Attachment(a) => a.date,
        }
    }

    pub fn index(&self) -> i64 {
        match self {
            ChatItem::Message(m) => m.index,
            ChatItem::Attachment(a) => a.index,
        }
    }

    /// Ascending date comparator, for cross-contact global result sorting.
    pub fn by_date(a: &Self, b: &Self) -> Ordering {
        a.date().cmp(&b.date())
    }

    /// Ascending sequence-index comparator, for reconstructing a single
    /// contact's canonical order.
    pub fn by_index(a: &Self, b: &Self) -> Ordering {
        a.index().cmp(&b.index())
    }
}

impl HistoryItem for ChatItem {
    fn date(&self) -> DateTime<Utc> {
        self.date()
    }
    fn index(&self) -> i64 {
        self.index()
    }
}
