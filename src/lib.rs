//! chathist-core - Rust business logic for a local chat-history browser
//!
//! This library implements the search core behind a chat-archive UI:
//! multi-criteria search (contact, date interval, free-text term) over a
//! SQLite archive, with context-window expansion around term matches and
//! per-contact result grouping.

pub mod database;
pub mod demo_data;
pub mod fetcher;
pub mod interface;
pub mod models;
pub mod search;

pub use fetcher::ChatItemsFetcher;
pub use interface::*;
pub use models::{Attachment, ChatItem, Contact, HistoryItem, Message, MessageId};
