//! Pure result-assembly pipeline.
//!
//! Everything here is a value-in/value-out function over the models: date
//! interval filtering, per-contact partitioning, context-window expansion
//! around term matches, and distinct-contact extraction. The fetcher wires
//! these together; no I/O happens in this module.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use chrono::{DateTime, Utc};

use crate::models::{Contact, HistoryItem, Message};

/// Number of messages included before and after a term match in search
/// results.
// TODO: make this user configurable
pub const CONTEXT_MESSAGES_BEFORE_AFTER: usize = 2;

/// Restrict items to a date interval, both bounds exclusive
/// (`after < date < before`). Input order is irrelevant; output is
/// re-sorted by date ascending. Absent bounds are identity modulo re-sort.
pub fn filter_date_interval<T: HistoryItem>(
    items: Vec<T>,
    after_date: Option<DateTime<Utc>>,
    before_date: Option<DateTime<Utc>>,
) -> Vec<T> {
    let mut kept: Vec<T> = items
        .into_iter()
        .filter(|item| {
            if let Some(after) = after_date {
                if item.date() <= after {
                    return false;
                }
            }
            if let Some(before) = before_date {
                if item.date() >= before {
                    return false;
                }
            }
            true
        })
        .collect();

    kept.sort_by_key(|item| item.date());
    kept
}

/// Group a flat message list by owning contact, preserving each message's
/// first-seen relative order within its contact's bucket.
///
/// Map iteration order is unspecified; callers needing a deterministic
/// cross-contact order must re-sort.
pub fn split_messages_per_contact(messages: Vec<Message>) -> HashMap<i64, Vec<Message>> {
    let mut result: HashMap<i64, Vec<Message>> = HashMap::new();

    for message in messages {
        result.entry(message.contact.id).or_default().push(message);
    }

    result
}

/// The half-open index window around a match at `position` in a sequence of
/// `count` messages: `[max(0, position - n), min(position + n + 1, count - 1))`.
///
/// The upper clamp to `count - 1` (not `count`) means a match within `n` of
/// the end never includes the contact's final message.
pub fn context_window(position: usize, count: usize, n: usize) -> Range<usize> {
    let start = position.saturating_sub(n);
    let end = (position + n + 1).min(count.saturating_sub(1));
    start..end.max(start)
}

/// Expand one contact's term matches with surrounding context.
///
/// `matches` are that contact's matching messages (any order); `all` is the
/// contact's full message sequence sorted by `index` ascending. Matches are
/// processed in ascending index order; each yields a [`context_window`], and
/// a window whose start is at or before the previous window's end merges
/// into it (extending its end) instead of opening a new block. Merged
/// blocks are materialized once, so touching windows cannot duplicate items.
pub fn surrounding_messages(matches: &[Message], all: &[Message], n: usize) -> Vec<Message> {
    let mut ordered: Vec<&Message> = matches.iter().collect();
    ordered.sort_by_key(|m| m.index);

    let mut blocks: Vec<Range<usize>> = Vec::new();

    for message in ordered {
        // The stable index locates the message in its contact's canonical
        // sequence; a handle the full sequence doesn't contain is skipped.
        let position = match all.binary_search_by_key(&message.index, |m| m.index) {
            Ok(p) => p,
            Err(_) => continue,
        };

        let window = context_window(position, all.len(), n);

        match blocks.last_mut() {
            Some(prev) if window.start <= prev.end => {
                if window.end > prev.end {
                    prev.end = window.end;
                }
            }
            _ => blocks.push(window),
        }
    }

    blocks
        .into_iter()
        .flat_map(|block| all[block].iter().cloned())
        .collect()
}

/// Distinct contacts represented in a message list, deduplicated by *name*
/// in first-seen order. Two contacts sharing a name but not an identifier
/// collapse to one entry.
pub fn contacts_from_messages(messages: &[Message]) -> Vec<Contact> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut contacts = Vec::new();

    for message in messages {
        if seen.insert(message.contact.name.clone()) {
            contacts.push(message.contact.clone());
        }
    }

    contacts
}
