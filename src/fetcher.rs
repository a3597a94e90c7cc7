//! Search orchestrator.
//!
//! `ChatItemsFetcher` holds the store capability plus the two result caches
//! that survive between searches, picks a retrieval strategy from the
//! criteria, and runs the whole query/filter/expand pipeline on a blocking
//! worker thread. Results are handed back either through an async fn or a
//! one-shot completion callback.
//!
//! Concurrency model: searches are serialized through a single-flight gate
//! (a second `search()` queues behind an in-flight one; nothing is
//! cancelled), so the shared caches are never raced.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::interface::{
    ChatStore, MessageQuery, SearchCompletion, SearchCriteria, SearchResult, StoreResult,
};
use crate::models::{ChatItem, Contact, Message, MessageId};
use crate::search::{
    contacts_from_messages, filter_date_interval, split_messages_per_contact,
    surrounding_messages, CONTEXT_MESSAGES_BEFORE_AFTER,
};

/// Global fallback Tokio runtime for when async functions are called outside
/// any runtime context (e.g. straight from a UI shell's thread). Shared
/// across all fetcher instances and never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to create fallback tokio runtime")
});

/// Runtime handle: the current runtime if one exists, otherwise the global
/// fallback.
fn runtime_handle() -> tokio::runtime::Handle {
    tokio::runtime::Handle::try_current().unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
}

/// Caches surviving between searches.
#[derive(Default)]
struct SearchState {
    /// Last unrestricted term-search result set. Lets a contact-narrowed
    /// view be widened again (`restore_search_to_all_contacts`) without
    /// re-querying the store.
    current_search_matching_items: Vec<ChatItem>,
    /// Distinct contacts of the last term search.
    matching_contacts: Option<Vec<Contact>>,
}

/// The search orchestrator: multi-criteria chat search with context-window
/// expansion and per-contact grouping.
///
/// Generic over the [`ChatStore`] capability; heavy work runs off the
/// calling thread. Cheap to clone (shared state behind `Arc`s).
pub struct ChatItemsFetcher<S> {
    store: Arc<S>,
    state: Arc<Mutex<SearchState>>,
    /// Single-flight gate: held for the duration of each search.
    gate: Arc<Mutex<()>>,
}

impl<S> Clone for ChatItemsFetcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<S: ChatStore + 'static> ChatItemsFetcher<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(SearchState::default())),
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Run a search on a blocking worker thread and await its result.
    ///
    /// Store failures never surface here: they are logged and degrade to an
    /// empty result, matching the completion-callback path, which carries
    /// only success data.
    pub async fn search(&self, criteria: SearchCriteria) -> SearchResult {
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let gate = Arc::clone(&self.gate);

        let handle = runtime_handle().spawn_blocking(move || {
            let _in_flight = gate.lock();
            run_search(store.as_ref(), &state, &criteria)
        });

        match handle.await {
            Ok(result) => result,
            // Worker panicked; treat like any other failed search.
            Err(join_error) => {
                warn!(%join_error, "search worker failed");
                SearchResult::default()
            }
        }
    }

    /// Fire a search and deliver its result through a one-shot callback,
    /// invoked exactly once on a worker thread. The host shell is
    /// responsible for hopping back to its interactive context.
    pub fn search_with_completion(&self, criteria: SearchCriteria, completion: SearchCompletion) {
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let gate = Arc::clone(&self.gate);

        runtime_handle().spawn_blocking(move || {
            let _in_flight = gate.lock();
            let result = run_search(store.as_ref(), &state, &criteria);
            completion(result);
        });
    }

    /// Synchronous entry point for callers that already own a worker thread
    /// (and for benchmarks). Same single-flight discipline as `search`.
    pub fn search_blocking(&self, criteria: &SearchCriteria) -> SearchResult {
        let _in_flight = self.gate.lock();
        run_search(self.store.as_ref(), &self.state, criteria)
    }

    /// After a term search was narrowed to one contact, re-instate the
    /// result set covering all matching contacts — straight from the cache,
    /// no store round-trip.
    pub fn restore_search_to_all_contacts(&self) -> Vec<ChatItem> {
        self.state.lock().current_search_matching_items.clone()
    }

    /// Drop the cached distinct-contact set. Contact and term live in the
    /// caller's [`SearchCriteria`] value (see `SearchCriteria::clear_search`,
    /// which keeps the date bounds); the unrestricted-items cache survives
    /// so `restore_search_to_all_contacts` keeps working.
    pub fn clear_search(&self) {
        self.state.lock().matching_contacts = None;
    }
}

/// Strategy dispatch. Checked in precedence order:
/// contact+term → cache filter; contact only → array scan;
/// term only → store query; neither → empty.
fn run_search<S: ChatStore>(
    store: &S,
    state: &Mutex<SearchState>,
    criteria: &SearchCriteria,
) -> SearchResult {
    match (&criteria.contact, &criteria.search_term) {
        (Some(contact), Some(_)) => {
            debug!(contact = %contact.name, "narrowing cached term search to one contact");
            let state = state.lock();
            let matching_items: Vec<ChatItem> = state
                .current_search_matching_items
                .iter()
                .filter(|item| item.contact().id == contact.id)
                .cloned()
                .collect();
            SearchResult {
                matching_items,
                matching_attachments: Vec::new(),
                matching_contacts: state.matching_contacts.clone(),
            }
        }

        (Some(contact), None) => {
            debug!(contact = %contact.name, "array-scan of one contact's items");
            state.lock().matching_contacts = None;
            match collect_chat_items_for_contact(store, contact, criteria) {
                Ok(result) => result,
                Err(error) => {
                    warn!(%error, contact = %contact.name, "contact scan failed, returning empty result");
                    SearchResult::default()
                }
            }
        }

        (None, Some(term)) => {
            debug!(term, "store query with context expansion");
            match search_messages_for_term(store, term, criteria) {
                Ok((items, contacts)) => {
                    let mut state = state.lock();
                    state.current_search_matching_items = items.clone();
                    state.matching_contacts = Some(contacts.clone());
                    SearchResult {
                        matching_items: items,
                        matching_attachments: Vec::new(),
                        matching_contacts: Some(contacts),
                    }
                }
                Err(error) => {
                    warn!(%error, term, "store query failed, returning empty result");
                    SearchResult::default()
                }
            }
        }

        // Nothing specified: clear all result sets. Listing every chat is
        // the caller's job via ChatStore::fetch_contacts, not a search.
        (None, None) => {
            state.lock().matching_contacts = None;
            SearchResult::default()
        }
    }
}

/// Array-based strategy, used when no search term is specified: all of one
/// contact's messages and attachments, date-sorted, optionally restricted
/// to the (exclusive) date interval.
fn collect_chat_items_for_contact<S: ChatStore>(
    store: &S,
    contact: &Contact,
    criteria: &SearchCriteria,
) -> StoreResult<SearchResult> {
    let messages = store.messages_for_contact(contact.id)?;
    let mut attachments = store.attachments_for_contact(contact.id)?;

    let mut items: Vec<ChatItem> = messages
        .into_iter()
        .map(ChatItem::Message)
        .chain(attachments.iter().cloned().map(ChatItem::Attachment))
        .collect();
    items.sort_by(ChatItem::by_date);
    attachments.sort_by_key(|a| a.date);

    if criteria.after_date.is_some() || criteria.before_date.is_some() {
        items = filter_date_interval(items, criteria.after_date, criteria.before_date);
        attachments = filter_date_interval(attachments, criteria.after_date, criteria.before_date);
    }

    Ok(SearchResult {
        matching_items: items,
        matching_attachments: attachments,
        matching_contacts: None,
    })
}

/// Store-query strategy: substring match over all contacts, date-sorted
/// globally, expanded with per-contact context windows, then rematerialized
/// on the consumer side via identity handles.
fn search_messages_for_term<S: ChatStore>(
    store: &S,
    term: &str,
    criteria: &SearchCriteria,
) -> StoreResult<(Vec<ChatItem>, Vec<Contact>)> {
    let query = MessageQuery {
        term: term.to_string(),
        after_date: criteria.after_date,
        before_date: criteria.before_date,
    };

    // Matches span multiple contacts, so the global sort is by date.
    let mut matches = store.fetch_messages(&query)?;
    matches.sort_by_key(|m| m.date);

    let per_contact = split_messages_per_contact(matches);

    // Expand each contact's matches against that contact's full
    // index-sorted sequence. Blocks are appended in partition iteration
    // order; callers needing a deterministic cross-contact order re-sort.
    let mut expanded: Vec<Message> = Vec::new();
    for (contact_id, contact_matches) in &per_contact {
        let all = store.messages_for_contact(*contact_id)?;
        expanded.extend(surrounding_messages(
            contact_matches,
            &all,
            CONTEXT_MESSAGES_BEFORE_AFTER,
        ));
    }

    // Only identity handles cross back from the worker-side entities; the
    // consumer-facing messages are rematerialized from them.
    let ids: Vec<MessageId> = expanded.iter().map(|m| m.id).collect();
    let resolved = store.resolve_messages(&ids)?;

    let contacts = contacts_from_messages(&resolved);
    let items = resolved.into_iter().map(ChatItem::Message).collect();
    Ok((items, contacts))
}
