//! End-to-end tests of the search pipeline over a real SQLite archive:
//! criteria dispatch, context-window expansion, contact narrowing and
//! restore, and the date-bound asymmetry between store queries and
//! in-memory filtering.

use std::sync::Arc;

use chrono::Duration;

use chathist_core::database::Database;
use chathist_core::demo_data;
use chathist_core::{
    ChatItem, ChatItemsFetcher, ChatStore, Contact, ContactFilter, SearchCriteria,
};

fn demo_fetcher() -> (ChatItemsFetcher<Database>, Vec<Contact>) {
    let db = Database::open_in_memory().unwrap();
    let contacts = demo_data::populate(&db).unwrap();
    (ChatItemsFetcher::new(Arc::new(db)), contacts)
}

fn named(contacts: &[Contact], name: &str) -> Contact {
    contacts.iter().find(|c| c.name == name).unwrap().clone()
}

fn contents(items: &[ChatItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            ChatItem::Message(m) => m.content.clone().unwrap_or_default(),
            ChatItem::Attachment(a) => a.file_name.clone().unwrap_or_default(),
        })
        .collect()
}

#[tokio::test]
async fn term_search_returns_matches_with_surrounding_context() {
    let (fetcher, _contacts) = demo_fetcher();

    let result = fetcher.search(SearchCriteria::for_term("picnic")).await;

    let texts = contents(&result.matching_items);
    // The match itself.
    assert!(texts
        .iter()
        .any(|t| t.contains("picnic at the lake")));
    // Its neighbors, which don't contain the term.
    assert!(texts.iter().any(|t| t.contains("what's up")));
    assert!(texts.iter().any(|t| t.contains("big thermos")));

    // "picnic" also matches in Ben's thread.
    let contacts = result.matching_contacts.expect("term search sets contacts");
    let mut names: Vec<&str> = contacts.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Alice Nguyen", "Ben Okafor"]);
}

#[tokio::test]
async fn narrowing_then_restoring_a_term_search() {
    let (fetcher, _contacts) = demo_fetcher();

    let broad = fetcher.search(SearchCriteria::for_term("coffee")).await;
    let contacts = broad.matching_contacts.clone().unwrap();
    assert_eq!(contacts.len(), 3);

    let alice = contacts
        .iter()
        .find(|c| c.name == "Alice Nguyen")
        .unwrap()
        .clone();
    let mut narrowed = SearchCriteria::for_term("coffee");
    narrowed.contact = Some(alice.clone());
    let result = fetcher.search(narrowed).await;

    assert!(!result.matching_items.is_empty());
    assert!(result
        .matching_items
        .iter()
        .all(|item| item.contact().id == alice.id));
    // Narrowing is a cache filter: the contact set stays the broad one.
    assert_eq!(result.matching_contacts.unwrap().len(), 3);

    // Widening back needs no store round-trip and yields the broad set.
    assert_eq!(
        fetcher.restore_search_to_all_contacts(),
        broad.matching_items
    );
}

#[tokio::test]
async fn contact_scan_interleaves_attachments_by_date() {
    let (fetcher, contacts) = demo_fetcher();
    let alice = named(&contacts, "Alice Nguyen");

    let result = fetcher.search(SearchCriteria::for_contact(alice)).await;

    let texts = contents(&result.matching_items);
    // The trail map (offset 500) lands between the 480s and 600s messages.
    let map_pos = texts.iter().position(|t| t == "lake_trail_map.pdf").unwrap();
    let before = texts
        .iter()
        .position(|t| t.contains("north entrance"))
        .unwrap();
    let after = texts.iter().position(|t| t.contains("see you there")).unwrap();
    assert!(before < map_pos && map_pos < after);

    assert_eq!(result.matching_attachments.len(), 1);
    assert!(result.matching_contacts.is_none());
}

#[tokio::test]
async fn contact_scan_date_bounds_are_exclusive() {
    let (fetcher, contacts) = demo_fetcher();
    let alice = named(&contacts, "Alice Nguyen");

    let epoch = demo_data::demo_epoch();
    let mut criteria = SearchCriteria::for_contact(alice);
    // Bounds land exactly on the offset-60 and offset-480 messages, which
    // the exclusive in-memory filter drops.
    criteria.after_date = Some(epoch + Duration::seconds(60));
    criteria.before_date = Some(epoch + Duration::seconds(480));
    let result = fetcher.search(criteria).await;

    let texts = contents(&result.matching_items);
    assert!(!texts.iter().any(|t| t.contains("what's up")));
    assert!(!texts.iter().any(|t| t.contains("north entrance")));
    assert!(texts.iter().any(|t| t.contains("picnic at the lake")));
    assert!(texts.iter().any(|t| t.contains("big thermos")));
}

#[tokio::test]
async fn term_search_date_bounds_are_inclusive_at_the_store() {
    let (fetcher, _contacts) = demo_fetcher();
    let epoch = demo_data::demo_epoch();

    // Lower bound exactly on Ben's "coffee tomorrow" message (offset 3900):
    // the store query keeps it, so Alice's and Chiara's hits drop out.
    let mut criteria = SearchCriteria::for_term("coffee");
    criteria.after_date = Some(epoch + Duration::seconds(3_900));
    criteria.before_date = Some(epoch + Duration::seconds(10_000));
    let result = fetcher.search(criteria).await;

    let contacts = result.matching_contacts.unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].name, "Ben Okafor");
    assert!(contents(&result.matching_items)
        .iter()
        .any(|t| t.contains("coffee tomorrow")));
}

#[tokio::test]
async fn empty_criteria_clear_everything() {
    let (fetcher, _contacts) = demo_fetcher();
    fetcher.search(SearchCriteria::for_term("coffee")).await;

    let result = fetcher.search(SearchCriteria::default()).await;
    assert!(result.matching_items.is_empty());
    assert!(result.matching_attachments.is_empty());
    assert!(result.matching_contacts.is_none());
}

#[tokio::test]
async fn unmatched_term_yields_empty_result_not_error() {
    let (fetcher, _contacts) = demo_fetcher();

    let result = fetcher
        .search(SearchCriteria::for_term("zyzzyva"))
        .await;
    assert!(result.matching_items.is_empty());
    assert_eq!(result.matching_contacts.unwrap().len(), 0);
}

#[test]
fn contact_listing_buckets_by_known_flag() {
    let db = Database::open_in_memory().unwrap();
    demo_data::populate(&db).unwrap();

    let known = db.fetch_contacts(ContactFilter::Known).unwrap();
    let names: Vec<&str> = known.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Alice Nguyen", "Ben Okafor", "Chiara Ricci"]);

    let unknown = db.fetch_contacts(ContactFilter::Unknown).unwrap();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].name, "+18005550303");
}

/// Host shells call in from plain threads; the fallback runtime carries the
/// search when no tokio context exists.
#[test]
fn search_runs_without_an_ambient_runtime() {
    let (fetcher, _contacts) = demo_fetcher();

    let result =
        futures::executor::block_on(fetcher.search(SearchCriteria::for_term("coffee")));
    assert_eq!(result.matching_contacts.unwrap().len(), 3);
}

#[test]
fn completion_callback_delivers_the_same_result_as_the_async_path() {
    let (fetcher, _contacts) = demo_fetcher();

    let async_result =
        futures::executor::block_on(fetcher.search(SearchCriteria::for_term("coffee")));

    let (tx, rx) = std::sync::mpsc::channel();
    fetcher.search_with_completion(
        SearchCriteria::for_term("coffee"),
        Box::new(move |result| {
            tx.send(result).unwrap();
        }),
    );
    let callback_result = rx
        .recv_timeout(std::time::Duration::from_secs(5))
        .expect("completion not delivered");

    assert_eq!(
        contents(&async_result.matching_items),
        contents(&callback_result.matching_items)
    );
}
