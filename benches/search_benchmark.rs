use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};

use chathist_core::database::Database;
use chathist_core::{ChatItemsFetcher, SearchCriteria};

/// Synthetic archive: 40 contacts with 500 messages each, a term that hits
/// roughly once per 50 messages, and a rarer one.
fn setup_fetcher() -> ChatItemsFetcher<Database> {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    let epoch = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

    for c in 0..40 {
        let contact = db
            .find_or_create_contact(&format!("Contact {c:02}"), &format!("+1555{c:07}"))
            .expect("Failed to create contact");

        for m in 0..500 {
            let content = if m % 50 == 7 {
                format!("let's grab coffee, message {m}")
            } else if m % 211 == 3 {
                format!("the quarterly report is ready, message {m}")
            } else {
                format!("filler message {m} in thread {c}")
            };
            db.insert_message(
                contact.id,
                epoch + Duration::seconds((c * 500 + m) as i64),
                Some(&content),
                m % 2 == 0,
            )
            .expect("Failed to insert message");
        }
    }

    ChatItemsFetcher::new(Arc::new(db))
}

fn bench_search(c: &mut Criterion) {
    let fetcher = setup_fetcher();
    let rt = tokio::runtime::Runtime::new().unwrap();

    let queries = vec![
        ("common_term", "coffee"),
        ("rare_term", "quarterly report"),
        ("no_match", "zyzzyva"),
        ("single_char", "x"),
    ];

    let mut group = c.benchmark_group("search");
    group.sample_size(20);

    for (name, query) in queries {
        group.bench_function(name, |b| {
            b.iter(|| rt.block_on(fetcher.search(SearchCriteria::for_term(query))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
