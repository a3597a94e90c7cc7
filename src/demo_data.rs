//! Shared demo data for synthetic chat archives and tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::database::Database;
use crate::interface::StoreResult;
use crate::models::Contact;

pub struct DemoContact {
    pub name: &'static str,
    pub identifier: &'static str,
    pub known: bool,
}

pub struct DemoMessage {
    pub contact: &'static str,
    pub content: &'static str,
    pub is_from_me: bool,
    /// Relative offset in seconds from the archive epoch.
    pub offset: i64,
}

pub struct DemoAttachment {
    pub contact: &'static str,
    pub file_name: &'static str,
    pub is_from_me: bool,
    pub offset: i64,
}

/// Fixed archive epoch (2023-06-15 12:00:00 UTC) so generated timestamps,
/// and everything downstream of them, are deterministic.
pub fn demo_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap()
}

pub const DEMO_CONTACTS: &[DemoContact] = &[
    DemoContact {
        name: "Alice Nguyen",
        identifier: "+14155550101",
        known: true,
    },
    DemoContact {
        name: "Ben Okafor",
        identifier: "ben.okafor@example.com",
        known: true,
    },
    DemoContact {
        name: "Chiara Ricci",
        identifier: "+390255550202",
        known: true,
    },
    DemoContact {
        name: "+18005550303",
        identifier: "+18005550303",
        known: false,
    },
];

pub const DEMO_MESSAGES: &[DemoMessage] = &[
    // --- Alice: weekend plans thread ---
    DemoMessage {
        contact: "Alice Nguyen",
        content: "hey! are you around this weekend?",
        is_from_me: false,
        offset: 0,
    },
    DemoMessage {
        contact: "Alice Nguyen",
        content: "should be, what's up",
        is_from_me: true,
        offset: 60,
    },
    DemoMessage {
        contact: "Alice Nguyen",
        content: "thinking of doing a picnic at the lake if the weather holds",
        is_from_me: false,
        offset: 150,
    },
    DemoMessage {
        contact: "Alice Nguyen",
        content: "count me in. I can bring coffee and the big thermos",
        is_from_me: true,
        offset: 300,
    },
    DemoMessage {
        contact: "Alice Nguyen",
        content: "perfect. Ben said he'd drive",
        is_from_me: false,
        offset: 420,
    },
    DemoMessage {
        contact: "Alice Nguyen",
        content: "saturday 11am at the north entrance then?",
        is_from_me: false,
        offset: 480,
    },
    DemoMessage {
        contact: "Alice Nguyen",
        content: "works for me, see you there",
        is_from_me: true,
        offset: 600,
    },
    // --- Ben: project check-in ---
    DemoMessage {
        contact: "Ben Okafor",
        content: "did the deploy go out last night?",
        is_from_me: true,
        offset: 3_600,
    },
    DemoMessage {
        contact: "Ben Okafor",
        content: "yep, all green. one flaky test in CI but it passed on retry",
        is_from_me: false,
        offset: 3_700,
    },
    DemoMessage {
        contact: "Ben Okafor",
        content: "nice. coffee tomorrow to plan the next sprint?",
        is_from_me: true,
        offset: 3_900,
    },
    DemoMessage {
        contact: "Ben Okafor",
        content: "sure, usual place at 9",
        is_from_me: false,
        offset: 4_000,
    },
    DemoMessage {
        contact: "Ben Okafor",
        content: "bringing the lake picnic photos too",
        is_from_me: false,
        offset: 4_100,
    },
    // --- Chiara: travel thread ---
    DemoMessage {
        contact: "Chiara Ricci",
        content: "landed in Milano! the flight was endless",
        is_from_me: false,
        offset: 86_400,
    },
    DemoMessage {
        contact: "Chiara Ricci",
        content: "welcome back! how was the conference?",
        is_from_me: true,
        offset: 86_500,
    },
    DemoMessage {
        contact: "Chiara Ricci",
        content: "great talks, terrible coffee. sending you the slides",
        is_from_me: false,
        offset: 86_700,
    },
    DemoMessage {
        contact: "Chiara Ricci",
        content: "ha! ok, curious about the storage engine one",
        is_from_me: true,
        offset: 86_900,
    },
    // --- Unknown number: delivery notifications ---
    DemoMessage {
        contact: "+18005550303",
        content: "Your package has shipped. Track at https://example.com/t/8832",
        is_from_me: false,
        offset: 10_000,
    },
    DemoMessage {
        contact: "+18005550303",
        content: "Your package was delivered.",
        is_from_me: false,
        offset: 96_000,
    },
];

pub const DEMO_ATTACHMENTS: &[DemoAttachment] = &[
    DemoAttachment {
        contact: "Alice Nguyen",
        file_name: "lake_trail_map.pdf",
        is_from_me: false,
        offset: 500,
    },
    DemoAttachment {
        contact: "Ben Okafor",
        file_name: "picnic_group_shot.heic",
        is_from_me: false,
        offset: 4_200,
    },
    DemoAttachment {
        contact: "Chiara Ricci",
        file_name: "storage_engine_slides.pdf",
        is_from_me: false,
        offset: 87_000,
    },
];

/// Populate a database with the demo archive. Returns the created contacts
/// in table order.
pub fn populate(db: &Database) -> StoreResult<Vec<Contact>> {
    let epoch = demo_epoch();

    let mut contacts = Vec::with_capacity(DEMO_CONTACTS.len());
    for demo in DEMO_CONTACTS {
        let contact = db.find_or_create_contact(demo.name, demo.identifier)?;
        if demo.known {
            db.set_contact_known(contact.id, true)?;
        }
        contacts.push(contact);
    }

    let contact_id = |name: &str| {
        contacts
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .unwrap_or_else(|| unreachable!("demo message references unlisted contact {name}"))
    };

    // Tables are ordered by offset per contact, so ingestion order matches
    // chronological order and sequence indices line up with timestamps.
    for demo in DEMO_MESSAGES {
        db.insert_message(
            contact_id(demo.contact),
            epoch + chrono::Duration::seconds(demo.offset),
            Some(demo.content),
            demo.is_from_me,
        )?;
    }

    for demo in DEMO_ATTACHMENTS {
        db.insert_attachment(
            contact_id(demo.contact),
            epoch + chrono::Duration::seconds(demo.offset),
            Some(demo.file_name),
            demo.is_from_me,
        )?;
    }

    Ok(contacts)
}
