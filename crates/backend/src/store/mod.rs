//! Persistence seams. Everything above this layer is store-agnostic; the
//! SQLite implementation backs deployments and the in-memory one backs the
//! test suites.

pub mod memory;
pub mod sqlite;

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::domain::event::{Event, EventDraft};
use contracts::system::users::User;
use uuid::Uuid;

pub use memory::{MemoryEventStore, MemoryUserStore};
pub use sqlite::{SqliteEventStore, SqliteUserStore};

/// Event persistence. Each method is a single all-or-nothing store
/// operation; `swap_participants` is the atomic conditional update that the
/// participation manager builds its compare-and-retry loop on.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: &Event) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>>;

    /// Events overlapping the closed range `[start, end]`, evaluated by the
    /// store itself (`start_time <= end AND end_time >= start`). Result
    /// order is whatever the store produces.
    async fn find_overlapping(&self, start: DateTime<Utc>, end: DateTime<Utc>)
        -> Result<Vec<Event>>;

    /// Replace the draft fields of an existing event, leaving `id` and
    /// `participants` untouched. Returns the updated event, or `None` if
    /// the id does not resolve.
    async fn update_fields(&self, id: Uuid, draft: &EventDraft) -> Result<Option<Event>>;

    /// Returns false when the id does not resolve.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Write a new participant set only if the stored version still equals
    /// `expected_version`; bumps the version on success. Returns false on a
    /// version conflict or a missing event, with no change applied.
    async fn swap_participants(
        &self,
        id: Uuid,
        expected_version: i32,
        participants: &BTreeSet<Uuid>,
    ) -> Result<bool>;
}

/// User persistence. The password hash never travels on the `User` struct;
/// it is written at insert time and read back only through
/// `password_hash`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &User, password_hash: &str) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Single polymorphic lookup: the identifier may be a username or an
    /// email address.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>>;

    async fn password_hash(&self, id: Uuid) -> Result<Option<String>>;

    /// Usernames for the given ids; ids that no longer resolve are skipped
    /// (participant references are weak).
    async fn usernames_for(&self, ids: &BTreeSet<Uuid>) -> Result<Vec<String>>;
}
