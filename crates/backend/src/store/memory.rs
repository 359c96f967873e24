//! In-memory stores backing the test suites. The event store applies the
//! conditional participant update inside one write-lock critical section,
//! giving the same all-or-nothing guarantee as the SQL conditional UPDATE.

use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::domain::event::{Event, EventDraft};
use contracts::system::users::User;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventStore, UserStore};

#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<Uuid, Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, event: &Event) -> Result<()> {
        self.events.write().await.insert(event.id, event.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn find_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let events = self.events.read().await;
        Ok(events
            .values()
            .filter(|e| e.overlaps(start, end))
            .cloned()
            .collect())
    }

    async fn update_fields(&self, id: Uuid, draft: &EventDraft) -> Result<Option<Event>> {
        let mut events = self.events.write().await;
        match events.get_mut(&id) {
            Some(event) => {
                event.title = draft.title.clone();
                event.description = draft.description.clone();
                event.price = draft.price;
                event.start_time = draft.start_time;
                event.end_time = draft.end_time;
                event.capacity = draft.capacity;
                event.updated_at = Utc::now();
                event.version += 1;
                Ok(Some(event.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.events.write().await.remove(&id).is_some())
    }

    async fn swap_participants(
        &self,
        id: Uuid,
        expected_version: i32,
        participants: &BTreeSet<Uuid>,
    ) -> Result<bool> {
        let mut events = self.events.write().await;
        match events.get_mut(&id) {
            Some(event) if event.version == expected_version => {
                event.participants = participants.clone();
                event.updated_at = Utc::now();
                event.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    // id -> (user, password hash)
    users: RwLock<HashMap<Uuid, (User, String)>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    /// Enforces the same username/email uniqueness as the SQL schema.
    async fn insert(&self, user: &User, password_hash: &str) -> Result<()> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|(u, _)| u.username == user.username || u.email == user.email)
        {
            anyhow::bail!("username or email already taken: {}", user.username);
        }
        users.insert(user.id, (user.clone(), password_hash.to_string()));
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).map(|(u, _)| u.clone()))
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|(u, _)| u.username == identifier || u.email == identifier)
            .map(|(u, _)| u.clone()))
    }

    async fn password_hash(&self, id: Uuid) -> Result<Option<String>> {
        Ok(self.users.read().await.get(&id).map(|(_, h)| h.clone()))
    }

    async fn usernames_for(&self, ids: &BTreeSet<Uuid>) -> Result<Vec<String>> {
        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|(u, _)| u.username.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event(version: i32) -> Event {
        let at = |h| Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap();
        Event {
            id: Uuid::new_v4(),
            title: "sample".into(),
            description: String::new(),
            price: 10.0,
            start_time: at(10),
            end_time: at(20),
            capacity: 2,
            participants: BTreeSet::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version,
        }
    }

    #[tokio::test]
    async fn swap_rejects_stale_version() {
        let store = MemoryEventStore::new();
        let event = sample_event(3);
        store.insert(&event).await.unwrap();

        let mut set = BTreeSet::new();
        set.insert(Uuid::new_v4());

        assert!(!store.swap_participants(event.id, 2, &set).await.unwrap());
        assert!(store.swap_participants(event.id, 3, &set).await.unwrap());
        // The successful swap bumped the version.
        let stored = store.find_by_id(event.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 4);
        assert_eq!(stored.participants, set);
        // The old version token no longer works.
        assert!(!store.swap_participants(event.id, 3, &set).await.unwrap());
    }

    #[tokio::test]
    async fn user_insert_rejects_taken_username_or_email() {
        let store = MemoryUserStore::new();
        let alice = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            role: contracts::system::users::Role::Member,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.insert(&alice, "h").await.unwrap();

        let mut same_name = alice.clone();
        same_name.id = Uuid::new_v4();
        same_name.email = "other@example.com".into();
        assert!(store.insert(&same_name, "h").await.is_err());

        let mut same_email = alice.clone();
        same_email.id = Uuid::new_v4();
        same_email.username = "alicia".into();
        assert!(store.insert(&same_email, "h").await.is_err());
    }

    #[tokio::test]
    async fn swap_on_missing_event_is_a_conflict() {
        let store = MemoryEventStore::new();
        let set = BTreeSet::new();
        assert!(!store.swap_participants(Uuid::new_v4(), 0, &set).await.unwrap());
    }

    #[tokio::test]
    async fn overlap_filter_matches_closed_interval_predicate() {
        let store = MemoryEventStore::new();
        let event = sample_event(0);
        store.insert(&event).await.unwrap();

        let at = |h| Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap();
        assert_eq!(store.find_overlapping(at(20), at(23)).await.unwrap().len(), 1);
        assert_eq!(store.find_overlapping(at(21), at(23)).await.unwrap().len(), 0);
    }
}
