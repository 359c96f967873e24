use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use contracts::domain::event::{Event, EventDraft, EventView};
use uuid::Uuid;

use crate::error::BookingError;
use crate::store::{EventStore, UserStore};

pub struct EventService {
    events: Arc<dyn EventStore>,
    users: Arc<dyn UserStore>,
}

impl EventService {
    pub fn new(events: Arc<dyn EventStore>, users: Arc<dyn UserStore>) -> Self {
        Self { events, users }
    }

    pub async fn create(&self, draft: EventDraft) -> Result<Event, BookingError> {
        validate_draft(&draft)?;

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            price: draft.price,
            start_time: draft.start_time,
            end_time: draft.end_time,
            capacity: draft.capacity,
            participants: BTreeSet::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        };

        self.events.insert(&event).await?;
        tracing::info!(event_id = %event.id, title = %event.title, "created event");
        Ok(event)
    }

    /// Events overlapping the closed range `[start, end]`, as reduced views
    /// carrying participant usernames. The overlap predicate runs inside
    /// the store; result order is the store's and not part of the contract.
    pub async fn find_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EventView>, BookingError> {
        if start > end {
            return Err(BookingError::InvalidRange);
        }

        let events = self.events.find_overlapping(start, end).await?;

        let mut views = Vec::with_capacity(events.len());
        for event in events {
            let participants = self.users.usernames_for(&event.participants).await?;
            views.push(EventView {
                id: event.id,
                title: event.title,
                description: event.description,
                price: event.price,
                start_time: event.start_time,
                end_time: event.end_time,
                capacity: event.capacity,
                participants,
            });
        }
        Ok(views)
    }

    /// Full replacement of the draft fields; `id` and `participants` are
    /// preserved.
    pub async fn update(&self, id: Uuid, draft: EventDraft) -> Result<Event, BookingError> {
        validate_draft(&draft)?;

        match self.events.update_fields(id, &draft).await? {
            Some(event) => {
                tracing::info!(event_id = %id, "updated event");
                Ok(event)
            }
            None => Err(BookingError::EventNotFound),
        }
    }

    /// Irreversible; deleting an already-deleted (or never-existing) id
    /// reports `EventNotFound`.
    pub async fn delete(&self, id: Uuid) -> Result<(), BookingError> {
        if self.events.delete(id).await? {
            tracing::info!(event_id = %id, "deleted event");
            Ok(())
        } else {
            Err(BookingError::EventNotFound)
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Event>, BookingError> {
        Ok(self.events.find_by_id(id).await?)
    }
}

fn validate_draft(draft: &EventDraft) -> Result<(), BookingError> {
    if draft.title.trim().is_empty() {
        return Err(BookingError::Validation("title cannot be empty".into()));
    }
    if draft.price < 0.0 {
        return Err(BookingError::Validation("price cannot be negative".into()));
    }
    if draft.start_time > draft.end_time {
        return Err(BookingError::InvalidRange);
    }
    Ok(())
}
