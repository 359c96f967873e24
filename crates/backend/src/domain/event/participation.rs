//! Capacity-limited join/leave with an optimistic compare-and-retry loop.
//!
//! Every attempt re-reads the event, applies the membership flip against
//! that fresh snapshot, and commits through the store's conditional update
//! (`swap_participants`, keyed on the row version). A conflict means some
//! other toggle on the same event committed in between; the loop simply
//! re-evaluates. Toggles on different events never contend.

use std::sync::Arc;

use contracts::domain::event::ParticipationChange;
use uuid::Uuid;

use crate::error::BookingError;
use crate::store::{EventStore, UserStore};

/// A conflict implies another writer committed, so progress is global; the
/// bound only guards against a store that always reports conflicts.
const MAX_SWAP_ATTEMPTS: usize = 100;

pub struct ParticipationManager {
    events: Arc<dyn EventStore>,
    users: Arc<dyn UserStore>,
}

impl ParticipationManager {
    pub fn new(events: Arc<dyn EventStore>, users: Arc<dyn UserStore>) -> Self {
        Self { events, users }
    }

    /// Flip the user's membership on the event.
    ///
    /// A current participant is removed (capacity is never checked on
    /// removal); anyone else is added, subject to the capacity ceiling.
    /// Each call flips state; callers wanting strict join/leave semantics
    /// must check current membership first.
    ///
    /// The capacity invariant (`participants <= capacity` when
    /// `capacity > 0`) holds under any number of concurrent toggles on the
    /// same event.
    pub async fn toggle(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<ParticipationChange, BookingError> {
        // The event is checked first, so two unknown ids report the event.
        if self.events.find_by_id(event_id).await?.is_none() {
            return Err(BookingError::EventNotFound);
        }
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(BookingError::UnknownUser);
        }

        for attempt in 0..MAX_SWAP_ATTEMPTS {
            let event = self
                .events
                .find_by_id(event_id)
                .await?
                .ok_or(BookingError::EventNotFound)?;

            let mut participants = event.participants.clone();
            let change = if participants.remove(&user_id) {
                ParticipationChange::Left
            } else {
                if event.is_full() {
                    return Err(BookingError::CapacityExceeded);
                }
                participants.insert(user_id);
                ParticipationChange::Joined
            };

            if self
                .events
                .swap_participants(event_id, event.version, &participants)
                .await?
            {
                tracing::info!(
                    event_id = %event_id,
                    user_id = %user_id,
                    ?change,
                    "participation toggled"
                );
                return Ok(change);
            }

            tracing::debug!(
                event_id = %event_id,
                attempt,
                "participant swap conflicted, retrying"
            );
        }

        Err(BookingError::Internal(anyhow::anyhow!(
            "participant update kept conflicting after {MAX_SWAP_ATTEMPTS} attempts"
        )))
    }
}
