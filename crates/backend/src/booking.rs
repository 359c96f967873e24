//! The single component handed to the transport layer. Everything the
//! outside world may do (event CRUD, interval listings, participation
//! toggles, registration, login, token checks) goes through here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use contracts::domain::event::{Event, EventDraft, EventView, ParticipationChange};
use contracts::system::auth::{LoginRequest, LoginResponse, TokenClaims, UserInfo};
use contracts::system::users::{RegisterRequest, User};
use uuid::Uuid;

use crate::domain::event::{EventService, ParticipationManager};
use crate::error::BookingError;
use crate::store::{EventStore, UserStore};
use crate::system::auth::jwt::TokenService;
use crate::system::auth::password::HashParams;
use crate::system::users::UserService;

pub struct BookingService {
    events: EventService,
    participation: ParticipationManager,
    users: UserService,
    tokens: TokenService,
}

impl BookingService {
    pub fn new(
        event_store: Arc<dyn EventStore>,
        user_store: Arc<dyn UserStore>,
        tokens: TokenService,
        hash_params: HashParams,
    ) -> Self {
        Self {
            events: EventService::new(event_store.clone(), user_store.clone()),
            participation: ParticipationManager::new(event_store, user_store.clone()),
            users: UserService::new(user_store, hash_params),
            tokens,
        }
    }

    pub async fn create_event(&self, draft: EventDraft) -> Result<Event, BookingError> {
        self.events.create(draft).await
    }

    /// Events overlapping `[start, end]` as reduced views with participant
    /// usernames.
    pub async fn list_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EventView>, BookingError> {
        self.events.find_between(start, end).await
    }

    pub async fn update_event(&self, id: Uuid, draft: EventDraft) -> Result<Event, BookingError> {
        self.events.update(id, draft).await
    }

    pub async fn delete_event(&self, id: Uuid) -> Result<(), BookingError> {
        self.events.delete(id).await
    }

    pub async fn toggle_participation(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<ParticipationChange, BookingError> {
        self.participation.toggle(event_id, user_id).await
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User, BookingError> {
        self.users.register(request).await
    }

    /// Authenticate by username or email and issue a session token. Every
    /// authentication failure is the undifferentiated `InvalidCredentials`.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, BookingError> {
        let user = self
            .users
            .verify_credentials(&request.identifier, &request.password)
            .await?
            .ok_or(BookingError::InvalidCredentials)?;

        let access_token = self.tokens.issue(&user)?;
        tracing::info!(username = %user.username, "login succeeded");

        Ok(LoginResponse {
            access_token,
            user: UserInfo {
                id: user.id,
                username: user.username,
                email: user.email,
                role: user.role,
            },
        })
    }

    /// Verify a session token presented with a request.
    pub fn authenticate(&self, token: &str) -> Result<TokenClaims, BookingError> {
        self.tokens.verify(token)
    }
}
