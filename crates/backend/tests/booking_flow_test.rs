//! End-to-end flow over the in-memory stores: registration, login, event
//! CRUD, interval listings and the capacity-1 booking scenario.

use std::sync::Arc;

use backend::shared::logging;
use backend::store::{MemoryEventStore, MemoryUserStore};
use backend::system::auth::jwt::TokenService;
use backend::system::auth::password::HashParams;
use backend::{BookingError, BookingService};
use chrono::{DateTime, TimeZone, Utc};
use contracts::domain::event::{EventDraft, ParticipationChange};
use contracts::system::auth::LoginRequest;
use contracts::system::users::RegisterRequest;
use uuid::Uuid;

fn at(h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap()
}

fn service() -> BookingService {
    logging::init();
    BookingService::new(
        Arc::new(MemoryEventStore::new()),
        Arc::new(MemoryUserStore::new()),
        TokenService::new("integration-test-secret", 86_400),
        HashParams::default(),
    )
}

fn register(name: &str) -> RegisterRequest {
    RegisterRequest {
        username: name.into(),
        email: format!("{name}@example.com"),
        password: "correct-horse".into(),
    }
}

fn login(identifier: &str, password: &str) -> LoginRequest {
    LoginRequest {
        identifier: identifier.into(),
        password: password.into(),
    }
}

fn draft(start_h: u32, end_h: u32, capacity: u32) -> EventDraft {
    EventDraft {
        title: "workshop".into(),
        description: "hands-on session".into(),
        price: 25.0,
        start_time: at(start_h),
        end_time: at(end_h),
        capacity,
    }
}

#[tokio::test]
async fn capacity_one_booking_scenario() {
    let service = service();
    let alice = service.register(register("alice")).await.unwrap();
    let bob = service.register(register("bob")).await.unwrap();
    let event = service.create_event(draft(10, 12, 1)).await.unwrap();

    // A joins, B is rejected, A leaves, B joins.
    assert_eq!(
        service.toggle_participation(event.id, alice.id).await.unwrap(),
        ParticipationChange::Joined
    );
    assert!(matches!(
        service.toggle_participation(event.id, bob.id).await,
        Err(BookingError::CapacityExceeded)
    ));
    assert_eq!(
        service.toggle_participation(event.id, alice.id).await.unwrap(),
        ParticipationChange::Left
    );
    assert_eq!(
        service.toggle_participation(event.id, bob.id).await.unwrap(),
        ParticipationChange::Joined
    );

    // The listing shows the surviving participant by username.
    let listed = service.list_events(at(9), at(13)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].participants, vec!["bob".to_string()]);
}

#[tokio::test]
async fn login_and_token_round_trip() {
    let service = service();
    let alice = service.register(register("alice")).await.unwrap();

    // Username and email both authenticate.
    let by_name = service.login(login("alice", "correct-horse")).await.unwrap();
    let by_email = service
        .login(login("alice@example.com", "correct-horse"))
        .await
        .unwrap();
    assert_eq!(by_name.user.id, alice.id);
    assert_eq!(by_email.user.username, "alice");

    let claims = service.authenticate(&by_name.access_token).unwrap();
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.id, alice.id);
    assert_eq!(claims.exp, claims.iat + 86_400);

    // Wrong password and unknown identifier are indistinguishable.
    assert!(matches!(
        service.login(login("alice", "battery-staple")).await,
        Err(BookingError::InvalidCredentials)
    ));
    assert!(matches!(
        service.login(login("mallory", "correct-horse")).await,
        Err(BookingError::InvalidCredentials)
    ));

    assert!(matches!(
        service.authenticate("not-a-token"),
        Err(BookingError::InvalidToken)
    ));
}

#[tokio::test]
async fn event_lifecycle() {
    let service = service();
    let event = service.create_event(draft(10, 12, 0)).await.unwrap();

    let mut changed = draft(14, 16, 5);
    changed.title = "rescheduled workshop".into();
    let updated = service.update_event(event.id, changed).await.unwrap();
    assert_eq!(updated.id, event.id);
    assert_eq!(updated.title, "rescheduled workshop");
    assert_eq!(updated.capacity, 5);

    // The moved event left its old window.
    assert!(service.list_events(at(10), at(12)).await.unwrap().is_empty());
    assert_eq!(service.list_events(at(15), at(15)).await.unwrap().len(), 1);

    service.delete_event(event.id).await.unwrap();
    // Delete is irreversible; a second delete reports the id as missing.
    assert!(matches!(
        service.delete_event(event.id).await,
        Err(BookingError::EventNotFound)
    ));
    assert!(matches!(
        service.delete_event(Uuid::new_v4()).await,
        Err(BookingError::EventNotFound)
    ));
}

#[tokio::test]
async fn toggling_against_missing_references() {
    let service = service();
    let alice = service.register(register("alice")).await.unwrap();
    let event = service.create_event(draft(10, 12, 0)).await.unwrap();

    assert!(matches!(
        service.toggle_participation(Uuid::new_v4(), alice.id).await,
        Err(BookingError::EventNotFound)
    ));
    assert!(matches!(
        service.toggle_participation(event.id, Uuid::new_v4()).await,
        Err(BookingError::UnknownUser)
    ));
    // When neither id resolves, the missing event takes precedence.
    assert!(matches!(
        service.toggle_participation(Uuid::new_v4(), Uuid::new_v4()).await,
        Err(BookingError::EventNotFound)
    ));
}
