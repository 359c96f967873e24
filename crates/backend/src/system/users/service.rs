use std::sync::Arc;

use chrono::Utc;
use contracts::system::users::{RegisterRequest, Role, User};
use uuid::Uuid;

use crate::error::BookingError;
use crate::store::UserStore;
use crate::system::auth::password::{self, HashParams};

pub struct UserService {
    users: Arc<dyn UserStore>,
    hash_params: HashParams,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, hash_params: HashParams) -> Self {
        Self { users, hash_params }
    }

    /// Register a new user with the `member` role.
    pub async fn register(&self, request: RegisterRequest) -> Result<User, BookingError> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_string();

        if username.is_empty() {
            return Err(BookingError::Validation("username cannot be empty".into()));
        }
        if !email.contains('@') {
            return Err(BookingError::Validation("invalid email format".into()));
        }
        password::validate_password_strength(&request.password)?;

        // Username and email are each probed through the polymorphic
        // lookup, so a username colliding with someone's email also counts
        // as taken.
        if self.users.find_by_identifier(&username).await?.is_some()
            || self.users.find_by_identifier(&email).await?.is_some()
        {
            return Err(BookingError::DuplicateUser);
        }

        let password_hash = password::hash_password(&request.password, &self.hash_params);

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username,
            email,
            role: Role::Member,
            created_at: now,
            updated_at: now,
        };

        // A concurrent registration can slip between the probes above and
        // this insert; a uniqueness failure here is still a duplicate, not
        // an internal error.
        if let Err(err) = self.users.insert(&user, &password_hash).await {
            if self.users.find_by_identifier(&user.username).await?.is_some()
                || self.users.find_by_identifier(&user.email).await?.is_some()
            {
                return Err(BookingError::DuplicateUser);
            }
            return Err(err.into());
        }
        tracing::info!(username = %user.username, "registered user");

        Ok(user)
    }

    /// Look up by username or email and check the password. Unknown
    /// identifier and wrong password both come back as `None`, so callers
    /// cannot tell them apart.
    pub async fn verify_credentials(
        &self,
        identifier: &str,
        raw_password: &str,
    ) -> Result<Option<User>, BookingError> {
        let user = match self.users.find_by_identifier(identifier).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let stored_hash = match self.users.password_hash(user.id).await? {
            Some(hash) => hash,
            None => return Ok(None),
        };

        if !password::verify_password(raw_password, &stored_hash, &self.hash_params) {
            return Ok(None);
        }

        Ok(Some(user))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, BookingError> {
        Ok(self.users.find_by_id(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryUserStore;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryUserStore::new()), HashParams::default())
    }

    /// Store double reproducing a lost registration race: the duplicate
    /// pre-checks see nothing, then the insert hits the uniqueness
    /// constraint of the underlying store.
    struct RacingUserStore {
        inner: MemoryUserStore,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl UserStore for RacingUserStore {
        async fn insert(&self, user: &User, password_hash: &str) -> anyhow::Result<()> {
            self.inner.insert(user, password_hash).await
        }

        async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_identifier(&self, identifier: &str) -> anyhow::Result<Option<User>> {
            // The first two lookups are the register pre-checks.
            if self.lookups.fetch_add(1, Ordering::SeqCst) < 2 {
                return Ok(None);
            }
            self.inner.find_by_identifier(identifier).await
        }

        async fn password_hash(&self, id: Uuid) -> anyhow::Result<Option<String>> {
            self.inner.password_hash(id).await
        }

        async fn usernames_for(&self, ids: &BTreeSet<Uuid>) -> anyhow::Result<Vec<String>> {
            self.inner.usernames_for(ids).await
        }
    }

    fn request(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "correct-horse".into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_by_username_or_email() {
        let service = service();
        service.register(request("alice", "alice@example.com")).await.unwrap();

        let by_name = service
            .verify_credentials("alice", "correct-horse")
            .await
            .unwrap();
        assert!(by_name.is_some());

        let by_email = service
            .verify_credentials("alice@example.com", "correct-horse")
            .await
            .unwrap();
        assert!(by_email.is_some());
        assert_eq!(by_email.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_look_identical() {
        let service = service();
        service.register(request("alice", "alice@example.com")).await.unwrap();

        let unknown = service.verify_credentials("bob", "correct-horse").await.unwrap();
        let wrong_pw = service.verify_credentials("alice", "battery-staple").await.unwrap();
        assert!(unknown.is_none());
        assert!(wrong_pw.is_none());
    }

    #[tokio::test]
    async fn duplicate_username_and_email_are_rejected() {
        let service = service();
        service.register(request("alice", "alice@example.com")).await.unwrap();

        let same_name = service.register(request("alice", "other@example.com")).await;
        assert!(matches!(same_name, Err(BookingError::DuplicateUser)));

        let same_email = service.register(request("alicia", "alice@example.com")).await;
        assert!(matches!(same_email, Err(BookingError::DuplicateUser)));
    }

    #[tokio::test]
    async fn registration_lost_race_reports_duplicate_user() {
        let inner = MemoryUserStore::new();
        let existing = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            role: Role::Member,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        inner.insert(&existing, "already-there").await.unwrap();

        let store = Arc::new(RacingUserStore {
            inner,
            lookups: AtomicUsize::new(0),
        });
        let service = UserService::new(store, HashParams::default());

        let lost = service.register(request("alice", "alice@example.com")).await;
        assert!(matches!(lost, Err(BookingError::DuplicateUser)));
    }

    #[tokio::test]
    async fn invalid_registrations_are_rejected() {
        let service = service();
        assert!(matches!(
            service.register(request("", "a@example.com")).await,
            Err(BookingError::Validation(_))
        ));
        assert!(matches!(
            service.register(request("bob", "not-an-email")).await,
            Err(BookingError::Validation(_))
        ));
        let weak = RegisterRequest {
            username: "bob".into(),
            email: "bob@example.com".into(),
            password: "short".into(),
        };
        assert!(matches!(
            service.register(weak).await,
            Err(BookingError::Validation(_))
        ));
    }
}
