use std::collections::BTreeSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use contracts::domain::event::{Event, EventDraft};
use contracts::system::users::{Role, User};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, QueryResult, Statement};
use uuid::Uuid;

use super::{EventStore, UserStore};

/// Fixed-width UTC RFC 3339 (microseconds, `Z` suffix) so that text
/// comparison in SQL matches instant order.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("bad timestamp in store: {raw}"))?
        .with_timezone(&Utc))
}

pub struct SqliteEventStore {
    conn: DatabaseConnection,
}

impl SqliteEventStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

fn row_to_event(row: &QueryResult) -> Result<Event> {
    let id: String = row.try_get("", "id")?;
    let start_time: String = row.try_get("", "start_time")?;
    let end_time: String = row.try_get("", "end_time")?;
    let created_at: String = row.try_get("", "created_at")?;
    let updated_at: String = row.try_get("", "updated_at")?;
    let participants_json: String = row.try_get("", "participants")?;
    let participants: BTreeSet<Uuid> =
        serde_json::from_str(&participants_json).context("bad participants column")?;

    Ok(Event {
        id: Uuid::parse_str(&id)?,
        title: row.try_get("", "title")?,
        description: row.try_get("", "description")?,
        price: row.try_get("", "price")?,
        start_time: parse_ts(&start_time)?,
        end_time: parse_ts(&end_time)?,
        capacity: row.try_get::<i64>("", "capacity")? as u32,
        participants,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        version: row.try_get::<i32>("", "version")?,
    })
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn insert(&self, event: &Event) -> Result<()> {
        let participants = serde_json::to_string(&event.participants)?;
        self.conn
            .execute(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "INSERT INTO events (id, title, description, price, start_time, end_time, capacity, participants, created_at, updated_at, version)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                [
                    event.id.to_string().into(),
                    event.title.clone().into(),
                    event.description.clone().into(),
                    event.price.into(),
                    ts(&event.start_time).into(),
                    ts(&event.end_time).into(),
                    (event.capacity as i64).into(),
                    participants.into(),
                    ts(&event.created_at).into(),
                    ts(&event.updated_at).into(),
                    event.version.into(),
                ],
            ))
            .await
            .context("Failed to insert event")?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let result = self
            .conn
            .query_one(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "SELECT id, title, description, price, start_time, end_time, capacity, participants, created_at, updated_at, version
                 FROM events WHERE id = ?",
                [id.to_string().into()],
            ))
            .await?;

        match result {
            Some(row) => Ok(Some(row_to_event(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        // Range predicate pushed down to the store; closed intervals, so
        // touching endpoints count.
        let rows = self
            .conn
            .query_all(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "SELECT id, title, description, price, start_time, end_time, capacity, participants, created_at, updated_at, version
                 FROM events WHERE start_time <= ? AND end_time >= ?",
                [ts(&end).into(), ts(&start).into()],
            ))
            .await?;

        rows.iter().map(row_to_event).collect()
    }

    async fn update_fields(&self, id: Uuid, draft: &EventDraft) -> Result<Option<Event>> {
        let result = self
            .conn
            .execute(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "UPDATE events SET title = ?, description = ?, price = ?, start_time = ?, end_time = ?, capacity = ?, updated_at = ?, version = version + 1
                 WHERE id = ?",
                [
                    draft.title.clone().into(),
                    draft.description.clone().into(),
                    draft.price.into(),
                    ts(&draft.start_time).into(),
                    ts(&draft.end_time).into(),
                    (draft.capacity as i64).into(),
                    ts(&Utc::now()).into(),
                    id.to_string().into(),
                ],
            ))
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = self
            .conn
            .execute(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "DELETE FROM events WHERE id = ?",
                [id.to_string().into()],
            ))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn swap_participants(
        &self,
        id: Uuid,
        expected_version: i32,
        participants: &BTreeSet<Uuid>,
    ) -> Result<bool> {
        // Single conditional UPDATE: all-or-nothing relative to any other
        // writer on the same row.
        let json = serde_json::to_string(participants)?;
        let result = self
            .conn
            .execute(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "UPDATE events SET participants = ?, updated_at = ?, version = version + 1
                 WHERE id = ? AND version = ?",
                [
                    json.into(),
                    ts(&Utc::now()).into(),
                    id.to_string().into(),
                    expected_version.into(),
                ],
            ))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct SqliteUserStore {
    conn: DatabaseConnection,
}

impl SqliteUserStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

fn row_to_user(row: &QueryResult) -> Result<User> {
    let id: String = row.try_get("", "id")?;
    let role: String = row.try_get("", "role")?;
    let created_at: String = row.try_get("", "created_at")?;
    let updated_at: String = row.try_get("", "updated_at")?;

    Ok(User {
        id: Uuid::parse_str(&id)?,
        username: row.try_get("", "username")?,
        email: row.try_get("", "email")?,
        role: role.parse::<Role>().map_err(anyhow::Error::msg)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn insert(&self, user: &User, password_hash: &str) -> Result<()> {
        self.conn
            .execute(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "INSERT INTO sys_users (id, username, email, password_hash, role, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                [
                    user.id.to_string().into(),
                    user.username.clone().into(),
                    user.email.clone().into(),
                    password_hash.to_string().into(),
                    user.role.as_str().into(),
                    ts(&user.created_at).into(),
                    ts(&user.updated_at).into(),
                ],
            ))
            .await
            .context("Failed to insert user")?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let result = self
            .conn
            .query_one(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "SELECT id, username, email, role, created_at, updated_at
                 FROM sys_users WHERE id = ?",
                [id.to_string().into()],
            ))
            .await?;

        match result {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let result = self
            .conn
            .query_one(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "SELECT id, username, email, role, created_at, updated_at
                 FROM sys_users WHERE username = ? OR email = ?",
                [identifier.into(), identifier.into()],
            ))
            .await?;

        match result {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn password_hash(&self, id: Uuid) -> Result<Option<String>> {
        let result = self
            .conn
            .query_one(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "SELECT password_hash FROM sys_users WHERE id = ?",
                [id.to_string().into()],
            ))
            .await?;

        match result {
            Some(row) => Ok(Some(row.try_get("", "password_hash")?)),
            None => Ok(None),
        }
    }

    async fn usernames_for(&self, ids: &BTreeSet<Uuid>) -> Result<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT username FROM sys_users WHERE id IN ({placeholders})");
        let values: Vec<sea_orm::Value> = ids.iter().map(|id| id.to_string().into()).collect();

        let rows = self
            .conn
            .query_all(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                sql,
                values,
            ))
            .await?;

        rows.iter()
            .map(|row| row.try_get("", "username").map_err(Into::into))
            .collect()
    }
}
