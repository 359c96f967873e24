use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};

/// Open (creating if necessary) the SQLite database at `db_path` and make
/// sure the schema exists.
pub async fn connect(db_path: &str) -> anyhow::Result<DatabaseConnection> {
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if std::path::Path::new(db_path).is_absolute() {
        std::path::PathBuf::from(db_path)
    } else {
        std::env::current_dir()?.join(db_path)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);

    let conn = Database::connect(&db_url).await?;
    ensure_schema(&conn).await?;
    Ok(conn)
}

/// Open a private in-memory database with the schema applied. Every call
/// returns an isolated database; used by the test suites.
pub async fn connect_in_memory() -> anyhow::Result<DatabaseConnection> {
    // An in-memory sqlite database exists per connection, so the pool must
    // not grow past one or later statements land in a fresh empty database.
    let mut options = sea_orm::ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1);
    let conn = Database::connect(options).await?;
    ensure_schema(&conn).await?;
    Ok(conn)
}

/// Minimal schema bootstrap: create the required tables if they do not
/// exist yet. Timestamps are stored as UTC RFC 3339 text, so SQL range
/// comparisons on them behave like instant comparisons.
async fn ensure_schema(conn: &DatabaseConnection) -> anyhow::Result<()> {
    if !table_exists(conn, "events").await? {
        tracing::info!("Creating events table");
        let create_events_sql = r#"
            CREATE TABLE events (
                id TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                price REAL NOT NULL DEFAULT 0,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                capacity INTEGER NOT NULL DEFAULT 0,
                participants TEXT NOT NULL DEFAULT '[]',
                created_at TEXT,
                updated_at TEXT,
                version INTEGER NOT NULL DEFAULT 0
            );
        "#;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            create_events_sql.to_string(),
        ))
        .await?;
    }

    if !table_exists(conn, "sys_users").await? {
        tracing::info!("Creating sys_users table");
        let create_users_sql = r#"
            CREATE TABLE sys_users (
                id TEXT PRIMARY KEY NOT NULL,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'member',
                created_at TEXT,
                updated_at TEXT
            );
        "#;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            create_users_sql.to_string(),
        ))
        .await?;
    }

    Ok(())
}

async fn table_exists(conn: &DatabaseConnection, name: &str) -> anyhow::Result<bool> {
    let rows = conn
        .query_all(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT name FROM sqlite_master WHERE type='table' AND name = ?",
            [name.into()],
        ))
        .await?;
    Ok(!rows.is_empty())
}
