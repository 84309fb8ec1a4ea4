//! User store
//!
//! SQLite-backed credential store. Username and email carry UNIQUE
//! constraints; the constraint is the authoritative duplicate guard and a
//! violation surfaces as [`Error::AlreadyExists`] even when two registrations
//! race past the service-level pre-check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

use crate::types::{NewUser, Role, User};
use crate::{Error, Result};

/// Lookup and persistence capability the authentication service needs from
/// a credential store. Resource repositories (posts, comments, ...) are a
/// separate concern and never go through this trait.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    /// Username or email, for login.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>>;
    async fn username_exists(&self, username: &str) -> Result<bool>;
    async fn email_exists(&self, email: &str) -> Result<bool>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl SqliteStore {
    /// Open (creating if necessary) the database and ensure the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| Error::Config(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        tracing::info!(url = database_url, "user store ready");
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id            TEXT PRIMARY KEY,
                username      TEXT NOT NULL UNIQUE,
                email         TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                image_url     TEXT,
                created_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS roles (
                id   INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_roles (
                user_id TEXT    NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, role_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS refresh_tokens (
                token       TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expiry_date TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user ON refresh_tokens(user_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_roles(&self, user_id: &str) -> Result<Vec<Role>> {
        let rows = sqlx::query(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = ?
            ORDER BY r.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let name: String = row.get("name");
                Role::parse(&name)
                    .ok_or_else(|| Error::Internal(format!("Unknown role in store: {}", name)))
            })
            .collect()
    }

    async fn hydrate(&self, row: UserRow) -> Result<User> {
        let roles = self.load_roles(&row.id).await?;
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            image_url: row.image_url,
            roles,
            created_at: row.created_at,
        })
    }

    fn map_unique_violation(e: sqlx::Error) -> Error {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let message = db.message().to_string();
                return if message.contains("users.username") {
                    Error::AlreadyExists("Username already exists.".to_string())
                } else if message.contains("users.email") {
                    Error::AlreadyExists("Email is already in use.".to_string())
                } else {
                    Error::AlreadyExists("Resource already exists.".to_string())
                };
            }
        }
        Error::Database(e)
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let id = User::new_id();
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, image_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.image_url)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(Self::map_unique_violation)?;

        // Role rows are lazily created the first time a role is referenced.
        for role in &new_user.roles {
            sqlx::query("INSERT OR IGNORE INTO roles (name) VALUES (?)")
                .bind(role.as_str())
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO user_roles (user_id, role_id)
                SELECT ?, id FROM roles WHERE name = ?
                "#,
            )
            .bind(&id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(username = %new_user.username, "user created");

        Ok(User {
            id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            image_url: new_user.image_url,
            roles: new_user.roles,
            created_at,
        })
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, image_url, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, image_url, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash, image_url, created_at
            FROM users WHERE username = ?1 OR email = ?1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}
