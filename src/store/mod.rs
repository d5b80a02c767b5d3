use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::RunQueryDsl;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{LivroError, Result};

pub mod models;
mod schema;
mod tracking;
mod writing;

pub use models::{
    AtomicNote, Book, BookUpdate, Chapter, ChapterStatus, ChapterUpdate, Milestone, MilestoneType,
    Ritual, RitualType, RitualUpdate, Role, Session, SessionMode, SessionUpdate, SettingsUpdate,
    User, UserSettings, UserUpsert,
};
pub use tracking::DEFAULT_SESSION_LIMIT;

use models::{NewUser, UserChanges, UserRow};
use schema::users;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

type SqliteAsyncConn = SyncConnectionWrapper<SqliteConnection>;
type SqlitePool = Pool<SqliteAsyncConn>;
type SqlitePooledConn<'a> = PooledConnection<'a, SqliteAsyncConn>;

#[derive(QueryableByName)]
struct RowId {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    id: i64,
}

/// Explicitly constructed persistence handle. Built once at startup and
/// injected into the router; holds the pool and the owner identity that is
/// promoted to admin on upsert.
pub struct Store {
    pool: SqlitePool,
    owner_open_id: Option<String>,
}

impl Store {
    pub async fn new(sqlite_path: impl AsRef<str>, owner_open_id: Option<String>) -> Result<Self> {
        let sqlite_path = sqlite_path.as_ref();
        ensure_parent_dir(sqlite_path)?;
        run_migrations(sqlite_path).await?;

        let manager = AsyncDieselConnectionManager::<SqliteAsyncConn>::new(sqlite_path);
        let pool: SqlitePool = Pool::builder()
            .build(manager)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(Self {
            pool,
            owner_open_id,
        })
    }

    /// Connection for write paths. Failure to reach the backend is loud: a
    /// write must never be silently dropped.
    pub(crate) async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        self.pool
            .get()
            .await
            .map_err(|e| LivroError::Database(e.to_string()))
    }

    /// Connection for read paths. When the backend is unavailable, reads
    /// degrade to "not found" / empty list instead of failing the caller.
    pub(crate) async fn read_conn(&self) -> Option<SqlitePooledConn<'_>> {
        match self.pool.get().await {
            Ok(conn) => Some(conn),
            Err(err) => {
                tracing::warn!(error = %err, "database unavailable, degrading read");
                None
            }
        }
    }

    pub(crate) async fn last_insert_id(conn: &mut SqlitePooledConn<'_>) -> Result<i32> {
        let row: RowId = diesel::sql_query("SELECT last_insert_rowid() as id")
            .get_result(conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(row.id as i32)
    }

    pub async fn user_by_open_id(&self, open_id: &str) -> Result<Option<User>> {
        let Some(mut conn) = self.read_conn().await else {
            return Ok(None);
        };
        let row: Option<UserRow> = users::table
            .filter(users::open_id.eq(open_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(row.map(User::from))
    }

    /// Upsert keyed by the external identity. On conflict only the fields
    /// the caller actually supplied enter the update set; `last_signed_in`
    /// is always refreshed. The configured owner identity is force-promoted
    /// to admin.
    pub async fn upsert_user(&self, upsert: &UserUpsert) -> Result<User> {
        if upsert.open_id.trim().is_empty() {
            return Err(LivroError::validation("openId", "must not be empty"));
        }
        let now = now_ts();
        let is_owner = self.owner_open_id.as_deref() == Some(upsert.open_id.as_str());

        let mut conn = self.conn().await?;
        let existing: Option<UserRow> = users::table
            .filter(users::open_id.eq(upsert.open_id.as_str()))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;

        let id = match existing {
            Some(row) => {
                let changes = UserChanges {
                    name: upsert.name.as_deref(),
                    email: upsert.email.as_deref(),
                    login_method: upsert.login_method.as_deref(),
                    role: is_owner.then_some(Role::Admin.as_str()),
                    last_signed_in: now,
                    updated_at: now,
                };
                diesel::update(users::table.filter(users::id.eq(row.id)))
                    .set(changes)
                    .execute(&mut conn)
                    .await
                    .map_err(|e| LivroError::Database(e.to_string()))?;
                row.id
            }
            None => {
                let role = if is_owner { Role::Admin } else { Role::User };
                let new = NewUser {
                    open_id: &upsert.open_id,
                    name: upsert.name.as_deref(),
                    email: upsert.email.as_deref(),
                    login_method: upsert.login_method.as_deref(),
                    role: role.as_str(),
                    last_signed_in: now,
                    created_at: now,
                    updated_at: now,
                };
                diesel::insert_into(users::table)
                    .values(&new)
                    .execute(&mut conn)
                    .await
                    .map_err(|e| LivroError::Database(e.to_string()))?;
                Self::last_insert_id(&mut conn).await?
            }
        };

        let row: UserRow = users::table
            .filter(users::id.eq(id))
            .first(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(User::from(row))
    }
}

pub(crate) fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LivroError::Database(e.to_string()))?;
    }
    Ok(())
}

async fn run_migrations(database_url: &str) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = SqliteConnection::establish(&database_url)
            .map_err(|e| LivroError::Database(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok::<_, LivroError>(())
    })
    .await
    .map_err(|e| LivroError::Runtime(e.to_string()))??;
    Ok(())
}
