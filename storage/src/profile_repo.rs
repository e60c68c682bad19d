//! Profile repository: per-user credentials and wizard state.
//!
//! Field setters upsert, so commands like `/set_source` work in any order,
//! before or after the rest of the profile exists.

use tracing::{debug, info};

use crate::error::StorageError;
use crate::models::{SetupState, UserProfile};
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct ProfileRepository {
    pool_manager: SqlitePoolManager,
}

impl ProfileRepository {
    pub async fn new(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating user_profiles table if not exists");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_profiles (
                user_id INTEGER PRIMARY KEY,
                api_id INTEGER,
                api_hash TEXT,
                session_string TEXT,
                source TEXT,
                destination TEXT,
                setup_state TEXT
            )
            "#,
        )
        .execute(self.pool_manager.pool())
        .await?;

        Ok(())
    }

    pub async fn load(&self, user_id: i64) -> Result<Option<UserProfile>, StorageError> {
        let profile =
            sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(self.pool_manager.pool())
                .await?;
        Ok(profile)
    }

    pub async fn upsert(&self, profile: &UserProfile) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, api_id, api_hash, session_string,
                                       source, destination, setup_state)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                api_id = excluded.api_id,
                api_hash = excluded.api_hash,
                session_string = excluded.session_string,
                source = excluded.source,
                destination = excluded.destination,
                setup_state = excluded.setup_state
            "#,
        )
        .bind(profile.user_id)
        .bind(profile.api_id)
        .bind(&profile.api_hash)
        .bind(&profile.session_string)
        .bind(&profile.source)
        .bind(&profile.destination)
        .bind(profile.setup_state)
        .execute(self.pool_manager.pool())
        .await?;

        debug!(user_id = profile.user_id, "Saved profile");
        Ok(())
    }

    pub async fn set_api_id(&self, user_id: i64, api_id: i64) -> Result<(), StorageError> {
        self.set_field(user_id, "api_id", FieldValue::Int(api_id))
            .await
    }

    pub async fn set_api_hash(&self, user_id: i64, api_hash: &str) -> Result<(), StorageError> {
        self.set_field(user_id, "api_hash", FieldValue::Text(api_hash))
            .await
    }

    pub async fn set_session_string(
        &self,
        user_id: i64,
        session_string: &str,
    ) -> Result<(), StorageError> {
        self.set_field(user_id, "session_string", FieldValue::Text(session_string))
            .await
    }

    pub async fn set_source(&self, user_id: i64, source: &str) -> Result<(), StorageError> {
        self.set_field(user_id, "source", FieldValue::Text(source))
            .await
    }

    pub async fn set_destination(
        &self,
        user_id: i64,
        destination: &str,
    ) -> Result<(), StorageError> {
        self.set_field(user_id, "destination", FieldValue::Text(destination))
            .await
    }

    pub async fn set_setup_state(
        &self,
        user_id: i64,
        state: Option<SetupState>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, setup_state) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET setup_state = excluded.setup_state
            "#,
        )
        .bind(user_id)
        .bind(state)
        .execute(self.pool_manager.pool())
        .await?;
        Ok(())
    }

    async fn set_field(
        &self,
        user_id: i64,
        column: &'static str,
        value: FieldValue<'_>,
    ) -> Result<(), StorageError> {
        // `column` is a compile-time constant from the setters above, never
        // caller input.
        let sql = format!(
            "INSERT INTO user_profiles (user_id, {col}) VALUES (?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET {col} = excluded.{col}",
            col = column
        );

        let query = sqlx::query(&sql).bind(user_id);
        let query = match value {
            FieldValue::Int(v) => query.bind(v),
            FieldValue::Text(v) => query.bind(v.to_string()),
        };
        query.execute(self.pool_manager.pool()).await?;

        debug!(user_id, column, "Updated profile field");
        Ok(())
    }
}

enum FieldValue<'a> {
    Int(i64),
    Text(&'a str),
}
