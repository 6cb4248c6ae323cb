//! PostgreSQL-backed memory store.
//!
//! Only available with the `postgres` feature (on by default).

use crate::service::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use soil_core::{Content, Result, SoilError};
use sqlx::{PgPool, Row};
use tracing::debug;

pub const DEFAULT_MEMORY_TABLE: &str = "my_memory_table";
pub const DEFAULT_SESSION_TABLE: &str = "soil_sessions";

/// Table names are interpolated into SQL, so they must be plain identifiers.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.len() <= 63;
    if valid {
        Ok(())
    } else {
        Err(SoilError::Config(format!("invalid table name '{name}'")))
    }
}

fn db_err(context: &str) -> impl Fn(sqlx::Error) -> SoilError + '_ {
    move |e| SoilError::Memory(format!("{context}: {e}"))
}

pub struct PostgresMemoryService {
    pool: PgPool,
    memory_table: String,
    session_table: String,
}

impl PostgresMemoryService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            memory_table: DEFAULT_MEMORY_TABLE.to_string(),
            session_table: DEFAULT_SESSION_TABLE.to_string(),
        }
    }

    pub fn with_tables(
        mut self,
        memory_table: impl Into<String>,
        session_table: impl Into<String>,
    ) -> Result<Self> {
        let memory_table = memory_table.into();
        let session_table = session_table.into();
        validate_table_name(&memory_table)?;
        validate_table_name(&session_table)?;
        self.memory_table = memory_table;
        self.session_table = session_table;
        Ok(self)
    }

    pub fn memory_table(&self) -> &str {
        &self.memory_table
    }

    pub fn session_table(&self) -> &str {
        &self.session_table
    }

    /// Create both tables if they do not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                memory_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                memory TEXT NOT NULL,
                topics JSONB NOT NULL DEFAULT '[]'::jsonb,
                input TEXT,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
            table = self.memory_table
        ))
        .execute(&self.pool)
        .await
        .map_err(db_err("migration failed"))?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_user_idx ON {table} (user_id)",
            table = self.memory_table
        ))
        .execute(&self.pool)
        .await
        .map_err(db_err("migration failed"))?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id BIGSERIAL PRIMARY KEY,
                session_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            table = self.session_table
        ))
        .execute(&self.pool)
        .await
        .map_err(db_err("migration failed"))?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_scope_idx ON {table} (user_id, session_id, id)",
            table = self.session_table
        ))
        .execute(&self.pool)
        .await
        .map_err(db_err("migration failed"))?;

        debug!(memory_table = %self.memory_table, session_table = %self.session_table, "memory tables ready");
        Ok(())
    }

    fn row_to_memory(row: &sqlx::postgres::PgRow) -> Result<UserMemory> {
        let topics: Value = row.get("topics");
        Ok(UserMemory {
            memory_id: row.get("memory_id"),
            user_id: row.get("user_id"),
            memory: row.get("memory"),
            topics: serde_json::from_value(topics)?,
            input: row.get("input"),
            updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        })
    }
}

#[async_trait]
impl MemoryService for PostgresMemoryService {
    async fn user_memories(&self, user_id: &str) -> Result<Vec<UserMemory>> {
        let rows = sqlx::query(&format!(
            "SELECT memory_id, user_id, memory, topics, input, updated_at FROM {} \
             WHERE user_id = $1 ORDER BY updated_at, memory_id",
            self.memory_table
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("failed to load user memories"))?;

        rows.iter().map(Self::row_to_memory).collect()
    }

    async fn add_user_memories(
        &self,
        scope: &MemoryScope,
        memories: Vec<String>,
        input: &str,
    ) -> Result<Vec<UserMemory>> {
        let existing = self.user_memories(&scope.user_id).await?;
        let added: Vec<UserMemory> = novel_memories(&existing, memories)
            .into_iter()
            .map(|m| UserMemory::new(scope.user_id.clone(), m, Some(input.to_string())))
            .collect();
        if added.is_empty() {
            return Ok(added);
        }

        let mut tx = self.pool.begin().await.map_err(db_err("failed to begin transaction"))?;
        for memory in &added {
            sqlx::query(&format!(
                "INSERT INTO {} (memory_id, user_id, memory, topics, input, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                self.memory_table
            ))
            .bind(&memory.memory_id)
            .bind(&memory.user_id)
            .bind(&memory.memory)
            .bind(serde_json::to_value(&memory.topics)?)
            .bind(&memory.input)
            .bind(memory.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err("failed to insert user memory"))?;
        }
        tx.commit().await.map_err(db_err("failed to commit user memories"))?;

        debug!(user_id = %scope.user_id, count = added.len(), "stored user memories");
        Ok(added)
    }

    async fn session_history(&self, scope: &MemoryScope) -> Result<Vec<Content>> {
        let rows = sqlx::query(&format!(
            "SELECT content FROM {} WHERE user_id = $1 AND session_id = $2 ORDER BY id",
            self.session_table
        ))
        .bind(&scope.user_id)
        .bind(&scope.session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("failed to load session history"))?;

        rows.iter()
            .map(|row| {
                let content: Value = row.get("content");
                serde_json::from_value(content).map_err(SoilError::from)
            })
            .collect()
    }

    async fn append_to_session(&self, scope: &MemoryScope, contents: Vec<Content>) -> Result<()> {
        if contents.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err("failed to begin transaction"))?;
        for content in &contents {
            sqlx::query(&format!(
                "INSERT INTO {} (session_id, user_id, role, content, created_at) \
                 VALUES ($1, $2, $3, $4, $5)",
                self.session_table
            ))
            .bind(&scope.session_id)
            .bind(&scope.user_id)
            .bind(&content.role)
            .bind(serde_json::to_value(content)?)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_err("failed to append session turn"))?;
        }
        tx.commit().await.map_err(db_err("failed to commit session turns"))?;
        Ok(())
    }

    async fn clear_user_memories(&self, user_id: &str) -> Result<()> {
        sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", self.memory_table))
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err("failed to clear user memories"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("my_memory_table").is_ok());
        assert!(validate_table_name("_t1").is_ok());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_table_name("users; DROP TABLE x").is_err());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name(&"a".repeat(64)).is_err());
    }
}
