use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soil_core::{Content, Result};
use std::collections::HashSet;

/// The pair of identifiers every memory operation is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryScope {
    pub user_id: String,
    pub session_id: String,
}

impl MemoryScope {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), session_id: session_id.into() }
    }
}

/// A durable fact about a user, kept across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMemory {
    pub memory_id: String,
    pub user_id: String,
    pub memory: String,
    #[serde(default)]
    pub topics: Vec<String>,
    /// The user message the memory was extracted from.
    pub input: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserMemory {
    pub fn new(user_id: impl Into<String>, memory: impl Into<String>, input: Option<String>) -> Self {
        Self {
            memory_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            memory: memory.into(),
            topics: Vec::new(),
            input,
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait MemoryService: Send + Sync {
    async fn user_memories(&self, user_id: &str) -> Result<Vec<UserMemory>>;

    /// Store `memories` for the scope's user, skipping ones already known.
    ///
    /// Returns the memories actually added.
    async fn add_user_memories(
        &self,
        scope: &MemoryScope,
        memories: Vec<String>,
        input: &str,
    ) -> Result<Vec<UserMemory>>;

    /// Stored turns of the session, oldest first.
    async fn session_history(&self, scope: &MemoryScope) -> Result<Vec<Content>>;

    async fn append_to_session(&self, scope: &MemoryScope, contents: Vec<Content>) -> Result<()>;

    async fn clear_user_memories(&self, user_id: &str) -> Result<()>;
}

/// Trimmed, non-empty candidates not already present, compared case-insensitively.
pub fn novel_memories(existing: &[UserMemory], candidates: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> =
        existing.iter().map(|m| m.memory.trim().to_lowercase()).collect();
    candidates
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && seen.insert(c.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_novel_memories_dedupes_case_insensitively() {
        let existing = vec![UserMemory::new("u", "User's name is Junior", None)];
        let added = novel_memories(
            &existing,
            vec![
                "user's name is junior".into(),
                "  Grows soybeans in Paraná ".into(),
                "grows SOYBEANS in paraná".into(),
                "".into(),
            ],
        );
        assert_eq!(added, vec!["Grows soybeans in Paraná".to_string()]);
    }

    proptest! {
        #[test]
        fn prop_novel_memories_are_unique_and_new(
            existing in proptest::collection::vec("[a-zA-Z ]{0,12}", 0..6),
            candidates in proptest::collection::vec("[a-zA-Z ]{0,12}", 0..12),
        ) {
            let existing: Vec<UserMemory> =
                existing.into_iter().map(|m| UserMemory::new("u", m, None)).collect();
            let added = novel_memories(&existing, candidates);

            let mut keys = HashSet::new();
            for memory in &added {
                prop_assert!(!memory.is_empty());
                prop_assert!(keys.insert(memory.to_lowercase()));
                prop_assert!(existing.iter().all(|e| e.memory.trim().to_lowercase() != memory.to_lowercase()));
            }
        }
    }
}
