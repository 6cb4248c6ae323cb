use crate::service::*;
use async_trait::async_trait;
use soil_core::{Content, Result, SoilError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Store {
    memories: HashMap<String, Vec<UserMemory>>,
    sessions: HashMap<MemoryScope, Vec<Content>>,
}

/// Process-local [`MemoryService`] for tests and offline runs.
#[derive(Clone, Default)]
pub struct InMemoryMemoryService {
    store: Arc<RwLock<Store>>,
}

impl InMemoryMemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> SoilError {
        SoilError::Memory("in-memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl MemoryService for InMemoryMemoryService {
    async fn user_memories(&self, user_id: &str) -> Result<Vec<UserMemory>> {
        let store = self.store.read().map_err(|_| Self::poisoned())?;
        Ok(store.memories.get(user_id).cloned().unwrap_or_default())
    }

    async fn add_user_memories(
        &self,
        scope: &MemoryScope,
        memories: Vec<String>,
        input: &str,
    ) -> Result<Vec<UserMemory>> {
        let mut store = self.store.write().map_err(|_| Self::poisoned())?;
        let existing = store.memories.entry(scope.user_id.clone()).or_default();

        let added: Vec<UserMemory> = novel_memories(existing, memories)
            .into_iter()
            .map(|m| UserMemory::new(scope.user_id.clone(), m, Some(input.to_string())))
            .collect();
        existing.extend(added.iter().cloned());
        Ok(added)
    }

    async fn session_history(&self, scope: &MemoryScope) -> Result<Vec<Content>> {
        let store = self.store.read().map_err(|_| Self::poisoned())?;
        Ok(store.sessions.get(scope).cloned().unwrap_or_default())
    }

    async fn append_to_session(&self, scope: &MemoryScope, contents: Vec<Content>) -> Result<()> {
        let mut store = self.store.write().map_err(|_| Self::poisoned())?;
        store.sessions.entry(scope.clone()).or_default().extend(contents);
        Ok(())
    }

    async fn clear_user_memories(&self, user_id: &str) -> Result<()> {
        let mut store = self.store.write().map_err(|_| Self::poisoned())?;
        store.memories.remove(user_id);
        Ok(())
    }
}
