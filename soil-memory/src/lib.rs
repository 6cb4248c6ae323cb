//! # soil-memory
//!
//! Long-term user memories and short-term session history for the soil advisor.
//!
//! - [`MemoryService`] - trait for storage backends
//! - [`InMemoryMemoryService`] - process-local store for tests and offline runs
//! - `PostgresMemoryService` - durable store (feature `postgres`, on by default)
//!
//! Every operation is keyed by a [`MemoryScope`]: user memories follow the
//! user across sessions, history stays inside one session.
//!
//! ```rust,no_run
//! use soil_memory::{InMemoryMemoryService, MemoryScope, MemoryService};
//!
//! # async fn demo() -> soil_core::Result<()> {
//! let memory = InMemoryMemoryService::new();
//! let scope = MemoryScope::new("user_123", "session_456");
//! memory.add_user_memories(&scope, vec!["User's name is Junior".into()], "Meu nome é junior").await?;
//! assert_eq!(memory.user_memories("user_123").await?.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod inmemory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod service;

pub use inmemory::InMemoryMemoryService;
#[cfg(feature = "postgres")]
pub use postgres::{DEFAULT_MEMORY_TABLE, DEFAULT_SESSION_TABLE, PostgresMemoryService};
pub use service::{MemoryScope, MemoryService, UserMemory, novel_memories};
