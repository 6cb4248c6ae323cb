use soil_core::{Content, Part};
use soil_memory::*;

fn scope(user: &str, session: &str) -> MemoryScope {
    MemoryScope::new(user, session)
}

#[tokio::test]
async fn test_user_memories_follow_user_across_sessions() {
    let service = InMemoryMemoryService::new();

    let added = service
        .add_user_memories(
            &scope("user_123", "session_a"),
            vec!["User's name is Junior".into()],
            "Meu nome é junior",
        )
        .await
        .unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].input.as_deref(), Some("Meu nome é junior"));

    // a different session of the same user sees the memory
    let memories = service.user_memories("user_123").await.unwrap();
    assert_eq!(memories.len(), 1);
    assert_eq!(memories[0].memory, "User's name is Junior");
    assert_eq!(memories[0].user_id, "user_123");
}

#[tokio::test]
async fn test_user_memories_are_isolated_by_user() {
    let service = InMemoryMemoryService::new();
    service
        .add_user_memories(&scope("alice", "s1"), vec!["Grows coffee".into()], "input")
        .await
        .unwrap();

    assert!(service.user_memories("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_memories_are_skipped() {
    let service = InMemoryMemoryService::new();
    let scope = scope("u", "s");

    service.add_user_memories(&scope, vec!["Farm is in Goiás".into()], "a").await.unwrap();
    let added = service
        .add_user_memories(&scope, vec!["farm is in goiás".into(), "Uses no-till".into()], "b")
        .await
        .unwrap();

    assert_eq!(added.len(), 1);
    assert_eq!(added[0].memory, "Uses no-till");
    assert_eq!(service.user_memories("u").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_session_history_is_scoped_and_ordered() {
    let service = InMemoryMemoryService::new();
    let s1 = scope("u", "s1");

    service
        .append_to_session(&s1, vec![Content::user("Olá"), Content::model("Olá! Como posso ajudar?")])
        .await
        .unwrap();
    service.append_to_session(&s1, vec![Content::user("Quanto calcário?")]).await.unwrap();

    let history = service.session_history(&s1).await.unwrap();
    let texts: Vec<String> = history.iter().map(Content::text).collect();
    assert_eq!(texts, vec!["Olá", "Olá! Como posso ajudar?", "Quanto calcário?"]);

    assert!(service.session_history(&scope("u", "s2")).await.unwrap().is_empty());
    assert!(service.session_history(&scope("other", "s1")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_user_memories_keeps_history() {
    let service = InMemoryMemoryService::new();
    let scope = scope("u", "s");
    service.add_user_memories(&scope, vec!["Name is Ana".into()], "x").await.unwrap();
    service.append_to_session(&scope, vec![Content::user("x")]).await.unwrap();

    service.clear_user_memories("u").await.unwrap();

    assert!(service.user_memories("u").await.unwrap().is_empty());
    assert_eq!(service.session_history(&scope).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_clones_share_the_same_store() {
    let service = InMemoryMemoryService::new();
    let clone = service.clone();
    clone.add_user_memories(&scope("u", "s"), vec!["Fact".into()], "x").await.unwrap();
    assert_eq!(service.user_memories("u").await.unwrap().len(), 1);
}

#[cfg(feature = "postgres")]
mod postgres {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    async fn service() -> PostgresMemoryService {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new().max_connections(2).connect(&url).await.unwrap();
        let service = PostgresMemoryService::new(pool)
            .with_tables("soil_test_memories", "soil_test_sessions")
            .unwrap();
        service.migrate().await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_invalid_table_names_are_rejected() {
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/soil").unwrap();
        for name in ["bad-name", "x; DROP TABLE y", "1st"] {
            let result = PostgresMemoryService::new(pool.clone()).with_tables(name, DEFAULT_SESSION_TABLE);
            assert!(matches!(result, Err(soil_core::SoilError::Config(_))), "{name} accepted");
        }
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL at DATABASE_URL"]
    async fn test_postgres_round_trip() {
        let service = service().await;
        let user = format!("user_{}", uuid_suffix());
        let scope = MemoryScope::new(&user, "session_456");

        let added = service
            .add_user_memories(&scope, vec!["User's name is Junior".into()], "Meu nome é junior")
            .await
            .unwrap();
        assert_eq!(added.len(), 1);
        let again = service
            .add_user_memories(&scope, vec!["user's name is junior".into()], "again")
            .await
            .unwrap();
        assert!(again.is_empty());

        service
            .append_to_session(
                &scope,
                vec![
                    Content::user("Meu nome é junior"),
                    Content::model("Prazer").with_part(Part::text_part(", Junior!")),
                ],
            )
            .await
            .unwrap();
        let history = service.session_history(&scope).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].text(), "Prazer, Junior!");

        service.clear_user_memories(&user).await.unwrap();
        assert!(service.user_memories(&user).await.unwrap().is_empty());
    }

    fn uuid_suffix() -> String {
        UserMemory::new("x", "x", None).memory_id.replace('-', "")
    }
}
