use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::{json, Value};

use agendaBot::errors::ModelError;
use agendaBot::models::{KnownEntity, Project, Task};
use agendaBot::schema::{builtin_registry, Domain};
use agendaBot::service::dispatch::{BackendResult, Dispatcher, InMemoryBackend};
use agendaBot::service::model::{ModelClient, ModelRequest, ModelSelection};
use agendaBot::service::routing::IntentRouter;
use agendaBot::service::temporal::CANONICAL_FORMAT;

fn dt(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, CANONICAL_FORMAT).unwrap()
}

struct FakeModel {
    name: &'static str,
    arguments: Value,
}

#[async_trait]
impl ModelClient for FakeModel {
    async fn select_operation(
        &self,
        _request: &ModelRequest,
    ) -> Result<Option<ModelSelection>, ModelError> {
        Ok(Some(ModelSelection {
            name: self.name.to_string(),
            arguments: self.arguments.clone(),
        }))
    }
}

fn router(name: &'static str, arguments: Value) -> IntentRouter {
    IntentRouter::new(
        Arc::new(builtin_registry()),
        Arc::new(FakeModel { name, arguments }),
    )
}

#[tokio::test]
async fn end_to_end_create_then_fetch() {
    let backend = Arc::new(InMemoryBackend::new());
    let dispatcher = Dispatcher::new(backend.clone());
    let reference = dt("2023-11-11 15:00:00");

    let create_router = router(
        "addTasks",
        json!({"tasks": [
            {"content": "Write newsletter about GPT-4", "due": "2023-11-13 00:00:00", "project": "easy_"},
            {"content": "Write post for AI_Devs course", "due": "today at 8pm", "project": "eduweb"},
        ]}),
    );
    let decision = create_router
        .route(
            "I need to write a newsletter about gpt-4 on Monday. Also a post for AI_Devs today at 8pm.",
            reference,
            Domain::Tasks,
            &[],
        )
        .await;
    assert!(decision.is_dispatchable());
    let ids = match dispatcher.dispatch(&decision).await.unwrap() {
        BackendResult::Created(ids) => ids,
        other => panic!("expected created ids, got {:?}", other),
    };
    assert_eq!(ids.len(), 2);

    let fetch_router = router(
        "getTasks",
        json!({"from": "2023-11-11 00:00:00", "to": "2023-11-13 23:59:59", "all": false}),
    );
    let decision = fetch_router
        .route("what's on my list this weekend?", reference, Domain::Tasks, &[])
        .await;
    let tasks = match dispatcher.dispatch(&decision).await.unwrap() {
        BackendResult::Tasks(tasks) => tasks,
        other => panic!("expected tasks, got {:?}", other),
    };
    assert_eq!(tasks.len(), 2);
    // Relative "today at 8pm" came out canonical and future-biased.
    assert_eq!(tasks[0].due, dt("2023-11-11 20:00:00"));
    assert_eq!(tasks[0].project, Project::Eduweb);
}

#[tokio::test]
async fn end_to_end_update_resolved_against_snapshot() {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .insert_task(Task {
            id: Some("789".to_string()),
            content: "Buy milk".to_string(),
            due: dt("2023-11-11 23:59:59"),
            project: Project::Inbox,
            completed: false,
        })
        .await;
    let dispatcher = Dispatcher::new(backend.clone());
    let snapshot = vec![
        KnownEntity::new("123", "Write newsletter about GPT-4"),
        KnownEntity::new("789", "Buy milk"),
    ];

    let update_router = router(
        "updateTasks",
        json!({"tasks": [
            {"content": "Buy milk and sugar", "due": "2023-11-11 23:59:59"},
        ]}),
    );
    let decision = update_router
        .route(
            "Ouh I forgot! Beside milk I need to buy sugar. Update my tasks please.",
            dt("2023-11-11 15:00:00"),
            Domain::Tasks,
            &snapshot,
        )
        .await;
    let statuses = match dispatcher.dispatch(&decision).await.unwrap() {
        BackendResult::Updated(statuses) => statuses,
        other => panic!("expected update statuses, got {:?}", other),
    };
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].id, "789");
    assert!(statuses[0].applied);

    let fetch_router = router("getTasks", json!({"all": true}));
    let decision = fetch_router
        .route("show everything for today", dt("2023-11-11 15:00:00"), Domain::Tasks, &[])
        .await;
    match dispatcher.dispatch(&decision).await.unwrap() {
        BackendResult::Tasks(tasks) => {
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].content, "Buy milk and sugar");
        }
        other => panic!("expected tasks, got {:?}", other),
    }
}
