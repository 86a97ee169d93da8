use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{BackendError, DispatchError};
use crate::models::{Event, EventPatch, NewEvent, NewTask, Task, TaskPatch};
use crate::service::routing::{OperationCall, RoutingDecision};
use crate::service::temporal::TemporalWindow;

/// Per-id outcome of a batch patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    pub id: String,
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize)]
pub enum BackendResult {
    Events(Vec<Event>),
    Tasks(Vec<Task>),
    Created(Vec<String>),
    Updated(Vec<UpdateStatus>),
}

/// Storage collaborator. Three call shapes per domain; create returns the
/// assigned ids in input order.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn fetch_events(
        &self,
        window: &TemporalWindow,
    ) -> Result<Vec<Event>, BackendError>;
    async fn create_events(&self, events: &[NewEvent]) -> Result<Vec<String>, BackendError>;
    async fn update_events(&self, patches: &[EventPatch]) -> Result<Vec<UpdateStatus>, BackendError>;

    async fn fetch_tasks(&self, window: &TemporalWindow) -> Result<Vec<Task>, BackendError>;
    async fn create_tasks(&self, tasks: &[NewTask]) -> Result<Vec<String>, BackendError>;
    async fn update_tasks(&self, patches: &[TaskPatch]) -> Result<Vec<UpdateStatus>, BackendError>;
}

/// Maps a dispatchable decision to exactly one backend call. A rejected
/// decision never reaches the backend, not even partially.
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn dispatch(
        &self,
        decision: &RoutingDecision,
    ) -> Result<BackendResult, DispatchError> {
        let call = match decision {
            RoutingDecision::Dispatchable { call, .. } => call,
            RoutingDecision::Rejected { .. } => return Err(DispatchError::RejectedDecision),
        };
        debug!(operation = call.operation_name(), "dispatching");

        let result = match call {
            OperationCall::FetchEvents { window } => {
                BackendResult::Events(self.backend.fetch_events(window).await?)
            }
            OperationCall::CreateEvents { events } => {
                BackendResult::Created(self.backend.create_events(events).await?)
            }
            OperationCall::UpdateEvents { events } => {
                BackendResult::Updated(self.backend.update_events(events).await?)
            }
            OperationCall::FetchTasks { window } => {
                BackendResult::Tasks(self.backend.fetch_tasks(window).await?)
            }
            OperationCall::CreateTasks { tasks } => {
                BackendResult::Created(self.backend.create_tasks(tasks).await?)
            }
            OperationCall::UpdateTasks { tasks } => {
                BackendResult::Updated(self.backend.update_tasks(tasks).await?)
            }
        };
        Ok(result)
    }
}

/// HashMap-backed store, enough for the CLI and the tests. Real calendar
/// and todo-list services plug in behind the same trait.
#[derive(Default)]
pub struct InMemoryBackend {
    events: Mutex<HashMap<String, Event>>,
    tasks: Mutex<HashMap<String, Task>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_event(&self, event: Event) -> String {
        let id = event.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut events = self.events.lock().await;
        events.insert(
            id.clone(),
            Event {
                id: Some(id.clone()),
                ..event
            },
        );
        id
    }

    pub async fn insert_task(&self, task: Task) -> String {
        let id = task.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut tasks = self.tasks.lock().await;
        tasks.insert(
            id.clone(),
            Task {
                id: Some(id.clone()),
                ..task
            },
        );
        id
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn fetch_events(
        &self,
        window: &TemporalWindow,
    ) -> Result<Vec<Event>, BackendError> {
        let events = self.events.lock().await;
        // The window already encodes "upcoming" (its `from` defaults to the
        // reference day), so events only need the overlap check.
        let mut matching: Vec<Event> = events
            .values()
            .filter(|e| e.from <= window.to && e.to >= window.from)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.from);
        Ok(matching)
    }

    async fn create_events(&self, new_events: &[NewEvent]) -> Result<Vec<String>, BackendError> {
        let mut ids = Vec::with_capacity(new_events.len());
        for event in new_events {
            ids.push(
                self.insert_event(Event {
                    id: None,
                    name: event.name.clone(),
                    from: event.from,
                    to: event.to,
                    location: event.location.clone(),
                })
                .await,
            );
        }
        Ok(ids)
    }

    async fn update_events(
        &self,
        patches: &[EventPatch],
    ) -> Result<Vec<UpdateStatus>, BackendError> {
        let mut events = self.events.lock().await;
        let mut statuses = Vec::with_capacity(patches.len());
        for patch in patches {
            let applied = match events.get_mut(&patch.id) {
                Some(event) => {
                    if let Some(name) = &patch.name {
                        event.name = name.clone();
                    }
                    if let Some(from) = patch.from {
                        event.from = from;
                    }
                    if let Some(to) = patch.to {
                        event.to = to;
                    }
                    if let Some(location) = &patch.location {
                        event.location = location.clone();
                    }
                    true
                }
                None => false,
            };
            statuses.push(UpdateStatus {
                id: patch.id.clone(),
                applied,
            });
        }
        Ok(statuses)
    }

    async fn fetch_tasks(&self, window: &TemporalWindow) -> Result<Vec<Task>, BackendError> {
        let tasks = self.tasks.lock().await;
        let mut matching: Vec<Task> = tasks
            .values()
            .filter(|t| t.due >= window.from && t.due <= window.to)
            .filter(|t| window.include_all || !t.completed)
            .cloned()
            .collect();
        matching.sort_by_key(|t| t.due);
        Ok(matching)
    }

    async fn create_tasks(&self, new_tasks: &[NewTask]) -> Result<Vec<String>, BackendError> {
        let mut ids = Vec::with_capacity(new_tasks.len());
        for task in new_tasks {
            ids.push(
                self.insert_task(Task {
                    id: None,
                    content: task.content.clone(),
                    due: task.due,
                    project: task.project,
                    completed: false,
                })
                .await,
            );
        }
        Ok(ids)
    }

    async fn update_tasks(
        &self,
        patches: &[TaskPatch],
    ) -> Result<Vec<UpdateStatus>, BackendError> {
        let mut tasks = self.tasks.lock().await;
        let mut statuses = Vec::with_capacity(patches.len());
        for patch in patches {
            let applied = match tasks.get_mut(&patch.id) {
                Some(task) => {
                    if let Some(content) = &patch.content {
                        task.content = content.clone();
                    }
                    if let Some(due) = patch.due {
                        task.due = due;
                    }
                    if let Some(project) = patch.project {
                        task.project = project;
                    }
                    if let Some(status) = patch.status {
                        task.completed = status;
                    }
                    true
                }
                None => false,
            };
            statuses.push(UpdateStatus {
                id: patch.id.clone(),
                applied,
            });
        }
        Ok(statuses)
    }
}
