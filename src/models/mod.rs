pub mod event;
pub mod task;

pub use event::{Event, EventPatch, NewEvent};
pub use task::{NewTask, Project, Task, TaskPatch};

/// One previously fetched entity, as supplied by the caller before an
/// update request. Read-only input; the router never refreshes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownEntity {
    pub id: String,
    pub text: String,
}

impl KnownEntity {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    pub fn from_event(event: &Event) -> Option<Self> {
        event.id.as_ref().map(|id| Self::new(id, &event.name))
    }

    pub fn from_task(task: &Task) -> Option<Self> {
        task.id.as_ref().map(|id| Self::new(id, &task.content))
    }
}
