use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::service::temporal::{canonical, canonical_opt};

/// Fixed project set the todo-list backend understands. Anything the model
/// emits outside this set is a row-level validation failure, never remapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Project {
    #[default]
    Inbox,
    Overment,
    Eduweb,
    #[serde(rename = "easy_")]
    Easy,
}

impl FromStr for Project {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "inbox" => Ok(Project::Inbox),
            "overment" => Ok(Project::Overment),
            "eduweb" => Ok(Project::Eduweb),
            "easy_" => Ok(Project::Easy),
            other => Err(format!("unknown project '{other}'")),
        }
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Project::Inbox => write!(f, "inbox"),
            Project::Overment => write!(f, "overment"),
            Project::Eduweb => write!(f, "eduweb"),
            Project::Easy => write!(f, "easy_"),
        }
    }
}

/// A todo-list task. `id` is present only on fetched entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    #[serde(with = "canonical")]
    pub due: NaiveDateTime,
    pub project: Project,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub content: String,
    #[serde(with = "canonical")]
    pub due: NaiveDateTime,
    pub project: Project,
}

/// Partial update keyed by a resolved id. `status` toggles completion;
/// absent fields stay unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, with = "canonical_opt", skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
}
