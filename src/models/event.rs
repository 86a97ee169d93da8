use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::service::temporal::{canonical, canonical_opt};

/// A calendar event. `id` is present only on entities fetched from the
/// backend; new events get theirs assigned on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(with = "canonical")]
    pub from: NaiveDateTime,
    #[serde(with = "canonical")]
    pub to: NaiveDateTime,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    #[serde(with = "canonical")]
    pub from: NaiveDateTime,
    #[serde(with = "canonical")]
    pub to: NaiveDateTime,
    pub location: String,
}

/// Partial update keyed by a resolved id. Absent fields stay unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, with = "canonical_opt", skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDateTime>,
    #[serde(default, with = "canonical_opt", skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}
