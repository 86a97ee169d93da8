use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Calendar,
    Tasks,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Calendar => write!(f, "calendar"),
            Domain::Tasks => write!(f, "tasks"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Fetch,
    Create,
    Update,
}

#[derive(Debug, Clone)]
pub enum FieldType {
    Text,
    Flag,
    /// An array of records, each described by the nested field specs.
    Rows(Vec<FieldSpec>),
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub description: &'static str,
}

impl FieldSpec {
    fn text(name: &'static str, required: bool, description: &'static str) -> Self {
        Self {
            name,
            field_type: FieldType::Text,
            required,
            description,
        }
    }

    fn flag(name: &'static str, required: bool, description: &'static str) -> Self {
        Self {
            name,
            field_type: FieldType::Flag,
            required,
            description,
        }
    }

    fn rows(name: &'static str, items: Vec<FieldSpec>, description: &'static str) -> Self {
        Self {
            name,
            field_type: FieldType::Rows(items),
            required: true,
            description,
        }
    }

    fn json_schema(&self) -> Value {
        match &self.field_type {
            FieldType::Text => json!({"type": "string", "description": self.description}),
            FieldType::Flag => json!({"type": "boolean", "description": self.description}),
            FieldType::Rows(items) => {
                let mut properties = serde_json::Map::new();
                let mut required = Vec::new();
                for item in items {
                    properties.insert(item.name.to_string(), item.json_schema());
                    if item.required {
                        required.push(item.name);
                    }
                }
                json!({
                    "type": "array",
                    "description": self.description,
                    "items": {
                        "type": "object",
                        "properties": Value::Object(properties),
                        "required": required,
                    },
                })
            }
        }
    }
}

/// One selectable operation. Immutable once registered; the registry owns
/// the full set per domain.
#[derive(Debug, Clone)]
pub struct OperationSchema {
    pub name: &'static str,
    pub domain: Domain,
    pub kind: OperationKind,
    pub description: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl OperationSchema {
    /// Renders the argument spec as a JSON-schema `parameters` object, the
    /// shape the chat-completions tools API expects.
    pub fn parameters_json(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            properties.insert(field.name.to_string(), field.json_schema());
            if field.required {
                required.push(field.name);
            }
        }
        json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": required,
        })
    }

    pub fn required_row_fields(&self) -> Vec<&'static str> {
        for field in &self.fields {
            if let FieldType::Rows(items) = &field.field_type {
                return items.iter().filter(|i| i.required).map(|i| i.name).collect();
            }
        }
        Vec::new()
    }

    /// Name of the array field carrying the rows (`events` or `tasks`).
    pub fn rows_field(&self) -> Option<&'static str> {
        self.fields.iter().find_map(|f| match f.field_type {
            FieldType::Rows(_) => Some(f.name),
            _ => None,
        })
    }
}

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    by_domain: HashMap<Domain, Vec<OperationSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one operation. Keeps each domain's schemas in fetch,
    /// create, update order regardless of registration order, so the
    /// rendered prompt is deterministic.
    pub fn register(&mut self, schema: OperationSchema) -> Result<(), SchemaError> {
        let entries = self.by_domain.entry(schema.domain).or_default();
        if entries.iter().any(|s| s.name == schema.name) {
            return Err(SchemaError::DuplicateOperation {
                domain: schema.domain,
                name: schema.name.to_string(),
            });
        }
        let position = entries
            .iter()
            .position(|s| s.kind > schema.kind)
            .unwrap_or(entries.len());
        entries.insert(position, schema);
        Ok(())
    }

    pub fn schemas_for(&self, domain: Domain) -> &[OperationSchema] {
        self.by_domain.get(&domain).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, domain: Domain, name: &str) -> Option<&OperationSchema> {
        self.schemas_for(domain).iter().find(|s| s.name == name)
    }
}

const PROJECT_DESCRIPTION: &str = "Automatically detected project name for this task. Should be either: \
\"inbox\" (default), \"overment\" for tasks related to the YouTube channel, second brain, and private life, \
\"eduweb\" for tasks related to education, online courses, design & tech, AI, community, and writing, \
\"easy_\" for tasks related to digital products, sales, online business, and marketing. \
Similar tasks may occur for different projects; consider their context.";

/// The full operation set the router may select from, matching the
/// function-calling schemas the backends were built around. `from`/`to`
/// and row-level end datetimes are optional on purpose: the normalizer
/// owns their defaults, so their absence must not reject the payload.
pub fn builtin_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    for schema in builtin_schemas() {
        registry
            .register(schema)
            .expect("builtin operation names are unique");
    }
    registry
}

fn builtin_schemas() -> Vec<OperationSchema> {
    vec![
        OperationSchema {
            name: "getEvents",
            domain: Domain::Calendar,
            kind: OperationKind::Fetch,
            description: "Fetch user calendar events based on the current date and time. \
                By default it will fetch events for today 00:00 - 23:59. Dates \"from\" and \"to\" \
                should be in the future unless the user explicitly requests otherwise. \"all\" is required.",
            fields: vec![
                FieldSpec::text("from", false, "Datetime from which events should be fetched. Format: YYYY-MM-DD HH:mm:ss. Defaults to the current datetime."),
                FieldSpec::text("to", false, "Datetime events should be fetched to. Format: YYYY-MM-DD HH:mm:ss. Defaults to the end of the \"from\" day."),
                FieldSpec::flag("all", true, "If true, fetch all events, not only upcoming ones. Always defaults to \"false\"."),
            ],
        },
        OperationSchema {
            name: "addEvents",
            domain: Domain::Calendar,
            kind: OperationKind::Create,
            description: "Add a list of user events that include a concise name, from, to, and location.",
            fields: vec![FieldSpec::rows(
                "events",
                vec![
                    FieldSpec::text("name", true, "Meaningful, yet ultra concise event name, created based on the user message."),
                    FieldSpec::text("from", true, "Carefully extracted start datetime for this exact event. Always format exactly as YYYY-MM-DD HH:mm:ss."),
                    FieldSpec::text("to", false, "Carefully extracted end datetime for this exact event. Always format exactly as YYYY-MM-DD HH:mm:ss. Defaults to \"from\" +30m."),
                    FieldSpec::text("location", false, "Location for this exact event. May be empty."),
                ],
                "A complete list of events extracted from the user message.",
            )],
        },
        OperationSchema {
            name: "updateEvents",
            domain: Domain::Calendar,
            kind: OperationKind::Update,
            description: "Update specific calendar events mentioned by the user. May change name, from, to, or location.",
            fields: vec![FieldSpec::rows(
                "events",
                vec![
                    FieldSpec::text("id", false, "Unique event id, extracted by comparing the event mentioned in the user message with the event list in the system message."),
                    FieldSpec::text("name", true, "Meaningful, yet ultra concise event name, created based on the user message."),
                    FieldSpec::text("from", false, "Updated start datetime. Always format exactly as YYYY-MM-DD HH:mm:ss."),
                    FieldSpec::text("to", false, "Updated end datetime. Always format exactly as YYYY-MM-DD HH:mm:ss."),
                    FieldSpec::text("location", false, "Updated location for this exact event."),
                ],
                "A complete list of events that need to be updated, extracted from the user message.",
            )],
        },
        OperationSchema {
            name: "getTasks",
            domain: Domain::Tasks,
            kind: OperationKind::Fetch,
            description: "Fetch user tasks based on the current date and time. \
                By default it will fetch tasks for today 00:00 - 23:59. Dates \"from\" and \"to\" \
                should be in the future unless the user explicitly requests otherwise. \"all\" is required.",
            fields: vec![
                FieldSpec::text("from", false, "Datetime from which tasks should be fetched. Format: YYYY-MM-DD HH:mm:ss."),
                FieldSpec::text("to", false, "Datetime tasks should be fetched to. Format: YYYY-MM-DD HH:mm:ss."),
                FieldSpec::flag("all", true, "If true, fetch all tasks, not only unfinished ones. Always defaults to \"false\"."),
            ],
        },
        OperationSchema {
            name: "addTasks",
            domain: Domain::Tasks,
            kind: OperationKind::Create,
            description: "Add a list of user tasks that include a concise name, project, and datetime.",
            fields: vec![FieldSpec::rows(
                "tasks",
                vec![
                    FieldSpec::text("content", true, "Meaningful, yet ultra concise task name, created based on the user message."),
                    FieldSpec::text("due", true, "Carefully extracted due datetime for this exact task. Always format exactly as YYYY-MM-DD HH:mm:ss."),
                    FieldSpec::text("project", false, PROJECT_DESCRIPTION),
                ],
                "A complete list of tasks extracted from the user message.",
            )],
        },
        OperationSchema {
            name: "updateTasks",
            domain: Domain::Tasks,
            kind: OperationKind::Update,
            description: "Update specific tasks from the todo-list mentioned by the user. \
                May be used to update the task name, project, status, or due datetime.",
            fields: vec![FieldSpec::rows(
                "tasks",
                vec![
                    FieldSpec::text("id", false, "Unique task id, extracted by comparing the task mentioned in the user message with the todo-list in the system message."),
                    FieldSpec::text("content", true, "Meaningful, yet ultra concise, updated task name, merged from the user message and the current todo-list."),
                    FieldSpec::text("due", false, "Carefully extracted due datetime for this exact task. Always format exactly as YYYY-MM-DD HH:mm:ss."),
                    FieldSpec::flag("status", false, "If true, mark the task as completed. If false, mark it as uncompleted. If not present, leave the status unchanged."),
                    FieldSpec::text("project", false, PROJECT_DESCRIPTION),
                ],
                "A complete list of tasks that need to be updated, extracted from the user message.",
            )],
        },
    ]
}
