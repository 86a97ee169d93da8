use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{ModelError, ValidationError};
use crate::models::{EventPatch, KnownEntity, NewEvent, NewTask, Project, TaskPatch};
use crate::schema::{Domain, OperationKind, OperationSchema, SchemaRegistry};
use crate::service::model::{ModelClient, ModelRequest};
use crate::service::resolver::{self, Resolution};
use crate::service::temporal::{self, TemporalWindow};

/// A fully typed, validated operation call, ready for dispatch.
#[derive(Debug, Clone, Serialize)]
pub enum OperationCall {
    FetchEvents { window: TemporalWindow },
    CreateEvents { events: Vec<NewEvent> },
    UpdateEvents { events: Vec<EventPatch> },
    FetchTasks { window: TemporalWindow },
    CreateTasks { tasks: Vec<NewTask> },
    UpdateTasks { tasks: Vec<TaskPatch> },
}

impl OperationCall {
    pub fn operation_name(&self) -> &'static str {
        match self {
            OperationCall::FetchEvents { .. } => "getEvents",
            OperationCall::CreateEvents { .. } => "addEvents",
            OperationCall::UpdateEvents { .. } => "updateEvents",
            OperationCall::FetchTasks { .. } => "getTasks",
            OperationCall::CreateTasks { .. } => "addTasks",
            OperationCall::UpdateTasks { .. } => "updateTasks",
        }
    }
}

/// A row the router removed from the payload, with the reason recorded so
/// the caller can tell the user exactly what was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    pub index: usize,
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RejectReason {
    /// The model declined to select, or selected an unregistered name.
    NoOperationSelected,
    ModelFailure(String),
    Cancelled,
    Validation(ValidationError),
    /// Every row failed validation or resolution; see the dropped rows.
    NoValidRows,
}

/// Terminal output of the router. `Dispatchable` carries the typed call
/// plus any rows dropped along the way; `Rejected` carries the attempted
/// operation and the reason. Retries are a caller concern.
#[derive(Debug, Clone, Serialize)]
pub enum RoutingDecision {
    Dispatchable {
        call: OperationCall,
        dropped: Vec<DroppedRow>,
    },
    Rejected {
        operation: Option<String>,
        reason: RejectReason,
        dropped: Vec<DroppedRow>,
    },
}

impl RoutingDecision {
    fn rejected(operation: Option<String>, reason: RejectReason) -> Self {
        RoutingDecision::Rejected {
            operation,
            reason,
            dropped: Vec::new(),
        }
    }

    pub fn is_dispatchable(&self) -> bool {
        matches!(self, RoutingDecision::Dispatchable { .. })
    }
}

/// Renders the snapshot into the system-message block the extraction
/// prompt was designed around: `- Buy milk (ID: 789)` lines inside a
/// quoted section.
pub fn render_snapshot(domain: Domain, snapshot: &[KnownEntity]) -> String {
    let label = match domain {
        Domain::Calendar => "calendar",
        Domain::Tasks => "todo-list",
    };
    let mut rendered = format!("{label}\"\"\"\n");
    for entity in snapshot {
        rendered.push_str(&format!("- {} (ID: {})\n", entity.text, entity.id));
    }
    rendered.push_str("\"\"\"");
    rendered
}

/// Routes one utterance to exactly one validated operation call.
///
/// The model performs the free-text understanding; the router only defines
/// the contract around it. It validates the raw payload against the
/// registered schema, re-normalizes every datetime (model timestamps are
/// never trusted verbatim), and resolves update rows against the snapshot.
pub struct IntentRouter {
    registry: Arc<SchemaRegistry>,
    model: Arc<dyn ModelClient>,
}

impl IntentRouter {
    pub fn new(registry: Arc<SchemaRegistry>, model: Arc<dyn ModelClient>) -> Self {
        Self { registry, model }
    }

    pub async fn route(
        &self,
        utterance: &str,
        reference: NaiveDateTime,
        domain: Domain,
        snapshot: &[KnownEntity],
    ) -> RoutingDecision {
        let request = ModelRequest {
            reference,
            domain,
            utterance: utterance.to_string(),
            schemas: self.registry.schemas_for(domain).to_vec(),
            snapshot_text: if snapshot.is_empty() {
                None
            } else {
                Some(render_snapshot(domain, snapshot))
            },
        };

        let selection = match self.model.select_operation(&request).await {
            Ok(Some(selection)) => selection,
            Ok(None) => {
                return RoutingDecision::rejected(None, RejectReason::NoOperationSelected)
            }
            Err(ModelError::Cancelled) => {
                return RoutingDecision::rejected(None, RejectReason::Cancelled)
            }
            Err(err) => {
                return RoutingDecision::rejected(None, RejectReason::ModelFailure(err.to_string()))
            }
        };

        let Some(schema) = self.registry.get(domain, &selection.name) else {
            warn!(operation = %selection.name, %domain, "model selected an unregistered operation");
            return RoutingDecision::rejected(
                Some(selection.name),
                RejectReason::NoOperationSelected,
            );
        };
        debug!(operation = schema.name, %domain, "schema selected");

        let Some(args) = selection.arguments.as_object() else {
            return RoutingDecision::rejected(
                Some(schema.name.to_string()),
                RejectReason::Validation(ValidationError::new(
                    "arguments",
                    "expected an object payload",
                )),
            );
        };

        match schema.kind {
            OperationKind::Fetch => route_fetch(schema, args, reference, domain),
            OperationKind::Create => route_create(schema, args, reference, domain),
            OperationKind::Update => route_update(schema, args, reference, domain, snapshot),
        }
    }
}

fn route_fetch(
    schema: &OperationSchema,
    args: &Map<String, Value>,
    reference: NaiveDateTime,
    domain: Domain,
) -> RoutingDecision {
    let operation = Some(schema.name.to_string());

    let include_all = match args.get("all") {
        Some(Value::Bool(flag)) => *flag,
        Some(_) => {
            return RoutingDecision::rejected(
                operation,
                RejectReason::Validation(ValidationError::new("all", "expected a boolean")),
            )
        }
        None => {
            return RoutingDecision::rejected(
                operation,
                RejectReason::Validation(ValidationError::new("all", "required field is missing")),
            )
        }
    };

    let from = match optional_str(args, "from") {
        Ok(value) => value,
        Err(error) => {
            return RoutingDecision::rejected(operation, RejectReason::Validation(error))
        }
    };
    let to = match optional_str(args, "to") {
        Ok(value) => value,
        Err(error) => {
            return RoutingDecision::rejected(operation, RejectReason::Validation(error))
        }
    };

    // Fetching everything is the explicit signal that looking back is fine.
    let window = match temporal::normalize_window(from, to, include_all, reference, include_all) {
        Ok(window) => window,
        Err(error) => {
            return RoutingDecision::rejected(operation, RejectReason::Validation(error))
        }
    };

    let call = match domain {
        Domain::Calendar => OperationCall::FetchEvents { window },
        Domain::Tasks => OperationCall::FetchTasks { window },
    };
    RoutingDecision::Dispatchable {
        call,
        dropped: Vec::new(),
    }
}

fn route_create(
    schema: &OperationSchema,
    args: &Map<String, Value>,
    reference: NaiveDateTime,
    domain: Domain,
) -> RoutingDecision {
    let rows = match extract_rows(schema, args) {
        Ok(rows) => rows,
        Err(decision) => return decision,
    };

    let mut dropped = Vec::new();
    match domain {
        Domain::Calendar => {
            let mut events = Vec::new();
            for (index, row) in rows.iter().enumerate() {
                match build_new_event(schema, row, index, reference) {
                    Ok(event) => events.push(event),
                    Err(drop) => record_drop(&mut dropped, drop),
                }
            }
            let empty = events.is_empty();
            finish_rows(schema, OperationCall::CreateEvents { events }, empty, dropped)
        }
        Domain::Tasks => {
            let mut tasks = Vec::new();
            for (index, row) in rows.iter().enumerate() {
                match build_new_task(schema, row, index, reference) {
                    Ok(task) => tasks.push(task),
                    Err(drop) => record_drop(&mut dropped, drop),
                }
            }
            let empty = tasks.is_empty();
            finish_rows(schema, OperationCall::CreateTasks { tasks }, empty, dropped)
        }
    }
}

fn route_update(
    schema: &OperationSchema,
    args: &Map<String, Value>,
    reference: NaiveDateTime,
    domain: Domain,
    snapshot: &[KnownEntity],
) -> RoutingDecision {
    let rows = match extract_rows(schema, args) {
        Ok(rows) => rows,
        Err(decision) => return decision,
    };

    let mut dropped = Vec::new();
    match domain {
        Domain::Calendar => {
            let mut events = Vec::new();
            for (index, row) in rows.iter().enumerate() {
                match build_event_patch(schema, row, index, reference, snapshot) {
                    Ok(patch) => events.push(patch),
                    Err(drop) => record_drop(&mut dropped, drop),
                }
            }
            let empty = events.is_empty();
            finish_rows(schema, OperationCall::UpdateEvents { events }, empty, dropped)
        }
        Domain::Tasks => {
            let mut tasks = Vec::new();
            for (index, row) in rows.iter().enumerate() {
                match build_task_patch(schema, row, index, reference, snapshot) {
                    Ok(patch) => tasks.push(patch),
                    Err(drop) => record_drop(&mut dropped, drop),
                }
            }
            let empty = tasks.is_empty();
            finish_rows(schema, OperationCall::UpdateTasks { tasks }, empty, dropped)
        }
    }
}

fn extract_rows<'a>(
    schema: &OperationSchema,
    args: &'a Map<String, Value>,
) -> Result<&'a [Value], RoutingDecision> {
    let field = schema.rows_field().unwrap_or("rows");
    match args.get(field) {
        Some(Value::Array(rows)) => Ok(rows.as_slice()),
        Some(_) => Err(RoutingDecision::rejected(
            Some(schema.name.to_string()),
            RejectReason::Validation(ValidationError::new(field, "expected an array")),
        )),
        None => Err(RoutingDecision::rejected(
            Some(schema.name.to_string()),
            RejectReason::Validation(ValidationError::new(field, "required field is missing")),
        )),
    }
}

fn finish_rows(
    schema: &OperationSchema,
    call: OperationCall,
    empty: bool,
    dropped: Vec<DroppedRow>,
) -> RoutingDecision {
    if empty {
        return RoutingDecision::Rejected {
            operation: Some(schema.name.to_string()),
            reason: RejectReason::NoValidRows,
            dropped,
        };
    }
    RoutingDecision::Dispatchable { call, dropped }
}

fn record_drop(dropped: &mut Vec<DroppedRow>, drop: DroppedRow) {
    warn!(index = drop.index, path = %drop.path, reason = %drop.reason, "dropping row");
    dropped.push(drop);
}

struct RowContext<'a> {
    rows_field: &'static str,
    index: usize,
    row: &'a Value,
}

impl<'a> RowContext<'a> {
    fn new(schema: &OperationSchema, row: &'a Value, index: usize) -> Self {
        Self {
            rows_field: schema.rows_field().unwrap_or("rows"),
            index,
            row,
        }
    }

    fn drop_row(&self, field: &str, reason: impl Into<String>) -> DroppedRow {
        let path = if field.is_empty() {
            format!("{}[{}]", self.rows_field, self.index)
        } else {
            format!("{}[{}].{}", self.rows_field, self.index, field)
        };
        DroppedRow {
            index: self.index,
            path,
            reason: reason.into(),
        }
    }

    fn object(&self) -> Result<&'a Map<String, Value>, DroppedRow> {
        self.row
            .as_object()
            .ok_or_else(|| self.drop_row("", "expected an object"))
    }

    fn required_str(
        &self,
        obj: &'a Map<String, Value>,
        field: &str,
    ) -> Result<&'a str, DroppedRow> {
        match obj.get(field) {
            Some(Value::String(value)) if !value.trim().is_empty() => Ok(value),
            Some(Value::String(_)) => Err(self.drop_row(field, "required field is empty")),
            Some(_) => Err(self.drop_row(field, "expected a string")),
            None => Err(self.drop_row(field, "required field is missing")),
        }
    }

    fn optional_str(
        &self,
        obj: &'a Map<String, Value>,
        field: &str,
    ) -> Result<Option<&'a str>, DroppedRow> {
        match obj.get(field) {
            Some(Value::String(value)) if !value.trim().is_empty() => Ok(Some(value)),
            Some(Value::String(_)) | Some(Value::Null) | None => Ok(None),
            Some(_) => Err(self.drop_row(field, "expected a string")),
        }
    }

    fn normalize(
        &self,
        field: &str,
        expression: &str,
        reference: NaiveDateTime,
    ) -> Result<NaiveDateTime, DroppedRow> {
        temporal::normalize(expression, reference, false)
            .map_err(|e| self.drop_row(field, e.to_string()))
    }
}

fn build_new_event(
    schema: &OperationSchema,
    row: &Value,
    index: usize,
    reference: NaiveDateTime,
) -> Result<NewEvent, DroppedRow> {
    let ctx = RowContext::new(schema, row, index);
    let obj = ctx.object()?;
    let name = ctx.required_str(obj, "name")?.to_string();
    let from_raw = ctx.required_str(obj, "from")?;
    let from = ctx.normalize("from", from_raw, reference)?;
    let to = match ctx.optional_str(obj, "to")? {
        Some(raw) => ctx.normalize("to", raw, reference)?,
        None => temporal::default_event_end(from),
    };
    if to < from {
        return Err(ctx.drop_row("to", "'to' precedes 'from'"));
    }
    let location = ctx.optional_str(obj, "location")?.unwrap_or("").to_string();
    Ok(NewEvent {
        name,
        from,
        to,
        location,
    })
}

fn build_new_task(
    schema: &OperationSchema,
    row: &Value,
    index: usize,
    reference: NaiveDateTime,
) -> Result<NewTask, DroppedRow> {
    let ctx = RowContext::new(schema, row, index);
    let obj = ctx.object()?;
    let content = ctx.required_str(obj, "content")?.to_string();
    let due_raw = ctx.required_str(obj, "due")?;
    let due = ctx.normalize("due", due_raw, reference)?;
    let project = match ctx.optional_str(obj, "project")? {
        Some(raw) => raw
            .parse::<Project>()
            .map_err(|e| ctx.drop_row("project", e))?,
        None => Project::default(),
    };
    Ok(NewTask {
        content,
        due,
        project,
    })
}

fn build_event_patch(
    schema: &OperationSchema,
    row: &Value,
    index: usize,
    reference: NaiveDateTime,
    snapshot: &[KnownEntity],
) -> Result<EventPatch, DroppedRow> {
    let ctx = RowContext::new(schema, row, index);
    let obj = ctx.object()?;
    let name = ctx.required_str(obj, "name")?.to_string();
    let id = resolve_row_id(&ctx, obj, &name, snapshot)?;
    let from = match ctx.optional_str(obj, "from")? {
        Some(raw) => Some(ctx.normalize("from", raw, reference)?),
        None => None,
    };
    let to = match ctx.optional_str(obj, "to")? {
        Some(raw) => Some(ctx.normalize("to", raw, reference)?),
        None => None,
    };
    let location = ctx.optional_str(obj, "location")?.map(str::to_string);
    Ok(EventPatch {
        id,
        name: Some(name),
        from,
        to,
        location,
    })
}

fn build_task_patch(
    schema: &OperationSchema,
    row: &Value,
    index: usize,
    reference: NaiveDateTime,
    snapshot: &[KnownEntity],
) -> Result<TaskPatch, DroppedRow> {
    let ctx = RowContext::new(schema, row, index);
    let obj = ctx.object()?;
    let content = ctx.required_str(obj, "content")?.to_string();
    let id = resolve_row_id(&ctx, obj, &content, snapshot)?;
    let due = match ctx.optional_str(obj, "due")? {
        Some(raw) => Some(ctx.normalize("due", raw, reference)?),
        None => None,
    };
    let project = match ctx.optional_str(obj, "project")? {
        Some(raw) => Some(
            raw.parse::<Project>()
                .map_err(|e| ctx.drop_row("project", e))?,
        ),
        None => None,
    };
    let status = match obj.get("status") {
        Some(Value::Bool(flag)) => Some(*flag),
        Some(Value::Null) | None => None,
        Some(_) => return Err(ctx.drop_row("status", "expected a boolean")),
    };
    Ok(TaskPatch {
        id,
        content: Some(content),
        due,
        project,
        status,
    })
}

/// Accepts the model's id only when the snapshot contains it; otherwise
/// falls back to resolving the row's display text. Ids never come from
/// anywhere but the snapshot.
fn resolve_row_id(
    ctx: &RowContext<'_>,
    obj: &Map<String, Value>,
    mention: &str,
    snapshot: &[KnownEntity],
) -> Result<String, DroppedRow> {
    if let Some(id) = ctx.optional_str(obj, "id")? {
        if resolver::contains_id(id, snapshot) {
            return Ok(id.to_string());
        }
        debug!(id, "model-supplied id not in snapshot, resolving by text");
    }
    match resolver::resolve(mention, snapshot) {
        Resolution::Match { id, .. } => Ok(id),
        Resolution::Ambiguous { candidates } => {
            let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
            Err(ctx.drop_row(
                "id",
                format!(
                    "ambiguous reference '{}' (candidates: {})",
                    mention,
                    ids.join(", ")
                ),
            ))
        }
        Resolution::NotFound => Err(ctx.drop_row(
            "id",
            format!("no entity in the snapshot matches '{mention}'"),
        )),
    }
}

fn optional_str<'a>(
    args: &'a Map<String, Value>,
    field: &str,
) -> Result<Option<&'a str>, ValidationError> {
    match args.get(field) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(Some(value)),
        Some(Value::String(_)) | Some(Value::Null) | None => Ok(None),
        Some(_) => Err(ValidationError::new(field, "expected a string")),
    }
}
