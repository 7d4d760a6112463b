use crate::todo::{TodoItem, TodoServiceError, TodoState};
use axum::{
    Form, Router,
    extract::{Path, State, rejection::FormRejection},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

const RECORD_NOT_FOUND: &str = "Record Not Found";
const INVALID_DESCRIPTION: &str = "Invalid Description";
const STORAGE_FAILURE: &str = "Could Not Save Record";

/// JSON representation of a TodoItem for API responses.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct TodoItemJson {
    pub id: i32,
    pub description: String,
    pub completed: bool,
}

impl From<TodoItem> for TodoItemJson {
    fn from(item: TodoItem) -> Self {
        Self {
            id: item.id(),
            description: item.description().to_string(),
            completed: item.completed(),
        }
    }
}

/// Raw `key=value` pairs of a form body, in the order they were sent.
type FormFields = Result<Form<Vec<(String, String)>>, FormRejection>;

/// Unwraps the form body. A body that cannot be read as a form counts as one
/// with no fields.
fn read_fields(fields: FormFields) -> Vec<(String, String)> {
    match fields {
        Ok(Form(fields)) => fields,
        Err(rejection) => {
            tracing::info!("Treating unreadable form body as empty: {}", rejection);
            Vec::new()
        }
    }
}

/// First value sent for `key`, or an empty string when the key is absent.
fn form_value(fields: &[(String, String)], key: &str) -> String {
    fields
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

/// Form fields accepted by `POST /todo`.
#[derive(Debug, Default)]
pub struct CreateTodoForm {
    description: String,
}

impl From<FormFields> for CreateTodoForm {
    fn from(fields: FormFields) -> Self {
        let fields = read_fields(fields);
        Self {
            description: form_value(&fields, "description"),
        }
    }
}

/// Form fields accepted by `POST /todo/{id}`. Empty fields are left untouched.
#[derive(Debug, Default)]
pub struct UpdateTodoForm {
    completed: String,
    description: String,
}

impl From<FormFields> for UpdateTodoForm {
    fn from(fields: FormFields) -> Self {
        let fields = read_fields(fields);
        Self {
            completed: form_value(&fields, "completed"),
            description: form_value(&fields, "description"),
        }
    }
}

/// Body returned by `POST /todo`.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreateTodoResponse {
    Created(TodoItemJson),
    Rejected { created: bool, error: String },
}

impl CreateTodoResponse {
    fn rejected(error: &str) -> Self {
        Self::Rejected {
            created: false,
            error: error.to_string(),
        }
    }
}

/// Body returned by `POST /todo/{id}`.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateTodoResponse {
    pub updated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateTodoResponse {
    fn updated() -> Self {
        Self {
            updated: true,
            error: None,
        }
    }

    fn failed(error: Option<&str>) -> Self {
        Self {
            updated: false,
            error: error.map(str::to_string),
        }
    }
}

/// Body returned by `DELETE /todo/{id}`.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct DeleteTodoResponse {
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeleteTodoResponse {
    fn deleted() -> Self {
        Self {
            deleted: true,
            error: None,
        }
    }

    fn failed(error: &str) -> Self {
        Self {
            deleted: false,
            error: Some(error.to_string()),
        }
    }
}

/// Parses a boolean the way form clients send them: `1`, `t`, `true`, `0`, `f`,
/// `false` and their upper/title case spellings.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parses the `{id}` path segment. Anything that is not an integer becomes 0,
/// which never matches a stored row.
fn parse_id(raw: &str) -> i32 {
    raw.parse().unwrap_or_default()
}

/// Handler for GET /incomplete.
#[tracing::instrument(skip(state))]
pub async fn get_incomplete_items_handler(
    State(state): State<TodoState>,
) -> Json<Vec<TodoItemJson>> {
    tracing::info!("Get Incomplete TodoItems");
    let items = state.repository.find_by_completion(false).await;
    Json(items.into_iter().map(TodoItemJson::from).collect())
}

/// Handler for GET /complete.
#[tracing::instrument(skip(state))]
pub async fn get_complete_items_handler(State(state): State<TodoState>) -> Json<Vec<TodoItemJson>> {
    tracing::info!("Get Completed TodoItems");
    let items = state.repository.find_by_completion(true).await;
    Json(items.into_iter().map(TodoItemJson::from).collect())
}

/// Handler for GET /all.
#[tracing::instrument(skip(state))]
pub async fn get_all_items_handler(State(state): State<TodoState>) -> Json<Vec<TodoItemJson>> {
    tracing::info!("Get All TodoItems");
    let items = state.repository.find_all().await;
    Json(items.into_iter().map(TodoItemJson::from).collect())
}

/// Handler for POST /todo.
#[tracing::instrument(skip(state))]
pub async fn create_item_handler(
    State(state): State<TodoState>,
    fields: FormFields,
) -> Json<CreateTodoResponse> {
    let form = CreateTodoForm::from(fields);
    tracing::info!(
        description = %form.description,
        "Add a new TodoItem. Saving to database."
    );
    match state.repository.create(form.description).await {
        Ok(item) => Json(CreateTodoResponse::Created(TodoItemJson::from(item))),
        Err(TodoServiceError::Validation(errs)) => {
            tracing::info!("Rejected new TodoItem: {}", errs);
            Json(CreateTodoResponse::rejected(INVALID_DESCRIPTION))
        }
        Err(err) => {
            tracing::error!("Failed to create TodoItem: {}", err);
            Json(CreateTodoResponse::rejected(STORAGE_FAILURE))
        }
    }
}

/// Handler for POST /todo/{id}.
#[tracing::instrument(skip(state))]
pub async fn update_item_handler(
    State(state): State<TodoState>,
    Path(raw_id): Path<String>,
    fields: FormFields,
) -> Json<UpdateTodoResponse> {
    let form = UpdateTodoForm::from(fields);
    let id = parse_id(&raw_id);
    if !state.repository.exists_by_id(id).await {
        return Json(UpdateTodoResponse::failed(Some(RECORD_NOT_FOUND)));
    }

    let mut item = match state.repository.fetch_by_id(id).await {
        Ok(item) => item,
        Err(TodoServiceError::NotFound(_)) => {
            return Json(UpdateTodoResponse::failed(Some(RECORD_NOT_FOUND)));
        }
        Err(err) => {
            tracing::error!("Failed to load TodoItem {}: {}", id, err);
            return Json(UpdateTodoResponse::failed(Some(STORAGE_FAILURE)));
        }
    };

    if !form.completed.is_empty() {
        match parse_bool(&form.completed) {
            Some(completed) => item.set_completed(completed),
            None => tracing::info!("Ignoring invalid completed value {:?}", form.completed),
        }
    }
    if !form.description.is_empty() {
        item.set_description(form.description.clone());
    }

    tracing::info!(
        id,
        completed = item.completed(),
        description = item.description(),
        "Updating TodoItem"
    );
    match state.repository.update(&item).await {
        Ok(()) => Json(UpdateTodoResponse::updated()),
        Err(TodoServiceError::Validation(errs)) => {
            tracing::info!("Discarded update of TodoItem {}: {}", id, errs);
            Json(UpdateTodoResponse::failed(None))
        }
        Err(TodoServiceError::NotFound(_)) => {
            Json(UpdateTodoResponse::failed(Some(RECORD_NOT_FOUND)))
        }
        Err(err) => {
            tracing::error!("Failed to update TodoItem {}: {}", id, err);
            Json(UpdateTodoResponse::failed(Some(STORAGE_FAILURE)))
        }
    }
}

/// Handler for DELETE /todo/{id}.
#[tracing::instrument(skip(state))]
pub async fn delete_item_handler(
    State(state): State<TodoState>,
    Path(raw_id): Path<String>,
) -> Json<DeleteTodoResponse> {
    let id = parse_id(&raw_id);
    if !state.repository.exists_by_id(id).await {
        return Json(DeleteTodoResponse::failed(RECORD_NOT_FOUND));
    }

    tracing::info!(id, "Deleting TodoItem");
    let result = match state.repository.fetch_by_id(id).await {
        Ok(item) => state.repository.delete(&item).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => Json(DeleteTodoResponse::deleted()),
        Err(TodoServiceError::NotFound(_)) => Json(DeleteTodoResponse::failed(RECORD_NOT_FOUND)),
        Err(err) => {
            tracing::error!("Failed to delete TodoItem {}: {}", id, err);
            Json(DeleteTodoResponse::failed(STORAGE_FAILURE))
        }
    }
}

/// Creates and returns the router for the todo item endpoints.
pub fn create_todo_router(state: TodoState) -> Router {
    Router::new()
        .route("/incomplete", get(get_incomplete_items_handler))
        .route("/complete", get(get_complete_items_handler))
        .route("/all", get(get_all_items_handler))
        .route("/todo", post(create_item_handler))
        .route(
            "/todo/{id}",
            post(update_item_handler).delete(delete_item_handler),
        )
        .with_state(state)
}
