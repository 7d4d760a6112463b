use crate::entities::*;
use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::*;
use std::sync::Arc;
use validator::Validate;

pub mod api;

#[derive(Debug, PartialEq, Clone, Eq, Hash, Validate)]
pub struct TodoItem {
    id: i32,
    #[validate(length(min = 1, max = 40))]
    description: String,
    completed: bool,
}

impl TodoItem {
    pub fn new(id: i32, description: String, completed: bool) -> Self {
        Self {
            id,
            description,
            completed,
        }
    }

    /// Returns the ID of the todo item.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns whether the item has been completed.
    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn set_description(&mut self, description: String) {
        self.description = description;
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }
}

impl From<todo_item::Model> for TodoItem {
    fn from(model: todo_item::Model) -> Self {
        TodoItem::new(model.id, model.description, model.completed)
    }
}

/// Error type for todo persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoServiceError {
    /// No row exists for the given ID.
    #[error("TodoItem with ID {0} not found")]
    NotFound(i32),
    /// The item breaks a field constraint and was not written.
    #[error("Invalid todo item: {0}")]
    Validation(#[from] validator::ValidationErrors),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Storage primitives the request handlers need.
///
/// Read operations never fail: storage errors are logged and reported as an
/// empty result or a miss.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoRepository {
    /// Returns every item whose `completed` flag equals the argument.
    async fn find_by_completion(&self, completed: bool) -> Vec<TodoItem>;

    /// Returns every item.
    async fn find_all(&self) -> Vec<TodoItem>;

    /// Returns `true` iff a row with the given ID exists.
    async fn exists_by_id(&self, id: i32) -> bool;

    /// Inserts a new incomplete item and returns it with its assigned ID.
    async fn create(&self, description: String) -> Result<TodoItem, TodoServiceError>;

    /// Loads a single item. Callers are expected to check `exists_by_id` first.
    async fn fetch_by_id(&self, id: i32) -> Result<TodoItem, TodoServiceError>;

    /// Writes the mutable fields of an already-loaded item back to storage.
    async fn update(&self, item: &TodoItem) -> Result<(), TodoServiceError>;

    /// Removes the item's row permanently.
    async fn delete(&self, item: &TodoItem) -> Result<(), TodoServiceError>;
}

/// `TodoRepository` backed by the `todo_item` table.
#[derive(Clone, Debug)]
pub struct SeaOrmTodoRepository {
    db: DatabaseConnection,
}

impl SeaOrmTodoRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Prepares the schema at startup.
    ///
    /// With `reset` set, every migration is rolled back and reapplied, which
    /// drops and recreates the `todo_item` table and discards all stored items.
    /// Other tables in the database are left alone. Otherwise only pending
    /// migrations are applied.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_schema(&self, reset: bool) -> Result<(), TodoServiceError> {
        if reset {
            tracing::warn!("Resetting schema: dropping and recreating the todo_item table");
            Migrator::refresh(&self.db).await?;
        } else {
            Migrator::up(&self.db, None).await?;
        }
        tracing::info!("Database schema is ready");
        Ok(())
    }

    async fn find_filtered(&self, filter: Option<bool>) -> Vec<TodoItem> {
        let mut query = todo_item::Entity::find();
        if let Some(completed) = filter {
            query = query.filter(todo_item::Column::Completed.eq(completed));
        }
        match query.all(&self.db).await {
            Ok(models) => models.into_iter().map(TodoItem::from).collect(),
            Err(err) => {
                tracing::warn!("Failed to load todo items: {}", err);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl TodoRepository for SeaOrmTodoRepository {
    #[tracing::instrument(skip(self))]
    async fn find_by_completion(&self, completed: bool) -> Vec<TodoItem> {
        self.find_filtered(Some(completed)).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_all(&self) -> Vec<TodoItem> {
        self.find_filtered(None).await
    }

    #[tracing::instrument(skip(self))]
    async fn exists_by_id(&self, id: i32) -> bool {
        match todo_item::Entity::find_by_id(id).one(&self.db).await {
            Ok(Some(_)) => true,
            Ok(None) => {
                tracing::warn!("TodoItem not found in database");
                false
            }
            Err(err) => {
                tracing::warn!("Failed to look up TodoItem {}: {}", id, err);
                false
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn create(&self, description: String) -> Result<TodoItem, TodoServiceError> {
        TodoItem::new(0, description.clone(), false).validate()?;

        let active_model = todo_item::ActiveModel {
            description: ActiveValue::Set(description),
            completed: ActiveValue::Set(false),
            ..Default::default()
        };
        let created_model = active_model.insert(&self.db).await?;
        Ok(TodoItem::from(created_model))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_by_id(&self, id: i32) -> Result<TodoItem, TodoServiceError> {
        let model = todo_item::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(TodoServiceError::NotFound(id))?;
        Ok(TodoItem::from(model))
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, item: &TodoItem) -> Result<(), TodoServiceError> {
        item.validate()?;

        let active_model = todo_item::ActiveModel {
            id: ActiveValue::Unchanged(item.id),
            description: ActiveValue::Set(item.description.clone()),
            completed: ActiveValue::Set(item.completed),
        };
        match active_model.update(&self.db).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(TodoServiceError::NotFound(item.id)),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, item: &TodoItem) -> Result<(), TodoServiceError> {
        let result = todo_item::Entity::delete_by_id(item.id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(TodoServiceError::NotFound(item.id));
        }
        Ok(())
    }
}

/// Shared state handed to every todo handler.
#[derive(Clone)]
pub struct TodoState {
    pub repository: Arc<dyn TodoRepository + Send + Sync>,
}

impl TodoState {
    pub fn new(repository: Arc<dyn TodoRepository + Send + Sync>) -> Self {
        Self { repository }
    }
}
