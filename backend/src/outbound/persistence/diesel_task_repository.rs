//! PostgreSQL-backed `TaskRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{TaskRepository, TaskRepositoryError};
use crate::domain::{NewTask, TaskItem, UserId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{NewTaskRow, TaskRow};
use super::pool::{DbPool, PoolError};
use super::schema::tasks;

/// Diesel-backed implementation of the task repository port.
#[derive(Clone)]
pub struct DieselTaskRepository {
    pool: DbPool,
}

impl DieselTaskRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> TaskRepositoryError {
    map_basic_pool_error(error, TaskRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> TaskRepositoryError {
    map_basic_diesel_error(
        error,
        TaskRepositoryError::query,
        TaskRepositoryError::connection,
    )
}

fn row_to_task(row: TaskRow) -> Result<TaskItem, TaskRepositoryError> {
    let user_id =
        UserId::new(row.user_id).map_err(|err| TaskRepositoryError::query(err.to_string()))?;
    Ok(TaskItem {
        id: row.id,
        created_date: row.created_date,
        title: row.title,
        description: row.description,
        is_completed: row.is_completed,
        user_id,
    })
}

fn rows_to_tasks(rows: Vec<TaskRow>) -> Result<Vec<TaskItem>, TaskRepositoryError> {
    rows.into_iter().map(row_to_task).collect()
}

#[async_trait]
impl TaskRepository for DieselTaskRepository {
    async fn create(&self, task: &NewTask) -> Result<TaskItem, TaskRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = NewTaskRow {
            created_date: task.created_date(),
            title: task.title(),
            description: task.description(),
            is_completed: task.is_completed(),
            user_id: task.user_id().get(),
        };

        let inserted: TaskRow = diesel::insert_into(tasks::table)
            .values(&row)
            .returning(TaskRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        row_to_task(inserted)
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<TaskItem>, TaskRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<TaskRow> = tasks::table
            .filter(tasks::user_id.eq(user_id.get()))
            .order((tasks::created_date.asc(), tasks::id.asc()))
            .select(TaskRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows_to_tasks(rows)
    }

    async fn list_all(&self) -> Result<Vec<TaskItem>, TaskRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<TaskRow> = tasks::table
            .order((tasks::created_date.asc(), tasks::id.asc()))
            .select(TaskRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows_to_tasks(rows)
    }
}
