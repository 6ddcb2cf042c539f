//! Tasks service handlers.
//!
//! ```text
//! GET  /api/v1/tasks/user/{userId}   -> [TaskItem], X-Cache: HIT|MISS
//! POST /api/v1/tasks {"userId":42,"title":"Water plants"}
//! GET  /api/v1/tasks
//! ```

use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, NewTask, TaskItem, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::TasksHttpState;
use crate::inbound::http::validation::{map_task_validation_error, map_user_validation_error};

/// Response header reporting whether a task read was served from cache.
pub const CACHE_STATUS_HEADER: &str = "X-Cache";

/// Task creation body: a task without its store-assigned `id`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub user_id: i32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
}

/// Read a user's tasks through the cache.
#[get("/tasks/user/{user_id}")]
pub async fn tasks_for_user(
    state: web::Data<TasksHttpState>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let raw = path.into_inner();
    // No task can belong to a non-positive id.
    let user_id = UserId::new(raw)
        .map_err(|_| Error::not_found(format!("No tasks found for UserId: {raw}")))?;
    let list = state.query.tasks_for_user(user_id).await?;
    let cache_status = if list.cache_hit { "HIT" } else { "MISS" };
    Ok(HttpResponse::Ok()
        .insert_header((CACHE_STATUS_HEADER, cache_status))
        .json(list.tasks))
}

/// Create a task and invalidate its owner's cached list.
#[post("/tasks")]
pub async fn create_task(
    state: web::Data<TasksHttpState>,
    payload: web::Json<CreateTaskRequest>,
) -> ApiResult<web::Json<TaskItem>> {
    let CreateTaskRequest {
        user_id,
        title,
        description,
        is_completed,
        created_date,
    } = payload.into_inner();
    let user_id = UserId::new(user_id).map_err(map_user_validation_error)?;
    let created_date = created_date.unwrap_or_else(|| state.clock.utc());
    let task = NewTask::new(user_id, title.unwrap_or_default(), created_date)
        .map_err(map_task_validation_error)?
        .with_description(description)
        .with_completed(is_completed.unwrap_or(false));
    let created = state.command.create(task).await?;
    Ok(web::Json(created))
}

/// List every task, bypassing the cache.
#[get("/tasks")]
pub async fn list_tasks(state: web::Data<TasksHttpState>) -> ApiResult<web::Json<Vec<TaskItem>>> {
    Ok(web::Json(state.query.all_tasks().await?))
}

#[cfg(test)]
mod tests {
    //! Handler tests for the tasks endpoints against mocked driving ports.
    use super::*;
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::{Value, json};

    use crate::domain::ports::{MockTaskCommand, MockTasksQuery, UserTaskList};
    use crate::inbound::http::json_config;
    use crate::test_support::onboarding::MutableClock;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
            .single()
            .expect("valid time")
    }

    fn item(id: i32, owner: i32) -> TaskItem {
        NewTask::new(UserId::new(owner).expect("id"), format!("task {id}"), fixed_now())
            .expect("valid task")
            .into_item(id)
    }

    async fn call(
        query: MockTasksQuery,
        command: MockTaskCommand,
        req: actix_test::TestRequest,
    ) -> actix_web::dev::ServiceResponse {
        let state = web::Data::new(TasksHttpState {
            query: Arc::new(query),
            command: Arc::new(command),
            clock: Arc::new(MutableClock::new(fixed_now())),
        });
        let app = actix_test::init_service(
            App::new()
                .app_data(state)
                .app_data(json_config())
                .service(tasks_for_user)
                .service(create_task)
                .service(list_tasks),
        )
        .await;
        actix_test::call_service(&app, req.to_request()).await
    }

    #[rstest]
    #[case(true, "HIT")]
    #[case(false, "MISS")]
    #[actix_web::test]
    async fn read_reports_cache_status(#[case] cache_hit: bool, #[case] header: &str) {
        let mut query = MockTasksQuery::new();
        query.expect_tasks_for_user().returning(move |_| {
            Ok(UserTaskList {
                tasks: vec![item(1, 42)],
                cache_hit,
            })
        });
        let res = call(
            query,
            MockTaskCommand::new(),
            actix_test::TestRequest::get().uri("/tasks/user/42"),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()
                .get(CACHE_STATUS_HEADER)
                .and_then(|v| v.to_str().ok()),
            Some(header)
        );
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body[0]["userId"], 42);
        assert_eq!(body[0]["createdDate"], "2024-05-01T09:00:00Z");
    }

    #[rstest]
    #[case("/tasks/user/0")]
    #[case("/tasks/user/-5")]
    #[actix_web::test]
    async fn read_of_non_positive_id_is_404(#[case] uri: &str) {
        let mut query = MockTasksQuery::new();
        query.expect_tasks_for_user().never();
        let res = call(
            query,
            MockTaskCommand::new(),
            actix_test::TestRequest::get().uri(uri),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["code"], "not_found");
    }

    #[actix_web::test]
    async fn read_of_unknown_user_is_404() {
        let mut query = MockTasksQuery::new();
        query
            .expect_tasks_for_user()
            .returning(|id| Err(Error::not_found(format!("No tasks found for UserId: {id}"))));
        let res = call(
            query,
            MockTaskCommand::new(),
            actix_test::TestRequest::get().uri("/tasks/user/999"),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn create_fills_defaults_from_clock() {
        let mut command = MockTaskCommand::new();
        command
            .expect_create()
            .withf(|task| {
                task.created_date() == fixed_now()
                    && !task.is_completed()
                    && task.description() == Some("daily")
            })
            .times(1)
            .returning(|task| Ok(task.into_item(7)));
        let res = call(
            MockTasksQuery::new(),
            command,
            actix_test::TestRequest::post()
                .uri("/tasks")
                .set_json(json!({"userId": 42, "title": "Water plants", "description": "daily"})),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["id"], 7);
        assert_eq!(body["title"], "Water plants");
    }

    #[rstest]
    #[case(json!({"userId": 0, "title": "x"}), "userId")]
    #[case(json!({"userId": -3, "title": "x"}), "userId")]
    #[case(json!({"userId": 5, "title": "  "}), "title")]
    #[case(json!({"userId": 5}), "title")]
    #[actix_web::test]
    async fn create_rejects_invalid_input(#[case] payload: Value, #[case] field: &str) {
        let mut command = MockTaskCommand::new();
        command.expect_create().never();
        let res = call(
            MockTasksQuery::new(),
            command,
            actix_test::TestRequest::post().uri("/tasks").set_json(payload),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["details"]["field"], field);
    }

    #[actix_web::test]
    async fn list_returns_all_tasks() {
        let mut query = MockTasksQuery::new();
        query
            .expect_all_tasks()
            .returning(|| Ok(vec![item(1, 1), item(2, 2)]));
        let res = call(
            query,
            MockTaskCommand::new(),
            actix_test::TestRequest::get().uri("/tasks"),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Vec<TaskItem> = actix_test::read_body_json(res).await;
        assert_eq!(body.len(), 2);
    }
}
