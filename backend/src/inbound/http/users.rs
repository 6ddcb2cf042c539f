//! Users service handlers.
//!
//! ```text
//! POST /api/v1/users/register {"username":"ada","email":"ada@example.com","password":"pw"}
//! POST /api/v1/users/login {"email":"ada@example.com","password":"pw"}
//! GET  /api/v1/users/{userId}/tasks
//! ```

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::ports::UserTasks;
use crate::domain::{Error, LoginCredentials, Registration, User, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::UsersHttpState;
use crate::inbound::http::validation::map_user_validation_error;

/// Registration request body.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Register a user and announce the registration.
///
/// A duplicate email is rejected with 400 before anything is written or
/// published.
#[post("/users/register")]
pub async fn register(
    state: web::Data<UsersHttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<web::Json<User>> {
    let RegisterRequest {
        username,
        email,
        password,
    } = payload.into_inner();
    let registration = Registration::try_from_parts(&username, &email, &password)
        .map_err(map_user_validation_error)?;
    let user = state.registration.register(&registration).await?;
    Ok(web::Json(user))
}

/// Check credentials and return the user view.
#[post("/users/login")]
pub async fn login(
    state: web::Data<UsersHttpState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<User>> {
    let credentials = LoginCredentials::try_from_parts(&payload.email, &payload.password)
        .map_err(map_user_validation_error)?;
    let user = state.login.authenticate(&credentials).await?;
    Ok(web::Json(user))
}

/// Return a user together with the task list held by the tasks service.
#[get("/users/{user_id}/tasks")]
pub async fn user_tasks(
    state: web::Data<UsersHttpState>,
    path: web::Path<i32>,
) -> ApiResult<web::Json<UserTasks>> {
    let user_id =
        UserId::new(path.into_inner()).map_err(|_| Error::not_found("User not found"))?;
    let result = state.user_tasks.tasks_for_user(user_id).await?;
    Ok(web::Json(result))
}
