//! End-to-end onboarding: registration on the users service publishes an
//! event that the tasks service turns into the onboarding task.

mod support;

use std::time::Duration;

use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use serde_json::{Value, json};
use taskboard::domain::ports::CacheKey;
use taskboard::domain::{ONBOARDING_TASK_DESCRIPTION, ONBOARDING_TASK_TITLE, UserId};
use taskboard::inbound::http::tasks::CACHE_STATUS_HEADER;
use taskboard::outbound::queue::InMemoryEventChannel;
use taskboard::server::{build_tasks_app, build_users_app};
use user_events::UserRegisteredEvent;

use support::{FIRST_USER_ID, TasksHarness, UNREACHABLE_TASKS_URL, fixed_now, health, users_state};

fn registration(email: &str) -> Value {
    json!({"username": "ada", "email": email, "password": "s3cret"})
}

fn cache_status(response: &ServiceResponse) -> Option<&str> {
    response
        .headers()
        .get(CACHE_STATUS_HEADER)
        .and_then(|value| value.to_str().ok())
}

fn event_body(user_id: i32) -> Vec<u8> {
    UserRegisteredEvent::new(user_id, "someone@example.com", fixed_now())
        .encode()
        .expect("encode event")
}

#[actix_web::test]
async fn registered_user_receives_onboarding_task() {
    let channel = InMemoryEventChannel::new();
    let tasks = TasksHarness::start(channel.clone());
    let users_app = actix_test::init_service(build_users_app(
        health(),
        users_state(&channel, UNREACHABLE_TASKS_URL, Duration::from_secs(1)),
    ))
    .await;
    let tasks_app =
        actix_test::init_service(build_tasks_app(health(), tasks.state.clone())).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/users/register")
        .set_json(registration("ada@example.com"))
        .to_request();
    let user: Value = actix_test::call_and_read_body_json(&users_app, request).await;
    assert_eq!(user["id"], FIRST_USER_ID);
    assert_eq!(user["email"], "ada@example.com");
    assert!(user.get("passwordHash").is_none());

    tasks.wait_for_acks(1).await;

    let request = actix_test::TestRequest::get()
        .uri(&format!("/api/v1/tasks/user/{FIRST_USER_ID}"))
        .to_request();
    let response = actix_test::call_service(&tasks_app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    let list = body.as_array().expect("task array");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["title"], ONBOARDING_TASK_TITLE);
    assert_eq!(list[0]["description"], ONBOARDING_TASK_DESCRIPTION);
    assert_eq!(list[0]["isCompleted"], false);
    assert_eq!(list[0]["userId"], FIRST_USER_ID);

    tasks.stop().await;
}

#[actix_web::test]
async fn consumer_write_invalidates_cached_list() {
    let tasks = TasksHarness::start(InMemoryEventChannel::new());
    let app = actix_test::init_service(build_tasks_app(health(), tasks.state.clone())).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/tasks")
        .set_json(json!({"userId": 7, "title": "Existing"}))
        .to_request();
    assert_eq!(
        actix_test::call_service(&app, request).await.status(),
        StatusCode::OK
    );

    for expected in ["MISS", "HIT"] {
        let request = actix_test::TestRequest::get()
            .uri("/api/v1/tasks/user/7")
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(cache_status(&response), Some(expected));
    }
    let key = CacheKey::tasks_for_user(UserId::new(7).expect("id"));
    assert!(tasks.cache.contains(&key));

    tasks.channel.publish_raw(event_body(7));
    tasks.wait_for_acks(1).await;
    assert!(!tasks.cache.contains(&key));

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/tasks/user/7")
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(cache_status(&response), Some("MISS"));
    let body: Value = actix_test::read_body_json(response).await;
    let titles: Vec<&str> = body
        .as_array()
        .expect("task array")
        .iter()
        .filter_map(|task| task["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Existing", ONBOARDING_TASK_TITLE]);

    tasks.stop().await;
}

#[actix_web::test]
async fn malformed_message_does_not_block_the_next_one() {
    let tasks = TasksHarness::start(InMemoryEventChannel::new());
    tasks.channel.publish_raw(b"{not json".to_vec());
    tasks.channel.publish_raw(event_body(5));

    tasks.wait_for_acks(2).await;
    assert_eq!(tasks.channel.pending(), 0);
    assert_eq!(tasks.channel.requeued_count(), 0);

    let app = actix_test::init_service(build_tasks_app(health(), tasks.state.clone())).await;
    let request = actix_test::TestRequest::get()
        .uri("/api/v1/tasks/user/5")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    tasks.stop().await;
}

#[actix_web::test]
async fn registration_succeeds_when_broker_is_down() {
    let channel = InMemoryEventChannel::new();
    channel.set_unavailable(true);
    let app = actix_test::init_service(build_users_app(
        health(),
        users_state(&channel, UNREACHABLE_TASKS_URL, Duration::from_secs(1)),
    ))
    .await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/users/register")
        .set_json(registration("grace@example.com"))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(channel.published_count(), 0);

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/users/login")
        .set_json(json!({"email": "grace@example.com", "password": "s3cret"}))
        .to_request();
    let user: Value = actix_test::call_and_read_body_json(&app, request).await;
    assert_eq!(user["id"], FIRST_USER_ID);
}

#[actix_web::test]
async fn duplicate_email_is_rejected_without_publishing() {
    let channel = InMemoryEventChannel::new();
    let app = actix_test::init_service(build_users_app(
        health(),
        users_state(&channel, UNREACHABLE_TASKS_URL, Duration::from_secs(1)),
    ))
    .await;

    for expected in [StatusCode::OK, StatusCode::BAD_REQUEST] {
        let request = actix_test::TestRequest::post()
            .uri("/api/v1/users/register")
            .set_json(registration("ada@example.com"))
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), expected);
        if expected == StatusCode::BAD_REQUEST {
            let body: Value = actix_test::read_body_json(response).await;
            assert_eq!(body["code"], "invalid_request");
            assert_eq!(body["details"]["code"], "email_taken");
        }
    }
    assert_eq!(channel.published_count(), 1);
}

#[actix_web::test]
async fn wrong_password_is_unauthorised() {
    let channel = InMemoryEventChannel::new();
    let app = actix_test::init_service(build_users_app(
        health(),
        users_state(&channel, UNREACHABLE_TASKS_URL, Duration::from_secs(1)),
    ))
    .await;
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/users/register")
        .set_json(registration("ada@example.com"))
        .to_request();
    actix_test::call_service(&app, request).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/users/login")
        .set_json(json!({"email": "ada@example.com", "password": "wrong"}))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
