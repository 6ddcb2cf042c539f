//! `GET /users/{id}/tasks` against a tasks service on a real socket.
//!
//! The users app runs in-process; the tasks side is either the real tasks
//! server or a stub that fails or stalls on purpose.

mod support;

use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use actix_web::dev::{Server, ServerHandle, Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use serde_json::{Value, json};
use taskboard::domain::{ONBOARDING_TASK_TITLE, TRACE_ID_HEADER};
use taskboard::outbound::queue::InMemoryEventChannel;
use taskboard::server::{ServerConfig, build_users_app, create_tasks_server};

use support::{FIRST_USER_ID, TasksHarness, UNREACHABLE_TASKS_URL, health, users_state};

fn ephemeral_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("listener address");
    (listener, addr)
}

fn base_url(addr: SocketAddr) -> String {
    format!("http://{addr}/api/v1")
}

fn spawn_server(server: Server) -> ServerHandle {
    let handle = server.handle();
    actix_web::rt::spawn(server);
    handle
}

/// A tasks endpoint stand-in answering every read with `respond`.
fn spawn_stub<F, Fut>(respond: F) -> (ServerHandle, SocketAddr)
where
    F: Fn() -> Fut + Clone + Send + 'static,
    Fut: std::future::Future<Output = HttpResponse> + 'static,
{
    let (listener, addr) = ephemeral_listener();
    let server = HttpServer::new(move || {
        let respond = respond.clone();
        App::new().route(
            "/api/v1/tasks/user/{user_id}",
            web::get().to(move || respond()),
        )
    })
    .workers(1)
    .listen(listener)
    .expect("stub listens")
    .run();
    (spawn_server(server), addr)
}

async fn register<S>(app: &S)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/users/register")
        .set_json(json!({"username": "ada", "email": "ada@example.com", "password": "s3cret"}))
        .to_request();
    let response = actix_test::call_service(app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

async fn aggregate<S>(app: &S, user_id: i32) -> ServiceResponse
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let request = actix_test::TestRequest::get()
        .uri(&format!("/api/v1/users/{user_id}/tasks"))
        .to_request();
    actix_test::call_service(app, request).await
}

#[actix_web::test]
async fn aggregates_user_with_onboarding_task() {
    let channel = InMemoryEventChannel::new();
    let tasks = TasksHarness::start(channel.clone());
    let (listener, addr) = ephemeral_listener();
    let tasks_server = create_tasks_server(
        health(),
        tasks.state.get_ref().clone(),
        ServerConfig::from_listener(listener),
    )
    .expect("tasks server starts");
    let tasks_handle = spawn_server(tasks_server);

    let app = actix_test::init_service(build_users_app(
        health(),
        users_state(&channel, &base_url(addr), Duration::from_secs(5)),
    ))
    .await;
    register(&app).await;
    tasks.wait_for_acks(1).await;

    let response = aggregate(&app, FIRST_USER_ID).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["user"]["id"], FIRST_USER_ID);
    assert_eq!(body["user"]["username"], "ada");
    assert_eq!(body["tasks"][0]["title"], ONBOARDING_TASK_TITLE);
    assert_eq!(body["tasks"][0]["userId"], FIRST_USER_ID);

    tasks_handle.stop(true).await;
    tasks.stop().await;
}

#[actix_web::test]
async fn remote_not_found_propagates() {
    // The tasks service never sees this channel, so the user has no tasks.
    let tasks = TasksHarness::start(InMemoryEventChannel::new());
    let (listener, addr) = ephemeral_listener();
    let tasks_server = create_tasks_server(
        health(),
        tasks.state.get_ref().clone(),
        ServerConfig::from_listener(listener),
    )
    .expect("tasks server starts");
    let tasks_handle = spawn_server(tasks_server);

    let users_channel = InMemoryEventChannel::new();
    let app = actix_test::init_service(build_users_app(
        health(),
        users_state(&users_channel, &base_url(addr), Duration::from_secs(5)),
    ))
    .await;
    register(&app).await;

    let response = aggregate(&app, FIRST_USER_ID).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["details"]["upstreamStatus"], 404);

    tasks_handle.stop(true).await;
    tasks.stop().await;
}

#[actix_web::test]
async fn remote_server_error_propagates() {
    let (stub, addr) = spawn_stub(|| async { HttpResponse::InternalServerError().body("boom") });
    let channel = InMemoryEventChannel::new();
    let app = actix_test::init_service(build_users_app(
        health(),
        users_state(&channel, &base_url(addr), Duration::from_secs(5)),
    ))
    .await;
    register(&app).await;

    let response = aggregate(&app, FIRST_USER_ID).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["code"], "upstream_failure");

    stub.stop(true).await;
}

#[actix_web::test]
async fn slow_remote_times_out() {
    let (stub, addr) = spawn_stub(|| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        HttpResponse::Ok().json(json!([]))
    });
    let channel = InMemoryEventChannel::new();
    let app = actix_test::init_service(build_users_app(
        health(),
        users_state(&channel, &base_url(addr), Duration::from_millis(100)),
    ))
    .await;
    register(&app).await;

    let response = aggregate(&app, FIRST_USER_ID).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

    stub.stop(false).await;
}

#[actix_web::test]
async fn unknown_local_user_skips_remote_call() {
    let channel = InMemoryEventChannel::new();
    let app = actix_test::init_service(build_users_app(
        health(),
        users_state(&channel, UNREACHABLE_TASKS_URL, Duration::from_secs(1)),
    ))
    .await;

    let response = aggregate(&app, 777).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["message"], "User not found");
}

#[actix_web::test]
async fn non_positive_user_id_is_not_found() {
    let channel = InMemoryEventChannel::new();
    let app = actix_test::init_service(build_users_app(
        health(),
        users_state(&channel, UNREACHABLE_TASKS_URL, Duration::from_secs(1)),
    ))
    .await;

    let response = aggregate(&app, 0).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["message"], "User not found");
}

#[actix_web::test]
async fn unreachable_tasks_service_is_bad_gateway() {
    let channel = InMemoryEventChannel::new();
    let app = actix_test::init_service(build_users_app(
        health(),
        users_state(&channel, UNREACHABLE_TASKS_URL, Duration::from_secs(1)),
    ))
    .await;
    register(&app).await;

    let response = aggregate(&app, FIRST_USER_ID).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[actix_web::test]
async fn trace_id_is_forwarded_to_tasks_service() {
    let (listener, addr) = ephemeral_listener();
    let server = HttpServer::new(|| {
        App::new().route(
            "/api/v1/tasks/user/{user_id}",
            web::get().to(|req: HttpRequest| async move {
                let seen = req
                    .headers()
                    .get(TRACE_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned);
                HttpResponse::Ok().json(json!([{ "seenTraceId": seen }]))
            }),
        )
    })
    .workers(1)
    .listen(listener)
    .expect("stub listens")
    .run();
    let stub = spawn_server(server);

    let channel = InMemoryEventChannel::new();
    let app = actix_test::init_service(build_users_app(
        health(),
        users_state(&channel, &base_url(addr), Duration::from_secs(5)),
    ))
    .await;
    register(&app).await;

    let trace_id = "00000000-0000-0000-0000-0000000000aa";
    let request = actix_test::TestRequest::get()
        .uri(&format!("/api/v1/users/{FIRST_USER_ID}/tasks"))
        .insert_header((TRACE_ID_HEADER, trace_id))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok()),
        Some(trace_id)
    );
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["tasks"][0]["seenTraceId"], trace_id);

    stub.stop(true).await;
}

#[actix_web::test]
async fn tasks_server_answers_over_http() {
    let tasks = TasksHarness::start(InMemoryEventChannel::new());
    let (listener, addr) = ephemeral_listener();
    let health_state = health();
    let tasks_server = create_tasks_server(
        health_state.clone(),
        tasks.state.get_ref().clone(),
        ServerConfig::from_listener(listener),
    )
    .expect("tasks server starts");
    assert!(health_state.is_ready());
    let tasks_handle = spawn_server(tasks_server);

    let client = awc::Client::default();
    let mut response = client
        .post(format!("{}/tasks", base_url(addr)))
        .send_json(&json!({"userId": 11, "title": "Over the wire"}))
        .await
        .expect("create request");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(TRACE_ID_HEADER));
    let created: Value = response.json().await.expect("created body");
    assert_eq!(created["userId"], 11);

    let mut response = client
        .get(format!("{}/tasks/user/11", base_url(addr)))
        .send()
        .await
        .expect("read request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("read body");
    assert_eq!(body[0]["title"], "Over the wire");

    tasks_handle.stop(true).await;
    tasks.stop().await;
}
