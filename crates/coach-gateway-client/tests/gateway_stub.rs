use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use coach_client_core::{
    FeedbackRequest, MemoryStore, NudgeRequest, PlanRequest, ScheduleEventKind, SettingsPatch,
};
use coach_gateway_client::{
    GatewayClient, GatewayError, RequestExecutor, RequestOptions, ScheduleResult,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
struct RecordedCall {
    path: String,
    body: Value,
    content_type: Option<String>,
    trace_id: Option<String>,
}

#[derive(Clone, Default)]
struct StubState {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

struct GatewayStub {
    base_url: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl GatewayStub {
    async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn spawn_gateway_stub() -> Result<GatewayStub> {
    let state = StubState::default();
    let calls = state.calls.clone();
    let app = Router::new()
        .route("/health", get(|| async { Json(json!({"ok": true})) }))
        .route("/plan/today", post(plan_today))
        .route("/schedule/commit", post(schedule_commit))
        .route("/nudge/send", post(nudge_send))
        .route("/feedback", post(feedback))
        .route("/echo", post(echo))
        .route("/validation", post(validation_error))
        .route(
            "/plain-error",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "diet agent exploded") }),
        )
        .route(
            "/empty-error",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        )
        .route("/empty-ok", get(|| async { StatusCode::NO_CONTENT }))
        .route("/slow", get(slow))
        .with_state(state);
    serve(app, calls).await
}

async fn serve(app: Router, calls: Arc<Mutex<Vec<RecordedCall>>>) -> Result<GatewayStub> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        let _ = server.await;
    });

    Ok(GatewayStub {
        base_url: format!("http://{addr}"),
        calls,
        shutdown: Some(shutdown_tx),
    })
}

async fn record(state: &StubState, path: &str, headers: &HeaderMap, body: Value) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
    };
    state.calls.lock().await.push(RecordedCall {
        path: path.to_string(),
        body,
        content_type: header("content-type"),
        trace_id: header("x-trace-id"),
    });
}

async fn plan_today(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    record(&state, "/plan/today", &headers, body).await;
    Json(json!({"meals": [], "workouts": []}))
}

async fn schedule_commit(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let events = body.get("events").cloned().unwrap_or_else(|| json!([]));
    record(&state, "/schedule/commit", &headers, body).await;
    Json(json!({"scheduled": events, "message": "committed"}))
}

async fn nudge_send(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    record(&state, "/nudge/send", &headers, body).await;
    Json(json!({"message": "Small steps count.", "notification_id": "n-7", "medium": "push"}))
}

async fn feedback(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    record(&state, "/feedback", &headers, body.clone()).await;
    Json(json!({"ok": true, "received": body}))
}

async fn echo(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    record(&state, "/echo", &headers, body.clone()).await;
    Json(body)
}

async fn validation_error() -> impl IntoResponse {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({"detail": [{"loc": ["body", "age"], "msg": "must be positive"}]})),
    )
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    Json(json!({"ok": true}))
}

fn client_for(base_url: &str) -> Result<GatewayClient> {
    let client = GatewayClient::new(Arc::new(MemoryStore::new()));
    client.settings().save(
        SettingsPatch::default()
            .gateway_url(format!("{base_url}/"))
            .user_id("tester"),
    )?;
    Ok(client)
}

#[tokio::test]
async fn plan_today_returns_and_caches_the_gateway_plan() -> Result<()> {
    let stub = spawn_gateway_stub().await?;
    let client = client_for(&stub.base_url)?;

    let request: PlanRequest = serde_json::from_value(json!({
        "profile": {"age": 24, "sex": "M", "height_cm": 178, "weight_kg": 78, "activity": "moderate"},
        "goal": {"type": "fat_loss", "deficit_kcal": 400},
        "equipment": ["dumbbells"],
    }))?;
    let plan = client.plan_today(&request).await?;

    assert_eq!(plan, json!({"meals": [], "workouts": []}));
    assert_eq!(client.cache().cached_plan(), Some(plan));

    let calls = stub.calls().await;
    assert_eq!(calls.len(), 1);
    let body = &calls[0].body;
    assert_eq!(body["user_id"], "tester");
    assert_eq!(body["profile"]["age"], 24);
    assert_eq!(body["profile"]["height_cm"].as_f64(), Some(178.0));
    assert_eq!(body["profile"]["activity"], "moderate");
    assert_eq!(body["goal"], json!({"type": "fat_loss", "deficit_kcal": 400}));
    assert_eq!(body["equipment"], json!(["dumbbells"]));
    assert_eq!(calls[0].content_type.as_deref(), Some("application/json"));

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn plan_today_sends_empty_equipment_when_absent() -> Result<()> {
    let stub = spawn_gateway_stub().await?;
    let client = client_for(&stub.base_url)?;

    client.plan_today(&PlanRequest::default()).await?;

    let calls = stub.calls().await;
    assert_eq!(calls[0].body["equipment"], json!([]));

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn schedule_from_cache_commits_and_caches_events() -> Result<()> {
    let stub = spawn_gateway_stub().await?;
    let client = client_for(&stub.base_url)?;
    client.cache().cache_plan(&json!({
        "meals": [{"name": "Greek yogurt bowl"}],
        "workouts": [{"name": "Dumbbell circuit"}],
    }))?;

    let response = client
        .schedule_from_cache("08:00, 13:00", Some("18:00"))
        .await?;
    assert_eq!(client.cache().cached_schedule(), Some(response.clone()));

    let result = ScheduleResult::from_value(&response);
    let titles = result
        .events
        .iter()
        .map(|event| event.display_title().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        titles,
        vec!["Greek yogurt bowl", "Greek yogurt bowl", "Dumbbell circuit"]
    );
    assert_eq!(result.message.as_deref(), Some("committed"));

    let calls = stub.calls().await;
    let sent = &calls[0].body;
    assert_eq!(sent["user_id"], "tester");
    assert_eq!(sent["events"][2]["type"], "workout");
    let when = sent["events"][2]["when"].as_str().unwrap_or_default();
    assert!(when.ends_with("T18:00:00"), "unexpected timestamp {when}");
    assert_eq!(
        serde_json::from_value::<ScheduleEventKind>(sent["events"][0]["type"].clone())?,
        ScheduleEventKind::Meal
    );

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn nudge_response_is_decoded_through_aliases() -> Result<()> {
    let stub = spawn_gateway_stub().await?;
    let client = client_for(&stub.base_url)?;

    let nudge = client
        .send_nudge(&NudgeRequest {
            tone: "coach".to_string(),
            goal: "stay_consistent".to_string(),
        })
        .await?;

    assert_eq!(nudge.text, "Small steps count.");
    assert_eq!(nudge.id.as_deref(), Some("n-7"));
    assert_eq!(nudge.channel.as_deref(), Some("push"));
    let calls = stub.calls().await;
    assert_eq!(
        calls[0].body,
        json!({"user_id": "tester", "tone": "coach", "goal": "stay_consistent"})
    );

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn feedback_normalizes_fields_and_drops_empty_bandit_arm() -> Result<()> {
    let stub = spawn_gateway_stub().await?;
    let client = client_for(&stub.base_url)?;

    client
        .submit_feedback(&FeedbackRequest {
            event_id: " evt-1 ".to_string(),
            rating: 11,
            reason: String::new(),
            bandit_arm: Some(String::new()),
        })
        .await?;
    client
        .submit_feedback(&FeedbackRequest {
            event_id: "evt-2".to_string(),
            rating: 2,
            reason: "too hard".to_string(),
            bandit_arm: Some("arm_b".to_string()),
        })
        .await?;

    let calls = stub.calls().await;
    assert_eq!(
        calls[0].body,
        json!({"user_id": "tester", "event_id": "evt-1", "rating": 5, "reason": "ok"})
    );
    assert_eq!(calls[1].body["bandit_arm"], "arm_b");
    assert_eq!(calls[1].body["rating"], 2);

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn validation_errors_surface_as_one_message() -> Result<()> {
    let stub = spawn_gateway_stub().await?;
    let client = client_for(&stub.base_url)?;

    let error = match client
        .fetch_json("/validation", RequestOptions::post(json!({"age": -1})))
        .await
    {
        Ok(value) => panic!("expected validation failure, got {value}"),
        Err(error) => error,
    };
    assert_eq!(error.to_string(), "body.age: must be positive");
    assert_eq!(error.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn non_json_and_empty_error_bodies_still_produce_messages() -> Result<()> {
    let stub = spawn_gateway_stub().await?;
    let client = client_for(&stub.base_url)?;

    let plain = client
        .fetch_json("/plain-error", RequestOptions::get())
        .await
        .err()
        .map(|error| error.to_string());
    assert_eq!(plain.as_deref(), Some("diet agent exploded"));

    let empty = client
        .fetch_json("/empty-error", RequestOptions::get())
        .await
        .err()
        .map(|error| error.to_string());
    assert_eq!(empty.as_deref(), Some("Service Unavailable"));

    let ok = client.fetch_json("/empty-ok", RequestOptions::get()).await?;
    assert_eq!(ok, json!({}));

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn caller_headers_are_merged_with_json_content_type() -> Result<()> {
    let stub = spawn_gateway_stub().await?;
    let client = client_for(&stub.base_url)?;

    let echoed = client
        .fetch_json(
            "echo",
            RequestOptions::post(json!({"hello": "gateway"})).with_header("x-trace-id", "trace-1"),
        )
        .await?;
    assert_eq!(echoed, json!({"hello": "gateway"}));

    let calls = stub.calls().await;
    assert_eq!(calls[0].path, "/echo");
    assert_eq!(calls[0].trace_id.as_deref(), Some("trace-1"));
    assert_eq!(calls[0].content_type.as_deref(), Some("application/json"));

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn slow_gateway_hits_the_configured_timeout() -> Result<()> {
    let stub = spawn_gateway_stub().await?;
    let client = client_for(&stub.base_url)?;

    let started = Instant::now();
    let result = client
        .fetch_json(
            "/slow",
            RequestOptions::get().with_timeout(Duration::from_millis(200)),
        )
        .await;
    let elapsed = started.elapsed();

    let error = match result {
        Ok(value) => panic!("expected timeout, got {value}"),
        Err(error) => error,
    };
    assert!(error.is_timeout());
    assert!(error.to_string().contains("200ms"), "{error}");
    assert!(elapsed < Duration::from_millis(1_000), "took {elapsed:?}");

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn executor_default_timeout_applies_when_request_sets_none() -> Result<()> {
    let stub = spawn_gateway_stub().await?;
    let client = client_for(&stub.base_url)?
        .with_executor(RequestExecutor::new().with_default_timeout(Duration::from_millis(150)));

    let error = client.fetch_json("/slow", RequestOptions::get()).await.err();
    assert!(matches!(error, Some(GatewayError::Timeout { timeout_ms: 150 })));

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn cancellation_token_aborts_in_flight_request() -> Result<()> {
    let stub = spawn_gateway_stub().await?;
    let client = client_for(&stub.base_url)?;
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let error = client
        .fetch_json("/slow", RequestOptions::get().with_cancel(cancel))
        .await
        .err();
    assert!(matches!(error, Some(GatewayError::Cancelled)));

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn ping_reports_health_document() -> Result<()> {
    let stub = spawn_gateway_stub().await?;
    let client = client_for(&stub.base_url)?;

    let status = client.ping().await;
    assert!(status.ok);
    assert_eq!(status.data, Some(json!({"ok": true})));
    assert_eq!(status.error, None);

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn ping_falls_back_to_root_status() -> Result<()> {
    let app = Router::new()
        .route(
            "/health",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "down") }),
        )
        .route("/", get(|| async { StatusCode::NOT_FOUND }));
    let stub = serve(app, Arc::default()).await?;
    let client = client_for(&stub.base_url)?;

    let status = client.ping().await;
    assert!(!status.ok);
    assert_eq!(status.error.as_deref(), Some("Status 404"));

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn ping_probes_root_when_health_document_is_null() -> Result<()> {
    let app = Router::new()
        .route("/health", get(|| async { Json(Value::Null) }))
        .route("/", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }));
    let stub = serve(app, Arc::default()).await?;
    let client = client_for(&stub.base_url)?;

    let status = client.ping().await;
    assert!(!status.ok);
    assert_eq!(status.error.as_deref(), Some("Status 503"));

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn ping_accepts_root_when_health_is_missing() -> Result<()> {
    let app = Router::new().route("/", get(|| async { "gateway" }));
    let stub = serve(app, Arc::default()).await?;
    let client = client_for(&stub.base_url)?;

    let status = client.ping().await;
    assert!(status.ok);
    assert_eq!(status.data, None);

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn ping_against_unreachable_host_resolves_with_error() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let client = client_for(&format!("http://{addr}"))?;
    let status = client.ping().await;

    assert!(!status.ok);
    let error = status.error.unwrap_or_default();
    assert!(!error.trim().is_empty());

    Ok(())
}

#[tokio::test]
async fn ping_failsafe_bounds_a_hanging_gateway() -> Result<()> {
    let app = Router::new().route("/health", get(slow)).route("/", get(slow));
    let stub = serve(app, Arc::default()).await?;
    let client = client_for(&stub.base_url)?.with_ping_failsafe(Duration::from_millis(200));

    let started = Instant::now();
    let status = client.ping().await;
    assert!(!status.ok);
    assert!(started.elapsed() < Duration::from_millis(1_000));
    assert_eq!(status.error.as_deref(), Some("Ping timeout"));

    stub.stop().await;
    Ok(())
}
