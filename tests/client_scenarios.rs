use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use confidence_client::{
    Config, ConfigurationError, ErrorCode, EvaluationContext, EvaluationReason, FlagClient, Region,
    SequentialIdGenerator,
};

#[derive(Default)]
struct Backend {
    color: Option<&'static str>,
    fail: bool,
    delay: Duration,
    resolve_requests: Mutex<Vec<Value>>,
    event_requests: Mutex<Vec<Value>>,
}

async fn resolve(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    backend.resolve_requests.lock().unwrap().push(body);
    tokio::time::sleep(backend.delay).await;

    if backend.fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "boom"})));
    }

    let flag = match backend.color {
        Some(color) => json!({
            "flag": "flags/hawkflag",
            "variant": "flags/hawkflag/variants/treatment",
            "value": { "color": color },
            "flagSchema": { "schema": { "color": { "stringSchema": {} } } },
            "reason": "RESOLVE_REASON_MATCH"
        }),
        None => json!({
            "flag": "flags/hawkflag",
            "variant": "",
            "reason": "RESOLVE_REASON_NO_SEGMENT_MATCH"
        }),
    };

    (
        StatusCode::OK,
        Json(json!({ "resolvedFlags": [flag], "resolveToken": "token" })),
    )
}

async fn publish(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Json<Value> {
    backend.event_requests.lock().unwrap().push(body);
    Json(json!({}))
}

async fn spawn_backend(backend: Backend) -> (String, Arc<Backend>) {
    let backend = Arc::new(backend);
    let app = Router::new()
        .route("/v1/flags:resolve", post(resolve))
        .route("/v1/events:publish", post(publish))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), backend)
}

/// Address nobody listens on.
async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn config_for(url: &str) -> Config {
    Config::new("valid-key", Region::EU)
        .with_resolver_url(url)
        .with_events_url(url)
        .with_resolve_timeout(Duration::from_secs(2))
}

#[tokio::test]
async fn unreachable_backend_serves_default() {
    let url = closed_url().await;
    let root = FlagClient::initialize(config_for(&url)).unwrap();
    let client = root.with_context(EvaluationContext::new().with_targeting_key("uuid-1234"));

    client.track("navigate", HashMap::new());
    let value = client.resolve_string("hawkflag.color", "false").await;

    assert_eq!(value, "false");
    // delivery failure stays inside the publisher
    client.flush().await;
}

#[tokio::test]
async fn live_backend_serves_flag_value() {
    let (url, backend) = spawn_backend(Backend {
        color: Some("blue"),
        ..Backend::default()
    })
    .await;
    let root = FlagClient::initialize(config_for(&url)).unwrap();
    let client = root.with_context(EvaluationContext::new().with_targeting_key("uuid-1234"));

    client.track("navigate", HashMap::new());
    let value = client.resolve_string("hawkflag.color", "false").await;
    assert_eq!(value, "blue");

    let requests = backend.resolve_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["clientSecret"], "valid-key");
    assert_eq!(requests[0]["flags"], json!(["flags/hawkflag"]));
    assert_eq!(requests[0]["evaluationContext"]["targeting_key"], "uuid-1234");
}

#[tokio::test]
async fn tracked_events_reach_the_events_endpoint() {
    let (url, backend) = spawn_backend(Backend {
        color: Some("blue"),
        ..Backend::default()
    })
    .await;
    let root = FlagClient::initialize(config_for(&url)).unwrap();
    let client = root.with_context(EvaluationContext::new().with_targeting_key("uuid-1234"));

    client.track("navigate", HashMap::new());
    client.flush().await;

    let requests = backend.event_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["clientSecret"], "valid-key");
    assert_eq!(requests[0]["events"][0]["eventDefinition"], "eventDefinitions/navigate");
    assert_eq!(requests[0]["events"][0]["payload"]["targeting_key"], "uuid-1234");
}

#[tokio::test]
async fn server_error_serves_default_with_details() {
    let (url, _backend) = spawn_backend(Backend {
        fail: true,
        ..Backend::default()
    })
    .await;
    let client = FlagClient::initialize(config_for(&url)).unwrap();

    let details = client.get_flag("hawkflag.color", "false".to_string()).await;
    assert_eq!(details.value, "false");
    assert_eq!(details.reason, EvaluationReason::Error);
    assert_eq!(details.error_code, Some(ErrorCode::General));
}

#[tokio::test]
async fn no_segment_match_serves_default_without_error() {
    let (url, _backend) = spawn_backend(Backend::default()).await;
    let client = FlagClient::initialize(config_for(&url)).unwrap();

    let details = client.get_flag("hawkflag.color", "false".to_string()).await;
    assert_eq!(details.value, "false");
    assert_eq!(details.reason, EvaluationReason::Default);
    assert_eq!(details.error_code, None);
}

#[tokio::test]
async fn repeated_resolution_is_stable() {
    let (url, _backend) = spawn_backend(Backend {
        color: Some("blue"),
        ..Backend::default()
    })
    .await;
    let ids = SequentialIdGenerator::new("uuid");
    let client = FlagClient::initialize(config_for(&url))
        .unwrap()
        .with_context(EvaluationContext::generated(&ids));

    let first = client.resolve_string("hawkflag.color", "false").await;
    let second = client.resolve_string("hawkflag.color", "false").await;
    assert_eq!(first, "blue");
    assert_eq!(first, second);
    assert_eq!(client.context().targeting_key(), Some("uuid-1"));
}

#[tokio::test]
async fn explicit_timeout_can_exceed_configured_one() {
    let (url, _backend) = spawn_backend(Backend {
        color: Some("blue"),
        delay: Duration::from_millis(300),
        ..Backend::default()
    })
    .await;
    let config = config_for(&url).with_resolve_timeout(Duration::from_millis(100));
    let client = FlagClient::initialize(config).unwrap();

    assert_eq!(client.resolve_string("hawkflag.color", "false").await, "false");
    assert_eq!(
        client
            .resolve_string_with_timeout("hawkflag.color", "false", Duration::from_secs(3))
            .await,
        "blue"
    );
}

#[tokio::test]
async fn environment_config_drives_the_client() {
    let (url, _backend) = spawn_backend(Backend {
        color: Some("green"),
        ..Backend::default()
    })
    .await;
    let vars: HashMap<&str, String> = [
        ("CONFIDENCE_CLIENT_SECRET", "valid-key".to_string()),
        ("CONFIDENCE_REGION", "eu".to_string()),
        ("CONFIDENCE_RESOLVER_URL", url.clone()),
        ("CONFIDENCE_EVENTS_URL", url.clone()),
    ]
    .into_iter()
    .collect();

    let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();
    let client = FlagClient::initialize(config).unwrap();

    assert_eq!(client.resolve_string("hawkflag.color", "false").await, "green");
}

#[tokio::test]
async fn empty_credential_is_rejected() {
    let result = FlagClient::initialize(Config::new("", Region::EU));
    assert!(matches!(result, Err(ConfigurationError::MissingCredential)));
}
