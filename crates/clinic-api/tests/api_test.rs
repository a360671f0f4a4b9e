//! Integration tests for the REST router.
//!
//! Drives the router in-process through tower's `oneshot`, without a TCP
//! listener.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode},
};
use clinic_core::{
  compute::ComputationRegistry,
  memory::MemoryStore,
  sample::StoredSample,
  schema::parse_json,
  store::SampleStore,
};
use serde_json::{Value, json};
use tower::ServiceExt; // for oneshot()

fn app() -> (Router, MemoryStore) {
  let schema = json!({
    "static": {
      "age": { "data_type": "int", "min_value": 0, "max_value": 120 },
      "smoker": { "data_type": "binary" },
      "n_steps": { "data_type": "int", "computation": "timestep_count" }
    },
    "temporal": {
      "time_index": { "data_type": "time_index", "time_index_type": "int" },
      "dose": { "data_type": "float", "default_value": 2.5, "timestep_default_mode": "take_previous" }
    },
    "event": {
      "label": { "data_type": "categorical", "options": ["fall", "fever"] }
    }
  });
  let defs = parse_json(&schema.to_string(), &ComputationRegistry::with_builtins()).unwrap();
  let store = MemoryStore::new();
  let router = clinic_api::api_router(Arc::new(store.clone()), Arc::new(defs));
  (router, store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let request = Request::builder().method(method).uri(uri);
  let request = match body {
    Some(b) => request
      .header("content-type", "application/json")
      .body(Body::from(b.to_string()))
      .unwrap(),
    None => request.body(Body::empty()).unwrap(),
  };

  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn time_indexes(body: &Value) -> Vec<i64> {
  body["sample"]["temporal"]
    .as_array()
    .unwrap()
    .iter()
    .map(|step| step["time_index"].as_i64().unwrap())
    .collect()
}

async fn create(app: &Router, key: &str) -> Value {
  let (status, body) = send(app, "POST", "/samples", Some(json!({ "key": key }))).await;
  assert_eq!(status, StatusCode::CREATED);
  body
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn schema_lists_fields_in_declaration_order() {
  let (app, _) = app();
  let (status, body) = send(&app, "GET", "/schema", None).await;

  assert_eq!(status, StatusCode::OK);
  let names: Vec<&str> = body["static"].as_object().unwrap().keys().map(String::as_str).collect();
  assert_eq!(names, ["age", "smoker", "n_steps"]);
  assert_eq!(body["temporal"]["time_index"]["data_type"], "int");
  assert_eq!(body["temporal"]["time_index"]["is_time_index"], true);
  assert_eq!(body["static"]["n_steps"]["computation"], "timestep_count");
}

// ─── Samples ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_returns_defaults() {
  let (app, store) = app();
  let body = create(&app, "p1").await;

  assert_eq!(body["key"], "p1");
  assert_eq!(body["current_timestep"], 0);
  assert_eq!(body["sample"]["static"], json!({ "age": 0, "smoker": false, "n_steps": 1 }));
  assert_eq!(body["sample"]["temporal"], json!([{ "time_index": 0, "dose": 2.5 }]));
  assert_eq!(body["sample"]["event"], json!([{ "label": "fall" }]));
  assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn create_without_key_generates_one() {
  let (app, _) = app();
  let (status, body) = send(&app, "POST", "/samples", Some(json!({}))).await;

  assert_eq!(status, StatusCode::CREATED);
  let key = body["key"].as_str().unwrap();
  assert!(uuid::Uuid::parse_str(key).is_ok(), "{key}");
}

#[tokio::test]
async fn create_rejects_duplicates_and_blank_keys() {
  let (app, _) = app();
  create(&app, "p1").await;

  let (status, _) = send(&app, "POST", "/samples", Some(json!({ "key": "p1" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = send(&app, "POST", "/samples", Some(json!({ "key": "  " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_and_get() {
  let (app, _) = app();
  create(&app, "b").await;
  create(&app, "a").await;

  let (status, body) = send(&app, "GET", "/samples", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["keys"], json!(["a", "b"]));

  let (status, body) = send(&app, "GET", "/samples/a", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["key"], "a");

  let (status, body) = send(&app, "GET", "/samples/zzz", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("zzz"));
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
  let (app, store) = app();
  create(&app, "p1").await;

  let (status, _) = send(&app, "DELETE", "/samples/p1", None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  assert!(store.is_empty());

  let (status, _) = send(&app, "GET", "/samples/p1", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreadable_sample_can_still_be_deleted() {
  let (app, store) = app();
  let record = StoredSample::from_json(
    r#"{"static":{"age":"old"},"temporal":[{"time_index":0,"dose":1.0}],"event":[]}"#,
  )
  .unwrap();
  store.put("bad", record).await.unwrap();

  let (status, _) = send(&app, "GET", "/samples/bad", None).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

  let (status, _) = send(&app, "DELETE", "/samples/bad", None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  assert!(store.get("bad").await.unwrap().is_none());

  let (status, _) = send(&app, "DELETE", "/samples/bad", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_static_validates_input() {
  let (app, _) = app();
  create(&app, "p1").await;

  let (status, body) =
    send(&app, "PUT", "/samples/p1/static", Some(json!({ "age": 130 }))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["feature"], "age");

  let (status, body) =
    send(&app, "PUT", "/samples/p1/static", Some(json!({ "n_steps": 4 }))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["feature"], "n_steps");

  let (status, body) =
    send(&app, "PUT", "/samples/p1/static", Some(json!({ "age": 64, "smoker": true }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["sample"]["static"]["age"], 64);
  assert_eq!(body["sample"]["static"]["smoker"], true);

  let (_, body) = send(&app, "GET", "/samples/p1", None).await;
  assert_eq!(body["sample"]["static"]["age"], 64);
}

// ─── Time-steps ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn temporal_edits_keep_time_index_order() {
  let (app, _) = app();
  create(&app, "p1").await;
  send(&app, "POST", "/samples/p1/temporal", None).await;
  let (status, body) = send(&app, "POST", "/samples/p1/temporal", None).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["current_timestep"], 2);
  assert_eq!(body["sample"]["static"]["n_steps"], 3);

  let (status, body) =
    send(&app, "PUT", "/samples/p1/temporal/1", Some(json!({ "time_index": 2 }))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["feature"], "time_index");

  let (status, body) = send(
    &app,
    "PUT",
    "/samples/p1/temporal/1",
    Some(json!({ "time_index": 5, "dose": 4 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(time_indexes(&body), [0, 2, 5]);
  assert_eq!(body["current_timestep"], 2);
  assert_eq!(body["sample"]["temporal"][2]["dose"], 4.0);

  let (status, body) = send(&app, "DELETE", "/samples/p1/temporal/2", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(time_indexes(&body), [0, 2]);
  assert_eq!(body["current_timestep"], 1);
}

#[tokio::test]
async fn structural_violations_are_conflicts() {
  let (app, store) = app();
  create(&app, "p1").await;
  let writes = store.writes();

  let (status, _) = send(&app, "DELETE", "/samples/p1/temporal/0", None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) =
    send(&app, "PUT", "/samples/p1/temporal/9", Some(json!({ "dose": 1 }))).await;
  assert_eq!(status, StatusCode::CONFLICT);

  assert_eq!(store.writes(), writes);
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn event_lifecycle() {
  let (app, _) = app();
  create(&app, "p1").await;

  let (status, body) = send(&app, "POST", "/samples/p1/events", None).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["event_index"], 1);

  let (status, _) =
    send(&app, "PUT", "/samples/p1/events/1", Some(json!({ "label": "cough" }))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let (status, body) =
    send(&app, "PUT", "/samples/p1/events/1", Some(json!({ "label": "fever" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["sample"]["event"][1]["label"], "fever");

  let (status, body) = send(&app, "DELETE", "/samples/p1/events/0", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["sample"]["event"], json!([{ "label": "fever" }]));

  let (status, _) = send(&app, "DELETE", "/samples/p1/events/4", None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}
