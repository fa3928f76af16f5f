use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::Config;
use crate::logic::testing::{CountingModel, FixedModel};
use crate::logic::ModelHandle;
use crate::middleware::auth::API_KEY_HEADER;
use crate::models::FEATURE_ORDER;
use crate::{create_router, AppState};

const KEY: &str = "test-key";

fn customer() -> Value {
    json!({
        "CreditScore": 650, "Age": 35, "Tenure": 5, "Balance": 50000,
        "NumOfProducts": 2, "HasCrCard": 1, "IsActiveMember": 1,
        "EstimatedSalary": 75000, "Geography_Germany": 0, "Geography_Spain": 0
    })
}

fn request(method: &str, uri: &str, body: Option<Value>, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn write_csv(path: &Path, age_offset: f64) {
    let mut text = FEATURE_ORDER.join(",");
    text.push('\n');
    for i in 0..40 {
        text.push_str(&format!(
            "{},{},5,50000,2,1,1,75000,0,0\n",
            600 + i % 7,
            age_offset + i as f64
        ));
    }
    std::fs::write(path, text).unwrap();
}

fn counting_state() -> (AppState, Arc<std::sync::atomic::AtomicU64>) {
    let (model, calls) = CountingModel::new();
    let state = AppState::new(Config::default(), ModelHandle::with_model(Arc::new(model)));
    (state, calls)
}

#[test]
fn test_root_is_public() {
    let state = AppState::new(Config::default(), ModelHandle::empty());
    let app = create_router(state);

    let res = tokio_test::block_on(app.oneshot(request("GET", "/", None, None))).unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_or_wrong_key_is_forbidden() {
    let (state, _) = counting_state();

    let (status, body) = send(create_router(state.clone()), request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid or missing API key");

    let (status, _) = send(
        create_router(state),
        request("POST", "/predict", Some(customer()), Some("wrong")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_health_without_model_is_unavailable() {
    let state = AppState::new(Config::default(), ModelHandle::empty());

    let (status, body) = send(create_router(state.clone()), request("GET", "/health", None, Some(KEY))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], 503);

    let (status, _) = send(
        create_router(state),
        request("POST", "/predict", Some(customer()), Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_with_model() {
    let (state, _) = counting_state();
    let (status, body) = send(create_router(state), request("GET", "/health", None, Some(KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], true);
}

#[tokio::test]
async fn test_predict_twice_hits_cache() {
    let (state, calls) = counting_state();

    let (status, first) = send(
        create_router(state.clone()),
        request("POST", "/predict", Some(customer()), Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, second) = send(
        create_router(state.clone()),
        request("POST", "/predict", Some(customer()), Some(KEY)),
    )
    .await;

    assert_eq!(first, second);
    assert_eq!(first["churn_probability"], 0.35);
    assert_eq!(first["prediction"], 0);
    assert_eq!(first["risk_level"], "Medium");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (_, stats) = send(create_router(state), request("GET", "/cache/stats", None, Some(KEY))).await;
    assert_eq!(stats["size"], 1);
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
}

#[tokio::test]
async fn test_predict_rejects_bad_payloads() {
    let (state, calls) = counting_state();

    let mut missing = customer();
    missing.as_object_mut().unwrap().remove("Age");
    let mut extra = customer();
    extra["Surname"] = json!("Hargrave");
    let mut mistyped = customer();
    mistyped["Balance"] = json!("lots");
    let mut out_of_range = customer();
    out_of_range["IsActiveMember"] = json!(3);

    for body in [missing, extra, mistyped, out_of_range] {
        let (status, _) = send(
            create_router(state.clone()),
            request("POST", "/predict", Some(body), Some(KEY)),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_model_failure_is_opaque() {
    let state = AppState::new(
        Config::default(),
        ModelHandle::with_model(Arc::new(FixedModel(f64::NAN))),
    );

    let (status, body) = send(
        create_router(state.clone()),
        request("POST", "/predict", Some(customer()), Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Prediction failed");
    assert!(state.cache.is_empty());
}

#[tokio::test]
async fn test_batch_shares_cache() {
    let (state, calls) = counting_state();
    let mut older = customer();
    older["Age"] = json!(75);

    let (status, body) = send(
        create_router(state),
        request(
            "POST",
            "/predict/batch",
            Some(json!({ "records": [customer(), older, customer()] })),
            Some(KEY),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["predictions"][1]["risk_level"], "High");
    assert_eq!(body["predictions"][0], body["predictions"][2]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_batch_rejects_invalid_record() {
    let (state, _) = counting_state();
    let mut bad = customer();
    bad["HasCrCard"] = json!(-1);

    let (status, body) = send(
        create_router(state),
        request("POST", "/predict/batch", Some(json!({ "records": [customer(), bad] })), Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().starts_with("record 1"));
}

#[tokio::test]
async fn test_drift_check_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.reference_data_path = dir.path().join("ref.csv").display().to_string();
    config.production_data_path = dir.path().join("prod.csv").display().to_string();
    write_csv(Path::new(&config.reference_data_path), 20.0);
    write_csv(Path::new(&config.production_data_path), 60.0);

    let state = AppState::new(config, ModelHandle::empty());

    let (status, body) = send(
        create_router(state.clone()),
        request("POST", "/drift/check?threshold=0.05", None, Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success", "features_analyzed": 10, "features_drifted": 1 }));

    let (status, report) = send(
        create_router(state),
        request("POST", "/drift/report", None, Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["risk_level"], "LOW");
    assert_eq!(report["drift_percentage"], 10.0);
    assert_eq!(report["method"], "kolmogorov_smirnov");
    assert_eq!(report["features"][1]["feature"], "Age");
    assert_eq!(report["features"][1]["drift_detected"], true);
}

#[tokio::test]
async fn test_drift_missing_dataset_is_opaque() {
    let mut config = Config::default();
    config.reference_data_path = "/nonexistent/bank_churn.csv".to_string();
    let state = AppState::new(config, ModelHandle::empty());

    let (status, body) = send(
        create_router(state),
        request("POST", "/drift/check", None, Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Drift detection failed");
}

#[tokio::test]
async fn test_drift_bad_threshold() {
    let state = AppState::new(Config::default(), ModelHandle::empty());
    let (status, _) = send(
        create_router(state),
        request("POST", "/drift/check?threshold=high", None, Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_drift_negative_threshold() {
    let state = AppState::new(Config::default(), ModelHandle::empty());
    let (status, body) = send(
        create_router(state),
        request("POST", "/drift/report?threshold=-0.5", None, Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("threshold"));
}

#[tokio::test]
async fn test_reload_swaps_model_and_clears_cache() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("churn_model.json");
    std::fs::write(
        &model_path,
        json!({ "weights": vec![0.0; 10], "intercept": 0.0 }).to_string(),
    )
    .unwrap();

    let mut config = Config::default();
    config.model_path = model_path.display().to_string();
    let state = AppState::new(config, ModelHandle::with_model(Arc::new(FixedModel(0.1))));

    let (_, before) = send(
        create_router(state.clone()),
        request("POST", "/predict", Some(customer()), Some(KEY)),
    )
    .await;
    assert_eq!(before["risk_level"], "Low");
    assert_eq!(state.cache.len(), 1);

    let (status, body) = send(
        create_router(state.clone()),
        request("POST", "/model/reload", None, Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generation"], 2);
    assert_eq!(body["cache_cleared"], true);
    assert!(state.cache.is_empty());

    let (_, after) = send(
        create_router(state),
        request("POST", "/predict", Some(customer()), Some(KEY)),
    )
    .await;
    assert_eq!(after["churn_probability"], 0.5);
    assert_eq!(after["prediction"], 0);
    assert_eq!(after["risk_level"], "Medium");
}

#[tokio::test]
async fn test_reload_without_invalidation_keeps_entries() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("churn_model.json");
    std::fs::write(
        &model_path,
        json!({ "weights": vec![0.0; 10], "intercept": 0.0 }).to_string(),
    )
    .unwrap();

    let mut config = Config::default();
    config.model_path = model_path.display().to_string();
    config.cache_invalidate_on_reload = false;
    let state = AppState::new(config, ModelHandle::with_model(Arc::new(FixedModel(0.1))));

    send(create_router(state.clone()), request("POST", "/predict", Some(customer()), Some(KEY))).await;
    let (_, body) = send(create_router(state.clone()), request("POST", "/model/reload", None, Some(KEY))).await;
    assert_eq!(body["cache_cleared"], false);

    let (_, after) = send(create_router(state), request("POST", "/predict", Some(customer()), Some(KEY))).await;
    assert_eq!(after["risk_level"], "Low");
}

#[tokio::test]
async fn test_failed_reload_keeps_current_model() {
    let mut config = Config::default();
    config.model_path = "/nonexistent/churn_model.json".to_string();
    let state = AppState::new(config, ModelHandle::with_model(Arc::new(FixedModel(0.8))));

    let (status, body) = send(
        create_router(state.clone()),
        request("POST", "/model/reload", None, Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Model reload failed");
    assert_eq!(state.engine.model().generation(), 1);

    let (status, _) = send(create_router(state), request("GET", "/health", None, Some(KEY))).await;
    assert_eq!(status, StatusCode::OK);
}
