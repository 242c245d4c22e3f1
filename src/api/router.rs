//! HTTP router for the assertion service.
//!
//! Middleware stack (outermost → innermost):
//! Security headers → CORS → Extension → Audit → Rate limit → API key (protected only) → Handler

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the service router from a pre-constructed `ApiContext`.
///
/// Middleware uses `Extension<ApiContext>` (injected outside the middleware layers).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn build_router(ctx: ApiContext) -> Router {
    // Require an API key when keys are configured
    let protected = Router::new()
        .route("/predict", post(endpoints::predict::predict))
        .route("/predict/batch", post(endpoints::predict::predict_batch))
        .route("/model/info", get(endpoints::model::info))
        .route("/system/metrics", get(endpoints::health::metrics))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_api_key));

    // Always open
    let public = Router::new()
        .route("/", get(endpoints::health::root))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx.clone());

    let cors = cors_layer(&ctx.config.cors_origins);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'"),
        ))
}

/// `*` allows any origin; otherwise only the listed origins.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::ServiceConfig;
    use crate::models::AssertionLabel;
    use crate::pipeline::assertion::{ModelPrediction, DEFAULT_MAX_SENTENCE_LENGTH};
    use crate::pipeline::model::{AssertionModel, ModelError, ModelInfo, StaticModel};

    fn present(score: f64) -> ModelPrediction {
        ModelPrediction::new(AssertionLabel::Present, score).unwrap()
    }

    fn app_with(config: ServiceConfig, model: Arc<dyn AssertionModel>) -> Router {
        build_router(ApiContext::new(config, model))
    }

    fn default_app() -> Router {
        app_with(ServiceConfig::default(), Arc::new(StaticModel::constant(present(0.91))))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Records the text the model receives.
    struct RecordingModel {
        seen: Mutex<Vec<String>>,
    }

    impl AssertionModel for RecordingModel {
        fn info(&self) -> ModelInfo {
            ModelInfo {
                model_name: "recording".into(),
                endpoint: "in-process".into(),
                labels: vec![AssertionLabel::Present],
            }
        }

        fn is_ready(&self) -> bool {
            true
        }

        fn predict_batch(&self, sentences: &[String]) -> Result<Vec<ModelPrediction>, ModelError> {
            self.seen.lock().unwrap().extend(sentences.iter().cloned());
            Ok(sentences.iter().map(|_| present(0.7)).collect())
        }
    }

    // ═══════════════════════════════════════════════════════════
    // Descriptor and health
    // ═══════════════════════════════════════════════════════════

    #[tokio::test]
    async fn root_describes_service() {
        let response = default_app().oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["endpoints"]["batch_predict"], "/predict/batch");
    }

    #[tokio::test]
    async fn health_reports_model_loaded() {
        let response = default_app().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["model_loaded"], true);
        assert_eq!(json["version"], crate::config::APP_VERSION);
        assert_eq!(json["total_predictions"], 0);
        for field in ["memory_mb", "memory_percent", "cpu_percent", "disk_percent"] {
            assert!(json["system_metrics"][field].is_number(), "{field} missing");
        }
    }

    #[tokio::test]
    async fn health_reports_unhealthy_when_model_not_ready() {
        let model = Arc::new(StaticModel::constant(present(0.5)).not_ready());
        let app = app_with(ServiceConfig::default(), model);
        let json = body_json(app.oneshot(get_request("/health")).await.unwrap()).await;
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["model_loaded"], false);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let response = default_app().oneshot(get_request("/health")).await.unwrap();
        let headers = response.headers();
        assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
        assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
        assert!(headers.contains_key("Strict-Transport-Security"));
        assert!(headers.contains_key("Content-Security-Policy"));
    }

    #[tokio::test]
    async fn responses_report_elapsed_time() {
        let response = default_app().oneshot(get_request("/health")).await.unwrap();
        let elapsed = response.headers().get("X-Response-Time").unwrap().to_str().unwrap();
        let secs = elapsed.strip_suffix('s').unwrap();
        assert!(secs.parse::<f64>().unwrap() >= 0.0);

        let rejected = keyed_app()
            .oneshot(post_json("/predict", predict_body()))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
        assert!(rejected.headers().contains_key("X-Response-Time"));
    }

    #[tokio::test]
    async fn cors_allows_any_origin_by_default() {
        let req = Request::builder()
            .uri("/health")
            .header("Origin", "https://ui.example")
            .body(Body::empty())
            .unwrap();
        let response = default_app().oneshot(req).await.unwrap();
        assert_eq!(response.headers().get("Access-Control-Allow-Origin").unwrap(), "*");
    }

    // ═══════════════════════════════════════════════════════════
    // Single prediction
    // ═══════════════════════════════════════════════════════════

    #[tokio::test]
    async fn predict_applies_negation_override() {
        let req = post_json(
            "/predict",
            serde_json::json!({ "sentence": "The patient denies chest pain." }),
        );
        let response = default_app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["label"], "ABSENT");
        assert_eq!(json["model_label"], "PRESENT");
        assert_eq!(json["score"], 0.91);
        assert_eq!(json["rule_applied"], "negation_trigger");
        assert!(json["request_id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(json["prediction_time_ms"].is_number());
    }

    #[tokio::test]
    async fn predict_passes_through_without_trigger() {
        let req = post_json(
            "/predict",
            serde_json::json!({ "sentence": "Chest X-ray shows consolidation." }),
        );
        let json = body_json(default_app().oneshot(req).await.unwrap()).await;
        assert_eq!(json["label"], "PRESENT");
        assert_eq!(json["model_label"], "PRESENT");
        assert!(json["rule_applied"].is_null());
    }

    #[tokio::test]
    async fn predict_rejects_blank_sentence() {
        let req = post_json("/predict", serde_json::json!({ "sentence": "   " }));
        let response = default_app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn predict_rejects_overlong_sentence() {
        let config = ServiceConfig {
            max_sentence_length: 20,
            ..ServiceConfig::default()
        };
        let app = app_with(config, Arc::new(StaticModel::constant(present(0.9))));
        let req = post_json(
            "/predict",
            serde_json::json!({ "sentence": "This sentence is clearly longer than twenty characters." }),
        );
        assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn predict_rejects_malformed_body() {
        let req = post_json("/predict", serde_json::json!({ "text": "no sentence field" }));
        let response = default_app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn predict_returns_503_when_model_not_ready() {
        let model = Arc::new(StaticModel::constant(present(0.5)).not_ready());
        let app = app_with(ServiceConfig::default(), model);
        let req = post_json("/predict", serde_json::json!({ "sentence": "Cough present." }));
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "MODEL_NOT_READY");
    }

    #[tokio::test]
    async fn identifiers_masked_before_model() {
        let model = Arc::new(RecordingModel {
            seen: Mutex::new(Vec::new()),
        });
        let app = app_with(ServiceConfig::default(), model.clone());
        let req = post_json(
            "/predict",
            serde_json::json!({ "sentence": "Patient 123-45-6789 denies fever." }),
        );
        let json = body_json(app.oneshot(req).await.unwrap()).await;
        assert_eq!(json["label"], "ABSENT");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), ["Patient [SSN] denies fever."]);
    }

    #[tokio::test]
    async fn masking_can_be_disabled() {
        let model = Arc::new(RecordingModel {
            seen: Mutex::new(Vec::new()),
        });
        let config = ServiceConfig {
            mask_identifiers: false,
            ..ServiceConfig::default()
        };
        let app = app_with(config, model.clone());
        let req = post_json("/predict", serde_json::json!({ "sentence": "MRN 12345678 reviewed." }));
        app.oneshot(req).await.unwrap();
        assert_eq!(model.seen.lock().unwrap().as_slice(), ["MRN 12345678 reviewed."]);
    }

    #[tokio::test]
    async fn masking_does_not_count_against_length_limit() {
        let model = Arc::new(RecordingModel {
            seen: Mutex::new(Vec::new()),
        });
        let app = app_with(ServiceConfig::default(), model.clone());

        let mut sentence = String::from("Patient denies fever, contact a@b.co ");
        let pad = DEFAULT_MAX_SENTENCE_LENGTH - sentence.chars().count();
        sentence.push_str(&"a".repeat(pad));
        assert_eq!(sentence.chars().count(), DEFAULT_MAX_SENTENCE_LENGTH);

        let req = post_json("/predict", serde_json::json!({ "sentence": sentence }));
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["label"], "ABSENT");

        let seen = model.seen.lock().unwrap();
        assert!(seen[0].contains("[EMAIL]"));
        assert!(seen[0].chars().count() > DEFAULT_MAX_SENTENCE_LENGTH);
    }

    // ═══════════════════════════════════════════════════════════
    // Batch prediction
    // ═══════════════════════════════════════════════════════════

    #[tokio::test]
    async fn batch_preserves_order() {
        let req = post_json(
            "/predict/batch",
            serde_json::json!({ "sentences": [
                "If symptoms worsen, return to clinic.",
                "No evidence of pneumonia.",
                "Possible early appendicitis.",
                "Chest pain present.",
            ]}),
        );
        let response = default_app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["batch_size"], 4);
        let labels: Vec<&str> = json["predictions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["label"].as_str().unwrap())
            .collect();
        assert_eq!(labels, ["CONDITIONAL", "ABSENT", "POSSIBLE", "PRESENT"]);
        assert!(json["total_prediction_time_ms"].is_number());
    }

    #[tokio::test]
    async fn batch_rejects_empty_list() {
        let req = post_json("/predict/batch", serde_json::json!({ "sentences": [] }));
        assert_eq!(
            default_app().oneshot(req).await.unwrap().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn batch_rejects_oversized_list() {
        let config = ServiceConfig {
            max_batch_size: 2,
            ..ServiceConfig::default()
        };
        let app = app_with(config, Arc::new(StaticModel::constant(present(0.9))));
        let req = post_json("/predict/batch", serde_json::json!({ "sentences": ["a", "b", "c"] }));
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"]["message"].as_str().unwrap().contains("exceeds maximum"));
    }

    #[tokio::test]
    async fn batch_names_invalid_index() {
        let req = post_json(
            "/predict/batch",
            serde_json::json!({ "sentences": ["Cough present.", "  ", "Denies fever."] }),
        );
        let response = default_app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"]["message"].as_str().unwrap().contains("index 1"));
    }

    #[tokio::test]
    async fn metrics_count_predictions() {
        let app = default_app();
        let req = post_json(
            "/predict/batch",
            serde_json::json!({ "sentences": ["Cough present.", "Denies fever."] }),
        );
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

        let json = body_json(app.oneshot(get_request("/system/metrics")).await.unwrap()).await;
        assert_eq!(json["total_predictions"], 2);
        assert_eq!(json["rules_loaded"], 4);
        assert_eq!(json["model_loaded"], true);
        assert!(json["memory_usage_mb"].is_number());
        assert!(json["cpu_usage_percent"].is_number());
    }

    #[tokio::test]
    async fn model_info_lists_rules() {
        let response = default_app().oneshot(get_request("/model/info")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["model_name"], "static");
        assert_eq!(json["rules"][0]["name"], "conditional_trigger");
        assert_eq!(json["rules"][0]["priority"], 1);
        assert_eq!(json["identifier_masking"], true);
    }

    // ═══════════════════════════════════════════════════════════
    // Authentication and rate limiting
    // ═══════════════════════════════════════════════════════════

    fn keyed_app() -> Router {
        let config = ServiceConfig {
            api_keys: ["secret-key".to_string()].into_iter().collect(),
            ..ServiceConfig::default()
        };
        app_with(config, Arc::new(StaticModel::constant(present(0.9))))
    }

    fn predict_body() -> serde_json::Value {
        serde_json::json!({ "sentence": "Denies fever." })
    }

    #[tokio::test]
    async fn predict_requires_key_when_configured() {
        let response = keyed_app()
            .oneshot(post_json("/predict", predict_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_key_rejected() {
        let mut req = post_json("/predict", predict_body());
        req.headers_mut()
            .insert("X-API-Key", HeaderValue::from_static("not-the-key"));
        let response = keyed_app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn key_accepted_from_each_location() {
        let app = keyed_app();

        let mut bearer = post_json("/predict", predict_body());
        bearer
            .headers_mut()
            .insert("Authorization", HeaderValue::from_static("Bearer secret-key"));
        assert_eq!(app.clone().oneshot(bearer).await.unwrap().status(), StatusCode::OK);

        let mut header = post_json("/predict", predict_body());
        header
            .headers_mut()
            .insert("X-API-Key", HeaderValue::from_static("secret-key"));
        assert_eq!(app.clone().oneshot(header).await.unwrap().status(), StatusCode::OK);

        let query = post_json("/predict?api_key=secret-key", predict_body());
        assert_eq!(app.oneshot(query).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn encoded_query_key_accepted() {
        let config = ServiceConfig {
            api_keys: ["k+ey/1".to_string()].into_iter().collect(),
            ..ServiceConfig::default()
        };
        let app = app_with(config, Arc::new(StaticModel::constant(present(0.9))));
        let req = post_json("/predict?api_key=k%2Bey%2F1", predict_body());
        assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_and_root_exempt_from_auth() {
        let app = keyed_app();
        assert_eq!(app.clone().oneshot(get_request("/health")).await.unwrap().status(), StatusCode::OK);
        assert_eq!(app.oneshot(get_request("/")).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rate_limit_returns_429() {
        let config = ServiceConfig {
            rate_limiting: true,
            rate_limit_rpm: 2,
            ..ServiceConfig::default()
        };
        let app = app_with(config, Arc::new(StaticModel::constant(present(0.9))));

        for _ in 0..2 {
            let response = app.clone().oneshot(get_request("/health")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("Retry-After"));
    }

    #[tokio::test]
    async fn rate_limit_disabled_by_default() {
        let app = default_app();
        for _ in 0..5 {
            let response = app.clone().oneshot(get_request("/health")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    fn request_from_origin(origin: &str) -> Request<Body> {
        Request::builder()
            .uri("/health")
            .header("Origin", origin)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn cors_echoes_only_listed_origins() {
        let config = ServiceConfig {
            cors_origins: vec!["https://a.example".to_string(), "bad\norigin".to_string()],
            ..ServiceConfig::default()
        };
        let app = app_with(config, Arc::new(StaticModel::constant(present(0.9))));

        let allowed = app
            .clone()
            .oneshot(request_from_origin("https://a.example"))
            .await
            .unwrap();
        assert_eq!(
            allowed.headers().get("Access-Control-Allow-Origin").unwrap(),
            "https://a.example"
        );

        let denied = app
            .oneshot(request_from_origin("https://evil.example"))
            .await
            .unwrap();
        assert!(!denied.headers().contains_key("Access-Control-Allow-Origin"));
    }
}
