//! Inference service routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use super::{banner, error_response, health};
use crate::application::InferenceService;
use crate::domain::FeaturePayload;
use crate::ports::Classifier;

pub const SERVICE_NAME: &str = "Floodsense AI Service";

pub fn router<C>(service: Arc<InferenceService<C>>) -> Router
where
    C: Classifier + ?Sized + 'static,
{
    Router::new()
        .route("/", get(|| async { banner(SERVICE_NAME) }))
        .route("/health", get(health))
        .route("/predict", post(predict::<C>))
        .with_state(service)
}

async fn predict<C>(
    State(service): State<Arc<InferenceService<C>>>,
    Json(payload): Json<FeaturePayload>,
) -> Response
where
    C: Classifier + ?Sized + 'static,
{
    match service.predict(&payload.features) {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            tracing::error!("Inference failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Inference failed", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::inference_fakes::{columns, SpyClassifier};
    use crate::http::testing::call;

    fn app(spy: SpyClassifier) -> (Arc<SpyClassifier>, Router) {
        let spy = Arc::new(spy);
        let service = InferenceService::new(Arc::clone(&spy), columns()).expect("service");
        (spy, router(Arc::new(service)))
    }

    #[tokio::test]
    async fn test_banner_and_health() {
        let (_, app) = app(SpyClassifier::default());
        let (status, body) = call(app.clone(), "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"service": "Floodsense AI Service", "status": "running"}));

        let (status, body) = call(app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_predict_returns_prediction() {
        let (spy, app) = app(SpyClassifier::default());
        let body = r#"{"features": [0, 12.4, 30.1, 0.42, -0.31, 50, 8, 1.5, 270, 2.5, 9.0]}"#;
        let (status, reply) = call(app, "POST", "/predict", Some(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply, json!({"prediction": 1, "risk_score": 0.9}));
        assert_eq!(spy.calls(), 1);
    }

    #[tokio::test]
    async fn test_negative_infinite_twi_token() {
        let (spy, app) = app(SpyClassifier::default());
        let body = r#"{"features": [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, "-Infinity"]}"#;
        let (status, reply) = call(app, "POST", "/predict", Some(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply, json!({"prediction": -1, "risk_score": 0}));
        assert_eq!(spy.calls(), 0);
    }

    #[tokio::test]
    async fn test_wrong_length_lists_expected_order() {
        let (_, app) = app(SpyClassifier::default());
        let (status, reply) = call(app, "POST", "/predict", Some(r#"{"features": [1, 2]}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["error"], "Expected 11 features, got 2");
        assert_eq!(reply["expected_order"], json!(columns()));
    }

    #[tokio::test]
    async fn test_pipeline_failure_is_500() {
        let (_, app) = app(SpyClassifier {
            fail: true,
            ..SpyClassifier::default()
        });
        let body = r#"{"features": [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1.0]}"#;
        let (status, reply) = call(app, "POST", "/predict", Some(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply["error"], "Inference failed");
    }
}
