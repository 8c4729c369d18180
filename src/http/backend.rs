//! Backend routes: Feature extraction and forwarding for one location.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::{banner, error_response, health};
use crate::application::PredictionBridge;
use crate::domain::{GeoPoint, ReferenceDates};

pub const SERVICE_NAME: &str = "Floodsense Backend";

/// `POST /predict` body.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    pub lat: f64,
    pub lon: f64,
    /// Reference date for precipitation and the optical composite.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

pub fn router(bridge: Arc<PredictionBridge>) -> Router {
    Router::new()
        .route("/", get(|| async { banner(SERVICE_NAME) }))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .with_state(bridge)
}

async fn predict(
    State(bridge): State<Arc<PredictionBridge>>,
    Json(req): Json<PredictRequest>,
) -> Response {
    let point = GeoPoint::new(req.lat, req.lon);
    if let Err(reason) = point.validate() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Invalid coordinates", reason);
    }
    let dates = match ReferenceDates::resolve(req.date, Utc::now().date_naive()) {
        Ok(dates) => dates,
        Err(reason) => {
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Invalid date", reason)
        }
    };
    tracing::info!("Prediction requested for {}", point);

    // Source calls block; keep them off the async workers.
    let outcome = tokio::task::spawn_blocking(move || bridge.predict(point, dates)).await;
    match outcome {
        Ok(Ok(reply)) => Json(reply).into_response(),
        Ok(Err(e)) => {
            tracing::error!("Feature extraction for {} failed: {}", point, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Feature extraction failed",
                e,
            )
        }
        Err(e) => {
            tracing::error!("Prediction task for {} aborted: {}", point, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Feature extraction failed",
                e,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::application::feature_fakes::{builder, FakeSources};
    use crate::http::testing::call;
    use crate::ports::{GatewayError, InferenceGateway};

    struct StubGateway {
        reply: Result<serde_json::Value, String>,
        sent: Mutex<usize>,
    }

    impl InferenceGateway for StubGateway {
        fn predict(&self, _: &[f64]) -> Result<serde_json::Value, GatewayError> {
            *self.sent.lock().expect("lock") += 1;
            self.reply.clone().map_err(GatewayError::Transport)
        }
    }

    fn app(sources: FakeSources, reply: Result<serde_json::Value, String>) -> (Arc<StubGateway>, Router) {
        let (_, features) = builder(sources);
        let gateway = Arc::new(StubGateway {
            reply,
            sent: Mutex::new(0),
        });
        let bridge = PredictionBridge::new(features, Arc::clone(&gateway) as Arc<dyn InferenceGateway>);
        (gateway, router(Arc::new(bridge)))
    }

    #[tokio::test]
    async fn test_banner() {
        let (_, app) = app(FakeSources::typical(), Ok(json!({})));
        let (status, body) = call(app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"service": "Floodsense Backend", "status": "running"}));
    }

    #[tokio::test]
    async fn test_predict_returns_features_and_ai_response() {
        let (gateway, app) = app(
            FakeSources::typical(),
            Ok(json!({"prediction": 0, "risk_score": 0.12})),
        );
        let (status, body) =
            call(app, "POST", "/predict", Some(r#"{"lat": -6.2, "lon": 106.8}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ai_response"], json!({"prediction": 0, "risk_score": 0.12}));
        assert_eq!(body["features"][1], 12.4);
        assert_eq!(*gateway.sent.lock().expect("lock"), 1);
    }

    #[tokio::test]
    async fn test_unreachable_ai_service_is_200_with_error() {
        let (_, app) = app(
            FakeSources::typical(),
            Err("error sending request for url (http://ai:8000/predict)".into()),
        );
        let (status, body) = call(
            app,
            "POST",
            "/predict",
            Some(r#"{"lat": 1.3, "lon": 103.8, "date": "2024-01-10"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], "AI service call failed");
        assert_eq!(body["details"], "error sending request for url (http://ai:8000/predict)");
    }

    #[tokio::test]
    async fn test_source_failure_is_500() {
        let (gateway, app) = app(
            FakeSources {
                fail_on: Some("terrain"),
                ..FakeSources::typical()
            },
            Ok(json!({})),
        );
        let (status, body) = call(app, "POST", "/predict", Some(r#"{"lat": 0.0, "lon": 0.0}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Feature extraction failed");
        assert_eq!(*gateway.sent.lock().expect("lock"), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_coordinates_are_rejected() {
        let (gateway, app) = app(FakeSources::typical(), Ok(json!({})));
        let (status, body) = call(app, "POST", "/predict", Some(r#"{"lat": 95.0, "lon": 0.0}"#)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid coordinates");
        assert_eq!(*gateway.sent.lock().expect("lock"), 0);
    }

    #[tokio::test]
    async fn test_date_at_calendar_edge_is_rejected_before_sources() {
        let sources = FakeSources::typical();
        let (calls, features) = builder(sources);
        let gateway = Arc::new(StubGateway {
            reply: Ok(json!({})),
            sent: Mutex::new(0),
        });
        let bridge =
            PredictionBridge::new(features, Arc::clone(&gateway) as Arc<dyn InferenceGateway>);
        let app = router(Arc::new(bridge));

        let (status, body) = call(
            app,
            "POST",
            "/predict",
            Some(r#"{"lat": 0.0, "lon": 0.0, "date": "+262142-12-31"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid date");
        assert!(calls.calls().is_empty());
        assert_eq!(*gateway.sent.lock().expect("lock"), 0);
    }
}
