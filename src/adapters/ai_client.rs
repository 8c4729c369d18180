//! Inference gateway adapter: Forwards feature vectors to the AI service over HTTP.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::domain::FeaturePayload;
use crate::ports::{GatewayError, InferenceGateway};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct HttpInferenceGateway {
    http: Client,
    url: String,
}

impl HttpInferenceGateway {
    /// `url` is the full prediction endpoint, e.g. `http://ai:8000/predict`.
    ///
    /// # Errors
    /// Returns `GatewayError::Transport` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

impl InferenceGateway for HttpInferenceGateway {
    fn predict(&self, features: &[f64]) -> Result<serde_json::Value, GatewayError> {
        let payload = FeaturePayload::new(features.to_vec());
        let resp = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        resp.json()
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}
