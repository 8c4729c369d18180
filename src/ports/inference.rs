//! Inference gateway port: Trait for forwarding features to the inference service.

/// Failure to obtain a response from the inference service.
///
/// The message is the transport layer's own description and is returned to
/// the caller verbatim.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Decode(String),
}

/// Remote inference endpoint.
pub trait InferenceGateway: Send + Sync {
    /// Send the ordered feature vector and return the service's JSON reply.
    ///
    /// # Errors
    /// Returns error on connection failure, timeout, non-2xx status or an
    /// undecodable body.
    fn predict(&self, features: &[f64]) -> Result<serde_json::Value, GatewayError>;
}
