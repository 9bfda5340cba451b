use crate::domain_model::{AccessToken, ApiRequest, ApiResponse};

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Sends one request and hands back whatever the server answered, whatever
/// the status. Only failures to get an answer at all are errors here.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse, TransportError>;

    fn base_url(&self) -> &str;
}
