use crate::client::HttpResponse;

/// Failure of a backend call. `Clone` so one refresh outcome can be handed
/// to every request waiting on it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("session expired")]
    SessionExpired,
    #[error("request rejected with status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
    },
    #[error("server error with status {status}")]
    Server { status: u16 },
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn from_response(response: &HttpResponse) -> ApiError {
        if response.status >= 500 {
            return ApiError::Server {
                status: response.status,
            };
        }
        let message = serde_json::from_slice::<serde_json::Value>(&response.body)
            .ok()
            .and_then(|body| {
                ["error", "message"]
                    .iter()
                    .find_map(|k| body.get(*k).and_then(|v| v.as_str()).map(str::to_owned))
            });
        ApiError::Rejected {
            status: response.status,
            message,
        }
    }

    /// Text to show the user: the backend's own words when it gave any.
    pub fn notice(&self, fallback: &str) -> String {
        match self {
            ApiError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            _ => fallback.to_owned(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Rejected { status, .. } | ApiError::Server { status } => Some(*status),
            _ => None,
        }
    }
}
