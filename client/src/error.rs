use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::ServiceUnavailable {
                message: "Request timeout".to_string(),
            }
        } else if err.is_connect() {
            ClientError::ServiceUnavailable {
                message: "Cannot connect to API service".to_string(),
            }
        } else {
            ClientError::Network(err)
        }
    }

    /// True for failures where the request never got an HTTP answer.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ClientError::ServiceUnavailable { .. })
    }
}
