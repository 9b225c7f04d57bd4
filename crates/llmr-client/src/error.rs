use std::fmt;

/// Which report endpoint a request was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `POST /v1/llm/reports/{roomId}`
    Trigger,
    /// `GET /v1/llm/reports/{roomId}`
    Poll,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Trigger => "trigger",
            Operation::Poll => "poll",
        }
    }
}

/// Errors produced by the report HTTP client.
///
/// `Display` output is meant to be shown to a user as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The configured base URL cannot carry a path.
    InvalidBaseUrl { base_url: String, reason: String },
    /// The request never produced a response (connect, timeout, TLS, ...).
    Transport { op: Operation, message: String },
    /// A response arrived with a status the operation does not accept.
    UnexpectedStatus {
        op: Operation,
        status: u16,
        /// `detail` string from an error body, when the server sent one.
        detail: Option<String>,
    },
    /// A 200 poll response whose body is not JSON.
    Decode { message: String },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::InvalidBaseUrl { base_url, reason } => {
                write!(f, "invalid report API base url '{base_url}': {reason}")
            }
            ClientError::Transport { op, message } => {
                write!(f, "report {} request failed: {message}", op.as_str())
            }
            ClientError::UnexpectedStatus {
                op,
                status,
                detail: Some(detail),
            } => {
                write!(f, "report {} returned HTTP {status}: {detail}", op.as_str())
            }
            ClientError::UnexpectedStatus { op, status, .. } => {
                write!(f, "report {} returned HTTP {status}", op.as_str())
            }
            ClientError::Decode { message } => {
                write!(f, "report body could not be decoded: {message}")
            }
        }
    }
}

impl std::error::Error for ClientError {}
