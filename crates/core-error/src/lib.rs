use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("not connected: {0}")]
    NotConnected(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing or invalid configuration: {}", .0.join(", "))]
    Config(Vec<String>),

    #[error("send failed: {0}")]
    Send(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MailError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn not_connected(msg: impl Into<String>) -> Self {
        Self::NotConnected(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(fields: Vec<String>) -> Self {
        Self::Config(fields)
    }

    pub fn send(msg: impl Into<String>) -> Self {
        Self::Send(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Connection-level failures mean the session must be reopened before
    /// anything else can succeed.
    pub fn is_connection_level(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::NotConnected(_))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
    pub retryable: bool,
}

impl From<&MailError> for ErrorResponse {
    fn from(err: &MailError) -> Self {
        let (code, suggestion, retryable) = match err {
            MailError::Connection(_) => (
                "CONNECTION_ERROR",
                Some("Check IMAP_SERVER, IMAP_PORT and credentials, then reconnect"),
                true,
            ),
            MailError::NotConnected(_) => (
                "NOT_CONNECTED",
                Some("Connect to the mail server before listing folders or emails"),
                false,
            ),
            MailError::Protocol(_) => ("PROTOCOL_ERROR", None, true),
            MailError::NotFound(_) => (
                "NOT_FOUND",
                Some("List folders to find valid folder names"),
                false,
            ),
            MailError::InvalidInput(_) => ("INVALID_INPUT", None, false),
            MailError::Config(_) => (
                "CONFIG_ERROR",
                Some("Set the listed environment variables and restart"),
                false,
            ),
            MailError::Send(_) => (
                "SEND_ERROR",
                Some("Check SMTP_SERVER, SMTP_PORT and SMTP credentials"),
                true,
            ),
            MailError::Internal(_) => ("INTERNAL_ERROR", Some("Unexpected error"), true),
        };
        Self {
            code,
            message: err.to_string(),
            suggestion,
            retryable,
        }
    }
}

impl ErrorResponse {
    /// Prefix the message with what the caller was trying to do, e.g.
    /// "could not list folders".
    pub fn with_context(mut self, context: &str) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }

    pub fn to_compact(&self) -> String {
        let mut parts = vec![format!("[{}] {}", self.code, self.message)];
        if let Some(s) = self.suggestion {
            parts.push(format!("Suggestion: {s}"));
        }
        if self.retryable {
            parts.push("(retryable)".to_string());
        }
        parts.join(" | ")
    }
}

/// Tagged success/failure envelope handed to the transport layer.
#[derive(Debug, Serialize)]
pub struct Outcome<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl<T: Serialize> Outcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: ErrorResponse) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn from_result(result: Result<T, MailError>, context: &str) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failed(ErrorResponse::from(&e).with_context(context)),
        }
    }
}
