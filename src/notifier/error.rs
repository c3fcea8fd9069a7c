//! Error types for event submission
//!
//! Every failure of a submission lands in exactly one of three buckets:
//! the request never got an HTTP answer ([`NotifyError::Transport`]), the
//! service answered with a non-success status ([`NotifyError::Protocol`]),
//! or it answered with success but the body was not a usable
//! acknowledgment ([`NotifyError::Decode`]). Nothing is retried here.

#![allow(dead_code)] // classification helpers are for callers deciding on retries

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NotifyError>;

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// Connection, DNS, TLS or timeout failure before a status was received
    #[error("transport error: {message}")]
    Transport {
        message: String,
        /// The configured timeout elapsed
        timed_out: bool,
    },

    /// The service answered with a non-2xx status
    #[error("service responded with HTTP {status}")]
    Protocol {
        status: u16,
        /// Response body, when one could be read
        body: Option<String>,
    },

    /// The service answered 2xx but the body is not a valid acknowledgment
    #[error("malformed acknowledgment: {message}")]
    Decode { message: String, body: String },
}

impl NotifyError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::Transport {
            message: format!("no response within {}ms", after.as_millis()),
            timed_out: true,
        }
    }

    pub fn protocol(status: u16, body: Option<String>) -> Self {
        let body = body.filter(|b| !b.trim().is_empty());
        Self::Protocol { status, body }
    }

    pub fn decode(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            body: body.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { timed_out: true, .. })
    }

    /// HTTP status for protocol errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The service rejected the request itself (4xx): bad token, invalid priority, oversized field
    pub fn is_client_rejection(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    /// The service failed while handling a valid request (5xx)
    pub fn is_server_failure(&self) -> bool {
        matches!(self.status(), Some(500..=599))
    }

    /// Response body for diagnostics, if any
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Protocol { body, .. } => body.as_deref(),
            Self::Decode { body, .. } => Some(body.as_str()),
            Self::Transport { .. } => None,
        }
    }
}

impl From<ureq::Error> for NotifyError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Self::protocol(status, None),
            ureq::Error::Timeout(which) => Self::Transport {
                message: format!("timed out ({:?})", which),
                timed_out: true,
            },
            ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => Self::Transport {
                message: io.to_string(),
                timed_out: true,
            },
            other => Self::transport(other.to_string()),
        }
    }
}
