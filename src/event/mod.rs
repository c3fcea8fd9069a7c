//! Event model for the Breakpoint ingestion API
//!
//! An [`Event`] is built fresh for every submission from a [`Notification`]
//! request. Core fields are generated or defaulted here; anything else the
//! caller supplies travels as an extension field, flattened into the same
//! JSON object on the wire.

pub mod stamp;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use stamp::Stamp;

/// Identifies this client implementation in the `source` field
pub const SOURCE: &str = "rust-adapter";

/// Event type used when the caller does not pick one
pub const DEFAULT_EVENT_TYPE: &str = "custom";

/// Field names owned by the client. Extension fields with these names are dropped.
pub const RESERVED_FIELDS: [&str; 6] = ["id", "event_type", "source", "priority", "title", "timestamp"];

/// Event types the ingestion service routes specially. Others are accepted as-is.
pub const KNOWN_EVENT_TYPES: &[&str] = &[
    "pipeline.started",
    "pipeline.succeeded",
    "pipeline.failed",
    "pr.opened",
    "pr.reviewed",
    "pr.merged",
    "pr.conflict",
    "issue.opened",
    "issue.assigned",
    "issue.closed",
    "review.requested",
    "deploy.pending",
    "deploy.completed",
    "deploy.failed",
    "agent.started",
    "agent.completed",
    "agent.blocked",
    "agent.error",
    "security.alert",
    "comment.added",
    "branch.pushed",
    "test.passed",
    "test.failed",
    "custom",
];

/// Caller-supplied fields merged into the top level of the payload, in insertion order
pub type ExtraFields = IndexMap<String, serde_json::Value>;

/// Priority tiers understood by the service, least to most urgent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Priority {
    #[default]
    Ambient,
    Notice,
    Urgent,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Ambient, Self::Notice, Self::Urgent, Self::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ambient => "ambient",
            Self::Notice => "notice",
            Self::Urgent => "urgent",
            Self::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

/// The record POSTed to `/api/v1/events`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub event_type: String,
    pub source: String,
    pub priority: String,
    pub title: String,
    pub timestamp: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Event {
    /// Assemble an event from a request and a stamp.
    ///
    /// Extension fields named like a core field are dropped so the core value
    /// always wins; each dropped key is logged.
    pub fn from_notification(notification: &Notification, stamp: Stamp) -> Self {
        let event_type = notification
            .event_type
            .clone()
            .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());
        if !KNOWN_EVENT_TYPES.contains(&event_type.as_str()) {
            log::debug!("Event type '{}' is not a well-known type, sending as-is", event_type);
        }

        let priority = notification
            .priority
            .clone()
            .unwrap_or_else(|| Priority::default().as_str().to_string());
        if Priority::from_str(&priority).is_none() {
            log::warn!("Priority '{}' is not a known tier, the service may reject it", priority);
        }

        let mut extra = ExtraFields::with_capacity(notification.extra.len());
        for (key, value) in &notification.extra {
            if is_reserved(key) {
                log::warn!("Ignoring extension field '{}': reserved for the client", key);
                continue;
            }
            extra.insert(key.clone(), value.clone());
        }

        Self {
            id: stamp.id,
            event_type,
            source: SOURCE.to_string(),
            priority,
            title: notification.title.clone(),
            timestamp: stamp.timestamp,
            extra,
        }
    }
}

pub fn is_reserved(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// A request to emit one event
///
/// Only `title` is required. The typed setters cover the fields the service
/// knows about; [`Notification::field`] adds anything else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notification {
    pub title: String,
    pub event_type: Option<String>,
    pub priority: Option<String>,
    pub extra: ExtraFields,
}

impl Notification {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Priority tier. Not checked against [`Priority`]; the service decides.
    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Add an extension field. A later value for the same key replaces the earlier one.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn fields(mut self, fields: ExtraFields) -> Self {
        self.extra.extend(fields);
        self
    }

    pub fn body(self, body: impl Into<String>) -> Self {
        self.field("body", body.into())
    }

    pub fn url(self, url: impl Into<String>) -> Self {
        self.field("url", url.into())
    }

    pub fn actor(self, actor: impl Into<String>) -> Self {
        self.field("actor", actor.into())
    }

    pub fn tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        self.field("tags", tags)
    }

    pub fn action_required(self, required: bool) -> Self {
        self.field("action_required", required)
    }

    pub fn group_key(self, key: impl Into<String>) -> Self {
        self.field("group_key", key.into())
    }

    /// RFC 3339 time after which the service may drop the event
    pub fn expires_at(self, expires_at: impl Into<String>) -> Self {
        self.field("expires_at", expires_at.into())
    }

    pub fn metadata(self, metadata: ExtraFields) -> Self {
        let object: serde_json::Map<String, serde_json::Value> = metadata.into_iter().collect();
        self.field("metadata", serde_json::Value::Object(object))
    }
}
