//! Event submission to a Breakpoint ingestion service
//!
//! One [`EventNotifier::notify`] call is one blocking POST to
//! `<url>/api/v1/events`. There is no retry, batching or queueing: the
//! caller gets the acknowledgment or the error and decides what to do.

pub mod error;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use ureq::Agent;

use crate::config::ServerConfig;
use crate::event::{Event, Notification, Stamp};

pub use error::{NotifyError, Result};

/// Path of the ingestion endpoint, relative to the service base URL
pub const EVENTS_PATH: &str = "/api/v1/events";

/// The service's answer to an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgment {
    pub accepted: u64,
    pub event_ids: Vec<String>,
}

impl Acknowledgment {
    pub fn contains(&self, id: &str) -> bool {
        self.event_ids.iter().any(|e| e == id)
    }
}

/// Sends events to one ingestion endpoint
///
/// Cheap to clone and safe to share across threads; calls do not share any
/// mutable state beyond the connection pool owned by the HTTP agent.
#[derive(Clone)]
pub struct EventNotifier {
    agent: Agent,
    endpoint: String,
    token: String,
    timeout: Duration,
}

impl std::fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventNotifier")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl EventNotifier {
    pub fn new(config: ServerConfig) -> Self {
        let timeout = config.timeout();
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            endpoint: endpoint_url(&config.url),
            token: config.token,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the event that [`notify`](Self::notify) would send, stamping a fresh id and timestamp
    pub fn build_event(&self, notification: &Notification) -> Event {
        Event::from_notification(notification, Stamp::now())
    }

    /// Submit one event and wait for the acknowledgment
    pub fn notify(&self, notification: &Notification) -> Result<Acknowledgment> {
        let event = self.build_event(notification);
        self.send(&event)
    }

    /// POST an already-built event
    pub fn send(&self, event: &Event) -> Result<Acknowledgment> {
        let body = serde_json::to_string(event).map_err(|e| NotifyError::transport(format!("failed to encode event: {}", e)))?;

        log::info!(
            "Sending event {} (type={}, priority={}) to {}",
            event.id,
            event.event_type,
            event.priority,
            self.endpoint
        );

        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.body_mut().read_to_string().ok();
            log::warn!("Event {} rejected with HTTP {}", event.id, status.as_u16());
            return Err(NotifyError::protocol(status.as_u16(), body));
        }

        let body = match response.body_mut().read_to_vec() {
            Ok(body) => body,
            Err(ureq::Error::BodyExceedsLimit(limit)) => {
                return Err(NotifyError::decode(
                    format!("acknowledgment exceeds {} bytes", limit),
                    String::new(),
                ));
            }
            Err(ureq::Error::Io(io)) if io.kind() == std::io::ErrorKind::InvalidData => {
                return Err(NotifyError::decode(io.to_string(), String::new()));
            }
            Err(e) => return Err(self.classify(e)),
        };
        let ack = parse_acknowledgment(&body)?;

        if !ack.contains(&event.id) {
            log::warn!(
                "Acknowledgment for {} lists unexpected ids: {:?}",
                event.id,
                ack.event_ids
            );
        }
        log::info!("Event {} accepted ({} event(s))", event.id, ack.accepted);

        Ok(ack)
    }

    fn classify(&self, err: ureq::Error) -> NotifyError {
        let err = NotifyError::from(err);
        if err.is_timeout() {
            log::warn!("Request to {} timed out after {:?}", self.endpoint, self.timeout);
            return NotifyError::timeout(self.timeout);
        }
        log::warn!("Request to {} failed: {}", self.endpoint, err);
        err
    }
}

fn endpoint_url(base: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), EVENTS_PATH)
}

/// Parse a 2xx body. An acknowledgment of zero events is a contract violation.
fn parse_acknowledgment(body: &[u8]) -> Result<Acknowledgment> {
    let ack: Acknowledgment = serde_json::from_slice(body)
        .map_err(|e| NotifyError::decode(e.to_string(), String::from_utf8_lossy(body)))?;
    if ack.accepted == 0 {
        return Err(NotifyError::decode(
            "service acknowledged no events",
            String::from_utf8_lossy(body),
        ));
    }
    Ok(ack)
}
