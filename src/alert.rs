//! Emergency alert path
//!
//! The engine's responsibility ends at building the alert payload and
//! invoking the dispatcher with the most recently registered recipient.
//! Delivery guarantees, retry, and backoff belong to the dispatcher
//! implementation, not the core.

use crate::error::AlertError;
use crate::types::Coordinates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification title carried on every alert
pub const ALERT_TITLE: &str = "Safety incident detected";

/// Notification body carried on every alert
pub const ALERT_BODY: &str = "A safety incident has occurred. Check the wearer's location.";

/// Alert payload handed to the dispatcher.
///
/// `location: None` is the documented "no location known" sentinel: an
/// alert raised before the first GPS fix still goes out rather than
/// blocking on position data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub location: Option<Coordinates>,
    pub raised_at: DateTime<Utc>,
}

impl AlertMessage {
    pub fn new(location: Option<Coordinates>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: ALERT_TITLE.to_string(),
            body: ALERT_BODY.to_string(),
            location,
            raised_at: Utc::now(),
        }
    }
}

/// Registry of alert recipient tokens, newest registration wins
pub trait RecipientRegistry: Send {
    /// Register a recipient token. Idempotent by token value: re-registering
    /// an existing token does not change its position.
    fn register(&mut self, token: &str);

    /// The most recently registered token, if any
    fn most_recent(&self) -> Option<String>;
}

/// Alert delivery collaborator (push transport, messaging service, ...)
pub trait EmergencyDispatcher: Send + Sync {
    fn dispatch(&self, recipient_token: &str, message: &AlertMessage) -> Result<(), AlertError>;
}

/// In-memory recipient registry keyed by registration order
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecipientRegistry {
    tokens: Vec<String>,
}

impl InMemoryRecipientRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecipientRegistry for InMemoryRecipientRegistry {
    fn register(&mut self, token: &str) {
        if !self.tokens.iter().any(|t| t == token) {
            self.tokens.push(token.to_string());
        }
    }

    fn most_recent(&self) -> Option<String> {
        self.tokens.last().cloned()
    }
}

/// Build the alert payload and invoke the dispatcher for `token`.
///
/// Callers that hold a registry guard should resolve the token first and
/// release the guard before calling this: the dispatcher may block on
/// delivery I/O, and recipient registration must not wait behind it.
pub fn dispatch_alert(
    token: &str,
    dispatcher: &dyn EmergencyDispatcher,
    location: Option<Coordinates>,
) -> Result<AlertMessage, AlertError> {
    let message = AlertMessage::new(location);
    dispatcher.dispatch(token, &message)?;
    Ok(message)
}

/// Resolve the newest recipient and invoke the dispatcher with the alert.
///
/// With zero registered recipients this returns
/// [`AlertError::NoRecipient`] without invoking the dispatcher at all.
pub fn trigger(
    registry: &dyn RecipientRegistry,
    dispatcher: &dyn EmergencyDispatcher,
    location: Option<Coordinates>,
) -> Result<AlertMessage, AlertError> {
    let token = registry.most_recent().ok_or(AlertError::NoRecipient)?;
    dispatch_alert(&token, dispatcher, location)
}
