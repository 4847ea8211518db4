//! Chat messages and the transport that delivers them.

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A single chat message. Messages are never edited once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub text:      String,
  pub timestamp: DateTime<Utc>,
  #[serde(default)]
  pub sender_id: Option<String>,
}

impl ChatMessage {
  pub fn new(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
    Self {
      text: text.into(),
      timestamp,
      sender_id: None,
    }
  }

  pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
    self.sender_id = Some(sender_id.into());
    self
  }
}

/// Boundary check run before a message is handed to the chat component.
///
/// Text consisting only of whitespace is rejected.
pub fn validate_message(text: &str) -> Result<&str, ValidationError> {
  if text.trim().is_empty() {
    Err(ValidationError::EmptyMessage)
  } else {
    Ok(text)
  }
}

/// Delivers an outgoing message. Timeouts and retries are the transport's
/// business; the chat component only sees success or failure.
pub trait MessageTransport: Send + Sync {
  fn deliver<'a>(
    &'a self,
    message: &'a ChatMessage,
  ) -> impl Future<Output = bool> + Send + 'a;
}

impl<T: MessageTransport> MessageTransport for Arc<T> {
  fn deliver<'a>(
    &'a self,
    message: &'a ChatMessage,
  ) -> impl Future<Output = bool> + Send + 'a {
    (**self).deliver(message)
  }
}
