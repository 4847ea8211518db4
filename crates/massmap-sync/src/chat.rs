//! Chat distribution.
//!
//! Keeps the ordered, append-only list of chat messages and publishes the
//! whole list to subscribers whenever it grows. Subscribers hold a
//! [`watch::Receiver`]; dropping it ends the subscription.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use massmap_core::{
  chat::{ChatMessage, MessageTransport, validate_message},
  preferences::{KeyValueStore, Preferences},
};
use tokio::sync::watch;

use crate::clock::{Clock, SystemClock};

pub type MessageList = Arc<[ChatMessage]>;

pub struct ChatDistribution<T, C = SystemClock> {
  transport: T,
  clock:     C,
  sender_id: Option<String>,
  messages:  watch::Sender<MessageList>,
}

impl<T: MessageTransport> ChatDistribution<T, SystemClock> {
  pub fn new(transport: T) -> Self { Self::with_clock(transport, SystemClock) }
}

impl<T: MessageTransport, C: Clock> ChatDistribution<T, C> {
  pub fn with_clock(transport: T, clock: C) -> Self {
    let (messages, _) = watch::channel(MessageList::from(Vec::new()));
    Self {
      transport,
      clock,
      sender_id: None,
      messages,
    }
  }

  /// Tag outgoing messages with the local participant id.
  pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
    self.sender_id = Some(sender_id.into());
    self
  }

  /// Receive the full message list every time it changes.
  pub fn subscribe(&self) -> watch::Receiver<MessageList> {
    self.messages.subscribe()
  }

  pub fn messages(&self) -> MessageList { self.messages.borrow().clone() }

  /// Send `text` and report whether it was delivered.
  ///
  /// Blank text is refused without touching the transport. The message is
  /// only appended once the transport confirms delivery.
  pub async fn send(&self, text: &str) -> bool {
    if validate_message(text).is_err() {
      tracing::debug!("refusing to send blank chat message");
      return false;
    }

    let mut message = ChatMessage::new(text, self.clock.now());
    message.sender_id = self.sender_id.clone();

    if !self.transport.deliver(&message).await {
      tracing::debug!("could not send chat message");
      return false;
    }

    self.append(vec![message]);
    true
  }

  /// Merge a refreshed message list from the server. Messages already known
  /// are skipped; new ones are appended in the order given. Returns how many
  /// were appended.
  pub fn ingest<I>(&self, incoming: I) -> usize
  where
    I: IntoIterator<Item = ChatMessage>,
  {
    let mut known: HashSet<MessageKey> =
      self.messages().iter().map(message_key).collect();
    let fresh: Vec<ChatMessage> = incoming
      .into_iter()
      .filter(|message| known.insert(message_key(message)))
      .collect();

    let appended = fresh.len();
    if appended > 0 {
      self.append(fresh);
    }
    appended
  }

  /// Number of messages newer than `since`; every message counts when
  /// nothing has been read yet.
  pub fn unread_count(&self, since: Option<DateTime<Utc>>) -> usize {
    let messages = self.messages();
    match since {
      Some(since) => messages.iter().filter(|m| m.timestamp > since).count(),
      None => messages.len(),
    }
  }

  /// Remember the newest message as read.
  pub async fn mark_read<K: KeyValueStore>(
    &self,
    prefs: &Preferences<K>,
  ) -> Result<(), K::Error> {
    let newest = self.messages().iter().map(|m| m.timestamp).max();
    match newest {
      Some(at) => prefs.set_last_message_read(at).await,
      None => Ok(()),
    }
  }

  fn append(&self, new: Vec<ChatMessage>) {
    self.messages.send_modify(|list| {
      let mut next = list.to_vec();
      next.extend(new);
      *list = MessageList::from(next);
    });
  }
}

/// Two messages with the same timestamp, text and sender are the same
/// message.
type MessageKey = (DateTime<Utc>, String, Option<String>);

fn message_key(message: &ChatMessage) -> MessageKey {
  (message.timestamp, message.text.clone(), message.sender_id.clone())
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

  use chrono::TimeZone;
  use massmap_core::preferences::MemoryStore;

  use super::*;
  use crate::clock::ManualClock;

  #[derive(Default)]
  struct FakeTransport {
    calls:   AtomicUsize,
    failing: AtomicBool,
  }

  impl MessageTransport for FakeTransport {
    async fn deliver(&self, _message: &ChatMessage) -> bool {
      self.calls.fetch_add(1, Ordering::SeqCst);
      !self.failing.load(Ordering::SeqCst)
    }
  }

  fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 29, hour, 0, 0).unwrap()
  }

  fn chat() -> ChatDistribution<Arc<FakeTransport>, ManualClock> {
    ChatDistribution::with_clock(
      Arc::new(FakeTransport::default()),
      ManualClock::new(at(18)),
    )
  }

  #[tokio::test]
  async fn delivered_message_is_appended_and_published() {
    let chat = chat().with_sender("me");
    let mut rx = chat.subscribe();

    assert!(chat.send("hello").await);

    assert!(rx.has_changed().unwrap());
    let published = rx.borrow_and_update().clone();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].text, "hello");
    assert_eq!(published[0].sender_id.as_deref(), Some("me"));
    assert_eq!(published[0].timestamp, at(18));
  }

  #[tokio::test]
  async fn failed_delivery_leaves_list_unchanged() {
    let chat = chat();
    chat.transport.failing.store(true, Ordering::SeqCst);
    let rx = chat.subscribe();

    assert!(!chat.send("hello").await);

    assert!(chat.messages().is_empty());
    assert!(!rx.has_changed().unwrap());
    assert_eq!(chat.transport.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn blank_text_never_reaches_transport() {
    let chat = chat();

    assert!(!chat.send("   ").await);

    assert!(chat.messages().is_empty());
    assert_eq!(chat.transport.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn sends_append_in_order() {
    let chat = chat();
    chat.send("one").await;
    chat.send("two").await;

    let texts: Vec<_> = chat.messages().iter().map(|m| m.text.clone()).collect();
    assert_eq!(texts, ["one", "two"]);
  }

  #[test]
  fn ingest_skips_known_messages() {
    let chat = chat();
    let first = ChatMessage::new("a", at(10));
    let second = ChatMessage::new("b", at(11));

    assert_eq!(chat.ingest([first.clone()]), 1);
    assert_eq!(chat.ingest([first, second.clone(), second]), 1);

    let texts: Vec<_> = chat.messages().iter().map(|m| m.text.clone()).collect();
    assert_eq!(texts, ["a", "b"]);
  }

  #[tokio::test]
  async fn unread_tracking_uses_last_read_preference() {
    let chat = chat();
    chat.ingest([ChatMessage::new("a", at(10)), ChatMessage::new("b", at(11))]);
    let prefs = Preferences::new(MemoryStore::new());

    let since = prefs.last_message_read().await.unwrap();
    assert_eq!(chat.unread_count(since), 2);

    chat.mark_read(&prefs).await.unwrap();
    let since = prefs.last_message_read().await.unwrap();
    assert_eq!(since, Some(at(11)));
    assert_eq!(chat.unread_count(since), 0);

    chat.ingest([ChatMessage::new("c", at(12))]);
    assert_eq!(chat.unread_count(since), 1);
  }
}
