//! Change Event Module
//!
//! Facts about writes elsewhere in the system, kept in a bounded,
//! time-windowed log so cached aggregates can be patched instead of
//! recomputed.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::Namespace;
use crate::error::{CacheError, Result};

// == Change Kind ==
/// What happened to an item or user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    ItemCreated,
    ItemUpdated,
    ItemDeleted,
    UserUpdated,
    VerificationChanged,
}

impl ChangeKind {
    /// Events keyed by an item id.
    pub fn is_item_event(self) -> bool {
        matches!(
            self,
            ChangeKind::ItemCreated | ChangeKind::ItemUpdated | ChangeKind::ItemDeleted
        )
    }

    /// Events keyed by a username.
    pub fn is_user_event(self) -> bool {
        matches!(self, ChangeKind::UserUpdated | ChangeKind::VerificationChanged)
    }

    /// Whether entries in `namespace` can be affected by this kind of event.
    pub fn affects(self, namespace: Namespace) -> bool {
        match namespace {
            Namespace::Listings => self.is_item_event() || self.is_user_event(),
            Namespace::Search => self.is_item_event(),
            Namespace::Other => false,
        }
    }
}

// == Change Event ==
/// A change posted by the write path after a database write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Overwritten by the log on insertion
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ChangeEvent {
    /// Creates an item event (`item_created`, `item_updated`, `item_deleted`).
    pub fn item(kind: ChangeKind, item_id: impl Into<String>) -> Self {
        Self {
            kind,
            item_id: Some(item_id.into()),
            user_id: None,
            username: None,
            timestamp: Utc::now(),
            data: None,
        }
    }

    /// Creates a user event (`user_updated`, `verification_changed`).
    pub fn user(kind: ChangeKind, username: impl Into<String>) -> Self {
        Self {
            kind,
            item_id: None,
            user_id: None,
            username: Some(username.into()),
            timestamp: Utc::now(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    // == Validate ==
    /// Checks the event carries the identity its kind needs.
    ///
    /// Item events need an item id, either `itemId` or `data.id`; user
    /// events need a username.
    pub fn validate(&self) -> Result<()> {
        if self.kind.is_item_event() && self.item_id().is_none() {
            return Err(CacheError::MalformedEvent(format!(
                "{:?} requires an itemId",
                self.kind
            )));
        }
        if self.kind.is_user_event() && self.username.is_none() {
            return Err(CacheError::MalformedEvent(format!(
                "{:?} requires a username",
                self.kind
            )));
        }
        Ok(())
    }

    /// The affected item id, falling back to `data.id`.
    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref().or_else(|| {
            self.data
                .as_ref()
                .and_then(|data| data.get("id"))
                .and_then(Value::as_str)
        })
    }
}

// == Logged Event ==
/// A change event as stored in the log.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    /// Monotonic sequence number assigned by the log, starting at 1
    pub seq: u64,
    /// The event, with `timestamp` set to the insertion time
    pub event: ChangeEvent,
}

// == Change Event Log ==
/// Most-recent-first list of change events, bounded in length.
#[derive(Debug)]
pub struct ChangeEventLog {
    events: VecDeque<LoggedEvent>,
    max_events: usize,
    window: Duration,
    last_seq: u64,
}

impl ChangeEventLog {
    // == Constructor ==
    /// Creates a log holding at most `max_events`, each relevant for `window`.
    pub fn new(max_events: usize, window: Duration) -> Self {
        Self {
            events: VecDeque::new(),
            max_events,
            window,
            last_seq: 0,
        }
    }

    // == Add ==
    /// Prepends `event` stamped with `now`, dropping the oldest events if the
    /// log is over its bound. Returns the sequence number assigned.
    pub fn add(&mut self, mut event: ChangeEvent, now: DateTime<Utc>) -> u64 {
        self.last_seq += 1;
        event.timestamp = now;
        self.events.push_front(LoggedEvent {
            seq: self.last_seq,
            event,
        });
        self.events.truncate(self.max_events);
        self.last_seq
    }

    // == Relevant To ==
    /// Events after `after_seq`, still inside the window at `now`, that can
    /// affect `namespace`. Returned oldest first.
    pub fn relevant_to(
        &self,
        namespace: Namespace,
        after_seq: u64,
        now: DateTime<Utc>,
    ) -> Vec<LoggedEvent> {
        self.events
            .iter()
            .rev()
            .filter(|logged| self.is_relevant(logged, namespace, after_seq, now))
            .cloned()
            .collect()
    }

    /// Cheap form of `relevant_to` for the read path.
    pub fn has_relevant(&self, namespace: Namespace, after_seq: u64, now: DateTime<Utc>) -> bool {
        self.events
            .iter()
            .any(|logged| self.is_relevant(logged, namespace, after_seq, now))
    }

    fn is_relevant(
        &self,
        logged: &LoggedEvent,
        namespace: Namespace,
        after_seq: u64,
        now: DateTime<Utc>,
    ) -> bool {
        logged.seq > after_seq
            && now - logged.event.timestamp <= self.window
            && logged.event.kind.affects(namespace)
    }

    // == Prune Expired ==
    /// Physically drops events that have aged out of the window.
    ///
    /// Returns the number of events removed.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.events.len();
        let window = self.window;
        self.events
            .retain(|logged| now - logged.event.timestamp <= window);
        before - self.events.len()
    }

    // == Head Seq ==
    /// Highest sequence number issued so far; 0 before the first event.
    pub fn head_seq(&self) -> u64 {
        self.last_seq
    }

    // == Clear ==
    /// Drops every event. Sequence numbers keep counting up.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }

    /// Events from most to least recent.
    pub fn iter(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.events.iter()
    }
}
