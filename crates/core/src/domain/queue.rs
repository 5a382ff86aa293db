// Queue Domain Model

use super::error::{DomainError, Result};
use super::item::{QueueItem, SessionId};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Default queue capacity
pub const DEFAULT_MAX_SIZE: i64 = 10_000;

/// Queue capacity bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Bounded(usize),
    Unbounded,
}

impl Capacity {
    /// Parse the integer form used on the wire (`-1` = unbounded)
    pub fn from_max_size(max_size: i64) -> Result<Self> {
        match max_size {
            -1 => Ok(Capacity::Unbounded),
            n if n < -1 => Err(DomainError::InvalidArgument(format!(
                "max size must be -1 (unbounded) or >= 0, got {}",
                n
            ))),
            n => usize::try_from(n)
                .map(Capacity::Bounded)
                .map_err(|_| DomainError::InvalidArgument(format!("max size too large: {}", n))),
        }
    }

    pub fn as_max_size(&self) -> i64 {
        match self {
            Capacity::Bounded(n) => i64::try_from(*n).unwrap_or(i64::MAX),
            Capacity::Unbounded => -1,
        }
    }

    fn admits(&self, len: usize) -> bool {
        match self {
            Capacity::Bounded(n) => len < *n,
            Capacity::Unbounded => true,
        }
    }
}

/// Queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub name: String,
    pub max_size: i64,
    pub state_path: Option<PathBuf>,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_size: DEFAULT_MAX_SIZE,
            state_path: None,
        }
    }

    pub fn with_max_size(mut self, max_size: i64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_state_path(mut self, state_path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(state_path.into());
        self
    }
}

/// Selects items for `FileQueue::remove_items`
pub enum RemoveCriterion<'a> {
    /// Exact source path match
    SourcePath(&'a Path),
    /// Items attributed to the given session
    Session(&'a str),
    /// Arbitrary predicate, `true` removes the item
    Predicate(&'a dyn Fn(&QueueItem) -> bool),
    All,
}

impl RemoveCriterion<'_> {
    fn matches(&self, item: &QueueItem) -> bool {
        match self {
            RemoveCriterion::SourcePath(path) => item.source_path() == *path,
            RemoveCriterion::Session(session) => item.session_id == *session,
            RemoveCriterion::Predicate(pred) => pred(item),
            RemoveCriterion::All => true,
        }
    }
}

/// Ordered, size-bounded queue of file-transfer items
///
/// Single-owner: all mutation goes through `&mut self`. Callers that share
/// a queue between tasks must guard it themselves (e.g. `tokio::sync::Mutex`).
#[derive(Debug, Clone)]
pub struct FileQueue {
    name: String,
    items: VecDeque<QueueItem>,
    capacity: Capacity,
    state_path: Option<PathBuf>,
    session_id: SessionId,
    created_utc: DateTime<Utc>,

    // Bookkeeping owned by the consumer loop
    pub processed_count: u64,
    pub failed_count: u64,
}

impl FileQueue {
    /// Create an empty queue
    ///
    /// # Arguments
    ///
    /// * `config` - Name, capacity and default state path
    /// * `session_id` - Session stamped on every enqueued item (injected)
    /// * `created_utc` - Creation timestamp (injected, not system time)
    pub fn new(config: QueueConfig, session_id: SessionId, created_utc: DateTime<Utc>) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "queue name cannot be empty".to_string(),
            ));
        }
        if session_id.is_empty() {
            return Err(DomainError::InvalidArgument(
                "session id cannot be empty".to_string(),
            ));
        }
        let capacity = Capacity::from_max_size(config.max_size)?;

        Ok(Self {
            name: config.name,
            items: VecDeque::new(),
            capacity,
            state_path: config.state_path,
            session_id,
            created_utc,
            processed_count: 0,
            failed_count: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn created_utc(&self) -> DateTime<Utc> {
        self.created_utc
    }

    pub fn state_path(&self) -> Option<&Path> {
        self.state_path.as_deref()
    }

    pub fn set_state_path(&mut self, state_path: impl Into<PathBuf>) {
        self.state_path = Some(state_path.into());
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        !self.capacity.admits(self.items.len())
    }

    /// Items in processing order
    pub fn iter(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    /// Append an item at the tail, stamping this queue's session on it
    ///
    /// Fails with `InvalidArgument` for an empty source path and with
    /// `QueueFull` when bounded and at capacity; the queue is left
    /// untouched in both cases.
    pub fn enqueue(&mut self, mut item: QueueItem) -> Result<()> {
        if item.source_path().as_os_str().is_empty() {
            return Err(DomainError::InvalidArgument(
                "source path cannot be empty".to_string(),
            ));
        }
        self.ensure_room()?;
        item.session_id = self.session_id.clone();
        self.items.push_back(item);
        Ok(())
    }

    /// Append an item keeping its own session (used by restore)
    pub(crate) fn push_restored(&mut self, mut item: QueueItem) -> Result<()> {
        self.ensure_room()?;
        if item.session_id.is_empty() {
            item.session_id = self.session_id.clone();
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Head item without mutation
    pub fn peek(&self) -> Option<&QueueItem> {
        self.items.front()
    }

    /// Remove the head item and count one processing attempt on it
    pub fn dequeue(&mut self) -> Option<QueueItem> {
        let mut item = self.items.pop_front()?;
        item.record_attempt();
        Some(item)
    }

    /// Remove the head item without touching its attempt counter
    pub fn dequeue_uncounted(&mut self) -> Option<QueueItem> {
        self.items.pop_front()
    }

    /// Put a just-dequeued item back at the head
    ///
    /// Capacity is not checked: the slot was freed by the matching dequeue.
    pub fn return_to_front(&mut self, item: QueueItem) {
        self.items.push_front(item);
    }

    /// Remove every item matching `criterion` in a single pass
    ///
    /// Relative order of the retained items is preserved.
    /// Returns the number of removed items.
    pub fn remove_items(&mut self, criterion: RemoveCriterion<'_>) -> usize {
        let before = self.items.len();
        if matches!(criterion, RemoveCriterion::All) {
            self.items.clear();
        } else {
            self.items.retain(|item| !criterion.matches(item));
        }
        before - self.items.len()
    }

    /// Remove all items, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        self.remove_items(RemoveCriterion::All)
    }

    fn ensure_room(&self) -> Result<()> {
        match self.capacity {
            Capacity::Bounded(capacity) if self.items.len() >= capacity => {
                Err(DomainError::QueueFull {
                    name: self.name.clone(),
                    capacity,
                })
            }
            _ => Ok(()),
        }
    }
}
