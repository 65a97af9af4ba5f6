//! The inter-agent message value object.
//!
//! Messages are immutable once created: a retry is a brand-new message that
//! records its ancestry through `parent_message_id`, never a mutation of the
//! original.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

pub type Metadata = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Task,
    Data,
    Request,
    Response,
    Error,
    Status,
    Review,
    Coordination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub from_agent: String,
    pub to_agent: String,
    pub kind: MessageKind,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub parent_message_id: Option<Uuid>,
}

impl Message {
    pub fn new(
        from_agent: impl Into<String>,
        to_agent: impl Into<String>,
        kind: MessageKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_agent: from_agent.into(),
            to_agent: to_agent.into(),
            kind,
            content: content.into(),
            metadata: Metadata::new(),
            created_at: Utc::now(),
            retry_count: 0,
            parent_message_id: None,
        }
    }

    pub fn task(from: impl Into<String>, to: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(from, to, MessageKind::Task, content)
    }

    pub fn data(from: impl Into<String>, to: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(from, to, MessageKind::Data, content)
    }

    pub fn response(
        from: impl Into<String>,
        to: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(from, to, MessageKind::Response, content)
    }

    pub fn error(
        from: impl Into<String>,
        to: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(from, to, MessageKind::Error, content)
    }

    pub fn status(
        from: impl Into<String>,
        to: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(from, to, MessageKind::Status, content)
    }

    /// Builder-style metadata attachment, used while assembling a new
    /// message; existing messages are never modified in place.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn meta_bool(&self, key: &str) -> Option<bool> {
        self.metadata.get(key).and_then(Value::as_bool)
    }

    /// A fresh copy of this message for a retry attempt: new id and
    /// timestamp, incremented retry count, ancestry pointing back here.
    pub fn create_retry(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_agent: self.from_agent.clone(),
            to_agent: self.to_agent.clone(),
            kind: self.kind,
            content: self.content.clone(),
            metadata: self.metadata.clone(),
            created_at: Utc::now(),
            retry_count: self.retry_count + 1,
            parent_message_id: Some(self.id),
        }
    }

    /// Short display form for traces and prompt context.
    pub fn preview(&self, max_len: usize) -> &str {
        match self.content.char_indices().nth(max_len) {
            Some((idx, _)) => &self.content[..idx],
            None => &self.content,
        }
    }
}
