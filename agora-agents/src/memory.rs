//! Per-agent conversation memory.

use std::collections::VecDeque;

use serde_json::Value;

use crate::message::Message;

/// Maximum number of messages retained in history; oldest evicted first.
pub const HISTORY_LIMIT: usize = 50;
/// Number of recent messages included in the derived prompt context.
const CONTEXT_MESSAGES: usize = 10;
/// Per-message content preview length in the prompt context.
const PREVIEW_LEN: usize = 100;

#[derive(Debug, Default)]
pub struct Memory {
    history: VecDeque<Message>,
    long_term: serde_json::Map<String, Value>,
    working_context: serde_json::Map<String, Value>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, evicting from the front once over capacity.
    pub fn record(&mut self, message: Message) {
        self.history.push_back(message);
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &Message> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn remember(&mut self, key: impl Into<String>, value: Value) {
        self.long_term.insert(key.into(), value);
    }

    pub fn recall(&self, key: &str) -> Option<&Value> {
        self.long_term.get(key)
    }

    pub fn set_context(&mut self, key: impl Into<String>, value: Value) {
        self.working_context.insert(key.into(), value);
    }

    pub fn context(&self, key: &str) -> Option<&Value> {
        self.working_context.get(key)
    }

    /// Derived prompt context: the last few messages as one-line previews.
    /// Computed on demand, never stored.
    pub fn prompt_context(&self) -> String {
        let mut out = String::from("Recent conversation:\n");
        let skip = self.history.len().saturating_sub(CONTEXT_MESSAGES);
        for msg in self.history.iter().skip(skip) {
            out.push_str(&format!(
                "{} -> {}: {}\n",
                msg.from_agent,
                msg.to_agent,
                msg.preview(PREVIEW_LEN)
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn msg(n: usize) -> Message {
        Message::data("a", "b", format!("message {n}"))
    }

    #[test]
    fn history_is_bounded_with_fifo_eviction() {
        let mut memory = Memory::new();
        for n in 0..120 {
            memory.record(msg(n));
        }
        assert_eq!(memory.len(), HISTORY_LIMIT);
        let first = memory.history().next().expect("nonempty");
        assert_eq!(first.content, "message 70");
        let last = memory.history().last().expect("nonempty");
        assert_eq!(last.content, "message 119");
    }

    #[test]
    fn prompt_context_covers_last_ten() {
        let mut memory = Memory::new();
        for n in 0..15 {
            memory.record(msg(n));
        }
        let context = memory.prompt_context();
        assert!(!context.contains("message 4\n"));
        assert!(context.contains("message 5\n"));
        assert!(context.contains("message 14\n"));
    }

    #[test]
    fn prompt_context_truncates_long_content() {
        let mut memory = Memory::new();
        memory.record(Message::data("a", "b", "x".repeat(500)));
        let context = memory.prompt_context();
        let line = context.lines().nth(1).expect("context line");
        assert_eq!(line, format!("a -> b: {}", "x".repeat(100)));
    }

    #[test]
    fn long_term_and_working_context_are_separate() {
        let mut memory = Memory::new();
        memory.remember("lesson", "value".into());
        memory.set_context("current", 1.into());
        assert_eq!(memory.recall("lesson"), Some(&"value".into()));
        assert_eq!(memory.context("current"), Some(&1.into()));
        assert_eq!(memory.recall("current"), None);
    }
}
