use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::error::AgentError;
use crate::memory::Memory;
use crate::message::Message;
use crate::message::MessageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Coordinator,
    Coder,
    Tester,
    Runner,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Coordinator => "coordinator",
            AgentRole::Coder => "coder",
            AgentRole::Tester => "tester",
            AgentRole::Runner => "runner",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Working,
    Waiting,
    Completed,
    Error,
}

/// Read-only view of the owning agent handed to behavior callbacks.
pub struct AgentContext<'a> {
    pub id: &'a str,
    pub memory: &'a Memory,
}

/// Role-specific message handling. Defaults acknowledge and move on so a
/// behavior only overrides the kinds it cares about.
pub trait RoleBehavior: Send {
    fn on_task(
        &mut self,
        ctx: &AgentContext<'_>,
        msg: &Message,
    ) -> Result<Vec<Message>, AgentError> {
        Ok(vec![Message::response(
            ctx.id,
            &msg.from_agent,
            format!("Processed task: {}", msg.preview(50)),
        )])
    }

    fn on_data(
        &mut self,
        ctx: &AgentContext<'_>,
        msg: &Message,
    ) -> Result<Vec<Message>, AgentError> {
        Ok(vec![Message::response(
            ctx.id,
            &msg.from_agent,
            format!("Received data: {}", msg.preview(50)),
        )])
    }

    fn on_request(
        &mut self,
        ctx: &AgentContext<'_>,
        msg: &Message,
    ) -> Result<Vec<Message>, AgentError> {
        Ok(vec![Message::response(
            ctx.id,
            &msg.from_agent,
            format!("Handled request: {}", msg.preview(50)),
        )])
    }

    fn on_response(
        &mut self,
        _ctx: &AgentContext<'_>,
        _msg: &Message,
    ) -> Result<Vec<Message>, AgentError> {
        Ok(Vec::new())
    }

    fn on_error(
        &mut self,
        ctx: &AgentContext<'_>,
        msg: &Message,
    ) -> Result<Vec<Message>, AgentError> {
        warn!(agent = ctx.id, from = %msg.from_agent, "received error report: {}", msg.preview(120));
        Ok(Vec::new())
    }

    fn on_status(
        &mut self,
        ctx: &AgentContext<'_>,
        msg: &Message,
    ) -> Result<Vec<Message>, AgentError> {
        Ok(vec![Message::status(
            ctx.id,
            &msg.from_agent,
            format!("{} is available", ctx.id),
        )])
    }
}

/// An addressable participant on the bus: identity, private memory, and a
/// boxed behavior that does the actual work.
pub struct Agent {
    pub id: String,
    pub role: AgentRole,
    pub description: String,
    pub status: AgentStatus,
    pub memory: Memory,
    behavior: Box<dyn RoleBehavior>,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        role: AgentRole,
        description: impl Into<String>,
        behavior: Box<dyn RoleBehavior>,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            description: description.into(),
            status: AgentStatus::Idle,
            memory: Memory::default(),
            behavior,
        }
    }

    /// Handle one incoming message and return the replies to dispatch.
    ///
    /// This never panics and never surfaces an error to the bus: handler
    /// failures become a single error message back to the sender, with the
    /// agent left in the `Error` status.
    pub fn process(&mut self, msg: &Message) -> Vec<Message> {
        self.status = AgentStatus::Working;
        self.memory.record(msg.clone());
        debug!(agent = %self.id, kind = ?msg.kind, from = %msg.from_agent, "processing message");

        let ctx = AgentContext {
            id: &self.id,
            memory: &self.memory,
        };
        let result = match msg.kind {
            MessageKind::Task => self.behavior.on_task(&ctx, msg),
            MessageKind::Data => self.behavior.on_data(&ctx, msg),
            MessageKind::Request => self.behavior.on_request(&ctx, msg),
            MessageKind::Response => self.behavior.on_response(&ctx, msg),
            MessageKind::Error => self.behavior.on_error(&ctx, msg),
            MessageKind::Status => self.behavior.on_status(&ctx, msg),
            MessageKind::Review | MessageKind::Coordination => Ok(vec![Message::error(
                &self.id,
                &msg.from_agent,
                format!("{} cannot handle {:?} messages", self.id, msg.kind),
            )]),
        };

        match result {
            Ok(replies) => {
                self.status = AgentStatus::Idle;
                replies
            }
            Err(err) => {
                warn!(agent = %self.id, error = %err, "handler failed");
                self.status = AgentStatus::Error;
                vec![Message::error(
                    &self.id,
                    &msg.from_agent,
                    format!("Error processing message: {err}"),
                )]
            }
        }
    }
}
