//! Multi-agent orchestration for Python code generation.
//!
//! A [`MessageBus`] routes typed [`Message`]s between role-driven [`Agent`]s:
//! a coordinator plans, a coder writes source, a tester writes a unittest
//! suite, and a runner executes both in a sandbox. The [`Orchestrator`]
//! wires a roster together and turns one task string into a [`RunReport`].

mod agent;
mod bus;
mod error;
mod llm;
mod memory;
mod message;
mod orchestrator;
pub mod roles;

pub use agent::Agent;
pub use agent::AgentContext;
pub use agent::AgentRole;
pub use agent::AgentStatus;
pub use agent::RoleBehavior;
pub use bus::BusObserver;
pub use bus::DrainOutcome;
pub use bus::MessageBus;
pub use bus::DEFAULT_HOP_BUDGET;
pub use error::AgentError;
pub use error::GenerationError;
pub use llm::GenerationConfig;
pub use llm::Generator;
pub use llm::OllamaGenerator;
pub use llm::ScriptedGenerator;
pub use llm::SharedGenerator;
pub use memory::Memory;
pub use memory::HISTORY_LIMIT;
pub use message::Message;
pub use message::MessageKind;
pub use message::Metadata;
pub use orchestrator::standard_roster;
pub use orchestrator::AgentSpec;
pub use orchestrator::AgentSummary;
pub use orchestrator::Orchestrator;
pub use orchestrator::RunReport;
pub use orchestrator::WorkflowStatus;
