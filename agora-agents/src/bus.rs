//! In-process message routing.
//!
//! Delivery is a bounded work loop over a FIFO queue rather than recursive
//! dispatch: each delivered message may enqueue replies, and a hop budget
//! caps total deliveries so a ping-pong between two agents cannot spin
//! forever.

use std::collections::VecDeque;

use indexmap::IndexMap;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::agent::Agent;
use crate::message::Message;
use crate::message::MessageKind;

pub const DEFAULT_HOP_BUDGET: usize = 64;

/// Side channel for anyone who wants to watch traffic (persistence,
/// broadcast, metrics). Observer failures are logged and never stall
/// delivery.
pub trait BusObserver: Send {
    fn on_message(&mut self, msg: &Message) -> anyhow::Result<()>;

    fn on_dropped(&mut self, _msg: &Message, _reason: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// What a drain pass did.
#[derive(Debug, Default)]
pub struct DrainOutcome {
    pub delivered: usize,
    pub dropped: usize,
    pub budget_exhausted: bool,
    /// The message that ended the run, when one was seen.
    pub terminal: Option<Message>,
}

pub struct MessageBus {
    agents: IndexMap<String, Agent>,
    queue: VecDeque<Message>,
    trace: Vec<Message>,
    observers: Vec<Box<dyn BusObserver>>,
    hop_budget: usize,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            agents: IndexMap::new(),
            queue: VecDeque::new(),
            trace: Vec::new(),
            observers: Vec::new(),
            hop_budget: DEFAULT_HOP_BUDGET,
        }
    }

    pub fn with_hop_budget(mut self, hop_budget: usize) -> Self {
        self.hop_budget = hop_budget;
        self
    }

    /// Registering under an existing id replaces the previous agent.
    pub fn register(&mut self, agent: Agent) {
        info!(agent = %agent.id, role = agent.role.as_str(), "registering agent");
        self.agents.insert(agent.id.clone(), agent);
    }

    pub fn add_observer(&mut self, observer: Box<dyn BusObserver>) {
        self.observers.push(observer);
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Every message delivered so far, in delivery order.
    pub fn trace(&self) -> &[Message] {
        &self.trace
    }

    /// Queue a message for the next drain pass.
    pub fn dispatch(&mut self, msg: Message) {
        self.queue.push_back(msg);
    }

    /// Deliver queued messages until the queue empties, the hop budget runs
    /// out, or a terminal message is seen. The terminal condition is a
    /// delivered `Data` message originating from the runner agent, which is
    /// the last hop of a workflow.
    pub fn drain(&mut self) -> DrainOutcome {
        let mut outcome = DrainOutcome::default();
        while let Some(msg) = self.queue.pop_front() {
            if outcome.delivered >= self.hop_budget {
                warn!(
                    budget = self.hop_budget,
                    pending = self.queue.len() + 1,
                    "hop budget exhausted, stopping delivery"
                );
                outcome.budget_exhausted = true;
                break;
            }

            let Some(agent) = self.agents.get_mut(&msg.to_agent) else {
                warn!(to = %msg.to_agent, from = %msg.from_agent, "dropping message for unknown agent");
                outcome.dropped += 1;
                self.notify_dropped(&msg, "unknown agent");
                continue;
            };

            debug!(from = %msg.from_agent, to = %msg.to_agent, kind = ?msg.kind, "delivering");
            let replies = agent.process(&msg);
            outcome.delivered += 1;
            self.notify_delivered(&msg);

            let terminal = msg.kind == MessageKind::Data && msg.from_agent == "runner";
            self.trace.push(msg);
            for reply in replies {
                self.queue.push_back(reply);
            }
            if terminal {
                outcome.terminal = self.trace.last().cloned();
                break;
            }
        }
        outcome
    }

    fn notify_delivered(&mut self, msg: &Message) {
        for observer in &mut self.observers {
            if let Err(err) = observer.on_message(msg) {
                warn!(error = %err, "bus observer failed");
            }
        }
    }

    fn notify_dropped(&mut self, msg: &Message, reason: &str) {
        for observer in &mut self.observers {
            if let Err(err) = observer.on_dropped(msg, reason) {
                warn!(error = %err, "bus observer failed");
            }
        }
    }
}
