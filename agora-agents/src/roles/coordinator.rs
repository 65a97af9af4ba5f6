use serde::Deserialize;
use tracing::info;
use tracing::warn;

use crate::agent::AgentContext;
use crate::agent::RoleBehavior;
use crate::error::AgentError;
use crate::llm::GenerationConfig;
use crate::llm::SharedGenerator;
use crate::message::Message;
use crate::message::MessageKind;
use crate::roles::CODER;
use crate::roles::TESTER;

#[derive(Debug, Deserialize)]
struct Plan {
    #[serde(default)]
    steps: Vec<PlanStep>,
}

#[derive(Debug, Deserialize)]
struct PlanStep {
    agent: String,
    task: String,
    #[serde(default = "default_priority")]
    priority: i64,
}

fn default_priority() -> i64 {
    1
}

/// Breaks an incoming task into a plan and fans it out to worker agents.
///
/// The model is asked for a JSON plan; anything that does not parse falls
/// back to a fixed two-step plan so a flaky model never stalls a workflow.
pub struct CoordinatorBehavior {
    generator: SharedGenerator,
    config: GenerationConfig,
}

impl CoordinatorBehavior {
    pub fn new(generator: SharedGenerator, config: GenerationConfig) -> Self {
        Self { generator, config }
    }

    fn plan_prompt(&self, task: &str, context: &str) -> String {
        format!(
            r#"You are a smart coordinator managing a team of AI agents.

Current task: {task}
Recent context: {context}

Your job is to:
1. Break down the task into steps
2. Decide which agents should handle each step
3. Create clear instructions for each agent

Available agents:
- coder: Writes code and implements features
- tester: Creates test cases and validates code
- runner: Executes tests and reports results

Respond with a JSON structure like this:
{{
    "steps": [
        {{
            "agent": "coder",
            "task": "Write a Python function that...",
            "priority": 1
        }},
        {{
            "agent": "tester",
            "task": "Create test cases for the function",
            "priority": 2
        }}
    ]
}}"#
        )
    }

    fn fallback_plan(task: &str) -> Vec<PlanStep> {
        vec![
            PlanStep {
                agent: CODER.to_string(),
                task: task.to_string(),
                priority: 1,
            },
            PlanStep {
                agent: TESTER.to_string(),
                task: "Create tests for the generated code".to_string(),
                priority: 2,
            },
        ]
    }
}

impl RoleBehavior for CoordinatorBehavior {
    fn on_task(
        &mut self,
        ctx: &AgentContext<'_>,
        msg: &Message,
    ) -> Result<Vec<Message>, AgentError> {
        let prompt = self.plan_prompt(&msg.content, &ctx.memory.prompt_context());
        let reply = self.generator.generate(&prompt, &self.config)?;

        let mut steps = match serde_json::from_str::<Plan>(reply.trim()) {
            Ok(plan) if !plan.steps.is_empty() => plan.steps,
            Ok(_) => {
                warn!(agent = ctx.id, "plan had no steps, using fallback");
                Self::fallback_plan(&msg.content)
            }
            Err(err) => {
                warn!(agent = ctx.id, error = %err, "plan did not parse, using fallback");
                Self::fallback_plan(&msg.content)
            }
        };
        steps.sort_by_key(|step| step.priority);
        info!(agent = ctx.id, steps = steps.len(), "created workflow plan");

        Ok(steps
            .into_iter()
            .map(|step| {
                Message::new(ctx.id, &step.agent, MessageKind::Task, step.task)
                    .with_meta("priority", step.priority)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedGenerator;
    use crate::memory::Memory;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn coordinator(reply: &str) -> CoordinatorBehavior {
        CoordinatorBehavior::new(
            Arc::new(ScriptedGenerator::new([reply])),
            GenerationConfig::default(),
        )
    }

    fn ctx<'a>(memory: &'a Memory) -> AgentContext<'a> {
        AgentContext {
            id: "coordinator",
            memory,
        }
    }

    #[test]
    fn valid_plan_fans_out_in_priority_order() {
        let plan = r#"{"steps": [
            {"agent": "tester", "task": "write tests", "priority": 2},
            {"agent": "coder", "task": "write the function", "priority": 1}
        ]}"#;
        let mut behavior = coordinator(plan);
        let memory = Memory::default();
        let replies = behavior
            .on_task(&ctx(&memory), &Message::task("system", "coordinator", "add numbers"))
            .expect("plan");
        let targets: Vec<&str> = replies.iter().map(|m| m.to_agent.as_str()).collect();
        assert_eq!(targets, vec!["coder", "tester"]);
        assert!(replies.iter().all(|m| m.kind == MessageKind::Task));
    }

    #[test]
    fn prose_reply_falls_back_to_default_plan() {
        let mut behavior = coordinator("Sure! Here is my plan: first the coder...");
        let memory = Memory::default();
        let task = Message::task("system", "coordinator", "reverse a string");
        let replies = behavior.on_task(&ctx(&memory), &task).expect("fallback");
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].to_agent, "coder");
        assert_eq!(replies[0].content, "reverse a string");
        assert_eq!(replies[1].to_agent, "tester");
    }

    #[test]
    fn empty_step_list_falls_back() {
        let mut behavior = coordinator(r#"{"steps": []}"#);
        let memory = Memory::default();
        let task = Message::task("system", "coordinator", "do something");
        let replies = behavior.on_task(&ctx(&memory), &task).expect("fallback");
        assert_eq!(replies.len(), 2);
    }
}
