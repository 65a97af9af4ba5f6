//! Workflow assembly and execution.
//!
//! The orchestrator owns nothing between runs: each call to [`Orchestrator::run`]
//! builds a fresh bus and roster, seeds one task message, drains the bus, and
//! distills the delivery trace into a [`RunReport`].

use std::path::PathBuf;

use agora_pipeline::ArtifactKind;
use agora_pipeline::ArtifactStore;
use agora_pipeline::CodePipeline;
use agora_pipeline::CrossCheckPolicy;
use agora_sandbox::SandboxRunner;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use crate::agent::Agent;
use crate::agent::AgentRole;
use crate::agent::AgentStatus;
use crate::bus::MessageBus;
use crate::llm::GenerationConfig;
use crate::llm::SharedGenerator;
use crate::message::Message;
use crate::message::MessageKind;
use crate::roles::CoderBehavior;
use crate::roles::CoordinatorBehavior;
use crate::roles::RunnerBehavior;
use crate::roles::TesterBehavior;
use crate::roles::COORDINATOR;

/// One roster entry: which agent to build and, optionally, a model override
/// for that agent alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: String,
    pub role: AgentRole,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AgentSpec {
    pub fn new(id: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id: id.into(),
            role,
            description: String::new(),
            model: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// The default four-agent roster.
pub fn standard_roster() -> Vec<AgentSpec> {
    vec![
        AgentSpec::new(COORDINATOR, AgentRole::Coordinator)
            .with_description("Breaks tasks down and routes them to the team"),
        AgentSpec::new("coder", AgentRole::Coder).with_description("Writes Python code"),
        AgentSpec::new("tester", AgentRole::Tester).with_description("Creates unit tests"),
        AgentSpec::new("runner", AgentRole::Runner).with_description("Executes tests"),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub role: AgentRole,
    pub status: AgentStatus,
    pub messages_seen: usize,
}

/// Everything a caller learns about a finished workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: WorkflowStatus,
    pub message: String,
    pub code: Option<String>,
    pub tests: Option<String>,
    pub test_results: Option<String>,
    pub tests_passed: bool,
    pub messages_routed: usize,
    pub agents: Vec<AgentSummary>,
}

/// Builds rosters and runs workflows over a shared generator.
pub struct Orchestrator {
    generator: SharedGenerator,
    config: GenerationConfig,
    artifact_root: PathBuf,
    cross_check: CrossCheckPolicy,
    sandbox: SandboxRunner,
}

impl Orchestrator {
    pub fn new(
        generator: SharedGenerator,
        config: GenerationConfig,
        artifact_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            generator,
            config,
            artifact_root: artifact_root.into(),
            cross_check: CrossCheckPolicy::default(),
            sandbox: SandboxRunner::new(),
        }
    }

    pub fn with_cross_check(mut self, policy: CrossCheckPolicy) -> Self {
        self.cross_check = policy;
        self
    }

    pub fn with_sandbox(mut self, sandbox: SandboxRunner) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Run one workflow for `task` with the given roster.
    ///
    /// The only hard failure is a roster without a coordinator; everything
    /// else (unparseable plans, bad generations, failing tests) degrades
    /// inside the run and is reported in the [`RunReport`].
    pub fn run(&self, task: &str, roster: &[AgentSpec]) -> RunReport {
        let run_id = Uuid::new_v4();
        info!(%run_id, task, "starting workflow");

        let Some(coordinator) = roster.iter().find(|s| s.role == AgentRole::Coordinator) else {
            warn!(%run_id, "roster has no coordinator");
            return RunReport {
                run_id,
                status: WorkflowStatus::Failed,
                message: "roster has no coordinator agent".to_string(),
                code: None,
                tests: None,
                test_results: None,
                tests_passed: false,
                messages_routed: 0,
                agents: Vec::new(),
            };
        };
        let coordinator_id = coordinator.id.clone();

        let store = ArtifactStore::new(&self.artifact_root, run_id.to_string());
        let mut bus = MessageBus::new();
        for spec in roster {
            bus.register(self.build_agent(spec, &store));
        }

        bus.dispatch(Message::task("system", &coordinator_id, task));
        let outcome = bus.drain();

        let mut message = match &outcome.terminal {
            Some(_) => "workflow completed".to_string(),
            None => "workflow ended without a result from the runner".to_string(),
        };
        if outcome.budget_exhausted {
            message.push_str(" (hop budget exhausted)");
        }

        let (code, tests, test_results, tests_passed) = self.recover_results(&bus, &store);
        let agents = bus
            .agents()
            .map(|agent| AgentSummary {
                id: agent.id.clone(),
                role: agent.role,
                status: agent.status,
                messages_seen: agent.memory.len(),
            })
            .collect();

        RunReport {
            run_id,
            status: WorkflowStatus::Completed,
            message,
            code,
            tests,
            test_results,
            tests_passed,
            messages_routed: outcome.delivered,
            agents,
        }
    }

    fn build_agent(&self, spec: &AgentSpec, store: &ArtifactStore) -> Agent {
        let config = match &spec.model {
            Some(model) => self.config.clone().with_model(model.clone()),
            None => self.config.clone(),
        };
        let pipeline = CodePipeline::new().with_cross_check(self.cross_check);
        let behavior: Box<dyn crate::agent::RoleBehavior> = match spec.role {
            AgentRole::Coordinator => Box::new(CoordinatorBehavior::new(
                self.generator.clone(),
                config,
            )),
            AgentRole::Coder => Box::new(CoderBehavior::new(
                self.generator.clone(),
                config,
                pipeline,
                store.clone(),
            )),
            AgentRole::Tester => Box::new(TesterBehavior::new(
                self.generator.clone(),
                config,
                pipeline,
                store.clone(),
            )),
            AgentRole::Runner => Box::new(RunnerBehavior::new(self.sandbox.clone())),
        };
        Agent::new(&spec.id, spec.role, &spec.description, behavior)
    }

    /// Pull the final artifacts out of the run. The delivery trace is the
    /// source of truth; the artifact store is the fallback when a message
    /// never made it (for example after budget exhaustion).
    fn recover_results(
        &self,
        bus: &MessageBus,
        store: &ArtifactStore,
    ) -> (Option<String>, Option<String>, Option<String>, bool) {
        let mut code = None;
        let mut tests = None;
        let mut test_results = None;
        let mut tests_passed = false;

        for msg in bus.trace().iter().rev() {
            if msg.kind != MessageKind::Data {
                continue;
            }
            if code.is_none() {
                code = msg.meta_str("original_code").or_else(|| msg.meta_str("code")).map(str::to_string);
            }
            if tests.is_none() {
                tests = msg.meta_str("test_code").map(str::to_string);
            }
            if test_results.is_none() {
                if let Some(results) = msg.meta_str("test_results") {
                    test_results = Some(results.to_string());
                    tests_passed = msg.meta_bool("tests_passed").unwrap_or(false);
                }
            }
            if code.is_some() && tests.is_some() && test_results.is_some() {
                break;
            }
        }

        if code.is_none() {
            code = self.latest_text(store, ArtifactKind::Source);
        }
        if tests.is_none() {
            tests = self.latest_text(store, ArtifactKind::Test);
        }
        (code, tests, test_results, tests_passed)
    }

    fn latest_text(&self, store: &ArtifactStore, kind: ArtifactKind) -> Option<String> {
        match store.latest(kind) {
            Ok(artifact) => artifact.map(|a| a.text),
            Err(err) => {
                warn!(error = %err, "could not read artifact store");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedGenerator;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn roster_without_coordinator_fails_fast() {
        let dir = tempfile::tempdir().expect("tempdir");
        let orchestrator = Orchestrator::new(
            Arc::new(ScriptedGenerator::default()),
            GenerationConfig::default(),
            dir.path(),
        );
        let roster = vec![AgentSpec::new("coder", AgentRole::Coder)];
        let report = orchestrator.run("anything", &roster);
        assert_eq!(report.status, WorkflowStatus::Failed);
        assert_eq!(report.messages_routed, 0);
    }

    #[test]
    fn standard_roster_has_all_four_roles() {
        let roster = standard_roster();
        assert_eq!(roster.len(), 4);
        assert!(roster.iter().any(|s| s.role == AgentRole::Coordinator));
        assert!(roster.iter().any(|s| s.role == AgentRole::Runner));
    }
}
