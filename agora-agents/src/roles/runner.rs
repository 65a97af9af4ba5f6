use agora_sandbox::SandboxRunner;
use tracing::info;

use crate::agent::AgentContext;
use crate::agent::RoleBehavior;
use crate::error::AgentError;
use crate::message::Message;

/// Executes a received test suite against its source in the sandbox and
/// reports the verdict back to the sender. This is the last hop of a
/// workflow; its reply carries no further work.
pub struct RunnerBehavior {
    sandbox: SandboxRunner,
}

impl RunnerBehavior {
    pub fn new(sandbox: SandboxRunner) -> Self {
        Self { sandbox }
    }
}

impl RoleBehavior for RunnerBehavior {
    fn on_data(
        &mut self,
        ctx: &AgentContext<'_>,
        msg: &Message,
    ) -> Result<Vec<Message>, AgentError> {
        let code = msg
            .meta_str("original_code")
            .ok_or_else(|| AgentError::missing_metadata("original_code"))?
            .to_string();
        let test_code = msg
            .meta_str("test_code")
            .ok_or_else(|| AgentError::missing_metadata("test_code"))?
            .to_string();

        let report = self.sandbox.execute(&code, &test_code);
        let passed = report.passed();
        info!(
            agent = ctx.id,
            passed,
            duration_ms = report.duration_ms,
            "test execution completed"
        );

        Ok(vec![Message::data(
            ctx.id,
            &msg.from_agent,
            "Test execution completed",
        )
        .with_meta("test_results", report.result_text())
        .with_meta("tests_passed", passed)
        .with_meta("original_code", code)
        .with_meta("test_code", test_code)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use crate::message::MessageKind;
    use pretty_assertions::assert_eq;

    fn ctx<'a>(memory: &'a Memory) -> AgentContext<'a> {
        AgentContext {
            id: "runner",
            memory,
        }
    }

    #[test]
    fn passing_suite_reports_success() {
        let mut behavior = RunnerBehavior::new(SandboxRunner::new());
        let memory = Memory::default();
        let incoming = Message::data("tester", "runner", "Tests generated for execution")
            .with_meta("original_code", "def double(x):\n    return x * 2\n")
            .with_meta(
                "test_code",
                "import unittest\n\nclass TestDouble(unittest.TestCase):\n    def test_double(self):\n        self.assertEqual(double(3), 6)\n\nif __name__ == '__main__':\n    unittest.main()\n",
            );
        let replies = behavior.on_data(&ctx(&memory), &incoming).expect("replies");
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].kind, MessageKind::Data);
        assert_eq!(replies[0].meta_bool("tests_passed"), Some(true));
        assert!(replies[0]
            .meta_str("test_results")
            .expect("test_results metadata")
            .starts_with("TESTS PASSED"));
    }

    #[test]
    fn missing_test_code_is_an_error() {
        let mut behavior = RunnerBehavior::new(SandboxRunner::new());
        let memory = Memory::default();
        let incoming = Message::data("tester", "runner", "half a payload")
            .with_meta("original_code", "def f():\n    pass\n");
        let err = behavior
            .on_data(&ctx(&memory), &incoming)
            .expect_err("should fail");
        assert!(err.to_string().contains("test_code"));
    }
}
