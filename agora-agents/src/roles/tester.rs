use agora_pipeline::ArtifactKind;
use agora_pipeline::ArtifactStore;
use agora_pipeline::CodePipeline;
use tracing::info;
use tracing::warn;

use crate::agent::AgentContext;
use crate::agent::RoleBehavior;
use crate::error::AgentError;
use crate::llm::GenerationConfig;
use crate::llm::SharedGenerator;
use crate::message::Message;
use crate::roles::RUNNER;

/// Generates a unittest suite for code received from the coder and forwards
/// both to the runner. Tests are written to share the scope of the code
/// under test, so the prompt forbids import statements.
pub struct TesterBehavior {
    generator: SharedGenerator,
    config: GenerationConfig,
    pipeline: CodePipeline,
    store: ArtifactStore,
}

impl TesterBehavior {
    pub fn new(
        generator: SharedGenerator,
        config: GenerationConfig,
        pipeline: CodePipeline,
        store: ArtifactStore,
    ) -> Self {
        Self {
            generator,
            config,
            pipeline,
            store,
        }
    }

    fn test_prompt(code: &str) -> String {
        format!(
            r#"You are an expert Python tester.

Code to test:
{code}

Requirements:
1. Create comprehensive unit tests using unittest
2. Test all functions and methods
3. Include edge cases and error conditions
4. Use descriptive test names
5. Test both valid inputs and invalid inputs
6. DO NOT include the original code in the test file
7. DO NOT use ANY import statements - the functions will be available directly
8. The functions will be executed in the same file as the tests

Generate only the test code, no explanations or markdown formatting."#
        )
    }
}

impl RoleBehavior for TesterBehavior {
    fn on_data(
        &mut self,
        ctx: &AgentContext<'_>,
        msg: &Message,
    ) -> Result<Vec<Message>, AgentError> {
        let code = msg
            .meta_str("code")
            .ok_or_else(|| AgentError::missing_metadata("code"))?
            .to_string();

        let reply = self
            .generator
            .generate(&Self::test_prompt(&code), &self.config)?;
        let cleaned = self.pipeline.clean_tests(&reply, &code);
        for warning in &cleaned.warnings {
            warn!(agent = ctx.id, "{warning}");
        }
        if cleaned.used_fallback {
            warn!(agent = ctx.id, "generated tests were unusable, using fallback suite");
        }

        let artifact = self.store.persist(ArtifactKind::Test, &cleaned.text)?;
        info!(agent = ctx.id, filename = %artifact.filename, "tests generated");

        let mut to_sender = Message::data(
            ctx.id,
            &msg.from_agent,
            format!("Generated tests saved to {}", artifact.filename),
        )
        .with_meta("test_code", cleaned.text.clone())
        .with_meta("original_code", code.clone())
        .with_meta("filename", artifact.filename.clone());
        if !cleaned.warnings.is_empty() {
            to_sender = to_sender.with_meta("warnings", cleaned.warnings.clone());
        }
        let to_runner = Message::data(ctx.id, RUNNER, "Tests generated for execution")
            .with_meta("test_code", cleaned.text)
            .with_meta("original_code", code)
            .with_meta("filename", artifact.filename);
        Ok(vec![to_sender, to_runner])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedGenerator;
    use crate::memory::Memory;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn tester(reply: &str, store: ArtifactStore) -> TesterBehavior {
        TesterBehavior::new(
            Arc::new(ScriptedGenerator::new([reply])),
            GenerationConfig::default(),
            CodePipeline::new(),
            store,
        )
    }

    const SOURCE: &str = "def double(x):\n    return x * 2\n";

    #[test]
    fn tests_flow_to_sender_and_runner() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path(), "run-1");
        let reply = "class TestDouble(unittest.TestCase):\n    def test_double(self):\n        self.assertEqual(double(2), 4)\n";
        let mut behavior = tester(reply, store);
        let memory = Memory::default();
        let ctx = AgentContext {
            id: "tester",
            memory: &memory,
        };
        let incoming = Message::data("coder", "tester", "Code generated for testing")
            .with_meta("code", SOURCE);
        let replies = behavior.on_data(&ctx, &incoming).expect("replies");

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1].to_agent, "runner");
        assert_eq!(replies[1].meta_str("original_code"), Some(SOURCE));
        assert!(replies[1]
            .meta_str("test_code")
            .expect("test_code metadata")
            .contains("def test_double"));
    }

    #[test]
    fn missing_code_metadata_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path(), "run-2");
        let mut behavior = tester("irrelevant", store);
        let memory = Memory::default();
        let ctx = AgentContext {
            id: "tester",
            memory: &memory,
        };
        let incoming = Message::data("coder", "tester", "no metadata here");
        let err = behavior.on_data(&ctx, &incoming).expect_err("should fail");
        assert!(err.to_string().contains("code"));
    }
}
