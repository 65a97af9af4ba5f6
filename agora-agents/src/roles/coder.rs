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
use crate::roles::TESTER;

/// Turns a task description into cleaned, persisted Python source and hands
/// it to the tester.
pub struct CoderBehavior {
    generator: SharedGenerator,
    config: GenerationConfig,
    pipeline: CodePipeline,
    store: ArtifactStore,
}

impl CoderBehavior {
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

    fn code_prompt(task: &str) -> String {
        format!(
            r#"You are an expert Python developer. Generate ONLY clean, working Python code.

Task: {task}

CRITICAL REQUIREMENTS:
- Generate ONLY the Python code, NO explanations, NO comments, NO markdown
- Write complete, runnable Python functions
- Include proper error handling with try/except
- Add type hints and docstrings
- DO NOT use markdown formatting or code blocks
- DO NOT add "Here's the code:" or similar text

Generate ONLY the function code, nothing else."#
        )
    }
}

impl RoleBehavior for CoderBehavior {
    fn on_task(
        &mut self,
        ctx: &AgentContext<'_>,
        msg: &Message,
    ) -> Result<Vec<Message>, AgentError> {
        let reply = self
            .generator
            .generate(&Self::code_prompt(&msg.content), &self.config)?;
        let cleaned = self.pipeline.clean_source(&reply);
        for warning in &cleaned.warnings {
            warn!(agent = ctx.id, "{warning}");
        }
        if cleaned.used_fallback {
            warn!(agent = ctx.id, "generated code was unusable, using fallback source");
        }

        let artifact = self.store.persist(ArtifactKind::Source, &cleaned.text)?;
        info!(agent = ctx.id, filename = %artifact.filename, "code generated");

        let to_sender = Message::data(
            ctx.id,
            &msg.from_agent,
            format!("Generated code saved to {}", artifact.filename),
        )
        .with_meta("code", cleaned.text.clone())
        .with_meta("filename", artifact.filename.clone());
        let to_tester = Message::data(ctx.id, TESTER, "Code generated for testing")
            .with_meta("code", cleaned.text)
            .with_meta("filename", artifact.filename);
        Ok(vec![to_sender, to_tester])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedGenerator;
    use crate::memory::Memory;
    use crate::message::MessageKind;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn coder(reply: &str, store: ArtifactStore) -> CoderBehavior {
        CoderBehavior::new(
            Arc::new(ScriptedGenerator::new([reply])),
            GenerationConfig::default(),
            CodePipeline::new(),
            store,
        )
    }

    #[test]
    fn generated_code_flows_to_sender_and_tester() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path(), "run-1");
        let reply = "```python\ndef double(x: int) -> int:\n    return x * 2\n```";
        let mut behavior = coder(reply, store);
        let memory = Memory::default();
        let ctx = AgentContext {
            id: "coder",
            memory: &memory,
        };
        let replies = behavior
            .on_task(&ctx, &Message::task("coordinator", "coder", "double a number"))
            .expect("replies");

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].to_agent, "coordinator");
        assert_eq!(replies[1].to_agent, "tester");
        assert!(replies.iter().all(|m| m.kind == MessageKind::Data));
        let code = replies[1].meta_str("code").expect("code metadata");
        assert!(code.contains("def double"));
        assert!(!code.contains("```"));
    }

    #[test]
    fn unusable_reply_persists_fallback_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path(), "run-2");
        let mut behavior = coder("sorry, I cannot help with that", store);
        let memory = Memory::default();
        let ctx = AgentContext {
            id: "coder",
            memory: &memory,
        };
        let replies = behavior
            .on_task(&ctx, &Message::task("coordinator", "coder", "anything"))
            .expect("replies");
        let code = replies[0].meta_str("code").expect("code metadata");
        assert!(code.contains("def add_two_numbers"));
    }
}
