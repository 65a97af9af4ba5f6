//! Stage driver: raw generation output in, guaranteed-valid code out.
//!
//! The pipeline postcondition is deliberately strong: whatever text goes in,
//! the output passes structural validation. When extraction and repair both
//! fail, a trivially correct fallback template is substituted, because a
//! semantically useless placeholder downstream beats an unparseable blob.

use tracing::debug;
use tracing::warn;

use crate::extract::extract_code;
use crate::repair::FALLBACK_SOURCE;
use crate::repair::FALLBACK_TESTS;
use crate::repair::defined_names;
use crate::repair::emergency_repair;
use crate::repair::has_sentinel_import;
use crate::repair::has_test_function;
use crate::repair::strip_sentinel_imports;
use crate::validate::check_python;

/// Whether a failed structural cross-check between tests and source rejects
/// the tests (falling back to the template) or just records a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossCheckPolicy {
    #[default]
    Warn,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedCode {
    pub text: String,
    pub warnings: Vec<String>,
    pub used_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct CodePipeline {
    cross_check: CrossCheckPolicy,
    min_len: usize,
}

impl Default for CodePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl CodePipeline {
    pub fn new() -> Self {
        Self {
            cross_check: CrossCheckPolicy::default(),
            min_len: 10,
        }
    }

    pub fn with_cross_check(mut self, policy: CrossCheckPolicy) -> Self {
        self.cross_check = policy;
        self
    }

    /// Clean raw output into source code. Always returns valid text.
    pub fn clean_source(&self, raw: &str) -> CleanedCode {
        self.clean(raw, FALLBACK_SOURCE)
    }

    /// Clean raw output into test code, cross-checking it against the source
    /// it is meant to exercise. Always returns valid text containing at
    /// least one test function.
    pub fn clean_tests(&self, raw: &str, source: &str) -> CleanedCode {
        let mut cleaned = self.clean(raw, FALLBACK_TESTS);
        if cleaned.used_fallback {
            return cleaned;
        }

        if !has_test_function(&cleaned.text) {
            warn!("cleaned tests define no test function, substituting fallback");
            cleaned.warnings.push("no test function defined".to_string());
            cleaned.text = FALLBACK_TESTS.trim_end().to_string();
            cleaned.used_fallback = true;
            return cleaned;
        }

        if has_sentinel_import(&cleaned.text) {
            cleaned
                .warnings
                .push("dropped import of the module under test".to_string());
            cleaned.text = strip_sentinel_imports(&cleaned.text);
        }

        let mut rejected = false;
        let names = defined_names(source);
        if !names.is_empty() && !names.iter().any(|name| cleaned.text.contains(name.as_str())) {
            cleaned
                .warnings
                .push("tests reference no name defined in the source".to_string());
            rejected = true;
        }

        if rejected && self.cross_check == CrossCheckPolicy::Reject {
            warn!("cross-check rejected generated tests, substituting fallback");
            cleaned.text = FALLBACK_TESTS.trim_end().to_string();
            cleaned.used_fallback = true;
        }

        cleaned
    }

    fn clean(&self, raw: &str, fallback: &str) -> CleanedCode {
        let mut warnings = Vec::new();
        let extracted = extract_code(raw);

        let issues = check_python(&extracted);
        let text = if issues.is_empty() {
            extracted
        } else {
            for issue in &issues {
                debug!(%issue, "validation issue in extracted code");
            }
            warnings.push(format!(
                "extracted code failed validation ({} issues), repaired",
                issues.len()
            ));
            emergency_repair(&extracted).trim_end().to_string()
        };

        let still_broken = !check_python(&text).is_empty();
        if still_broken || text.trim().len() < self.min_len {
            warn!(still_broken, "repair failed, substituting fallback template");
            warnings.push("repair failed, fallback template substituted".to_string());
            return CleanedCode {
                text: fallback.trim_end().to_string(),
                warnings,
                used_fallback: true,
            };
        }

        CleanedCode {
            text,
            warnings,
            used_fallback: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::is_valid_python;
    use pretty_assertions::assert_eq;

    const CLEAN: &str = "def add(a, b):\n    return a + b";

    #[test]
    fn clean_input_passes_through_byte_identical() {
        let pipeline = CodePipeline::new();
        let first = pipeline.clean_source(CLEAN);
        assert_eq!(first.text, CLEAN);
        assert!(!first.used_fallback);
        assert!(first.warnings.is_empty());

        // Idempotence: a second pass is a no-op.
        let second = pipeline.clean_source(&first.text);
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn fenced_and_narrated_output_is_cleaned() {
        let raw = "Sure, here you go:\n```python\ndef add(a, b):\n    return a + b\n```\nHope that helps!";
        let cleaned = CodePipeline::new().clean_source(raw);
        assert!(cleaned.text.starts_with("def add"));
        assert!(is_valid_python(&cleaned.text));
        assert!(!cleaned.used_fallback);
    }

    #[test]
    fn empty_input_yields_fallback() {
        let cleaned = CodePipeline::new().clean_source("");
        assert!(cleaned.used_fallback);
        assert!(is_valid_python(&cleaned.text));
        assert!(cleaned.text.contains("def add_two_numbers"));
    }

    #[test]
    fn pure_prose_yields_fallback() {
        let cleaned = CodePipeline::new().clean_source("I am unable to write code today.");
        assert!(cleaned.used_fallback);
        assert!(is_valid_python(&cleaned.text));
    }

    #[test]
    fn hopelessly_broken_code_yields_fallback() {
        let cleaned = CodePipeline::new().clean_source("def broken(:\n  ((((\n");
        assert!(cleaned.used_fallback);
        assert!(is_valid_python(&cleaned.text));
    }

    #[test]
    fn pipeline_output_always_validates() {
        let pipeline = CodePipeline::new();
        let inputs = [
            "",
            "```",
            "prose only",
            "def f(:\n",
            "def ok():\n    return 1",
            "   indented junk",
        ];
        for input in inputs {
            let cleaned = pipeline.clean_source(input);
            assert!(is_valid_python(&cleaned.text), "input {input:?} produced invalid output");
        }
    }

    #[test]
    fn tests_without_test_function_fall_back() {
        let raw = "def helper():\n    return 1";
        let cleaned = CodePipeline::new().clean_tests(raw, CLEAN);
        assert!(cleaned.used_fallback);
        assert!(cleaned.text.contains("def test_basic_functionality"));
    }

    #[test]
    fn cross_check_warns_by_default() {
        let raw = "def test_unrelated():\n    assert 1 == 1";
        let cleaned = CodePipeline::new().clean_tests(raw, CLEAN);
        assert!(!cleaned.used_fallback);
        assert!(
            cleaned
                .warnings
                .iter()
                .any(|w| w.contains("reference no name"))
        );
    }

    #[test]
    fn cross_check_reject_policy_substitutes_fallback() {
        let raw = "def test_unrelated():\n    assert 1 == 1";
        let cleaned = CodePipeline::new()
            .with_cross_check(CrossCheckPolicy::Reject)
            .clean_tests(raw, CLEAN);
        assert!(cleaned.used_fallback);
    }

    #[test]
    fn good_tests_survive_cross_check() {
        let raw = "def test_add():\n    assert add(2, 3) == 5";
        let cleaned = CodePipeline::new().clean_tests(raw, CLEAN);
        assert!(!cleaned.used_fallback);
        assert!(cleaned.warnings.is_empty());
        assert_eq!(cleaned.text, raw);
    }

    #[test]
    fn sentinel_import_is_repaired_and_noted() {
        let raw = "from your_module import add\n\ndef test_add():\n    assert add(2, 3) == 5";
        let cleaned = CodePipeline::new().clean_tests(raw, CLEAN);
        assert!(!cleaned.text.contains("your_module"));
        assert!(!cleaned.used_fallback);
    }
}
