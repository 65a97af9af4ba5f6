//! Sandboxed execution of generated source plus generated tests.

use std::fs;
use std::process::Command;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::process::run_with_timeout;
use crate::report::TestSummary;
use crate::report::summarize;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const OUTPUT_LIMIT: usize = 64 * 1024;

/// Name of the module file used in [`CombineMode::ImportableModule`] runs.
const MODULE_NAME: &str = "generated";

/// How source and tests are combined for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    /// Source and tests concatenated into one file; tests see the source's
    /// definitions directly, no import needed.
    #[default]
    SameScope,
    /// Source written as a named module next to the test file; the runner
    /// injects a star-import so the tests resolve the same names.
    ImportableModule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExecOutcome {
    Passed,
    Failed { exit_code: Option<i32> },
    TimedOut,
    ExecutionError { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub outcome: ExecOutcome,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub summary: TestSummary,
}

impl ExecutionReport {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, ExecOutcome::Passed)
    }

    /// Result text in the shape downstream consumers (and prompts) expect:
    /// a verdict header line followed by the captured output.
    pub fn result_text(&self) -> String {
        match &self.outcome {
            ExecOutcome::Passed => {
                format!("TESTS PASSED\n{}{}", self.stdout, self.stderr)
            }
            ExecOutcome::Failed { .. } => {
                format!("TESTS FAILED\n{}{}", self.stdout, self.stderr)
            }
            ExecOutcome::TimedOut => "TESTS TIMEOUT - tests took too long to run".to_string(),
            ExecOutcome::ExecutionError { reason } => {
                format!("TEST EXECUTION ERROR: {reason}")
            }
        }
    }
}

/// Executes untrusted source+tests in a throwaway directory with a hard
/// wall-clock timeout. Process-level failures are classified, never raised.
#[derive(Debug, Clone)]
pub struct SandboxRunner {
    interpreter: String,
    timeout: Duration,
    mode: CombineMode,
}

impl Default for SandboxRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxRunner {
    pub fn new() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout: DEFAULT_TIMEOUT,
            mode: CombineMode::default(),
        }
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_mode(mut self, mode: CombineMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run `tests` against `source` and classify the outcome.
    ///
    /// The execution directory is a fresh [`tempfile::TempDir`] whose drop
    /// removes it and everything in it on every exit path, including early
    /// returns for setup failures.
    pub fn execute(&self, source: &str, tests: &str) -> ExecutionReport {
        let started = Instant::now();
        match self.execute_inner(source, tests) {
            Ok(report) => report,
            Err(reason) => {
                warn!(%reason, "sandbox setup failed");
                ExecutionReport {
                    outcome: ExecOutcome::ExecutionError { reason },
                    stdout: String::new(),
                    stderr: String::new(),
                    duration_ms: elapsed_ms(started),
                    summary: TestSummary::default(),
                }
            }
        }
    }

    fn execute_inner(&self, source: &str, tests: &str) -> Result<ExecutionReport, String> {
        let started = Instant::now();
        let dir = tempfile::tempdir().map_err(|e| format!("create sandbox dir: {e}"))?;

        let entry_point = match self.mode {
            CombineMode::SameScope => {
                let path = dir.path().join("combined.py");
                let combined = format!("{source}\n\n{tests}\n");
                fs::write(&path, combined).map_err(|e| format!("write combined file: {e}"))?;
                path
            }
            CombineMode::ImportableModule => {
                let module = dir.path().join(format!("{MODULE_NAME}.py"));
                fs::write(&module, source).map_err(|e| format!("write module file: {e}"))?;
                let path = dir.path().join(format!("test_{MODULE_NAME}.py"));
                let body = format!("from {MODULE_NAME} import *\n\n{tests}\n");
                fs::write(&path, body).map_err(|e| format!("write test file: {e}"))?;
                path
            }
        };

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&entry_point).current_dir(dir.path());

        let output = match run_with_timeout(cmd, self.timeout, OUTPUT_LIMIT) {
            Ok(output) => output,
            Err(err) => {
                return Ok(ExecutionReport {
                    outcome: ExecOutcome::ExecutionError {
                        reason: err.to_string(),
                    },
                    stdout: String::new(),
                    stderr: String::new(),
                    duration_ms: elapsed_ms(started),
                    summary: TestSummary::default(),
                });
            }
        };

        let outcome = if output.timed_out {
            ExecOutcome::TimedOut
        } else if output.status.success() {
            ExecOutcome::Passed
        } else {
            ExecOutcome::Failed {
                exit_code: output.status.code(),
            }
        };

        let summary = summarize(&format!("{}\n{}", output.stdout, output.stderr));
        info!(?outcome, duration_ms = elapsed_ms(started), "sandbox run finished");

        Ok(ExecutionReport {
            outcome,
            stdout: output.stdout,
            stderr: output.stderr,
            duration_ms: elapsed_ms(started),
            summary,
        })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ADD: &str = "def add(a, b):\n    return a + b\n";

    fn runner() -> SandboxRunner {
        SandboxRunner::new().with_timeout(Duration::from_secs(20))
    }

    #[test]
    fn correct_code_passes() {
        let tests = "import unittest\n\nclass TestAdd(unittest.TestCase):\n    def test_add(self):\n        self.assertEqual(add(2, 3), 5)\n\nif __name__ == \"__main__\":\n    unittest.main()\n";
        let report = runner().execute(ADD, tests);
        assert_eq!(report.outcome, ExecOutcome::Passed);
        assert!(report.passed());
        assert!(report.result_text().starts_with("TESTS PASSED"));
    }

    #[test]
    fn wrong_expectation_fails() {
        let tests = "import unittest\n\nclass TestAdd(unittest.TestCase):\n    def test_add(self):\n        self.assertEqual(add(2, 3), 6)\n\nif __name__ == \"__main__\":\n    unittest.main()\n";
        let report = runner().execute(ADD, tests);
        assert!(matches!(report.outcome, ExecOutcome::Failed { .. }));
        assert!(report.result_text().starts_with("TESTS FAILED"));
    }

    #[test]
    fn infinite_loop_times_out() {
        let tests = "while True:\n    pass\n";
        let started = Instant::now();
        let report = runner()
            .with_timeout(Duration::from_millis(500))
            .execute(ADD, tests);
        assert_eq!(report.outcome, ExecOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn missing_interpreter_is_execution_error() {
        let report = runner()
            .with_interpreter("definitely-not-python-xyz")
            .execute(ADD, "print('hi')\n");
        assert!(matches!(report.outcome, ExecOutcome::ExecutionError { .. }));
    }

    #[test]
    fn importable_module_mode_shares_names() {
        let tests = "import unittest\n\nclass TestAdd(unittest.TestCase):\n    def test_add(self):\n        self.assertEqual(add(2, 3), 5)\n\nif __name__ == \"__main__\":\n    unittest.main()\n";
        let report = runner()
            .with_mode(CombineMode::ImportableModule)
            .execute(ADD, tests);
        assert_eq!(report.outcome, ExecOutcome::Passed);
    }

    #[test]
    fn syntax_error_is_failed_not_error() {
        let report = runner().execute("def broken(:\n", "print('x')\n");
        assert!(matches!(report.outcome, ExecOutcome::Failed { .. }));
        assert!(report.stderr.contains("SyntaxError"));
    }
}
