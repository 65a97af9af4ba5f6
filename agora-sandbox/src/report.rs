//! Derivation of a per-test summary from raw interpreter output.
//!
//! unittest-style runners print one line per test ending in a status token
//! (`ok`, `FAIL`, `ERROR`). Lines that do not match are diagnostic noise and
//! are ignored rather than treated as results.

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestVerdict {
    pub name: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    pub verdicts: Vec<TestVerdict>,
    pub passed: u32,
    pub failed: u32,
}

impl TestSummary {
    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    /// One human-readable line, e.g. `2 passed, 1 failed (test_a: ok, test_b: ok, test_c: FAIL)`.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return "no per-test results detected".to_string();
        }
        let detail = self
            .verdicts
            .iter()
            .map(|v| {
                format!(
                    "{}: {}",
                    v.name,
                    if v.passed { "ok" } else { "FAIL" }
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} passed, {} failed ({detail})", self.passed, self.failed)
    }
}

fn verdict_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(test_\w+)\b.*?\b(ok|OK|FAIL|FAILED|ERROR)\s*$")
            .expect("valid verdict regex")
    })
}

/// Scan raw output for per-test verdict lines.
pub fn summarize(output: &str) -> TestSummary {
    let mut summary = TestSummary::default();
    for cap in verdict_re().captures_iter(output) {
        let passed = matches!(&cap[2], "ok" | "OK");
        if passed {
            summary.passed += 1;
        } else {
            summary.failed += 1;
        }
        summary.verdicts.push(TestVerdict {
            name: cap[1].to_string(),
            passed,
        });
    }
    summary
}
