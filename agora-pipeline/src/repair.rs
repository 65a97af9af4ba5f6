//! Emergency repair for generated text that failed validation.
//!
//! Repair is best-effort: indentation is normalized to four-space multiples,
//! stray backticks are removed, and imports of the sentinel module names that
//! models invent ("your_module" and friends) are dropped. Callers re-validate
//! afterwards and substitute a fallback template when repair was not enough.

use regex::Regex;
use std::sync::OnceLock;

/// Sentinel module names that generated tests must never import: the tests
/// execute in the same scope as the source, so an import of a made-up module
/// name is always a runtime error.
const SENTINEL_IMPORTS: &[&str] = &[
    "from your_module import",
    "import your_module",
    "from module import",
    "import module",
];

pub const FALLBACK_SOURCE: &str = r#"def add_two_numbers(a: int, b: int) -> int:
    """Add two numbers together."""
    try:
        return a + b
    except TypeError as e:
        raise ValueError(f"Both arguments must be numbers: {e}")
"#;

pub const FALLBACK_TESTS: &str = r#"import unittest

class TestFunction(unittest.TestCase):
    def test_basic_functionality(self):
        self.assertTrue(True)

    def test_edge_cases(self):
        self.assertTrue(True)

if __name__ == "__main__":
    unittest.main()
"#;

fn test_fn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*def\s+test_\w+").expect("valid test-fn regex"))
}

/// Normalize indentation and strip content that can never be valid.
pub fn emergency_repair(text: &str) -> String {
    let mut fixed = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            fixed.push(String::new());
            continue;
        }
        let lower = line.to_lowercase();
        if SENTINEL_IMPORTS
            .iter()
            .any(|needle| lower.contains(needle))
        {
            continue;
        }

        let line = line.replace('\t', "    ").replace('`', "");
        let leading = line.len() - line.trim_start().len();
        let normalized = (leading / 4) * 4;
        fixed.push(format!("{}{}", " ".repeat(normalized), line.trim_start()));
    }

    fixed.join("\n")
}

/// True when the text defines at least one `test_*` function.
pub fn has_test_function(text: &str) -> bool {
    test_fn_re().is_match(text)
}

/// Names defined at statement level by `def` or `class`.
pub fn defined_names(source: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:def|class)\s+([A-Za-z_][A-Za-z0-9_]*)").expect("valid name regex")
    });
    re.captures_iter(source)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// True when any remaining import line references a sentinel module.
pub fn has_sentinel_import(text: &str) -> bool {
    text.lines()
        .map(str::to_lowercase)
        .any(|line| SENTINEL_IMPORTS.iter().any(|needle| line.contains(needle)))
}

/// Drop only the sentinel import lines, leaving everything else untouched.
pub fn strip_sentinel_imports(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            !SENTINEL_IMPORTS.iter().any(|needle| lower.contains(needle))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim_start_matches('\n')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_sentinel_imports() {
        let text = "from your_module import add\n\ndef test_add():\n    assert add(1, 2) == 3";
        let repaired = emergency_repair(text);
        assert!(!repaired.contains("your_module"));
        assert!(repaired.contains("def test_add():"));
    }

    #[test]
    fn rounds_indentation_down_to_four() {
        let text = "def f():\n      return 1";
        assert_eq!(emergency_repair(text), "def f():\n    return 1");
    }

    #[test]
    fn converts_tabs() {
        let text = "def f():\n\treturn 1";
        assert_eq!(emergency_repair(text), "def f():\n    return 1");
    }

    #[test]
    fn repair_is_identity_on_clean_code() {
        let text = "def add(a, b):\n    return a + b";
        assert_eq!(emergency_repair(text), text);
    }

    #[test]
    fn finds_test_functions() {
        assert!(has_test_function("class T:\n    def test_x(self):\n        pass"));
        assert!(!has_test_function("def helper():\n    pass"));
    }

    #[test]
    fn collects_defined_names() {
        let source = "def add(a, b):\n    return a + b\n\nclass Calculator:\n    pass";
        assert_eq!(defined_names(source), vec!["add", "Calculator"]);
    }

    #[test]
    fn fallback_templates_are_valid() {
        use crate::validate::is_valid_python;
        assert!(is_valid_python(FALLBACK_SOURCE));
        assert!(is_valid_python(FALLBACK_TESTS));
        assert!(has_test_function(FALLBACK_TESTS));
    }
}
