//! Extraction of code from raw generation output.
//!
//! Model output routinely wraps code in Markdown fences and front-loads
//! explanatory prose. Extraction strips the fences and retains everything
//! from the first line that starts a definition or import onward. Trailing
//! prose after the code is intentionally left in place; the validator and
//! emergency repair deal with it if it breaks the program.

use regex::Regex;
use std::sync::OnceLock;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[a-zA-Z0-9_+-]*\n?").expect("valid fence regex"))
}

/// Remove triple-backtick fences (with optional language tag) and inline
/// backticks.
pub fn strip_fences(raw: &str) -> String {
    let without_fences = fence_re().replace_all(raw, "");
    without_fences.replace('`', "")
}

/// Drop leading prose: retain lines starting at the first one that looks
/// like the beginning of actual code, then keep every line after it.
pub fn retain_from_first_definition(text: &str) -> String {
    let mut kept = Vec::new();
    let mut in_code = false;

    for line in text.lines() {
        if !in_code && starts_code(line.trim_start()) && !line.trim_start().is_empty() {
            in_code = true;
        }
        if in_code {
            kept.push(line);
        }
    }

    kept.join("\n")
}

fn starts_code(stripped: &str) -> bool {
    stripped.starts_with("def ")
        || stripped.starts_with("import ")
        || stripped.starts_with("from ")
        || stripped.starts_with('@')
        || (stripped.starts_with("class ") && stripped.contains(':'))
}

/// Full extraction: fences first, then boundary detection. The result is
/// trimmed of trailing whitespace but otherwise untouched.
pub fn extract_code(raw: &str) -> String {
    let stripped = strip_fences(raw);
    let retained = retain_from_first_definition(&stripped);
    retained.trim_end().to_string()
}
