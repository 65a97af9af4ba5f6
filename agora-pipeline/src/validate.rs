//! Structural validation of generated Python text.
//!
//! Generated code is executed by an external interpreter, so full parsing is
//! neither possible nor required here. The checks below catch the failure
//! modes that actually show up in model output: leftover Markdown fences,
//! unterminated triple-quoted strings, unbalanced brackets, block headers
//! with no body, and indentation on the first statement.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxIssue {
    Empty,
    LeftoverFence { line: usize },
    UnterminatedString,
    UnbalancedBrackets { line: usize },
    MissingBlockBody { line: usize },
    UnexpectedIndent { line: usize },
}

impl fmt::Display for SyntaxIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "text is empty"),
            Self::LeftoverFence { line } => {
                write!(f, "leftover backtick on line {line}")
            }
            Self::UnterminatedString => write!(f, "unterminated triple-quoted string"),
            Self::UnbalancedBrackets { line } => {
                write!(f, "unbalanced brackets at line {line}")
            }
            Self::MissingBlockBody { line } => {
                write!(f, "block header on line {line} has no indented body")
            }
            Self::UnexpectedIndent { line } => {
                write!(f, "unexpected indent on line {line}")
            }
        }
    }
}

const BLOCK_KEYWORDS: &[&str] = &[
    "def", "class", "if", "elif", "else", "for", "while", "try", "except", "finally", "with",
];

/// Check whether `text` is plausibly a complete Python program.
///
/// Returns every issue found rather than stopping at the first, so callers
/// can log the full picture before attempting repair.
pub fn check_python(text: &str) -> Vec<SyntaxIssue> {
    let mut issues = Vec::new();

    if text.trim().is_empty() {
        issues.push(SyntaxIssue::Empty);
        return issues;
    }

    let mut in_string: Option<&str> = None;
    let mut depth: i32 = 0;
    // Line number and indent of a block header still waiting for its body.
    let mut open_block: Option<(usize, usize)> = None;
    let mut seen_statement = false;

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;

        if let Some(delim) = in_string {
            if count_occurrences(line, delim) % 2 == 1 {
                in_string = None;
            }
            continue;
        }

        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        if stripped.contains('`') {
            issues.push(SyntaxIssue::LeftoverFence { line: lineno });
        }

        let indent = line.len() - line.trim_start().len();

        if !seen_statement && depth == 0 {
            if indent > 0 {
                issues.push(SyntaxIssue::UnexpectedIndent { line: lineno });
            }
            seen_statement = true;
        }

        if let Some((header_line, header_indent)) = open_block {
            if depth == 0 {
                if indent <= header_indent {
                    issues.push(SyntaxIssue::MissingBlockBody { line: header_line });
                }
                open_block = None;
            }
        }

        let scan = scan_line(line, depth);
        depth = scan.depth;
        if scan.negative {
            issues.push(SyntaxIssue::UnbalancedBrackets { line: lineno });
            depth = depth.max(0);
        }
        if let Some(delim) = scan.open_string {
            in_string = Some(delim);
            continue;
        }

        if depth == 0 && is_block_header(stripped) {
            open_block = Some((lineno, indent));
        }
    }

    if in_string.is_some() {
        issues.push(SyntaxIssue::UnterminatedString);
    }
    if depth != 0 {
        issues.push(SyntaxIssue::UnbalancedBrackets {
            line: text.lines().count(),
        });
    }
    if let Some((header_line, _)) = open_block {
        issues.push(SyntaxIssue::MissingBlockBody { line: header_line });
    }

    issues
}

/// Convenience wrapper for the common "is it valid" question.
pub fn is_valid_python(text: &str) -> bool {
    check_python(text).is_empty()
}

struct LineScan {
    depth: i32,
    negative: bool,
    open_string: Option<&'static str>,
}

/// Track bracket depth and triple-quote state across one line, skipping
/// single-quoted string contents and comments.
fn scan_line(line: &str, start_depth: i32) -> LineScan {
    let bytes = line.as_bytes();
    let mut depth = start_depth;
    let mut negative = false;
    let mut open_string = None;
    let mut in_quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = in_quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                in_quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'#' => break,
            b'"' | b'\'' => {
                if bytes[i..].starts_with(if b == b'"' { b"\"\"\"" } else { b"'''" }) {
                    let delim = if b == b'"' { "\"\"\"" } else { "'''" };
                    let rest = &line[i + 3..];
                    if let Some(close) = rest.find(delim) {
                        i += 3 + close + 3;
                        continue;
                    }
                    open_string = Some(delim);
                    break;
                }
                in_quote = Some(b);
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth < 0 {
                    negative = true;
                }
            }
            _ => {}
        }
        i += 1;
    }

    LineScan {
        depth,
        negative,
        open_string,
    }
}

fn count_occurrences(line: &str, needle: &str) -> usize {
    line.matches(needle).count()
}

fn is_block_header(stripped: &str) -> bool {
    if !stripped.ends_with(':') {
        return false;
    }
    let first = stripped
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .next()
        .unwrap_or("");
    BLOCK_KEYWORDS.contains(&first)
}
