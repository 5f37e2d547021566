//! Code-review mode: a quick local scan of a snippet plus two completion
//! tasks, a critique and a plain-language explanation.

use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use meetnotes_ingest::WebSearch;
use meetnotes_shared::{MeetNotesError, Result};

use crate::completion::{TextCompletionService, complete_bounded};
use crate::intro::without_em_dashes;
use crate::prompts::{critique_prompt, explain_prompt};

const LONG_LINE: usize = 100;
const LARGE_SNIPPET: usize = 50;
const TODO_PREVIEW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    C,
    Unknown,
}

impl Language {
    fn detect(code: &str) -> Self {
        if code.contains("fn ") && (code.contains("let ") || code.contains("->")) {
            Self::Rust
        } else if code.contains("def ") && code.contains("class ") {
            Self::Python
        } else if code.contains("function ") && code.contains('{') {
            Self::JavaScript
        } else if code.contains("#include") {
            Self::C
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rust => "Rust",
            Self::Python => "Python",
            Self::JavaScript => "JavaScript",
            Self::C => "C/C++",
            Self::Unknown => "Unknown",
        })
    }
}

/// Result of the local static scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeReport {
    pub lines: usize,
    pub chars: usize,
    pub language: Language,
    /// Every TODO/FIXME line, trimmed.
    pub todos: Vec<String>,
    pub long_lines: usize,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Scan `code` for common problems. Pure string heuristics; nothing is parsed.
pub fn scan(code: &str) -> CodeReport {
    let lines: Vec<&str> = code.split('\n').collect();
    let lower = code.to_lowercase();

    let todos: Vec<String> = lines
        .iter()
        .filter(|l| {
            let upper = l.to_uppercase();
            upper.contains("TODO") || upper.contains("FIXME")
        })
        .map(|l| l.trim().to_string())
        .collect();
    let long_lines = lines.iter().filter(|l| l.chars().count() > LONG_LINE).count();

    let mut issues = Vec::new();
    if code.contains("print(") && !lower.contains("logging") {
        issues.push("Consider using logging instead of print statements".to_string());
    }
    if code.contains("except:") {
        issues.push("Consider specifying exception types instead of bare except".to_string());
    }
    if code.contains("eval(") || code.contains("exec(") {
        issues.push("eval/exec usage detected, which is a security risk".to_string());
    }
    if code.contains(".unwrap()") {
        issues.push("Consider propagating errors instead of calling unwrap()".to_string());
    }

    let mut suggestions = Vec::new();
    if lines.len() > LARGE_SNIPPET {
        suggestions.push("Consider breaking this into smaller functions".to_string());
    }
    if lower.contains("password") || lower.contains("secret") {
        suggestions.push("Make sure sensitive data is stored securely".to_string());
    }
    if code.contains("http://") {
        suggestions.push("Consider using HTTPS".to_string());
    }

    CodeReport {
        lines: lines.len(),
        chars: code.chars().count(),
        language: Language::detect(code),
        todos,
        long_lines,
        issues,
        suggestions,
    }
}

impl fmt::Display for CodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lines of code: {}", self.lines)?;
        writeln!(f, "Characters: {}", self.chars)?;
        writeln!(f, "Detected language: {}", self.language)?;

        let mut findings: Vec<String> = Vec::new();
        if !self.todos.is_empty() {
            findings.push(format!("- TODO/FIXME comments: {}", self.todos.len()));
            findings.extend(self.todos.iter().take(TODO_PREVIEW).map(|t| format!("  {t}")));
        }
        if self.long_lines > 0 {
            findings.push(format!("- Lines over {LONG_LINE} characters: {}", self.long_lines));
        }
        findings.extend(self.issues.iter().map(|i| format!("- {i}")));

        if findings.is_empty() {
            writeln!(f, "No obvious issues detected.")?;
        } else {
            writeln!(f, "Potential issues:")?;
            for finding in &findings {
                writeln!(f, "{finding}")?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f, "Suggestions:")?;
            for suggestion in &self.suggestions {
                writeln!(f, "- {suggestion}")?;
            }
        }
        Ok(())
    }
}

/// Full review output.
#[derive(Debug, Clone)]
pub struct Review {
    pub report: CodeReport,
    pub critique: String,
    pub explanation: String,
    /// Rendered search digest, when a lookup was requested and succeeded.
    pub background: Option<String>,
}

impl fmt::Display for Review {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Code scan:")?;
        write!(f, "{}", self.report)?;
        writeln!(f)?;
        writeln!(f, "Review:")?;
        writeln!(f, "{}", self.critique)?;
        writeln!(f)?;
        writeln!(f, "Explanation:")?;
        writeln!(f, "{}", self.explanation)
    }
}

/// Scan, optionally look up background, then run the critique and the
/// explanation. A failed search is logged and skipped.
#[instrument(skip_all, fields(chars = code.len(), search = search.is_some()))]
pub async fn review(
    code: &str,
    service: &dyn TextCompletionService,
    search: Option<(&dyn WebSearch, &str)>,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<Review> {
    if code.trim().is_empty() {
        return Err(MeetNotesError::validation("no code to review"));
    }

    let report = scan(code);

    let background = match search {
        None => None,
        Some((engine, query)) => match engine.search(query).await {
            Ok(digest) => Some(digest.render()),
            Err(e) => {
                warn!(error = %e, "search failed, reviewing without background");
                None
            }
        },
    };

    let critique = complete_bounded(
        service,
        &critique_prompt(code, &report.to_string(), background.as_deref()),
        deadline,
        cancel,
    )
    .await?;
    let explanation = complete_bounded(service, &explain_prompt(code), deadline, cancel).await?;

    info!(issues = report.issues.len(), language = %report.language, "review complete");

    Ok(Review {
        report,
        critique: without_em_dashes(critique.trim()),
        explanation: without_em_dashes(explanation.trim()),
        background,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use meetnotes_ingest::SearchDigest;

    use crate::completion::Prompt;

    #[test]
    fn scan_flags_common_python_problems() {
        let code = "class A:\n    def run(self):\n        # TODO: retry\n        try:\n            eval(x)\n        except:\n            print('x')\n";
        let report = scan(code);

        assert_eq!(report.language, Language::Python);
        assert_eq!(report.lines, 8);
        assert_eq!(report.todos, vec!["# TODO: retry"]);
        assert_eq!(report.issues.len(), 3);

        let text = report.to_string();
        assert!(text.contains("Potential issues:\n- TODO/FIXME comments: 1\n  # TODO: retry"));
        assert!(text.contains("- eval/exec usage detected"));
    }

    #[test]
    fn scan_clean_snippet() {
        let report = scan("#include <stdio.h>\nint main() { return 0; }");
        assert_eq!(report.language, Language::C);
        assert!(report.issues.is_empty());
        assert!(report.to_string().contains("No obvious issues detected."));
    }

    #[test]
    fn scan_suggestions() {
        let mut code = "const url = 'http://x.test'; // password\n".repeat(51);
        code.push_str(&"a".repeat(120));
        let report = scan(&code);
        assert_eq!(report.suggestions.len(), 3);
        assert_eq!(report.long_lines, 1);
    }

    struct ByTask;

    #[async_trait]
    impl TextCompletionService for ByTask {
        async fn complete(&self, prompt: &Prompt) -> Result<String> {
            if prompt.user.starts_with("Review") {
                assert!(prompt.user.contains("Summary: background"));
                Ok("Looks fine.".into())
            } else {
                Ok("It adds numbers.".into())
            }
        }
    }

    struct OneResult;

    #[async_trait]
    impl WebSearch for OneResult {
        async fn search(&self, _query: &str) -> Result<SearchDigest> {
            Ok(SearchDigest {
                summary: Some("background".into()),
                ..SearchDigest::default()
            })
        }
    }

    #[tokio::test]
    async fn review_runs_both_tasks_with_background() {
        let out = review(
            "fn add(a: i32) -> i32 { a + 1 }",
            &ByTask,
            Some((&OneResult as &dyn WebSearch, "rust add")),
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(out.report.language, Language::Rust);
        assert_eq!(out.critique, "Looks fine.");
        assert_eq!(out.explanation, "It adds numbers.");
        assert_eq!(out.background.as_deref(), Some("Summary: background"));
    }

    #[tokio::test]
    async fn empty_code_is_rejected() {
        let err = review("  ", &ByTask, None, Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MeetNotesError::Validation { .. }));
    }
}
