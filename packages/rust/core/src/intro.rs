//! First-person introduction shown when no sources are supplied.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use meetnotes_markdown::sanitize;
use meetnotes_shared::{MeetNotesError, Result};

use crate::completion::{TextCompletionService, complete_bounded};
use crate::prompts::introduction_prompt;

/// Ask the completion service for a short self-introduction.
#[instrument(skip_all)]
pub async fn introduce(
    service: &dyn TextCompletionService,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<String> {
    let raw = complete_bounded(service, &introduction_prompt(), deadline, cancel).await?;
    let text = without_em_dashes(&sanitize(&raw));
    if text.is_empty() {
        return Err(MeetNotesError::completion_retryable("empty introduction"));
    }
    Ok(text)
}

/// Replace em dashes with commas.
pub fn without_em_dashes(text: &str) -> String {
    text.replace(" \u{2014} ", ", ").replace('\u{2014}', ", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::completion::Prompt;

    struct Echo(&'static str);

    #[async_trait]
    impl TextCompletionService for Echo {
        async fn complete(&self, prompt: &Prompt) -> Result<String> {
            assert!(prompt.user.contains("exactly 3 sentences"));
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn introduction_is_cleaned() {
        let text = introduce(
            &Echo("  I keep your notes tidy \u{2014} fast.  "),
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(text, "I keep your notes tidy, fast.");
    }

    #[test]
    fn em_dashes_become_commas() {
        assert_eq!(without_em_dashes("a\u{2014}b"), "a, b");
    }
}
