//! Text-completion service: prompt in, prose out.
//!
//! [`OpenRouterCompletion`] speaks the OpenAI-compatible chat API. Every
//! caller goes through [`complete_bounded`], which applies the deadline and
//! the cancellation token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use meetnotes_shared::{CompletionConfig, MeetNotesError, Result};

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("meetnotes/", env!("CARGO_PKG_VERSION"));

/// A system + user message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[async_trait]
pub trait TextCompletionService: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String>;
}

/// Run one completion under a deadline, aborting early if `cancel` fires.
///
/// A timeout is a retryable [`MeetNotesError::CompletionUnavailable`];
/// cancellation is [`MeetNotesError::Cancelled`]. Neither yields any text.
pub async fn complete_bounded(
    service: &dyn TextCompletionService,
    prompt: &Prompt,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<String> {
    if cancel.is_cancelled() {
        return Err(MeetNotesError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("completion cancelled");
            Err(MeetNotesError::Cancelled)
        }
        result = tokio::time::timeout(deadline, service.complete(prompt)) => match result {
            Ok(inner) => inner,
            Err(_) => {
                warn!(deadline_ms = deadline.as_millis() as u64, "completion timed out");
                Err(MeetNotesError::completion_retryable(format!(
                    "no response within {:.1}s",
                    deadline.as_secs_f64()
                )))
            }
        },
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible chat completions
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// OpenRouter (or any OpenAI-compatible) `/chat/completions` client.
#[derive(Debug, Clone)]
pub struct OpenRouterCompletion {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenRouterCompletion {
    pub fn new(config: &CompletionConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| MeetNotesError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextCompletionService for OpenRouterCompletion {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("X-Title", "meetnotes")
            .json(&body)
            .send()
            .await
            .map_err(|e| MeetNotesError::completion_retryable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let reason = format!("HTTP {status}: {}", detail.trim());
            return Err(if is_retryable_status(status) {
                MeetNotesError::completion_retryable(reason)
            } else {
                MeetNotesError::completion_fatal(reason)
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| MeetNotesError::completion_fatal(format!("malformed response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(MeetNotesError::completion_retryable("empty completion"));
        }

        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prompt() -> Prompt {
        Prompt {
            system: "be brief".into(),
            user: "summarize".into(),
        }
    }

    fn client(base_url: &str) -> OpenRouterCompletion {
        let config = CompletionConfig {
            base_url: base_url.to_string(),
            model: "test/model".into(),
            ..CompletionConfig::default()
        };
        OpenRouterCompletion::new(&config, "sk-test").unwrap()
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "test/model",
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "summarize" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [ { "message": { "role": "assistant", "content": "  1) TL;DR:\n- ok  " } } ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server.uri()).complete(&prompt()).await.unwrap();
        assert_eq!(text, "1) TL;DR:\n- ok");
    }

    #[tokio::test]
    async fn server_errors_are_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client(&server.uri()).complete(&prompt()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn auth_errors_are_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = client(&server.uri()).complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, MeetNotesError::CompletionUnavailable { retryable: false, .. }));
        assert!(err.to_string().contains("invalid key"));
    }

    #[tokio::test]
    async fn empty_choices_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client(&server.uri()).complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, MeetNotesError::CompletionUnavailable { .. }));
    }

    struct Slow;

    #[async_trait]
    impl TextCompletionService for Slow {
        async fn complete(&self, _prompt: &Prompt) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".into())
        }
    }

    #[tokio::test]
    async fn bounded_times_out_as_retryable() {
        let cancel = CancellationToken::new();
        let err = complete_bounded(&Slow, &prompt(), Duration::from_millis(20), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn bounded_honors_cancellation() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = complete_bounded(&Slow, &prompt(), Duration::from_secs(10), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, MeetNotesError::Cancelled));
    }
}
