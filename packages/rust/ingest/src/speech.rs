//! Speech-to-text and text-to-speech over an OpenAI-compatible audio API.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use meetnotes_shared::{MeetNotesError, Result, SpeechConfig};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Converts a recorded audio file into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Returns the transcript; an empty string means nothing was heard.
    async fn transcribe(&self, audio: &Path) -> Result<String>;
}

/// Renders text as speech into an audio file.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, out: &Path) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Shared client
// ---------------------------------------------------------------------------

fn build_client(config: &SpeechConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| MeetNotesError::Speech(format!("failed to build HTTP client: {e}")))
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

/// MIME type for an upload, from the file extension.
fn audio_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Transcription
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// `POST {base_url}/audio/transcriptions` (multipart upload).
#[derive(Debug, Clone)]
pub struct OpenAiTranscriber {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(config: &SpeechConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            model: config.stt_model.clone(),
        })
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    #[instrument(skip_all, fields(path = %audio.display(), model = %self.model))]
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio).await.map_err(|e| {
            MeetNotesError::Speech(format!("cannot read {}: {e}", audio.display()))
        })?;
        if bytes.is_empty() {
            return Err(MeetNotesError::Speech(format!(
                "{} is empty",
                audio.display()
            )));
        }

        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(audio_mime(audio))
            .map_err(|e| MeetNotesError::Speech(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(endpoint(&self.base_url, "audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MeetNotesError::Speech(format!("transcription request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MeetNotesError::Speech(format!(
                "transcription API error {status}: {body}"
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| MeetNotesError::Speech(format!("invalid transcription response: {e}")))?;

        let text = parsed.text.trim().to_string();
        debug!(chars = text.len(), "transcription complete");
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

/// `POST {base_url}/audio/speech`; writes the returned audio to disk.
#[derive(Debug, Clone)]
pub struct OpenAiSynthesizer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    voice: String,
    speed: f32,
}

impl OpenAiSynthesizer {
    pub fn new(config: &SpeechConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            model: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
            speed: config.tts_speed.clamp(0.25, 4.0),
        })
    }
}

#[async_trait]
impl Synthesizer for OpenAiSynthesizer {
    #[instrument(skip_all, fields(out = %out.display(), voice = %self.voice))]
    async fn synthesize(&self, text: &str, out: &Path) -> Result<()> {
        if text.trim().is_empty() {
            return Err(MeetNotesError::Speech("nothing to synthesize".into()));
        }

        let format = match out.extension().and_then(|e| e.to_str()) {
            Some("wav") => "wav",
            Some("flac") => "flac",
            Some("opus") => "opus",
            _ => "mp3",
        };

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
            response_format: format,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "audio/speech"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| MeetNotesError::Speech(format!("speech request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MeetNotesError::Speech(format!(
                "speech API error {status}: {body}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| MeetNotesError::Speech(format!("speech body read failed: {e}")))?;
        if audio.is_empty() {
            return Err(MeetNotesError::Speech("speech API returned no audio".into()));
        }

        tokio::fs::write(out, &audio)
            .await
            .map_err(|e| MeetNotesError::io(out, e))?;

        debug!(bytes = audio.len(), "speech written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> SpeechConfig {
        SpeechConfig {
            base_url: base_url.to_string(),
            ..SpeechConfig::default()
        }
    }

    #[tokio::test]
    async fn transcribes_uploaded_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(bearer_token("sk-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "text": "  summarize the standup  " })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("turn.wav");
        std::fs::write(&audio, b"RIFF....WAVE").unwrap();

        let stt = OpenAiTranscriber::new(&config(&server.uri()), "sk-test").unwrap();
        let text = stt.transcribe(&audio).await.unwrap();
        assert_eq!(text, "summarize the standup");
    }

    #[tokio::test]
    async fn transcription_api_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("turn.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let stt = OpenAiTranscriber::new(&config(&server.uri()), "sk-bad").unwrap();
        let err = stt.transcribe(&audio).await.unwrap_err();
        assert!(matches!(err, MeetNotesError::Speech(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn empty_recording_is_rejected_without_request() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("silence.wav");
        std::fs::write(&audio, b"").unwrap();

        let stt = OpenAiTranscriber::new(&config("http://127.0.0.1:9"), "k").unwrap();
        assert!(stt.transcribe(&audio).await.is_err());
    }

    #[tokio::test]
    async fn synthesizes_to_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .and(body_partial_json(serde_json::json!({
                "model": "tts-1",
                "voice": "alloy",
                "response_format": "mp3"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xFB, 0x90]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reply.mp3");

        let tts = OpenAiSynthesizer::new(&config(&server.uri()), "sk-test").unwrap();
        tts.synthesize("1) TL;DR:", &out).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), vec![0xFF, 0xFB, 0x90]);
    }

    #[tokio::test]
    async fn synthesize_rejects_blank_text() {
        let tts = OpenAiSynthesizer::new(&config("http://127.0.0.1:9"), "k").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = tts.synthesize("   ", &dir.path().join("x.mp3")).await.unwrap_err();
        assert!(err.to_string().contains("nothing to synthesize"));
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(audio_mime(Path::new("a.WAV")), "audio/wav");
        assert_eq!(audio_mime(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(audio_mime(Path::new("a")), "application/octet-stream");
    }
}
