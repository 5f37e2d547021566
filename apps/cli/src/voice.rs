//! Spoken output and the interactive voice session.

use std::future::Future;
use std::path::{Path, PathBuf};

use color_eyre::eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use uuid::Uuid;

use meetnotes_core::SynthesisRequest;
use meetnotes_ingest::{
    CommandPlayer, CommandRecorder, OpenAiSynthesizer, SourceInput, Synthesizer, Transcriber,
};
use meetnotes_shared::{AppConfig, MeetNotesError, Mode, resolve_api_key};

use crate::commands::{build_pipeline, build_transcriber, cancel_on_ctrl_c};
use crate::progress::CliProgress;

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "stop"];

/// A fresh path in the temp dir for one recording or reply.
fn temp_audio_path(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("meetnotes-{prefix}-{}.wav", Uuid::now_v7()))
}

/// Run `work` unless Ctrl-C arrives first.
///
/// Once any Ctrl-C listener exists the default SIGINT exit is gone for the
/// process, so every blocking step of the session races one.
async fn unless_interrupted<T>(
    work: impl Future<Output = meetnotes_shared::Result<T>>,
) -> meetnotes_shared::Result<T> {
    tokio::select! {
        out = work => out,
        _ = tokio::signal::ctrl_c() => Err(MeetNotesError::Cancelled),
    }
}

fn saved_notice(path: &Path) -> String {
    format!("[saved] Response audio: {}", path.display())
}

/// True when the utterance is only a request to end the session.
fn is_exit_word(transcript: &str) -> bool {
    let word = transcript
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    EXIT_WORDS.contains(&word.as_str())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!(path = %path.display(), error = %e, "temp audio not removed");
    }
}

// ---------------------------------------------------------------------------
// Speaker
// ---------------------------------------------------------------------------

/// Synthesizes replies and plays or saves them.
pub(crate) struct Speaker {
    synth: OpenAiSynthesizer,
    player: CommandPlayer,
    save_to: Option<PathBuf>,
    playback: bool,
}

impl Speaker {
    pub(crate) fn new(config: &AppConfig, save_to: Option<PathBuf>, playback: bool) -> Result<Self> {
        let key = resolve_api_key(&config.speech.api_key_env)?;
        Ok(Self {
            synth: OpenAiSynthesizer::new(&config.speech, key)?,
            player: CommandPlayer::new(&config.audio),
            save_to,
            playback,
        })
    }

    /// Synthesize `text` into `path` and play it if enabled.
    async fn say(&self, text: &str, path: &Path) -> meetnotes_shared::Result<()> {
        self.synth.synthesize(text, path).await?;
        if self.playback {
            self.player.play(path).await?;
        }
        Ok(())
    }
}

/// Speak `text`. Failures are reported but never fail the command; Ctrl-C
/// stops playback. Temp audio is removed unless it was saved on purpose or
/// `keep` is set, in which case its path is printed.
pub(crate) async fn speak_and_clean_up(speaker: &Speaker, text: &str, keep: bool) {
    let path = speaker.save_to.clone().unwrap_or_else(|| temp_audio_path("reply"));

    match unless_interrupted(speaker.say(text, &path)).await {
        Ok(()) => {}
        Err(MeetNotesError::Cancelled) => eprintln!("Playback stopped."),
        Err(e) => eprintln!("warning: could not speak the reply: {e}"),
    }

    let written = tokio::fs::try_exists(&path).await.unwrap_or(false);
    if !written {
        return;
    }
    if speaker.save_to.is_some() || keep {
        eprintln!("{}", saved_notice(&path));
    } else {
        remove_quietly(&path).await;
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub(crate) struct VoiceOptions {
    pub keep_recordings: bool,
    pub response_audio: Option<PathBuf>,
    pub playback: bool,
}

/// Record, transcribe, summarize and speak, one turn at a time.
///
/// Earlier transcripts travel with each turn as conversation history.
/// The session ends on EOF, Ctrl-C at the prompt, or an exit word.
pub(crate) async fn run_session(config: &AppConfig, options: VoiceOptions) -> Result<()> {
    let pipeline = build_pipeline(config, false)?;
    let transcriber = build_transcriber(config)?;
    let recorder = CommandRecorder::new(&config.audio);
    let speaker = Speaker::new(config, options.response_audio.clone(), options.playback)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<String> = Vec::new();
    let mut turn = 0usize;

    println!("Voice session. Press Enter to start speaking, Enter again to stop.");
    println!("Say \"exit\" or press Ctrl-D to finish.");

    loop {
        println!();
        println!("[Enter] to record");
        let start = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        if start.is_none() {
            break;
        }

        let recording = temp_audio_path("turn");
        println!("Recording... press Enter to stop.");
        let recorded = unless_interrupted(recorder.record_until(&recording, async {
            let _ = lines.next_line().await;
        }))
        .await;

        let transcript = match recorded {
            Ok(()) => unless_interrupted(transcriber.transcribe(&recording)).await,
            Err(e) => Err(e),
        };
        if options.keep_recordings {
            if tokio::fs::try_exists(&recording).await.unwrap_or(false) {
                println!("[saved] Recording: {}", recording.display());
            }
        } else {
            remove_quietly(&recording).await;
        }

        let transcript = match transcript {
            Ok(t) => t.trim().to_string(),
            Err(MeetNotesError::Cancelled) => {
                println!("Turn cancelled.");
                continue;
            }
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        if transcript.is_empty() {
            println!("No speech detected.");
            continue;
        }
        println!("You said: {transcript}");
        if is_exit_word(&transcript) {
            break;
        }

        turn += 1;
        let request = SynthesisRequest::new(
            vec![SourceInput::Transcript {
                label: format!("turn {turn}"),
                body: transcript.clone(),
            }],
            Mode::Single,
        )
        .with_history(history.clone());

        let progress = CliProgress::new();
        let (cancel, watcher) = cancel_on_ctrl_c();
        let outcome = pipeline.synthesize(request, &progress, &cancel).await;
        watcher.abort();
        drop(progress);

        match outcome {
            Ok(result) => {
                history.push(transcript);
                println!();
                print!("{}", result.text);
                speak_and_clean_up(&speaker, &result.text, options.keep_recordings).await;
            }
            Err(MeetNotesError::Cancelled) => println!("Turn cancelled."),
            Err(e) if e.is_retryable() => eprintln!("error: {e} (try again)"),
            Err(e) => {
                warn!(error = %e, "turn failed");
                eprintln!("error: {e}");
            }
        }
    }

    println!("Session ended.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_words_ignore_case_and_punctuation() {
        assert!(is_exit_word("Exit."));
        assert!(is_exit_word("  quit!"));
        assert!(is_exit_word("STOP"));
        assert!(!is_exit_word("stop the rollout"));
        assert!(!is_exit_word("exits"));
    }

    #[test]
    fn saved_notice_names_the_file() {
        assert_eq!(
            saved_notice(Path::new("/tmp/reply.wav")),
            "[saved] Response audio: /tmp/reply.wav"
        );
    }

    #[tokio::test]
    async fn finished_work_passes_through() {
        let out = unless_interrupted(async { Ok::<_, MeetNotesError>(7) }).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn interrupt_cancels_pending_work() {
        let task = tokio::spawn(unless_interrupted(std::future::pending::<meetnotes_shared::Result<()>>()));
        // Let the task register its signal listener first.
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        let status = std::process::Command::new("kill")
            .args(["-s", "INT", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let out = tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(out, Err(MeetNotesError::Cancelled)));
    }

    #[test]
    fn temp_paths_are_unique_wav_files() {
        let a = temp_audio_path("turn");
        let b = temp_audio_path("turn");
        assert_ne!(a, b);
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("wav"));
    }
}
