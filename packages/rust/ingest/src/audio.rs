//! Microphone capture and playback through external commands.
//!
//! Commands come from the `[audio]` config section as argv vectors; the
//! `{path}` placeholder is replaced with the audio file (appended when absent).

use std::future::Future;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, instrument, warn};

use meetnotes_shared::{AudioConfig, MeetNotesError, Result};

const PATH_PLACEHOLDER: &str = "{path}";

/// Split a command template into program and arguments for `path`.
fn expand_command(template: &[String], path: &Path) -> Result<(String, Vec<String>)> {
    let (program, rest) = template
        .split_first()
        .ok_or_else(|| MeetNotesError::config("audio command is empty"))?;

    let path_str = path.display().to_string();
    let mut args: Vec<String> = rest
        .iter()
        .map(|a| a.replace(PATH_PLACEHOLDER, &path_str))
        .collect();

    if !template.iter().any(|a| a.contains(PATH_PLACEHOLDER)) {
        args.push(path_str);
    }

    Ok((program.clone(), args))
}

/// Records until a stop signal arrives, e.g. the user pressing Enter.
#[derive(Debug, Clone)]
pub struct CommandRecorder {
    template: Vec<String>,
}

impl CommandRecorder {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            template: config.record_cmd.clone(),
        }
    }

    /// Start the recorder writing to `out`, wait for `stop`, then terminate it.
    #[instrument(skip_all, fields(out = %out.display()))]
    pub async fn record_until<F>(&self, out: &Path, stop: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (program, args) = expand_command(&self.template, out)?;

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MeetNotesError::Audio(format!(
                    "failed to start recorder: {e}. Is `{program}` installed?"
                ))
            })?;

        tokio::select! {
            _ = stop => {
                debug!("stop requested, terminating recorder");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "recorder did not terminate cleanly");
                }
            }
            status = child.wait() => {
                let status = status.map_err(|e| MeetNotesError::Audio(e.to_string()))?;
                if !status.success() {
                    return Err(MeetNotesError::Audio(format!("recorder exited with {status}")));
                }
            }
        }

        let size = tokio::fs::metadata(out).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(MeetNotesError::Audio(
                "no audio captured; check the microphone and record command".into(),
            ));
        }

        debug!(bytes = size, "recording saved");
        Ok(())
    }
}

/// Plays an audio file and waits for playback to finish.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    template: Vec<String>,
}

impl CommandPlayer {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            template: config.play_cmd.clone(),
        }
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn play(&self, path: &Path) -> Result<()> {
        let (program, args) = expand_command(&self.template, path)?;

        let status = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| {
                MeetNotesError::Audio(format!(
                    "failed to start player: {e}. Is `{program}` installed?"
                ))
            })?;

        if !status.success() {
            return Err(MeetNotesError::Audio(format!("player exited with {status}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn placeholder_is_substituted() {
        let (program, args) =
            expand_command(&argv(&["arecord", "-q", "{path}"]), Path::new("/tmp/a.wav")).unwrap();
        assert_eq!(program, "arecord");
        assert_eq!(args, vec!["-q", "/tmp/a.wav"]);
    }

    #[test]
    fn path_appended_without_placeholder() {
        let (_, args) = expand_command(&argv(&["afplay"]), Path::new("out.mp3")).unwrap();
        assert_eq!(args, vec!["out.mp3"]);
    }

    #[test]
    fn empty_command_is_config_error() {
        assert!(matches!(
            expand_command(&[], Path::new("x")),
            Err(MeetNotesError::Config { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn player_reports_failing_command() {
        let player = CommandPlayer {
            template: argv(&["sh", "-c", "exit 3", "{path}"]),
        };
        let err = player.play(Path::new("x.mp3")).await.unwrap_err();
        assert!(err.to_string().contains("player exited"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn recorder_stops_on_signal() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("turn.wav");
        let recorder = CommandRecorder {
            template: argv(&["sh", "-c", "printf data > \"$0\"; exec sleep 30", "{path}"]),
        };

        recorder
            .record_until(&out, tokio::time::sleep(Duration::from_millis(500)))
            .await
            .unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"data");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn recorder_without_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = CommandRecorder {
            template: argv(&["sh", "-c", "exit 0", "{path}"]),
        };
        let err = recorder
            .record_until(&dir.path().join("none.wav"), std::future::pending())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no audio captured"));
    }
}
