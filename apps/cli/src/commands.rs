//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use meetnotes_core::{
    OpenRouterCompletion, Pipeline, SynthesisRequest, blank_template, review,
};
use meetnotes_ingest::{
    Adapters, DuckDuckGoSearch, EMPTY_TRANSCRIPT, HttpFetcher, OpenAiTranscriber, PdfTextExtractor,
    SourceInput, WebSearch,
};
use meetnotes_shared::{
    AppConfig, IngestionManifest, IngestionStatus, MeetNotesError, Mode, Provenance, init_config,
    load_config, resolve_api_key, validate_api_key,
};

use crate::progress::CliProgress;
use crate::voice::{self, Speaker, VoiceOptions};

/// Wrong number of sources for single mode.
const EXIT_SOURCE_COUNT: u8 = 2;
/// Sources could not be read, or too few qualified.
const EXIT_UNREADABLE: u8 = 3;
/// Audio input could not be transcribed.
const EXIT_TRANSCRIPTION: u8 = 4;
/// Audio input transcribed to nothing.
const EXIT_EMPTY_TRANSCRIPT: u8 = 5;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// meetnotes: first-person meeting summaries from notes, pages, PDFs and speech.
#[derive(Parser)]
#[command(
    name = "meetnotes",
    version,
    about = "Summarize meeting notes, web pages, PDFs and recordings into TL;DR, Decisions, Risks and Next Steps.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Summarize one source, or roll several up with --weekly.
    ///
    /// Every flag occurrence is its own source, in command-line order.
    /// With no sources, prints an introduction and the blank template.
    Summarize(SummarizeArgs),

    /// Interactive voice session: record, transcribe, summarize, speak.
    Voice(VoiceArgs),

    /// Review a code snippet.
    Review(ReviewArgs),

    /// Print the blank four-section template.
    Template,

    /// Start the inbound-message HTTP server.
    Serve(ServeArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
pub(crate) struct SummarizeArgs {
    /// Raw pasted text (repeatable).
    #[arg(long, value_name = "TEXT")]
    pub text: Vec<String>,

    /// Exact URL to fetch (repeatable).
    #[arg(long, value_name = "URL")]
    pub url: Vec<String>,

    /// Local PDF path (repeatable).
    #[arg(long, value_name = "PATH")]
    pub pdf: Vec<PathBuf>,

    /// Pre-recorded audio file to transcribe (repeatable).
    #[arg(long, value_name = "PATH")]
    pub audio: Vec<PathBuf>,

    /// Merge two or more sources into one weekly digest.
    #[arg(long)]
    pub weekly: bool,

    /// Read the summary aloud.
    #[arg(long)]
    pub speak: bool,

    #[command(flatten)]
    pub output: SpeechOutputArgs,

    #[command(flatten)]
    pub completion: CompletionArgs,

    #[command(flatten)]
    pub speech: SpeechArgs,
}

#[derive(Args, Debug)]
pub(crate) struct VoiceArgs {
    /// Keep microphone recordings instead of deleting them.
    #[arg(long)]
    pub keep_recordings: bool,

    #[command(flatten)]
    pub output: SpeechOutputArgs,

    #[command(flatten)]
    pub completion: CompletionArgs,

    #[command(flatten)]
    pub speech: SpeechArgs,
}

#[derive(Args, Debug)]
pub(crate) struct ReviewArgs {
    /// Code to review.
    #[arg(long, conflicts_with = "code_file", required_unless_present = "code_file")]
    pub code: Option<String>,

    /// File containing the code to review.
    #[arg(long, value_name = "PATH")]
    pub code_file: Option<PathBuf>,

    /// Web search query for background context.
    #[arg(long, value_name = "QUERY")]
    pub search: Option<String>,

    #[command(flatten)]
    pub completion: CompletionArgs,
}

#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    /// Listen host (overrides config).
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides config).
    #[arg(long)]
    pub port: Option<u16>,

    #[command(flatten)]
    pub completion: CompletionArgs,
}

/// Where synthesized speech goes.
#[derive(Args, Debug)]
pub(crate) struct SpeechOutputArgs {
    /// Save synthesized speech to this path (implies speaking).
    #[arg(long, value_name = "PATH")]
    pub response_audio: Option<PathBuf>,

    /// Do not play synthesized speech.
    #[arg(long)]
    pub no_playback: bool,
}

/// Completion overrides.
#[derive(Args, Debug)]
pub(crate) struct CompletionArgs {
    /// Completion model ID.
    #[arg(long)]
    pub model: Option<String>,

    /// Completion timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl CompletionArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.completion.model = model.clone();
        }
        if let Some(secs) = self.timeout {
            config.completion.timeout_secs = secs;
        }
    }
}

/// Speech overrides.
#[derive(Args, Debug)]
pub(crate) struct SpeechArgs {
    /// Speech-to-text model.
    #[arg(long)]
    pub stt_model: Option<String>,

    /// Text-to-speech voice.
    #[arg(long)]
    pub tts_voice: Option<String>,

    /// Text-to-speech speed (0.25 to 4.0).
    #[arg(long)]
    pub tts_speed: Option<f32>,
}

impl SpeechArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(model) = &self.stt_model {
            config.speech.stt_model = model.clone();
        }
        if let Some(voice) = &self.tts_voice {
            config.speech.tts_voice = voice.clone();
        }
        if let Some(speed) = self.tts_speed {
            config.speech.tts_speed = speed;
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Parsed arguments plus the raw matches, which carry argument positions.
pub(crate) struct Invocation {
    pub cli: Cli,
    matches: ArgMatches,
}

pub(crate) fn parse() -> Invocation {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    Invocation { cli, matches }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "meetnotes=info",
        1 => "meetnotes=debug",
        _ => "meetnotes=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(invocation: Invocation) -> Result<ExitCode> {
    let Invocation { cli, matches } = invocation;
    match cli.command {
        Command::Summarize(args) => {
            let sub = matches
                .subcommand_matches("summarize")
                .ok_or_else(|| eyre!("summarize arguments missing"))?;
            cmd_summarize(ordered_inputs(sub, &args), args).await
        }
        Command::Voice(args) => cmd_voice(args).await.map(|()| ExitCode::SUCCESS),
        Command::Review(args) => cmd_review(args).await.map(|()| ExitCode::SUCCESS),
        Command::Template => {
            print!("{}", blank_template());
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve(args) => cmd_serve(args).await.map(|()| ExitCode::SUCCESS),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        }
        .map(|()| ExitCode::SUCCESS),
    }
}

/// Collect sources across flag kinds in command-line order.
fn ordered_inputs(matches: &ArgMatches, args: &SummarizeArgs) -> Vec<SourceInput> {
    let positions = |id: &str| -> Vec<usize> {
        matches
            .indices_of(id)
            .map(|indices| indices.collect())
            .unwrap_or_default()
    };

    let mut indexed: Vec<(usize, SourceInput)> = Vec::new();
    for (n, (pos, body)) in positions("text").into_iter().zip(&args.text).enumerate() {
        indexed.push((pos, SourceInput::text(format!("text #{}", n + 1), body.clone())));
    }
    for (pos, url) in positions("url").into_iter().zip(&args.url) {
        indexed.push((pos, SourceInput::Url(url.clone())));
    }
    for (pos, path) in positions("pdf").into_iter().zip(&args.pdf) {
        indexed.push((pos, SourceInput::Pdf(path.clone())));
    }
    for (pos, path) in positions("audio").into_iter().zip(&args.audio) {
        indexed.push((pos, SourceInput::Audio(path.clone())));
    }

    indexed.sort_by_key(|(pos, _)| *pos);
    indexed.into_iter().map(|(_, input)| input).collect()
}

/// Exit code for request-level failures that have a dedicated one.
fn exit_code_for(err: &MeetNotesError) -> Option<u8> {
    let MeetNotesError::InsufficientSources {
        mode,
        qualified,
        rejected,
        ..
    } = err
    else {
        return None;
    };

    if *mode == Mode::Single && *qualified > 1 {
        return Some(EXIT_SOURCE_COUNT);
    }

    let audio = rejected.iter().find(|r| r.provenance == Provenance::Transcript);
    Some(match audio {
        Some(r) if r.reason == EMPTY_TRANSCRIPT => EXIT_EMPTY_TRANSCRIPT,
        Some(_) => EXIT_TRANSCRIPTION,
        None => EXIT_UNREADABLE,
    })
}

/// A token cancelled by Ctrl-C, plus the watcher task to abort when done.
pub(crate) fn cancel_on_ctrl_c() -> (CancellationToken, JoinHandle<()>) {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    (token, watcher)
}

/// Build the pipeline from config. The transcriber is only wired when needed.
pub(crate) fn build_pipeline(config: &AppConfig, with_transcriber: bool) -> Result<Pipeline> {
    let key = resolve_api_key(&config.completion.api_key_env)?;
    let completion = OpenRouterCompletion::new(&config.completion, key)?;

    let mut adapters = Adapters::new(
        Arc::new(HttpFetcher::new(&config.fetch)?),
        Arc::new(PdfTextExtractor),
    );
    if with_transcriber {
        adapters = adapters.with_transcriber(Arc::new(build_transcriber(config)?));
    }

    Ok(Pipeline::new(
        adapters,
        Arc::new(completion),
        Duration::from_secs(config.completion.timeout_secs),
    ))
}

pub(crate) fn build_transcriber(config: &AppConfig) -> Result<OpenAiTranscriber> {
    let key = resolve_api_key(&config.speech.api_key_env)?;
    Ok(OpenAiTranscriber::new(&config.speech, key)?)
}

fn report_manifest(manifest: &IngestionManifest) {
    if manifest.count(IngestionStatus::Ok) < manifest.len() {
        eprint!("{manifest}");
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_summarize(inputs: Vec<SourceInput>, args: SummarizeArgs) -> Result<ExitCode> {
    let mut config = load_config()?;
    args.completion.apply(&mut config);
    args.speech.apply(&mut config);
    validate_api_key(&config)?;

    let mode = if args.weekly { Mode::Weekly } else { Mode::Single };

    if inputs.is_empty() {
        let pipeline = build_pipeline(&config, false)?;
        let (cancel, watcher) = cancel_on_ctrl_c();
        let intro = pipeline.introduce(&cancel).await;
        watcher.abort();
        println!("{}", intro?);
        println!();
        print!("{}", blank_template());
        return Ok(ExitCode::SUCCESS);
    }

    if mode == Mode::Single && inputs.len() != 1 {
        eprintln!(
            "error: provide exactly one of --text, --url, --pdf or --audio (or use --weekly); got {}",
            inputs.len()
        );
        return Ok(ExitCode::from(EXIT_SOURCE_COUNT));
    }

    let needs_transcriber = inputs.iter().any(|i| matches!(i, SourceInput::Audio(_)));
    let pipeline = build_pipeline(&config, needs_transcriber)?;

    info!(%mode, sources = inputs.len(), "summarizing");

    let progress = CliProgress::new();
    let (cancel, watcher) = cancel_on_ctrl_c();
    let outcome = pipeline
        .synthesize(SynthesisRequest::new(inputs, mode), &progress, &cancel)
        .await;
    watcher.abort();
    drop(progress);

    let result = match outcome {
        Ok(result) => result,
        Err(e) => match exit_code_for(&e) {
            Some(code) => {
                eprintln!("error: {e}");
                return Ok(ExitCode::from(code));
            }
            None => return Err(e.into()),
        },
    };

    report_manifest(&result.manifest);
    print!("{}", result.text);

    if args.speak || args.output.response_audio.is_some() {
        let speaker = Speaker::new(&config, args.output.response_audio.clone(), !args.output.no_playback)?;
        voice::speak_and_clean_up(&speaker, &result.text, false).await;
    }

    Ok(ExitCode::SUCCESS)
}

async fn cmd_voice(args: VoiceArgs) -> Result<()> {
    let mut config = load_config()?;
    args.completion.apply(&mut config);
    args.speech.apply(&mut config);
    validate_api_key(&config)?;

    let options = VoiceOptions {
        keep_recordings: args.keep_recordings,
        response_audio: args.output.response_audio,
        playback: !args.output.no_playback,
    };
    voice::run_session(&config, options).await
}

async fn cmd_review(args: ReviewArgs) -> Result<()> {
    let mut config = load_config()?;
    args.completion.apply(&mut config);
    validate_api_key(&config)?;

    let code = match (args.code, &args.code_file) {
        (Some(code), _) => code,
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("cannot read {}: {e}", path.display()))?,
        (None, None) => return Err(eyre!("--code or --code-file is required")),
    };

    let key = resolve_api_key(&config.completion.api_key_env)?;
    let completion = OpenRouterCompletion::new(&config.completion, key)?;

    let engine = match &args.search {
        Some(_) => Some(DuckDuckGoSearch::new()?),
        None => None,
    };
    let search = engine
        .as_ref()
        .zip(args.search.as_deref())
        .map(|(engine, query)| (engine as &dyn WebSearch, query));

    let (cancel, watcher) = cancel_on_ctrl_c();
    let outcome = review(
        &code,
        &completion,
        search,
        Duration::from_secs(config.completion.timeout_secs),
        &cancel,
    )
    .await;
    watcher.abort();

    print!("{}", outcome?);
    Ok(())
}

async fn cmd_serve(args: ServeArgs) -> Result<()> {
    let mut config = load_config()?;
    args.completion.apply(&mut config);
    validate_api_key(&config)?;

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|e| eyre!("cannot resolve {host}:{port}: {e}"))?
        .next()
        .ok_or_else(|| eyre!("no address found for {host}:{port}"))?;

    let pipeline = build_pipeline(&config, false)?;
    let (shutdown, _watcher) = cancel_on_ctrl_c();

    println!("Listening on http://{addr} (Ctrl-C to stop)");
    meetnotes_server::serve(pipeline, addr, shutdown).await?;
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetnotes_shared::Rejection;

    fn summarize_inputs(argv: &[&str]) -> Vec<SourceInput> {
        let matches = Cli::command().try_get_matches_from(argv).unwrap();
        let cli = Cli::from_arg_matches(&matches).unwrap();
        let Command::Summarize(args) = cli.command else {
            panic!("expected summarize");
        };
        ordered_inputs(matches.subcommand_matches("summarize").unwrap(), &args)
    }

    #[test]
    fn sources_keep_command_line_order_across_flags() {
        let inputs = summarize_inputs(&[
            "meetnotes", "summarize", "--weekly",
            "--text", "A",
            "--url", "https://b.test",
            "--pdf", "c.pdf",
            "--text", "D",
        ]);

        assert_eq!(
            inputs,
            vec![
                SourceInput::text("text #1", "A"),
                SourceInput::Url("https://b.test".into()),
                SourceInput::Pdf("c.pdf".into()),
                SourceInput::text("text #2", "D"),
            ]
        );
    }

    #[test]
    fn repeated_flags_are_separate_sources() {
        let inputs = summarize_inputs(&["meetnotes", "summarize", "--url", "https://a.test", "--url", "https://b.test"]);
        assert_eq!(inputs.len(), 2);
    }

    #[test]
    fn review_requires_code_or_file() {
        assert!(Cli::try_parse_from(["meetnotes", "review"]).is_err());
        assert!(Cli::try_parse_from(["meetnotes", "review", "--code", "x = 1"]).is_ok());
    }

    fn insufficient(mode: Mode, qualified: usize, rejected: Vec<Rejection>) -> MeetNotesError {
        MeetNotesError::InsufficientSources {
            mode,
            required: mode.min_sources(),
            qualified,
            rejected,
        }
    }

    fn rejection(provenance: Provenance, reason: &str) -> Rejection {
        Rejection {
            provenance,
            origin: "x".into(),
            reason: reason.into(),
        }
    }

    #[test]
    fn exit_codes_follow_failure_kind() {
        let unreadable = insufficient(Mode::Single, 0, vec![rejection(Provenance::Url, "HTTP 404")]);
        assert_eq!(exit_code_for(&unreadable), Some(EXIT_UNREADABLE));

        let stt = insufficient(Mode::Single, 0, vec![rejection(Provenance::Transcript, "speech error: 401")]);
        assert_eq!(exit_code_for(&stt), Some(EXIT_TRANSCRIPTION));

        let empty = insufficient(Mode::Single, 0, vec![rejection(Provenance::Transcript, EMPTY_TRANSCRIPT)]);
        assert_eq!(exit_code_for(&empty), Some(EXIT_EMPTY_TRANSCRIPT));

        assert_eq!(exit_code_for(&insufficient(Mode::Single, 2, vec![])), Some(EXIT_SOURCE_COUNT));
        assert_eq!(exit_code_for(&MeetNotesError::completion_retryable("timeout")), None);
    }
}
