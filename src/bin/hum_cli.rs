use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hum_to_music::audio::write_wav_file;
use hum_to_music::engine::{BufferedCaptureDevice, CaptureDevice, EngineHandle};
use hum_to_music::playback::{render_result, OfflineRenderer, SynthBackend};
use hum_to_music::{AppConfig, DetectionResult, DrumKit, MelodyInstrument, PlaybackConfig, ScheduleTiming};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "hum_cli",
    about = "Turn hummed or beatboxed WAV recordings into notes, drum hits and music"
)]
struct Cli {
    /// JSON configuration file (defaults to assets/hum_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print the telemetry history to stderr when done
    #[arg(long, global = true)]
    telemetry: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect notes and percussion in a WAV file and print them as JSON
    Analyze {
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Re-synthesize a WAV recording offline
    Render {
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        playback: PlaybackArgs,
    },
    /// Record from the default microphone and print the detection result
    #[cfg(feature = "live_audio")]
    Record {
        #[arg(long, default_value_t = 5.0)]
        seconds: f32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Analyze a WAV file and play the result on the default output device
    #[cfg(feature = "live_audio")]
    Play {
        input: PathBuf,
        #[command(flatten)]
        playback: PlaybackArgs,
        /// Loop the sequence for this many seconds instead of playing it once
        #[arg(long)]
        loop_seconds: Option<f32>,
    },
}

#[derive(Args, Debug)]
struct PlaybackArgs {
    #[arg(long, default_value = "piano")]
    instrument: MelodyInstrument,
    #[arg(long, default_value = "acoustic")]
    kit: DrumKit,
    /// Tempo in BPM (defaults to the configured tempo)
    #[arg(long)]
    tempo: Option<u32>,
    /// Keep detected timing instead of one event per beat
    #[arg(long)]
    recorded: bool,
}

impl PlaybackArgs {
    fn to_config(&self, app: &AppConfig) -> PlaybackConfig {
        PlaybackConfig {
            melody_instrument: self.instrument,
            drum_kit: self.kit,
            tempo_bpm: self.tempo.unwrap_or(app.playback.tempo_bpm),
            timing: if self.recorded {
                ScheduleTiming::Recorded
            } else {
                ScheduleTiming::Sequenced
            },
            looping: false,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Analyze { input, output } => run_analyze(config, &input, output, cli.telemetry),
        Commands::Render {
            input,
            out,
            playback,
        } => run_render(config, &input, &out, &playback, cli.telemetry),
        #[cfg(feature = "live_audio")]
        Commands::Record { seconds, output } => run_record(config, seconds, output, cli.telemetry),
        #[cfg(feature = "live_audio")]
        Commands::Play {
            input,
            playback,
            loop_seconds,
        } => run_play(config, &input, &playback, loop_seconds, cli.telemetry),
    }
}

/// Run one recording through `engine` and return its result
fn capture(engine: &mut EngineHandle) -> Result<DetectionResult> {
    engine.start_recording().context("starting capture")?;
    let result = engine.stop_recording().context("analysing capture")?;
    Ok(result)
}

fn file_engine(
    config: AppConfig,
    input: &Path,
    backend: Arc<dyn SynthBackend>,
) -> Result<EngineHandle> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let device: Box<dyn CaptureDevice> = Box::new(BufferedCaptureDevice::from_encoded(bytes));
    EngineHandle::new(device, backend, config).context("invalid configuration")
}

fn run_analyze(
    config: AppConfig,
    input: &Path,
    output: Option<PathBuf>,
    telemetry: bool,
) -> Result<ExitCode> {
    let sample_rate = config.playback.output_sample_rate;
    let mut engine = file_engine(config, input, Arc::new(OfflineRenderer::new(sample_rate)))?;
    let result = capture(&mut engine)?;

    let report = AnalysisReport {
        source: input.display().to_string(),
        note_count: result.notes.len(),
        percussion_count: result.percussion.len(),
        result: &result,
    };
    emit_json(&report, output)?;
    emit_telemetry(&engine, telemetry)?;

    Ok(ExitCode::from(0))
}

fn run_render(
    config: AppConfig,
    input: &Path,
    out: &Path,
    playback: &PlaybackArgs,
    telemetry: bool,
) -> Result<ExitCode> {
    let sample_rate = config.playback.output_sample_rate;
    let playback_config = playback.to_config(&config);
    let mut engine = file_engine(config, input, Arc::new(OfflineRenderer::new(sample_rate)))?;
    let result = capture(&mut engine)?;

    if result.is_empty() {
        eprintln!("No musical elements detected in {}", input.display());
        emit_telemetry(&engine, telemetry)?;
        return Ok(ExitCode::from(2));
    }

    let samples = render_result(&result, &playback_config, sample_rate).context("rendering")?;
    write_wav_file(out, &samples, sample_rate)
        .with_context(|| format!("writing {}", out.display()))?;

    println!(
        "Rendered {} notes and {} hits ({:.2} s) to {}",
        result.notes.len(),
        result.percussion.len(),
        samples.len() as f32 / sample_rate as f32,
        out.display()
    );
    emit_telemetry(&engine, telemetry)?;
    Ok(ExitCode::from(0))
}

#[cfg(feature = "live_audio")]
fn run_record(
    config: AppConfig,
    seconds: f32,
    output: Option<PathBuf>,
    telemetry: bool,
) -> Result<ExitCode> {
    use hum_to_music::engine::CpalCaptureDevice;
    use std::time::Duration;

    let sample_rate = config.playback.output_sample_rate;
    let mut engine = EngineHandle::new(
        Box::new(CpalCaptureDevice::new()),
        Arc::new(OfflineRenderer::new(sample_rate)),
        config,
    )
    .context("invalid configuration")?;

    engine.start_recording().context("opening microphone")?;
    eprintln!("Recording for {:.1} s...", seconds);
    std::thread::sleep(Duration::from_secs_f32(seconds.max(0.1)));
    let result = engine.stop_recording().context("analysing recording")?;

    let report = AnalysisReport {
        source: "microphone".to_string(),
        note_count: result.notes.len(),
        percussion_count: result.percussion.len(),
        result: &result,
    };
    emit_json(&report, output)?;
    emit_telemetry(&engine, telemetry)?;
    Ok(ExitCode::from(0))
}

#[cfg(feature = "live_audio")]
fn run_play(
    config: AppConfig,
    input: &Path,
    playback: &PlaybackArgs,
    loop_seconds: Option<f32>,
    telemetry: bool,
) -> Result<ExitCode> {
    use hum_to_music::playback::CpalOutput;
    use std::time::Duration;

    let playback_config = PlaybackConfig {
        looping: loop_seconds.is_some(),
        ..playback.to_config(&config)
    };
    let output = Arc::new(CpalOutput::open().context("opening output device")?);
    let mut engine = file_engine(config, input, output)?;
    capture(&mut engine)?;

    let summary = engine
        .play_last(&playback_config)
        .context("starting playback")?;
    eprintln!(
        "Playing {} events at {} BPM ({:.2} s)",
        summary.events, summary.tempo_bpm, summary.length_seconds
    );
    match loop_seconds {
        Some(seconds) => std::thread::sleep(Duration::from_secs_f32(seconds.max(0.1))),
        None => engine.wait_for_playback()?,
    }
    // Let release tails ring out
    std::thread::sleep(Duration::from_millis(1500));
    engine.stop_playback()?;

    emit_telemetry(&engine, telemetry)?;
    Ok(ExitCode::from(0))
}

fn emit_json<T: Serialize>(value: &T, output_path: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}

fn emit_telemetry(engine: &EngineHandle, enabled: bool) -> Result<()> {
    if enabled {
        let json = serde_json::to_string_pretty(&engine.telemetry_snapshot())?;
        eprintln!("{json}");
    }
    Ok(())
}

#[derive(Serialize)]
struct AnalysisReport<'a> {
    source: String,
    note_count: usize,
    percussion_count: usize,
    result: &'a DetectionResult,
}
