use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use vocal_range::analysis::{analyze_wav, AnalysisReport};
use vocal_range::audio::{CpalBackend, InputBackend};
use vocal_range::config::AppConfig;
use vocal_range::error::{AudioError, ErrorCode};
use vocal_range::http::{run_http_server, AppState, NO_MATCH_MESSAGE};
use vocal_range::notes::{frequency_to_midi, frequency_to_note, measured_note_name};
use vocal_range::session::RecordingSession;
use vocal_range::songs::{Song, SongCatalog};
use vocal_range::tracker::{RangeEvent, RangeSnapshot};

/// Exit code used when the microphone cannot be opened
const EXIT_MIC_UNAVAILABLE: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    name = "vocal_range",
    about = "Measure your vocal range and find songs that fit it"
)]
struct Cli {
    /// Configuration file (defaults to $VOCAL_RANGE_CONFIG or assets/vocal_range.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the note name nearest to each frequency
    Note {
        #[arg(required = true)]
        frequencies: Vec<f32>,
        #[arg(long)]
        json: bool,
    },
    /// List songs whose range fits inside the given MIDI note numbers
    Songs {
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        lowest: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        highest: i32,
        /// JSON song catalog replacing the builtin one
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Measure the range sung in a WAV recording
    Analyze {
        wav: PathBuf,
        #[arg(long)]
        json: bool,
        /// Also list matching songs
        #[arg(long)]
        suggest: bool,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Record from the microphone until Ctrl-C or the time limit
    Record {
        #[arg(long)]
        seconds: Option<u64>,
        #[arg(long)]
        suggest: bool,
        /// Input device name (substring match)
        #[arg(long)]
        device: Option<String>,
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Serve the song lookup page
    Serve {
        #[arg(long)]
        addr: Option<SocketAddr>,
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Attach a microphone session to the /range endpoints
        #[arg(long)]
        live: bool,
        #[arg(long)]
        device: Option<String>,
    },
    /// List available input devices
    Devices,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

/// Logs go to stderr so stdout stays machine readable.
fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Note { frequencies, json } => run_note(&frequencies, json),
        Commands::Songs {
            lowest,
            highest,
            catalog,
            json,
        } => {
            let catalog = load_catalog(catalog.as_deref())?;
            emit_songs(&catalog.matching(lowest, highest), json)?;
            Ok(ExitCode::from(0))
        }
        Commands::Analyze {
            wav,
            json,
            suggest,
            catalog,
        } => run_analyze(&config, &wav, json, suggest, catalog.as_deref()),
        Commands::Record {
            seconds,
            suggest,
            device,
            catalog,
            json,
        } => run_record(config, seconds, suggest, device, catalog.as_deref(), json),
        Commands::Serve {
            addr,
            catalog,
            live,
            device,
        } => run_serve(config, addr, catalog.as_deref(), live, device),
        Commands::Devices => {
            for name in CpalBackend::list_devices()? {
                println!("{}", name);
            }
            Ok(ExitCode::from(0))
        }
    }
}

fn load_catalog(path: Option<&Path>) -> Result<SongCatalog> {
    match path {
        Some(path) => SongCatalog::load_from_file(path)
            .with_context(|| format!("loading song catalog {}", path.display())),
        None => Ok(SongCatalog::builtin()),
    }
}

fn backend_for(device: Option<String>) -> Arc<dyn InputBackend> {
    match device {
        Some(name) => Arc::new(CpalBackend::with_device(name)),
        None => Arc::new(CpalBackend::new()),
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("building tokio runtime")
}

#[derive(Serialize)]
struct NoteLine {
    frequency_hz: f32,
    note: String,
    midi: Option<i32>,
}

fn run_note(frequencies: &[f32], json: bool) -> Result<ExitCode> {
    let lines: Vec<NoteLine> = frequencies
        .iter()
        .map(|&frequency_hz| NoteLine {
            frequency_hz,
            note: frequency_to_note(frequency_hz),
            midi: frequency_to_midi(frequency_hz),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
    } else {
        for line in lines {
            println!("{} Hz\t{}", line.frequency_hz, line.note);
        }
    }
    Ok(ExitCode::from(0))
}

fn emit_songs(songs: &[&Song], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(songs)?);
        return Ok(());
    }
    if songs.is_empty() {
        println!("{}", NO_MATCH_MESSAGE);
    }
    for song in songs {
        println!(
            "{} / {} ({} - {})",
            song.title,
            song.artist,
            song.min_name(),
            song.max_name()
        );
    }
    Ok(())
}

fn print_range(range: &RangeSnapshot) {
    let (lowest, highest) = range.note_numbers();
    println!("Lowest:  {} ({})", range.lowest_note, range.lowest_display);
    println!("Highest: {} ({})", range.highest_note, range.highest_display);
    println!(
        "Range:   {} - {} (MIDI {} - {})",
        measured_note_name(lowest),
        measured_note_name(highest),
        lowest,
        highest
    );
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    report: &'a AnalysisReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    songs: Option<Vec<&'a Song>>,
}

fn run_analyze(
    config: &AppConfig,
    wav: &Path,
    json: bool,
    suggest: bool,
    catalog_path: Option<&Path>,
) -> Result<ExitCode> {
    let report = analyze_wav(wav, config)?;
    let catalog = load_catalog(catalog_path)?;
    let (lowest, highest) = report.range.note_numbers();
    let songs = suggest.then(|| catalog.matching(lowest, highest));

    if json {
        let output = AnalyzeOutput {
            report: &report,
            songs,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(ExitCode::from(0));
    }

    println!(
        "{}: {:.2}s, {} of {} windows voiced",
        wav.display(),
        report.duration_secs,
        report.accepted,
        report.windows
    );
    print_range(&report.range);
    if let Some(songs) = songs {
        println!();
        emit_songs(&songs, false)?;
    }
    Ok(ExitCode::from(0))
}

fn describe_event(event: &RangeEvent) -> String {
    match event {
        RangeEvent::Highest { frequency_hz, note } => {
            format!("highest {} ({:.0} Hz)", note, frequency_hz)
        }
        RangeEvent::Lowest { frequency_hz, note } => {
            format!("lowest  {} ({:.0} Hz)", note, frequency_hz)
        }
        RangeEvent::Reset => "reset".to_string(),
    }
}

fn mic_unavailable(err: &AudioError) -> ExitCode {
    eprintln!(
        "Microphone unavailable (code {}): {}",
        err.code(),
        err.message()
    );
    ExitCode::from(EXIT_MIC_UNAVAILABLE)
}

fn run_record(
    config: AppConfig,
    seconds: Option<u64>,
    suggest: bool,
    device: Option<String>,
    catalog_path: Option<&Path>,
    json: bool,
) -> Result<ExitCode> {
    let catalog = load_catalog(catalog_path)?;
    let session = RecordingSession::new(backend_for(device), config);
    let mut events = session.subscribe();

    match session.start() {
        Ok(()) => {}
        Err(err) if err.is_access_failure() => return Ok(mic_unavailable(&err)),
        Err(err) => return Err(err).context("starting recording"),
    }
    eprintln!("Recording... sing from your lowest to your highest note (Ctrl-C to finish)");

    let runtime = build_runtime()?;
    runtime.block_on(async {
        let deadline = async {
            match seconds {
                Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
                None => std::future::pending::<()>().await,
            }
        };
        let interrupted = tokio::signal::ctrl_c();
        tokio::pin!(deadline, interrupted);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                _ = &mut interrupted => break,
                event = events.recv() => match event {
                    Ok(event) => eprintln!("  {}", describe_event(&event)),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });

    session.stop().context("stopping recording")?;
    let range = session.snapshot()?;
    let (lowest, highest) = range.note_numbers();
    let songs = suggest.then(|| catalog.matching(lowest, highest));

    if json {
        let mut value = serde_json::to_value(&range)?;
        if let Some(songs) = &songs {
            value["songs"] = serde_json::to_value(songs)?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_range(&range);
        if let Some(songs) = songs {
            println!();
            emit_songs(&songs, false)?;
        }
    }
    Ok(ExitCode::from(0))
}

fn run_serve(
    config: AppConfig,
    addr: Option<SocketAddr>,
    catalog_path: Option<&Path>,
    live: bool,
    device: Option<String>,
) -> Result<ExitCode> {
    let addr = match addr {
        Some(addr) => addr,
        None => config
            .http
            .addr
            .parse()
            .with_context(|| format!("parsing http.addr {:?}", config.http.addr))?,
    };

    let mut state = AppState::new(load_catalog(catalog_path)?);
    if live {
        state = state.with_session(Arc::new(RecordingSession::new(backend_for(device), config)));
    }

    eprintln!("Serving song lookup on http://{}", addr);
    build_runtime()?.block_on(run_http_server(state, addr))?;
    Ok(ExitCode::from(0))
}
