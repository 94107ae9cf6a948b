// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use keyscribe::midi::{print_sources, MidiHost, MidirHost, VirtualHost, VIRTUAL_KEYBOARD_NAME};
use keyscribe::music::MAJOR_SCALE;
use keyscribe::recording::session::{SIMULATED_GAP_MS, SIMULATED_NOTE_MS};
use keyscribe::{
    CompletedNote, FinishedSession, KeyscribeConfig, KeyscribeService, NotationSynthesizer,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn print_usage() {
    println!("keyscribe - MIDI keyboard to LilyPond transcriber");
    println!();
    println!("Usage: keyscribe [--config <path>] [--verbose] <command>");
    println!();
    println!("Commands:");
    println!("  --list-sources             List available MIDI devices");
    println!("  --record <seconds> [hint]  Record from the device matching hint and transcribe");
    println!("  --demo                     Record a simulated C major scale from the virtual keyboard");
    println!("  --synth <notes.yaml>       Print the LilyPond document for a YAML list of notes");
    println!("  --help                     Show this help message");
    println!();
    println!("Options:");
    println!("  --config <path>            Load settings from a YAML or TOML file");
    println!("  --verbose                  Log at debug level");
}

fn init_logging(config: &KeyscribeConfig, verbose: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.logging.max_level().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Write `<id>.mid`, render the score, and print what was produced
async fn transcribe(service: &KeyscribeService, session: &FinishedSession) -> Result<()> {
    println!(
        "Recorded {} notes in {:.1} seconds",
        session.note_count(),
        session.duration_ms as f64 / 1000.0
    );

    let midi_path = service.export_midi(session)?;
    println!("MIDI file:  {}", midi_path.display());

    let source = service.renderer().source_path(&session.id);
    match service.transcribe(session).await {
        Ok(result) => {
            println!("Notation:   {}", source.display());
            for artifact in &result.artifacts {
                println!(
                    "{:?}: {} ({} bytes)",
                    artifact.kind,
                    service.renderer().output_dir().join(&artifact.relative_path).display(),
                    artifact.size_bytes
                );
            }
        }
        Err(e) => {
            // The source document is written before the renderer runs
            warn!("Rendering failed: {}", e);
            println!("Notation:   {} (not rendered: {})", source.display(), e);
        }
    }
    Ok(())
}

async fn record(config: &KeyscribeConfig, seconds: u64, hint: Option<String>) -> Result<()> {
    let host: Arc<dyn MidiHost> = Arc::new(MidirHost::new(&config.device.client_name));
    let service = KeyscribeService::new(config, host);

    let hint = hint.or_else(|| config.device.name.clone()).unwrap_or_default();
    let handle = service
        .connect(&hint)
        .with_context(|| format!("Failed to connect to MIDI device '{}'", hint))?;
    println!("Connected to {}", handle.device.name);

    let id = service.start()?;
    println!("Recording {} for {} seconds, play now...", id, seconds);
    tokio::time::sleep(Duration::from_secs(seconds)).await;

    let session = service.stop()?;
    service.disconnect_all();
    transcribe(&service, &session).await
}

async fn demo(config: &KeyscribeConfig) -> Result<()> {
    let host = VirtualHost::new();
    let service = KeyscribeService::new(config, Arc::new(host));

    service.connect(VIRTUAL_KEYBOARD_NAME)?;
    let id = service.start()?;
    info!("Demo session {}", id);

    service.simulate_scale()?;
    // Let the clock run past the last simulated release
    let scale_ms = MAJOR_SCALE.len() as u64 * (SIMULATED_NOTE_MS + SIMULATED_GAP_MS);
    tokio::time::sleep(Duration::from_millis(scale_ms)).await;
    let session = service.stop()?;

    println!("{}", service.synthesize(&session));
    transcribe(&service, &session).await
}

fn synth(config: &KeyscribeConfig, path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read notes file: {:?}", path))?;
    let notes: Vec<CompletedNote> =
        serde_yaml::from_str(&contents).context("Failed to parse notes YAML")?;

    let document = NotationSynthesizer::new(config.notation.clone()).synthesize(&notes);
    print!("{}", document);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    let mut verbose = false;
    loop {
        match args.first().map(String::as_str) {
            Some("--config") => {
                if args.len() < 2 {
                    bail!("--config requires a path");
                }
                config_path = Some(PathBuf::from(args.remove(1)));
                args.remove(0);
            }
            Some("--verbose") | Some("-v") => {
                verbose = true;
                args.remove(0);
            }
            _ => break,
        }
    }

    let config = match &config_path {
        Some(path) => KeyscribeConfig::load(path)?,
        None => KeyscribeConfig::default(),
    };
    init_logging(&config, verbose)?;

    if args.is_empty() {
        println!("keyscribe - MIDI keyboard to LilyPond transcriber");
        println!("Run with --help for usage information");
        return Ok(());
    }

    match args[0].as_str() {
        "--list-sources" => {
            let host = MidirHost::new(&config.device.client_name);
            print_sources(&host)?;
        }
        "--record" => {
            if args.len() < 2 {
                eprintln!("Error: --record requires a duration in seconds");
                eprintln!("Use --list-sources to see available devices");
                std::process::exit(1);
            }
            let seconds: u64 = args[1]
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid duration: {}", args[1]))?;
            record(&config, seconds, args.get(2).cloned()).await?;
        }
        "--demo" => {
            demo(&config).await?;
        }
        "--synth" => {
            if args.len() < 2 {
                eprintln!("Error: --synth requires a notes file");
                std::process::exit(1);
            }
            synth(&config, Path::new(&args[1]))?;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown option: {}", args[0]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
