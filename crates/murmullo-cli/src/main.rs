//! Murmullo CLI - offline tooling for the murmullo synthesis engine.
//!
//! `murmullo render` drives the engine with a small scripted
//! soundscape and bounces the result to a WAV file; `murmullo presets`
//! lists the catalog. Live audio I/O belongs to the host application,
//! so everything here runs offline.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use murmullo_engine::{EngineConfig, NoteParams, PresetLibrary, SynthEngine};

#[derive(Parser)]
#[command(name = "murmullo")]
#[command(author, version, about = "Murmullo soundscape engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a demo soundscape to a WAV file
    Render(RenderArgs),

    /// List available presets
    Presets(PresetsArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Output WAV path
    #[arg(short, long, default_value = "soundscape.wav")]
    out: PathBuf,

    /// Length of the render in seconds
    #[arg(short, long, default_value_t = 12.0)]
    seconds: f32,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 48000)]
    sample_rate: u32,

    /// Directory of extra preset TOML files to load
    #[arg(long)]
    preset_dir: Option<PathBuf>,

    /// Master volume before the soft clip
    #[arg(long, default_value_t = 0.8)]
    master: f32,
}

#[derive(clap::Args)]
struct PresetsArgs {
    /// Directory of extra preset TOML files to load
    #[arg(long)]
    preset_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => render(args),
        Commands::Presets(args) => list_presets(args),
    }
}

fn load_library(preset_dir: Option<&PathBuf>) -> anyhow::Result<PresetLibrary> {
    let mut library = PresetLibrary::with_factory_presets()?;
    if let Some(dir) = preset_dir {
        let added = library
            .load_dir(dir)
            .with_context(|| format!("loading presets from {}", dir.display()))?;
        tracing::info!(added, "extra presets loaded");
    }
    Ok(library)
}

fn list_presets(args: PresetsArgs) -> anyhow::Result<()> {
    let library = load_library(args.preset_dir.as_ref())?;
    println!("{} presets:", library.len());
    for name in library.names() {
        println!("  {name}");
    }
    Ok(())
}

/// One scripted note: start time in seconds plus its trigger.
struct Cue {
    at: f32,
    preset: &'static str,
    pitch: u8,
    velocity: f32,
    position: (f32, f32, f32),
    duration: f32,
}

/// A little generative-feeling scene: a pad bed, bass anchors, and
/// scattered chimes and plucks at different distances.
fn soundscape() -> Vec<Cue> {
    let mut cues = vec![
        Cue { at: 0.0, preset: "warm_pad", pitch: 45, velocity: 0.8, position: (0.0, 0.0, 1.0), duration: 9.0 },
        Cue { at: 0.1, preset: "warm_pad", pitch: 52, velocity: 0.7, position: (-0.4, 0.0, 1.5), duration: 9.0 },
        Cue { at: 0.2, preset: "warm_pad", pitch: 60, velocity: 0.6, position: (0.4, 0.0, 1.5), duration: 9.0 },
        Cue { at: 0.0, preset: "noise_wash", pitch: 60, velocity: 0.5, position: (0.0, 0.0, 3.0), duration: 10.0 },
        Cue { at: 1.0, preset: "deep_bass", pitch: 33, velocity: 0.9, position: (0.0, 0.0, 0.5), duration: 1.8 },
        Cue { at: 5.0, preset: "deep_bass", pitch: 36, velocity: 0.9, position: (0.0, 0.0, 0.5), duration: 1.8 },
    ];
    let chimes = [
        (2.0, 84, 0.9f32, 1.2f32),
        (2.7, 88, 0.6, -0.8),
        (3.5, 91, 0.7, 0.3),
        (4.6, 79, 0.5, -1.5),
        (6.2, 86, 0.8, 0.9),
        (7.1, 93, 0.4, -0.4),
        (8.0, 81, 0.6, 1.8),
    ];
    for (at, pitch, velocity, x) in chimes {
        cues.push(Cue {
            at,
            preset: "wind_chime",
            pitch,
            velocity,
            position: (x, 0.5, 2.0),
            duration: 2.5,
        });
    }
    let plucks = [(2.5, 72u8), (4.0, 76), (5.5, 69), (7.5, 74)];
    for (at, pitch) in plucks {
        cues.push(Cue {
            at,
            preset: "glass_pluck",
            pitch,
            velocity: 0.8,
            position: (0.0, 0.0, 1.0),
            duration: 1.0,
        });
    }
    cues.sort_by(|a, b| a.at.total_cmp(&b.at));
    cues
}

fn render(args: RenderArgs) -> anyhow::Result<()> {
    let library = Arc::new(load_library(args.preset_dir.as_ref())?);

    let sample_rate = args.sample_rate as f32;
    let config = EngineConfig {
        sample_rate,
        pool_size: 32,
        master_volume: args.master,
        ..EngineConfig::default()
    };
    let (mut engine, mut handle) = SynthEngine::new(config, Arc::clone(&library))?;

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: args.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&args.out, spec)
        .with_context(|| format!("creating {}", args.out.display()))?;

    const BLOCK: usize = 512;
    let total_frames = (args.seconds * sample_rate) as u64;
    let mut cues = soundscape().into_iter().peekable();
    let mut block = [0.0f32; BLOCK * 2];
    let mut rendered: u64 = 0;

    tracing::info!(
        seconds = args.seconds,
        sample_rate = args.sample_rate,
        out = %args.out.display(),
        "rendering soundscape"
    );

    while rendered < total_frames {
        // Submit every cue due within this block.
        let block_end_secs = (rendered + BLOCK as u64) as f32 / sample_rate;
        while let Some(cue) = cues.next_if(|cue| cue.at < block_end_secs) {
            let mut params = NoteParams::new(
                library
                    .get(cue.preset)
                    .with_context(|| format!("preset {} missing", cue.preset))?,
            )
            .pitch(cue.pitch)
            .velocity(cue.velocity)
            .position(cue.position.0, cue.position.1, cue.position.2);
            if cue.duration > 0.0 {
                params = params.duration(cue.duration);
            }
            if handle.fire(params).is_err() {
                tracing::warn!(preset = cue.preset, "command queue full, cue dropped");
            }
        }

        engine.render(2, &mut block);
        let frames = BLOCK.min((total_frames - rendered) as usize);
        for &sample in &block[..frames * 2] {
            let quantized = (sample * f32::from(i16::MAX)) as i16;
            writer.write_sample(quantized)?;
        }
        rendered += frames as u64;
    }

    writer.finalize()?;
    tracing::info!(
        frames = total_frames,
        dropped = handle.diagnostics().rejected_commands,
        "render complete"
    );
    Ok(())
}
