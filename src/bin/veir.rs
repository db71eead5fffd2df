use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "veir", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a project into a render plan (JSON).
    Plan(PlanArgs),
    /// Print the frame and audio chunk schedule of a project.
    Schedule(ScheduleArgs),
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Write the plan here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Fail on missing assets and malformed clips instead of skipping them.
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Output sample rate override.
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Output channel count override.
    #[arg(long)]
    channels: Option<u16>,
}

#[derive(Parser, Debug)]
struct ScheduleArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Sample frames per audio chunk.
    #[arg(long, default_value_t = veir::DEFAULT_AUDIO_CHUNK_FRAMES)]
    chunk_frames: u32,

    /// Print every frame and chunk instead of a summary.
    #[arg(long, default_value_t = false)]
    full: bool,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Schedule(args) => cmd_schedule(args),
    }
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let project = veir::Project::from_path(&args.in_path)?;
    let audio = match (args.sample_rate, args.channels) {
        (None, None) => None,
        (rate, channels) => Some(veir::AudioOutputOptions {
            sample_rate: rate.unwrap_or(veir::DEFAULT_SAMPLE_RATE),
            channels: channels.unwrap_or(veir::DEFAULT_CHANNELS),
        }),
    };
    let opts = veir::CompileOptions {
        audio,
        policy: if args.strict {
            veir::IntegrityPolicy::Strict
        } else {
            veir::IntegrityPolicy::Lenient
        },
    };

    let compiled = veir::compile(&project, &opts)?;
    for d in &compiled.diagnostics {
        eprintln!(
            "warning: {:?} track '{}'{}: {}",
            d.kind,
            d.track_id,
            d.clip_id
                .as_deref()
                .map(|c| format!(" clip '{c}'"))
                .unwrap_or_default(),
            d.message
        );
    }

    let json = compiled.plan.to_json_string()?;
    match &args.out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(out, json).with_context(|| format!("write plan '{}'", out.display()))?;
            eprintln!(
                "wrote {} (fingerprint {})",
                out.display(),
                compiled.plan.fingerprint()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_schedule(args: ScheduleArgs) -> anyhow::Result<()> {
    let project = veir::Project::from_path(&args.in_path)?;
    let plan = veir::compile(&project, &veir::CompileOptions::default())?.plan;
    let schedule = veir::build_schedule(
        &plan,
        &veir::ScheduleOpts {
            audio_chunk_frames: args.chunk_frames,
        },
    );

    if args.full {
        println!("{}", serde_json::to_string_pretty(&schedule)?);
        return Ok(());
    }

    println!("fps: {}", plan.meta.fps);
    println!("video frames: {}", schedule.video_frames.len());
    if let Some(last) = schedule.video_frames.last() {
        println!("last frame at: {} us", last.time_us.as_micros());
    }
    println!(
        "audio: {} samples @ {} Hz in {} chunks",
        schedule.total_samples(),
        plan.audio.sample_rate,
        schedule.audio_chunks.len()
    );
    Ok(())
}
