use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use nestep::eventloop::EventLoop;
use nestep::{Config, Nes};

const BENCHMARK_FRAMES: u64 = 180;

/// Cycle-accurate NES emulator
#[derive(Parser, Debug)]
#[command(name = "nestep", version)]
#[command(about = "A cycle-accurate NES emulator", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    rom: PathBuf,

    /// Number of frames to run (0 runs until the window is closed)
    #[arg(short, long, default_value_t = 0)]
    frames: u64,

    /// Limit sprites to 8 per scanline like the hardware
    #[arg(long)]
    sprite_limit: bool,

    #[arg(long, default_value_t = 44100)]
    audio_sample_rate: u32,

    /// 8 or 16
    #[arg(long, default_value_t = 16)]
    audio_bit_depth: u32,

    /// Run without window or audio
    #[arg(long)]
    headless: bool,

    /// Print frames per second at the end
    #[arg(long)]
    print_fps: bool,

    /// Print the checksum of the last frame at the end
    #[arg(long)]
    print_video_checksum: bool,

    /// Same as --headless --print-fps --print-video-checksum --frames 180
    #[arg(short, long)]
    benchmark: bool,

    /// Window scaling factor
    #[arg(long, default_value_t = 2.0)]
    scale: f32,

    /// 0 = error, 1 = warn, 2 = info, 3 = debug
    #[arg(long, default_value_t = 1)]
    loglevel: u8,

    /// Errors only
    #[arg(short, long)]
    quiet: bool,

    /// Same as --loglevel 2
    #[arg(short, long)]
    verbose: bool,

    /// Same as --loglevel 3
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn loglevel(&self) -> u8 {
        if self.debug {
            3
        } else if self.verbose {
            2
        } else if self.quiet {
            0
        } else {
            self.loglevel
        }
    }

    fn apply_benchmark(&mut self) {
        if self.benchmark {
            self.headless = true;
            self.print_fps = true;
            self.print_video_checksum = true;
            self.frames = BENCHMARK_FRAMES;
        }
    }

    fn config(&self) -> Config {
        Config {
            sprite_limit: self.sprite_limit,
            audio_sample_rate: self.audio_sample_rate,
            audio_bit_depth: self.audio_bit_depth,
            frames: self.frames,
        }
    }
}

fn init_logging(level: u8) {
    let default = match level {
        0 => "error",
        1 => "warn",
        2 => "info",
        _ => "warn,nestep=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

/// Run without SDL and report on stdout
fn run_headless(nes: &mut Nes, args: &Args) -> Result<()> {
    if args.frames == 0 {
        bail!("--headless needs --frames N with N > 0");
    }

    let start = Instant::now();
    for _ in 0..args.frames {
        nes.step();
    }
    let elapsed = start.elapsed().as_secs_f64();
    let fps = args.frames as f64 / elapsed.max(f64::EPSILON);

    info!("{} frames in {:.3}s", args.frames, elapsed);
    if args.print_fps {
        println!("fps: {:.2}", fps);
    }
    if args.print_video_checksum {
        println!("checksum: {}", nes.video_checksum());
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut args = Args::parse();
    args.apply_benchmark();
    init_logging(args.loglevel());

    let config = args.config();
    let rom = std::fs::read(&args.rom)
        .with_context(|| format!("failed to read ROM file {}", args.rom.display()))?;
    let mut nes = Nes::new(&config, &rom)
        .with_context(|| format!("failed to load {}", args.rom.display()))?;

    if args.headless {
        return run_headless(&mut nes, &args);
    }

    let mut event_loop = EventLoop::new(&config, args.scale)
        .map_err(anyhow::Error::msg)
        .context("failed to initialize SDL2")?;
    let start = Instant::now();
    event_loop
        .run(&mut nes, config.frames)
        .map_err(anyhow::Error::msg)
        .context("SDL2 frontend failed")?;

    let elapsed = start.elapsed().as_secs_f64();
    info!("{} frames in {:.3}s", nes.frame(), elapsed);
    if args.print_fps {
        println!("fps: {:.2}", nes.frame() as f64 / elapsed.max(f64::EPSILON));
    }
    if args.print_video_checksum {
        println!("checksum: {}", nes.video_checksum());
    }
    Ok(())
}
