use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use anyhow::Context as _;
use apngview::AnimationSource as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "apngview", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print container metadata and frame records as JSON.
    Info(InfoArgs),
    /// Composite every frame and write one PNG per frame.
    Frames(FramesArgs),
    /// Play the animation headlessly with real frame timing.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input APNG.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FramesArgs {
    /// Input APNG.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory; frames are written as `frame_0000.png`, ...
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Input APNG.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Player options JSON file.
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Override the container loop count (0 plays forever).
    #[arg(long)]
    loops: Option<u32>,

    /// Stop after this many draws even if playback would continue.
    #[arg(long, default_value_t = 1000)]
    max_draws: u64,

    /// Log every tick and draw.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Frames(args) => cmd_frames(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn load(path: &std::path::Path) -> anyhow::Result<(apngview::PngSource, apngview::Animation)> {
    let mut source = apngview::PngSource::open(path)?;
    let (info, records) = source
        .decode_container()
        .with_context(|| format!("decode '{}'", path.display()))?;
    let anim = apngview::Animation::new(info, records)?;
    Ok((source, anim))
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let (_, anim) = load(&args.in_path)?;
    let json = serde_json::to_string_pretty(&anim).context("serialize animation")?;
    println!("{json}");
    Ok(())
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let (mut source, anim) = load(&args.in_path)?;
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    let base = source.decode_base_image(&anim)?;
    let mut cache = apngview::FrameCache::new(anim.frame_count());
    cache.put(0, Arc::new(base))?;

    for index in 0..anim.frame_count() {
        let frame = cache.resolve(index, &anim, &mut source, apngview::Verbosity::Silent)?;
        let out = args.out.join(format!("frame_{index:04}.png"));
        image::save_buffer_with_format(
            &out,
            frame.as_bytes(),
            frame.width(),
            frame.height(),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", out.display()))?;
    }

    eprintln!(
        "wrote {} frames to {}",
        anim.frame_count(),
        args.out.display()
    );
    Ok(())
}

/// Pending timer and redraw requests, shared between the player and the run loop.
#[derive(Debug, Default)]
struct HostRequests {
    deadline: Option<Instant>,
    redraw: bool,
}

#[derive(Debug, Default, Clone)]
struct HeadlessHost(Arc<Mutex<HostRequests>>);

impl HeadlessHost {
    fn take(&self) -> (Option<Instant>, bool) {
        let mut req = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        (req.deadline.take(), std::mem::take(&mut req.redraw))
    }
}

impl apngview::PlaybackHost for HeadlessHost {
    fn schedule_tick(&mut self, deadline: Instant) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).deadline = Some(deadline);
    }

    fn cancel_tick(&mut self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).deadline = None;
    }

    fn request_redraw(&mut self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).redraw = true;
    }
}

/// Surface that only counts presented canvases.
struct NullSurface {
    size: (u32, u32),
    presented: u64,
}

impl apngview::RenderSurface for NullSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn present(&mut self, _canvas: &apngview::CanvasBuffer, _scale: f32) {
        self.presented += 1;
    }
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let mut opts = match &args.opts {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("read opts '{}'", path.display()))?;
            apngview::PlayerOpts::from_json(&json)?
        }
        None => apngview::PlayerOpts::default(),
    };
    if args.loops.is_some() {
        opts.requested_loops = args.loops;
    }
    if args.verbose {
        opts.verbosity = apngview::Verbosity::Verbose;
    }
    let level = match opts.verbosity {
        apngview::Verbosity::Silent => tracing::Level::WARN,
        apngview::Verbosity::Debug => tracing::Level::DEBUG,
        apngview::Verbosity::Verbose => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let source = apngview::PngSource::open(&args.in_path)?;
    let host = HeadlessHost::default();
    let (tx, rx) = channel();
    let player = apngview::Player::new(Box::new(source), Box::new(host.clone()), opts)
        .with_notifier(tx);
    player
        .start()
        .with_context(|| format!("start playback of '{}'", args.in_path.display()))?;

    let canvas = player
        .canvas()
        .context("player has no canvas after start")?;
    let mut surface = NullSurface {
        size: (canvas.width, canvas.height),
        presented: 0,
    };

    let started = Instant::now();
    let mut draws = 0u64;
    while draws < args.max_draws {
        let (deadline, redraw) = host.take();
        if redraw {
            player.on_draw(&mut surface);
            draws += 1;
        }
        if !player.is_running() {
            break;
        }
        match deadline {
            Some(deadline) => {
                std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
                player.tick();
            }
            None if !redraw => break,
            None => {}
        }
    }
    player.stop();

    let mut skipped = 0u64;
    let mut loops = 0u32;
    for event in rx.try_iter() {
        match event {
            apngview::PlaybackEvent::FrameSkipped { .. } => skipped += 1,
            apngview::PlaybackEvent::LoopCompleted { loop_count, .. } => loops = loop_count,
            apngview::PlaybackEvent::Stopped { .. } => {}
        }
    }

    eprintln!(
        "presented {} frames, {} loops, {} skipped in {:.2?}",
        surface.presented,
        loops,
        skipped,
        started.elapsed()
    );
    Ok(())
}
