use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use scenecanvas::{
    AnimationState, CanvasConfig, Display, RendererKind, SceneDocument, SceneTransform, Subtree,
    TransformError,
};

#[derive(Parser, Debug)]
#[command(name = "scenecanvas", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every animation step of a scene document to PNG files.
    Frames(FramesArgs),
    /// Validate an animation save string and print it normalized.
    SaveString(SaveStringArgs),
}

#[derive(Parser, Debug)]
struct FramesArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Output directory; frames are written as `frame_0000.png`, `frame_0001.png`, ...
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct SaveStringArgs {
    /// Save string: `on forward current count dwell_0 .. dwell_n [compute]`.
    value: String,

    /// Number of animation steps to apply it to.
    #[arg(long, default_value_t = 1)]
    steps: usize,
}

/// Hands the document's content through unchanged.
struct DocumentContent;

impl SceneTransform for DocumentContent {
    type Input = Subtree;

    fn transform(&mut self, input: &Subtree) -> Result<Subtree, TransformError> {
        Ok(input.clone())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frames(args) => cmd_frames(args),
        Command::SaveString(args) => cmd_save_string(args),
    }
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let doc = SceneDocument::from_path(&args.scene)
        .with_context(|| format!("load scene '{}'", args.scene.display()))?;

    let mut display = Display::new(doc.config.clone()).context("create display")?;
    let content = display.add_renderer(RendererKind::Default, DocumentContent)?;
    display.set_data::<DocumentContent>(content, doc.content.clone())?;
    if !doc.samples.is_empty() {
        display.set_animation_samples(doc.samples.clone())?;
    }
    if let Some(dwell) = &doc.dwell_ms {
        let dwell: Vec<i64> = dwell
            .iter()
            .map(|&d| i64::try_from(d).unwrap_or(i64::MAX))
            .collect();
        display.animation().set_steps(&dwell).context("apply dwell times")?;
    }
    display.canvas().set_camera(doc.camera());
    if let Some(clip) = doc.clip() {
        display.canvas().set_clip(clip);
    }

    display.do_action();
    if let Some(err) = display.errors(content)?.first() {
        anyhow::bail!("scene content failed to build: {err}");
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;
    let steps = doc.step_count();
    for step in 0..steps {
        let raster = display
            .render(step)
            .with_context(|| format!("render step {step}"))?;
        let path = args.out.join(format!("frame_{step:04}.png"));
        raster
            .save_png(&path)
            .with_context(|| format!("write png '{}'", path.display()))?;
    }
    display.shutdown();

    eprintln!("wrote {steps} frame(s) to {}", args.out.display());
    Ok(())
}

fn cmd_save_string(args: SaveStringArgs) -> anyhow::Result<()> {
    let state = AnimationState::new(&CanvasConfig::default());
    state.set_samples((0..args.steps).map(|i| i as f64).collect())?;
    state
        .apply_save_string(&args.value)
        .with_context(|| format!("apply save string '{}'", args.value))?;
    println!("{}", state.save_string());
    Ok(())
}
