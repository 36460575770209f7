use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use video_cropper_lib::core::frame::PreviewFrameData;
use video_cropper_lib::replay::{load_script, replay};
use video_cropper_lib::{CropperConfig, Rect, Size, StubMediaSurface};

#[derive(Parser, Debug)]
#[command(author, version, about = "Video crop-region metadata tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a scripted crop session and export its metadata log
    Replay(ReplayArgs),
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// JSON list of replay steps
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    /// Cropper config file (JSON)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Where to write the metadata export (defaults to the downloads folder)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Intrinsic video resolution
    #[arg(long, value_name = "WxH", default_value = "1920x1080", value_parser = parse_size)]
    source: Size,

    /// Rendered video size
    #[arg(long, value_name = "WxH", default_value = "640x360", value_parser = parse_size)]
    display: Size,

    /// Write the last preview frame as base64 RGBA JSON
    #[arg(long, value_name = "FILE")]
    dump_preview: Option<PathBuf>,
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let w: f64 = w.trim().parse().map_err(|_| format!("invalid width in '{s}'"))?;
    let h: f64 = h.trim().parse().map_err(|_| format!("invalid height in '{s}'"))?;
    Ok(Size::new(w, h))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Replay(args) => run_replay(args),
    }
}

fn run_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => CropperConfig::load(path)?,
        None => CropperConfig::default(),
    };
    if let Some(dir) = args.output_dir {
        config.export_dir = Some(dir);
    }

    let steps = load_script(&args.script)
        .with_context(|| format!("loading {}", args.script.display()))?;
    let media = StubMediaSurface::with_test_pattern(
        args.source,
        Rect::new(0.0, 0.0, args.display.width, args.display.height),
    );

    let session = replay(&steps, media, config)?;

    let export_dir = session.config().resolved_export_dir();
    let path = session
        .log()
        .write_export(&export_dir, &session.config().export_file_name)?;

    if let Some(preview_path) = args.dump_preview {
        let data: PreviewFrameData = session.preview().surface().frame_data();
        std::fs::write(&preview_path, serde_json::to_string(&data)?)
            .with_context(|| format!("writing {}", preview_path.display()))?;
    }

    println!("{} samples -> {}", session.log().len(), path.display());
    Ok(())
}
