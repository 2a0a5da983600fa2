use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "veilframe", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print video metadata as JSON (requires `ffprobe` on PATH).
    Probe(ProbeArgs),
    /// Export the edited video.
    Export(ExportArgs),
    /// Composite a single frame and write it as PNG.
    Preview(PreviewArgs),
    /// Print the `ffmpeg -filter_complex` graph for a project.
    Filter(FilterArgs),
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Edit project JSON (mosaic regions and text overlays).
    #[arg(long)]
    project: PathBuf,

    /// Output file.
    #[arg(long)]
    out: PathBuf,

    /// Export config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Font used for text overlays; overrides the config.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Export backend.
    #[arg(long, value_enum, default_value_t = BackendChoice::Frames)]
    backend: BackendChoice,

    /// Frame pacing; overrides the config.
    #[arg(long, value_enum)]
    pacing: Option<PacingChoice>,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Edit project JSON.
    #[arg(long)]
    project: PathBuf,

    /// Timestamp as seconds or `MM:SS.cc`.
    #[arg(long, value_parser = parse_at)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Export config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Font used for text overlays; overrides the config.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FilterArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Edit project JSON.
    #[arg(long)]
    project: PathBuf,

    /// Export config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    /// Decode, composite and re-encode every frame.
    Frames,
    /// Single `ffmpeg -filter_complex` pass.
    Filter,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PacingChoice {
    RealTime,
    Immediate,
}

impl From<PacingChoice> for veilframe::PacingMode {
    fn from(c: PacingChoice) -> Self {
        match c {
            PacingChoice::RealTime => Self::RealTime,
            PacingChoice::Immediate => Self::Immediate,
        }
    }
}

fn parse_at(s: &str) -> Result<f64, String> {
    veilframe::parse_time(s).map_err(|e| e.to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Probe(args) => cmd_probe(args),
        Command::Export(args) => cmd_export(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Filter(args) => cmd_filter(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("veilframe={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, font: Option<PathBuf>) -> anyhow::Result<veilframe::ExportConfig> {
    let mut cfg = match path {
        Some(p) => veilframe::ExportConfig::from_path(p)?,
        None => veilframe::ExportConfig::default(),
    };
    cfg.apply_env();
    if font.is_some() {
        cfg.font_path = font;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn load_request(
    in_path: &Path,
    project: &Path,
    cfg: &veilframe::ExportConfig,
) -> anyhow::Result<(veilframe::ExportRequest, bool)> {
    let probed = veilframe::probe_video(&cfg.ffprobe_bin, in_path)
        .with_context(|| format!("probe '{}'", in_path.display()))?;
    let project = veilframe::EditProject::from_path(project)
        .with_context(|| format!("load project '{}'", project.display()))?;
    Ok((
        veilframe::ExportRequest::new(probed.metadata, &project),
        probed.has_audio,
    ))
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let cfg = load_config(None, None)?;
    let probed = veilframe::probe_video(&cfg.ffprobe_bin, &args.in_path)
        .with_context(|| format!("probe '{}'", args.in_path.display()))?;
    println!("{}", serde_json::to_string_pretty(&probed)?);
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(args.config.as_deref(), args.font)?;
    if let Some(p) = args.pacing {
        cfg.pacing = p.into();
    }
    let (request, has_audio) = load_request(&args.in_path, &args.project, &cfg)?;
    let duration = request.metadata.duration;

    let probe = veilframe::FfmpegCodecProbe::detect(&cfg.ffmpeg_bin)?;
    let pipeline = veilframe::Pipeline::new();
    let session = pipeline
        .start(request, cfg.clone())?
        .with_observer(veilframe::ProgressFn(move |p: u8| {
            tracing::info!(
                progress = p,
                at = %veilframe::format_time(duration * f64::from(p) / 100.0),
                "export progress"
            );
        }));

    match args.backend {
        BackendChoice::Frames => {
            let in_path = args.in_path.clone();
            let source_cfg = cfg.clone();
            let mut sink = veilframe::FfmpegCaptureSink::new(cfg.ffmpeg_bin.clone());
            let artifact = session.run(
                move |meta| {
                    veilframe::FfmpegFrameSource::open_with_metadata(
                        &in_path,
                        meta.clone(),
                        has_audio,
                        &source_cfg,
                    )
                },
                &mut sink,
                &probe,
            )?;
            artifact
                .write_to(&args.out)
                .with_context(|| format!("write '{}'", args.out.display()))?;
            eprintln!(
                "wrote {} ({}, {} frames)",
                args.out.display(),
                artifact.mime,
                artifact.frames
            );
        }
        BackendChoice::Filter => {
            let export = veilframe::FilterExport::new(&args.in_path, &args.out, has_audio);
            let outcome = export.run(session, &cfg.ffmpeg_bin, &probe)?;
            eprintln!("wrote {} ({})", outcome.output.display(), outcome.mime);
        }
    }
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref(), args.font)?;
    let (request, has_audio) = load_request(&args.in_path, &args.project, &cfg)?;

    let mut source = veilframe::FfmpegFrameSource::open_with_metadata(
        &args.in_path,
        request.metadata.clone(),
        has_audio,
        &cfg,
    )?;
    let mut renderer = veilframe::EffectRenderer::new(&cfg)?;
    let rendered = veilframe::render_preview(&mut source, &mut renderer, &request, args.at);
    veilframe::FrameSource::close(&mut source);
    let rendered = rendered?;
    for s in &rendered.skipped {
        eprintln!("skipped {}: {}", s.id, s.error);
    }

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let frame = rendered.frame;
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_filter(args: FilterArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref(), None)?;
    let (request, _) = load_request(&args.in_path, &args.project, &cfg)?;
    let graph = veilframe::build_complete_chain(
        &request.regions,
        &request.texts,
        &request.metadata,
        &veilframe::FilterOptions::from(&cfg),
    )?;
    println!("{}", graph.graph);
    Ok(())
}
