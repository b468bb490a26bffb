//! pixkit: texture atlas compositing and media downloads from the
//! command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::DynamicImage;
use pixkit_compose::atlas::{self, AtlasLayout, SingleMode, TiledAtlas};
use pixkit_compose::color::parse_color_list;
use pixkit_compose::preview::PreviewBox;
use pixkit_compose::{
    Color, ColorGrid, ExportResolution, Gradient, OutputFormat, ResizeStrategy, Stop, channels,
    codec,
};
use pixkit_fetch::{
    DownloadJob, Downloader, FetchConfig, GifPreview, JobEvent, JobState, MediaInfo, Platform,
    YtDlp,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pixkit", version, about)]
struct Cli {
    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rasterize a color matrix.
    Grid(GridArgs),
    /// Tile several images into an atlas.
    Tile(TileArgs),
    /// Build an atlas from one image.
    Single(SingleArgs),
    /// Pack the R, G, B, and A channels into a 2x2 grayscale texture.
    Split(SplitArgs),
    /// Sample or render a color gradient.
    Gradient(GradientArgs),
    /// List the formats and subtitles of a video.
    Probe(ProbeArgs),
    /// Download a video (requires `yt-dlp`).
    Download(DownloadArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Grid(args) => cmd_grid(&args),
        Command::Tile(args) => cmd_tile(&args),
        Command::Single(args) => cmd_single(&args),
        Command::Split(args) => cmd_split(&args),
        Command::Gradient(args) => cmd_gradient(&args),
        Command::Probe(args) => cmd_probe(&args),
        Command::Download(args) => cmd_download(&args),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Shared options
// ---------------------------------------------------------------------------

/// Output resize strategy names.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    KeepNative,
    Concatenated,
    DownsampleX2,
    DownsampleX4,
    SingleCell,
    ConcatenatedX2,
}

impl From<StrategyArg> for ResizeStrategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::KeepNative => Self::KeepNative,
            StrategyArg::Concatenated => Self::Concatenated,
            StrategyArg::DownsampleX2 => Self::DownsampleX2,
            StrategyArg::DownsampleX4 => Self::DownsampleX4,
            StrategyArg::SingleCell => Self::SingleCell,
            StrategyArg::ConcatenatedX2 => Self::ConcatenatedX2,
        }
    }
}

/// Atlas grid options shared by `tile` and `single`.
#[derive(Args, Debug)]
struct LayoutArgs {
    /// Atlas layout JSON; flags below override its fields.
    #[arg(long, value_name = "PATH")]
    config_json: Option<PathBuf>,

    /// Number of cell rows.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=64))]
    rows: Option<u32>,

    /// Number of cell columns.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=64))]
    cols: Option<u32>,

    /// Color for empty cells, e.g. "#c8c8c8".
    #[arg(long, value_name = "COLOR")]
    fill: Option<Color>,

    /// Output sizing.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
}

impl LayoutArgs {
    fn resolve(&self) -> anyhow::Result<AtlasLayout> {
        let mut layout = match &self.config_json {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read config '{}'", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parse config '{}'", path.display()))?
            }
            None => AtlasLayout::default(),
        };
        if let Some(rows) = self.rows {
            layout.rows = rows;
        }
        if let Some(cols) = self.cols {
            layout.cols = cols;
        }
        if let Some(fill) = self.fill {
            layout.fill = fill.to_rgba(255).0;
        }
        if let Some(strategy) = self.strategy {
            layout.strategy = strategy.into();
        }
        layout.validate()?;
        tracing::debug!(?layout, "atlas layout");
        Ok(layout)
    }
}

/// Output file plus optional checkerboard preview.
#[derive(Args, Debug)]
struct OutputArgs {
    /// Output image (.png, .jpg or .bmp).
    #[arg(short, long)]
    output: PathBuf,

    /// Also write a checkerboard-backed preview PNG here.
    #[arg(long, value_name = "PATH")]
    preview: Option<PathBuf>,
}

impl OutputArgs {
    fn write(&self, image: &DynamicImage, preview: PreviewBox) -> anyhow::Result<()> {
        write_image(&self.output, image)?;
        if let Some(path) = &self.preview {
            let rendered = preview.render(image)?;
            write_image(path, &DynamicImage::ImageRgba8(rendered))?;
        }
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn read_image(path: &Path) -> anyhow::Result<DynamicImage> {
    let bytes = std::fs::read(path).with_context(|| format!("read '{}'", path.display()))?;
    codec::decode_dynamic(&bytes).with_context(|| format!("decode '{}'", path.display()))
}

fn write_image(path: &Path, image: &DynamicImage) -> anyhow::Result<()> {
    let format = OutputFormat::from_path(path)?;
    let bytes = codec::encode(image, format)?;
    ensure_parent_dir(path)?;
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))?;
    eprintln!(
        "wrote {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// grid
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
struct GridArgs {
    /// Load a saved matrix (`{rows, cols, matrix}` JSON).
    #[arg(long, value_name = "PATH", conflicts_with = "colors")]
    matrix: Option<PathBuf>,

    /// Row-major comma-separated colors, e.g. "#ff0000,#00ff00".
    #[arg(long, requires_all = ["rows", "cols"])]
    colors: Option<String>,

    /// Number of rows (with `--colors`).
    #[arg(long)]
    rows: Option<u32>,

    /// Number of columns (with `--colors`).
    #[arg(long)]
    cols: Option<u32>,

    /// Color for unfilled cells.
    #[arg(long, value_name = "COLOR")]
    default_color: Option<Color>,

    /// Export size as "WxH", e.g. 256x256, 512x256.
    #[arg(long, default_value = "256x256", conflicts_with = "cell_size")]
    resolution: ExportResolution,

    /// Render each cell as an N x N block instead of using `--resolution`.
    #[arg(long, value_name = "N")]
    cell_size: Option<u32>,

    /// Save the matrix JSON here as well.
    #[arg(long, value_name = "PATH")]
    save_matrix: Option<PathBuf>,

    /// Output image (.png, .jpg or .bmp).
    #[arg(short, long)]
    output: PathBuf,
}

fn cmd_grid(args: &GridArgs) -> anyhow::Result<()> {
    let mut grid = match (&args.matrix, &args.colors) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read matrix '{}'", path.display()))?;
            serde_json::from_str::<ColorGrid>(&text)
                .with_context(|| format!("parse matrix '{}'", path.display()))?
        }
        (None, Some(list)) => {
            let colors = parse_color_list(list)?;
            // clap enforces `requires_all`.
            let (rows, cols) = (args.rows.unwrap_or(1), args.cols.unwrap_or(1));
            ColorGrid::from_colors(rows, cols, &colors)?
        }
        (None, None) => bail!("either --matrix or --colors is required"),
    };
    if let Some(color) = args.default_color {
        grid.set_default_color(color);
    }

    let unfilled = grid.unfilled_cells().len();
    if unfilled > 0 {
        tracing::info!(unfilled, default = %grid.default_color(), "unfilled cells use the default color");
    }

    let rendered = match args.cell_size {
        Some(size) => grid.render_cells(size)?,
        None => {
            let d = args.resolution.dimensions();
            grid.render(d.width, d.height)?
        }
    };
    write_image(&args.output, &DynamicImage::ImageRgb8(rendered))?;

    if let Some(path) = &args.save_matrix {
        let json = serde_json::to_string_pretty(&grid)?;
        ensure_parent_dir(path)?;
        std::fs::write(path, json).with_context(|| format!("write '{}'", path.display()))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// tile / single
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
struct TileArgs {
    /// Source images in row-major order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    layout: LayoutArgs,

    #[command(flatten)]
    out: OutputArgs,
}

fn cmd_tile(args: &TileArgs) -> anyhow::Result<()> {
    let layout = args.layout.resolve()?;
    let images = args
        .inputs
        .iter()
        .map(|p| read_image(p).map(|img| img.to_rgba8()))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let groups = atlas::resolution_report(&images);
    if groups.len() > 1 {
        for (dims, members) in &groups {
            let names: Vec<_> = members
                .iter()
                .map(|&i| args.inputs[i].display().to_string())
                .collect();
            tracing::warn!(size = %dims, files = ?names, "inconsistent source resolution");
        }
    }
    if images.len() > layout.cell_count() {
        tracing::warn!(
            given = images.len(),
            cells = layout.cell_count(),
            "more images than cells; extras are ignored"
        );
    }

    let tiled = atlas::tile(&images, &layout)?;
    finish_atlas(&tiled, layout.strategy, &args.out)
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Paste the image into every cell.
    Repeat,
    /// Paste once and fill the remaining cells.
    First,
}

#[derive(Args, Debug)]
struct SingleArgs {
    /// Source image.
    input: PathBuf,

    /// How the image fills the grid.
    #[arg(long, value_enum, default_value = "repeat")]
    mode: ModeArg,

    #[command(flatten)]
    layout: LayoutArgs,

    #[command(flatten)]
    out: OutputArgs,
}

fn cmd_single(args: &SingleArgs) -> anyhow::Result<()> {
    let layout = args.layout.resolve()?;
    let source = read_image(&args.input)?.to_rgba8();
    let mode = match args.mode {
        ModeArg::Repeat => SingleMode::RepeatAll,
        ModeArg::First => SingleMode::FirstThenFill,
    };
    let image = atlas::single_compose(&source, &layout, mode)?;
    tracing::info!(
        out = %pixkit_compose::Dimensions::of(&image),
        strategy = %layout.strategy,
        "single atlas ready"
    );
    args.out.write(&image, PreviewBox::LARGE)
}

fn finish_atlas(
    tiled: &TiledAtlas,
    strategy: ResizeStrategy,
    out: &OutputArgs,
) -> anyhow::Result<()> {
    tracing::info!(
        sheet = %pixkit_compose::Dimensions::of(&tiled.image),
        placed = tiled.placed,
        padded = tiled.padded,
        %strategy,
        "atlas ready"
    );
    let image = tiled.resize_output(strategy)?;
    out.write(&image, PreviewBox::LARGE)
}

// ---------------------------------------------------------------------------
// split
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
struct SplitArgs {
    /// Source image; missing alpha is treated as opaque.
    input: PathBuf,

    /// Output sizing, with the source as one cell of a 2x2 grid.
    #[arg(long, value_enum, default_value = "concatenated")]
    strategy: StrategyArg,

    #[command(flatten)]
    out: OutputArgs,
}

fn cmd_split(args: &SplitArgs) -> anyhow::Result<()> {
    let source = read_image(&args.input)?;
    let packed = channels::split_pack_resize(&source, args.strategy.into())?;
    args.out.write(&packed, PreviewBox::SMALL)
}

// ---------------------------------------------------------------------------
// gradient
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
struct GradientArgs {
    /// Stops as "POS:COLOR" pairs, e.g. "0:#ff0000,0.5:#fff,1:#0000ff".
    /// Defaults to red to blue.
    #[arg(long)]
    stops: Option<String>,

    /// Print the color at these positions.
    #[arg(long, value_name = "T", value_delimiter = ',')]
    sample: Vec<f32>,

    /// Write a horizontal strip image here.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Strip width.
    #[arg(long, default_value_t = Gradient::STRIP_WIDTH)]
    width: u32,

    /// Strip height.
    #[arg(long, default_value_t = Gradient::STRIP_HEIGHT)]
    height: u32,
}

fn parse_stops(list: &str) -> anyhow::Result<Gradient> {
    let stops = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (pos, color) = pair
                .split_once(':')
                .with_context(|| format!("stop must be 'POS:COLOR', got '{pair}'"))?;
            let pos: f32 = pos
                .trim()
                .parse()
                .with_context(|| format!("invalid stop position '{pos}'"))?;
            Ok(Stop::new(pos, color.trim().parse()?))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Gradient::new(stops)?)
}

fn cmd_gradient(args: &GradientArgs) -> anyhow::Result<()> {
    let gradient = match &args.stops {
        Some(list) => parse_stops(list)?,
        None => Gradient::default(),
    };
    for &t in &args.sample {
        println!("{t}\t{}", gradient.color_at(t));
    }
    if let Some(path) = &args.output {
        let strip = gradient.render_strip(args.width, args.height)?;
        write_image(path, &DynamicImage::ImageRgb8(strip))?;
    } else if args.sample.is_empty() {
        bail!("nothing to do: pass --sample and/or --output");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// probe / download
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PlatformArg {
    Youtube,
    Twitter,
}

impl From<PlatformArg> for Platform {
    fn from(p: PlatformArg) -> Self {
        match p {
            PlatformArg::Youtube => Self::YouTube,
            PlatformArg::Twitter => Self::Twitter,
        }
    }
}

/// Extractor options shared by `probe` and `download`.
#[derive(Args, Debug)]
struct ExtractorArgs {
    /// Media page URL.
    url: String,

    /// Source platform.
    #[arg(long, value_enum, default_value = "twitter")]
    platform: PlatformArg,

    /// Extractor executable.
    #[arg(long, value_name = "PROGRAM", default_value = FetchConfig::DEFAULT_PROGRAM)]
    yt_dlp: PathBuf,
}

impl ExtractorArgs {
    fn downloader(&self) -> anyhow::Result<Downloader> {
        let driver = YtDlp::new(FetchConfig {
            program: self.yt_dlp.clone(),
            ..FetchConfig::default()
        });
        if !driver.is_available() {
            bail!(
                "'{}' was not found or does not run; install yt-dlp or pass --yt-dlp",
                self.yt_dlp.display()
            );
        }
        Ok(Downloader::new(Arc::new(driver)))
    }
}

#[derive(Args, Debug)]
struct ProbeArgs {
    #[command(flatten)]
    extractor: ExtractorArgs,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

fn probe(downloader: &mut Downloader, url: &str, platform: Platform) -> anyhow::Result<MediaInfo> {
    downloader.start_probe(url, platform)?;
    downloader.wait(|_| {});
    match downloader.state() {
        JobState::Ready(info) => Ok(info.clone()),
        _ => bail!(
            "{}",
            downloader.last_error().unwrap_or("probe ended without a result")
        ),
    }
}

fn cmd_probe(args: &ProbeArgs) -> anyhow::Result<()> {
    let mut downloader = args.extractor.downloader()?;
    let info = probe(
        &mut downloader,
        &args.extractor.url,
        args.extractor.platform.into(),
    )?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    println!("title: {}", info.title);
    if !info.formats.is_empty() {
        println!("formats:");
        for f in &info.formats {
            println!("  {}", f.label);
        }
    }
    println!("subtitles:");
    for s in &info.subtitles {
        println!("  {}", s.label);
    }
    Ok(())
}

#[derive(Args, Debug)]
struct DownloadArgs {
    #[command(flatten)]
    extractor: ExtractorArgs,

    /// Directory to download into.
    #[arg(short = 'd', long, default_value = ".")]
    dir: PathBuf,

    /// Format id from `probe` (YouTube).
    #[arg(long)]
    format: Option<String>,

    /// Subtitle language from `probe` (YouTube).
    #[arg(long, value_name = "LANG")]
    subs: Option<String>,

    /// Convert the result to GIF (Twitter).
    #[arg(long)]
    gif: bool,
}

fn cmd_download(args: &DownloadArgs) -> anyhow::Result<()> {
    let platform: Platform = args.extractor.platform.into();
    let job = DownloadJob {
        url: args.extractor.url.clone(),
        target_dir: args.dir.clone(),
        platform,
        format_id: args.format.clone(),
        subtitle_lang: args.subs.clone(),
        convert_to_gif: args.gif,
    };
    job.validate()?;

    let mut downloader = args.extractor.downloader()?;
    if job.needs_probe() {
        let info = probe(&mut downloader, &job.url, platform)?;
        if let Some(id) = &job.format_id
            && info.format(id).is_none()
        {
            tracing::warn!(format = %id, "format was not offered by the probe");
        }
        if let Some(lang) = &job.subtitle_lang
            && !info.has_subtitle(lang)
        {
            tracing::warn!(%lang, "subtitle language was not offered by the probe");
        }
    }

    downloader.start_download(job)?;
    let mut gif = None;
    downloader.wait(|event| match event {
        JobEvent::Progress(p) => eprintln!("{p}"),
        JobEvent::GifCreated(path) => gif = Some(path.clone()),
        JobEvent::Probed(_) | JobEvent::Finished(_) => {}
    });

    match downloader.state() {
        JobState::Completed(report) => {
            eprintln!("Download complete!");
            for file in &report.files {
                println!("{}", file.display());
            }
        }
        JobState::Failed(message) => bail!("{message}"),
        other => bail!("download ended in unexpected state '{}'", other.name()),
    }

    if let Some(path) = gif {
        let preview = GifPreview::open(&path)?;
        let (w, h) = preview.dimensions();
        eprintln!(
            "gif: {} ({w}x{h}, {} frames, {:.1}s loop)",
            path.display(),
            preview.frames().len(),
            preview.total_duration().as_secs_f32()
        );
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn stops_parse_pairs() {
        let g = parse_stops("1:#0000ff, 0:#ff0000").unwrap();
        assert_eq!(g.stops().len(), 2);
        assert_eq!(g.color_at(0.0), Color::new(255, 0, 0));
        assert!(parse_stops("0:#ff0000").is_err());
        assert!(parse_stops("zero:#fff,1:#000").is_err());
    }

    #[test]
    fn layout_flags_override_defaults() {
        let args = LayoutArgs {
            config_json: None,
            rows: Some(3),
            cols: None,
            fill: Some(Color::new(1, 2, 3)),
            strategy: Some(StrategyArg::DownsampleX2),
        };
        let layout = args.resolve().unwrap();
        assert_eq!(layout.rows, 3);
        assert_eq!(layout.cols, AtlasLayout::DEFAULT_COLS);
        assert_eq!(layout.fill, [1, 2, 3, 255]);
        assert_eq!(layout.strategy, ResizeStrategy::DownsampleX2);
    }

    #[test]
    fn layout_config_json_is_a_base() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, r#"{"rows": 4, "cols": 1, "strategy": "SingleCell"}"#).unwrap();
        let args = LayoutArgs {
            config_json: Some(path),
            rows: None,
            cols: Some(2),
            fill: None,
            strategy: None,
        };
        let layout = args.resolve().unwrap();
        assert_eq!((layout.rows, layout.cols), (4, 2));
        assert_eq!(layout.fill, AtlasLayout::DEFAULT_FILL);
        assert_eq!(layout.strategy, ResizeStrategy::SingleCell);
    }
}
