//! ringprofile CLI — radial intensity profiles from the command line.

use clap::{Args, Parser, Subcommand, ValueEnum};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::path::{Path, PathBuf};

use ringprofile::{
    draw_ring_overlay, table, Calibration, ProfileConfig, RadialMetric, RadialProfile,
    RadialProfiler, RectRoi,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "ringprofile")]
#[command(about = "Mean intensity in concentric rings around a chosen image center")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the radial profile of an image.
    Profile(CliProfileArgs),

    /// Print the ring boundaries for a radius/width/calibration.
    Rings(CliRingsArgs),

    /// Write a default config file.
    InitConfig {
        /// Destination path (JSON).
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct CliProfileArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Center x in physical units.
    #[arg(long, allow_hyphen_values = true)]
    center_x: Option<f64>,

    /// Center y in physical units.
    #[arg(long, allow_hyphen_values = true)]
    center_y: Option<f64>,

    /// Rectangular selection X Y W H (pixels); its center seeds the profile.
    #[arg(
        long,
        num_args = 4,
        value_names = ["X", "Y", "W", "H"],
        allow_hyphen_values = true,
        conflicts_with_all = ["center_x", "center_y"]
    )]
    roi: Option<Vec<f64>>,

    /// JSON config file (`ringprofile.config.v1`); flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    params: CliParamArgs,

    /// Median pre-filter radius in pixels (0 disables).
    #[arg(long)]
    median_radius: Option<u32>,

    /// Distance metric used to bin pixels.
    #[arg(long, value_enum)]
    metric: Option<MetricArg>,

    /// Run the aggregation pass on a single thread.
    #[arg(long)]
    serial: bool,

    /// Path to write the results table (CSV). Printed to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Path to write the full profile (JSON).
    #[arg(long)]
    json: Option<PathBuf>,

    /// Path to write the source image with ring outlines (PNG).
    #[arg(long)]
    overlay: Option<PathBuf>,
}

#[derive(Debug, Clone, Args, Default)]
struct CliParamArgs {
    /// Maximum radius in physical units.
    #[arg(long)]
    max_radius: Option<f64>,

    /// Ring width in physical units.
    #[arg(long)]
    ring_width: Option<f64>,

    /// Physical pixel width.
    #[arg(long)]
    pixel_width: Option<f64>,

    /// Physical pixel height (defaults to the pixel width).
    #[arg(long)]
    pixel_height: Option<f64>,

    /// Physical unit name.
    #[arg(long)]
    unit: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct CliRingsArgs {
    /// Optional JSON config file; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    params: CliParamArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MetricArg {
    Pixel,
    Physical,
}

impl MetricArg {
    fn to_core(self) -> RadialMetric {
        match self {
            Self::Pixel => RadialMetric::Pixel,
            Self::Physical => RadialMetric::Physical,
        }
    }
}

impl CliParamArgs {
    /// Apply the geometry/calibration overrides on top of `config`.
    fn apply(&self, config: &mut ProfileConfig) -> CliResult<()> {
        if let Some(r) = self.max_radius {
            config.max_radius = r;
        }
        if let Some(w) = self.ring_width {
            config.ring_width = w;
        }
        if self.pixel_width.is_some() || self.pixel_height.is_some() || self.unit.is_some() {
            let pw = self.pixel_width.unwrap_or(config.calibration.pixel_width);
            let ph = self
                .pixel_height
                .or(self.pixel_width)
                .unwrap_or(config.calibration.pixel_height);
            let unit = self
                .unit
                .clone()
                .unwrap_or_else(|| config.calibration.unit.clone());
            config.calibration = Calibration::new(unit, pw, ph)?;
        }
        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> CliResult<ProfileConfig> {
    match path {
        Some(p) => {
            tracing::info!("Loading config: {}", p.display());
            ProfileConfig::from_json_file(p)
        }
        None => Ok(ProfileConfig::default()),
    }
}

impl CliProfileArgs {
    fn to_config(&self) -> CliResult<ProfileConfig> {
        let mut config = load_config(self.config.as_deref())?;
        self.params.apply(&mut config)?;
        if let Some(r) = self.median_radius {
            config.median_radius_px = Some(r);
        }
        if let Some(m) = self.metric {
            config.metric = m.to_core();
        }
        if self.serial {
            config.parallel = false;
        }
        config.validate()?;
        Ok(config)
    }

    /// Center in physical units, from the ROI or the explicit coordinates.
    fn center(&self, calibration: &Calibration) -> CliResult<[f64; 2]> {
        if let Some(roi) = &self.roi {
            let roi = RectRoi::new(roi[0], roi[1], roi[2], roi[3]);
            return Ok(roi.center_physical(calibration));
        }
        match (self.center_x, self.center_y) {
            (Some(x), Some(y)) => Ok([x, y]),
            _ => Err("provide both --center-x and --center-y, or --roi X Y W H".into()),
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Profile(args) => run_profile(&args),
        Commands::Rings(args) => run_rings(&args),
        Commands::InitConfig { out } => run_init_config(&out),
    }
}

// ── init-config ───────────────────────────────────────────────────────

fn run_init_config(out: &Path) -> CliResult<()> {
    ProfileConfig::default().to_json_file(out)?;
    tracing::info!("Default config written to {}", out.display());
    Ok(())
}

// ── rings ─────────────────────────────────────────────────────────────

fn run_rings(args: &CliRingsArgs) -> CliResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    args.params.apply(&mut config)?;
    let geometry = RadialProfiler::new(config.clone()).geometry()?;
    let unit = &config.calibration.unit;

    println!(
        "{} rings of {} {} ({:.4} px)",
        geometry.len(),
        geometry.ring_width(),
        unit,
        geometry.ring_width_px()
    );
    println!(
        "{:>5}  {:>12}  {:>12}  {:>14}",
        "Ring",
        "Inner_px",
        "Outer_px",
        format!("Mid_{}", unit)
    );
    for ring in geometry.rings() {
        println!(
            "{:>5}  {:>12.4}  {:>12.4}  {:>14.4}",
            ring.index, ring.inner_radius_px, ring.outer_radius_px, ring.mid_distance
        );
    }
    Ok(())
}

// ── profile ───────────────────────────────────────────────────────────

/// Decoded image at the depth the profile is computed on.
enum GrayInput {
    Gray8(GrayImage),
    Gray16(ImageBuffer<Luma<u16>, Vec<u16>>),
    Float(ImageBuffer<Luma<f32>, Vec<f32>>),
}

impl GrayInput {
    fn from_dynamic(img: &DynamicImage, want_median: bool) -> Self {
        use image::ColorType;

        match img.color() {
            ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => {
                Self::Gray8(img.to_luma8())
            }
            _ if want_median => {
                tracing::warn!(
                    "median pre-filter works on 8-bit data; converting {:?} input to 8-bit",
                    img.color()
                );
                Self::Gray8(img.to_luma8())
            }
            ColorType::Rgb32F | ColorType::Rgba32F => Self::Float(img.to_luma32f()),
            _ => Self::Gray16(img.to_luma16()),
        }
    }
}

fn compute_profile(
    profiler: &RadialProfiler,
    input: &GrayInput,
    center: [f64; 2],
) -> CliResult<RadialProfile> {
    let profile = match input {
        GrayInput::Gray8(g) => profiler.profile_gray(g, center)?,
        GrayInput::Gray16(g) => profiler.profile(g, center)?,
        GrayInput::Float(g) => profiler.profile(g, center)?,
    };
    Ok(profile)
}

fn run_profile(args: &CliProfileArgs) -> CliResult<()> {
    let config = args.to_config()?;
    let center = args.center(&config.calibration)?;
    let profiler = RadialProfiler::new(config);
    // Fail on bad parameters before decoding the image.
    let geometry = profiler.geometry()?;

    tracing::info!("Loading image: {}", args.image.display());
    let img = image::open(&args.image).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", args.image.display(), e).into()
    })?;
    tracing::info!("Image size: {}x{}", img.width(), img.height());

    let want_median = profiler.config().median_radius_px.is_some_and(|r| r > 0);
    let input = GrayInput::from_dynamic(&img, want_median);
    let profile = compute_profile(&profiler, &input, center)?;

    let empty = profile.empty_rings();
    tracing::info!(
        "Profiled {} rings around ({:.2}, {:.2}) px, {} pixels",
        profile.rings.len(),
        profile.center_px[0],
        profile.center_px[1],
        profile.total_pixel_count(),
    );
    if !empty.is_empty() {
        tracing::warn!("{} rings received no pixels: {:?}", empty.len(), empty);
    }

    match &args.out {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            table::write_csv(&profile, file)?;
            tracing::info!("Table written to {}", path.display());
        }
        None => print!("{}", table::format_table(&profile)),
    }

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&profile)?;
        std::fs::write(path, &json)?;
        tracing::info!("Profile written to {}", path.display());
    }

    if let Some(path) = &args.overlay {
        let overlay = draw_ring_overlay(&img.to_luma8(), profile.center_px, &geometry);
        overlay.save(path)?;
        tracing::info!("Overlay written to {}", path.display());
    }

    Ok(())
}
