use crate::config::{Config, load_config};
use crate::dataset::{load_rows, save_rows};
use crate::generator::generate_fanout;
use crate::ir::{Locale, SubqueryRow};
use crate::layout::compute_layout;
use crate::layout_dump::write_layout_dump;
use crate::output::{chart_path_for, chart_path_for_csv, csv_path_for};
use crate::render::{build_scene, render_svg, write_output_svg};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_OUTPUT_DIR: &str = "output";
const CHART_DEFAULT_SIZE: u32 = 1000;

#[derive(Parser, Debug)]
#[command(
    name = "fanout",
    version,
    about = "Expand a seed query into categorized sub-queries and draw them as a sunburst chart"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config JSON file
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging (ignored when RUST_LOG is set)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate sub-queries, save them as CSV and render the chart
    Run(RunArgs),
    /// Generate sub-queries only
    Generate(GenerateArgs),
    /// Render a chart from an existing CSV
    Chart(ChartArgs),
}

#[derive(clap::Args, Debug)]
pub struct GenerationArgs {
    /// Seed query
    pub seed: String,

    /// Write sub-queries in Japanese
    #[arg(long = "ja", conflicts_with = "en")]
    pub ja: bool,

    /// Write sub-queries in English
    #[arg(long = "en")]
    pub en: bool,

    /// Max sub-queries per category
    #[arg(long = "n")]
    pub n: Option<usize>,

    /// Gemini model name
    #[arg(long = "model")]
    pub model: Option<String>,

    /// Enable the Google Search tool
    #[arg(long = "search")]
    pub search: bool,
}

impl GenerationArgs {
    pub fn locale(&self) -> Option<Locale> {
        match (self.ja, self.en) {
            (true, _) => Some(Locale::Ja),
            (_, true) => Some(Locale::En),
            _ => None,
        }
    }

    fn apply(&self, config: &mut Config) {
        if let Some(n) = self.n {
            config.generator.max_per_category = n;
        }
        if let Some(model) = &self.model {
            config.generator.model = model.clone();
        }
        if self.search {
            config.generator.enable_search = true;
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub generation: GenerationArgs,

    /// Chart width in pixels
    #[arg(long = "width")]
    pub width: Option<u32>,

    /// Chart height in pixels
    #[arg(long = "height")]
    pub height: Option<u32>,

    /// Directory for the CSV and the chart
    #[arg(long = "output-dir", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Chart format
    #[arg(long = "format", value_enum, default_value = "png")]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub generation: GenerationArgs,

    /// CSV path (default: output/{seed}_fanout.csv)
    #[arg(long = "csv", conflicts_with = "json")]
    pub csv: Option<PathBuf>,

    /// Print JSON to stdout instead of writing CSV
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct ChartArgs {
    /// CSV with seed,locale,category,subquery columns
    pub csv: PathBuf,

    /// Output file (default: output/{seed}_sunburst.{format})
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Chart width in pixels (default: config `width`, else 1000)
    #[arg(long = "width")]
    pub width: Option<u32>,

    /// Chart height in pixels (default: config `height`, else 1000)
    #[arg(long = "height")]
    pub height: Option<u32>,

    /// Chart format
    #[arg(long = "format", value_enum, default_value = "png")]
    pub format: OutputFormat,

    /// Write the computed geometry as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    crate::logging::init(args.verbose);
    let mut config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Run(run) => run_pipeline(run, &mut config),
        Command::Generate(generate) => run_generate(generate, &mut config),
        Command::Chart(chart) => run_chart(chart, &config),
    }
}

fn run_pipeline(args: RunArgs, config: &mut Config) -> Result<()> {
    args.generation.apply(config);
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    let seed = args.generation.seed.trim();
    let result = generate_fanout(seed, args.generation.locale(), &config.generator)?;
    let rows = result.rows();

    ensure_dir(&args.output_dir)?;
    let csv_path = csv_path_for(&args.output_dir, seed);
    save_rows(&csv_path, &rows)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;
    println!("CSV exported to: {}", csv_path.display());

    let chart_path = chart_path_for(&args.output_dir, seed, args.format.extension());
    render_chart(
        &rows,
        config,
        (config.render.width, config.render.height),
        args.format,
        &chart_path,
        None,
    )?;
    println!("Chart saved to: {}", chart_path.display());
    Ok(())
}

fn run_generate(args: GenerateArgs, config: &mut Config) -> Result<()> {
    args.generation.apply(config);
    let seed = args.generation.seed.trim();
    let result = generate_fanout(seed, args.generation.locale(), &config.generator)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
        return Ok(());
    }

    let csv_path = match args.csv {
        Some(path) => path,
        None => {
            let dir = Path::new(DEFAULT_OUTPUT_DIR);
            ensure_dir(dir)?;
            csv_path_for(dir, seed)
        }
    };
    save_rows(&csv_path, &result.rows())
        .with_context(|| format!("failed to write {}", csv_path.display()))?;
    println!("CSV exported to: {}", csv_path.display());
    Ok(())
}

fn run_chart(args: ChartArgs, config: &Config) -> Result<()> {
    let rows = load_rows(&args.csv)
        .with_context(|| format!("failed to load {}", args.csv.display()))?;
    let output = match args.output.clone() {
        Some(path) => path,
        None => {
            let dir = Path::new(DEFAULT_OUTPUT_DIR);
            ensure_dir(dir)?;
            chart_path_for_csv(dir, &args.csv, args.format.extension())
        }
    };
    render_chart(
        &rows,
        config,
        chart_size(&args, config),
        args.format,
        &output,
        args.dump_layout.as_deref(),
    )?;
    println!("Chart saved to: {}", output.display());
    Ok(())
}

/// Flag, then config file, then 1000 on each axis.
fn chart_size(args: &ChartArgs, config: &Config) -> (u32, u32) {
    let configured = |set: bool, value: u32| set.then_some(value);
    let width = args
        .width
        .or(configured(config.render.width_configured, config.render.width))
        .unwrap_or(CHART_DEFAULT_SIZE);
    let height = args
        .height
        .or(configured(config.render.height_configured, config.render.height))
        .unwrap_or(CHART_DEFAULT_SIZE);
    (width, height)
}

fn render_chart(
    rows: &[SubqueryRow],
    config: &Config,
    (width, height): (u32, u32),
    format: OutputFormat,
    output: &Path,
    dump_layout: Option<&Path>,
) -> Result<()> {
    let layout = compute_layout(rows, &config.theme, &config.layout)?;
    match format {
        OutputFormat::Svg => {
            let scene = build_scene(&layout, width, height, &config.theme, &config.layout)?;
            write_output_svg(&render_svg(&scene), Some(output))?;
        }
        OutputFormat::Png => write_png(&layout, (width, height), config, output)?,
    }
    // Only after the chart is on disk, so a failed render leaves no dump.
    if let Some(path) = dump_layout {
        write_layout_dump(path, &layout)?;
    }
    info!(
        path = %output.display(),
        width,
        height,
        categories = layout.wedges.len(),
        subqueries = layout.subquery_count(),
        "chart written"
    );
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(
    layout: &crate::layout::SunburstLayout,
    (width, height): (u32, u32),
    config: &Config,
    output: &Path,
) -> Result<()> {
    let pixmap = crate::render::render(layout, width, height, &config.theme, &config.layout)?;
    crate::render::write_output_png(&pixmap, output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
fn write_png(
    _layout: &crate::layout::SunburstLayout,
    _size: (u32, u32),
    _config: &Config,
    _output: &Path,
) -> Result<()> {
    Err(anyhow::anyhow!(
        "PNG output requires the `png` feature; use --format svg"
    ))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))
}
