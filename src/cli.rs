use crate::bounds::{ViewportCalculator, place_overlays};
use crate::config::{Config, load_config};
use crate::interaction::NoopCallbacks;
use crate::ir::{PrintDocument, build_communities, parse_document, read_document};
use crate::layout::{LayoutEngine, Size};
use crate::layout_dump::write_layout_dump;
use crate::overrides::Preview;
use crate::render::{SceneInput, build_scene, render_svg, write_output_png, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "splay",
    version,
    about = "Print layout for narrative community graphs"
)]
pub struct Args {
    /// Input document (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Canvas width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Canvas height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Seed for the solver's initial placement
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Log solver and layout passes to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    if args.seed.is_some() {
        config.layout.solver.seed = args.seed;
    }

    let doc = match args.input.as_deref() {
        Some(path) if path != Path::new("-") => read_document(path)?,
        _ => parse_document(&read_stdin()?)?,
    };
    render_document(&doc, &config, args.output_format, args.output.as_deref())
}

fn render_document(
    doc: &PrintDocument,
    config: &Config,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let canvas = Size::new(config.render.width, config.render.height);
    let mut engine = LayoutEngine::new(config.layout.clone());
    let preview = Preview::default();
    let layout = engine.layout(doc, canvas, &preview, &mut NoopCallbacks);
    let communities = build_communities(&doc.graph, &doc.communities, &doc.narrative);
    let overlays = place_overlays(
        &layout,
        &communities,
        &doc.settings,
        &preview,
        &config.layout.overlays,
    );
    let mut viewport = ViewportCalculator::new();
    let scene = build_scene(
        &SceneInput {
            doc,
            layout: &layout,
            communities: &communities,
            overlays: &overlays,
        },
        &config.theme,
        &config.layout,
        &mut viewport,
    );

    match format {
        OutputFormat::Svg => {
            let svg = render_svg(&scene, &config.theme);
            write_output_svg(&svg, output)?;
        }
        OutputFormat::Png => {
            let output = ensure_output(output, "png")?;
            let svg = render_svg(&scene, &config.theme);
            write_output_png(&svg, output, &config.render, &config.theme)?;
        }
        OutputFormat::Json => {
            write_layout_dump(output, &layout, &scene)?;
        }
    }
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output<'a>(output: Option<&'a Path>, ext: &str) -> Result<&'a Path> {
    output.ok_or_else(|| anyhow::anyhow!("Output path required for {ext} output"))
}
