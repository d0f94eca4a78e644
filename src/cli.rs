use crate::config::{Config, ResolutionStrategy, load_config, merge_init_config};
use crate::layout::{ApproximateMetrics, FontMetrics, LabelLayout, TextMeasure, compute_label_layout};
use crate::layout_dump::write_layout_dump;
use crate::parser::parse_chart;
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pielabel", version, about = "Pie chart label layout")]
pub struct Args {
    /// Input file (pie source or JSON) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Canvas width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Canvas height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Collision resolution strategy
    #[arg(long = "strategy", value_enum)]
    pub strategy: Option<Strategy>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Strategy {
    TwoPhase,
    DescendingOrder,
}

impl From<Strategy> for ResolutionStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::TwoPhase => ResolutionStrategy::TwoPhase,
            Strategy::DescendingOrder => ResolutionStrategy::DescendingOrder,
        }
    }
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let parsed = parse_chart(&input)?;
    if let Some(init_cfg) = parsed.init_config {
        config = merge_init_config(config, init_cfg)?;
    }
    apply_args(&mut config, &args);
    if parsed.chart.show_data {
        config.layout.data.show_data = true;
    }

    let layout = layout_chart(&parsed.chart, &config);
    if let Some(error) = &layout.diagnostics.error {
        warn!(target: "label", %error, "layout finished with an error");
    }
    info!(
        target: "label",
        shown = layout.shown_labels().count(),
        dropped = layout.dropped.len(),
        "writing output"
    );

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(&layout, &config.theme, &config.render);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Json => {
            write_layout_dump(args.output.as_deref(), &layout)?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Command line flags win over the config file and any init directive.
fn apply_args(config: &mut Config, args: &Args) {
    if let Some(width) = args.width {
        config.layout.canvas.width = width;
    }
    if let Some(height) = args.height {
        config.layout.canvas.height = height;
    }
    if let Some(strategy) = args.strategy {
        config.layout.strategy = strategy.into();
    }
}

fn layout_chart(chart: &crate::ir::ChartData, config: &Config) -> LabelLayout {
    let measure: Box<dyn TextMeasure> = if config.layout.labels.fast_text_metrics {
        Box::new(ApproximateMetrics)
    } else {
        Box::new(FontMetrics::default())
    };
    compute_label_layout(chart, &config.layout, &config.theme, measure.as_ref())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "pielabel",
            "-w",
            "320",
            "--strategy",
            "descending-order",
            "-e",
            "json",
        ]);
        let mut config = Config::default();
        apply_args(&mut config, &args);
        assert_eq!(config.layout.canvas.width, 320.0);
        assert_eq!(config.layout.canvas.height, Config::default().layout.canvas.height);
        assert_eq!(config.layout.strategy, ResolutionStrategy::DescendingOrder);
        assert!(matches!(args.output_format, OutputFormat::Json));
    }

    #[test]
    fn fast_metrics_layout_is_deterministic() {
        let parsed = parse_chart("pie\n\"Dogs\" : 3\n\"Cats\" : 2\n\"Rats\" : 1\n").unwrap();
        let mut config = Config::default();
        config.layout.labels.fast_text_metrics = true;
        let first = layout_chart(&parsed.chart, &config);
        let second = layout_chart(&parsed.chart, &config);
        let coords = |layout: &LabelLayout| {
            layout
                .outer
                .iter()
                .map(|label| label.top_left_coord)
                .collect::<Vec<_>>()
        };
        assert_eq!(coords(&first), coords(&second));
    }
}
