pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, load_config};
pub use ir::ChartData;
pub use layout::{
    ApproximateMetrics, FontMetrics, Label, LabelLayout, TextMeasure, compute_label_layout,
};
pub use parser::parse_chart;
pub use render::render_svg;
pub use theme::Theme;
