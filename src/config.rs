use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionStrategy {
    #[default]
    TwoPhase,
    DescendingOrder,
}

/// How the removal remedy picks among labels of equal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TieBreak {
    /// Smallest value first, highest id first among equals.
    #[default]
    Ordered,
    /// Smallest value first, nearest to the offending label among equals.
    Best,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 400.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieConfig {
    /// Explicit outer radius; derived from the canvas when absent.
    pub outer_radius: Option<f32>,
    /// Inner radius as a fraction of the outer radius (0 for a plain pie).
    pub inner_radius_ratio: f32,
    pub label_offset: f32,
    pub max_vertical_offset: f32,
}

impl Default for PieConfig {
    fn default() -> Self {
        Self {
            outer_radius: None,
            inner_radius_ratio: 0.0,
            label_offset: 10.0,
            max_vertical_offset: 40.0,
        }
    }
}

impl PieConfig {
    pub fn resolve_outer_radius(&self, canvas: &CanvasConfig) -> f32 {
        match self.outer_radius {
            Some(radius) => radius.max(1.0),
            None => (canvas.height / 2.0 - self.max_vertical_offset)
                .min(canvas.width / 4.0)
                .max(1.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelOptions {
    pub font_size: f32,
    pub min_font_size: f32,
    /// Vertical padding between wrapped lines of one label.
    pub inner_padding: f32,
    /// Minimum vertical gap between neighbouring labels.
    pub outer_padding: f32,
    pub max_width_fraction: f32,
    pub max_lines: usize,
    pub lift_off_angle: f32,
    pub max_line_angle: f32,
    pub max_line_angle_ceiling: f32,
    pub max_line_angle_increment: f32,
    pub inner_labels: bool,
    pub unordered_tie_break: TieBreak,
    pub fast_text_metrics: bool,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            min_font_size: 8.0,
            inner_padding: 1.0,
            outer_padding: 1.0,
            max_width_fraction: 0.3,
            max_lines: 3,
            lift_off_angle: 30.0,
            max_line_angle: 60.0,
            max_line_angle_ceiling: 60.0,
            max_line_angle_increment: 3.0,
            inner_labels: false,
            unordered_tie_break: TieBreak::Ordered,
            fast_text_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub out_of_bounds_correction: bool,
    pub initial_cluster_spacing: bool,
    pub down_sweep: bool,
    pub up_sweep: bool,
    pub final_pass: bool,
    pub shorten_top_and_bottom: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            out_of_bounds_correction: true,
            initial_cluster_spacing: true,
            down_sweep: true,
            up_sweep: true,
            final_pass: true,
            shorten_top_and_bottom: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Smallest value/total fraction that still gets a label.
    pub min_angle: f32,
    /// Angle (degrees, clockwise from the left) where the first slice starts.
    pub start_angle: f32,
    pub show_data: bool,
    pub display_percentage: bool,
    pub display_decimals: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            min_angle: 0.0,
            start_angle: 0.0,
            show_data: false,
            display_percentage: false,
            display_decimals: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub canvas: CanvasConfig,
    pub pie: PieConfig,
    pub labels: LabelOptions,
    pub stages: StageConfig,
    pub data: DataConfig,
    pub strategy: ResolutionStrategy,
    pub max_resolution_iterations: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            pie: PieConfig::default(),
            labels: LabelOptions::default(),
            stages: StageConfig::default(),
            data: DataConfig::default(),
            strategy: ResolutionStrategy::TwoPhase,
            max_resolution_iterations: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub background: String,
    pub show_placement_curve: bool,
    pub show_label_boxes: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            show_placement_curve: false,
            show_label_boxes: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::mermaid_default();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<NumberOrString>,
    text_color: Option<String>,
    line_color: Option<String>,
    background: Option<String>,
    pie1: Option<String>,
    pie2: Option<String>,
    pie3: Option<String>,
    pie4: Option<String>,
    pie5: Option<String>,
    pie6: Option<String>,
    pie7: Option<String>,
    pie8: Option<String>,
    pie9: Option<String>,
    pie10: Option<String>,
    pie11: Option<String>,
    pie12: Option<String>,
    pie_title_text_size: Option<NumberOrString>,
    pie_title_text_color: Option<String>,
    pie_section_text_color: Option<String>,
    pie_stroke_color: Option<String>,
    pie_stroke_width: Option<NumberOrString>,
    pie_opacity: Option<NumberOrString>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    String(String),
}

impl NumberOrString {
    fn as_f32(&self) -> Option<f32> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().trim_end_matches("px").parse::<f32>().ok(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CanvasConfigFile {
    width: Option<f32>,
    height: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PieConfigFile {
    outer_radius: Option<f32>,
    inner_radius_ratio: Option<f32>,
    label_offset: Option<f32>,
    max_vertical_offset: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LabelOptionsFile {
    font_size: Option<f32>,
    min_font_size: Option<f32>,
    inner_padding: Option<f32>,
    outer_padding: Option<f32>,
    max_width_fraction: Option<f32>,
    max_lines: Option<usize>,
    lift_off_angle: Option<f32>,
    max_line_angle: Option<f32>,
    max_line_angle_ceiling: Option<f32>,
    max_line_angle_increment: Option<f32>,
    inner_labels: Option<bool>,
    unordered_tie_break: Option<TieBreak>,
    fast_text_metrics: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct StageConfigFile {
    out_of_bounds_correction: Option<bool>,
    initial_cluster_spacing: Option<bool>,
    down_sweep: Option<bool>,
    up_sweep: Option<bool>,
    final_pass: Option<bool>,
    shorten_top_and_bottom: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DataConfigFile {
    min_angle: Option<f32>,
    start_angle: Option<f32>,
    show_data: Option<bool>,
    display_percentage: Option<bool>,
    display_decimals: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    background: Option<String>,
    show_placement_curve: Option<bool>,
    show_label_boxes: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    canvas: Option<CanvasConfigFile>,
    pie: Option<PieConfigFile>,
    labels: Option<LabelOptionsFile>,
    stages: Option<StageConfigFile>,
    data: Option<DataConfigFile>,
    strategy: Option<ResolutionStrategy>,
    max_resolution_iterations: Option<usize>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;
    apply_config_file(&mut config, parsed);
    Ok(config)
}

/// Merges a `%%{init: ...}%%` directive (same shape as the config file) over `config`.
pub fn merge_init_config(mut config: Config, init: serde_json::Value) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_value(init)?;
    apply_config_file(&mut config, parsed);
    Ok(config)
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) {
    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "base" || theme_name == "default" || theme_name == "mermaid" {
            config.theme = Theme::mermaid_default();
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        apply_theme_variables(&mut config.theme, vars);
    }

    let layout = &mut config.layout;
    if let Some(canvas) = parsed.canvas {
        if let Some(v) = canvas.width {
            layout.canvas.width = v;
        }
        if let Some(v) = canvas.height {
            layout.canvas.height = v;
        }
    }

    if let Some(pie) = parsed.pie {
        if pie.outer_radius.is_some() {
            layout.pie.outer_radius = pie.outer_radius;
        }
        if let Some(v) = pie.inner_radius_ratio {
            layout.pie.inner_radius_ratio = v.clamp(0.0, 0.95);
        }
        if let Some(v) = pie.label_offset {
            layout.pie.label_offset = v;
        }
        if let Some(v) = pie.max_vertical_offset {
            layout.pie.max_vertical_offset = v;
        }
    }

    if let Some(labels) = parsed.labels {
        let options = &mut layout.labels;
        if let Some(v) = labels.font_size {
            options.font_size = v;
        }
        if let Some(v) = labels.min_font_size {
            options.min_font_size = v;
        }
        if let Some(v) = labels.inner_padding {
            options.inner_padding = v;
        }
        if let Some(v) = labels.outer_padding {
            options.outer_padding = v;
        }
        if let Some(v) = labels.max_width_fraction {
            options.max_width_fraction = v;
        }
        if let Some(v) = labels.max_lines {
            options.max_lines = v.max(1);
        }
        if let Some(v) = labels.lift_off_angle {
            options.lift_off_angle = v;
        }
        if let Some(v) = labels.max_line_angle {
            options.max_line_angle = v;
            if labels.max_line_angle_ceiling.is_none() {
                options.max_line_angle_ceiling = options.max_line_angle_ceiling.max(v);
            }
        }
        if let Some(v) = labels.max_line_angle_ceiling {
            options.max_line_angle_ceiling = v;
        }
        if let Some(v) = labels.max_line_angle_increment {
            options.max_line_angle_increment = v;
        }
        if let Some(v) = labels.inner_labels {
            options.inner_labels = v;
        }
        if let Some(v) = labels.unordered_tie_break {
            options.unordered_tie_break = v;
        }
        if let Some(v) = labels.fast_text_metrics {
            options.fast_text_metrics = v;
        }
    }

    if let Some(stages) = parsed.stages {
        if let Some(v) = stages.out_of_bounds_correction {
            layout.stages.out_of_bounds_correction = v;
        }
        if let Some(v) = stages.initial_cluster_spacing {
            layout.stages.initial_cluster_spacing = v;
        }
        if let Some(v) = stages.down_sweep {
            layout.stages.down_sweep = v;
        }
        if let Some(v) = stages.up_sweep {
            layout.stages.up_sweep = v;
        }
        if let Some(v) = stages.final_pass {
            layout.stages.final_pass = v;
        }
        if let Some(v) = stages.shorten_top_and_bottom {
            layout.stages.shorten_top_and_bottom = v;
        }
    }

    if let Some(data) = parsed.data {
        if let Some(v) = data.min_angle {
            layout.data.min_angle = v;
        }
        if let Some(v) = data.start_angle {
            layout.data.start_angle = v;
        }
        if let Some(v) = data.show_data {
            layout.data.show_data = v;
        }
        if let Some(v) = data.display_percentage {
            layout.data.display_percentage = v;
        }
        if let Some(v) = data.display_decimals {
            layout.data.display_decimals = v;
        }
    }

    if let Some(v) = parsed.strategy {
        layout.strategy = v;
    }
    if let Some(v) = parsed.max_resolution_iterations {
        layout.max_resolution_iterations = v.max(1);
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.background {
            config.render.background = v;
        }
        if let Some(v) = render.show_placement_curve {
            config.render.show_placement_curve = v;
        }
        if let Some(v) = render.show_label_boxes {
            config.render.show_label_boxes = v;
        }
    }
}

fn apply_theme_variables(theme: &mut Theme, vars: ThemeVariables) {
    if let Some(v) = vars.font_family {
        theme.font_family = v;
    }
    if let Some(size) = vars.font_size.as_ref().and_then(NumberOrString::as_f32) {
        theme.font_size = size;
    }
    if let Some(v) = vars.text_color {
        theme.text_color = v;
    }
    if let Some(v) = vars.line_color {
        theme.line_color = v;
    }
    if let Some(v) = vars.background {
        theme.background = v;
    }

    let pie_overrides = [
        vars.pie1, vars.pie2, vars.pie3, vars.pie4, vars.pie5, vars.pie6, vars.pie7, vars.pie8,
        vars.pie9, vars.pie10, vars.pie11, vars.pie12,
    ];
    for (idx, color) in pie_overrides.into_iter().enumerate() {
        let Some(color) = color else {
            continue;
        };
        if idx < theme.pie_colors.len() {
            theme.pie_colors[idx] = color;
        } else {
            theme.pie_colors.push(color);
        }
    }

    if let Some(size) = vars.pie_title_text_size.as_ref().and_then(NumberOrString::as_f32) {
        theme.pie_title_text_size = size;
    }
    if let Some(v) = vars.pie_title_text_color {
        theme.pie_title_text_color = v;
    }
    if let Some(v) = vars.pie_section_text_color {
        theme.pie_section_text_color = v;
    }
    if let Some(v) = vars.pie_stroke_color {
        theme.pie_stroke_color = v;
    }
    if let Some(width) = vars.pie_stroke_width.as_ref().and_then(NumberOrString::as_f32) {
        theme.pie_stroke_width = width;
    }
    if let Some(opacity) = vars.pie_opacity.as_ref().and_then(NumberOrString::as_f32) {
        theme.pie_opacity = opacity;
    }
}
