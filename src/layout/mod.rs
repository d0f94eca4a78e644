mod cluster;
pub mod collision_index;
pub mod descending;
pub mod error;
pub mod geometry;
pub mod inner;
pub mod label;
pub mod placement;
pub mod preprocess;
pub mod resolve;
pub mod shorten;
pub mod stats;
pub mod sweep;
pub mod text;
pub(crate) mod types;
pub use types::*;

pub use error::LayoutInterrupt;
pub use label::{Anchor, Hemisphere, Label, Ring, find_intersecting_labels};
pub use text::{ApproximateMetrics, FontMetrics, MeasuredText, TextMeasure};

use tracing::{error, info};

use crate::config::{LayoutConfig, ResolutionStrategy};
use crate::ir::ChartData;
use crate::theme::Theme;

use descending::DescendingOrderResolver;
use placement::{correct_out_of_bounds, detect_apex_labels, place_initial_labels};
use preprocess::preprocess_labels;
use resolve::resolve_collisions;
use shorten::shorten_top_and_bottom;

fn format_pie_value(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if (rounded - rounded.round()).abs() < 0.001 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.2}", rounded)
    }
}

fn label_text(label: &str, value: f32, fraction: f32, config: &LayoutConfig) -> String {
    let data = &config.data;
    if data.display_percentage {
        let decimals = data.display_decimals;
        format!("{label}: {:.decimals$}%", fraction * 100.0)
    } else if data.show_data {
        format!("{label} [{}]", format_pie_value(value))
    } else {
        label.to_string()
    }
}

/// Pie geometry for a canvas: centered, radius from config or derived from the canvas.
pub fn pie_geometry(config: &LayoutConfig) -> PieGeometry {
    let canvas = &config.canvas;
    let outer_radius = config.pie.resolve_outer_radius(canvas);
    PieGeometry {
        center: (canvas.width / 2.0, canvas.height / 2.0),
        outer_radius,
        inner_radius: outer_radius * config.pie.inner_radius_ratio,
        label_offset: config.pie.label_offset,
        max_vertical_offset: config.pie.max_vertical_offset,
        canvas_width: canvas.width,
        canvas_height: canvas.height,
    }
}

/// Splits the circle among the slices, starting at `start_angle` and moving clockwise.
pub fn compute_segments(data: &ChartData, config: &LayoutConfig, theme: &Theme) -> Vec<SegmentLayout> {
    let total = data.total();
    let fallback = data.slices.len().max(1) as f32;
    let mut cursor = config.data.start_angle;
    data.slices
        .iter()
        .enumerate()
        .map(|(id, slice)| {
            let extent = if total > 0.0 {
                slice.value.max(0.0) / total * 360.0
            } else {
                360.0 / fallback
            };
            let segment = SegmentLayout {
                id,
                label: slice.label.clone(),
                value: slice.value,
                start_angle: cursor,
                end_angle: cursor + extent,
                color: slice.color.clone().unwrap_or_else(|| theme.pie_color(id).to_string()),
            };
            cursor += extent;
            segment
        })
        .collect()
}

/// Builds one label per segment at its angular midpoint. Segments whose share
/// of the total is below `data.min_angle` come back in the second vector, hidden.
pub fn build_label_set(
    data: &ChartData,
    segments: &[SegmentLayout],
    geometry: &PieGeometry,
    config: &LayoutConfig,
    theme: &Theme,
) -> (Vec<Label>, Vec<Label>) {
    let total = data.total();
    let mut shown = Vec::new();
    let mut hidden = Vec::new();
    for segment in segments {
        let fraction = if total > 0.0 { segment.value / total } else { 0.0 };
        let midpoint = geometry::normalize_angle((segment.start_angle + segment.end_angle) / 2.0);
        let mut label = Label::new(
            segment.id,
            label_text(&segment.label, segment.value, fraction, config),
            segment.value,
            fraction,
            midpoint,
            segment.color.clone(),
            theme.font_family.clone(),
            config.labels.font_size,
            config.labels.inner_padding,
            geometry.center,
            geometry.outer_radius,
        );
        if fraction >= config.data.min_angle {
            shown.push(label);
        } else {
            label.label_shown = false;
            hidden.push(label);
        }
    }
    (shown, hidden)
}

/// Runs the whole labelling pipeline for one chart.
///
/// Never fails: when the engine runs out of remedies the best layout found
/// is returned and `diagnostics.error` says why.
pub fn compute_label_layout(
    data: &ChartData,
    config: &LayoutConfig,
    theme: &Theme,
    measure: &dyn TextMeasure,
) -> LabelLayout {
    let geometry = pie_geometry(config);
    let segments = compute_segments(data, config, theme);
    let (labels, mut dropped) = build_label_set(data, &segments, &geometry, config, theme);
    let input_count = labels.len();
    let mut diagnostics = Diagnostics::default();

    let outcome = preprocess_labels(labels, config, measure);
    diagnostics.font_scale_applied = outcome.font_scale_applied;
    diagnostics.min_angle_applied = outcome.min_angle_applied;
    diagnostics.preprocess_dropped = outcome.dropped.len();
    dropped.extend(outcome.dropped);
    let mut labels = outcome.labels;

    let mut ctx = PieContext::new(geometry, config.labels.lift_off_angle, config.labels.outer_padding);
    ctx.max_font_size = outcome.stats.max_font_size;

    let mut max_line_angle = config.labels.max_line_angle;
    let mut min_proportion = None;
    let (mut outer, inner) = match config.strategy {
        ResolutionStrategy::TwoPhase => {
            detect_apex_labels(&mut labels, &mut ctx);
            place_initial_labels(&mut labels, &mut ctx);
            if config.stages.out_of_bounds_correction {
                diagnostics.out_of_bounds_corrections = correct_out_of_bounds(&mut labels, &ctx);
            }
            let resolution = resolve_collisions(labels, &mut ctx, config, &mut diagnostics);
            max_line_angle = resolution.max_line_angle;
            dropped.extend(resolution.removed);
            let mut outer = resolution.outer;
            if config.stages.shorten_top_and_bottom {
                shorten_top_and_bottom(&mut outer, &ctx, max_line_angle);
            }
            (outer, resolution.inner)
        }
        ResolutionStrategy::DescendingOrder => {
            let outcome = DescendingOrderResolver::new(labels, &ctx, max_line_angle).resolve();
            diagnostics.descending_sweeps = outcome.sweeps;
            diagnostics.skipped = outcome.skipped;
            min_proportion = outcome.min_proportion;
            dropped.extend(outcome.dropped.into_iter().map(|mut label| {
                label.label_shown = false;
                label
            }));
            let all: Vec<usize> = (0..outcome.outer.len()).collect();
            let overlapping = find_intersecting_labels(&outcome.outer, &all);
            if !overlapping.is_empty() {
                error!(target: "label", overlapping = overlapping.len(), "descending sweep left overlapping labels");
                diagnostics.error = Some(format!(
                    "descending sweep left {} overlapping labels",
                    overlapping.len()
                ));
            }
            (outcome.outer, Vec::new())
        }
    };

    outer.sort_by_key(|label| label.id);
    dropped.sort_by_key(|label| label.id);
    if input_count > 0 && outer.is_empty() && inner.is_empty() && diagnostics.error.is_none() {
        error!(target: "label", input_count, "every label was dropped");
        diagnostics.error = Some("no label could be placed on the canvas".to_string());
    }
    info!(
        target: "label",
        outer = outer.len(),
        inner = inner.len(),
        dropped = dropped.len(),
        iterations = diagnostics.resolution_iterations,
        "label layout complete"
    );

    LabelLayout {
        geometry,
        title: data.title.clone(),
        segments,
        outer,
        inner,
        dropped,
        top_is_lifted: ctx.top_is_lifted,
        bottom_is_lifted: ctx.bottom_is_lifted,
        max_line_angle,
        min_proportion,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(values: &[f32]) -> ChartData {
        let mut chart = ChartData::new();
        for (idx, value) in values.iter().enumerate() {
            chart.push_slice(format!("Slice {idx}"), *value);
        }
        chart
    }

    #[test]
    fn segments_cover_the_circle() {
        let config = LayoutConfig::default();
        let segments = compute_segments(&chart(&[1.0, 1.0, 2.0]), &config, &Theme::mermaid_default());
        assert_eq!(segments[0].start_angle, 0.0);
        assert_eq!(segments[1].end_angle, 180.0);
        assert_eq!(segments[2].end_angle, 360.0);
    }

    #[test]
    fn min_angle_hides_small_segments() {
        let mut config = LayoutConfig::default();
        config.data.min_angle = 0.05;
        let theme = Theme::mermaid_default();
        let data = chart(&[98.0, 1.0, 1.0]);
        let segments = compute_segments(&data, &config, &theme);
        let geometry = pie_geometry(&config);
        let (shown, hidden) = build_label_set(&data, &segments, &geometry, &config, &theme);
        assert_eq!(shown.len(), 1);
        assert_eq!(hidden.len(), 2);
        assert!(hidden.iter().all(|label| !label.label_shown));
        assert!((shown[0].segment_angle_midpoint - 176.4).abs() < 1e-3);
    }

    #[test]
    fn label_text_follows_data_options() {
        let mut config = LayoutConfig::default();
        assert_eq!(label_text("A", 2.5, 0.25, &config), "A");
        config.data.show_data = true;
        assert_eq!(label_text("A", 2.5, 0.25, &config), "A [2.50]");
        config.data.display_percentage = true;
        assert_eq!(label_text("A", 2.5, 0.25, &config), "A: 25.0%");
    }

    #[test]
    fn pipeline_accounts_for_every_slice() {
        let config = LayoutConfig::default();
        let data = chart(&[5.0, 1.0, 1.0, 1.0, 1.0, 1.0, 20.0]);
        let layout = compute_label_layout(&data, &config, &Theme::mermaid_default(), &ApproximateMetrics);
        assert_eq!(layout.outer.len() + layout.inner.len() + layout.dropped.len(), 7);
        assert_eq!(layout.segments.len(), 7);
    }
}
