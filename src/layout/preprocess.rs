use tracing::{debug, info};

use crate::config::LayoutConfig;

use super::label::{Hemisphere, Label};
use super::stats::LabelStats;
use super::text::TextMeasure;

const MIN_ANGLE_STEP: f32 = 0.0005;

#[derive(Debug, Clone)]
pub struct PreprocessOutcome {
    pub labels: Vec<Label>,
    pub dropped: Vec<Label>,
    pub stats: LabelStats,
    pub font_scale_applied: bool,
    pub min_angle_applied: Option<f32>,
}

/// Measures every label and reduces the set until each hemisphere's stacked
/// height fits the canvas: first by shrinking fonts, then by dropping the
/// smallest segments.
pub fn preprocess_labels(
    mut labels: Vec<Label>,
    config: &LayoutConfig,
    measure: &dyn TextMeasure,
) -> PreprocessOutcome {
    let options = &config.labels;
    let canvas_height = config.canvas.height;
    let max_label_width = options.max_width_fraction * config.canvas.width;
    let remeasure = |label: &mut Label, font_size: f32| {
        let measured = measure.wrap_and_measure(
            &label.text,
            font_size,
            &label.font_family,
            max_label_width,
            options.max_lines,
            label.inner_padding,
        );
        label.apply_measurement(font_size, measured);
    };

    for label in labels.iter_mut() {
        let font_size = label.font_size;
        remeasure(label, font_size);
    }

    let mut stats = LabelStats::compute(&labels, options.outer_padding);
    let mut dropped = Vec::new();
    let mut font_scale_applied = false;
    let mut min_angle_applied = None;

    if stats.max_cumulative_height() > canvas_height {
        let mut by_value: Vec<usize> = (0..labels.len()).collect();
        by_value.sort_by(|&a, &b| {
            labels[b]
                .value
                .total_cmp(&labels[a].value)
                .then(labels[a].id.cmp(&labels[b].id))
        });
        let count = by_value.len().max(1) as f32;
        let min_font = options.min_font_size.round();
        let mut candidate = options.font_size.round();
        while candidate >= min_font {
            for (rank, &idx) in by_value.iter().enumerate() {
                let fraction = rank as f32 / count;
                let font_size = (candidate + (min_font - candidate) * fraction).round();
                remeasure(&mut labels[idx], font_size);
            }
            font_scale_applied = true;
            stats = LabelStats::compute(&labels, options.outer_padding);
            debug!(
                target: "label",
                candidate,
                left = stats.cumulative_left_height,
                right = stats.cumulative_right_height,
                "font shrink candidate"
            );
            if stats.max_cumulative_height() <= canvas_height {
                info!(target: "label", max_font_size = candidate, "font sizes reduced to fit canvas");
                break;
            }
            candidate -= 1.0;
        }
    }

    if stats.max_cumulative_height() > canvas_height {
        let padding = options.outer_padding;
        let mut step = 0u32;
        loop {
            let threshold = config.data.min_angle + step as f32 * MIN_ANGLE_STEP;
            if threshold >= 1.0 || labels.is_empty() {
                break;
            }
            let mut left_height = stats.cumulative_left_height;
            let mut right_height = stats.cumulative_right_height;
            let before = labels.len();
            for label in labels.iter_mut().rev() {
                if label.fractional_value >= threshold {
                    continue;
                }
                let side_height = match label.hemisphere() {
                    Hemisphere::Left => &mut left_height,
                    Hemisphere::Right => &mut right_height,
                };
                if *side_height > canvas_height {
                    *side_height -= label.height + padding;
                    label.label_shown = false;
                }
            }
            let (kept, removed): (Vec<Label>, Vec<Label>) =
                labels.into_iter().partition(|label| label.label_shown);
            labels = kept;
            dropped.extend(removed);
            if labels.len() != before {
                stats = LabelStats::compute(&labels, padding);
                info!(
                    target: "label",
                    min_angle = threshold,
                    before,
                    after = labels.len(),
                    "applied new min angle"
                );
            }
            if stats.max_cumulative_height() <= canvas_height {
                min_angle_applied = Some(threshold);
                break;
            }
            step += 1;
        }
    }

    let (kept, too_tall): (Vec<Label>, Vec<Label>) = labels
        .into_iter()
        .partition(|label| label.height <= canvas_height);
    for mut label in too_tall {
        info!(target: "label", label = %label.short_text(), height = label.height, "label taller than canvas dropped");
        label.label_shown = false;
        dropped.push(label);
    }
    let labels = kept;
    let stats = LabelStats::compute(&labels, options.outer_padding);

    PreprocessOutcome {
        labels,
        dropped,
        stats,
        font_scale_applied,
        min_angle_applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::text::ApproximateMetrics;

    fn label(id: usize, value: f32, total: f32, angle: f32, text: &str) -> Label {
        Label::new(
            id,
            text,
            value,
            value / total,
            angle,
            "#000000",
            "sans-serif",
            12.0,
            1.0,
            (300.0, 200.0),
            100.0,
        )
    }

    fn config(width: f32, height: f32) -> LayoutConfig {
        let mut config = LayoutConfig::default();
        config.canvas.width = width;
        config.canvas.height = height;
        config
    }

    #[test]
    fn fitting_sets_are_only_measured() {
        let labels = vec![label(0, 1.0, 2.0, 45.0, "Alpha"), label(1, 1.0, 2.0, 225.0, "Beta")];
        let outcome = preprocess_labels(labels, &config(600.0, 400.0), &ApproximateMetrics);
        assert_eq!(outcome.labels.len(), 2);
        assert!(!outcome.font_scale_applied);
        assert!(outcome.min_angle_applied.is_none());
        assert!(outcome.labels.iter().all(|l| l.width > 0.0 && l.height == 12.0));
    }

    #[test]
    fn crowded_side_shrinks_fonts_by_value_rank() {
        let labels: Vec<Label> = (0..8)
            .map(|id| label(id, (8 - id) as f32, 36.0, 5.0 + id as f32 * 10.0, "Item"))
            .collect();
        let outcome = preprocess_labels(labels, &config(600.0, 90.0), &ApproximateMetrics);
        assert!(outcome.font_scale_applied);
        assert!(outcome.stats.max_cumulative_height() <= 90.0);
        let largest = &outcome.labels[0];
        let smallest = &outcome.labels[7];
        assert!(largest.font_size >= smallest.font_size);
        assert!(outcome.labels.iter().all(|l| l.font_size >= 8.0));
    }

    #[test]
    fn drops_smallest_segments_when_shrinking_is_not_enough() {
        let total = 100.0;
        let labels: Vec<Label> = (0..12)
            .map(|id| label(id, if id == 0 { 89.0 } else { 1.0 }, total, 2.0 + id as f32 * 7.0, "Segment"))
            .collect();
        let outcome = preprocess_labels(labels, &config(600.0, 60.0), &ApproximateMetrics);
        assert!(outcome.min_angle_applied.is_some());
        assert!(!outcome.dropped.is_empty());
        assert!(outcome.stats.max_cumulative_height() <= 60.0);
        assert!(outcome.labels.iter().any(|l| l.id == 0));
        assert_eq!(outcome.labels.len() + outcome.dropped.len(), 12);
    }

    #[test]
    fn labels_taller_than_canvas_are_dropped() {
        let text = vec!["word"; 30].join(" ");
        let mut config = config(200.0, 40.0);
        config.labels.max_lines = 10;
        let outcome = preprocess_labels(vec![label(0, 1.0, 1.0, 180.0, &text)], &config, &ApproximateMetrics);
        assert!(outcome.labels.is_empty());
        assert_eq!(outcome.dropped.len(), 1);
        assert!(!outcome.dropped[0].label_shown);
    }
}
