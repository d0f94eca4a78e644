use std::collections::BTreeMap;

use serde::Serialize;

use super::geometry::between;
use super::label::{Hemisphere, Label};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Densities {
    pub top: usize,
    pub middle: usize,
    pub bottom: usize,
}

/// Aggregate dimensions of a label set, recomputed whenever sizes change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LabelStats {
    pub min_data_value: f32,
    pub max_data_value: f32,
    pub max_left_label_width: f32,
    pub max_right_label_width: f32,
    pub max_left_label_height: f32,
    pub max_right_label_height: f32,
    pub cumulative_left_height: f32,
    pub cumulative_right_height: f32,
    /// Font size (rounded to whole pixels) to label count.
    pub font_size_distribution: BTreeMap<u32, usize>,
    pub max_font_size: f32,
    pub densities: Densities,
}

impl LabelStats {
    pub fn compute(labels: &[Label], outer_padding: f32) -> Self {
        let mut stats = LabelStats {
            min_data_value: f32::INFINITY,
            max_data_value: f32::NEG_INFINITY,
            ..Default::default()
        };
        let mut left_count = 0usize;
        let mut right_count = 0usize;

        for label in labels {
            stats.min_data_value = stats.min_data_value.min(label.value);
            stats.max_data_value = stats.max_data_value.max(label.value);
            match label.hemisphere() {
                Hemisphere::Left => {
                    left_count += 1;
                    stats.max_left_label_width = stats.max_left_label_width.max(label.width);
                    stats.max_left_label_height = stats.max_left_label_height.max(label.height);
                    stats.cumulative_left_height += label.height;
                }
                Hemisphere::Right => {
                    right_count += 1;
                    stats.max_right_label_width = stats.max_right_label_width.max(label.width);
                    stats.max_right_label_height = stats.max_right_label_height.max(label.height);
                    stats.cumulative_right_height += label.height;
                }
            }
            *stats
                .font_size_distribution
                .entry(label.font_size.round().max(0.0) as u32)
                .or_insert(0) += 1;
            stats.max_font_size = stats.max_font_size.max(label.font_size);

            let angle = label.segment_angle_midpoint;
            if between(60.0, angle, 120.0) {
                stats.densities.top += 1;
            } else if between(240.0, angle, 300.0) {
                stats.densities.bottom += 1;
            } else {
                stats.densities.middle += 1;
            }
        }

        stats.cumulative_left_height += outer_padding * left_count.saturating_sub(1) as f32;
        stats.cumulative_right_height += outer_padding * right_count.saturating_sub(1) as f32;
        if labels.is_empty() {
            stats.min_data_value = 0.0;
            stats.max_data_value = 0.0;
        }
        stats
    }

    pub fn max_label_width(&self) -> f32 {
        self.max_left_label_width.max(self.max_right_label_width)
    }

    pub fn max_cumulative_height(&self) -> f32 {
        self.cumulative_left_height.max(self.cumulative_right_height)
    }

    pub fn cumulative_height(&self, hemisphere: Hemisphere) -> f32 {
        match hemisphere {
            Hemisphere::Left => self.cumulative_left_height,
            Hemisphere::Right => self.cumulative_right_height,
        }
    }
}
