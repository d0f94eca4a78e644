use serde::Serialize;

use super::label::Label;

/// Fixed geometry of the pie the labels are laid out around.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PieGeometry {
    pub center: (f32, f32),
    pub outer_radius: f32,
    pub inner_radius: f32,
    /// Gap between the outer radius and the label radius.
    pub label_offset: f32,
    /// How far above/below the pie labels may extend.
    pub max_vertical_offset: f32,
    pub canvas_width: f32,
    pub canvas_height: f32,
}

impl PieGeometry {
    pub fn label_radius(&self) -> f32 {
        self.outer_radius + self.label_offset
    }

    pub fn inner_label_radius(&self) -> f32 {
        self.inner_radius - self.label_offset
    }

    pub fn cx(&self) -> f32 {
        self.center.0
    }

    pub fn cy(&self) -> f32 {
        self.center.1
    }
}

/// Mutable layout state shared by the placement and resolution stages.
#[derive(Debug, Clone, Copy)]
pub struct PieContext {
    pub geometry: PieGeometry,
    pub lift_off_angle: f32,
    /// Minimum vertical gap between neighbouring outer labels.
    pub outer_padding: f32,
    pub max_font_size: f32,
    pub has_top_label: bool,
    pub has_bottom_label: bool,
    pub top_is_lifted: bool,
    pub bottom_is_lifted: bool,
}

impl PieContext {
    pub fn new(geometry: PieGeometry, lift_off_angle: f32, outer_padding: f32) -> Self {
        Self {
            geometry,
            lift_off_angle,
            outer_padding,
            max_font_size: 0.0,
            has_top_label: false,
            has_bottom_label: false,
            top_is_lifted: false,
            bottom_is_lifted: false,
        }
    }

    /// Offset subtracted from the vertical range when an apex label occupies the band.
    pub fn apex_correction(&self) -> f32 {
        self.max_font_size + self.outer_padding
    }

    /// Topmost connector y a non-apex label may take.
    pub fn upper_boundary(&self) -> f32 {
        let g = &self.geometry;
        let apex = if self.has_top_label { self.max_font_size } else { 0.0 };
        g.cy() - g.outer_radius - g.max_vertical_offset + apex
    }

    pub fn lower_boundary(&self) -> f32 {
        let g = &self.geometry;
        let apex = if self.has_bottom_label { self.max_font_size } else { 0.0 };
        g.cy() + g.outer_radius + g.max_vertical_offset - apex
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentLayout {
    pub id: usize,
    pub label: String,
    pub value: f32,
    pub start_angle: f32,
    pub end_angle: f32,
    pub color: String,
}

/// Counters and terminal status of one layout run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub font_scale_applied: bool,
    pub min_angle_applied: Option<f32>,
    pub preprocess_dropped: usize,
    pub out_of_bounds_corrections: usize,
    pub resolution_iterations: usize,
    pub top_lifts: usize,
    pub bottom_lifts: usize,
    pub removed_labels: usize,
    pub angle_increases: usize,
    pub inner_relocations: usize,
    pub descending_sweeps: usize,
    pub skipped: bool,
    pub error: Option<String>,
}

/// Final result of a layout run.
#[derive(Debug, Clone, Serialize)]
pub struct LabelLayout {
    pub geometry: PieGeometry,
    pub title: Option<String>,
    pub segments: Vec<SegmentLayout>,
    pub outer: Vec<Label>,
    pub inner: Vec<Label>,
    pub dropped: Vec<Label>,
    pub top_is_lifted: bool,
    pub bottom_is_lifted: bool,
    pub max_line_angle: f32,
    pub min_proportion: Option<f32>,
    pub diagnostics: Diagnostics,
}

impl LabelLayout {
    /// All visible labels, outer first.
    pub fn shown_labels(&self) -> impl Iterator<Item = &Label> {
        self.outer
            .iter()
            .chain(self.inner.iter())
            .filter(|label| label.label_shown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> PieGeometry {
        PieGeometry {
            center: (300.0, 180.0),
            outer_radius: 140.0,
            inner_radius: 70.0,
            label_offset: 10.0,
            max_vertical_offset: 40.0,
            canvas_width: 600.0,
            canvas_height: 360.0,
        }
    }

    #[test]
    fn radii_follow_offsets() {
        let g = geometry();
        assert_eq!(g.label_radius(), 150.0);
        assert_eq!(g.inner_label_radius(), 60.0);
    }

    #[test]
    fn apex_labels_shrink_vertical_range() {
        let mut ctx = PieContext::new(geometry(), 30.0, 1.0);
        ctx.max_font_size = 12.0;
        assert_eq!(ctx.upper_boundary(), 0.0);
        assert_eq!(ctx.lower_boundary(), 360.0);
        ctx.has_top_label = true;
        ctx.has_bottom_label = true;
        assert_eq!(ctx.upper_boundary(), 12.0);
        assert_eq!(ctx.lower_boundary(), 348.0);
        assert_eq!(ctx.apex_correction(), 13.0);
    }
}
