use serde::Serialize;

use super::geometry::{angle_between_vectors, between, point_angle, point_on_circle};
use super::text::MeasuredText;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ring {
    Outer,
    Inner,
}

/// Which horizontal edge a vertical move is expressed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Top,
    Bottom,
}

/// One text block attached to a pie segment.
///
/// `top_left_coord` and `line_connector_coord` are always kept consistent:
/// every placement goes through the connector and recomputes the box.
#[derive(Debug, Clone, Serialize)]
pub struct Label {
    pub id: usize,
    pub text: String,
    pub value: f32,
    pub fractional_value: f32,
    pub segment_angle_midpoint: f32,
    pub color: String,
    pub font_family: String,
    pub font_size: f32,
    pub text_lines: Vec<String>,
    pub line_height: f32,
    pub inner_padding: f32,
    pub width: f32,
    pub height: f32,
    pub line_connector_coord: (f32, f32),
    pub top_left_coord: (f32, f32),
    pub is_top_apex: bool,
    pub is_bottom_apex: bool,
    pub is_lifted: bool,
    pub label_shown: bool,
    pub ring: Ring,
    pub pie_center: (f32, f32),
    /// Radius the connector line starts from: the outer radius for outer
    /// labels, the inner radius for inner labels.
    pub anchor_radius: f32,
}

impl Label {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        text: impl Into<String>,
        value: f32,
        fractional_value: f32,
        segment_angle_midpoint: f32,
        color: impl Into<String>,
        font_family: impl Into<String>,
        font_size: f32,
        inner_padding: f32,
        pie_center: (f32, f32),
        outer_radius: f32,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            value,
            fractional_value,
            segment_angle_midpoint,
            color: color.into(),
            font_family: font_family.into(),
            font_size,
            text_lines: Vec::new(),
            line_height: font_size,
            inner_padding,
            width: 0.0,
            height: font_size,
            line_connector_coord: pie_center,
            top_left_coord: pie_center,
            is_top_apex: false,
            is_bottom_apex: false,
            is_lifted: false,
            label_shown: true,
            ring: Ring::Outer,
            pie_center,
            anchor_radius: outer_radius,
        }
    }

    /// Replaces every text-derived dimension in one step.
    pub fn apply_measurement(&mut self, font_size: f32, measured: MeasuredText) {
        self.font_size = font_size;
        self.text_lines = measured.lines;
        self.line_height = measured.line_height;
        self.width = measured.width;
        self.height = measured.height;
    }

    /// Builds the inner-ring twin of an outer label.
    pub fn to_inner(&self, inner_radius: f32) -> Label {
        let mut inner = self.clone();
        inner.ring = Ring::Inner;
        inner.anchor_radius = inner_radius;
        inner.is_top_apex = false;
        inner.is_bottom_apex = false;
        inner.is_lifted = false;
        inner.label_shown = true;
        inner
    }

    pub fn hemisphere(&self) -> Hemisphere {
        let angle = self.segment_angle_midpoint;
        if between(0.0, angle, 90.0) || (angle > 270.0 && angle < 360.0) {
            Hemisphere::Left
        } else {
            Hemisphere::Right
        }
    }

    pub fn in_left_half(&self) -> bool {
        self.hemisphere() == Hemisphere::Left
    }

    pub fn in_right_half(&self) -> bool {
        self.hemisphere() == Hemisphere::Right
    }

    /// 1 = top right, 2 = bottom right, 3 = bottom left, 4 = top left.
    pub fn segment_quadrant(&self) -> u8 {
        let angle = self.segment_angle_midpoint;
        if between(0.0, angle, 90.0) {
            4
        } else if between(90.0, angle, 180.0) {
            1
        } else if between(180.0, angle, 270.0) {
            2
        } else {
            3
        }
    }

    pub fn in_top_half(&self) -> bool {
        between(0.0, self.segment_angle_midpoint, 180.0)
    }

    pub fn in_bottom_half(&self) -> bool {
        !self.in_top_half()
    }

    pub fn top_y(&self) -> f32 {
        self.top_left_coord.1
    }

    pub fn bottom_y(&self) -> f32 {
        self.top_left_coord.1 + self.height
    }

    pub fn left_x(&self) -> f32 {
        self.top_left_coord.0
    }

    pub fn right_x(&self) -> f32 {
        self.top_left_coord.0 + self.width
    }

    pub fn corners(&self) -> [(f32, f32); 4] {
        let (left, top) = self.top_left_coord;
        let (right, bottom) = (self.right_x(), self.bottom_y());
        [(left, top), (right, top), (left, bottom), (right, bottom)]
    }

    /// Vertical distance between the top edge and the connector.
    pub fn connector_offset_from_top(&self) -> f32 {
        if self.is_top_apex {
            self.height
        } else if self.is_bottom_apex {
            0.0
        } else if self.in_top_half() {
            self.height - 0.5 * self.line_height
        } else {
            0.5 * self.line_height
        }
    }

    pub fn connector_offset_from_bottom(&self) -> f32 {
        self.height - self.connector_offset_from_top()
    }

    /// Horizontal distance between the left edge and the connector.
    fn connector_offset_from_left(&self) -> f32 {
        if self.is_top_apex || self.is_bottom_apex {
            return 0.5 * self.width;
        }
        match (self.ring, self.hemisphere()) {
            (Ring::Outer, Hemisphere::Left) | (Ring::Inner, Hemisphere::Right) => self.width,
            (Ring::Outer, Hemisphere::Right) | (Ring::Inner, Hemisphere::Left) => 0.0,
        }
    }

    pub fn place_via_connector(&mut self, coord: (f32, f32)) {
        self.line_connector_coord = coord;
        self.top_left_coord = (
            coord.0 - self.connector_offset_from_left(),
            coord.1 - self.connector_offset_from_top(),
        );
    }

    /// Places the label so its top edge sits at `coord.1` with the connector at `coord.0`.
    pub fn set_top_medial_point(&mut self, coord: (f32, f32)) {
        let connector = (coord.0, coord.1 + self.connector_offset_from_top());
        self.place_via_connector(connector);
    }

    /// Places the label so its bottom edge sits at `coord.1` with the connector at `coord.0`.
    pub fn set_bottom_medial_point(&mut self, coord: (f32, f32)) {
        let connector = (coord.0, coord.1 - self.connector_offset_from_bottom());
        self.place_via_connector(connector);
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        let (x, y) = self.line_connector_coord;
        self.place_via_connector((x + dx, y + dy));
    }

    /// Point on the anchor radius the connector line starts from.
    pub fn segment_coord(&self) -> (f32, f32) {
        point_on_circle(self.pie_center, self.anchor_radius, self.segment_angle_midpoint)
    }

    /// Angle between the radial line of the segment and the connector line.
    pub fn label_line_angle(&self) -> f32 {
        let (cx, cy) = self.pie_center;
        let segment = self.segment_coord();
        let radial = match self.ring {
            Ring::Outer => (segment.0 - cx, segment.1 - cy),
            Ring::Inner => (cx - segment.0, cy - segment.1),
        };
        let connector = (
            self.line_connector_coord.0 - segment.0,
            self.line_connector_coord.1 - segment.1,
        );
        angle_between_vectors(radial, connector)
    }

    /// Angle of the connector as seen from the pie center.
    pub fn label_angle(&self) -> f32 {
        point_angle(self.line_connector_coord, self.pie_center)
    }

    pub fn intersects(&self, other: &Label, padding: f32) -> bool {
        self.left_x() < other.right_x() + padding
            && other.left_x() < self.right_x() + padding
            && self.top_y() < other.bottom_y() + padding
            && other.top_y() < self.bottom_y() + padding
    }

    pub fn is_lower_than(&self, other: &Label) -> bool {
        self.top_y() > other.top_y()
    }

    pub fn is_higher_than(&self, other: &Label) -> bool {
        self.top_y() < other.top_y()
    }

    pub fn is_completely_above(&self, other: &Label) -> bool {
        self.bottom_y() < other.top_y()
    }

    pub fn is_completely_below(&self, other: &Label) -> bool {
        self.top_y() > other.bottom_y()
    }

    /// Short name for log lines.
    pub fn short_text(&self) -> String {
        const ELLIPSIS_THRESHOLD: usize = 11;
        if self.text.chars().count() > ELLIPSIS_THRESHOLD {
            let head: String = self.text.chars().take(ELLIPSIS_THRESHOLD - 3).collect();
            format!("{head}...({})", self.id)
        } else {
            format!("{}({})", self.text, self.id)
        }
    }
}

/// Indices (in `order`) of shown labels that overlap at least one other shown label.
pub fn find_intersecting_labels(labels: &[Label], order: &[usize]) -> Vec<usize> {
    order
        .iter()
        .copied()
        .filter(|&idx| {
            let label = &labels[idx];
            label.label_shown
                && order.iter().any(|&other| {
                    other != idx && labels[other].label_shown && label.intersects(&labels[other], 0.0)
                })
        })
        .collect()
}
