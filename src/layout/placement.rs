//! Initial placement of outer labels along the label radius, with the
//! lift-off triangles near the two apexes.

use tracing::{debug, error, info};

use super::geometry::{between, compute_intersection, inclusive_between, point_on_circle, to_radians};
use super::label::{Anchor, Hemisphere, Label};
use super::types::PieContext;

/// Horizontal gap between the lift-off triangles and the vertical meridian.
pub const MERIDIAN_GAP: f32 = 7.0;

const TOP_APEX_BAND: (f32, f32) = (87.0, 93.0);
const BOTTOM_APEX_BAND: (f32, f32) = (267.0, 273.0);
const OUT_OF_BOUNDS_STEP: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Top,
    Bottom,
}

impl Band {
    pub fn contains(self, angle: f32, lift_off_angle: f32) -> bool {
        let apex = match self {
            Band::Top => 90.0,
            Band::Bottom => 270.0,
        };
        between(apex - lift_off_angle, angle, apex + lift_off_angle)
    }
}

/// Flags at most one top and one bottom apex label and records them on the context.
pub fn detect_apex_labels(labels: &mut [Label], ctx: &mut PieContext) {
    let closest = |labels: &[Label], (low, high): (f32, f32), target: f32| {
        labels
            .iter()
            .enumerate()
            .filter(|(_, label)| inclusive_between(low, label.segment_angle_midpoint, high))
            .min_by(|(_, a), (_, b)| {
                (a.segment_angle_midpoint - target)
                    .abs()
                    .total_cmp(&(b.segment_angle_midpoint - target).abs())
            })
            .map(|(idx, _)| idx)
    };

    for label in labels.iter_mut() {
        label.is_top_apex = false;
        label.is_bottom_apex = false;
    }
    let top = closest(&*labels, TOP_APEX_BAND, 90.0);
    let bottom = closest(&*labels, BOTTOM_APEX_BAND, 270.0);
    if let Some(idx) = top {
        info!(target: "label", label = %labels[idx].short_text(), "has top apex label");
        labels[idx].is_top_apex = true;
    }
    if let Some(idx) = bottom {
        info!(target: "label", label = %labels[idx].short_text(), "has bottom apex label");
        labels[idx].is_bottom_apex = true;
    }
    ctx.has_top_label = top.is_some();
    ctx.has_bottom_label = bottom.is_some();
}

/// Places a label on the label radius, or on the lift-off placement line when
/// its angle falls within `lift_off_angle` of an apex.
pub fn place_label_along_label_radius(label: &mut Label, ctx: &PieContext, lift_off_angle: f32) {
    let g = &ctx.geometry;
    if label.is_top_apex || label.is_bottom_apex {
        let segment = point_on_circle(g.center, g.outer_radius, label.segment_angle_midpoint);
        let y = if label.is_top_apex {
            (g.cy() - (g.outer_radius + g.max_vertical_offset - label.height))
                .min(g.cy() - g.outer_radius - g.label_offset)
        } else {
            (g.cy() + (g.outer_radius + g.max_vertical_offset - label.height))
                .max(g.cy() + g.outer_radius + g.label_offset)
        };
        label.place_via_connector((segment.0, y));
        return;
    }

    let (coord, is_lifted) = initial_coord(label.segment_angle_midpoint, label.height, ctx, lift_off_angle);
    label.place_via_connector(coord);
    label.is_lifted = is_lifted;
}

fn initial_coord(angle: f32, label_height: f32, ctx: &PieContext, lift_off_angle: f32) -> ((f32, f32), bool) {
    let g = &ctx.geometry;
    let radius_point = point_on_circle(g.center, g.label_radius(), angle);
    let in_band = Band::Top.contains(angle, lift_off_angle) || Band::Bottom.contains(angle, lift_off_angle);
    if !in_band {
        return (radius_point, false);
    }

    let apex_correction = ctx.max_font_size + ctx.outer_padding;
    let far_y = if between(0.0, angle, 180.0) {
        g.cy() - (g.outer_radius + g.max_vertical_offset)
            + if ctx.has_top_label { apex_correction } else { 0.0 }
    } else {
        g.cy() + (g.outer_radius + g.max_vertical_offset)
            - if ctx.has_bottom_label { apex_correction } else { 0.0 }
    };
    let far_x = if between(0.0, angle, 90.0) || between(270.0, angle, 360.0) {
        g.cx() - MERIDIAN_GAP
    } else {
        g.cx() + MERIDIAN_GAP
    };
    let boundary_angle = if between(0.0, angle, 90.0) {
        90.0 - lift_off_angle
    } else if between(90.0, angle, 180.0) {
        90.0 + lift_off_angle
    } else if between(180.0, angle, 270.0) {
        270.0 - lift_off_angle
    } else {
        270.0 + lift_off_angle
    };
    let boundary_point = point_on_circle(g.center, g.label_radius(), boundary_angle);

    match compute_intersection([g.center, radius_point], [(far_x, far_y), boundary_point]) {
        Some((x, y)) => {
            let y = y.min(g.canvas_height - label_height).max(0.0);
            ((x, y), true)
        }
        None => {
            error!(target: "label", angle, "could not intersect radial line with placement line");
            (radius_point, false)
        }
    }
}

/// First pass with no lift-off; a band whose labels collide is re-placed lifted.
pub fn place_initial_labels(labels: &mut [Label], ctx: &mut PieContext) {
    for label in labels.iter_mut() {
        place_label_along_label_radius(label, ctx, 0.0);
    }

    for band in [Band::Top, Band::Bottom] {
        let members: Vec<usize> = (0..labels.len())
            .filter(|&idx| band.contains(labels[idx].segment_angle_midpoint, ctx.lift_off_angle))
            .collect();
        if super::label::find_intersecting_labels(labels, &members).is_empty() {
            continue;
        }
        info!(target: "label", ?band, lift_off_angle = ctx.lift_off_angle, "collisions near apex, applying lift-off spacing");
        lift_band(labels, ctx, band);
    }
}

/// Marks `band` as lifted and re-places every label whose angle falls inside it.
pub fn lift_band(labels: &mut [Label], ctx: &mut PieContext, band: Band) {
    match band {
        Band::Top => ctx.top_is_lifted = true,
        Band::Bottom => ctx.bottom_is_lifted = true,
    }
    let lift_off_angle = ctx.lift_off_angle;
    for label in labels
        .iter_mut()
        .filter(|label| band.contains(label.segment_angle_midpoint, lift_off_angle))
    {
        place_label_along_label_radius(label, ctx, lift_off_angle);
    }
}

/// Usable vertical extent for `label`, shortened when an apex label may sit in its way.
pub fn vertical_range(label: &Label, ctx: &PieContext) -> f32 {
    let g = &ctx.geometry;
    let cx = g.cx();
    let blocked = (label.left_x() < cx && ctx.has_top_label) || (label.left_x() > cx && ctx.has_bottom_label);
    let correction = if blocked { ctx.apex_correction() } else { 0.0 };
    g.outer_radius + g.max_vertical_offset - correction
}

/// Moves a label vertically so that `anchor` sits at `new_y`, recomputing x so
/// the connector stays on the label radius or on the lift-off triangle.
pub fn adjust_label_to_new_y(label: &mut Label, anchor: Anchor, new_y: f32, ctx: &PieContext) {
    let y_range = vertical_range(label, ctx);
    adjust_label_to_new_y_within(label, anchor, new_y, y_range, ctx);
}

pub(crate) fn adjust_label_to_new_y_within(
    label: &mut Label,
    anchor: Anchor,
    new_y: f32,
    y_range: f32,
    ctx: &PieContext,
) {
    let g = &ctx.geometry;
    let new_top = match anchor {
        Anchor::Top => new_y,
        Anchor::Bottom => new_y - label.height,
    };
    let connector_y = if new_top < g.cy() {
        new_top + label.height - 0.5 * label.line_height
    } else {
        new_top + 0.5 * label.line_height
    };

    let mut y_offset = (g.cy() - connector_y).abs();
    if y_offset > y_range {
        debug!(target: "label", y_offset, y_range, "vertical offset clamped to range");
        y_offset = y_range;
    }

    let lifted_side = (label.in_top_half() && ctx.top_is_lifted) || (label.in_bottom_half() && ctx.bottom_is_lifted);
    let lift = if lifted_side { to_radians(ctx.lift_off_angle) } else { 0.0 };
    let radius = g.label_radius();
    let y_meet = radius * lift.cos();
    let x_meet = radius * lift.sin();

    let (x_offset, is_lifted) = if y_offset <= y_meet {
        ((radius * radius - y_offset * y_offset).max(0.0).sqrt(), false)
    } else {
        let triangle_height = (y_range - y_meet).max(f32::EPSILON);
        let slope = (x_meet / triangle_height).atan().tan();
        ((y_range - y_offset) * slope + MERIDIAN_GAP, true)
    };

    let x = match label.hemisphere() {
        Hemisphere::Left => g.cx() - x_offset,
        Hemisphere::Right => g.cx() + x_offset,
    };
    label.is_lifted = is_lifted;
    match anchor {
        Anchor::Top => label.set_top_medial_point((x, new_y)),
        Anchor::Bottom => label.set_bottom_medial_point((x, new_y)),
    }
}

/// Pulls labels that spill over the canvas edges back inside, keeping their
/// relative vertical order. Returns how many labels were moved.
pub fn correct_out_of_bounds(labels: &mut [Label], ctx: &PieContext) -> usize {
    let g = ctx.geometry;
    let padding = ctx.outer_padding;
    let mut new_tops: Vec<(usize, f32)> = Vec::new();

    let over_top = |hemisphere: Hemisphere| -> Vec<usize> {
        let mut ids: Vec<usize> = (0..labels.len())
            .filter(|&idx| labels[idx].top_y() < 0.0 && labels[idx].hemisphere() == hemisphere)
            .collect();
        ids.sort_by_key(|&idx| labels[idx].id);
        ids
    };
    let under_bottom = |hemisphere: Hemisphere| -> Vec<usize> {
        let mut ids: Vec<usize> = (0..labels.len())
            .filter(|&idx| labels[idx].bottom_y() > g.canvas_height && labels[idx].hemisphere() == hemisphere)
            .collect();
        ids.sort_by_key(|&idx| labels[idx].id);
        ids
    };

    let mut left_top = over_top(Hemisphere::Left);
    left_top.reverse();
    let right_top = over_top(Hemisphere::Right);
    for order in [&left_top, &right_top] {
        for (k, &idx) in order.iter().enumerate() {
            new_tops.push((idx, padding + OUT_OF_BOUNDS_STEP * k as f32));
        }
    }

    let left_bottom = under_bottom(Hemisphere::Left);
    let mut right_bottom = under_bottom(Hemisphere::Right);
    right_bottom.reverse();
    for order in [&left_bottom, &right_bottom] {
        let mut previous: Option<f32> = None;
        for &idx in order.iter() {
            let height = labels[idx].height;
            let top = match previous {
                None => g.canvas_height - padding - OUT_OF_BOUNDS_STEP - height,
                Some(prev) => (g.canvas_height - height).min(prev - OUT_OF_BOUNDS_STEP),
            };
            new_tops.push((idx, top));
            previous = Some(top);
        }
    }

    for &(idx, top) in &new_tops {
        adjust_label_to_new_y(&mut labels[idx], Anchor::Top, top, ctx);
    }

    let mut horizontal = 0usize;
    for label in labels.iter_mut() {
        if label.right_x() > g.canvas_width {
            let dx = g.canvas_width - label.right_x();
            label.translate(dx, 0.0);
            horizontal += 1;
        } else if label.left_x() < 0.0 {
            let dx = -label.left_x();
            label.translate(dx, 0.0);
            horizontal += 1;
        }
    }

    info!(
        target: "label",
        over_top = left_top.len() + right_top.len(),
        under_bottom = left_bottom.len() + right_bottom.len(),
        horizontal,
        "out of bounds labels corrected"
    );
    new_tops.len() + horizontal
}

/// Samples the connector path a label of `line_height` follows while moving
/// from the upper to the lower boundary of one hemisphere.
pub fn sample_placement_curve(ctx: &PieContext, hemisphere: Hemisphere, step: f32) -> Vec<(f32, f32)> {
    let g = &ctx.geometry;
    let step = step.max(1.0);
    let height = ctx.max_font_size.max(1.0);
    let mut points = Vec::new();
    let mut y = ctx.upper_boundary();
    while y <= ctx.lower_boundary() - height {
        let angle = match (hemisphere, y + height < g.cy()) {
            (Hemisphere::Left, true) => 45.0,
            (Hemisphere::Left, false) => 315.0,
            (Hemisphere::Right, true) => 135.0,
            (Hemisphere::Right, false) => 225.0,
        };
        let mut probe = Label::new(0, "", 0.0, 0.0, angle, "", "", height, 0.0, g.center, g.outer_radius);
        probe.height = height;
        probe.line_height = height;
        adjust_label_to_new_y_within(&mut probe, Anchor::Top, y, g.outer_radius + g.max_vertical_offset, ctx);
        points.push(probe.line_connector_coord);
        y += step;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::label::tests::sample_label;
    use crate::layout::types::PieGeometry;

    fn context() -> PieContext {
        let geometry = PieGeometry {
            center: (300.0, 200.0),
            outer_radius: 100.0,
            inner_radius: 0.0,
            label_offset: 10.0,
            max_vertical_offset: 40.0,
            canvas_width: 600.0,
            canvas_height: 400.0,
        };
        let mut ctx = PieContext::new(geometry, 30.0, 1.0);
        ctx.max_font_size = 12.0;
        ctx
    }

    #[test]
    fn apex_detection_prefers_angle_closest_to_apex() {
        let mut labels = vec![
            sample_label(0, 87.5),
            sample_label(1, 91.0),
            sample_label(2, 200.0),
            sample_label(3, 273.0),
        ];
        let mut ctx = context();
        detect_apex_labels(&mut labels, &mut ctx);
        assert!(!labels[0].is_top_apex);
        assert!(labels[1].is_top_apex);
        assert!(labels[3].is_bottom_apex);
        assert!(ctx.has_top_label && ctx.has_bottom_label);
    }

    #[test]
    fn labels_outside_bands_sit_on_label_radius() {
        let ctx = context();
        let mut label = sample_label(0, 20.0);
        place_label_along_label_radius(&mut label, &ctx, 30.0);
        let expected = point_on_circle((300.0, 200.0), 110.0, 20.0);
        assert!((label.line_connector_coord.0 - expected.0).abs() < 1e-3);
        assert!(!label.is_lifted);
    }

    #[test]
    fn lifted_labels_rise_above_label_radius() {
        let ctx = context();
        let mut label = sample_label(0, 80.0);
        place_label_along_label_radius(&mut label, &ctx, 30.0);
        assert!(label.is_lifted);
        let radius_point = point_on_circle((300.0, 200.0), 110.0, 80.0);
        assert!(label.line_connector_coord.1 < radius_point.1);
        assert!(label.line_connector_coord.1 >= 0.0);
    }

    #[test]
    fn apex_labels_never_sit_inside_label_offset() {
        let ctx = context();
        let mut top = sample_label(0, 90.0);
        top.is_top_apex = true;
        place_label_along_label_radius(&mut top, &ctx, 0.0);
        assert!(top.bottom_y() <= 200.0 - 110.0);
        assert!((top.line_connector_coord.0 - 300.0).abs() < 1e-3);

        let mut bottom = sample_label(1, 270.0);
        bottom.is_bottom_apex = true;
        place_label_along_label_radius(&mut bottom, &ctx, 0.0);
        assert!(bottom.top_y() >= 200.0 + 110.0);
    }

    #[test]
    fn adjust_to_new_y_keeps_connector_on_label_radius() {
        let ctx = context();
        let mut label = sample_label(0, 200.0);
        adjust_label_to_new_y(&mut label, Anchor::Top, 250.0, &ctx);
        assert_eq!(label.top_y(), 250.0);
        let (x, y) = label.line_connector_coord;
        let distance = ((x - 300.0).powi(2) + (y - 200.0).powi(2)).sqrt();
        assert!((distance - 110.0).abs() < 1.0, "distance {distance}");
        assert!(x > 300.0);
    }

    #[test]
    fn adjust_beyond_meeting_point_uses_triangle() {
        let mut ctx = context();
        ctx.top_is_lifted = true;
        let mut label = sample_label(0, 80.0);
        adjust_label_to_new_y(&mut label, Anchor::Bottom, 70.0, &ctx);
        assert!(label.is_lifted);
        assert_eq!(label.bottom_y(), 70.0);
        assert!(label.line_connector_coord.0 < 300.0 - MERIDIAN_GAP + 1e-3);
    }

    #[test]
    fn out_of_bounds_labels_are_pulled_inside_in_order() {
        let ctx = context();
        let mut labels = vec![sample_label(0, 40.0), sample_label(1, 50.0)];
        labels[0].place_via_connector((100.0, -20.0));
        labels[1].place_via_connector((120.0, -10.0));
        let moved = correct_out_of_bounds(&mut labels, &ctx);
        assert_eq!(moved, 2);
        assert!(labels.iter().all(|l| l.top_y() >= 0.0));
        assert!(labels[1].top_y() < labels[0].top_y());
    }

    #[test]
    fn placement_curve_spans_vertical_range() {
        let ctx = context();
        let points = sample_placement_curve(&ctx, Hemisphere::Left, 10.0);
        assert!(points.len() > 10);
        assert!(points.iter().all(|(x, _)| *x < 300.0));
    }
}
