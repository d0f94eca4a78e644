use tracing::{debug, info};

use super::error::LayoutInterrupt;
use super::geometry::{between, point_on_circle, within_radius};
use super::label::{Hemisphere, Label};
use super::types::PieContext;

const INNER_NUDGE: f32 = 2.0;
const MAX_INNER_LINE_ANGLE: f32 = 45.0;

/// Quadrants whose outer labels may fall back to the inner ring.
pub const INNER_LABEL_QUADRANTS: [u8; 3] = [1, 2, 3];

/// Tries to move an outer label onto the inner ring.
///
/// On success the outer label is hidden and its inner twin is appended to
/// `inner`; on failure nothing is modified.
pub fn move_to_inner_label(
    label: &mut Label,
    inner: &mut Vec<Label>,
    ctx: &PieContext,
) -> Result<(), LayoutInterrupt> {
    let g = &ctx.geometry;
    let inner_label_radius = g.inner_label_radius();
    if inner_label_radius <= 0.0 {
        return Err(LayoutInterrupt::inner_ring(label.id, "pie has no inner ring"));
    }

    let mut candidate = label.to_inner(g.inner_radius);
    let angle = candidate.segment_angle_midpoint;
    candidate.place_via_connector(point_on_circle(g.center, inner_label_radius, angle));

    if let Some(previous) = inner.last() {
        let should_be_lower = match candidate.hemisphere() {
            Hemisphere::Right => angle > previous.segment_angle_midpoint,
            Hemisphere::Left => {
                (between(0.0, angle, 90.0) || between(270.0, angle, 360.0))
                    && angle < previous.segment_angle_midpoint
            }
        };
        let in_order = if should_be_lower {
            candidate.is_lower_than(previous)
        } else {
            candidate.is_higher_than(previous)
        };

        if candidate.intersects(previous, INNER_NUDGE) || !in_order {
            let new_y = if should_be_lower {
                previous.bottom_y() + INNER_NUDGE
            } else {
                previous.top_y() - INNER_NUDGE
            };
            let dy = (g.cy() - new_y).abs();
            if dy > inner_label_radius {
                return Err(LayoutInterrupt::inner_ring(label.id, "nudged past the inner label radius"));
            }
            let x_offset = (inner_label_radius * inner_label_radius - dy * dy).sqrt();
            let x = match candidate.hemisphere() {
                Hemisphere::Left => g.cx() - x_offset,
                Hemisphere::Right => g.cx() + x_offset,
            };
            debug!(
                target: "label",
                label = %candidate.short_text(),
                previous = %previous.short_text(),
                below = should_be_lower,
                "inner collision, nudging new label"
            );
            if should_be_lower {
                candidate.set_top_medial_point((x, new_y));
            } else {
                candidate.set_bottom_medial_point((x, new_y));
            }
        }
    }

    if let Some(other) = inner.iter().find(|other| candidate.intersects(other, 0.0)) {
        return Err(LayoutInterrupt::inner_ring(
            label.id,
            format!("overlaps inner label {}", other.short_text()),
        ));
    }

    let contained = candidate
        .corners()
        .iter()
        .all(|corner| within_radius(*corner, g.center, g.inner_radius));
    if !contained {
        return Err(LayoutInterrupt::inner_ring(label.id, "out of bounds after adjustment"));
    }
    let line_angle = candidate.label_line_angle();
    if line_angle > MAX_INNER_LINE_ANGLE {
        return Err(LayoutInterrupt::inner_ring(
            label.id,
            format!("line angle {line_angle:.2} exceeds {MAX_INNER_LINE_ANGLE}"),
        ));
    }

    info!(target: "label", label = %label.short_text(), "placed label inside");
    inner.push(candidate);
    label.label_shown = false;
    Ok(())
}

/// Connector of an inner label: from the inner radius to the label.
pub fn inner_label_line(label: &Label) -> [(f32, f32); 2] {
    [label.segment_coord(), label.line_connector_coord]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::label::Ring;
    use crate::layout::label::tests::sample_label;
    use crate::layout::types::PieGeometry;

    fn donut() -> PieContext {
        let geometry = PieGeometry {
            center: (250.0, 250.0),
            outer_radius: 200.0,
            inner_radius: 120.0,
            label_offset: 10.0,
            max_vertical_offset: 40.0,
            canvas_width: 500.0,
            canvas_height: 500.0,
        };
        PieContext::new(geometry, 30.0, 1.0)
    }

    #[test]
    fn relocates_label_inside_donut_hole() {
        let ctx = donut();
        let mut label = sample_label(0, 200.0);
        let mut inner = Vec::new();
        move_to_inner_label(&mut label, &mut inner, &ctx).expect("fits inside");
        assert!(!label.label_shown);
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].ring, Ring::Inner);
        assert!(inner[0].right_x() <= 250.0 + 110.0 + 1e-3);
        let line = inner_label_line(&inner[0]);
        assert_eq!(line[1], inner[0].line_connector_coord);
    }

    #[test]
    fn second_label_is_nudged_below_the_first() {
        let ctx = donut();
        let mut first = sample_label(0, 200.0);
        let mut second = sample_label(1, 205.0);
        let mut inner = Vec::new();
        move_to_inner_label(&mut first, &mut inner, &ctx).expect("first fits");
        move_to_inner_label(&mut second, &mut inner, &ctx).expect("second fits");
        assert_eq!(inner.len(), 2);
        assert!(inner[1].top_y() >= inner[0].bottom_y() + INNER_NUDGE - 1e-3);
    }

    #[test]
    fn pie_without_hole_rejects_inner_labels() {
        let mut ctx = donut();
        ctx.geometry.inner_radius = 0.0;
        let mut label = sample_label(0, 200.0);
        let mut inner = Vec::new();
        let err = move_to_inner_label(&mut label, &mut inner, &ctx).unwrap_err();
        assert_eq!(err.label_id(), 0);
        assert!(label.label_shown);
        assert!(inner.is_empty());
    }

    #[test]
    fn earlier_inner_labels_are_never_covered() {
        let ctx = donut();
        let mut inner = Vec::new();
        move_to_inner_label(&mut sample_label(0, 200.0), &mut inner, &ctx).expect("first fits");
        let mut far = sample_label(1, 300.0).to_inner(ctx.geometry.inner_radius);
        far.place_via_connector(point_on_circle(ctx.geometry.center, ctx.geometry.inner_label_radius(), 300.0));
        inner.push(far);

        let mut label = sample_label(2, 201.0);
        let err = move_to_inner_label(&mut label, &mut inner, &ctx).unwrap_err();
        assert_eq!(err.label_id(), 2);
        assert!(label.label_shown);
        assert_eq!(inner.len(), 2);
    }
}
