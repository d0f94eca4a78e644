//! Two-phase (down then up) sweep resolving collisions within one hemisphere.

use tracing::{debug, warn};

use crate::config::StageConfig;

use super::error::LayoutInterrupt;
use super::inner::{INNER_LABEL_QUADRANTS, move_to_inner_label};
use super::label::{Anchor, Hemisphere, Label, find_intersecting_labels};
use super::placement::{MERIDIAN_GAP, adjust_label_to_new_y};
use super::types::PieContext;

#[derive(Debug, Clone, Copy)]
pub struct SweepSettings<'a> {
    pub max_line_angle: f32,
    pub inner_labels: bool,
    pub stages: &'a StageConfig,
}

impl SweepSettings<'_> {
    fn may_move_inside(&self, label: &Label) -> bool {
        self.inner_labels && INNER_LABEL_QUADRANTS.contains(&label.segment_quadrant())
    }
}

/// Indices of the labels of one hemisphere (plus both apex labels), top to
/// bottom by connector, ties broken by descending id.
pub fn sorted_hemisphere(labels: &[Label], hemisphere: Hemisphere) -> Vec<usize> {
    let mut order: Vec<usize> = (0..labels.len())
        .filter(|&idx| {
            let label = &labels[idx];
            label.hemisphere() == hemisphere || label.is_top_apex || label.is_bottom_apex
        })
        .collect();
    order.sort_by(|&a, &b| {
        labels[a]
            .line_connector_coord
            .1
            .total_cmp(&labels[b].line_connector_coord.1)
            .then(labels[b].id.cmp(&labels[a].id))
    });
    order
}

fn previous_shown(labels: &[Label], order: &[usize], position: usize) -> Option<usize> {
    order[..position]
        .iter()
        .rev()
        .copied()
        .find(|&idx| labels[idx].label_shown)
}

fn park_at_bottom(label: &mut Label, ctx: &PieContext) {
    let cx = ctx.geometry.cx();
    let x = if label.in_left_half() { cx - MERIDIAN_GAP } else { cx + MERIDIAN_GAP };
    label.set_bottom_medial_point((x, ctx.lower_boundary()));
}

fn try_inner(
    labels: &mut [Label],
    idx: usize,
    inner: &mut Vec<Label>,
    ctx: &PieContext,
    counter: &mut usize,
) -> bool {
    match move_to_inner_label(&mut labels[idx], inner, ctx) {
        Ok(()) => {
            *counter += 1;
            true
        }
        Err(interrupt) => {
            debug!(target: "label", reason = interrupt.description(), "could not move to inner ring, adjusting instead");
            false
        }
    }
}

/// Runs the down sweep, the up sweep when the down sweep was cut short, and
/// the final validation pass over `order`.
///
/// Returns the number of labels relocated to the inner ring.
pub fn two_phase_adjustment(
    labels: &mut [Label],
    order: &[usize],
    inner: &mut Vec<Label>,
    hemisphere: Hemisphere,
    ctx: &PieContext,
    settings: &SweepSettings<'_>,
) -> Result<usize, LayoutInterrupt> {
    let gap = ctx.outer_padding;
    let max_angle = settings.max_line_angle;
    let mut relocated = 0usize;
    let mut hit_bottom = false;
    let mut angle_exceeded = false;

    if settings.stages.down_sweep {
        debug!(target: "label", ?hemisphere, size = order.len(), "down sweep start");
        for frontier_pos in 0..order.len().saturating_sub(1) {
            if hit_bottom || angle_exceeded {
                break;
            }
            let frontier = order[frontier_pos];
            let next = order[frontier_pos + 1];
            if !labels[frontier].label_shown || !labels[next].label_shown {
                continue;
            }
            if !(labels[frontier].intersects(&labels[next], 0.0)
                || labels[next].is_completely_above(&labels[frontier]))
            {
                continue;
            }

            for pushed_pos in frontier_pos + 1..order.len() {
                let Some(adjusted) = previous_shown(labels, order, pushed_pos) else {
                    continue;
                };
                let previous_inside = !labels[order[pushed_pos - 1]].label_shown;
                let pushed = order[pushed_pos];
                if !labels[pushed].label_shown {
                    continue;
                }
                if labels[pushed].is_bottom_apex {
                    debug!(target: "label", label = %labels[pushed].short_text(), "down sweep reached bottom apex");
                    hit_bottom = true;
                    continue;
                }
                if hit_bottom {
                    park_at_bottom(&mut labels[pushed], ctx);
                    continue;
                }
                if labels[pushed].is_lower_than(&labels[adjusted])
                    && !labels[pushed].intersects(&labels[adjusted], 0.0)
                {
                    break;
                }
                if settings.may_move_inside(&labels[pushed])
                    && !previous_inside
                    && try_inner(labels, pushed, inner, ctx, &mut relocated)
                {
                    continue;
                }

                let new_y = labels[adjusted].bottom_y() + gap;
                if new_y + labels[pushed].height > ctx.lower_boundary() {
                    debug!(target: "label", label = %labels[pushed].short_text(), "down sweep exceeds lower boundary, parking remaining labels");
                    hit_bottom = true;
                    park_at_bottom(&mut labels[pushed], ctx);
                    continue;
                }

                let before = labels[pushed].label_line_angle();
                adjust_label_to_new_y(&mut labels[pushed], Anchor::Top, new_y, ctx);
                let after = labels[pushed].label_line_angle();
                debug!(target: "label", label = %labels[pushed].short_text(), before, after, "pushed down");
                if after > max_angle {
                    warn!(target: "label", label = %labels[pushed].short_text(), after, max_angle, "line angle exceeded, cancelling down sweep");
                    angle_exceeded = true;
                    break;
                }
            }
        }
    }

    if settings.stages.up_sweep && (hit_bottom || angle_exceeded) {
        let in_hemisphere = |id: usize| order.iter().any(|&idx| labels[idx].id == id);
        let reset_ids: Vec<usize> = inner
            .iter()
            .map(|label| label.id)
            .filter(|&id| in_hemisphere(id))
            .collect();
        inner.retain(|label| !reset_ids.contains(&label.id));
        for &idx in order {
            if reset_ids.contains(&labels[idx].id) {
                labels[idx].label_shown = true;
                park_at_bottom(&mut labels[idx], ctx);
            }
        }
        relocated = relocated.saturating_sub(reset_ids.len());

        let reversed: Vec<usize> = order.iter().rev().copied().collect();
        debug!(target: "label", ?hemisphere, size = reversed.len(), "up sweep start");
        for frontier_pos in 0..reversed.len().saturating_sub(1) {
            let frontier = reversed[frontier_pos];
            let next = reversed[frontier_pos + 1];
            if !labels[frontier].label_shown || !labels[next].label_shown {
                continue;
            }
            if !(labels[frontier].intersects(&labels[next], 0.0)
                || labels[next].is_completely_below(&labels[frontier]))
            {
                continue;
            }

            for pushed_pos in frontier_pos + 1..reversed.len() {
                let Some(adjusted) = previous_shown(labels, &reversed, pushed_pos) else {
                    continue;
                };
                let previous_inside = !labels[reversed[pushed_pos - 1]].label_shown;
                let pushed = reversed[pushed_pos];
                if !labels[pushed].label_shown {
                    continue;
                }
                if labels[pushed].is_higher_than(&labels[adjusted])
                    && !labels[pushed].intersects(&labels[adjusted], 0.0)
                {
                    break;
                }
                if labels[pushed].is_top_apex {
                    return Err(LayoutInterrupt::pushed_off_canvas(
                        labels[pushed].id,
                        "up sweep would move the top apex label",
                    ));
                }
                if settings.may_move_inside(&labels[pushed])
                    && !previous_inside
                    && try_inner(labels, pushed, inner, ctx, &mut relocated)
                {
                    continue;
                }

                let new_y = labels[adjusted].top_y() - (labels[pushed].height + gap);
                if new_y < ctx.upper_boundary() {
                    return Err(LayoutInterrupt::pushed_off_canvas(labels[pushed].id, "pushed off top"));
                }

                adjust_label_to_new_y(&mut labels[pushed], Anchor::Top, new_y, ctx);
                let after = labels[pushed].label_line_angle();
                debug!(target: "label", label = %labels[pushed].short_text(), after, "pushed up");
                if after > max_angle {
                    return Err(LayoutInterrupt::angle_exceeded(
                        labels[pushed].id,
                        format!("{after:.2} > {max_angle}"),
                    ));
                }
            }
        }
    }

    if settings.stages.final_pass {
        if let Some(&idx) = order
            .iter()
            .find(|&&idx| labels[idx].label_shown && labels[idx].label_line_angle() > max_angle)
        {
            let angle = labels[idx].label_line_angle();
            warn!(target: "label", label = %labels[idx].short_text(), angle, "final pass found line angle over threshold");
            return Err(LayoutInterrupt::angle_exceeded(
                labels[idx].id,
                format!("{angle:.2} > {max_angle}"),
            ));
        }
        let colliding = find_intersecting_labels(labels, order);
        if let Some(&idx) = colliding.first() {
            warn!(target: "label", count = colliding.len(), "final pass found colliding labels");
            return Err(LayoutInterrupt::collision(labels[idx].id, "final check after up sweep"));
        }
    }

    Ok(relocated)
}
