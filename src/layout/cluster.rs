use tracing::{debug, info, warn};

use super::label::{Anchor, Label, find_intersecting_labels};
use super::placement::adjust_label_to_new_y;
use super::types::PieContext;

/// Free space (in px) a cluster needs around it before it is moved.
const MIN_FREE_SPACE: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClusterMove {
    Up,
    Down,
    Split,
    Skip,
}

fn choose_move(space_above: f32, space_below: f32) -> ClusterMove {
    let sum = space_above + space_below;
    let difference = (space_below - space_above).abs();
    if sum > MIN_FREE_SPACE && difference > MIN_FREE_SPACE && space_above > space_below {
        ClusterMove::Up
    } else if sum > MIN_FREE_SPACE && difference > MIN_FREE_SPACE && space_below > space_above {
        ClusterMove::Down
    } else if sum > MIN_FREE_SPACE {
        ClusterMove::Split
    } else {
        ClusterMove::Skip
    }
}

/// Spreads runs of colliding labels (adjacent ids) into the free space above
/// and/or below them. `order` is one hemisphere sorted top to bottom.
pub fn initial_cluster_spacing(labels: &mut [Label], order: &[usize], ctx: &PieContext, max_line_angle: f32) {
    let position = |idx: usize| order.iter().position(|&o| o == idx);

    let mut runs: Vec<Vec<usize>> = Vec::new();
    for idx in find_intersecting_labels(labels, order) {
        match runs.last_mut() {
            Some(run) if run.last().is_some_and(|&last| labels[last].id.abs_diff(labels[idx].id) <= 1) => {
                run.push(idx)
            }
            _ => runs.push(vec![idx]),
        }
    }

    for run in runs {
        let (Some(&first), Some(&last)) = (run.first(), run.last()) else {
            continue;
        };
        let space_above = position(first)
            .and_then(|pos| pos.checked_sub(1))
            .map(|pos| labels[first].top_y() - labels[order[pos]].bottom_y())
            .unwrap_or(0.0);
        let space_below = position(last)
            .map(|pos| pos + 1)
            .filter(|&pos| pos < order.len())
            .map(|pos| labels[order[pos]].top_y() - labels[last].bottom_y())
            .unwrap_or(0.0);

        let movement = choose_move(space_above, space_below);
        debug!(target: "label", size = run.len(), space_above, space_below, ?movement, "cluster found");
        match movement {
            ClusterMove::Up => {
                let upward: Vec<usize> = run.iter().rev().copied().collect();
                push_up(labels, order, &upward, ctx, max_line_angle);
            }
            ClusterMove::Down => push_down(labels, order, &run, ctx, max_line_angle),
            ClusterMove::Split => {
                let (upper, lower) = run.split_at(run.len().div_ceil(2));
                let upward: Vec<usize> = upper.iter().rev().copied().collect();
                push_up(labels, order, &upward, ctx, max_line_angle);
                push_down(labels, order, lower, ctx, max_line_angle);
            }
            ClusterMove::Skip => info!(target: "label", "no room to space cluster, skipping"),
        }
    }
}

fn push_up(labels: &mut [Label], order: &[usize], run: &[usize], ctx: &PieContext, max_line_angle: f32) {
    for &idx in run {
        let Some(below) = order
            .iter()
            .position(|&o| o == idx)
            .and_then(|pos| order.get(pos + 1).copied())
        else {
            warn!(target: "label", label = %labels[idx].short_text(), "no label below to push up from");
            continue;
        };
        let new_bottom = labels[below].top_y() - ctx.outer_padding;
        if new_bottom - labels[idx].height < ctx.upper_boundary() {
            debug!(target: "label", "cluster push up stopped at upper boundary");
            return;
        }
        let old_bottom = labels[idx].bottom_y();
        adjust_label_to_new_y(&mut labels[idx], Anchor::Bottom, new_bottom, ctx);
        if labels[idx].label_line_angle() > max_line_angle {
            info!(target: "label", label = %labels[idx].short_text(), "cluster push up exceeded line angle, reverting");
            adjust_label_to_new_y(&mut labels[idx], Anchor::Bottom, old_bottom, ctx);
            return;
        }
    }
}

fn push_down(labels: &mut [Label], order: &[usize], run: &[usize], ctx: &PieContext, max_line_angle: f32) {
    for &idx in run {
        let Some(above) = order
            .iter()
            .position(|&o| o == idx)
            .and_then(|pos| pos.checked_sub(1))
            .map(|pos| order[pos])
        else {
            warn!(target: "label", label = %labels[idx].short_text(), "no label above to push down from");
            continue;
        };
        let new_top = labels[above].bottom_y() + ctx.outer_padding;
        if new_top + labels[idx].height > ctx.lower_boundary() {
            debug!(target: "label", "cluster push down stopped at lower boundary");
            return;
        }
        let old_top = labels[idx].top_y();
        adjust_label_to_new_y(&mut labels[idx], Anchor::Top, new_top, ctx);
        if labels[idx].label_line_angle() > max_line_angle {
            info!(target: "label", label = %labels[idx].short_text(), "cluster push down exceeded line angle, reverting");
            adjust_label_to_new_y(&mut labels[idx], Anchor::Top, old_top, ctx);
            return;
        }
    }
}
