//! Pulls lifted apex clusters back toward the pie once resolution succeeded.

use tracing::{error, info};

use super::geometry::{compute_intersection, point_on_circle};
use super::label::{Hemisphere, Label, find_intersecting_labels};
use super::placement::{Band, MERIDIAN_GAP, place_label_along_label_radius};
use super::types::PieContext;

const IDEAL_LABEL_PADDING: f32 = 2.0;

/// Runs the lifted-cluster shortening and the apex pull for both apexes.
/// `labels` must be the shown outer labels in id order.
pub fn shorten_top_and_bottom(labels: &mut [Label], ctx: &PieContext, max_line_angle: f32) {
    if ctx.top_is_lifted {
        shorten_lifted_labels(labels, ctx, Band::Top, max_line_angle);
    }
    shorten_apex_label(labels, ctx, Band::Top);
    if ctx.bottom_is_lifted {
        shorten_lifted_labels(labels, ctx, Band::Bottom, max_line_angle);
    }
    shorten_apex_label(labels, ctx, Band::Bottom);
}

/// Neighbour directly below `labels[pos]` in angular order, if it really is lower.
pub fn nearest_neighbor_below(labels: &[Label], pos: usize) -> Option<usize> {
    let label = labels.get(pos)?;
    if label.is_bottom_apex {
        return None;
    }
    let last = labels.len().checked_sub(1)?;
    let candidate = match label.segment_quadrant() {
        4 if pos == 0 => last,
        4 | 3 => pos.checked_sub(1)?,
        _ => pos + 1,
    };
    labels
        .get(candidate)
        .filter(|below| below.top_y() > label.top_y())
        .map(|_| candidate)
}

/// Neighbour directly above `labels[pos]` in angular order, if it really is higher.
pub fn nearest_neighbor_above(labels: &[Label], pos: usize) -> Option<usize> {
    let label = labels.get(pos)?;
    if label.is_top_apex {
        return None;
    }
    let last = labels.len().checked_sub(1)?;
    let candidate = match label.segment_quadrant() {
        3 if pos == last => 0,
        4 | 3 => pos + 1,
        _ => pos.checked_sub(1)?,
    };
    labels
        .get(candidate)
        .filter(|above| above.top_y() < label.top_y())
        .map(|_| candidate)
}

struct SideSet {
    hemisphere: Hemisphere,
    meet_point: (f32, f32),
    members: Vec<usize>,
    total_height: f32,
    ideal_start: f32,
    inward: Option<usize>,
}

fn shorten_lifted_labels(labels: &mut [Label], ctx: &PieContext, band: Band, max_line_angle: f32) {
    let g = &ctx.geometry;
    let padding = ctx.outer_padding;
    let lift = ctx.lift_off_angle;
    let (has_apex, sign) = match band {
        Band::Top => (ctx.has_top_label, -1.0),
        Band::Bottom => (ctx.has_bottom_label, 1.0),
    };
    let usable_offset = if has_apex {
        g.max_vertical_offset - ctx.max_font_size - padding
    } else {
        g.max_vertical_offset
    };
    let limit_y = g.cy() + sign * (g.outer_radius + usable_offset);
    let base_y = g.cy() + sign * (g.outer_radius + g.label_offset);

    let mut sides: Vec<SideSet> = Vec::new();
    for hemisphere in [Hemisphere::Left, Hemisphere::Right] {
        let meet_angle = match (band, hemisphere) {
            (Band::Top, Hemisphere::Left) => 90.0 - lift,
            (Band::Top, Hemisphere::Right) => 90.0 + lift,
            (Band::Bottom, Hemisphere::Left) => 270.0 + lift,
            (Band::Bottom, Hemisphere::Right) => 270.0 - lift,
        };
        let meet_point = point_on_circle(g.center, g.label_radius(), meet_angle);
        let mut members: Vec<usize> = (0..labels.len())
            .filter(|&idx| {
                let label = &labels[idx];
                let outward = match band {
                    Band::Top => label.top_y() <= meet_point.1 && !label.is_top_apex,
                    Band::Bottom => label.bottom_y() >= meet_point.1 && !label.is_bottom_apex,
                };
                label.is_lifted && label.hemisphere() == hemisphere && outward
            })
            .collect();
        // closest to the pie first
        members.sort_by(|&a, &b| {
            let (ya, yb) = (labels[a].line_connector_coord.1, labels[b].line_connector_coord.1);
            let by_y = match band {
                Band::Top => yb.total_cmp(&ya),
                Band::Bottom => ya.total_cmp(&yb),
            };
            by_y.then(labels[b].id.cmp(&labels[a].id))
        });
        if members.is_empty() {
            continue;
        }
        let inward = match band {
            Band::Top => nearest_neighbor_below(labels, members[0]),
            Band::Bottom => nearest_neighbor_above(labels, members[0]),
        };
        let ideal_start = match (band, inward) {
            (Band::Top, Some(n)) => meet_point.1.min(labels[n].top_y()),
            (Band::Bottom, Some(n)) => meet_point.1.max(labels[n].bottom_y()),
            (_, None) => meet_point.1,
        };
        let total_height = members.iter().map(|&idx| labels[idx].height).sum();
        sides.push(SideSet {
            hemisphere,
            meet_point,
            members,
            total_height,
            ideal_start,
            inward,
        });
    }
    if sides.is_empty() {
        return;
    }

    let new_apex = sides
        .iter()
        .map(|side| side.ideal_start + sign * (side.total_height + side.members.len() as f32 * IDEAL_LABEL_PADDING))
        .fold(base_y, |acc, y| match band {
            Band::Top => acc.min(y),
            Band::Bottom => acc.max(y),
        });
    let exceeds = match band {
        Band::Top => new_apex < limit_y,
        Band::Bottom => new_apex > limit_y,
    };
    if exceeds {
        info!(target: "label", ?band, "not enough free vertical space to shorten");
        return;
    }

    for side in sides {
        let mut candidates: Vec<Label> = side.members.iter().map(|&idx| labels[idx].clone()).collect();
        for candidate in candidates.iter_mut() {
            place_label_along_label_radius(candidate, ctx, 0.0);
        }

        // inward neighbour and this side only; the whole set is checked before committing
        let mut check: Vec<Label> = side.inward.map(|n| labels[n].clone()).into_iter().collect();
        check.extend(candidates.iter().cloned());
        let all: Vec<usize> = (0..check.len()).collect();
        let simple_worked = find_intersecting_labels(&check, &all).is_empty()
            && candidates.iter().all(|label| label.label_line_angle() <= max_line_angle);

        if simple_worked {
            info!(target: "label", ?band, hemisphere = ?side.hemisphere, "labels fit on the label radius");
        } else {
            for (candidate, &idx) in candidates.iter_mut().zip(side.members.iter()) {
                *candidate = labels[idx].clone();
            }
            let meridian_x = match side.hemisphere {
                Hemisphere::Left => g.cx() - MERIDIAN_GAP,
                Hemisphere::Right => g.cx() + MERIDIAN_GAP,
            };
            let triangle = [side.meet_point, (meridian_x, new_apex)];
            let available = (new_apex - side.ideal_start).abs();
            let spacing = (available - side.total_height) / candidates.len() as f32;
            let mut frontier = side.ideal_start + sign * spacing;
            for candidate in candidates.iter_mut() {
                let connector_y = match band {
                    Band::Top => frontier - candidate.connector_offset_from_bottom(),
                    Band::Bottom => frontier + candidate.connector_offset_from_top(),
                };
                let latitude = [(0.0, connector_y), (g.canvas_width, connector_y)];
                match compute_intersection(triangle, latitude) {
                    Some((x, _)) => {
                        candidate.place_via_connector((x, connector_y));
                        frontier = match band {
                            Band::Top => candidate.top_y() - spacing,
                            Band::Bottom => candidate.bottom_y() + spacing,
                        };
                    }
                    None => {
                        error!(target: "label", label = %candidate.short_text(), "could not intersect shortened placement line");
                    }
                }
            }
        }

        if candidates.iter().any(|label| label.label_line_angle() > max_line_angle) {
            info!(target: "label", ?band, hemisphere = ?side.hemisphere, "line angle exceeded, keeping lifted positions");
            continue;
        }
        let mut trial = labels.to_vec();
        for (candidate, &idx) in candidates.iter().zip(side.members.iter()) {
            trial[idx] = candidate.clone();
        }
        let all: Vec<usize> = (0..trial.len()).collect();
        let overlapping = find_intersecting_labels(&trial, &all);
        if side.members.iter().any(|idx| overlapping.contains(idx)) {
            info!(target: "label", ?band, hemisphere = ?side.hemisphere, "shortened labels would overlap, keeping lifted positions");
            continue;
        }
        for (candidate, &idx) in candidates.into_iter().zip(side.members.iter()) {
            labels[idx] = candidate;
        }
    }
}

fn shorten_apex_label(labels: &mut [Label], ctx: &PieContext, band: Band) {
    let g = &ctx.geometry;
    let Some(pos) = labels.iter().position(|label| match band {
        Band::Top => label.is_top_apex,
        Band::Bottom => label.is_bottom_apex,
    }) else {
        return;
    };
    let neighbours: Vec<&Label> = [pos.checked_sub(1), Some(pos + 1)]
        .into_iter()
        .flatten()
        .filter_map(|idx| labels.get(idx))
        .collect();
    if neighbours.is_empty() {
        return;
    }

    let x = labels[pos].line_connector_coord.0;
    let mut moved = labels[pos].clone();
    match band {
        Band::Top => {
            let nearest = neighbours.iter().map(|l| l.top_y()).fold(f32::INFINITY, f32::min);
            let new_bottom = (nearest - ctx.outer_padding).min(g.cy() - g.outer_radius - g.label_offset);
            if new_bottom <= moved.bottom_y() {
                return;
            }
            moved.place_via_connector((x, new_bottom));
        }
        Band::Bottom => {
            let nearest = neighbours.iter().map(|l| l.bottom_y()).fold(f32::NEG_INFINITY, f32::max);
            let new_top = (nearest + ctx.outer_padding).max(g.cy() + g.outer_radius + g.label_offset);
            if new_top >= moved.top_y() {
                return;
            }
            moved.place_via_connector((x, new_top));
        }
    }
    let blocked = labels
        .iter()
        .enumerate()
        .any(|(idx, other)| idx != pos && other.label_shown && other.intersects(&moved, 0.0));
    if blocked {
        info!(target: "label", ?band, label = %moved.short_text(), "apex pull would overlap another label");
        return;
    }
    labels[pos] = moved;
}
