//! Retry loop around the hemisphere sweeps: every failed attempt applies one
//! remedy to the master label set and starts over from its positions.

use tracing::{debug, error, info, warn};

use crate::config::{LayoutConfig, TieBreak};

use super::cluster::initial_cluster_spacing;
use super::error::LayoutInterrupt;
use super::label::{Hemisphere, Label};
use super::placement::{Band, lift_band};
use super::sweep::{SweepSettings, sorted_hemisphere, two_phase_adjustment};
use super::types::{Diagnostics, PieContext};

const REMOVALS_PER_ANGLE_INCREASE: usize = 10;

#[derive(Debug, Clone)]
pub struct Resolution {
    /// Shown outer labels in id order.
    pub outer: Vec<Label>,
    pub inner: Vec<Label>,
    pub removed: Vec<Label>,
    pub max_line_angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Remedy {
    LiftTop,
    LiftBottom,
    RemoveLabel,
    IncreaseMaxAngle,
    Exhausted,
}

struct Attempt {
    outer: Vec<Label>,
    inner: Vec<Label>,
    relocated: usize,
}

/// Runs the two-phase resolution with escalating remedies until an attempt
/// succeeds or no remedy is left.
pub fn resolve_collisions(
    mut master: Vec<Label>,
    ctx: &mut PieContext,
    config: &LayoutConfig,
    diagnostics: &mut Diagnostics,
) -> Resolution {
    let options = &config.labels;
    let mut max_line_angle = options.max_line_angle;
    let ceiling = options.max_line_angle_ceiling.max(max_line_angle);
    let mut removed = Vec::new();

    master.sort_by_key(|label| label.id);
    if master.len() <= 1 {
        return Resolution {
            outer: master,
            inner: Vec::new(),
            removed,
            max_line_angle,
        };
    }

    let mut removal_order: Vec<usize> = {
        let mut order: Vec<&Label> = master.iter().collect();
        order.sort_by(|a, b| a.value.total_cmp(&b.value).then(b.id.cmp(&a.id)));
        order.into_iter().map(|label| label.id).collect()
    };

    let max_iterations = config.max_resolution_iterations.max(1);
    for iteration in 0..max_iterations {
        diagnostics.resolution_iterations = iteration + 1;
        info!(target: "label", iteration, labels = master.len(), "collision iteration started");

        let interrupt = match run_attempt(&master, ctx, config, max_line_angle) {
            Ok(attempt) => {
                diagnostics.inner_relocations = attempt.relocated;
                return Resolution {
                    outer: attempt.outer,
                    inner: attempt.inner,
                    removed,
                    max_line_angle,
                };
            }
            Err(interrupt) => interrupt,
        };

        warn!(target: "label", label_id = interrupt.label_id(), %interrupt, "collision iteration failed");
        let offending = master.iter().find(|label| label.id == interrupt.label_id());
        let in_top_half = offending.is_some_and(Label::in_top_half);
        let in_bottom_half = offending.is_some_and(Label::in_bottom_half);
        let can_increase = max_line_angle < ceiling;

        let remedy = if in_top_half && !ctx.top_is_lifted {
            Remedy::LiftTop
        } else if in_bottom_half && !ctx.bottom_is_lifted {
            Remedy::LiftBottom
        } else if master.len() > 1
            && !removal_order.is_empty()
            && (!can_increase
                || diagnostics.removed_labels < (diagnostics.angle_increases + 1) * REMOVALS_PER_ANGLE_INCREASE)
        {
            Remedy::RemoveLabel
        } else if can_increase {
            Remedy::IncreaseMaxAngle
        } else {
            Remedy::Exhausted
        };
        debug!(target: "label", ?remedy, "applying remedy");

        match remedy {
            Remedy::LiftTop => {
                info!(target: "label", "lifting top labels before next iteration");
                lift_band(&mut master, ctx, Band::Top);
                diagnostics.top_lifts += 1;
            }
            Remedy::LiftBottom => {
                info!(target: "label", "lifting bottom labels before next iteration");
                lift_band(&mut master, ctx, Band::Bottom);
                diagnostics.bottom_lifts += 1;
            }
            Remedy::RemoveLabel => {
                let id_to_remove = match options.unordered_tie_break {
                    TieBreak::Ordered => removal_order.remove(0),
                    TieBreak::Best => {
                        let target = interrupt.label_id();
                        let chosen = master
                            .iter()
                            .min_by(|a, b| {
                                a.value
                                    .total_cmp(&b.value)
                                    .then(a.id.abs_diff(target).cmp(&b.id.abs_diff(target)))
                            })
                            .map_or(removal_order[0], |label| label.id);
                        removal_order.retain(|&id| id != chosen);
                        chosen
                    }
                };
                if let Some(pos) = master.iter().position(|label| label.id == id_to_remove) {
                    let mut label = master.remove(pos);
                    debug!(target: "label", label = %label.short_text(), quadrant = label.segment_quadrant(), "removing label");
                    label.label_shown = false;
                    removed.push(label);
                }
                diagnostics.removed_labels += 1;
            }
            Remedy::IncreaseMaxAngle => {
                max_line_angle = (max_line_angle + options.max_line_angle_increment).min(ceiling);
                diagnostics.angle_increases += 1;
                info!(target: "label", max_line_angle, "increased max line angle");
            }
            Remedy::Exhausted => {
                error!(target: "label", max_line_angle, ceiling, "collision resolution failed: no remedy left");
                diagnostics.error = Some(format!("collision resolution exhausted every remedy: {interrupt}"));
                break;
            }
        }

        if iteration + 1 == max_iterations {
            error!(target: "label", max_iterations, "collision resolution hit the iteration cap");
            diagnostics.error = Some(format!("collision resolution stopped after {max_iterations} iterations"));
        }
    }

    Resolution {
        outer: master,
        inner: Vec::new(),
        removed,
        max_line_angle,
    }
}

fn run_attempt(
    master: &[Label],
    ctx: &PieContext,
    config: &LayoutConfig,
    max_line_angle: f32,
) -> Result<Attempt, LayoutInterrupt> {
    let mut labels = master.to_vec();
    let mut inner = Vec::new();
    let left = sorted_hemisphere(&labels, Hemisphere::Left);
    let right = sorted_hemisphere(&labels, Hemisphere::Right);

    let inner_labels = config.labels.inner_labels && ctx.geometry.inner_radius > 0.0;
    if config.stages.initial_cluster_spacing && !inner_labels {
        initial_cluster_spacing(&mut labels, &left, ctx, max_line_angle);
        initial_cluster_spacing(&mut labels, &right, ctx, max_line_angle);
    }

    let settings = SweepSettings {
        max_line_angle,
        inner_labels,
        stages: &config.stages,
    };
    let mut relocated = two_phase_adjustment(&mut labels, &left, &mut inner, Hemisphere::Left, ctx, &settings)?;
    relocated += two_phase_adjustment(&mut labels, &right, &mut inner, Hemisphere::Right, ctx, &settings)?;

    labels.retain(|label| label.label_shown);
    Ok(Attempt {
        outer: labels,
        inner,
        relocated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::label::find_intersecting_labels;
    use crate::layout::label::tests::sample_label;
    use crate::layout::placement::place_label_along_label_radius;
    use crate::layout::types::PieGeometry;

    fn context() -> PieContext {
        let geometry = PieGeometry {
            center: (250.0, 250.0),
            outer_radius: 100.0,
            inner_radius: 0.0,
            label_offset: 20.0,
            max_vertical_offset: 50.0,
            canvas_width: 500.0,
            canvas_height: 500.0,
        };
        let mut ctx = PieContext::new(geometry, 30.0, 1.0);
        ctx.max_font_size = 12.0;
        ctx
    }

    fn placed(angles: &[f32], ctx: &PieContext) -> Vec<Label> {
        angles
            .iter()
            .enumerate()
            .map(|(id, &angle)| {
                let mut label = sample_label(id, angle);
                label.value = 10.0 - id as f32;
                place_label_along_label_radius(&mut label, ctx, 0.0);
                label
            })
            .collect()
    }

    #[test]
    fn spread_labels_resolve_first_time() {
        let mut ctx = context();
        let labels = placed(&[30.0, 150.0, 210.0, 330.0], &ctx);
        let mut diagnostics = Diagnostics::default();
        let resolution = resolve_collisions(labels, &mut ctx, &LayoutConfig::default(), &mut diagnostics);
        assert_eq!(resolution.outer.len(), 4);
        assert!(resolution.removed.is_empty());
        assert_eq!(diagnostics.resolution_iterations, 1);
        assert!(diagnostics.error.is_none());
    }

    #[test]
    fn impossible_angle_forces_removals() {
        let mut ctx = context();
        let labels = placed(&[20.0, 21.0, 22.0, 23.0], &ctx);
        let mut config = LayoutConfig::default();
        config.labels.max_line_angle = 0.5;
        config.labels.max_line_angle_ceiling = 0.5;
        config.stages.initial_cluster_spacing = false;
        let mut diagnostics = Diagnostics::default();
        let resolution = resolve_collisions(labels, &mut ctx, &config, &mut diagnostics);
        assert!(!resolution.removed.is_empty());
        assert_eq!(resolution.outer.len() + resolution.removed.len(), 4);
        assert_eq!(diagnostics.removed_labels, resolution.removed.len());
        // the smallest value goes first
        assert_eq!(resolution.removed[0].id, 3);
        if diagnostics.error.is_none() {
            let all: Vec<usize> = (0..resolution.outer.len()).collect();
            assert!(find_intersecting_labels(&resolution.outer, &all).is_empty());
        }
    }

    #[test]
    fn iteration_cap_is_reported() {
        let mut ctx = context();
        let labels = placed(&[20.0, 21.0, 22.0, 23.0], &ctx);
        let mut config = LayoutConfig::default();
        config.labels.max_line_angle = 0.5;
        config.labels.max_line_angle_ceiling = 0.5;
        config.max_resolution_iterations = 1;
        let mut diagnostics = Diagnostics::default();
        let resolution = resolve_collisions(labels, &mut ctx, &config, &mut diagnostics);
        assert_eq!(diagnostics.resolution_iterations, 1);
        assert!(diagnostics.error.is_some());
        assert_eq!(resolution.outer.len() + resolution.removed.len(), 4);
    }
}
