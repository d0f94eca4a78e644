//! Back-and-forth angular sweep for value-ordered label sets.
//!
//! Labels are ranked by value, largest first. Clockwise sweeps rotate each
//! label away from the larger labels ranked before it; a sweep that hits the
//! line-angle limit hands over to a counter-clockwise sweep that makes room
//! from the other end. Whatever still collides when the sweeps give up is cut
//! off, so the labels handed back never overlap.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::collision_index::CollisionIndex;
use super::geometry::point_on_circle;
use super::label::Label;
use super::placement::place_label_along_label_radius;
use super::types::PieContext;

const MAX_SWEEPS: usize = 10;
const ANGLE_INCREMENT: f32 = 0.5;
const MAX_ROTATION_STEPS: usize = 720;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug)]
struct SweepState {
    direction: Direction,
    sweep_count: usize,
    placed_all_labels: bool,
    barrier_angle: f32,
    frontier: Option<usize>,
    frontier_per_sweep: Vec<usize>,
    hit_max_angle_cw: bool,
    hit_max_angle_cc: bool,
    barrier_angle_exceeded: bool,
}

impl SweepState {
    fn keep_sweeping(&self) -> bool {
        if self.placed_all_labels {
            return false;
        }
        // a counter-clockwise sweep is always followed by a clockwise one
        if self.direction == Direction::Clockwise {
            return true;
        }
        if self.barrier_angle_exceeded || self.sweep_count > MAX_SWEEPS {
            return false;
        }
        if !self.hit_max_angle_cw || !self.hit_max_angle_cc {
            return true;
        }
        !self.last_two_frontiers_are_same()
    }

    fn last_two_frontiers_are_same(&self) -> bool {
        match self.frontier_per_sweep.as_slice() {
            [.., a, b] => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DescendingOutcome {
    pub outer: Vec<Label>,
    pub dropped: Vec<Label>,
    pub min_proportion: Option<f32>,
    pub sweeps: usize,
    pub skipped: bool,
}

pub struct DescendingOrderResolver {
    labels: Vec<Label>,
    rank: HashMap<usize, usize>,
    index: CollisionIndex,
    ctx: PieContext,
    max_line_angle: f32,
}

impl DescendingOrderResolver {
    /// Places every label on the label radius without lift-off or apex handling.
    /// Equal values keep their id order.
    pub fn new(mut labels: Vec<Label>, ctx: &PieContext, max_line_angle: f32) -> Self {
        let mut ctx = *ctx;
        ctx.has_top_label = false;
        ctx.has_bottom_label = false;
        labels.sort_by(|a, b| {
            b.fractional_value
                .total_cmp(&a.fractional_value)
                .then(a.id.cmp(&b.id))
        });
        let rank = labels.iter().enumerate().map(|(pos, label)| (label.id, pos)).collect();
        for label in labels.iter_mut() {
            label.is_top_apex = false;
            label.is_bottom_apex = false;
            place_label_along_label_radius(label, &ctx, 0.0);
        }
        let index = CollisionIndex::new(&labels);
        Self {
            labels,
            rank,
            index,
            ctx,
            max_line_angle,
        }
    }

    pub fn resolve(mut self) -> DescendingOutcome {
        if self.labels.is_empty() || self.colliding().is_empty() {
            info!(target: "label", "no collisions detected in initial layout, skipping descending sweep");
            return DescendingOutcome {
                outer: self.into_id_order(),
                dropped: Vec::new(),
                min_proportion: None,
                sweeps: 0,
                skipped: true,
            };
        }

        let state = self.sweep_until_complete();
        let sweeps = state.sweep_count;
        if state.placed_all_labels {
            return DescendingOutcome {
                outer: self.into_id_order(),
                dropped: Vec::new(),
                min_proportion: None,
                sweeps,
                skipped: false,
            };
        }

        let frontier = state.frontier.unwrap_or(0).min(self.labels.len());
        let cut = frontier.min(self.first_overlap());
        let mut dropped = self.labels.split_off(cut);
        dropped.sort_by_key(|label| label.id);
        let min_proportion = self
            .labels
            .iter()
            .map(|label| label.fractional_value)
            .min_by(f32::total_cmp);
        warn!(
            target: "label",
            dropped = dropped.len(),
            ?min_proportion,
            "descending sweep could not place every label"
        );
        DescendingOutcome {
            outer: self.into_id_order(),
            dropped,
            min_proportion,
            sweeps,
            skipped: false,
        }
    }

    fn into_id_order(self) -> Vec<Label> {
        let mut labels = self.labels;
        labels.sort_by_key(|label| label.id);
        labels
    }

    /// First rank that overlaps a larger label; every label ranked before it
    /// is clear of the others.
    fn first_overlap(&self) -> usize {
        (1..self.labels.len())
            .find(|&pos| {
                self.labels[..pos]
                    .iter()
                    .any(|larger| larger.intersects(&self.labels[pos], 0.0))
            })
            .unwrap_or(self.labels.len())
    }

    fn colliding(&self) -> Vec<usize> {
        (0..self.labels.len())
            .filter(|&pos| !self.index.collisions(&self.labels[pos]).is_empty())
            .collect()
    }

    fn collides_with_larger(&self, pos: usize) -> bool {
        self.index
            .collisions(&self.labels[pos])
            .iter()
            .any(|id| self.rank.get(id).is_some_and(|&other| other < pos))
    }

    fn collides_with_smaller(&self, pos: usize) -> bool {
        self.index
            .collisions(&self.labels[pos])
            .iter()
            .any(|id| self.rank.get(id).is_some_and(|&other| other > pos))
    }

    fn exceeds_line_angle(&self, pos: usize) -> bool {
        self.labels[pos].label_line_angle() > self.max_line_angle
    }

    fn move_label(&mut self, pos: usize, angle: f32) {
        let g = &self.ctx.geometry;
        let coord = point_on_circle(g.center, g.label_radius(), angle);
        self.index.remove(&self.labels[pos]);
        self.labels[pos].place_via_connector(coord);
        self.index.insert(&self.labels[pos]);
    }

    fn reset_label(&mut self, pos: usize) {
        self.index.remove(&self.labels[pos]);
        place_label_along_label_radius(&mut self.labels[pos], &self.ctx, 0.0);
        self.index.insert(&self.labels[pos]);
    }

    /// Only segments in the bottom-left quadrant can wrap around into the
    /// space already claimed by the first label.
    fn barrier_exceeded(&self, pos: usize, barrier_angle: f32) -> bool {
        let label = &self.labels[pos];
        if label.segment_quadrant() != 3 {
            return false;
        }
        let angle = label.label_angle();
        if barrier_angle >= 270.0 {
            angle >= barrier_angle
        } else {
            angle < 90.0 && angle >= barrier_angle
        }
    }

    fn sweep_until_complete(&mut self) -> SweepState {
        let mut state = SweepState {
            direction: Direction::Clockwise,
            sweep_count: 0,
            placed_all_labels: false,
            barrier_angle: self.labels[0].label_angle(),
            frontier: None,
            frontier_per_sweep: Vec::new(),
            hit_max_angle_cw: false,
            hit_max_angle_cc: false,
            barrier_angle_exceeded: false,
        };

        while state.keep_sweeping() {
            match state.direction {
                Direction::Clockwise => self.clockwise_sweep(&mut state),
                Direction::CounterClockwise => self.counter_clockwise_sweep(&mut state),
            }
        }
        state
    }

    fn clockwise_sweep(&mut self, state: &mut SweepState) {
        state.sweep_count += 1;
        info!(target: "label", sweep = state.sweep_count, "descending sweep starting clockwise");

        let largest = self
            .colliding()
            .into_iter()
            .max_by(|&a, &b| {
                self.labels[a]
                    .fractional_value
                    .total_cmp(&self.labels[b].fractional_value)
                    .then(b.cmp(&a))
            });
        state.frontier = largest;
        let start = largest.map_or(0, |pos| pos + 1);

        let mut terminated_early = false;
        for pos in start..self.labels.len() {
            let mut steps = 0;
            while steps < MAX_ROTATION_STEPS
                && self.collides_with_larger(pos)
                && !self.exceeds_line_angle(pos)
                && !self.barrier_exceeded(pos, state.barrier_angle)
            {
                let angle = self.labels[pos].label_angle() + ANGLE_INCREMENT;
                self.move_label(pos, angle);
                steps += 1;
            }
            if steps == MAX_ROTATION_STEPS {
                warn!(target: "label", label = %self.labels[pos].short_text(), "clockwise rotation hit step cap");
            }
            state.frontier = Some(pos);

            if self.exceeds_line_angle(pos) {
                debug!(target: "label", label = %self.labels[pos].short_text(), "max angle exceeded, terminating clockwise sweep");
                self.reset_label(pos);
                state.frontier_per_sweep.push(pos);
                state.hit_max_angle_cw = true;
                terminated_early = true;
                break;
            }
            if self.barrier_exceeded(pos, state.barrier_angle) {
                debug!(target: "label", label = %self.labels[pos].short_text(), "barrier angle exceeded, terminating clockwise sweep");
                self.reset_label(pos);
                state.frontier_per_sweep.push(pos);
                state.barrier_angle_exceeded = true;
                terminated_early = true;
                break;
            }
        }

        if terminated_early {
            state.direction = Direction::CounterClockwise;
        } else if self.colliding().is_empty() {
            state.placed_all_labels = true;
        } else {
            debug!(target: "label", sweep = state.sweep_count, "clockwise sweep left collisions behind");
            state.frontier = Some(self.labels.len());
            state.frontier_per_sweep.push(self.labels.len());
            state.direction = Direction::CounterClockwise;
        }
    }

    fn counter_clockwise_sweep(&mut self, state: &mut SweepState) {
        info!(target: "label", sweep = state.sweep_count, "descending sweep starting counter-clockwise");
        let from = state.frontier.unwrap_or(0).min(self.labels.len() - 1);
        for pos in (0..=from).rev() {
            let mut steps = 0;
            while steps < MAX_ROTATION_STEPS && self.collides_with_smaller(pos) && !self.exceeds_line_angle(pos) {
                let angle = self.labels[pos].label_angle() - ANGLE_INCREMENT;
                self.move_label(pos, angle);
                steps += 1;
            }
            if self.exceeds_line_angle(pos) {
                debug!(target: "label", label = %self.labels[pos].short_text(), "max angle exceeded, resetting label");
                self.reset_label(pos);
                state.hit_max_angle_cc = true;
            }
            if pos == 0 {
                state.barrier_angle = self.labels[pos].label_angle();
            }
        }
        state.direction = Direction::Clockwise;
    }
}
