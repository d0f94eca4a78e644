use rstar::{AABB, RTree, RTreeObject};

use super::label::Label;

/// Envelope for R-tree spatial indexing
#[derive(Debug, Clone, Copy, PartialEq)]
struct LabelEnvelope {
    aabb: AABB<[f32; 2]>,
    id: usize,
}

impl LabelEnvelope {
    fn of(label: &Label) -> Self {
        Self {
            aabb: AABB::from_corners([label.left_x(), label.top_y()], [label.right_x(), label.bottom_y()]),
            id: label.id,
        }
    }

    /// Touching edges do not count as a collision.
    fn overlaps(&self, other: &LabelEnvelope) -> bool {
        let (a_min, a_max) = (self.aabb.lower(), self.aabb.upper());
        let (b_min, b_max) = (other.aabb.lower(), other.aabb.upper());
        a_min[0] < b_max[0] && b_min[0] < a_max[0] && a_min[1] < b_max[1] && b_min[1] < a_max[1]
    }
}

impl RTreeObject for LabelEnvelope {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Spatial index over label boxes keyed by label id.
///
/// Callers must `remove` a label before changing its position and `insert`
/// it again afterwards; the index never looks at the label after the fact.
#[derive(Default)]
pub struct CollisionIndex {
    tree: RTree<LabelEnvelope>,
}

impl CollisionIndex {
    pub fn new(labels: &[Label]) -> Self {
        Self {
            tree: RTree::bulk_load(labels.iter().map(LabelEnvelope::of).collect()),
        }
    }

    pub fn insert(&mut self, label: &Label) {
        self.tree.insert(LabelEnvelope::of(label));
    }

    /// Returns false when the label was not indexed at its current position.
    pub fn remove(&mut self, label: &Label) -> bool {
        self.tree.remove(&LabelEnvelope::of(label)).is_some()
    }

    /// Ids of indexed labels overlapping `label`, excluding itself.
    pub fn collisions(&self, label: &Label) -> Vec<usize> {
        let probe = LabelEnvelope::of(label);
        let mut ids: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&probe.aabb)
            .filter(|candidate| candidate.id != label.id && probe.overlaps(candidate))
            .map(|candidate| candidate.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}
