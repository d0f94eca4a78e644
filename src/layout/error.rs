use thiserror::Error;

/// Conditions that abort a single resolution attempt.
///
/// These never escape the layout entry point: the resolution loop picks a
/// remedy for each and retries from the last good label positions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutInterrupt {
    #[error("label {label_id} collides with a neighbour: {description}")]
    LabelCollision { label_id: usize, description: String },
    #[error("label {label_id} exceeds the line angle threshold: {description}")]
    AngleThresholdExceeded { label_id: usize, description: String },
    #[error("label {label_id} was pushed off the canvas: {description}")]
    LabelPushedOffCanvas { label_id: usize, description: String },
    #[error("label {label_id} cannot move to the inner ring: {description}")]
    CannotRelocateToInnerRing { label_id: usize, description: String },
}

impl LayoutInterrupt {
    pub fn collision(label_id: usize, description: impl Into<String>) -> Self {
        Self::LabelCollision {
            label_id,
            description: description.into(),
        }
    }

    pub fn angle_exceeded(label_id: usize, description: impl Into<String>) -> Self {
        Self::AngleThresholdExceeded {
            label_id,
            description: description.into(),
        }
    }

    pub fn pushed_off_canvas(label_id: usize, description: impl Into<String>) -> Self {
        Self::LabelPushedOffCanvas {
            label_id,
            description: description.into(),
        }
    }

    pub fn inner_ring(label_id: usize, description: impl Into<String>) -> Self {
        Self::CannotRelocateToInnerRing {
            label_id,
            description: description.into(),
        }
    }

    pub fn label_id(&self) -> usize {
        match self {
            Self::LabelCollision { label_id, .. }
            | Self::AngleThresholdExceeded { label_id, .. }
            | Self::LabelPushedOffCanvas { label_id, .. }
            | Self::CannotRelocateToInnerRing { label_id, .. } => *label_id,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::LabelCollision { description, .. }
            | Self::AngleThresholdExceeded { description, .. }
            | Self::LabelPushedOffCanvas { description, .. }
            | Self::CannotRelocateToInnerRing { description, .. } => description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupts_expose_label_and_message() {
        let err = LayoutInterrupt::pushed_off_canvas(4, "hit the top apex");
        assert_eq!(err.label_id(), 4);
        assert_eq!(err.description(), "hit the top apex");
        assert_eq!(
            err.to_string(),
            "label 4 was pushed off the canvas: hit the top apex"
        );
    }
}
