use crate::{
    classify::{candidate::CandidateId, Label},
    entities::BlockId,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("union of an empty set of boxes")]
    EmptyUnion,

    #[error("box would be inverted: ({x0}, {y0}, {x1}, {y1})")]
    Inverted { x0: f64, y0: f64, x1: f64, y1: f64 },

    #[error("scale factor must be positive, got {0}")]
    NonPositiveScale(f64),
}

/// Setup and data errors. These abort the pipeline or page they occur in and are never
/// turned into candidate state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassificationError {
    #[error("two classifiers produce the label {0}")]
    DuplicateClassifier(Label),

    #[error("classifier for {classifier} requires {required}, which no classifier produces")]
    MissingDependency { classifier: Label, required: Label },

    #[error("classifier dependency cycle between {0:?}")]
    DependencyCycle(Vec<Label>),

    #[error("root label {0} has no registered classifier")]
    MissingRoot(Label),

    #[error("block id {block} appears more than once on page {page_index}")]
    DuplicateBlockId { page_index: usize, block: BlockId },

    #[error("block {block} on page {page_index} has an invalid bbox")]
    InvalidBlockBBox { page_index: usize, block: BlockId },

    #[error("{label} candidate references block {block}, which is not on the page")]
    UnknownBlock { label: Label, block: BlockId },

    #[error("{label} candidate references block {block}, which was removed")]
    RemovedBlock { label: Label, block: BlockId },

    #[error("classifier for {classifier} produced a {produced} candidate")]
    LabelMismatch { classifier: Label, produced: Label },
}

/// Expected, recoverable failure of a single candidate build.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{label} candidate {candidate} failed: {reason}")]
pub struct BuildFailure {
    pub candidate: CandidateId,
    pub label: Label,
    pub reason: String,
}

impl BuildFailure {
    pub fn new(candidate: CandidateId, label: Label, reason: impl Into<String>) -> Self {
        Self {
            candidate,
            label,
            reason: reason.into(),
        }
    }

    /// Re-attributes a failed nested build to the parent candidate that needed it.
    pub fn nested(self, parent: CandidateId, parent_label: Label) -> Self {
        Self {
            candidate: parent,
            label: parent_label,
            reason: format!(
                "nested {} candidate {} failed: {}",
                self.label, self.candidate, self.reason
            ),
        }
    }
}
