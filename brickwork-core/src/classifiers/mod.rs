//! Scorers and builders for every [`Label`]. The heuristics are deliberately simple:
//! each one only has to honour the scoring contract (a deterministic confidence in
//! `[0, 1]` computed from blocks and lower-level candidates).

use crate::{
    classify::{CandidateId, ClassificationResult, Classifier, ClassifierRegistry, Label},
    config::ClassifierConfig,
    elements::Element,
    error::BuildFailure,
};

pub mod arrow;
pub mod bag_number;
pub mod diagram;
pub mod divider;
pub mod page;
pub mod page_number;
pub mod part;
pub mod part_count;
pub mod parts_list;
pub mod rotation;
pub mod step;
pub mod step_number;
pub mod sub_assembly;
pub mod text;

/// One classifier per label, rooted at [`Label::Page`].
pub fn default_classifiers(config: &ClassifierConfig) -> Vec<Box<dyn Classifier>> {
    vec![
        Box::new(page_number::PageNumberClassifier::new(config.clone())),
        Box::new(step_number::StepNumberClassifier::new(config.clone())),
        Box::new(part_count::PartCountClassifier::new(config.clone())),
        Box::new(bag_number::BagNumberClassifier::new(config.clone())),
        Box::new(part::PartClassifier::new(config.clone())),
        Box::new(parts_list::PartsListClassifier),
        Box::new(diagram::DiagramClassifier::new(config.clone())),
        Box::new(sub_assembly::SubAssemblyClassifier),
        Box::new(rotation::RotationSymbolClassifier::new(config.clone())),
        Box::new(arrow::ArrowClassifier::new(config.clone())),
        Box::new(divider::DividerClassifier::new(config.clone())),
        Box::new(step::StepClassifier::new(config.clone())),
        Box::new(page::PageClassifier::new(config.clone())),
    ]
}

pub(crate) fn unexpected_details(id: CandidateId, label: Label) -> BuildFailure {
    BuildFailure::new(id, label, "candidate carries the score details of another label")
}

pub(crate) fn unexpected_element(id: CandidateId, label: Label, element: &Element) -> BuildFailure {
    BuildFailure::new(
        id,
        label,
        format!("nested build returned a {} element", element.label()),
    )
}

/// Builds `child` on behalf of `parent`, attributing a failure to the parent.
pub(crate) fn build_nested(
    result: &mut ClassificationResult,
    registry: &ClassifierRegistry,
    parent: CandidateId,
    child: CandidateId,
) -> Result<Element, BuildFailure> {
    let parent_label = result.candidate(parent).label;
    result
        .build(child, registry)
        .map_err(|failure| failure.nested(parent, parent_label))
}

/// Builds the best active candidate of `label` that succeeds, recording the failures of
/// the ones tried before it.
pub(crate) fn build_best(
    result: &mut ClassificationResult,
    registry: &ClassifierRegistry,
    label: Label,
) -> Option<Element> {
    let ids: Vec<CandidateId> = result
        .candidates(label)
        .into_iter()
        .filter(|c| c.is_active())
        .map(|c| c.id)
        .collect();
    for id in ids {
        if !result.candidate(id).is_active() {
            continue;
        }
        match result.build(id, registry) {
            Ok(element) => return Some(element),
            Err(failure) => {
                result.mark_failed(id, failure.reason);
            }
        }
    }
    None
}

/// Builds every candidate of `label` that is still active, best first, and records the
/// failures. Returns the built elements in that order.
pub(crate) fn build_active(
    result: &mut ClassificationResult,
    registry: &ClassifierRegistry,
    label: Label,
) -> Vec<Element> {
    let ids: Vec<CandidateId> = result
        .candidates(label)
        .into_iter()
        .filter(|c| c.is_active())
        .map(|c| c.id)
        .collect();
    let mut elements = Vec::with_capacity(ids.len());
    for id in ids {
        if !result.candidate(id).is_active() {
            continue;
        }
        match result.build(id, registry) {
            Ok(element) => elements.push(element),
            Err(failure) => {
                result.mark_failed(id, failure.reason);
            }
        }
    }
    elements
}
