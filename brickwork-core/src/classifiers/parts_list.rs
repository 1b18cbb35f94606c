use serde::Serialize;

use crate::{
    blocks::DrawingBlock,
    classify::{
        Candidate, CandidateId, ClassificationResult, Classifier, ClassifierRegistry, Label,
        ScoreDetails, ScoredCandidate, ScoringContext,
    },
    elements::{Element, PartsList},
    entities::BBox,
    error::BuildFailure,
};

use super::unexpected_details;

/// Containment slack for children drawn on the box outline.
const BOX_MARGIN: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartsListScore {
    /// Part candidates inside the box, in reading order.
    pub parts: Vec<CandidateId>,
    pub box_score: f64,
}

impl PartsListScore {
    pub fn score(&self) -> f64 {
        let fill = self.parts.len().min(3) as f64 / 3f64;
        0.5 * self.box_score + 0.5 * fill
    }
}

/// Score of a drawing as the frame of a box-like element, 0 when it is no frame at all.
pub(crate) fn frame_score(drawing: &DrawingBlock) -> f64 {
    if drawing.has_rect() {
        1f64
    } else if drawing.line_vertices().len() >= 4 {
        0.6
    } else {
        0f64
    }
}

/// Candidates whose bbox lies inside `frame`, in reading order.
pub(crate) fn contained(frame: &BBox, candidates: Vec<&Candidate>) -> Vec<CandidateId> {
    let outer = frame.expand(BOX_MARGIN).unwrap_or(*frame);
    let mut inside: Vec<&Candidate> = candidates
        .into_iter()
        .filter(|c| outer.contains(&c.bbox))
        .collect();
    inside.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then_with(|| a.bbox.x0.total_cmp(&b.bbox.x0))
            .then_with(|| a.id.cmp(&b.id))
    });
    inside.into_iter().map(|c| c.id).collect()
}

pub struct PartsListClassifier;

impl Classifier for PartsListClassifier {
    fn output(&self) -> Label {
        Label::PartsList
    }

    fn requires(&self) -> &[Label] {
        &[Label::Part]
    }

    fn score(&self, result: &ClassificationResult, _ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        result
            .active_blocks()
            .filter_map(|b| b.as_drawing())
            .filter_map(|d| {
                let box_score = frame_score(d);
                if box_score == 0f64 {
                    return None;
                }
                let parts = contained(&d.bbox, result.candidates(Label::Part));
                if parts.is_empty() {
                    return None;
                }
                Some(ScoredCandidate::new(
                    d.bbox,
                    ScoreDetails::PartsList(PartsListScore { parts, box_score }),
                    vec![d.id],
                ))
            })
            .collect()
    }

    fn build(
        &self,
        id: CandidateId,
        result: &mut ClassificationResult,
        registry: &ClassifierRegistry,
    ) -> Result<Element, BuildFailure> {
        let candidate = result.candidate(id);
        let ScoreDetails::PartsList(details) = &candidate.details else {
            return Err(unexpected_details(id, Label::PartsList));
        };
        let (bbox, part_ids) = (candidate.bbox, details.parts.clone());

        let mut parts = Vec::with_capacity(part_ids.len());
        for part_id in part_ids {
            if result.is_failed(part_id) {
                continue;
            }
            match result.build(part_id, registry) {
                Ok(Element::Part(part)) => parts.push(part),
                Ok(_) => continue,
                Err(failure) => {
                    result.mark_failed(part_id, failure.reason);
                }
            }
        }
        if parts.is_empty() {
            return Err(BuildFailure::new(id, Label::PartsList, "no part could be built"));
        }
        Ok(Element::PartsList(PartsList { parts, bbox }))
    }
}
