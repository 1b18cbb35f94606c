use serde::Serialize;

use crate::{
    classify::{
        CandidateId, ClassificationResult, Classifier, ClassifierRegistry, Label, ScoreDetails,
        ScoredCandidate, ScoringContext,
    },
    elements::{Element, SubAssembly},
    error::BuildFailure,
};

use super::{
    parts_list::{contained, frame_score},
    unexpected_details,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubAssemblyScore {
    /// Diagram candidates inside the box, in reading order.
    pub diagrams: Vec<CandidateId>,
    /// Best part count inside the box: how many copies of the sub-assembly to build.
    pub count: Option<CandidateId>,
    pub box_score: f64,
}

impl SubAssemblyScore {
    pub fn score(&self) -> f64 {
        let fill = self.diagrams.len().min(2) as f64 / 2f64;
        0.6 * self.box_score + 0.4 * fill
    }
}

pub struct SubAssemblyClassifier;

impl Classifier for SubAssemblyClassifier {
    fn output(&self) -> Label {
        Label::SubAssembly
    }

    fn requires(&self) -> &[Label] {
        &[Label::Diagram, Label::PartCount]
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
                // a frame drawn exactly around one image is that image's border
                let diagrams: Vec<CandidateId> =
                    contained(&d.bbox, result.candidates(Label::Diagram))
                        .into_iter()
                        .filter(|id| !result.candidate(*id).bbox.similar(&d.bbox, 2.0))
                        .collect();
                if diagrams.is_empty() {
                    return None;
                }
                let count = contained(&d.bbox, result.candidates(Label::PartCount))
                    .into_iter()
                    .min_by(|a, b| result.candidate(*a).rank_cmp(result.candidate(*b)));
                Some(ScoredCandidate::new(
                    d.bbox,
                    ScoreDetails::SubAssembly(SubAssemblyScore {
                        diagrams,
                        count,
                        box_score,
                    }),
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
        let ScoreDetails::SubAssembly(details) = &candidate.details else {
            return Err(unexpected_details(id, Label::SubAssembly));
        };
        let (bbox, diagram_ids, count_id) =
            (candidate.bbox, details.diagrams.clone(), details.count);

        let mut diagrams = Vec::with_capacity(diagram_ids.len());
        for diagram_id in diagram_ids {
            if result.is_failed(diagram_id) {
                continue;
            }
            match result.build(diagram_id, registry) {
                Ok(Element::Diagram(diagram)) => diagrams.push(diagram),
                Ok(_) => continue,
                Err(failure) => {
                    result.mark_failed(diagram_id, failure.reason);
                }
            }
        }
        if diagrams.is_empty() {
            return Err(BuildFailure::new(
                id,
                Label::SubAssembly,
                "no diagram could be built",
            ));
        }

        let count = match count_id {
            Some(count_id) if !result.is_failed(count_id) => {
                match result.build(count_id, registry) {
                    Ok(Element::PartCount(count)) => Some(count),
                    Ok(_) => None,
                    Err(failure) => {
                        result.mark_failed(count_id, failure.reason);
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(Element::SubAssembly(SubAssembly {
            diagrams,
            count,
            bbox,
        }))
    }
}
