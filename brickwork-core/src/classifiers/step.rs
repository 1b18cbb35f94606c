use serde::Serialize;
use tracing::debug;

use crate::{
    classify::{
        CandidateId, ClassificationResult, Classifier, ClassifierRegistry, Label, ScoreDetails,
        ScoredCandidate, ScoringContext,
    },
    config::ClassifierConfig,
    elements::{Element, Step},
    error::BuildFailure,
};

use super::{build_nested, unexpected_details, unexpected_element};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepScore {
    pub value: u32,
    pub step_number: CandidateId,
    /// Parts-list candidates heading this step, preferred first.
    pub parts_lists: Vec<CandidateId>,
    pub number_score: f64,
    pub parts_list_score: f64,
}

impl StepScore {
    pub fn score(&self) -> f64 {
        0.8 * self.number_score + 0.2 * self.parts_list_score
    }
}

pub struct StepClassifier {
    config: ClassifierConfig,
}

impl StepClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }
}

impl Classifier for StepClassifier {
    fn output(&self) -> Label {
        Label::Step
    }

    fn requires(&self) -> &[Label] {
        &[Label::StepNumber, Label::PartsList]
    }

    fn score(&self, result: &ClassificationResult, _ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        let lists = result.candidates(Label::PartsList);

        result
            .candidates(Label::StepNumber)
            .into_iter()
            .filter_map(|number| {
                let ScoreDetails::StepNumber(number_details) = &number.details else {
                    return None;
                };
                // parts lists start above the step number they belong to
                let mut nearby: Vec<(f64, usize)> = lists
                    .iter()
                    .enumerate()
                    .filter(|(_, list)| list.bbox.y0 <= number.bbox.y0)
                    .map(|(rank, list)| (list.bbox.min_distance(&number.bbox), rank))
                    .filter(|(distance, _)| *distance <= self.config.step_parts_list_max_distance)
                    .collect();
                nearby.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
                let parts_lists: Vec<CandidateId> =
                    nearby.into_iter().map(|(_, rank)| lists[rank].id).collect();

                let bbox = parts_lists
                    .first()
                    .map(|id| number.bbox.union(&result.candidate(*id).bbox))
                    .unwrap_or(number.bbox);
                let details = StepScore {
                    value: number_details.value,
                    step_number: number.id,
                    parts_list_score: if parts_lists.is_empty() { 0.5 } else { 1f64 },
                    parts_lists,
                    number_score: number.score,
                };
                Some(ScoredCandidate::new(bbox, ScoreDetails::Step(details), vec![]))
            })
            .collect()
    }

    fn build(
        &self,
        id: CandidateId,
        result: &mut ClassificationResult,
        registry: &ClassifierRegistry,
    ) -> Result<Element, BuildFailure> {
        let ScoreDetails::Step(details) = &result.candidate(id).details else {
            return Err(unexpected_details(id, Label::Step));
        };
        let (number_id, list_ids) = (details.step_number, details.parts_lists.clone());

        let step_number = match build_nested(result, registry, id, number_id)? {
            Element::StepNumber(number) => number,
            other => return Err(unexpected_element(id, Label::Step, &other)),
        };

        // exploratory: a list that cannot be built here may still belong to another step
        let mut parts_list = None;
        for list_id in list_ids {
            if result.is_failed(list_id) {
                continue;
            }
            match result.build(list_id, registry) {
                Ok(Element::PartsList(list)) => {
                    parts_list = Some(list);
                    break;
                }
                Ok(_) => continue,
                Err(failure) => {
                    debug!(step = %id, "parts list rejected: {}", failure.reason);
                }
            }
        }

        let mut step = Step {
            bbox: step_number.bbox,
            step_number,
            parts_list,
            diagram: None,
            sub_assemblies: Vec::new(),
            arrows: Vec::new(),
            rotation_symbol: None,
        };
        step.refresh_bbox();
        Ok(Element::Step(step))
    }
}
