use serde::Serialize;

use crate::{
    classify::{
        CandidateId, ClassificationResult, Classifier, ClassifierRegistry, Label, ScoreDetails,
        ScoredCandidate, ScoringContext,
    },
    config::ClassifierConfig,
    elements::{Diagram, Element},
    error::BuildFailure,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramScore {
    /// Image area over page area.
    pub area_ratio: f64,
}

impl DiagramScore {
    pub fn score(&self) -> f64 {
        (0.5 + 5f64 * self.area_ratio).min(1f64)
    }
}

pub struct DiagramClassifier {
    config: ClassifierConfig,
}

impl DiagramClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }
}

impl Classifier for DiagramClassifier {
    fn output(&self) -> Label {
        Label::Diagram
    }

    fn requires(&self) -> &[Label] {
        &[]
    }

    fn score(&self, result: &ClassificationResult, _ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        let page_area = result.page_bbox().area();
        if page_area <= 0f64 {
            return Vec::new();
        }
        result
            .active_blocks()
            .filter_map(|b| b.as_image())
            .map(|img| (img, img.bbox.area() / page_area))
            .filter(|(_, ratio)| *ratio >= self.config.diagram_min_area_ratio)
            .map(|(img, area_ratio)| {
                ScoredCandidate::new(
                    img.bbox,
                    ScoreDetails::Diagram(DiagramScore { area_ratio }),
                    vec![img.id],
                )
            })
            .collect()
    }

    fn build(
        &self,
        id: CandidateId,
        result: &mut ClassificationResult,
        _registry: &ClassifierRegistry,
    ) -> Result<Element, BuildFailure> {
        Ok(Element::Diagram(Diagram {
            bbox: result.candidate(id).bbox,
        }))
    }
}
