use serde::Serialize;

use crate::{
    classify::{
        hints::font_size_score, CandidateId, ClassificationResult, Classifier,
        ClassifierRegistry, Label, ScoreDetails, ScoredCandidate, ScoringContext,
    },
    config::ClassifierConfig,
    elements::{BagNumber, Element},
    error::BuildFailure,
};

use super::{text::parse_number, unexpected_details};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BagNumberScore {
    pub value: u32,
    pub text_score: f64,
    pub font_size_score: f64,
}

impl BagNumberScore {
    pub fn score(&self) -> f64 {
        0.5 * self.text_score + 0.5 * self.font_size_score
    }
}

pub struct BagNumberClassifier {
    config: ClassifierConfig,
}

impl BagNumberClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    fn min_font_size(&self, ctx: &ScoringContext) -> f64 {
        match ctx.hints.bag_number_font_size {
            Some(size) => (size * (1f64 - self.config.font_size_tolerance))
                .min(self.config.bag_number_min_font_size),
            None => self.config.bag_number_min_font_size,
        }
    }
}

impl Classifier for BagNumberClassifier {
    fn output(&self) -> Label {
        Label::BagNumber
    }

    fn requires(&self) -> &[Label] {
        &[]
    }

    fn score(&self, result: &ClassificationResult, ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        let min_font_size = self.min_font_size(ctx);
        result
            .active_blocks()
            .filter_map(|b| b.as_text())
            .filter(|t| t.font_size >= min_font_size)
            .filter_map(|t| {
                let value = parse_number(&t.text)?;
                let details = BagNumberScore {
                    value,
                    text_score: 1f64,
                    font_size_score: font_size_score(
                        t.font_size,
                        ctx.hints.bag_number_font_size,
                        self.config.font_size_tolerance,
                    ),
                };
                Some(ScoredCandidate::new(
                    t.bbox,
                    ScoreDetails::BagNumber(details),
                    vec![t.id],
                ))
            })
            .collect()
    }

    fn build(
        &self,
        id: CandidateId,
        result: &mut ClassificationResult,
        _registry: &ClassifierRegistry,
    ) -> Result<Element, BuildFailure> {
        let candidate = result.candidate(id);
        let ScoreDetails::BagNumber(details) = &candidate.details else {
            return Err(unexpected_details(id, Label::BagNumber));
        };
        Ok(Element::BagNumber(BagNumber {
            value: details.value,
            bbox: candidate.bbox,
        }))
    }
}
