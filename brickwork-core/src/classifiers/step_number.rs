use serde::Serialize;

use crate::{
    classify::{
        hints::font_size_score, CandidateId, ClassificationResult, Classifier,
        ClassifierRegistry, Label, ScoreDetails, ScoredCandidate, ScoringContext,
    },
    config::ClassifierConfig,
    elements::{Element, StepNumber},
    error::BuildFailure,
};

use super::{text::parse_number, unexpected_details};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepNumberScore {
    pub value: u32,
    pub text_score: f64,
    pub font_size_score: f64,
}

impl StepNumberScore {
    pub fn score(&self) -> f64 {
        0.5 * self.text_score + 0.5 * self.font_size_score
    }
}

pub struct StepNumberClassifier {
    config: ClassifierConfig,
}

impl StepNumberClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }
}

impl Classifier for StepNumberClassifier {
    fn output(&self) -> Label {
        Label::StepNumber
    }

    fn requires(&self) -> &[Label] {
        &[]
    }

    fn score(&self, result: &ClassificationResult, ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        let page = result.page_bbox();
        let band_top = page.y1 - page.height() * self.config.page_number_band;

        result
            .active_blocks()
            .filter_map(|b| b.as_text())
            .filter_map(|t| {
                let value = parse_number(&t.text)?;
                if value > self.config.step_number_max_value {
                    return None;
                }
                // numbers in the footer or no bigger than the part counts are rarely steps
                let text_score = if t.bbox.y0 >= band_top {
                    0.3
                } else if ctx
                    .hints
                    .part_count_font_size
                    .is_some_and(|size| t.font_size <= size)
                {
                    0.2
                } else {
                    1f64
                };
                let details = StepNumberScore {
                    value,
                    text_score,
                    font_size_score: font_size_score(
                        t.font_size,
                        ctx.hints.step_number_font_size,
                        self.config.font_size_tolerance,
                    ),
                };
                Some(ScoredCandidate::new(
                    t.bbox,
                    ScoreDetails::StepNumber(details),
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
        let ScoreDetails::StepNumber(details) = &candidate.details else {
            return Err(unexpected_details(id, Label::StepNumber));
        };
        Ok(Element::StepNumber(StepNumber {
            value: details.value,
            bbox: candidate.bbox,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classifiers::testing::{ctx, result, text},
        classify::DocumentHints,
        entities::BBox,
    };

    #[test]
    fn test_hinted_size_ranks_first() {
        let result = result(vec![
            text(1, BBox::new(20.0, 100.0, 40.0, 124.0), "4", 24.0),
            text(2, BBox::new(20.0, 300.0, 30.0, 308.0), "5", 8.0),
            text(3, BBox::new(20.0, 400.0, 40.0, 424.0), "1000", 24.0),
            text(4, BBox::new(20.0, 690.0, 40.0, 699.0), "12", 24.0),
        ]);
        let hints = DocumentHints {
            step_number_font_size: Some(24.0),
            part_count_font_size: Some(8.0),
            ..Default::default()
        };
        let scored = StepNumberClassifier::new(ClassifierConfig::default())
            .score(&result, &ctx(&hints));
        let scores: Vec<(Vec<u32>, f64)> = scored
            .iter()
            .map(|s| (s.source_blocks.clone(), s.score()))
            .collect();

        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0], (vec![1], 1.0));
        // small number, same size as the part counts
        assert!(scores[1].1 < 0.2);
        // footer
        assert!((scores[2].1 - 0.65).abs() < 1e-9);
    }
}
