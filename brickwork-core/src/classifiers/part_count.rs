use serde::Serialize;

use crate::{
    classify::{
        hints::font_size_score, CandidateId, ClassificationResult, Classifier,
        ClassifierRegistry, Label, ScoreDetails, ScoredCandidate, ScoringContext,
    },
    config::ClassifierConfig,
    elements::{Element, PartCount},
    error::BuildFailure,
};

use super::{text::parse_count, unexpected_details};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartCountScore {
    pub count: u32,
    pub text_score: f64,
    pub font_size_score: f64,
}

impl PartCountScore {
    pub fn score(&self) -> f64 {
        0.6 * self.text_score + 0.4 * self.font_size_score
    }
}

pub struct PartCountClassifier {
    config: ClassifierConfig,
}

impl PartCountClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }
}

impl Classifier for PartCountClassifier {
    fn output(&self) -> Label {
        Label::PartCount
    }

    fn requires(&self) -> &[Label] {
        &[]
    }

    fn score(&self, result: &ClassificationResult, ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        result
            .active_blocks()
            .filter_map(|b| b.as_text())
            .filter_map(|t| {
                let count = parse_count(&t.text)?;
                if count > self.config.part_count_max {
                    return None;
                }
                let details = PartCountScore {
                    count,
                    text_score: 1f64,
                    font_size_score: font_size_score(
                        t.font_size,
                        ctx.hints.part_count_font_size,
                        self.config.font_size_tolerance,
                    ),
                };
                Some(ScoredCandidate::new(
                    t.bbox,
                    ScoreDetails::PartCount(details),
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
        let ScoreDetails::PartCount(details) = &candidate.details else {
            return Err(unexpected_details(id, Label::PartCount));
        };
        Ok(Element::PartCount(PartCount {
            count: details.count,
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
    fn test_count_markers() {
        let result = result(vec![
            text(1, BBox::new(20.0, 100.0, 30.0, 108.0), "2x", 8.0),
            text(2, BBox::new(40.0, 100.0, 50.0, 108.0), "x12", 8.0),
            text(3, BBox::new(60.0, 100.0, 70.0, 108.0), "150x", 8.0),
            text(4, BBox::new(80.0, 100.0, 90.0, 108.0), "3", 8.0),
        ]);
        let hints = DocumentHints {
            part_count_font_size: Some(8.0),
            ..Default::default()
        };
        let scored =
            PartCountClassifier::new(ClassifierConfig::default()).score(&result, &ctx(&hints));
        let counts: Vec<(u32, f64)> = scored
            .iter()
            .map(|s| match &s.details {
                ScoreDetails::PartCount(d) => (d.count, s.score()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(counts, vec![(2, 1.0), (12, 1.0)]);
    }
}
