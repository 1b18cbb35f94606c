use serde::Serialize;

use crate::{
    classify::{
        hints::font_size_score, CandidateId, ClassificationResult, Classifier,
        ClassifierRegistry, Label, ScoreDetails, ScoredCandidate, ScoringContext,
    },
    config::ClassifierConfig,
    elements::{Element, PageNumber},
    error::BuildFailure,
};

use super::{text::parse_number, unexpected_details};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageNumberScore {
    pub value: u32,
    /// 1 in a bottom corner, lower elsewhere in the bottom band.
    pub position_score: f64,
    pub font_size_score: f64,
    /// Whether the printed value is the page position in the document.
    pub matches_page_index: bool,
}

impl PageNumberScore {
    pub fn score(&self) -> f64 {
        let index_score = if self.matches_page_index { 1f64 } else { 0f64 };
        0.4 * self.position_score + 0.3 * self.font_size_score + 0.3 * index_score
    }
}

pub struct PageNumberClassifier {
    config: ClassifierConfig,
}

impl PageNumberClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }
}

impl Classifier for PageNumberClassifier {
    fn output(&self) -> Label {
        Label::PageNumber
    }

    fn requires(&self) -> &[Label] {
        &[]
    }

    fn score(&self, result: &ClassificationResult, ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        let page = result.page_bbox();
        let band_top = page.y1 - page.height() * self.config.page_number_band;
        let corner = page.width() * self.config.page_number_corner_band;

        result
            .active_blocks()
            .filter_map(|b| b.as_text())
            .filter(|t| t.bbox.y0 >= band_top)
            .filter_map(|t| {
                let value = parse_number(&t.text)?;
                let in_corner = t.bbox.x1 <= page.x0 + corner || t.bbox.x0 >= page.x1 - corner;
                let details = PageNumberScore {
                    value,
                    position_score: if in_corner { 1f64 } else { 0.4 },
                    font_size_score: font_size_score(
                        t.font_size,
                        ctx.hints.page_number_font_size,
                        self.config.font_size_tolerance,
                    ),
                    matches_page_index: value as usize == result.page_index(),
                };
                Some(ScoredCandidate::new(
                    t.bbox,
                    ScoreDetails::PageNumber(details),
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
        let ScoreDetails::PageNumber(details) = &candidate.details else {
            return Err(unexpected_details(id, Label::PageNumber));
        };
        Ok(Element::PageNumber(PageNumber {
            value: details.value,
            bbox: candidate.bbox,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classifiers::testing::{ctx, result_on, text},
        classify::DocumentHints,
        entities::BBox,
    };

    #[test]
    fn test_corner_number_matching_index_scores_best() {
        let result = result_on(
            7,
            vec![
                text(1, BBox::new(470.0, 680.0, 480.0, 690.0), "7", 10.0),
                text(2, BBox::new(240.0, 680.0, 250.0, 690.0), "8", 10.0),
                text(3, BBox::new(470.0, 100.0, 480.0, 110.0), "7", 10.0),
                text(4, BBox::new(10.0, 680.0, 40.0, 690.0), "page", 10.0),
            ],
        );
        let hints = DocumentHints::default();
        let scored = PageNumberClassifier::new(ClassifierConfig::default())
            .score(&result, &ctx(&hints));

        assert_eq!(scored.len(), 2);
        let corner = scored.iter().find(|s| s.source_blocks == vec![1]).unwrap();
        let middle = scored.iter().find(|s| s.source_blocks == vec![2]).unwrap();
        assert!((corner.score() - 0.85).abs() < 1e-9);
        assert!(corner.score() > middle.score());
    }
}
