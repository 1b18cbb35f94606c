use serde::Serialize;

use crate::{
    classify::{
        CandidateId, ClassificationResult, Classifier, ClassifierRegistry, Label, ScoreDetails,
        ScoredCandidate, ScoringContext,
    },
    config::ClassifierConfig,
    elements::{Divider, Element, Orientation},
    entities::BBox,
    error::BuildFailure,
};

use super::unexpected_details;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DividerScore {
    pub orientation: Orientation,
    pub thickness_score: f64,
    /// Length over the page extent along the same axis.
    pub span_ratio: f64,
}

impl DividerScore {
    pub fn score(&self) -> f64 {
        0.5 * self.thickness_score + 0.5 * self.span_ratio.min(1f64)
    }
}

pub struct DividerClassifier {
    config: ClassifierConfig,
}

impl DividerClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    fn details(&self, bbox: &BBox, page: &BBox) -> Option<DividerScore> {
        let (w, h) = bbox.size();
        let (orientation, thickness, span_ratio) = if w >= h {
            (Orientation::Horizontal, h, w / page.width())
        } else {
            (Orientation::Vertical, w, h / page.height())
        };
        if thickness > self.config.divider_max_thickness
            || !(span_ratio >= self.config.divider_min_span)
        {
            return None;
        }
        Some(DividerScore {
            orientation,
            thickness_score: 1f64 - 0.5 * thickness / self.config.divider_max_thickness,
            span_ratio,
        })
    }
}

impl Classifier for DividerClassifier {
    fn output(&self) -> Label {
        Label::Divider
    }

    fn requires(&self) -> &[Label] {
        &[]
    }

    fn score(&self, result: &ClassificationResult, _ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        let page = *result.page_bbox();
        result
            .active_blocks()
            .filter_map(|b| b.as_drawing())
            .filter_map(|d| {
                let details = self.details(&d.bbox, &page)?;
                Some(ScoredCandidate::new(
                    d.bbox,
                    ScoreDetails::Divider(details),
                    vec![d.id],
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
        let ScoreDetails::Divider(details) = &candidate.details else {
            return Err(unexpected_details(id, Label::Divider));
        };
        Ok(Element::Divider(Divider {
            orientation: details.orientation,
            bbox: candidate.bbox,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::testing::PAGE;

    #[test]
    fn test_thin_long_rules() {
        let classifier = DividerClassifier::new(ClassifierConfig::default());

        let vertical = classifier
            .details(&BBox::new(249.0, 20.0, 250.0, 680.0), &PAGE)
            .unwrap();
        assert_eq!(vertical.orientation, Orientation::Vertical);
        assert!(vertical.score() > 0.8);

        let horizontal = classifier
            .details(&BBox::new(10.0, 350.0, 490.0, 352.0), &PAGE)
            .unwrap();
        assert_eq!(horizontal.orientation, Orientation::Horizontal);

        // too short
        assert!(classifier
            .details(&BBox::new(10.0, 350.0, 100.0, 351.0), &PAGE)
            .is_none());
        // too thick
        assert!(classifier
            .details(&BBox::new(10.0, 350.0, 490.0, 360.0), &PAGE)
            .is_none());
    }
}
