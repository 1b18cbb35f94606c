use serde::Serialize;

use crate::{
    classify::{
        CandidateId, ClassificationResult, Classifier, ClassifierRegistry, Label, ScoreDetails,
        ScoredCandidate, ScoringContext,
    },
    config::ClassifierConfig,
    elements::{Element, RotationSymbol},
    entities::BBox,
    error::BuildFailure,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationSymbolScore {
    pub size_score: f64,
    /// 1 for a perfect square.
    pub squareness: f64,
}

impl RotationSymbolScore {
    pub fn score(&self) -> f64 {
        0.7 * (0.4 * self.size_score + 0.6 * self.squareness)
    }
}

pub struct RotationSymbolClassifier {
    config: ClassifierConfig,
}

impl RotationSymbolClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    fn details(&self, bbox: &BBox) -> Option<RotationSymbolScore> {
        let (min, max) = (
            self.config.rotation_symbol_min_size,
            self.config.rotation_symbol_max_size,
        );
        let (w, h) = bbox.size();
        if w < min || h < min || w > max || h > max {
            return None;
        }
        let squareness = 1f64 - (w - h).abs() / w.max(h);
        if squareness < 1f64 - self.config.rotation_symbol_squareness_tolerance {
            return None;
        }
        // sizes in the middle of the range are the most typical
        let mid = (min + max) / 2f64;
        let size_score = 1f64 - 0.5 * ((w.max(h) - mid).abs() / (max - mid).max(f64::EPSILON));
        Some(RotationSymbolScore {
            size_score: size_score.clamp(0f64, 1f64),
            squareness,
        })
    }
}

impl Classifier for RotationSymbolClassifier {
    fn output(&self) -> Label {
        Label::RotationSymbol
    }

    fn requires(&self) -> &[Label] {
        &[]
    }

    fn score(&self, result: &ClassificationResult, _ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        result
            .active_blocks()
            .filter_map(|b| b.as_image())
            .filter_map(|img| {
                let details = self.details(&img.bbox)?;
                Some(ScoredCandidate::new(
                    img.bbox,
                    ScoreDetails::RotationSymbol(details),
                    vec![img.id],
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
        Ok(Element::RotationSymbol(RotationSymbol {
            bbox: result.candidate(id).bbox,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_in_range() {
        let classifier = RotationSymbolClassifier::new(ClassifierConfig::default());
        let square = classifier
            .details(&BBox::new(0.0, 0.0, 50.0, 50.0))
            .unwrap();
        assert_eq!(square.squareness, 1.0);
        assert_eq!(square.size_score, 1.0);
        assert!((square.score() - 0.7).abs() < 1e-9);

        assert!(classifier.details(&BBox::new(0.0, 0.0, 50.0, 30.0)).is_none());
        assert!(classifier.details(&BBox::new(0.0, 0.0, 10.0, 10.0)).is_none());
        assert!(classifier.details(&BBox::new(0.0, 0.0, 90.0, 90.0)).is_none());
    }
}
