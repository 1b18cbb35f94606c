use serde::Serialize;

use crate::{
    blocks::ImageBlock,
    classify::{
        CandidateId, ClassificationResult, Classifier, ClassifierRegistry, Label, ScoreDetails,
        ScoredCandidate, ScoringContext,
    },
    config::ClassifierConfig,
    elements::{Element, Part},
    entities::BBox,
    error::BuildFailure,
};

use super::{build_nested, unexpected_details, unexpected_element};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartScore {
    pub part_count: CandidateId,
    pub count_score: f64,
    /// How squarely the count sits under the image.
    pub alignment_score: f64,
    pub image_id: Option<String>,
}

impl PartScore {
    pub fn score(&self) -> f64 {
        0.5 * self.count_score + 0.5 * self.alignment_score
    }
}

pub struct PartClassifier {
    config: ClassifierConfig,
}

impl PartClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// 0 unless `count` is printed right under `image` and overlaps it horizontally.
    fn alignment(&self, image: &BBox, count: &BBox) -> f64 {
        let gap = count.y0 - image.y1;
        if gap < -count.height() / 2f64 || gap > self.config.part_count_max_gap {
            return 0f64;
        }
        let overlap = (image.x1.min(count.x1) - image.x0.max(count.x0)).max(0f64);
        if count.width() <= 0f64 {
            return 0f64;
        }
        let overlap_ratio = (overlap / count.width()).min(1f64);
        overlap_ratio * (1f64 - 0.5 * gap.max(0f64) / self.config.part_count_max_gap)
    }
}

impl Classifier for PartClassifier {
    fn output(&self) -> Label {
        Label::Part
    }

    fn requires(&self) -> &[Label] {
        &[Label::PartCount]
    }

    fn score(&self, result: &ClassificationResult, _ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        let images: Vec<&ImageBlock> = result.active_blocks().filter_map(|b| b.as_image()).collect();

        // each count labels the image it is best aligned with
        result
            .candidates(Label::PartCount)
            .into_iter()
            .filter_map(|count| {
                let (image, alignment) = images
                    .iter()
                    .map(|img| (*img, self.alignment(&img.bbox, &count.bbox)))
                    .filter(|(_, alignment)| *alignment > 0f64)
                    .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.id.cmp(&a.0.id)))?;
                let details = PartScore {
                    part_count: count.id,
                    count_score: count.score,
                    alignment_score: alignment,
                    image_id: image.image_id.clone(),
                };
                Some(ScoredCandidate::new(
                    image.bbox.union(&count.bbox),
                    ScoreDetails::Part(details),
                    vec![image.id],
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
        let ScoreDetails::Part(details) = &result.candidate(id).details else {
            return Err(unexpected_details(id, Label::Part));
        };
        let (count_id, image_id) = (details.part_count, details.image_id.clone());

        let count = match build_nested(result, registry, id, count_id)? {
            Element::PartCount(count) => count,
            other => return Err(unexpected_element(id, Label::Part, &other)),
        };
        let bbox = result.candidate(id).bbox.union(&count.bbox);
        Ok(Element::Part(Part {
            count,
            image_id,
            bbox,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classifiers::{
            part_count::PartCountClassifier,
            testing::{ctx, image, result, text},
        },
        classify::{ClassifierPipeline, DocumentHints},
    };

    #[test]
    fn test_count_pairs_with_image_above() {
        let mut result = result(vec![
            image(1, BBox::new(20.0, 100.0, 50.0, 130.0)),
            image(2, BBox::new(80.0, 100.0, 110.0, 130.0)),
            text(3, BBox::new(20.0, 132.0, 30.0, 140.0), "2x", 8.0),
            text(4, BBox::new(200.0, 132.0, 210.0, 140.0), "1x", 8.0),
        ]);
        let hints = DocumentHints::default();
        let config = ClassifierConfig::default();
        for scored in PartCountClassifier::new(config.clone()).score(&result, &ctx(&hints)) {
            result.add_candidate(Label::PartCount, scored).unwrap();
        }

        let scored = PartClassifier::new(config).score(&result, &ctx(&hints));
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].source_blocks, vec![1]);
        assert_eq!(scored[0].bbox, BBox::new(20.0, 100.0, 50.0, 140.0));
        match &scored[0].details {
            ScoreDetails::Part(d) => {
                assert_eq!(d.image_id.as_deref(), Some("img-1"));
                assert!(d.alignment_score > 0.9);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_build_consumes_count() {
        let pipeline = ClassifierPipeline::with_config(ClassifierConfig::default()).unwrap();
        let mut result = result(vec![
            image(1, BBox::new(20.0, 100.0, 50.0, 130.0)),
            text(2, BBox::new(20.0, 132.0, 30.0, 140.0), "2x", 8.0),
        ]);
        let hints = DocumentHints::default();
        pipeline.score(&mut result, &ctx(&hints)).unwrap();

        let part = result.candidates(Label::Part)[0].id;
        let element = result.build(part, pipeline.registry()).unwrap();
        let Element::Part(built) = element else {
            panic!("expected a part");
        };
        assert_eq!(built.count.count, 2);
        assert_eq!(result.winner_for_block(1).map(|c| c.id), Some(part));
        assert_eq!(
            result.winner_for_block(2).map(|c| c.label),
            Some(Label::PartCount)
        );
    }
}
