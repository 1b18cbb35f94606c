use serde::Serialize;

use crate::{
    blocks::{DrawingBlock, Point},
    classify::{
        CandidateId, ClassificationResult, Classifier, ClassifierRegistry, Label, ScoreDetails,
        ScoredCandidate, ScoringContext,
    },
    config::ClassifierConfig,
    elements::{Arrow, Element},
    error::BuildFailure,
};

use super::unexpected_details;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrowScore {
    pub tip: Point,
    /// 1 for a bare triangle, lower when the head carries a shaft.
    pub head_score: f64,
    pub vertex_count: usize,
}

impl ArrowScore {
    pub fn score(&self) -> f64 {
        0.9 * self.head_score
    }
}

/// Vertex farthest from the centroid of `vertices`.
fn tip_of(vertices: &[Point]) -> Option<Point> {
    if vertices.is_empty() {
        return None;
    }
    let n = vertices.len() as f64;
    let cx = vertices.iter().map(|v| v.0).sum::<f64>() / n;
    let cy = vertices.iter().map(|v| v.1).sum::<f64>() / n;
    vertices
        .iter()
        .copied()
        .max_by(|a, b| {
            let da = (a.0 - cx).hypot(a.1 - cy);
            let db = (b.0 - cx).hypot(b.1 - cy);
            da.total_cmp(&db)
        })
}

pub struct ArrowClassifier {
    config: ClassifierConfig,
}

impl ArrowClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    fn details(&self, drawing: &DrawingBlock) -> Option<ArrowScore> {
        if drawing.fill_color.is_none() {
            return None;
        }
        let vertices = drawing.line_vertices();
        let (head_score, max_size) = match vertices.len() {
            3 => (1f64, self.config.arrow_max_size),
            // head with a short shaft
            4 | 5 => (0.7, 4f64 * self.config.arrow_max_size),
            _ => return None,
        };
        let (w, h) = drawing.bbox.size();
        if w.max(h) > max_size {
            return None;
        }
        Some(ArrowScore {
            tip: tip_of(&vertices)?,
            head_score,
            vertex_count: vertices.len(),
        })
    }
}

impl Classifier for ArrowClassifier {
    fn output(&self) -> Label {
        Label::Arrow
    }

    fn requires(&self) -> &[Label] {
        &[]
    }

    fn score(&self, result: &ClassificationResult, _ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        result
            .active_blocks()
            .filter_map(|b| b.as_drawing())
            .filter_map(|d| {
                let details = self.details(d)?;
                Some(ScoredCandidate::new(
                    d.bbox,
                    ScoreDetails::Arrow(details),
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
        let ScoreDetails::Arrow(details) = &candidate.details else {
            return Err(unexpected_details(id, Label::Arrow));
        };
        Ok(Element::Arrow(Arrow {
            tip: details.tip,
            bbox: candidate.bbox,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blocks::{Color, PathItem},
        entities::BBox,
    };

    fn triangle(points: [Point; 3], fill: Option<Color>) -> DrawingBlock {
        DrawingBlock {
            id: 1,
            bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            draw_order: 0,
            fill_color: fill,
            stroke_color: None,
            items: vec![
                PathItem::Line {
                    from: points[0],
                    to: points[1],
                },
                PathItem::Line {
                    from: points[1],
                    to: points[2],
                },
                PathItem::Line {
                    from: points[2],
                    to: points[0],
                },
            ],
        }
    }

    #[test]
    fn test_filled_triangle_points_right() {
        let classifier = ArrowClassifier::new(ClassifierConfig::default());
        let head = triangle(
            [(0.0, 0.0), (0.0, 10.0), (10.0, 5.0)],
            Some(Color([0, 0, 0])),
        );
        let details = classifier.details(&head).unwrap();
        assert_eq!(details.tip, (10.0, 5.0));
        assert_eq!(details.vertex_count, 3);
        assert!((details.score() - 0.9).abs() < 1e-9);

        let outline = triangle([(0.0, 0.0), (0.0, 10.0), (10.0, 5.0)], None);
        assert!(classifier.details(&outline).is_none());
    }
}
