use serde::Serialize;
use tracing::debug;

use crate::{
    classify::{
        assign::{assign_one_to_many, assign_one_to_one, placement_cost, CostMatrix},
        CandidateId, ClassificationResult, Classifier, ClassifierRegistry, Label, ScoreDetails,
        ScoredCandidate, ScoringContext,
    },
    config::ClassifierConfig,
    elements::{Element, Page, Step},
    entities::BBox,
    error::BuildFailure,
};

use super::{build_active, build_best};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageScore {
    pub step_candidates: usize,
}

impl PageScore {
    pub fn score(&self) -> f64 {
        1f64
    }
}

/// Root classifier: one candidate per page, built last, owning everything else.
pub struct PageClassifier {
    config: ClassifierConfig,
}

impl PageClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Binds `items` to steps. Returns the assigned `(step index, item)` pairs and the
    /// items no step could take.
    fn assign<T>(
        &self,
        items: Vec<T>,
        bbox: impl Fn(&T) -> BBox,
        anchors: &[BBox],
        obstacles: &[BBox],
        one_to_many: bool,
    ) -> (Vec<(usize, T)>, Vec<T>) {
        let costs = CostMatrix::from_fn(items.len(), anchors.len(), |r, c| {
            placement_cost(&anchors[c], &bbox(&items[r]), obstacles, &self.config)
        });
        let pairs = if one_to_many {
            assign_one_to_many(&costs, self.config.assignment_max_distance)
        } else {
            assign_one_to_one(&costs, self.config.assignment_max_distance)
        };

        let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
        let mut assigned = Vec::with_capacity(pairs.len());
        for (row, col) in pairs {
            if let Some(item) = slots[row].take() {
                assigned.push((col, item));
            }
        }
        (assigned, slots.into_iter().flatten().collect())
    }

    fn build_steps(
        &self,
        result: &mut ClassificationResult,
        registry: &ClassifierRegistry,
    ) -> Vec<Step> {
        let ids: Vec<CandidateId> = result
            .candidates(Label::Step)
            .into_iter()
            .filter(|c| c.is_active())
            .map(|c| c.id)
            .collect();
        let mut steps = Vec::with_capacity(ids.len());
        for id in ids {
            if !result.candidate(id).is_active() {
                continue;
            }
            match result.build(id, registry) {
                Ok(Element::Step(step)) => steps.push(step),
                Ok(_) => continue,
                Err(failure) => {
                    result.warn(format!("{failure}"));
                    result.mark_failed(id, failure.reason);
                }
            }
        }
        steps.sort_by(|a, b| {
            a.step_number
                .value
                .cmp(&b.step_number.value)
                .then_with(|| a.bbox.y0.total_cmp(&b.bbox.y0))
                .then_with(|| a.bbox.x0.total_cmp(&b.bbox.x0))
        });
        steps
    }
}

impl Classifier for PageClassifier {
    fn output(&self) -> Label {
        Label::Page
    }

    fn requires(&self) -> &[Label] {
        &[
            Label::PageNumber,
            Label::BagNumber,
            Label::Divider,
            Label::Step,
            Label::SubAssembly,
            Label::Diagram,
            Label::RotationSymbol,
            Label::Arrow,
        ]
    }

    fn score(&self, result: &ClassificationResult, _ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        let details = PageScore {
            step_candidates: result.candidates(Label::Step).len(),
        };
        vec![ScoredCandidate::new(
            *result.page_bbox(),
            ScoreDetails::Page(details),
            vec![],
        )]
    }

    fn build(
        &self,
        _id: CandidateId,
        result: &mut ClassificationResult,
        registry: &ClassifierRegistry,
    ) -> Result<Element, BuildFailure> {
        let page_number = match build_best(result, registry, Label::PageNumber) {
            Some(Element::PageNumber(number)) => Some(number),
            _ => None,
        };
        let mut new_bags: Vec<_> = build_active(result, registry, Label::BagNumber)
            .into_iter()
            .filter_map(|e| match e {
                Element::BagNumber(bag) => Some(bag),
                _ => None,
            })
            .collect();
        new_bags.sort_by_key(|b| b.value);
        let dividers: Vec<_> = build_active(result, registry, Label::Divider)
            .into_iter()
            .filter_map(|e| match e {
                Element::Divider(divider) => Some(divider),
                _ => None,
            })
            .collect();

        let mut steps = self.build_steps(result, registry);

        let sub_assemblies: Vec<_> = build_active(result, registry, Label::SubAssembly)
            .into_iter()
            .filter_map(|e| match e {
                Element::SubAssembly(sub) => Some(sub),
                _ => None,
            })
            .collect();
        // diagrams framed by a sub-assembly are already built and not offered again
        let diagrams: Vec<_> = build_active(result, registry, Label::Diagram)
            .into_iter()
            .filter_map(|e| match e {
                Element::Diagram(diagram) => Some(diagram),
                _ => None,
            })
            .collect();
        let rotation_symbols: Vec<_> = build_active(result, registry, Label::RotationSymbol)
            .into_iter()
            .filter_map(|e| match e {
                Element::RotationSymbol(symbol) => Some(symbol),
                _ => None,
            })
            .collect();
        let arrows: Vec<_> = build_active(result, registry, Label::Arrow)
            .into_iter()
            .filter_map(|e| match e {
                Element::Arrow(arrow) => Some(arrow),
                _ => None,
            })
            .collect();

        let obstacles: Vec<BBox> = dividers.iter().map(|d| d.bbox).collect();
        let anchors: Vec<BBox> = steps.iter().map(|s| s.step_number.bbox).collect();
        let mut unassigned: Vec<(Label, BBox)> = Vec::new();

        let (assigned, left) = self.assign(diagrams, |d| d.bbox, &anchors, &obstacles, false);
        for (step, diagram) in assigned {
            steps[step].diagram = Some(diagram);
        }
        unassigned.extend(left.into_iter().map(|d| (Label::Diagram, d.bbox)));

        let (assigned, left) =
            self.assign(sub_assemblies, |s| s.bbox, &anchors, &obstacles, true);
        for (step, sub_assembly) in assigned {
            steps[step].sub_assemblies.push(sub_assembly);
        }
        unassigned.extend(left.into_iter().map(|s| (Label::SubAssembly, s.bbox)));

        let (assigned, left) = self.assign(arrows, |a| a.bbox, &anchors, &obstacles, true);
        for (step, arrow) in assigned {
            steps[step].arrows.push(arrow);
        }
        unassigned.extend(left.into_iter().map(|a| (Label::Arrow, a.bbox)));

        // rotation symbols sit next to the diagram they apply to
        let diagram_anchors: Vec<BBox> = steps
            .iter()
            .map(|s| s.diagram.as_ref().map_or(s.step_number.bbox, |d| d.bbox))
            .collect();
        let (assigned, left) = self.assign(
            rotation_symbols,
            |r| r.bbox,
            &diagram_anchors,
            &obstacles,
            false,
        );
        for (step, symbol) in assigned {
            steps[step].rotation_symbol = Some(symbol);
        }
        unassigned.extend(left.into_iter().map(|r| (Label::RotationSymbol, r.bbox)));

        for (label, bbox) in unassigned {
            result.warn(format!("{label} at {bbox} not assigned to any step"));
        }
        for step in &mut steps {
            step.refresh_bbox();
        }
        debug!(
            page_index = result.page_index(),
            steps = steps.len(),
            "page assembled"
        );

        Ok(Element::Page(Page {
            page_index: result.page_index(),
            page_number,
            steps,
            new_bags,
            dividers,
            bbox: *result.page_bbox(),
        }))
    }
}
