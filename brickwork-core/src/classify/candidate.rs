use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    classifiers::{
        arrow::ArrowScore, bag_number::BagNumberScore, diagram::DiagramScore,
        divider::DividerScore, page::PageScore, page_number::PageNumberScore, part::PartScore,
        part_count::PartCountScore, parts_list::PartsListScore, rotation::RotationSymbolScore,
        step::StepScore, step_number::StepNumberScore, sub_assembly::SubAssemblyScore,
    },
    elements::Element,
    entities::{BBox, BlockId},
};

use super::Label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct CandidateId(pub usize);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Label-specific scoring payload. Built once at scoring time from the page blocks and
/// the candidates of the label's dependencies, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "label")]
pub enum ScoreDetails {
    PageNumber(PageNumberScore),
    StepNumber(StepNumberScore),
    PartCount(PartCountScore),
    BagNumber(BagNumberScore),
    Part(PartScore),
    PartsList(PartsListScore),
    Diagram(DiagramScore),
    SubAssembly(SubAssemblyScore),
    RotationSymbol(RotationSymbolScore),
    Arrow(ArrowScore),
    Divider(DividerScore),
    Step(StepScore),
    Page(PageScore),
}

impl ScoreDetails {
    pub fn label(&self) -> Label {
        match self {
            ScoreDetails::PageNumber(_) => Label::PageNumber,
            ScoreDetails::StepNumber(_) => Label::StepNumber,
            ScoreDetails::PartCount(_) => Label::PartCount,
            ScoreDetails::BagNumber(_) => Label::BagNumber,
            ScoreDetails::Part(_) => Label::Part,
            ScoreDetails::PartsList(_) => Label::PartsList,
            ScoreDetails::Diagram(_) => Label::Diagram,
            ScoreDetails::SubAssembly(_) => Label::SubAssembly,
            ScoreDetails::RotationSymbol(_) => Label::RotationSymbol,
            ScoreDetails::Arrow(_) => Label::Arrow,
            ScoreDetails::Divider(_) => Label::Divider,
            ScoreDetails::Step(_) => Label::Step,
            ScoreDetails::Page(_) => Label::Page,
        }
    }

    /// Confidence in `[0, 1]`.
    pub fn score(&self) -> f64 {
        let score = match self {
            ScoreDetails::PageNumber(s) => s.score(),
            ScoreDetails::StepNumber(s) => s.score(),
            ScoreDetails::PartCount(s) => s.score(),
            ScoreDetails::BagNumber(s) => s.score(),
            ScoreDetails::Part(s) => s.score(),
            ScoreDetails::PartsList(s) => s.score(),
            ScoreDetails::Diagram(s) => s.score(),
            ScoreDetails::SubAssembly(s) => s.score(),
            ScoreDetails::RotationSymbol(s) => s.score(),
            ScoreDetails::Arrow(s) => s.score(),
            ScoreDetails::Divider(s) => s.score(),
            ScoreDetails::Step(s) => s.score(),
            ScoreDetails::Page(s) => s.score(),
        };
        if score.is_nan() {
            0f64
        } else {
            score.clamp(0f64, 1f64)
        }
    }

    /// Secondary ordering among same-label candidates of equal score (ascending).
    pub fn sort_key(&self) -> i64 {
        match self {
            ScoreDetails::PageNumber(s) => s.value as i64,
            ScoreDetails::StepNumber(s) => s.value as i64,
            ScoreDetails::PartCount(s) => s.count as i64,
            ScoreDetails::BagNumber(s) => s.value as i64,
            ScoreDetails::Step(s) => s.value as i64,
            ScoreDetails::PartsList(s) => -(s.parts.len() as i64),
            ScoreDetails::SubAssembly(s) => -(s.diagrams.len() as i64),
            ScoreDetails::Part(_)
            | ScoreDetails::Diagram(_)
            | ScoreDetails::RotationSymbol(_)
            | ScoreDetails::Arrow(_)
            | ScoreDetails::Divider(_)
            | ScoreDetails::Page(_) => 0,
        }
    }

    /// Candidates this hypothesis cannot be built without. Failing one of them fails this
    /// candidate too.
    pub fn required_candidates(&self) -> Vec<CandidateId> {
        match self {
            ScoreDetails::Part(s) => vec![s.part_count],
            ScoreDetails::Step(s) => vec![s.step_number],
            _ => Vec::new(),
        }
    }
}

/// A hypothesis that `source_blocks`, read as `label`, construct one element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub label: Label,
    pub bbox: BBox,
    pub score: f64,
    pub details: ScoreDetails,
    pub source_blocks: Vec<BlockId>,
    pub constructed: Option<Element>,
    pub failure_reason: Option<String>,
}

impl Candidate {
    #[inline(always)]
    pub fn is_constructed(&self) -> bool {
        self.constructed.is_some()
    }

    #[inline(always)]
    pub fn is_failed(&self) -> bool {
        self.failure_reason.is_some()
    }

    /// Neither built nor failed yet.
    #[inline(always)]
    pub fn is_active(&self) -> bool {
        !self.is_constructed() && !self.is_failed()
    }

    pub fn shares_blocks_with(&self, other: &Candidate) -> bool {
        self.source_blocks
            .iter()
            .any(|b| other.source_blocks.contains(b))
    }

    /// Best-first ordering: score descending, then the label sort key, the position on the
    /// page and finally the source block ids. Never depends on insertion order.
    pub fn rank_cmp(&self, other: &Candidate) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.details.sort_key().cmp(&other.details.sort_key()))
            .then_with(|| self.bbox.y0.total_cmp(&other.bbox.y0))
            .then_with(|| self.bbox.x0.total_cmp(&other.bbox.x0))
            .then_with(|| self.source_blocks.cmp(&other.source_blocks))
            .then_with(|| self.label.cmp(&other.label))
            .then_with(|| self.bbox.x1.total_cmp(&other.bbox.x1))
            .then_with(|| self.bbox.y1.total_cmp(&other.bbox.y1))
    }
}

/// Scoring output of a classifier, registered into the result as a [`Candidate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub bbox: BBox,
    pub details: ScoreDetails,
    pub source_blocks: Vec<BlockId>,
}

impl ScoredCandidate {
    pub fn new(bbox: BBox, details: ScoreDetails, mut source_blocks: Vec<BlockId>) -> Self {
        source_blocks.sort_unstable();
        source_blocks.dedup();
        Self {
            bbox,
            details,
            source_blocks,
        }
    }

    pub fn label(&self) -> Label {
        self.details.label()
    }

    pub fn score(&self) -> f64 {
        self.details.score()
    }
}
