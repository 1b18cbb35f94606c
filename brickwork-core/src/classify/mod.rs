use std::fmt;

use serde::{Deserialize, Serialize};

pub mod assign;
pub mod candidate;
pub mod conflicts;
pub mod dedup;
pub mod document;
pub mod hints;
pub mod page;
pub mod pipeline;
pub mod result;

pub use candidate::{Candidate, CandidateId, ScoreDetails, ScoredCandidate};
pub use conflicts::{ConflictResolver, PrecedenceRule};
pub use document::{classify_document, ClassifyConfig};
pub use hints::DocumentHints;
pub use page::classify_page;
pub use pipeline::{Classifier, ClassifierPipeline, ClassifierRegistry, ScoringContext};
pub use result::{ClassificationResult, RemovalKind, RemovalReason};

/// Closed set of labels a candidate can be classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum Label {
    PageNumber,
    StepNumber,
    PartCount,
    BagNumber,
    Part,
    PartsList,
    Diagram,
    SubAssembly,
    RotationSymbol,
    Arrow,
    Divider,
    Step,
    Page,
}

impl Label {
    pub const ALL: [Label; 13] = [
        Label::PageNumber,
        Label::StepNumber,
        Label::PartCount,
        Label::BagNumber,
        Label::Part,
        Label::PartsList,
        Label::Diagram,
        Label::SubAssembly,
        Label::RotationSymbol,
        Label::Arrow,
        Label::Divider,
        Label::Step,
        Label::Page,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::PageNumber => "page_number",
            Label::StepNumber => "step_number",
            Label::PartCount => "part_count",
            Label::BagNumber => "bag_number",
            Label::Part => "part",
            Label::PartsList => "parts_list",
            Label::Diagram => "diagram",
            Label::SubAssembly => "sub_assembly",
            Label::RotationSymbol => "rotation_symbol",
            Label::Arrow => "arrow",
            Label::Divider => "divider",
            Label::Step => "step",
            Label::Page => "page",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
