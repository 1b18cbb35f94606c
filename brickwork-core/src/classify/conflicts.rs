use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::entities::BlockId;

use super::{
    candidate::{Candidate, CandidateId},
    result::ClassificationResult,
    Label,
};

/// `winner` always takes a block from `loser`, whatever their scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PrecedenceRule {
    pub winner: Label,
    pub loser: Label,
}

/// Cross-label arbitration for blocks claimed by candidates of different labels.
/// Pairwise rules win first, then label priority (higher wins), then candidate rank.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    rules: Vec<PrecedenceRule>,
    priorities: BTreeMap<Label, i32>,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::empty()
            .with_rule(Label::BagNumber, Label::StepNumber)
            .with_rule(Label::BagNumber, Label::PageNumber)
            .with_rule(Label::PartCount, Label::StepNumber)
            .with_rule(Label::Part, Label::RotationSymbol)
            .with_priority(Label::Divider, 1)
    }
}

impl ConflictResolver {
    /// No rules and equal priorities: every conflict is decided by candidate rank.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            priorities: BTreeMap::new(),
        }
    }

    pub fn with_rule(mut self, winner: Label, loser: Label) -> Self {
        self.rules.retain(|r| !(r.winner == loser && r.loser == winner));
        self.rules.push(PrecedenceRule { winner, loser });
        self
    }

    pub fn with_priority(mut self, label: Label, priority: i32) -> Self {
        self.priorities.insert(label, priority);
        self
    }

    pub fn priority(&self, label: Label) -> i32 {
        self.priorities.get(&label).copied().unwrap_or_default()
    }

    /// `Ordering::Less` when `a` should keep the block over `b`.
    pub fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        if a.label != b.label {
            if self.has_rule(a.label, b.label) {
                return Ordering::Less;
            }
            if self.has_rule(b.label, a.label) {
                return Ordering::Greater;
            }
        }
        self.priority(b.label)
            .cmp(&self.priority(a.label))
            .then_with(|| a.rank_cmp(b))
    }

    fn has_rule(&self, winner: Label, loser: Label) -> bool {
        self.rules
            .iter()
            .any(|r| r.winner == winner && r.loser == loser)
    }

    /// Fails every candidate whose label loses a shared block to another label. Candidates
    /// that already failed are skipped, so the first recorded reason is kept. Returns the
    /// number of candidates failed directly.
    #[instrument(skip_all, fields(page_index = result.page_index()))]
    pub fn resolve(&self, result: &mut ClassificationResult) -> usize {
        let mut claims: BTreeMap<BlockId, BTreeSet<CandidateId>> = BTreeMap::new();
        for candidate in result.all_candidates().iter().filter(|c| c.is_active()) {
            for &block in &candidate.source_blocks {
                claims.entry(block).or_default().insert(candidate.id);
            }
        }

        let mut failed = 0;
        for (block, claimants) in claims {
            let active: Vec<&Candidate> = claimants
                .iter()
                .map(|id| result.candidate(*id))
                .filter(|c| c.is_active())
                .collect();
            let labels: BTreeSet<Label> = active.iter().map(|c| c.label).collect();
            if labels.len() < 2 {
                continue;
            }

            // best candidate of each label competes for the block
            let mut champions: Vec<&Candidate> = labels
                .iter()
                .filter_map(|label| {
                    active
                        .iter()
                        .filter(|c| c.label == *label)
                        .min_by(|a, b| a.rank_cmp(b))
                        .copied()
                })
                .collect();
            champions.sort_by(|a, b| a.rank_cmp(b));
            let Some(mut winner) = champions.first().copied() else {
                continue;
            };
            for challenger in champions.iter().skip(1) {
                if self.compare(challenger, winner) == Ordering::Less {
                    winner = challenger;
                }
            }

            let (winner_label, winner_id) = (winner.label, winner.id);
            let losers: Vec<CandidateId> = active
                .iter()
                .filter(|c| c.label != winner_label)
                .map(|c| c.id)
                .collect();
            for loser in losers {
                let reason = format!(
                    "block {block} resolved in favour of {winner_label} candidate {winner_id}"
                );
                if result.mark_failed(loser, reason) {
                    failed += 1;
                }
            }
        }
        debug!(failed, "conflicts resolved");
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blocks::{Block, PageData, TextBlock},
        classifiers::{
            bag_number::BagNumberScore, part::PartScore, part_count::PartCountScore,
            step_number::StepNumberScore,
        },
        classify::candidate::{ScoreDetails, ScoredCandidate},
        entities::BBox,
    };

    fn text(id: BlockId, s: &str) -> Block {
        Block::Text(TextBlock {
            id,
            bbox: BBox::new(10.0, 10.0 * id as f64, 20.0, 10.0 * id as f64 + 8.0),
            draw_order: id,
            text: s.to_owned(),
            font_name: None,
            font_size: 40.0,
            color: None,
        })
    }

    fn result_with(blocks: Vec<Block>) -> ClassificationResult {
        ClassificationResult::new(PageData {
            page_index: 1,
            bbox: BBox::new(0.0, 0.0, 500.0, 700.0),
            blocks,
        })
        .unwrap()
    }

    fn step_number(block: BlockId, score: f64) -> ScoredCandidate {
        ScoredCandidate::new(
            BBox::new(10.0, 10.0, 20.0, 18.0),
            ScoreDetails::StepNumber(StepNumberScore {
                value: 3,
                text_score: score,
                font_size_score: score,
            }),
            vec![block],
        )
    }

    fn bag_number(block: BlockId, score: f64) -> ScoredCandidate {
        ScoredCandidate::new(
            BBox::new(10.0, 10.0, 20.0, 18.0),
            ScoreDetails::BagNumber(BagNumberScore {
                value: 3,
                text_score: score,
                font_size_score: score,
            }),
            vec![block],
        )
    }

    #[test]
    fn test_rule_beats_score() {
        let mut result = result_with(vec![text(1, "3")]);
        let step = result
            .add_candidate(Label::StepNumber, step_number(1, 0.95))
            .unwrap();
        let bag = result
            .add_candidate(Label::BagNumber, bag_number(1, 0.4))
            .unwrap();
        assert!(result.candidate(step).score > result.candidate(bag).score);

        let failed = ConflictResolver::default().resolve(&mut result);
        assert_eq!(failed, 1);
        assert!(result.candidate(bag).is_active());
        let reason = result.candidate(step).failure_reason.clone().unwrap();
        assert!(reason.contains("bag_number"), "{reason}");
    }

    #[test]
    fn test_fallback_uses_score() {
        let mut result = result_with(vec![text(1, "3")]);
        let step = result
            .add_candidate(Label::StepNumber, step_number(1, 0.95))
            .unwrap();
        let bag = result
            .add_candidate(Label::BagNumber, bag_number(1, 0.4))
            .unwrap();

        ConflictResolver::empty().resolve(&mut result);
        assert!(result.candidate(step).is_active());
        assert!(result.candidate(bag).is_failed());

        // explicit priority overrides the score
        let mut result = result_with(vec![text(1, "3")]);
        let step = result
            .add_candidate(Label::StepNumber, step_number(1, 0.95))
            .unwrap();
        let bag = result
            .add_candidate(Label::BagNumber, bag_number(1, 0.4))
            .unwrap();
        ConflictResolver::empty()
            .with_priority(Label::BagNumber, 5)
            .resolve(&mut result);
        assert!(result.candidate(step).is_failed());
        assert!(result.candidate(bag).is_active());
    }

    #[test]
    fn test_failure_propagates_to_dependents_once() {
        let mut result = result_with(vec![text(1, "2x"), text(2, "img")]);
        let count = result
            .add_candidate(
                Label::PartCount,
                ScoredCandidate::new(
                    BBox::new(10.0, 10.0, 20.0, 18.0),
                    ScoreDetails::PartCount(PartCountScore {
                        count: 2,
                        text_score: 0.5,
                        font_size_score: 0.5,
                    }),
                    vec![1],
                ),
            )
            .unwrap();
        let part = result
            .add_candidate(
                Label::Part,
                ScoredCandidate::new(
                    BBox::new(10.0, 0.0, 20.0, 28.0),
                    ScoreDetails::Part(PartScore {
                        part_count: count,
                        count_score: 0.5,
                        alignment_score: 1.0,
                        image_id: None,
                    }),
                    vec![2],
                ),
            )
            .unwrap();
        let step = result
            .add_candidate(Label::StepNumber, step_number(1, 0.9))
            .unwrap();

        // rule: part counts beat step numbers, so the step number is the one failing
        ConflictResolver::default().resolve(&mut result);
        assert!(result.candidate(step).is_failed());
        assert!(result.candidate(part).is_active());

        // failing the count by hand cascades to the part
        assert!(result.mark_failed(count, "manual"));
        assert_eq!(
            result.candidate(part).failure_reason.as_deref(),
            Some("requires failed part_count candidate #0")
        );
        // first reason wins
        assert!(!result.mark_failed(part, "second reason"));
        assert_eq!(
            result.candidate(part).failure_reason.as_deref(),
            Some("requires failed part_count candidate #0")
        );
    }
}
