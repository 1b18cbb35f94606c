use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    blocks::{Block, PageData},
    elements::Element,
    entities::{BBox, BlockId, PageID},
    error::{BuildFailure, ClassificationError},
};

use super::{
    candidate::{Candidate, CandidateId, ScoredCandidate},
    pipeline::ClassifierRegistry,
    Label,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RemovalKind {
    /// Near-identical copy of another block (drop shadow, doubled stroke).
    Duplicate,
    /// Entirely outside the page bounds.
    OutsidePage,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemovalReason {
    pub kind: RemovalKind,
    /// Block kept in place of the removed one, if any.
    pub target_block: Option<BlockId>,
}

#[derive(Debug)]
enum UndoEntry {
    Constructed {
        id: CandidateId,
        previous: Option<Element>,
    },
    Failure {
        id: CandidateId,
        previous: Option<String>,
    },
    BBox {
        id: CandidateId,
        previous: BBox,
    },
    Consumed {
        block: BlockId,
    },
}

/// Undo log of the candidate state changes made by the builds currently in progress.
/// Entries are only kept while at least one transaction is open.
#[derive(Debug, Default)]
struct Journal {
    entries: Vec<UndoEntry>,
    open: usize,
}

impl Journal {
    fn begin(&mut self) -> usize {
        self.open += 1;
        self.entries.len()
    }

    fn record(&mut self, entry: UndoEntry) {
        if self.open > 0 {
            self.entries.push(entry);
        }
    }

    fn close(&mut self) {
        self.open -= 1;
        if self.open == 0 {
            self.entries.clear();
        }
    }
}

/// Per-page arena holding every candidate, the consumed and removed blocks and the
/// warnings gathered while classifying the page.
#[derive(Debug)]
pub struct ClassificationResult {
    page: PageData,
    block_index: HashMap<BlockId, usize>,
    candidates: Vec<Candidate>,
    by_label: BTreeMap<Label, Vec<CandidateId>>,
    consumed: BTreeMap<BlockId, CandidateId>,
    removals: BTreeMap<BlockId, RemovalReason>,
    warnings: Vec<String>,
    journal: Journal,
    building: Vec<CandidateId>,
    root: Option<CandidateId>,
}

impl ClassificationResult {
    pub fn new(page: PageData) -> Result<Self, ClassificationError> {
        let mut block_index = HashMap::with_capacity(page.blocks.len());
        for (idx, block) in page.blocks.iter().enumerate() {
            if !block.bbox().is_valid() {
                return Err(ClassificationError::InvalidBlockBBox {
                    page_index: page.page_index,
                    block: block.id(),
                });
            }
            if block_index.insert(block.id(), idx).is_some() {
                return Err(ClassificationError::DuplicateBlockId {
                    page_index: page.page_index,
                    block: block.id(),
                });
            }
        }
        Ok(Self {
            page,
            block_index,
            candidates: Vec::new(),
            by_label: BTreeMap::new(),
            consumed: BTreeMap::new(),
            removals: BTreeMap::new(),
            warnings: Vec::new(),
            journal: Journal::default(),
            building: Vec::new(),
            root: None,
        })
    }

    pub fn page(&self) -> &PageData {
        &self.page
    }

    pub fn page_index(&self) -> PageID {
        self.page.page_index
    }

    pub fn page_bbox(&self) -> &BBox {
        &self.page.bbox
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.block_index.get(&id).map(|&idx| &self.page.blocks[idx])
    }

    /// Blocks still offered to classifiers, in extraction order.
    pub fn active_blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.page
            .blocks
            .iter()
            .filter(|b| !self.removals.contains_key(&b.id()))
    }

    // Removal tracking

    pub fn mark_removed(&mut self, block: BlockId, reason: RemovalReason) {
        self.removals.entry(block).or_insert(reason);
    }

    pub fn is_removed(&self, block: BlockId) -> bool {
        self.removals.contains_key(&block)
    }

    pub fn removal_reason(&self, block: BlockId) -> Option<&RemovalReason> {
        self.removals.get(&block)
    }

    pub fn removals(&self) -> &BTreeMap<BlockId, RemovalReason> {
        &self.removals
    }

    // Candidates

    /// Registers a scored hypothesis produced by the classifier for `producer`.
    pub fn add_candidate(
        &mut self,
        producer: Label,
        scored: ScoredCandidate,
    ) -> Result<CandidateId, ClassificationError> {
        let label = scored.label();
        if label != producer {
            return Err(ClassificationError::LabelMismatch {
                classifier: producer,
                produced: label,
            });
        }
        for &block in &scored.source_blocks {
            if !self.block_index.contains_key(&block) {
                return Err(ClassificationError::UnknownBlock { label, block });
            }
            if self.is_removed(block) {
                return Err(ClassificationError::RemovedBlock { label, block });
            }
        }
        let id = CandidateId(self.candidates.len());
        let score = scored.score();
        self.candidates.push(Candidate {
            id,
            label,
            bbox: scored.bbox,
            score,
            details: scored.details,
            source_blocks: scored.source_blocks,
            constructed: None,
            failure_reason: None,
        });
        self.by_label.entry(label).or_default().push(id);
        Ok(id)
    }

    pub fn candidate(&self, id: CandidateId) -> &Candidate {
        &self.candidates[id.0]
    }

    pub fn get_candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.get(id.0)
    }

    /// Every candidate in registration order.
    pub fn all_candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Candidates of `label`, best first.
    pub fn candidates(&self, label: Label) -> Vec<&Candidate> {
        let mut candidates: Vec<&Candidate> = self
            .by_label
            .get(&label)
            .map(|ids| ids.iter().map(|id| self.candidate(*id)).collect())
            .unwrap_or_default();
        candidates.sort_by(|a, b| a.rank_cmp(b));
        candidates
    }

    /// Candidates of any label reading `block`, best first.
    pub fn candidates_for_block(&self, block: BlockId) -> Vec<&Candidate> {
        let mut candidates: Vec<&Candidate> = self
            .candidates
            .iter()
            .filter(|c| c.source_blocks.contains(&block))
            .collect();
        candidates.sort_by(|a, b| a.rank_cmp(b));
        candidates
    }

    /// The constructed candidate that consumed `block`.
    pub fn winner_for_block(&self, block: BlockId) -> Option<&Candidate> {
        self.consumed.get(&block).map(|id| self.candidate(*id))
    }

    pub fn consumed_blocks(&self) -> &BTreeMap<BlockId, CandidateId> {
        &self.consumed
    }

    pub fn is_consumed(&self, block: BlockId) -> bool {
        self.consumed.contains_key(&block)
    }

    pub fn is_constructed(&self, id: CandidateId) -> bool {
        self.candidate(id).is_constructed()
    }

    pub fn is_failed(&self, id: CandidateId) -> bool {
        self.candidate(id).is_failed()
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        debug!(page_index = self.page.page_index, "{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub(crate) fn set_root(&mut self, id: CandidateId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<&Candidate> {
        self.root.map(|id| self.candidate(id))
    }

    /// The constructed page-level element, once the build phase has run.
    pub fn root_element(&self) -> Option<&Element> {
        self.root().and_then(|c| c.constructed.as_ref())
    }

    // Build protocol

    /// Builds `id` into an element, building nested candidates through the classifiers in
    /// `registry`. A failed build leaves every candidate and the consumed set exactly as
    /// they were before the call.
    pub fn build(
        &mut self,
        id: CandidateId,
        registry: &ClassifierRegistry,
    ) -> Result<Element, BuildFailure> {
        let candidate = self.candidate(id);
        let label = candidate.label;
        if let Some(element) = &candidate.constructed {
            return Ok(element.clone());
        }
        if let Some(reason) = &candidate.failure_reason {
            return Err(BuildFailure::new(id, label, reason.clone()));
        }
        if let Some(reason) = self.consumption_conflict(id) {
            return Err(BuildFailure::new(id, label, reason));
        }
        if self.building.contains(&id) {
            return Err(BuildFailure::new(id, label, "candidate is already being built"));
        }
        let classifier = registry
            .get(label)
            .ok_or_else(|| BuildFailure::new(id, label, "no classifier registered for label"))?;

        let savepoint = self.journal.begin();
        self.building.push(id);
        let outcome = classifier
            .build(id, self, registry)
            .and_then(|element| self.commit_win(id, element));
        self.building.pop();

        match outcome {
            Ok(element) => {
                self.journal.close();
                Ok(element)
            }
            Err(failure) => {
                self.rollback(savepoint);
                debug!(candidate = %id, %label, "build rolled back: {}", failure.reason);
                Err(failure)
            }
        }
    }

    /// Records a failure on an active candidate and, transitively, on every active
    /// candidate that requires it. Returns whether `id` itself was failed by this call.
    pub fn mark_failed(&mut self, id: CandidateId, reason: impl Into<String>) -> bool {
        if !self.candidate(id).is_active() || self.building.contains(&id) {
            return false;
        }
        let mut worklist = vec![(id, reason.into())];
        while let Some((failed, reason)) = worklist.pop() {
            let candidate = self.candidate(failed);
            if !candidate.is_active() || self.building.contains(&failed) {
                continue;
            }
            let label = candidate.label;
            self.set_failure(failed, reason);
            worklist.extend(
                self.candidates
                    .iter()
                    .filter(|c| c.is_active() && c.details.required_candidates().contains(&failed))
                    .map(|c| (c.id, format!("requires failed {label} candidate {failed}"))),
            );
        }
        true
    }

    fn consumption_conflict(&self, id: CandidateId) -> Option<String> {
        self.candidate(id).source_blocks.iter().find_map(|block| {
            self.consumed.get(block).map(|owner| {
                format!(
                    "block {block} already consumed by {} candidate {owner}",
                    self.candidate(*owner).label
                )
            })
        })
    }

    fn commit_win(&mut self, id: CandidateId, element: Element) -> Result<Element, BuildFailure> {
        let label = self.candidate(id).label;
        if element.label() != label {
            return Err(BuildFailure::new(
                id,
                label,
                format!("classifier returned a {} element", element.label()),
            ));
        }
        if let Some(reason) = self.consumption_conflict(id) {
            return Err(BuildFailure::new(id, label, reason));
        }

        let bbox = *element.bbox();
        if self.candidate(id).bbox != bbox {
            let previous = std::mem::replace(&mut self.candidates[id.0].bbox, bbox);
            self.journal.record(UndoEntry::BBox { id, previous });
        }
        for block in self.candidate(id).source_blocks.clone() {
            self.consumed.insert(block, id);
            self.journal.record(UndoEntry::Consumed { block });
        }
        let previous = self.candidates[id.0].constructed.replace(element.clone());
        self.journal.record(UndoEntry::Constructed { id, previous });

        self.fail_losers(id);
        debug!(candidate = %id, %label, bbox = %bbox, "built");
        Ok(element)
    }

    /// Fails every other active candidate that reads one of the winner's blocks.
    fn fail_losers(&mut self, winner: CandidateId) {
        let winner = self.candidate(winner);
        if winner.source_blocks.is_empty() {
            return;
        }
        let blocks: BTreeSet<BlockId> = winner.source_blocks.iter().copied().collect();
        let (winner_id, label, bbox) = (winner.id, winner.label, winner.bbox);

        let losers: Vec<(CandidateId, Vec<BlockId>)> = self
            .candidates
            .iter()
            .filter(|c| c.id != winner_id && c.is_active())
            .filter_map(|c| {
                let shared: Vec<BlockId> = c
                    .source_blocks
                    .iter()
                    .filter(|b| blocks.contains(b))
                    .copied()
                    .collect();
                (!shared.is_empty()).then_some((c.id, shared))
            })
            .collect();

        for (loser, shared) in losers {
            self.mark_failed(
                loser,
                format!("lost conflict to {label} at {bbox} on blocks {shared:?}"),
            );
        }
    }

    fn set_failure(&mut self, id: CandidateId, reason: String) {
        let previous = self.candidates[id.0].failure_reason.replace(reason);
        self.journal.record(UndoEntry::Failure { id, previous });
    }

    fn rollback(&mut self, savepoint: usize) {
        while self.journal.entries.len() > savepoint {
            let Some(entry) = self.journal.entries.pop() else {
                break;
            };
            match entry {
                UndoEntry::Constructed { id, previous } => {
                    self.candidates[id.0].constructed = previous;
                }
                UndoEntry::Failure { id, previous } => {
                    self.candidates[id.0].failure_reason = previous;
                }
                UndoEntry::BBox { id, previous } => {
                    self.candidates[id.0].bbox = previous;
                }
                UndoEntry::Consumed { block } => {
                    self.consumed.remove(&block);
                }
            }
        }
        self.journal.close();
    }
}
