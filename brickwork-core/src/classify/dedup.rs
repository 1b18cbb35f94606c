use std::collections::BTreeMap;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::{blocks::Block, entities::BlockId};

use super::result::{ClassificationResult, RemovalKind, RemovalReason};

/// Disjoint sets over block positions, path compression and union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let (root_x, root_y) = (self.find(x), self.find(y));
        if root_x == root_y {
            return;
        }
        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCluster {
    pub kept: BlockId,
    /// Ascending ids.
    pub removed: Vec<BlockId>,
}

/// Groups blocks that are near-identical copies of each other: pairwise IOU at least
/// `iou_threshold` and visually equivalent. Only clusters with two or more blocks are
/// returned, ordered by kept id.
pub fn cluster_duplicates<'a>(
    blocks: impl IntoIterator<Item = &'a Block>,
    iou_threshold: f64,
) -> Vec<DuplicateCluster> {
    let blocks: Vec<&Block> = blocks.into_iter().collect();
    let mut sets = UnionFind::new(blocks.len());

    for (i, j) in (0..blocks.len()).tuple_combinations() {
        let (a, b) = (blocks[i], blocks[j]);
        if a.is_visually_equivalent(b) && a.bbox().iou(b.bbox()) >= iou_threshold {
            sets.union(i, j);
        }
    }

    let mut groups: BTreeMap<usize, Vec<&Block>> = BTreeMap::new();
    for (idx, block) in blocks.iter().enumerate() {
        groups.entry(sets.find(idx)).or_default().push(block);
    }

    let mut clusters: Vec<DuplicateCluster> = groups
        .into_values()
        .filter(|members| members.len() > 1)
        .filter_map(|members| {
            let kept = members
                .iter()
                .max_by(|a, b| {
                    a.bbox()
                        .area()
                        .total_cmp(&b.bbox().area())
                        .then_with(|| b.id().cmp(&a.id()))
                })?
                .id();
            let removed: Vec<BlockId> = members
                .iter()
                .map(|b| b.id())
                .filter(|id| *id != kept)
                .sorted_unstable()
                .collect();
            Some(DuplicateCluster { kept, removed })
        })
        .collect();
    clusters.sort_by_key(|c| c.kept);
    clusters
}

/// Marks the non-kept members of every duplicate cluster as removed. Returns the number
/// of blocks removed.
pub fn remove_duplicate_blocks(
    result: &mut ClassificationResult,
    iou_threshold: f64,
    warn_block_count: usize,
) -> usize {
    let block_count = result.active_blocks().count();
    if block_count > warn_block_count {
        warn!(
            page_index = result.page_index(),
            block_count, "large page, duplicate clustering is quadratic in the block count"
        );
    }
    let clusters = cluster_duplicates(result.active_blocks(), iou_threshold);
    let mut removed = 0;
    for cluster in clusters {
        for block in cluster.removed {
            result.mark_removed(
                block,
                RemovalReason {
                    kind: RemovalKind::Duplicate,
                    target_block: Some(cluster.kept),
                },
            );
            removed += 1;
        }
    }
    debug!(page_index = result.page_index(), removed, "duplicate blocks removed");
    removed
}

/// Marks every block lying entirely outside the page bounds as removed.
pub fn remove_offpage_blocks(result: &mut ClassificationResult) -> usize {
    let page = *result.page_bbox();
    let outside: Vec<BlockId> = result
        .active_blocks()
        .filter(|b| b.bbox().intersect(&page).is_none())
        .map(|b| b.id())
        .collect();
    for &block in &outside {
        result.mark_removed(
            block,
            RemovalReason {
                kind: RemovalKind::OutsidePage,
                target_block: None,
            },
        );
    }
    if !outside.is_empty() {
        debug!(page_index = result.page_index(), removed = outside.len(), "off-page blocks removed");
    }
    outside.len()
}
