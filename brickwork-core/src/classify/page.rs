use tracing::{debug, instrument};

use crate::{blocks::PageData, error::ClassificationError};

use super::{
    dedup::{remove_duplicate_blocks, remove_offpage_blocks},
    hints::DocumentHints,
    pipeline::{ClassifierPipeline, ScoringContext},
    result::ClassificationResult,
};

/// Classifies one page end to end: block clean-up, scoring, pre-build arbitration and the
/// top-down build from the root label.
#[instrument(skip_all, fields(page_index = page.page_index, blocks = page.blocks.len()))]
pub fn classify_page(
    pipeline: &ClassifierPipeline,
    page: PageData,
    hints: &DocumentHints,
) -> Result<ClassificationResult, ClassificationError> {
    let config = pipeline.config();
    let mut result = ClassificationResult::new(page)?;

    let outside = remove_offpage_blocks(&mut result);
    let duplicates = remove_duplicate_blocks(
        &mut result,
        config.duplicate_iou_threshold,
        config.duplicate_warn_block_count,
    );

    let ctx = ScoringContext { hints };
    pipeline.score(&mut result, &ctx)?;
    let resolved = pipeline.resolver().resolve(&mut result);
    let root = pipeline.build_root(&mut result);

    debug!(
        outside,
        duplicates,
        resolved,
        candidates = result.all_candidates().len(),
        built = root.is_some(),
        "page classified"
    );
    Ok(result)
}
