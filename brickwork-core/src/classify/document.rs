use std::{collections::BTreeMap, ops::Range, time::Duration, time::Instant};

use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    blocks::ExtractedDocument,
    elements::Element,
    entities::{BBox, BlockId, PageID},
};

use super::{
    candidate::CandidateId, hints::DocumentHints, page::classify_page,
    pipeline::ClassifierPipeline, result::ClassificationResult, Label, RemovalReason,
};

const BRICKWORK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Document-level options of a classification run.
#[derive(Debug, Clone, Default)]
pub struct ClassifyConfig {
    /// Optional range of pages to classify, by 0-based position in the document. When
    /// None, classifies every page. Hints are always computed over the whole document.
    pub page_range: Option<Range<usize>>,

    /// Attach the label-specific score details to every candidate summary
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CandidateSummary {
    pub id: CandidateId,
    pub label: Label,
    pub score: f64,
    pub bbox: BBox,
    pub source_blocks: Vec<BlockId>,
    pub constructed: bool,
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifiedPage {
    pub page_index: PageID,
    pub page: Option<Element>,
    pub candidates: Vec<CandidateSummary>,
    pub removals: BTreeMap<BlockId, RemovalReason>,
    pub warnings: Vec<String>,
}

impl ClassifiedPage {
    pub fn from_result(result: &ClassificationResult, with_details: bool) -> Self {
        let candidates = result
            .all_candidates()
            .iter()
            .map(|c| CandidateSummary {
                id: c.id,
                label: c.label,
                score: c.score,
                bbox: c.bbox,
                source_blocks: c.source_blocks.clone(),
                constructed: c.is_constructed(),
                failure_reason: c.failure_reason.clone(),
                details: with_details
                    .then(|| serde_json::to_value(&c.details).ok())
                    .flatten(),
            })
            .collect();
        Self {
            page_index: result.page_index(),
            page: result.root_element().cloned(),
            candidates,
            removals: result.removals().clone(),
            warnings: result.warnings().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentMetadata {
    #[serde(with = "serde_millis")]
    pub classification_duration: Duration,
    pub brickwork_version: String,
    pub hints: DocumentHints,
}

impl DocumentMetadata {
    pub fn new(classification_duration: Duration, hints: DocumentHints) -> Self {
        Self {
            classification_duration,
            brickwork_version: BRICKWORK_VERSION.to_owned(),
            hints,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifiedDocument {
    pub doc_name: String,
    pub pages: Vec<ClassifiedPage>,
    pub metadata: DocumentMetadata,
}

/// Classifies the pages of `doc` in parallel, one independent result per page.
///
/// # Arguments
/// * `page_callback` - Optional callback called after each page is classified
/// * `cancellation_callback` - Checked before each page; returning true aborts the run
///
/// A page with inconsistent input (duplicate block ids, invalid boxes) or a classifier
/// registering an invalid candidate aborts the run with the [`ClassificationError`]
/// attached.
///
/// [`ClassificationError`]: crate::error::ClassificationError
#[instrument(skip_all, fields(doc_name = doc.doc_name.as_deref().unwrap_or_default(), pages = doc.pages.len()))]
pub fn classify_document<F, C>(
    doc: ExtractedDocument,
    pipeline: &ClassifierPipeline,
    config: ClassifyConfig,
    page_callback: Option<F>,
    cancellation_callback: Option<C>,
) -> anyhow::Result<ClassifiedDocument>
where
    F: Fn(PageID) + Send + Sync,
    C: Fn() -> bool + Send + Sync,
{
    let start_time = Instant::now();
    let ExtractedDocument { doc_name, pages } = doc;
    let doc_name = doc_name.unwrap_or_else(|| "document".to_owned());

    let hints = DocumentHints::from_pages(&pages, pipeline.config());

    let pages: Vec<_> = match config.page_range {
        Some(range) => {
            if range.end > pages.len() {
                anyhow::bail!(
                    "Page range end ({}) exceeds document length ({})",
                    range.end,
                    pages.len()
                );
            }
            pages
                .into_iter()
                .enumerate()
                .filter(|(idx, _)| range.contains(idx))
                .map(|(_, page)| page)
                .collect()
        }
        None => pages,
    };

    let mut classified = pages
        .into_par_iter()
        .map(|page| {
            if let Some(cancel_cb) = &cancellation_callback {
                if cancel_cb() {
                    return Err(anyhow::anyhow!("Document classification was cancelled"));
                }
            }
            let page_index = page.page_index;
            let result = classify_page(pipeline, page, &hints)
                .with_context(|| format!("can't classify page {page_index}"))?;
            if result.root_element().is_none() {
                warn!(page_index, "page has no root element");
            }
            let classified = ClassifiedPage::from_result(&result, config.debug);
            if let Some(callback) = &page_callback {
                callback(page_index)
            }
            Ok(classified)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    classified.sort_by_key(|p| p.page_index);

    let duration = start_time.elapsed();
    info!(
        pages = classified.len(),
        duration_ms = duration.as_millis() as u64,
        "document classified"
    );
    Ok(ClassifiedDocument {
        doc_name,
        pages: classified,
        metadata: DocumentMetadata::new(duration, hints),
    })
}
