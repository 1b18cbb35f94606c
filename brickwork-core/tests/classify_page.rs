use std::collections::BTreeSet;

use brickwork_core::{
    blocks::{Block, Color, DrawingBlock, ImageBlock, PageData, PathItem, TextBlock},
    classifiers::{
        part::PartScore,
        part_count::{PartCountClassifier, PartCountScore},
    },
    classify::{
        classify_page, CandidateId, ClassificationResult, Classifier, ClassifierPipeline,
        ClassifierRegistry, ConflictResolver, DocumentHints, Label, RemovalKind, ScoreDetails,
        ScoredCandidate, ScoringContext,
    },
    config::ClassifierConfig,
    elements::Element,
    entities::{BBox, BlockId},
    error::BuildFailure,
};

fn text(id: BlockId, bbox: BBox, s: &str, font_size: f64) -> Block {
    Block::Text(TextBlock {
        id,
        bbox,
        draw_order: id,
        text: s.to_owned(),
        font_name: None,
        font_size,
        color: None,
    })
}

fn image(id: BlockId, bbox: BBox) -> Block {
    Block::Image(ImageBlock {
        id,
        bbox,
        draw_order: id,
        image_id: Some(format!("img-{id}")),
    })
}

fn frame(id: BlockId, bbox: BBox) -> Block {
    Block::Drawing(DrawingBlock {
        id,
        bbox,
        draw_order: id,
        fill_color: Some(Color([230, 240, 250])),
        stroke_color: Some(Color([0, 0, 0])),
        items: vec![PathItem::Rect { bbox }],
    })
}

fn page(page_index: usize, blocks: Vec<Block>) -> PageData {
    PageData {
        page_index,
        bbox: BBox::new(0.0, 0.0, 500.0, 700.0),
        blocks,
    }
}

fn pipeline() -> ClassifierPipeline {
    ClassifierPipeline::with_config(ClassifierConfig::default()).unwrap()
}

/// Page 4 with a bag number, one step (number, framed parts list, diagram) and a footer
/// page number.
fn step_page() -> PageData {
    page(
        4,
        vec![
            text(1, BBox::new(470.0, 680.0, 480.0, 690.0), "4", 10.0),
            text(2, BBox::new(400.0, 20.0, 440.0, 70.0), "1", 40.0),
            frame(3, BBox::new(10.0, 100.0, 150.0, 190.0)),
            image(4, BBox::new(20.0, 110.0, 60.0, 150.0)),
            text(5, BBox::new(22.0, 155.0, 40.0, 165.0), "2x", 8.0),
            text(6, BBox::new(20.0, 200.0, 40.0, 230.0), "1", 24.0),
            image(7, BBox::new(60.0, 240.0, 450.0, 600.0)),
        ],
    )
}

fn constructed_page(result: &ClassificationResult) -> brickwork_core::elements::Page {
    match result.root_element() {
        Some(Element::Page(page)) => page.clone(),
        other => panic!("expected a page element, got {other:?}"),
    }
}

#[test]
fn test_corner_page_number() {
    let pipeline = pipeline();
    let result = classify_page(
        &pipeline,
        page(7, vec![text(1, BBox::new(470.0, 680.0, 480.0, 690.0), "7", 10.0)]),
        &DocumentHints::default(),
    )
    .unwrap();

    let candidates = result.candidates(Label::PageNumber);
    assert_eq!(candidates.len(), 1);
    assert!(candidates[0].score >= 0.5);

    let winner = result.winner_for_block(1).unwrap();
    assert_eq!(winner.label, Label::PageNumber);
    match &winner.constructed {
        Some(Element::PageNumber(number)) => assert_eq!(number.value, 7),
        other => panic!("expected a page number, got {other:?}"),
    }
    assert_eq!(constructed_page(&result).page_number.map(|n| n.value), Some(7));
}

#[test]
fn test_duplicate_drawings_merged() {
    let pipeline = pipeline();
    let result = classify_page(
        &pipeline,
        page(
            1,
            vec![
                frame(1, BBox::new(100.0, 100.0, 200.0, 200.0)),
                frame(2, BBox::new(100.0, 100.0, 200.0, 195.0)),
            ],
        ),
        &DocumentHints::default(),
    )
    .unwrap();

    assert!(!result.is_removed(1));
    let reason = result.removal_reason(2).unwrap();
    assert_eq!(reason.kind, RemovalKind::Duplicate);
    assert_eq!(reason.target_block, Some(1));
    assert!(result
        .all_candidates()
        .iter()
        .all(|c| !c.source_blocks.contains(&2)));
}

#[test]
fn test_bag_number_beats_better_scored_step_number() {
    let pipeline = pipeline();
    let hints = DocumentHints {
        step_number_font_size: Some(40.0),
        ..Default::default()
    };
    let result = classify_page(
        &pipeline,
        page(2, vec![text(1, BBox::new(200.0, 300.0, 230.0, 350.0), "3", 40.0)]),
        &hints,
    )
    .unwrap();

    let step_number = result.candidates(Label::StepNumber)[0];
    let bag_number = result.candidates(Label::BagNumber)[0];
    assert!(step_number.score > bag_number.score);
    assert!(step_number.is_failed());

    assert_eq!(result.winner_for_block(1).unwrap().label, Label::BagNumber);
    let page = constructed_page(&result);
    assert_eq!(page.new_bags.iter().map(|b| b.value).collect::<Vec<_>>(), vec![3]);
    assert!(page.steps.is_empty());
}

#[test]
fn test_step_page_tree() {
    let pipeline = pipeline();
    let result = classify_page(&pipeline, step_page(), &DocumentHints::default()).unwrap();
    let page = constructed_page(&result);

    assert_eq!(page.page_number.map(|n| n.value), Some(4));
    assert_eq!(page.new_bags.iter().map(|b| b.value).collect::<Vec<_>>(), vec![1]);
    assert_eq!(page.steps.len(), 1);

    let step = &page.steps[0];
    assert_eq!(step.step_number.value, 1);
    let parts_list = step.parts_list.as_ref().unwrap();
    assert_eq!(parts_list.parts.len(), 1);
    assert_eq!(parts_list.parts[0].count.count, 2);
    assert_eq!(parts_list.parts[0].image_id.as_deref(), Some("img-4"));
    assert_eq!(
        step.diagram.as_ref().map(|d| d.bbox),
        Some(BBox::new(60.0, 240.0, 450.0, 600.0))
    );
    assert!(step.bbox.contains(&step.step_number.bbox));
}

#[test]
fn test_constructed_candidates_never_share_blocks() {
    let pipeline = pipeline();
    let result = classify_page(&pipeline, step_page(), &DocumentHints::default()).unwrap();

    let mut seen = BTreeSet::new();
    for candidate in result.all_candidates().iter().filter(|c| c.is_constructed()) {
        for block in &candidate.source_blocks {
            assert!(
                seen.insert(*block),
                "block {block} read by two constructed candidates"
            );
            assert_eq!(result.winner_for_block(*block).map(|c| c.id), Some(candidate.id));
        }
    }
}

#[test]
fn test_repeated_runs_are_identical() {
    let pipeline = pipeline();
    let runs: Vec<(String, Vec<String>)> = (0..3)
        .map(|_| {
            let result =
                classify_page(&pipeline, step_page(), &DocumentHints::default()).unwrap();
            (
                serde_json::to_string(&result.root_element()).unwrap(),
                result.warnings().to_vec(),
            )
        })
        .collect();
    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[1], runs[2]);
}

/// Builds its part count, then fails.
struct CountOnlyPart;

impl Classifier for CountOnlyPart {
    fn output(&self) -> Label {
        Label::Part
    }

    fn requires(&self) -> &[Label] {
        &[Label::PartCount]
    }

    fn score(&self, result: &ClassificationResult, _ctx: &ScoringContext) -> Vec<ScoredCandidate> {
        result
            .candidates(Label::PartCount)
            .into_iter()
            .map(|count| {
                ScoredCandidate::new(
                    count.bbox,
                    ScoreDetails::Part(PartScore {
                        part_count: count.id,
                        count_score: count.score,
                        alignment_score: 1.0,
                        image_id: None,
                    }),
                    vec![],
                )
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
            return Err(BuildFailure::new(id, Label::Part, "unexpected details"));
        };
        let count = details.part_count;
        result.build(count, registry)?;
        assert!(result.is_constructed(count));
        Err(BuildFailure::new(id, Label::Part, "no image next to the count"))
    }
}

#[test]
fn test_failed_build_rolls_back_nested_builds() {
    let config = ClassifierConfig::default();
    let pipeline = ClassifierPipeline::new(
        vec![
            Box::new(PartCountClassifier::new(config.clone())),
            Box::new(CountOnlyPart),
        ],
        Label::Part,
        ConflictResolver::empty(),
        config,
    )
    .unwrap();

    let mut result = ClassificationResult::new(page(
        1,
        vec![text(1, BBox::new(20.0, 20.0, 34.0, 30.0), "3x", 8.0)],
    ))
    .unwrap();
    let hints = DocumentHints::default();
    pipeline
        .score(&mut result, &ScoringContext { hints: &hints })
        .unwrap();

    let part = result.candidates(Label::Part)[0].id;
    let count = result.candidates(Label::PartCount)[0].id;
    // weaker reading of the same text; loses the block once the count is built
    let rival = result
        .add_candidate(
            Label::PartCount,
            ScoredCandidate::new(
                BBox::new(20.0, 20.0, 34.0, 30.0),
                ScoreDetails::PartCount(PartCountScore {
                    count: 3,
                    text_score: 0.5,
                    font_size_score: 0.5,
                }),
                vec![1],
            ),
        )
        .unwrap();
    let candidates_before = result.all_candidates().to_vec();
    let consumed_before = result.consumed_blocks().clone();

    let failure = result.build(part, pipeline.registry()).unwrap_err();
    assert_eq!(failure.candidate, part);
    assert_eq!(result.all_candidates(), candidates_before.as_slice());
    assert_eq!(result.consumed_blocks(), &consumed_before);
    assert!(!result.is_consumed(1));
    assert!(result.candidate(rival).is_active());
    assert_eq!(result.candidate(rival).failure_reason, None);

    // the rolled-back child is still buildable on its own
    assert!(result.build(count, pipeline.registry()).is_ok());
    assert_eq!(result.winner_for_block(1).map(|c| c.id), Some(count));
    assert!(result.is_failed(rival));
}
