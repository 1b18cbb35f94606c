use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    blocks::{PageData, TextBlock},
    classifiers::text::{parse_count, parse_number},
    config::ClassifierConfig,
};

/// Font sizes ruling the number-like labels of one document. Computed once from every
/// page before classification and shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DocumentHints {
    pub step_number_font_size: Option<f64>,
    pub part_count_font_size: Option<f64>,
    pub page_number_font_size: Option<f64>,
    pub bag_number_font_size: Option<f64>,
}

/// Font-size histogram bucketed to a tenth of a point.
#[derive(Debug, Default)]
struct SizeHistogram(BTreeMap<u64, usize>);

impl SizeHistogram {
    fn add(&mut self, size: f64) {
        if size.is_finite() && size > 0f64 {
            *self.0.entry((size * 10f64).round() as u64).or_default() += 1;
        }
    }

    /// Most frequent size, the smaller one on ties.
    fn mode(&self) -> Option<f64> {
        self.0
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(bucket, _)| *bucket as f64 / 10f64)
    }
}

fn in_page_number_band(page: &PageData, text: &TextBlock, config: &ClassifierConfig) -> bool {
    let band_top = page.bbox.y1 - page.bbox.height() * config.page_number_band;
    text.bbox.y0 >= band_top
}

impl DocumentHints {
    pub fn from_pages(pages: &[PageData], config: &ClassifierConfig) -> Self {
        let mut counts = SizeHistogram::default();
        let mut page_numbers = SizeHistogram::default();
        let mut numbers: Vec<f64> = Vec::new();

        for page in pages {
            for text in page.blocks.iter().filter_map(|b| b.as_text()) {
                if parse_count(&text.text).is_some() {
                    counts.add(text.font_size);
                } else if parse_number(&text.text).is_some() {
                    if in_page_number_band(page, text, config) {
                        page_numbers.add(text.font_size);
                    } else {
                        numbers.push(text.font_size);
                    }
                }
            }
        }

        let part_count_font_size = counts.mode();
        let floor = part_count_font_size.unwrap_or(0f64);

        let mut steps = SizeHistogram::default();
        let mut bags = SizeHistogram::default();
        for &size in &numbers {
            if size >= config.bag_number_min_font_size {
                bags.add(size);
            } else if size > floor {
                steps.add(size);
            }
        }

        let hints = Self {
            step_number_font_size: steps.mode(),
            part_count_font_size,
            page_number_font_size: page_numbers.mode(),
            bag_number_font_size: bags.mode(),
        };
        debug!(?hints, "document hints");
        hints
    }
}

/// Closeness of `actual` to the `expected` font size in `[0, 1]`, reaching zero at a
/// relative deviation of `tolerance`. Neutral (0.5) without a hint.
pub fn font_size_score(actual: f64, expected: Option<f64>, tolerance: f64) -> f64 {
    match expected {
        Some(expected) if expected > 0f64 && tolerance > 0f64 => {
            let deviation = (actual - expected).abs() / expected;
            (1f64 - deviation / tolerance).clamp(0f64, 1f64)
        }
        _ => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{blocks::Block, entities::BBox};

    fn text(id: u32, y: f64, s: &str, font_size: f64) -> Block {
        Block::Text(TextBlock {
            id,
            bbox: BBox::new(10.0, y, 30.0, y + font_size),
            draw_order: id,
            text: s.to_owned(),
            font_name: None,
            font_size,
            color: None,
        })
    }

    #[test]
    fn test_hints_from_histograms() {
        let page = PageData {
            page_index: 1,
            bbox: BBox::new(0.0, 0.0, 500.0, 700.0),
            blocks: vec![
                text(1, 50.0, "1", 24.0),
                text(2, 300.0, "2", 24.0),
                text(3, 400.0, "3", 23.96),
                text(4, 100.0, "2x", 8.0),
                text(5, 120.0, "1x", 8.0),
                text(6, 140.0, "4x", 9.0),
                text(7, 680.0, "12", 10.0),
                text(8, 200.0, "5", 48.0),
            ],
        };
        let hints = DocumentHints::from_pages(&[page], &ClassifierConfig::default());
        assert_eq!(hints.step_number_font_size, Some(24.0));
        assert_eq!(hints.part_count_font_size, Some(8.0));
        assert_eq!(hints.page_number_font_size, Some(10.0));
        assert_eq!(hints.bag_number_font_size, Some(48.0));
    }

    #[test]
    fn test_mode_tie_takes_smaller_size() {
        let mut histogram = SizeHistogram::default();
        histogram.add(12.0);
        histogram.add(10.0);
        histogram.add(f64::NAN);
        assert_eq!(histogram.mode(), Some(10.0));
        assert_eq!(SizeHistogram::default().mode(), None);
    }

    #[test]
    fn test_font_size_score() {
        assert_eq!(font_size_score(20.0, None, 0.25), 0.5);
        assert_eq!(font_size_score(20.0, Some(20.0), 0.25), 1.0);
        assert!((font_size_score(22.5, Some(20.0), 0.25) - 0.5).abs() < 1e-9);
        assert_eq!(font_size_score(40.0, Some(20.0), 0.25), 0.0);
    }
}
