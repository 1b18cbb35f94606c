use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Weights and thresholds used by the label classifiers. Every field has a default, so
/// a JSON file only needs to name the values it overrides.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Two visually equivalent blocks with at least this IOU are copies of each other
    pub duplicate_iou_threshold: f64,

    /// Pages with more blocks than this log a warning before duplicate clustering
    pub duplicate_warn_block_count: usize,

    /// Height of the bottom band (fraction of the page height) searched for page numbers
    pub page_number_band: f64,

    /// Width of the left and right corners (fraction of the page width) of that band
    pub page_number_corner_band: f64,

    /// Relative font-size deviation from a hint at which the font sub-score reaches zero
    pub font_size_tolerance: f64,

    /// Smallest font size read as a bag number when no hint is available
    pub bag_number_min_font_size: f64,

    pub step_number_max_value: u32,

    pub part_count_max: u32,

    /// Largest vertical gap between a part image and the count printed under it
    pub part_count_max_gap: f64,

    /// Smallest image area, as a fraction of the page area, read as a diagram
    pub diagram_min_area_ratio: f64,

    pub rotation_symbol_min_size: f64,

    pub rotation_symbol_max_size: f64,

    /// Largest relative difference between width and height of a rotation symbol
    pub rotation_symbol_squareness_tolerance: f64,

    /// Longest side of an arrowhead drawing
    pub arrow_max_size: f64,

    pub divider_max_thickness: f64,

    /// Smallest length of a divider, as a fraction of the page width or height
    pub divider_min_span: f64,

    /// Costs above this are never assigned when binding elements to steps
    pub assignment_max_distance: f64,

    /// Added to the placement cost of elements laid out above their step
    pub assignment_wrong_side_penalty: f64,

    /// Scored candidates below this confidence are not registered
    pub min_candidate_score: f64,

    /// Largest distance between a step number and the parts list it heads
    pub step_parts_list_max_distance: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            duplicate_iou_threshold: 0.9,
            duplicate_warn_block_count: 2000,
            page_number_band: 0.1,
            page_number_corner_band: 0.2,
            font_size_tolerance: 0.25,
            bag_number_min_font_size: 30.0,
            step_number_max_value: 999,
            part_count_max: 99,
            part_count_max_gap: 20.0,
            diagram_min_area_ratio: 0.01,
            rotation_symbol_min_size: 20.0,
            rotation_symbol_max_size: 80.0,
            rotation_symbol_squareness_tolerance: 0.2,
            arrow_max_size: 30.0,
            divider_max_thickness: 3.0,
            divider_min_span: 0.4,
            assignment_max_distance: 600.0,
            assignment_wrong_side_penalty: 150.0,
            min_candidate_score: 0.05,
            step_parts_list_max_distance: 120.0,
        }
    }
}

impl ClassifierConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("can't read classifier config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid classifier config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ClassifierConfig =
            serde_json::from_str(r#"{"duplicate_iou_threshold": 0.8, "part_count_max": 12}"#)
                .unwrap();
        assert_eq!(config.duplicate_iou_threshold, 0.8);
        assert_eq!(config.part_count_max, 12);
        assert_eq!(
            config.diagram_min_area_ratio,
            ClassifierConfig::default().diagram_min_area_ratio
        );
    }
}
