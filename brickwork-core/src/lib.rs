//! Classification and construction engine for instruction booklet pages.
//!
//! Pages come in as flat lists of layout [`blocks`]. Each label classifier scores
//! candidates over blocks and lower-level candidates, conflicts over shared blocks are
//! arbitrated, and the page tree is built top-down from [`classify::Label::Page`].

pub mod blocks;
pub mod classifiers;
pub mod classify;
pub mod config;
pub mod elements;
pub mod entities;
pub mod error;
pub mod render;
pub mod utils;

pub use classify::{
    classify_document, classify_page, ClassificationResult, ClassifierPipeline, ClassifyConfig,
    Label,
};
pub use config::ClassifierConfig;
pub use elements::Element;
pub use error::{BuildFailure, ClassificationError, GeometryError};
