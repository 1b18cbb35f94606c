use serde::{Deserialize, Serialize};

use crate::entities::{BBox, BlockId, PageID};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Color(pub [u8; 3]);

pub type Point = (f64, f64);

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "item_type")]
pub enum PathItem {
    Line {
        from: Point,
        to: Point,
    },
    Rect {
        bbox: BBox,
    },
    Curve {
        from: Point,
        ctrl1: Point,
        ctrl2: Point,
        to: Point,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TextBlock {
    pub id: BlockId,
    pub bbox: BBox,
    #[serde(default)]
    pub draw_order: u32,
    pub text: String,
    #[serde(default)]
    pub font_name: Option<String>,
    pub font_size: f64,
    #[serde(default)]
    pub color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DrawingBlock {
    pub id: BlockId,
    pub bbox: BBox,
    #[serde(default)]
    pub draw_order: u32,
    #[serde(default)]
    pub fill_color: Option<Color>,
    #[serde(default)]
    pub stroke_color: Option<Color>,
    #[serde(default)]
    pub items: Vec<PathItem>,
}

impl DrawingBlock {
    /// Vertices of the straight-line segments of the path, deduplicated in drawing order.
    pub fn line_vertices(&self) -> Vec<Point> {
        let mut vertices: Vec<Point> = Vec::new();
        for item in &self.items {
            if let PathItem::Line { from, to } = item {
                for p in [from, to] {
                    if !vertices
                        .iter()
                        .any(|v| (v.0 - p.0).abs() < 1e-6 && (v.1 - p.1).abs() < 1e-6)
                    {
                        vertices.push(*p);
                    }
                }
            }
        }
        vertices
    }

    pub fn has_rect(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item, PathItem::Rect { .. } | PathItem::Curve { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageBlock {
    pub id: BlockId,
    pub bbox: BBox,
    #[serde(default)]
    pub draw_order: u32,
    #[serde(default)]
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "block_type")]
pub enum Block {
    Text(TextBlock),
    Drawing(DrawingBlock),
    Image(ImageBlock),
}

impl Block {
    pub fn id(&self) -> BlockId {
        match self {
            Block::Text(b) => b.id,
            Block::Drawing(b) => b.id,
            Block::Image(b) => b.id,
        }
    }

    pub fn bbox(&self) -> &BBox {
        match self {
            Block::Text(b) => &b.bbox,
            Block::Drawing(b) => &b.bbox,
            Block::Image(b) => &b.bbox,
        }
    }

    pub fn draw_order(&self) -> u32 {
        match self {
            Block::Text(b) => b.draw_order,
            Block::Drawing(b) => b.draw_order,
            Block::Image(b) => b.draw_order,
        }
    }

    pub fn as_text(&self) -> Option<&TextBlock> {
        match self {
            Block::Text(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_drawing(&self) -> Option<&DrawingBlock> {
        match self {
            Block::Drawing(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageBlock> {
        match self {
            Block::Image(b) => Some(b),
            _ => None,
        }
    }

    /// Same kind and same visible appearance: identical text for text blocks, identical
    /// fill and stroke for drawings. Any two images qualify.
    pub fn is_visually_equivalent(&self, other: &Block) -> bool {
        match (self, other) {
            (Block::Text(a), Block::Text(b)) => a.text == b.text,
            (Block::Drawing(a), Block::Drawing(b)) => {
                a.fill_color == b.fill_color && a.stroke_color == b.stroke_color
            }
            (Block::Image(_), Block::Image(_)) => true,
            _ => false,
        }
    }
}

/// One extracted page: the flat list of layout primitives and the page bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageData {
    /// 1-based position of the page in the document.
    pub page_index: PageID,
    pub bbox: BBox,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractedDocument {
    #[serde(default)]
    pub doc_name: Option<String>,
    pub pages: Vec<PageData>,
}
