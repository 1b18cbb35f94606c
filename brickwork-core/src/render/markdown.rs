use std::fmt::Write;

use crate::{
    classify::document::{ClassifiedDocument, ClassifiedPage},
    elements::{Element, Orientation},
};

use super::{Render, Renderer};

/// Renders a classified document as a nested markdown outline.
#[derive(Debug, Default)]
pub struct MarkdownRender {
    out: String,
}

impl MarkdownRender {
    pub fn finalize(self, doc_title: &str) -> String {
        format!("# {doc_title}\n{}", self.out)
    }

    fn line(&mut self, depth: usize, text: std::fmt::Arguments) -> anyhow::Result<()> {
        writeln!(self.out, "{}- {}", "  ".repeat(depth), text)?;
        Ok(())
    }
}

impl Renderer for MarkdownRender {
    type Ok = ();

    fn render_page(&mut self, page: &ClassifiedPage) -> anyhow::Result<()> {
        let number = page
            .page
            .as_ref()
            .and_then(|root| match root {
                Element::Page(p) => p.page_number.as_ref().map(|n| n.value),
                _ => None,
            })
            .map(|n| format!(" (printed {n})"))
            .unwrap_or_default();
        writeln!(self.out, "\n## Page {}{number}\n", page.page_index)?;
        for warning in &page.warnings {
            writeln!(self.out, "> warning: {warning}")?;
        }
        if !page.removals.is_empty() {
            writeln!(self.out, "> {} blocks removed", page.removals.len())?;
        }
        Ok(())
    }

    fn render_element(&mut self, element: &Element, depth: usize) -> anyhow::Result<()> {
        match element {
            Element::PageNumber(n) => self.line(depth, format_args!("page number {}", n.value)),
            Element::BagNumber(b) => self.line(depth, format_args!("**bag {}**", b.value)),
            Element::Divider(d) => {
                let orientation = match d.orientation {
                    Orientation::Horizontal => "horizontal",
                    Orientation::Vertical => "vertical",
                };
                self.line(depth, format_args!("{orientation} divider at {}", d.bbox))
            }
            Element::Step(step) => self.line(
                depth,
                format_args!("**step {}** at {}", step.step_number.value, step.bbox),
            ),
            // the step line already carries its number
            Element::StepNumber(_) => Ok(()),
            Element::PartsList(list) => self.line(
                depth,
                format_args!(
                    "parts list: {} parts, {} pieces",
                    list.parts.len(),
                    list.total_items()
                ),
            ),
            Element::Part(part) => self.line(
                depth,
                format_args!(
                    "{}x {}",
                    part.count.count,
                    part.image_id.as_deref().unwrap_or("part")
                ),
            ),
            Element::PartCount(_) if depth > 0 => Ok(()),
            Element::PartCount(c) => self.line(depth, format_args!("{}x", c.count)),
            Element::Diagram(d) => self.line(depth, format_args!("diagram at {}", d.bbox)),
            Element::SubAssembly(sub) => match &sub.count {
                Some(count) => self.line(depth, format_args!("sub-assembly, {}x", count.count)),
                None => self.line(depth, format_args!("sub-assembly")),
            },
            Element::RotationSymbol(_) => self.line(depth, format_args!("rotate model")),
            Element::Arrow(a) => self.line(
                depth,
                format_args!("arrow pointing at ({:.1}, {:.1})", a.tip.0, a.tip.1),
            ),
            Element::Page(p) => self.line(depth, format_args!("page {}", p.page_index)),
        }
    }
}

#[tracing::instrument(skip_all)]
pub fn to_markdown(doc: &ClassifiedDocument, doc_title: &str) -> anyhow::Result<String> {
    let mut renderer = MarkdownRender::default();
    doc.render(&mut renderer)?;
    Ok(renderer.finalize(doc_title))
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, time::Duration};

    use super::*;
    use crate::{
        classify::{document::DocumentMetadata, DocumentHints},
        elements::{Page, PageNumber, Part, PartCount, PartsList, Step, StepNumber},
        entities::BBox,
    };

    fn bbox() -> BBox {
        BBox::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn test_outline() {
        let step = Step {
            step_number: StepNumber {
                value: 3,
                bbox: bbox(),
            },
            parts_list: Some(PartsList {
                parts: vec![Part {
                    count: PartCount {
                        count: 2,
                        bbox: bbox(),
                    },
                    image_id: Some("img-4".to_owned()),
                    bbox: bbox(),
                }],
                bbox: bbox(),
            }),
            diagram: None,
            sub_assemblies: vec![],
            arrows: vec![],
            rotation_symbol: None,
            bbox: bbox(),
        };
        let doc = ClassifiedDocument {
            doc_name: "set".to_owned(),
            pages: vec![ClassifiedPage {
                page_index: 1,
                page: Some(Element::Page(Page {
                    page_index: 1,
                    page_number: Some(PageNumber {
                        value: 7,
                        bbox: bbox(),
                    }),
                    steps: vec![step],
                    new_bags: vec![],
                    dividers: vec![],
                    bbox: bbox(),
                })),
                candidates: vec![],
                removals: BTreeMap::new(),
                warnings: vec!["diagram at (0.0, 0.0, 1.0, 1.0) not assigned to any step".into()],
            }],
            metadata: DocumentMetadata::new(Duration::from_millis(3), DocumentHints::default()),
        };

        let md = to_markdown(&doc, "set").unwrap();
        assert!(md.starts_with("# set\n"));
        assert!(md.contains("## Page 1 (printed 7)"));
        assert!(md.contains("> warning: diagram at"));
        assert!(md.contains("- page number 7"));
        assert!(md.contains("- **step 3** at"));
        assert!(md.contains("  - parts list: 1 parts, 2 pieces"));
        assert!(md.contains("    - 2x img-4"));
        assert!(!md.contains("- 2x\n"));
    }
}
